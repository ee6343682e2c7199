use tracing::{error, info};

use mdde_web::{Config, WebServer};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = mdde_web::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        mdde_web::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("mdde-web {}", env!("CARGO_PKG_VERSION"));

    let server = match WebServer::new(&config) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create web server: {}", e);
            std::process::exit(1);
        }
    };

    let addr = server.addr();
    info!("Scripts root: {}", config.storage.scripts_dir().display());
    info!("API endpoints:");
    info!("  GET    http://{}/list", addr);
    info!("  GET    http://{}/list/{{collection}}", addr);
    info!("  GET    http://{}/get/{{collection}}", addr);
    info!("  GET    http://{}/get/{{collection}}/{{file}}", addr);
    info!("  POST   http://{}/upload/{{collection}}", addr);
    info!("  DELETE http://{}/delete/{{collection}}/{{file}}", addr);
    info!("  GET    http://{}/download/{{name}}", addr);
    info!("  GET    http://{}/health", addr);
    info!("Swagger UI: http://{}/swagger-ui", addr);

    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
        std::process::exit(1);
    }
}
