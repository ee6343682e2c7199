//! Web server for mdde-web.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::predicate::{NotForContentType, Predicate};
use tower_http::compression::{CompressionLayer, DefaultPredicate};

use crate::config::Config;
use crate::file::normalize;
use crate::{MddeError, Result};

use super::handlers::AppState;
use super::router::{create_router, create_static_router, create_swagger_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// CORS allowed origins.
    cors_origins: Vec<String>,
    /// Static file directory, if static serving is enabled.
    static_dir: Option<PathBuf>,
    /// Directories under `static_dir` that must not be served.
    static_excluded: Vec<PathBuf>,
}

/// Directories inside `static_dir` that hold private scratch files.
///
/// Both paths must be absolute and normalized. An empty relative path
/// hides the whole static directory.
fn private_static_paths(static_dir: &Path, temp_dir: &Path) -> Vec<PathBuf> {
    if static_dir.starts_with(temp_dir) {
        return vec![PathBuf::new()];
    }

    temp_dir
        .strip_prefix(static_dir)
        .map(|relative| vec![relative.to_path_buf()])
        .unwrap_or_default()
}

impl WebServer {
    /// Create a new web server from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let addr = format!("{}:{}", config.web.host, config.web.port)
            .parse()
            .map_err(|e| {
                MddeError::Config(format!(
                    "invalid web server address {}:{}: {e}",
                    config.web.host, config.web.port
                ))
            })?;

        let app_state = AppState::from_config(&config.storage)?;
        tracing::info!(
            root = %app_state.store.root().display(),
            max_upload_size = app_state.store.max_file_size(),
            "Script store initialized"
        );

        let (static_dir, static_excluded) = if config.web.serve_static {
            let dir = normalize(&std::env::current_dir()?.join(config.static_dir()));
            let excluded = private_static_paths(&dir, app_state.store.temp_dir());
            (Some(dir), excluded)
        } else {
            (None, Vec::new())
        };

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            cors_origins: config.web.cors_origins.clone(),
            static_dir,
            static_excluded,
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn build_router(self) -> Router {
        let mut router = create_router(self.app_state, &self.cors_origins)
            .merge(create_swagger_router());

        if let Some(dir) = self.static_dir {
            if let Some(static_router) = create_static_router(&dir, self.static_excluded) {
                tracing::info!(path = %dir.display(), "Serving static files");
                router = router.merge(static_router);
            }
        }

        // Zip archives and raw file downloads are sent as-is
        let predicate = DefaultPredicate::new()
            .and(NotForContentType::const_new("application/zip"))
            .and(NotForContentType::const_new("application/octet-stream"));

        router.layer(CompressionLayer::new().compress_when(predicate))
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        let router = self.build_router();

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        let router = self.build_router();

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
