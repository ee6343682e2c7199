//! Web API Script Tests
//!
//! Integration tests for the collection, setup script and health endpoints.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use mdde_web::config::StorageConfig;
use mdde_web::web::handlers::AppState;
use mdde_web::web::router::create_router;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Test server over a temporary service root.
struct TestEnv {
    server: TestServer,
    dir: TempDir,
}

impl TestEnv {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn scripts_dir(&self) -> PathBuf {
        self.root().join("scripts")
    }

    fn temp_dir(&self) -> PathBuf {
        self.root().join("temp")
    }
}

/// Create a test server with the default upload limit.
fn create_test_server() -> TestEnv {
    create_test_server_with(|_| {})
}

/// Create a test server, letting the caller adjust storage configuration.
fn create_test_server_with(adjust: impl FnOnce(&mut StorageConfig)) -> TestEnv {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let mut storage = StorageConfig {
        root: dir.path().to_string_lossy().into_owned(),
        ..Default::default()
    };
    adjust(&mut storage);

    let app_state = Arc::new(AppState::from_config(&storage).expect("Failed to create state"));
    let router = create_router(app_state, &[]);
    let server = TestServer::new(router).expect("Failed to create test server");

    TestEnv { server, dir }
}

/// Build a multipart form with one file part.
fn script_form(field: &str, file_name: &str, content: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        field,
        Part::bytes(content.to_vec())
            .file_name(file_name)
            .mime_type("application/octet-stream"),
    )
}

/// Upload a file into a collection and assert success.
async fn upload(env: &TestEnv, collection: &str, file_name: &str, content: &[u8]) -> Value {
    let response = env
        .server
        .post(&format!("/upload/{collection}"))
        .multipart(script_form("script", file_name, content))
        .await;

    response.assert_status_ok();
    response.json::<Value>()
}

fn leftover_temp_files(env: &TestEnv) -> Vec<String> {
    match std::fs::read_dir(env.temp_dir()) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

// ============================================================================
// Upload / Download Tests
// ============================================================================

#[tokio::test]
async fn test_upload_then_download() {
    let env = create_test_server();

    let body = upload(&env, "tools", "install.sh", b"#!/bin/sh\necho hi\n").await;
    assert_eq!(
        body,
        json!({
            "message": "Upload successful",
            "fileName": "install.sh",
            "dirName": "tools",
            "filePath": "scripts/tools/install.sh"
        })
    );

    let response = env.server.get("/get/tools/install.sh").await;
    response.assert_status_ok();
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        "application/octet-stream"
    );
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"install.sh\""
    );
    assert_eq!(response.as_bytes().as_ref(), b"#!/bin/sh\necho hi\n");

    assert!(leftover_temp_files(&env).is_empty());
}

#[tokio::test]
async fn test_upload_accepts_file_field() {
    let env = create_test_server();

    let response = env
        .server
        .post("/upload/tools")
        .multipart(script_form("file", "run.ps1", b"Write-Host hi"))
        .await;

    response.assert_status_ok();
    assert_eq!(
        std::fs::read(env.scripts_dir().join("tools/run.ps1")).unwrap(),
        b"Write-Host hi"
    );
}

#[tokio::test]
async fn test_upload_replaces_existing_file() {
    let env = create_test_server();

    upload(&env, "tools", "a.txt", b"old").await;
    upload(&env, "tools", "a.txt", b"new content").await;

    let response = env.server.get("/get/tools/a.txt").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "new content");
}

#[tokio::test]
async fn test_concurrent_uploads_create_collection_once() {
    let env = create_test_server();

    let uploads = (0..16).map(|i| {
        let server = &env.server;
        async move {
            server
                .post("/upload/fresh")
                .multipart(script_form("script", &format!("f{i}.sh"), b"echo fresh"))
                .await
        }
    });
    let responses = futures::future::join_all(uploads).await;

    for response in &responses {
        response.assert_status_ok();
    }

    let response = env.server.get("/list/fresh").await;
    response.assert_status_ok();

    let mut expected: Vec<String> = (0..16).map(|i| format!("f{i}.sh")).collect();
    expected.sort();
    assert_eq!(
        response.json::<Value>(),
        json!({ "directory": "fresh", "scripts": expected })
    );
    assert!(leftover_temp_files(&env).is_empty());
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let env = create_test_server();

    let response = env
        .server
        .post("/upload/tools")
        .multipart(MultipartForm::new().add_text("note", "no file here"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "error": "No file uploaded" }));
    assert!(!env.scripts_dir().join("tools").exists());
}

#[tokio::test]
async fn test_upload_too_large() {
    let env = create_test_server_with(|storage| storage.max_upload_size_mb = 1);

    let content = vec![b'x'; 1024 * 1024 + 1];
    let response = env
        .server
        .post("/upload/big")
        .multipart(script_form("script", "huge.bin", &content))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        response.json::<Value>(),
        json!({ "error": "File too large (max 1MB)" })
    );
    assert!(!env.scripts_dir().join("big").exists());
    assert!(leftover_temp_files(&env).is_empty());
}

#[tokio::test]
async fn test_upload_at_limit_succeeds() {
    let env = create_test_server_with(|storage| storage.max_upload_size_mb = 1);

    let content = vec![b'x'; 1024 * 1024];
    upload(&env, "big", "exact.bin", &content).await;

    let stored = std::fs::metadata(env.scripts_dir().join("big/exact.bin")).unwrap();
    assert_eq!(stored.len(), 1024 * 1024);
}

#[tokio::test]
async fn test_download_missing_file() {
    let env = create_test_server();
    upload(&env, "tools", "a.txt", b"a").await;

    let response = env.server.get("/get/tools/missing.txt").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn test_download_directory_is_rejected() {
    let env = create_test_server();
    std::fs::create_dir_all(env.scripts_dir().join("tools/nested")).unwrap();

    let response = env.server.get("/get/tools/nested").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Path Containment Tests
// ============================================================================

#[tokio::test]
async fn test_upload_traversal_is_forbidden() {
    let env = create_test_server();

    let response = env
        .server
        .post("/upload/..%2Fescape")
        .multipart(script_form("script", "x.sh", b"nope"))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>(), json!({ "error": "Access denied" }));
    assert!(!env.root().join("escape").exists());
    assert!(!env.scripts_dir().exists());
}

#[tokio::test]
async fn test_download_traversal_is_forbidden() {
    let env = create_test_server();
    std::fs::write(env.root().join("secret.txt"), b"secret").unwrap();
    upload(&env, "tools", "a.txt", b"a").await;

    let response = env.server.get("/get/tools/..%2F..%2Fsecret.txt").await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = env.server.get("/list/..%2F..").await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_traversal_is_forbidden() {
    let env = create_test_server();
    std::fs::write(env.root().join("env-build.sh"), b"echo setup").unwrap();
    upload(&env, "tools", "a.txt", b"a").await;

    let response = env.server.delete("/delete/tools/..%2F..%2Fenv-build.sh").await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert!(env.root().join("env-build.sh").exists());
}

// ============================================================================
// Delete Tests
// ============================================================================

#[tokio::test]
async fn test_delete_twice() {
    let env = create_test_server();
    upload(&env, "tools", "a.txt", b"a").await;

    let response = env.server.delete("/delete/tools/a.txt").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "message": "File deleted" }));
    assert!(!env.scripts_dir().join("tools/a.txt").exists());

    let response = env.server.delete("/delete/tools/a.txt").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_directory_is_rejected() {
    let env = create_test_server();
    std::fs::create_dir_all(env.scripts_dir().join("tools/nested")).unwrap();

    let response = env.server.delete("/delete/tools/nested").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(env.scripts_dir().join("tools/nested").is_dir());
}

// ============================================================================
// List Tests
// ============================================================================

#[tokio::test]
async fn test_list_absent_root() {
    let env = create_test_server();

    let response = env.server.get("/list").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "directories": [] }));
}

#[tokio::test]
async fn test_list_collections_sorted() {
    let env = create_test_server();
    upload(&env, "zeta", "z.sh", b"z").await;
    upload(&env, "alpha", "b.sh", b"b").await;
    upload(&env, "alpha", "a.sh", b"a").await;

    let response = env.server.get("/list").await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({
            "directories": [
                { "name": "alpha", "path": "scripts/alpha", "scripts": ["a.sh", "b.sh"] },
                { "name": "zeta", "path": "scripts/zeta", "scripts": ["z.sh"] }
            ]
        })
    );
}

#[tokio::test]
async fn test_list_collection() {
    let env = create_test_server();
    upload(&env, "tools", "b.sh", b"b").await;
    upload(&env, "tools", "a.sh", b"a").await;

    let response = env.server.get("/list/tools").await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({ "directory": "tools", "scripts": ["a.sh", "b.sh"] })
    );
}

#[tokio::test]
async fn test_list_missing_collection() {
    let env = create_test_server();

    let response = env.server.get("/list/nope").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>(),
        json!({ "error": "Directory nope does not exist" })
    );
}

// ============================================================================
// Archive Tests
// ============================================================================

#[tokio::test]
async fn test_download_collection_archive() {
    let env = create_test_server();
    upload(&env, "tools", "a.txt", b"alpha").await;
    upload(&env, "tools", "b.txt", b"bravo").await;

    let response = env.server.get("/get/tools").await;
    response.assert_status_ok();
    assert_eq!(response.header(header::CONTENT_TYPE), "application/zip");
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"tools_scripts.zip\""
    );

    let mut archive = zip::ZipArchive::new(Cursor::new(response.as_bytes().to_vec())).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["a.txt", "b.txt"]);

    let mut content = String::new();
    archive
        .by_name("b.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "bravo");

    assert!(leftover_temp_files(&env).is_empty());
}

#[tokio::test]
async fn test_download_collection_includes_subdirectories() {
    let env = create_test_server();
    upload(&env, "tools", "a.txt", b"a").await;
    std::fs::create_dir_all(env.scripts_dir().join("tools/lib")).unwrap();
    std::fs::write(env.scripts_dir().join("tools/lib/common.sh"), b"common").unwrap();

    let response = env.server.get("/get/tools").await;
    response.assert_status_ok();

    let archive = zip::ZipArchive::new(Cursor::new(response.as_bytes().to_vec())).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert!(names.contains(&"a.txt"));
    assert!(names.contains(&"lib/common.sh"));
}

#[tokio::test]
async fn test_download_missing_collection() {
    let env = create_test_server();

    let response = env.server.get("/get/nope").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(leftover_temp_files(&env).is_empty());
}

// ============================================================================
// Setup Script Tests
// ============================================================================

#[tokio::test]
async fn test_download_setup_script() {
    let env = create_test_server();
    std::fs::write(env.root().join("env-build.sh"), b"#!/bin/sh\nsetup\n").unwrap();

    let response = env.server.get("/download/env-build.sh").await;
    response.assert_status_ok();
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"env-build.sh\""
    );
    assert_eq!(response.text(), "#!/bin/sh\nsetup\n");
}

#[tokio::test]
async fn test_download_setup_script_missing() {
    let env = create_test_server();

    let response = env.server.get("/download/env-build.ps1").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>(), json!({ "error": "File not found" }));
}

#[tokio::test]
async fn test_download_unlisted_setup_script() {
    let env = create_test_server();
    std::fs::write(env.root().join("other.sh"), b"nope").unwrap();

    let response = env.server.get("/download/other.sh").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Health Tests
// ============================================================================

#[tokio::test]
async fn test_health() {
    let env = create_test_server();

    let response = env.server.get("/health").await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);

    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}
