use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use rax_file_manager::ServerConfig;
use rax_file_manager::server::{AppState, router};

const BOUNDARY: &str = "raxboundary42";

struct TestServer {
    _tmp: TempDir,
    files: PathBuf,
    app: Router,
}

// Helper to build a router over a fresh root
fn setup_with(configure: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let tmp = TempDir::new().unwrap();
    let files = tmp.path().join("files");
    let mut config = ServerConfig::default();
    config.server_root = files.to_string_lossy().into_owned();
    config.staging_dir = Some(tmp.path().join("staging").to_string_lossy().into_owned());
    configure(&mut config);
    let state = AppState::new(config).unwrap();
    TestServer {
        _tmp: tmp,
        files,
        app: router(Arc::new(state)),
    }
}

fn setup() -> TestServer {
    setup_with(|_| {})
}

impl TestServer {
    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(&self, uri: &str, body: Value) -> Response {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn upload(&self, body: Vec<u8>) -> Response {
        self.send(
            Request::post("/api/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// Helper to hand-build a multipart body
fn multipart(path: Option<&str>, files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(path) = path {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"path\"\r\n\r\n{path}\r\n"
            )
            .as_bytes(),
        );
    }
    for (field, filename, content) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn item_names(listing: &Value) -> Vec<String> {
    listing["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_reports_ok() {
    let server = setup();
    let response = server.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn create_folder_then_list() {
    let server = setup();

    let response = server
        .post_json("/api/folders", json!({ "path": "", "name": "docs" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], json!(true));

    fs::write(server.files.join("notes.txt"), b"hello").unwrap();

    let response = server.get("/api/files?path=").await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing = body_json(response).await;
    assert_eq!(listing["success"], json!(true));
    assert_eq!(listing["breadcrumbs"][0]["name"], json!("Root"));
    assert_eq!(item_names(&listing), vec!["docs", "notes.txt"]);
    assert_eq!(listing["items"][0]["type"], json!("folder"));
    assert_eq!(listing["items"][1]["size"], json!(5));

    let response = server
        .post_json("/api/folders", json!({ "path": "", "name": "docs" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("docs"));
}

#[tokio::test]
async fn invalid_folder_names_are_rejected() {
    let server = setup();
    let response = server
        .post_json("/api/folders", json!({ "path": "", "name": "a/b" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!server.files.join("a").exists());
}

#[tokio::test]
async fn rename_preserves_content() {
    let server = setup();
    fs::write(server.files.join("a.txt"), b"payload").unwrap();

    let response = server
        .post_json("/api/rename", json!({ "oldPath": "a.txt", "newName": "b.txt" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!server.files.join("a.txt").exists());

    let response = server.get("/api/download?path=b.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"payload");
}

#[tokio::test]
async fn delete_tree_then_not_found() {
    let server = setup();
    fs::create_dir_all(server.files.join("docs/sub")).unwrap();
    fs::write(server.files.join("docs/sub/a.txt"), b"a").unwrap();

    let response = server.post_json("/api/delete", json!({ "path": "docs" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["deleted_file"], json!("docs"));

    let response = server.get("/api/files?path=docs").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server.post_json("/api/delete", json!({ "path": "docs" })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn escapes_are_forbidden() {
    let server = setup();

    let response = server.get("/api/files?path=../..").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server.post_json("/api/delete", json!({ "path": "../files" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server.get("/api/download?path=../../etc/passwd").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn upload_deduplicates_names() {
    let server = setup();
    let body = multipart(
        Some("docs"),
        &[
            ("files[]", "report.txt", b"first".as_slice()),
            ("files[]", "report.txt", b"second".as_slice()),
        ],
    );

    let response = server.upload(body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["success"], json!(true));
    assert_eq!(report["uploaded"], json!(2));
    assert_eq!(report["uploadedFiles"], json!(["report.txt", "report(1).txt"]));

    assert_eq!(fs::read(server.files.join("docs/report.txt")).unwrap(), b"first".as_slice());
    assert_eq!(fs::read(server.files.join("docs/report(1).txt")).unwrap(), b"second".as_slice());
}

#[tokio::test]
async fn upload_reports_item_failures() {
    let server = setup_with(|config| config.max_file_size_mb = 1);
    let too_big = vec![7u8; 1024 * 1024 + 1];
    let body = multipart(
        None,
        &[
            ("files", "ok.bin", b"fine".as_slice()),
            ("files", "big.bin", too_big.as_slice()),
            ("files", "", b"".as_slice()),
        ],
    );

    let response = server.upload(body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["success"], json!(false));
    assert_eq!(report["uploaded"], json!(1));
    assert_eq!(report["failed"], json!(2));
    assert_eq!(report["errors"][0]["file"], json!("big.bin"));
    assert!(server.files.join("ok.bin").exists());
    assert!(!server.files.join("big.bin").exists());
}

#[tokio::test]
async fn upload_without_files_is_rejected() {
    let server = setup();
    let response = server.upload(multipart(Some("docs"), &[])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_outside_root_is_forbidden() {
    let server = setup();
    let body = multipart(Some("../elsewhere"), &[("files", "a.txt", b"a".as_slice())]);
    let response = server.upload(body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ranged_downloads() {
    let server = setup();
    let bytes: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    fs::write(server.files.join("movie.mp4"), &bytes).unwrap();

    let request = |range: &str| {
        Request::get("/api/download?path=movie.mp4")
            .header(header::RANGE, range)
            .body(Body::empty())
            .unwrap()
    };

    let response = server.send(request("bytes=0-99")).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-99/1000");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(body_bytes(response).await, &bytes[..100]);

    let response = server.send(request("bytes=900-999999")).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 900-999/1000");
    assert_eq!(body_bytes(response).await, &bytes[900..]);

    let response = server.send(request("bytes=1000-1001")).await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1000");
    assert!(body_bytes(response).await.is_empty());

    let response = server.send(request("lines=1-2")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_of_missing_file_is_not_found() {
    let server = setup();
    let response = server.get("/api/download?path=nothing.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_into_a_file_is_rejected() {
    let server = setup();
    fs::write(server.files.join("plain.txt"), b"x").unwrap();
    let body = multipart(Some("plain.txt"), &[("files", "a.txt", b"a".as_slice())]);
    let response = server.upload(body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Not a directory"));
}
