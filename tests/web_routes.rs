#![cfg(feature = "web")]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use export_viewer::app::{router, AppState};
use export_viewer::client::{join_url, Manifest, ManifestFiles, ProcessingService, Upload};
use export_viewer::config::Config;
use export_viewer::loader::Decoder;
use export_viewer::render::RenderMode;
use export_viewer::{FlowState, ViewerError};

const BOUNDARY: &str = "viewer-test-boundary";

struct StaticService;

#[async_trait]
impl ProcessingService for StaticService {
    async fn process(&self, _upload: Upload) -> Result<Manifest, ViewerError> {
        Ok(Manifest {
            message: Some("Processed successfully".to_string()),
            files: ManifestFiles {
                issues: Some("out/issues.csv".to_string()),
                merge_requests: Some("out/mr.csv".to_string()),
                comments: Some("out/comments.csv".to_string()),
                gitstats: None,
            },
        })
    }

    async fn fetch_text(&self, path: &str) -> Result<String, ViewerError> {
        Ok(match path {
            "out/issues.csv" => "title,notes\nCrash,\"first\nsecond\"\nLeak,<none>\n",
            "out/mr.csv" => "title\nFix crash\n",
            _ => "type,comment\nIssue,\"a, b\"\n",
        }
        .to_string())
    }

    fn resolve(&self, path: &str) -> String {
        join_url("http://svc", path)
    }
}

fn app(mode: RenderMode) -> (Router, Arc<AppState>) {
    // Issues carry a quoted line break, which only the library decoder joins
    let config = Config {
        render_mode: mode,
        decoder: Decoder::Library,
        ..Config::default()
    };
    let state = Arc::new(AppState::new(Arc::new(StaticService), &config).unwrap());
    (router(state.clone(), config.max_upload_bytes), state)
}

fn upload_request(file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/gzip\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn wait_until_settled(state: &AppState) {
    for _ in 0..200 {
        if state.flow().state() != FlowState::Uploading {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("upload did not finish");
}

#[tokio::test]
async fn test_upload_then_browse_popup_documents() {
    let (app, state) = app(RenderMode::Popup);

    let (status, page) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("GitLab Export Viewer"));
    assert!(page.contains("accept=\".zip,.tar,.gz,.7z\""));

    let response = app
        .clone()
        .oneshot(upload_request("export.tar.gz", b"archive bytes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    wait_until_settled(&state).await;
    assert_eq!(state.flow().state(), FlowState::Succeeded);

    let (_, page) = get(&app, "/").await;
    assert!(page.contains("Repository analytics generated successfully"));
    assert!(page.contains("/document/issues"));

    // Notifications are shown once
    let (_, page) = get(&app, "/").await;
    assert!(!page.contains("Repository analytics generated successfully"));

    let (status, document) = get(&app, "/document/issues").await;
    assert_eq!(status, StatusCode::OK);
    assert!(document.contains("<thead>"));
    assert!(document.contains("first<br>second"));
    assert!(document.contains("&lt;none&gt;"));
}

#[tokio::test]
async fn test_download_serves_csv_attachment() {
    let (app, state) = app(RenderMode::Popup);
    app.clone()
        .oneshot(upload_request("export.zip", b"zip"))
        .await
        .unwrap();
    wait_until_settled(&state).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/download/comments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Comments.csv\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"type,comment\nIssue,\"a, b\"\n");
}

#[tokio::test]
async fn test_in_page_mode_shows_selected_table() {
    let (app, state) = app(RenderMode::InPage);
    app.clone()
        .oneshot(upload_request("export.zip", b"zip"))
        .await
        .unwrap();
    wait_until_settled(&state).await;

    let (_, page) = get(&app, "/?view=merge-requests").await;
    assert!(page.contains("<td>Fix crash</td>"));
    assert!(!page.contains("<td>Crash</td>"));

    let (_, page) = get(&app, "/").await;
    assert!(!page.contains("<td>"));
}

#[tokio::test]
async fn test_documents_missing_before_upload() {
    let (app, _state) = app(RenderMode::Popup);

    let (status, _) = get(&app, "/document/issues").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/download/commits").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_file_is_forwarded() {
    let (app, state) = app(RenderMode::Popup);

    let response = app
        .clone()
        .oneshot(upload_request("empty.zip", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    wait_until_settled(&state).await;
    assert_eq!(state.flow().state(), FlowState::Succeeded);
    assert_eq!(state.flow().snapshot().file_name.as_deref(), Some("empty.zip"));
}

#[tokio::test]
async fn test_form_without_file_part_is_rejected() {
    let (app, state) = app(RenderMode::Popup);

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"comment\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(state.flow().state(), FlowState::Idle);

    let (_, page) = get(&app, "/").await;
    assert!(page.contains("no file selected"));
}

#[tokio::test]
async fn test_status_and_reset() {
    let (app, state) = app(RenderMode::Popup);
    app.clone()
        .oneshot(upload_request("export.zip", b"zip"))
        .await
        .unwrap();
    wait_until_settled(&state).await;

    let (status, body) = get(&app, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["state"], "succeeded");
    assert_eq!(json["issues"], 2);
    assert_eq!(json["merge_requests"], 1);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let (_, body) = get(&app, "/api/status").await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["state"], "idle");
    assert!(json["issues"].is_null());

    let (status, _) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}
