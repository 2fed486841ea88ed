use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

use crate::client::{HttpProcessingService, ProcessingService, Upload};
use crate::config::Config;
use crate::downloader::{download_filename, to_csv};
use crate::error::ViewerError;
use crate::flow::{FlowState, UploadFlow};
use crate::notify::{Notification, NotificationQueue, Notifier};
use crate::record::DatasetKind;
use crate::render::{PageView, RenderMode, Renderer};

pub struct AppState {
    flow: UploadFlow,
    notifications: Arc<NotificationQueue>,
    renderer: Renderer,
    render_mode: RenderMode,
}

impl AppState {
    pub fn new(
        service: Arc<dyn ProcessingService>,
        config: &Config,
    ) -> Result<Self, ViewerError> {
        let notifications = Arc::new(NotificationQueue::new());
        let flow = UploadFlow::new(service, notifications.clone(), config.flow_options());
        Ok(AppState {
            flow,
            notifications,
            renderer: Renderer::new()?,
            render_mode: config.render_mode,
        })
    }

    pub fn flow(&self) -> &UploadFlow {
        &self.flow
    }
}

#[derive(Deserialize)]
struct PageQuery {
    view: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    state: FlowState,
    seq: u64,
    file_name: Option<String>,
    issues: Option<usize>,
    merge_requests: Option<usize>,
    comments: Option<usize>,
    has_summary: bool,
    report_url: Option<String>,
    error: Option<String>,
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(serve_page))
        .route("/upload", post(upload_archive))
        .route("/reset", post(reset_view))
        .route("/document/:kind", get(serve_document))
        .route("/download/:kind", get(download_csv))
        .route("/api/status", get(get_status))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let service = HttpProcessingService::new(&config.base_url, config.timeout)?;
    let app_state = Arc::new(AppState::new(Arc::new(service), &config)?);
    let app = router(app_state, config.max_upload_bytes);

    let listener = TcpListener::bind(&config.bind).await?;
    info!(
        "Listening on http://{} (processing service {}, {:?} mode, {:?} source)",
        config.bind, config.base_url, config.render_mode, config.data_source
    );
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_page(
    Query(params): Query<PageQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let selected = params.view.as_deref().and_then(|v| v.parse::<DatasetKind>().ok());
    let view = state.flow.snapshot();
    // While uploading, notifications wait for the page that shows the result
    let notifications = if view.is_loading() {
        Vec::new()
    } else {
        state.notifications.drain()
    };

    let page = PageView::build(&view, notifications, state.render_mode, selected);
    match state.renderer.render_page(&page) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("cannot render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

async fn upload_archive(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Redirect {
    let mut upload = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let file_name = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some(Upload::new(file_name, bytes.to_vec())),
                    Err(e) => {
                        warn!("failed to read uploaded file: {}", e);
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("malformed upload: {}", e);
                break;
            }
        }
    }

    // The processing service decides what it accepts, empty files included
    let Some(upload) = upload else {
        state
            .notifications
            .notify(Notification::failure("Upload failed: no file selected"));
        return Redirect::to("/");
    };

    if let Some(ticket) = state.flow.begin(&upload.file_name) {
        let flow = state.flow.clone();
        tokio::spawn(async move {
            flow.run(ticket, upload).await;
        });
    }

    Redirect::to("/")
}

async fn reset_view(State(state): State<Arc<AppState>>) -> Redirect {
    state.flow.reset();
    Redirect::to("/")
}

fn parse_kind(kind: &str) -> Result<DatasetKind, (StatusCode, String)> {
    kind.parse::<DatasetKind>()
        .map_err(|e| (StatusCode::NOT_FOUND, e))
}

async fn serve_document(
    Path(kind): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, (StatusCode, String)> {
    let kind = parse_kind(&kind)?;
    let view = state.flow.snapshot();
    let datasets = view
        .datasets
        .ok_or((StatusCode::NOT_FOUND, "No data has been processed yet".to_string()))?;

    let download_href = format!("/download/{}", kind.slug());
    state
        .renderer
        .render_document(datasets.get(kind), kind.title(), Some(&download_href))
        .map(Html)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn download_csv(
    Path(kind): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, (StatusCode, String)> {
    let kind = parse_kind(&kind)?;
    let view = state.flow.snapshot();
    let datasets = view
        .datasets
        .ok_or((StatusCode::NOT_FOUND, "No data has been processed yet".to_string()))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download_filename(kind.title())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        to_csv(datasets.get(kind)),
    )
        .into_response())
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let view = state.flow.snapshot();
    let count = |kind: DatasetKind| view.datasets.as_ref().map(|d| d.get(kind).len());

    Json(StatusResponse {
        state: view.state,
        seq: view.seq,
        file_name: view.file_name.clone(),
        issues: count(DatasetKind::Issues),
        merge_requests: count(DatasetKind::MergeRequests),
        comments: count(DatasetKind::Comments),
        has_summary: view.summary.is_some(),
        report_url: view.report_url.clone(),
        error: view.error.clone(),
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
