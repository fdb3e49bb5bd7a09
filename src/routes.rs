use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use include_dir::{include_dir, Dir};
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::{Any, CorsLayer};

use crate::models::{RawSubmission, Service, ServiceInfo, StreamFrame, UploadedFile};
use crate::pipeline::{ChannelSink, Pipeline, ProgressLog};

static STATIC_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Room for a 2MB image plus form overhead, so oversize files reach the
/// validator instead of being cut off by the extractor.
const BODY_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/*path", get(static_asset))
        .route("/health", get(health))
        .route("/api/services", get(list_services))
        .route("/api/generate", post(generate_stream))
        .route("/api/generate/report", post(generate_report))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

fn mime_for(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn embedded(path: &str) -> Response {
    match STATIC_DIR.get_file(path) {
        Some(file) => ([(header::CONTENT_TYPE, mime_for(path))], file.contents()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn index() -> Response {
    embedded("index.html")
}

pub async fn static_asset(Path(path): Path<String>) -> Response {
    embedded(&path)
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn list_services() -> Json<Vec<ServiceInfo>> {
    Json(Service::ALL.into_iter().map(ServiceInfo::from).collect())
}

/// Reads the Generate form. Unknown fields are ignored; an empty file part
/// (no file chosen) counts as no file.
async fn read_submission(mut multipart: Multipart) -> Result<RawSubmission, (StatusCode, String)> {
    let bad_request = |e: axum::extract::multipart::MultipartError| (e.status(), e.body_text());
    let mut raw = RawSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "api_key" => raw.api_key = field.text().await.map_err(bad_request)?,
            "service" => raw.service = Some(field.text().await.map_err(bad_request)?),
            "prompt" => raw.prompt = Some(field.text().await.map_err(bad_request)?),
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_request)?;
                if !bytes.is_empty() {
                    raw.image = Some(UploadedFile { file_name, bytes });
                }
            }
            other => tracing::debug!("Ignoring form field '{}'", other),
        }
    }
    Ok(raw)
}

/// Runs the pipeline and streams NDJSON: one `progress` line per step, then
/// the `report` line.
pub async fn generate_stream(State(state): State<AppState>, multipart: Multipart) -> Response {
    let raw = match read_submission(multipart).await {
        Ok(raw) => raw,
        Err(rejection) => return rejection.into_response(),
    };

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        let sink = ChannelSink::new(tx);
        let report = state.pipeline.run(raw, &sink).await;
        sink.send_frame(&StreamFrame::Report(report));
    });

    (
        [(header::CONTENT_TYPE, "application/x-ndjson"), (header::CACHE_CONTROL, "no-cache")],
        Body::from_stream(UnboundedReceiverStream::new(rx)),
    )
        .into_response()
}

/// Same run, answered as a single JSON document with the progress log attached.
pub async fn generate_report(State(state): State<AppState>, multipart: Multipart) -> Response {
    let raw = match read_submission(multipart).await {
        Ok(raw) => raw,
        Err(rejection) => return rejection.into_response(),
    };

    let log = ProgressLog::default();
    let mut report = state.pipeline.run(raw, &log).await;
    report.progress = Some(log.events());
    Json(report).into_response()
}
