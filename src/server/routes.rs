use crate::csv_processor::{CsvStreamReader, Table};
use crate::job::{JobRequest, TranslationJob};
use crate::state::AppState;
use crate::utils::{Result, SheetTranslatorError};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use std::convert::Infallible;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/jobs", post(start_job))
        .route("/download/:name", get(download))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "sheet-translator",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Starts a job and streams its progress as server-sent events.
async fn start_job(State(state): State<AppState>, Json(request): Json<JobRequest>) -> Response {
    let job = TranslationJob::from_request(&request, &state.config.translation);
    tracing::info!(job_id = %job.job_id, input_file = %request.input_file, "Job requested");

    let table = load_upload(&state, &request.input_file).await;
    let events = state
        .runner
        .start(job, table)
        .into_stream()
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.data())));

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

async fn download(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.store.open(&name).await {
        Ok(bytes) => {
            let content_type = if name.ends_with(".csv") {
                "text/csv; charset=utf-8"
            } else {
                "application/octet-stream"
            };
            (
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", name),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(SheetTranslatorError::InvalidArtifactName(_)) => {
            error_response(StatusCode::BAD_REQUEST, "Invalid file name")
        }
        Err(SheetTranslatorError::ArtifactNotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "File not found")
        }
        Err(e) => {
            tracing::error!(artifact = %name, error = %e, "Failed to read artifact");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error reading file")
        }
    }
}

async fn load_upload(state: &AppState, input_file: &str) -> Result<Table> {
    if !is_bare_file_name(input_file) {
        return Err(SheetTranslatorError::Ingestion(format!(
            "Invalid file name '{}'",
            input_file
        )));
    }

    let path = state.config.storage.upload_dir.join(input_file);
    CsvStreamReader::new(path).read_table_async().await
}

fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({"status": "error", "message": message})),
    )
        .into_response()
}
