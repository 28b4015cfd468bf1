//! Upload-and-poll HTTP transport.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness and version |
//! | `POST` | `/upload` | Multipart upload (field `file`), starts a job |
//! | `GET`  | `/api/status/{id}` | Job status and progress |
//! | `GET`  | `/api/results/{id}` | Analysis result of a completed job |
//! | `GET`  | `/api/jobs` | All jobs, newest first |
//!
//! Errors are returned as `{ "error": "..." }`.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{
        multipart::{Field, MultipartError},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use pbix_audit_core::config::Config;
use pbix_audit_core::jobs::{run_job, JobId, JobStatus, JobStore};
use pbix_audit_core::AnalyzeOptions;

const ALLOWED_EXTENSION: &str = "pbix";
const FALLBACK_FILENAME: &str = "upload.pbix";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jobs: JobStore,
    workers: Arc<Semaphore>,
    analyze: Arc<AnalyzeOptions>,
}

impl AppState {
    pub fn new(config: Config, jobs: JobStore) -> Self {
        let analyze = AnalyzeOptions {
            scratch_root: config.scratch_dir.clone(),
        };
        Self {
            workers: Arc::new(Semaphore::new(config.workers.max(1))),
            analyze: Arc::new(analyze),
            config: Arc::new(config),
            jobs,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/api/status/{id}", get(job_status))
        .route("/api/results/{id}", get(job_results))
        .route("/api/jobs", get(list_jobs))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("create upload dir {}", config.upload_dir.display()))?;
    if let Some(scratch) = &config.scratch_dir {
        tokio::fs::create_dir_all(scratch)
            .await
            .with_context(|| format!("create scratch dir {}", scratch.display()))?;
    }

    let bind = config.server.bind.clone();
    let state = AppState::new(config, JobStore::new());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(%bind, "pbix-audit listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;
    Ok(())
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Job not found".to_string(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Serialize)]
struct UploadResponse {
    id: JobId,
    status_url: String,
    results_url: String,
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        if original.is_empty() {
            return Err(ApiError::bad_request("No file selected"));
        }
        if !allowed_file(&original) {
            return Err(ApiError::bad_request("Please upload a .pbix file"));
        }

        let filename = secure_filename(&original);
        let upload_dir = state.config.upload_dir.clone();
        let job = state.jobs.create_with(filename.clone(), |id| {
            let stored = format!(
                "{}_{}_{}",
                chrono::Local::now().format("%Y%m%d_%H%M%S"),
                id,
                filename
            );
            upload_dir.join(stored)
        });

        let bytes = match store_upload(field, &job.file_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                state.jobs.remove(&job.id);
                return Err(e);
            }
        };
        info!(job = %job.id, file = %job.filename, bytes, "upload accepted");
        spawn_analysis(&state, job.id.clone());

        return Ok((
            StatusCode::ACCEPTED,
            Json(UploadResponse {
                status_url: format!("/api/status/{}", job.id),
                results_url: format!("/api/results/{}", job.id),
                id: job.id,
            }),
        ));
    }

    Err(ApiError::bad_request("No file selected"))
}

/// Streams one multipart field to `path`. A partially written file is
/// removed when the body or the disk fails mid-stream.
async fn store_upload(mut field: Field<'_>, path: &std::path::Path) -> Result<u64, ApiError> {
    let mut file = tokio::fs::File::create(path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "failed to create upload file");
        ApiError::internal("failed to store upload")
    })?;

    let mut written: u64 = 0;
    let outcome: Result<(), ApiError> = async {
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await.map_err(|e| {
                warn!(path = %path.display(), error = %e, "failed to write upload");
                ApiError::internal("failed to store upload")
            })?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to flush upload");
            ApiError::internal("failed to store upload")
        })
    }
    .await;

    if let Err(e) = outcome {
        drop(file);
        let _ = tokio::fs::remove_file(path).await;
        return Err(e);
    }
    Ok(written)
}

/// Queues the job behind the worker semaphore and runs it on the blocking
/// pool.
fn spawn_analysis(state: &AppState, id: JobId) {
    let state = state.clone();
    tokio::spawn(async move {
        let Ok(_permit) = state.workers.clone().acquire_owned().await else {
            warn!(job = %id, "worker pool closed");
            return;
        };

        let jobs = state.jobs.clone();
        let opts = state.analyze.clone();
        let job_id = id.clone();
        let outcome = tokio::task::spawn_blocking(move || run_job(&jobs, &job_id, &opts)).await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(job = %id, error = %e, "job update rejected"),
            Err(e) => {
                warn!(job = %id, error = %e, "analysis worker failed");
                let _ = state.jobs.fail(&id, format!("analysis worker failed: {e}"));
            }
        }
    });
}

async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job = state.jobs.get(&id).ok_or_else(ApiError::not_found)?;
    Ok(Json(json!({
        "status": job.status,
        "progress": job.progress,
        "error": job.error,
        "completed": job.status == JobStatus::Completed,
    })))
}

async fn job_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let job = state.jobs.get(&id).ok_or_else(ApiError::not_found)?;
    match (job.status, job.results) {
        (JobStatus::Completed, Some(results)) => Ok(Json(results).into_response()),
        (status, _) => Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "error": job.error.unwrap_or_else(|| "Job not completed".to_string()),
                "status": status,
            })),
        )
            .into_response()),
    }
}

async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.jobs.list())
}

fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(ALLOWED_EXTENSION))
}

/// Reduces an uploaded file name to `[A-Za-z0-9._-]`, without leading dots or
/// underscores and without any directory part.
fn secure_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches(['.', '_']);
    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}
