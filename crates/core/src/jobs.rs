//! In-memory job registry for the upload-and-poll transport.
//!
//! A [`JobStore`] is cheap to clone and is handed to whatever drives the
//! jobs; it is not global state. Each job receives exactly one terminal write
//! (`complete` or `fail`).

use std::{
    collections::HashMap,
    panic::AssertUnwindSafe,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::{analyze_package, error::JobError, report::AnalysisResult, AnalyzeOptions};

pub type JobId = String;

const JOB_ID_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploaded,
    Analyzing,
    GeneratingReport,
    Completed,
    Error,
}

impl JobStatus {
    pub fn progress(&self) -> u8 {
        match self {
            JobStatus::Uploaded => 0,
            JobStatus::Analyzing => 20,
            JobStatus::GeneratingReport => 80,
            JobStatus::Completed => 100,
            JobStatus::Error => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub filename: String,
    pub file_path: PathBuf,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Option<AnalysisResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub filename: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, filename: impl Into<String>, file_path: impl Into<PathBuf>) -> Job {
        let file_path = file_path.into();
        self.create_with(filename, |_| file_path)
    }

    /// Draws a fresh id and registers the job under a single write lock.
    /// `file_path` receives the id so uploads can be named after it.
    pub fn create_with(
        &self,
        filename: impl Into<String>,
        file_path: impl FnOnce(&str) -> PathBuf,
    ) -> Job {
        let mut jobs = self.jobs.write();
        let id = loop {
            let mut id = uuid::Uuid::new_v4().simple().to_string();
            id.truncate(JOB_ID_LEN);
            if !jobs.contains_key(&id) {
                break id;
            }
        };

        let job = Job {
            file_path: file_path(&id),
            id: id.clone(),
            filename: filename.into(),
            status: JobStatus::Uploaded,
            progress: JobStatus::Uploaded.progress(),
            created_at: Utc::now(),
            completed_at: None,
            results: None,
            error: None,
        };
        jobs.insert(id, job.clone());
        job
    }

    /// Drops a job that never started, e.g. when its upload failed.
    pub fn remove(&self, id: &str) -> Option<Job> {
        self.jobs.write().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().get(id).cloned()
    }

    /// Newest first.
    pub fn list(&self) -> Vec<JobSummary> {
        let mut out: Vec<JobSummary> = self
            .jobs
            .read()
            .values()
            .map(|j| JobSummary {
                id: j.id.clone(),
                filename: j.filename.clone(),
                status: j.status,
                created_at: j.created_at,
            })
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mark_analyzing(&self, id: &str) -> Result<(), JobError> {
        self.advance(id, JobStatus::Analyzing)
    }

    pub fn mark_generating_report(&self, id: &str) -> Result<(), JobError> {
        self.advance(id, JobStatus::GeneratingReport)
    }

    pub fn complete(&self, id: &str, results: AnalysisResult) -> Result<(), JobError> {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.progress = JobStatus::Completed.progress();
            job.results = Some(results);
            job.completed_at = Some(Utc::now());
        })
    }

    pub fn fail(&self, id: &str, message: impl Into<String>) -> Result<(), JobError> {
        let message = message.into();
        self.update(id, |job| {
            job.status = JobStatus::Error;
            job.progress = JobStatus::Error.progress();
            job.error = Some(message);
        })
    }

    fn advance(&self, id: &str, status: JobStatus) -> Result<(), JobError> {
        self.update(id, |job| {
            job.status = status;
            job.progress = status.progress();
        })
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut Job)) -> Result<(), JobError> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;
        if job.status.is_terminal() {
            return Err(JobError::AlreadyFinished(id.to_string()));
        }
        f(job);
        Ok(())
    }
}

/// Runs the analysis for job `id` through the progress checkpoints.
pub fn run_job(store: &JobStore, id: &str, opts: &AnalyzeOptions) -> Result<(), JobError> {
    run_job_with(store, id, |path| analyze_package(path, opts))
}

/// Like [`run_job`] with the analysis step supplied by the caller. A panic in
/// `analyze` marks the job as failed instead of unwinding into the caller.
pub fn run_job_with<F>(store: &JobStore, id: &str, analyze: F) -> Result<(), JobError>
where
    F: FnOnce(&Path) -> AnalysisResult,
{
    let job = store
        .get(id)
        .ok_or_else(|| JobError::NotFound(id.to_string()))?;

    store.mark_analyzing(id)?;
    info!(job = id, file = %job.file_path.display(), "analyzing");

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| analyze(&job.file_path)));
    let results = match outcome {
        Ok(results) => results,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(job = id, error = %message, "analysis panicked");
            return store.fail(id, message);
        }
    };

    store.mark_generating_report(id)?;
    store.complete(id, results)?;
    info!(job = id, "completed");
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("analysis panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("analysis panicked: {s}")
    } else {
        "analysis panicked".to_string()
    }
}
