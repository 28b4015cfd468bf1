pub mod config;
pub mod error;
pub mod jobs;
pub mod parser;
pub mod report;
pub mod rules;
pub mod types;
pub mod unpack;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    error::AnalysisError,
    report::{AnalysisReport, AnalysisResult},
    rules::recommend,
    types::{FileInfo, Grade, PerformanceResult},
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
/// Seconds of load time estimated per megabyte.
const LOAD_SECONDS_PER_MB: f64 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Parent for scratch directories; the system temp dir when `None`.
    pub scratch_root: Option<PathBuf>,
}

/// Analyzes the package at `package`.
///
/// Never returns an error to the caller: metadata and container failures come
/// back as [`AnalysisResult::Failure`], layout problems are recorded inside
/// the structure result. The scratch directory is gone when this returns.
pub fn analyze_package(package: &Path, opts: &AnalyzeOptions) -> AnalysisResult {
    match try_analyze(package, opts) {
        Ok(report) => AnalysisResult::Success(Box::new(report)),
        Err(e) => {
            info!(package = %package.display(), error = %e, "analysis failed");
            AnalysisResult::failure(e)
        }
    }
}

fn try_analyze(package: &Path, opts: &AnalyzeOptions) -> Result<AnalysisReport, AnalysisError> {
    let (file_info, size_mb) = file_info(package)?;

    let scratch = unpack::unpack(package, opts.scratch_root.as_deref())?;
    let structure = parser::analyze_structure(scratch.path());
    scratch.release();

    let performance = score_performance(size_mb);
    let recommendations = recommend(&performance, &structure);

    debug!(
        package = %package.display(),
        pages = structure.page_count,
        visuals = structure.visual_count,
        grade = %performance.performance_grade,
        "analysis complete"
    );

    Ok(AnalysisReport {
        file_info,
        structure,
        performance,
        recommendations,
    })
}

/// Reads name, size and modification time. Also returns the unrounded size
/// in MiB, which is what scoring works from.
pub fn file_info(package: &Path) -> Result<(FileInfo, f64), AnalysisError> {
    let meta = std::fs::metadata(package).map_err(|source| AnalysisError::FileMetadata {
        path: package.display().to_string(),
        source,
    })?;
    let modified = meta
        .modified()
        .map_err(|source| AnalysisError::FileMetadata {
            path: package.display().to_string(),
            source,
        })?;

    let size_mb = meta.len() as f64 / BYTES_PER_MB;
    let name = package
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok((
        FileInfo {
            name,
            size_mb: round_to(size_mb, 2),
            modified: DateTime::<Utc>::from(modified),
        },
        size_mb,
    ))
}

/// Grades a package by size alone. Thresholds use strict `>`.
pub fn score_performance(size_mb: f64) -> PerformanceResult {
    let (size_score, performance_grade) = if size_mb > 100.0 {
        (40, Grade::D)
    } else if size_mb > 50.0 {
        (60, Grade::C)
    } else if size_mb > 25.0 {
        (80, Grade::B)
    } else {
        (100, Grade::A)
    };

    PerformanceResult {
        file_size_mb: round_to(size_mb, 2),
        size_score,
        estimated_load_time: round_to(size_mb * LOAD_SECONDS_PER_MB, 1),
        performance_grade,
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
