//! Extraction of a package into a private scratch directory.

use std::{fs::File, io::BufReader, path::Path};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::AnalysisError;

const SCRATCH_PREFIX: &str = "pbix-audit-";

/// Extraction target owned by exactly one analysis.
///
/// The directory is removed recursively when the value is dropped; removal
/// errors are ignored at that point.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the directory now, logging rather than returning a failure.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(path = %path.display(), error = %e, "failed to remove scratch directory");
        }
    }
}

/// Opens `package` as a zip archive and extracts every entry into a fresh
/// directory under `scratch_root` (the system temp dir when `None`).
///
/// The file extension is not checked. No entry count or size limits apply.
pub fn unpack(package: &Path, scratch_root: Option<&Path>) -> Result<ScratchDir, AnalysisError> {
    let file = File::open(package)
        .map_err(|e| AnalysisError::InvalidContainer(format!("{}: {e}", package.display())))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| AnalysisError::InvalidContainer(e.to_string()))?;

    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX);
    let root = scratch_root
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);
    let dir = builder
        .tempdir_in(&root)
        .map_err(|source| AnalysisError::Scratch {
            path: root.display().to_string(),
            source,
        })?;

    debug!(
        package = %package.display(),
        entries = archive.len(),
        scratch = %dir.path().display(),
        "extracting package"
    );

    // On error `dir` is dropped here, which removes the partial extraction.
    archive
        .extract(dir.path())
        .map_err(|e| AnalysisError::InvalidContainer(e.to_string()))?;

    Ok(ScratchDir { dir })
}
