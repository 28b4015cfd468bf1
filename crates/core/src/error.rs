use thiserror::Error;

/// Failures that abort a whole analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The package bytes could not be opened or extracted as a zip archive.
    #[error("invalid container: {0}")]
    InvalidContainer(String),

    /// No scratch directory could be created under the configured root.
    #[error("cannot create scratch directory under {path}: {source}")]
    Scratch {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The package file could not be stat'ed.
    #[error("cannot read file metadata for {path}: {source}")]
    FileMetadata {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures reading the layout document. Recorded on the structure result,
/// never propagated.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("cannot read layout document: {0}")]
    Io(#[from] std::io::Error),

    #[error("layout document is not valid UTF-16LE: {0}")]
    Decode(String),

    #[error("layout document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error("job {0} has already finished")]
    AlreadyFinished(String),
}
