use std::path::PathBuf;

/// Failure modes of the export pipeline.
///
/// Composition-time errors (`TemplateNotFound`, `UnknownCapability`) abort
/// an export before any file is written. Validation never produces one of
/// these — it reports problems through [`crate::validate::ValidationReport`]
/// instead.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A fragment name was looked up that the library does not hold.
    #[error("unknown workflow template: {0}")]
    TemplateNotFound(String),

    /// A requested capability maps to a fragment absent from the library.
    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    /// Writing the workflow file failed.
    #[error("failed to write workflow to {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or decoding an existing workflow file failed.
    #[error("failed to parse workflow at {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}
