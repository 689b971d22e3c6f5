// Error taxonomy for the import pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Fatal import failures.
///
/// Any of these aborts the whole batch. The HTTP layer answers with a
/// generic message and keeps the detail in server-side logs only.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A file's content could not be parsed as headered CSV.
    #[error("failed to decode {file}: {source}")]
    Decode {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// A staged upload could not be read from its temporary path.
    #[error("failed to read {}: {source}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store rejected an operation. The surrounding transaction is
    /// rolled back before this propagates, so no partial writes survive.
    #[error("store operation failed: {0}")]
    Store(#[from] rusqlite::Error),

    /// The caller supplied a source-role list that does not line up with
    /// the uploaded files.
    #[error("expected {expected} source roles, got {actual} files")]
    RoleMismatch { expected: usize, actual: usize },
}
