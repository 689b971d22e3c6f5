// Customer Import Service - Core Library
// Exposes the CSV import pipeline for use in the CLI, API server, and tests

pub mod dates;
pub mod db;
pub mod error;
pub mod merge;
pub mod parser;
pub mod upload;

// Re-export commonly used types
pub use dates::{normalize_date, DateFormatError};
pub use db::{apply_entities, get_all_rows, setup_database, ApplyStats, CustomerRow};
pub use error::ImportError;
pub use merge::{default_roles, merge_sources, MergedEntity, SourceRole};
pub use parser::{decode_records, RawRecord};
pub use upload::{process_upload, ImportSummary, UploadedFile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
