// Upload orchestration: decode, reconcile, apply, clean up

use crate::db::apply_entities;
use crate::error::ImportError;
use crate::merge::{merge_sources, SourceRole};
use crate::parser::decode_records;
use rusqlite::Connection;
use serde::Serialize;
use std::fs::{self, File};
use std::path::PathBuf;
use tracing::{info, warn};

/// One uploaded file as handed over by the transport layer: the filename
/// the client sent plus the staged temporary path on disk.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub path: PathBuf,
}

/// What one successful import did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub files: usize,
    pub entities: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// Removes the staged upload files when dropped, so cleanup happens on
/// every exit path, error or not.
struct StagedFiles<'a> {
    files: &'a [UploadedFile],
}

impl Drop for StagedFiles<'_> {
    fn drop(&mut self) {
        for file in self.files {
            if let Err(err) = fs::remove_file(&file.path) {
                warn!(
                    path = %file.path.display(),
                    error = %err,
                    "failed to remove staged upload"
                );
            }
        }
    }
}

/// Run the full import pipeline: decode every staged file, reconcile the
/// per-file record sets into one entity set, and apply it to the store as
/// a single all-or-nothing transaction.
///
/// `roles` assigns each file its part in identity resolution, one entry
/// per file in upload order (see [`crate::merge::default_roles`] for the
/// usual layout). The staged files are deleted whichever way this returns.
pub fn process_upload(
    conn: &mut Connection,
    files: &[UploadedFile],
    roles: &[SourceRole],
) -> Result<ImportSummary, ImportError> {
    let _staged = StagedFiles { files };

    if roles.len() != files.len() {
        return Err(ImportError::RoleMismatch {
            expected: roles.len(),
            actual: files.len(),
        });
    }

    let mut sources = Vec::with_capacity(files.len());
    for (file, role) in files.iter().zip(roles) {
        info!(file = %file.original_name, "decoding upload");
        let handle = File::open(&file.path).map_err(|source| ImportError::Io {
            file: file.path.clone(),
            source,
        })?;
        let records = decode_records(handle, &file.original_name)?;
        sources.push((*role, records));
    }

    let entities = merge_sources(&sources);
    info!(entities = entities.len(), "reconciled entity set");

    let stats = apply_entities(conn, &entities)?;

    Ok(ImportSummary {
        files: files.len(),
        entities: entities.len(),
        inserted: stats.inserted,
        updated: stats.updated,
    })
}
