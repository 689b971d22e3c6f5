// Customer Import Service - CLI driver
// Stages CSV files into the uploads directory and runs the import pipeline.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;
use std::fs;
use std::path::Path;

use customer_import::{default_roles, process_upload, setup_database, UploadedFile};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("usage: customer-import <database> <csv-file>...");
    }

    let db_path = Path::new(&args[1]);
    let inputs: Vec<&Path> = args[2..].iter().map(Path::new).collect();

    let mut conn = Connection::open(db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    setup_database(&conn)?;

    // The pipeline consumes (and deletes) its inputs, so stage copies the
    // same way the HTTP layer stages multipart parts.
    let staging = Path::new("uploads");
    fs::create_dir_all(staging).context("failed to create uploads directory")?;

    let mut files = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let original_name = input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        let staged = staging.join(format!("{}-{}", uuid::Uuid::new_v4(), original_name));
        fs::copy(input, &staged)
            .with_context(|| format!("failed to stage {}", input.display()))?;
        files.push(UploadedFile {
            original_name,
            path: staged,
        });
    }

    let roles = default_roles(files.len());
    let summary = process_upload(&mut conn, &files, &roles)?;

    println!(
        "Imported {} file(s): {} entities ({} inserted, {} updated)",
        summary.files, summary.entities, summary.inserted, summary.updated
    );

    Ok(())
}
