// Customer Import Service - Web Server
// Upload entry point plus a read API over the combined customer table.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use customer_import::{
    default_roles, get_all_rows, process_upload, setup_database, CustomerRow, ImportSummary,
    UploadedFile,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    staging_dir: PathBuf,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn failed(data: T, message: &str) -> Self {
        Self {
            success: false,
            data,
            error: Some(message.to_string()),
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/customers - List all persisted rows
async fn get_customers(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match get_all_rows(&conn) {
        Ok(rows) => (StatusCode::OK, Json(ApiResponse::ok(rows))).into_response(),
        Err(err) => {
            error!(error = %err, "failed to list customers");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failed(
                    Vec::<CustomerRow>::new(),
                    "Error reading customers",
                )),
            )
                .into_response()
        }
    }
}

/// POST /api/import - Accept uploaded CSV files and run the import pipeline
///
/// The real cause of a failure stays in the server logs; the caller only
/// ever sees a generic message.
async fn import_csv(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let files = match stage_multipart(multipart, &state.staging_dir).await {
        Ok(files) => files,
        Err(err) => {
            error!(error = %err, "failed to stage uploaded files");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failed(
                    ImportSummary::default(),
                    "Error processing files",
                )),
            )
                .into_response();
        }
    };

    let roles = default_roles(files.len());
    let mut conn = state.db.lock().unwrap();

    match process_upload(&mut conn, &files, &roles) {
        Ok(summary) => {
            info!(
                files = summary.files,
                entities = summary.entities,
                "import complete"
            );
            (StatusCode::OK, Json(ApiResponse::ok(summary))).into_response()
        }
        Err(err) => {
            error!(error = %err, "import failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failed(
                    ImportSummary::default(),
                    "Error processing files",
                )),
            )
                .into_response()
        }
    }
}

/// Write each multipart part to the staging directory.
///
/// If staging fails partway, the parts already on disk are removed here;
/// once this returns Ok the pipeline owns cleanup.
async fn stage_multipart(
    mut multipart: Multipart,
    staging_dir: &std::path::Path,
) -> anyhow::Result<Vec<UploadedFile>> {
    let mut files: Vec<UploadedFile> = Vec::new();

    let result: anyhow::Result<()> = async {
        while let Some(field) = multipart.next_field().await? {
            let original_name = field
                .file_name()
                .unwrap_or("upload.csv")
                .to_string();
            let bytes = field.bytes().await?;

            let path = staging_dir.join(format!("{}-{}", uuid::Uuid::new_v4(), original_name));
            fs::write(&path, &bytes)?;
            files.push(UploadedFile {
                original_name,
                path,
            });
        }
        Ok(())
    }
    .await;

    if let Err(err) = result {
        for file in &files {
            if let Err(remove_err) = fs::remove_file(&file.path) {
                warn!(
                    path = %file.path.display(),
                    error = %remove_err,
                    "failed to remove partially staged upload"
                );
            }
        }
        return Err(err);
    }

    Ok(files)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let db_path = std::env::var("CUSTOMER_DB").unwrap_or_else(|_| "customers.db".to_string());
    let staging_dir =
        PathBuf::from(std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()));
    fs::create_dir_all(&staging_dir)?;

    let conn = Connection::open(&db_path)?;
    setup_database(&conn)?;
    info!(db = %db_path, "database ready");

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        staging_dir,
    };

    let app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/customers", get(get_customers))
        .route("/api/import", post(import_csv))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
