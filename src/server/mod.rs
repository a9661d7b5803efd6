//! # HTTP Server
//!
//! Serves templates, stores snapshots and uploads, and delivers exports as
//! downloads.
//!
//! ## Usage
//!
//! ```bash
//! vitrine serve --listen 0.0.0.0:8080 --data ./data
//! ```
//!
//! ## Routes
//!
//! | Method | Path | |
//! |--------|------|-|
//! | GET | `/api/templates` | template summaries |
//! | GET | `/api/templates/:id` | full template definition |
//! | GET, PUT | `/api/documents/:id` | load / store a snapshot |
//! | GET | `/api/documents/:id/preview` | frozen render, inline PNG |
//! | POST | `/api/images` | multipart image upload |
//! | GET | `/images/*` | uploaded files |
//! | POST | `/api/export/image` | raster export download |
//! | POST | `/api/export/sheet` | XLSX export download |

mod handlers;
mod state;

pub use handlers::ApiError;
pub use state::{AppState, ServerConfig};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::VitrineError;

/// Upload size limit.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let upload_dir = state.config.upload_dir.clone();
    Router::new()
        // Templates
        .route("/api/templates", get(handlers::templates::list))
        .route("/api/templates/:id", get(handlers::templates::get))
        // Documents
        .route(
            "/api/documents/:id",
            get(handlers::documents::load).put(handlers::documents::save),
        )
        .route(
            "/api/documents/:id/preview",
            get(handlers::documents::preview),
        )
        // Images
        .route(
            "/api/images",
            post(handlers::upload::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .nest_service("/images", ServeDir::new(upload_dir))
        // Exports
        .route("/api/export/image", post(handlers::export::image))
        .route("/api/export/sheet", post(handlers::export::sheet))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use vitrine::config::EngineConfig;
/// use vitrine::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), vitrine::error::VitrineError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
///     upload_dir: "data/images".into(),
///     snapshot_dir: "data/documents".into(),
///     public_base: "http://localhost:8080".to_string(),
///     engine: EngineConfig::default(),
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), VitrineError> {
    let app_state = Arc::new(AppState::new(config.clone())?);
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            VitrineError::Server(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    info!(
        listen = %config.listen_addr,
        uploads = %config.upload_dir.display(),
        snapshots = %config.snapshot_dir.display(),
        "Vitrine HTTP server started"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| VitrineError::Server(format!("Server error: {}", e)))?;

    Ok(())
}
