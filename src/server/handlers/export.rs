//! Download endpoints for raster and spreadsheet exports.
//!
//! A second request for an export that is still running is refused with
//! 409. If the client disconnects, the export is cancelled and nothing is
//! delivered.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::export::raster::export_tree;
use crate::export::sheet::WorkbookSpec;
use crate::export::{CancelToken, ExportOutcome};
use crate::render::{Composer, RenderMode};
use crate::snapshot::load_document;

use super::super::state::AppState;
use super::documents::{stored_document, template_for};
use super::{ApiError, attachment};

/// Cancels the token when the request future is dropped.
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Body for POST /api/export/image.
///
/// Either `documentId` (a saved snapshot) or `templateId` with an optional
/// inline `snapshot`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageExportRequest {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub snapshot: Option<serde_json::Value>,
    /// File name stem; defaults to the document or template id.
    #[serde(default)]
    pub subject: Option<String>,
}

/// POST /api/export/image
pub async fn image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImageExportRequest>,
) -> Result<Response, ApiError> {
    let (doc, template) = match (&req.document_id, &req.template_id) {
        (Some(id), _) => stored_document(&state, id).await?,
        (None, Some(template_id)) => {
            let text = req.snapshot.as_ref().map(|v| v.to_string());
            let doc = load_document(text.as_deref(), template_id, &state.templates);
            let template = template_for(&state, &doc.template_id);
            (doc, template)
        }
        (None, None) => {
            return Err(ApiError::bad_request("Either documentId or templateId is required"));
        }
    };

    let subject = req
        .subject
        .clone()
        .or_else(|| req.document_id.clone())
        .unwrap_or_else(|| doc.template_id.clone());
    let _ticket = state.gate.try_acquire(&format!("image:{}", subject))?;

    let cancel = CancelToken::new();
    let _abandon = CancelOnDrop(cancel.clone());
    let tree = Composer::new(&template).render(&doc, &RenderMode::Frozen);
    let outcome = export_tree(
        state.raster.clone(),
        tree,
        state.images.as_ref(),
        &cancel,
        &subject,
    )
    .await?;
    Ok(deliver(outcome))
}

/// POST /api/export/sheet
pub async fn sheet(
    State(state): State<Arc<AppState>>,
    Json(spec): Json<WorkbookSpec>,
) -> Result<Response, ApiError> {
    if spec.sheets.is_empty() {
        return Err(ApiError::bad_request("Workbook has no sheets"));
    }
    let _ticket = state.gate.try_acquire(&format!("sheet:{}", spec.subject))?;

    let cancel = CancelToken::new();
    let _abandon = CancelOnDrop(cancel.clone());
    let outcome = state
        .sheets
        .export(&spec, state.images.as_ref(), &cancel)
        .await?;
    Ok(deliver(outcome))
}

fn deliver(outcome: ExportOutcome) -> Response {
    match outcome {
        ExportOutcome::Completed(artifact) => attachment(artifact),
        ExportOutcome::Cancelled => StatusCode::NO_CONTENT.into_response(),
    }
}
