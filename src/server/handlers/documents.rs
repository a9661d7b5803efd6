//! Snapshot persistence and inline previews.

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::document::Document;
use crate::export::CancelToken;
use crate::export::raster::export_tree;
use crate::render::{Composer, RenderMode};
use crate::snapshot::{self, Snapshot, load_document};
use crate::template::{TemplateDefinition, TemplateRegistry};

use super::super::state::AppState;
use super::ApiError;

/// GET /api/documents/:id
pub async fn load(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Snapshot>, ApiError> {
    state
        .snapshots
        .load(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No document saved as {}", id)))
}

/// PUT /api/documents/:id - store a snapshot.
///
/// The body is read leniently and normalized through the document model, so
/// what is stored always deserializes cleanly.
pub async fn save(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let incoming = Snapshot::parse_lenient(&body);
    if incoming.template_id.is_empty() {
        return Err(ApiError::bad_request("Snapshot has no templateId"));
    }
    let doc = load_document(Some(body.as_str()), &incoming.template_id, &state.templates);
    let normalized = snapshot::serialize(&doc);
    state.snapshots.save(&id, &normalized).await?;
    info!(id, template = %doc.template_id, "Saved document");
    Ok(Json(json!({
        "success": true,
        "id": id,
        "templateId": doc.template_id,
    })))
}

/// GET /api/documents/:id/preview - frozen render as an inline PNG.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (doc, template) = stored_document(&state, &id).await?;
    let tree = Composer::new(&template).render(&doc, &RenderMode::Frozen);
    let outcome = export_tree(
        state.preview.clone(),
        tree,
        state.images.as_ref(),
        &CancelToken::new(),
        &id,
    )
    .await?;
    match outcome.artifact() {
        Some(artifact) => Ok((
            [(header::CONTENT_TYPE, artifact.content_type)],
            artifact.bytes,
        )
            .into_response()),
        None => Err(ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "Preview abandoned",
        )),
    }
}

/// Load a saved document with its template.
pub async fn stored_document(
    state: &AppState,
    id: &str,
) -> Result<(Document, TemplateDefinition), ApiError> {
    let snapshot = state
        .snapshots
        .load(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No document saved as {}", id)))?;
    let template = template_for(state, &snapshot.template_id);
    let doc = snapshot::deserialize(&snapshot, &template);
    Ok((doc, template))
}

pub fn template_for(state: &AppState, id: &str) -> TemplateDefinition {
    state
        .templates
        .get(id)
        .cloned()
        .unwrap_or_else(|| TemplateDefinition::empty(id))
}
