//! Template listing.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::sync::Arc;

use crate::template::{TemplateDefinition, TemplateRegistry};

use super::super::state::AppState;
use super::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub section_count: usize,
    pub slot_count: usize,
}

/// GET /api/templates
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<TemplateSummary>> {
    let summaries = state
        .templates
        .ids()
        .into_iter()
        .filter_map(|id| state.templates.get(id))
        .map(|t| TemplateSummary {
            id: t.id.clone(),
            name: t.name.clone(),
            section_count: t.sections.len(),
            slot_count: t.slots.len(),
        })
        .collect();
    Json(summaries)
}

/// GET /api/templates/:id
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TemplateDefinition>, ApiError> {
    state
        .templates
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Unknown template: {}", id)))
}
