//! HTTP handlers for the server.

pub mod documents;
pub mod export;
pub mod templates;
pub mod upload;

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::VitrineError;
use crate::export::{Artifact, ExportError};
use crate::store::StoreError;

/// Error body: `{"success": false, "error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match e {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::InvalidId(_) => StatusCode::BAD_REQUEST,
            StoreError::Download { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::InFlight(_) => Self::new(StatusCode::CONFLICT, e.to_string()),
            ExportError::Layout(_) => Self::bad_request(e.to_string()),
            ExportError::Store(e) => e.into(),
            _ => Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl From<VitrineError> for ApiError {
    fn from(e: VitrineError) -> Self {
        match e {
            VitrineError::UnknownTemplate(_) => Self::not_found(e.to_string()),
            VitrineError::Store(e) => e.into(),
            VitrineError::Export(e) => e.into(),
            VitrineError::Snapshot(_) | VitrineError::Json(_) => Self::bad_request(e.to_string()),
            _ => Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

/// Deliver an artifact as a file download.
pub fn attachment(artifact: Artifact) -> Response {
    (
        [
            (header::CONTENT_TYPE, artifact.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.filename),
            ),
        ],
        artifact.bytes,
    )
        .into_response()
}
