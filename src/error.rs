//! # Error Types
//!
//! This module defines error types used throughout the vitrine library.
//! Export- and store-specific errors live next to their modules and convert
//! into [`VitrineError`] at the crate boundary.

use thiserror::Error;

use crate::export::ExportError;
use crate::store::StoreError;

/// Main error type for vitrine operations
#[derive(Debug, Error)]
pub enum VitrineError {
    /// Unknown template identifier
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    /// Snapshot could not be read or written
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(String),

    /// Image or snapshot storage failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Raster or spreadsheet export failure
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Server-level errors (bind, serve)
    #[error("Server error: {0}")]
    Server(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
