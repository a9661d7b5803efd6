//! # Vitrine - Template Composition & Export Engine
//!
//! Vitrine builds product pages from fixed templates. A page is a
//! [`Document`](document::Document): editable copy, image slots with
//! per-slot geometry and style, and a set of sections that can be hidden.
//! It provides:
//!
//! - **Editing**: a pointer state machine for focus, resize, move and
//!   alignment, plus discrete commands for text and styles
//! - **Rendering**: one composer for both the editor and the final page
//! - **Persistence**: lossless JSON snapshots with lenient loading
//! - **Export**: chrome-free JPEG/PNG capture and XLSX workbooks
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use vitrine::{
//!     config::RasterConfig,
//!     document::Document,
//!     export::{CancelToken, raster::{RasterExporter, export_tree}},
//!     render::{Composer, RenderMode},
//!     snapshot,
//!     store::MemoryImageStore,
//!     template::product_showcase,
//! };
//!
//! # async fn example() -> Result<(), vitrine::VitrineError> {
//! let template = product_showcase();
//! let mut content = HashMap::new();
//! content.insert("title".to_string(), "Desk Lamp".to_string());
//!
//! let mut doc = Document::from_template(&template, &content);
//! doc.set_slot_url("hero_image", Some("https://example.com/lamp.jpg".into()));
//!
//! // Persist
//! let json = snapshot::serialize(&doc).to_json()?;
//!
//! // Export without editor chrome
//! let tree = Composer::new(&template).render(&doc, &RenderMode::Frozen);
//! let exporter = Arc::new(RasterExporter::new(RasterConfig::default()));
//! let store = MemoryImageStore::new();
//! let outcome = export_tree(exporter, tree, &store, &CancelToken::new(), "lamp").await?;
//! # let _ = (json, outcome);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`template`] | Read-only template definitions and registry |
//! | [`document`] | Document model, sections, fields and slots |
//! | [`interaction`] | Pointer state machine and editing commands |
//! | [`render`] | Document → render tree (editable or frozen) |
//! | [`snapshot`] | JSON persistence |
//! | [`export`] | Raster and spreadsheet exporters |
//! | [`store`] | Image and snapshot storage |
//! | [`server`] | HTTP surface |
//! | [`config`] | Engine configuration |
//! | [`error`] | Error types |

pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod interaction;
pub mod render;
pub mod server;
pub mod snapshot;
pub mod store;
pub mod template;

// Re-exports for convenience
pub use document::Document;
pub use error::VitrineError;
pub use template::{TemplateDefinition, TemplateRegistry};
