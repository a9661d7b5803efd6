//! Server state and configuration.

use std::path::PathBuf;
use std::sync::Arc;

use crate::VitrineError;
use crate::config::{EngineConfig, ImageFormat, RasterConfig};
use crate::export::ExportGate;
use crate::export::raster::RasterExporter;
use crate::export::sheet::SheetExporter;
use crate::store::{FileSnapshotStore, HttpImageStore, ImageStore, SnapshotStore};
use crate::template::BuiltinTemplates;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Where uploaded images are written and served from
    pub upload_dir: PathBuf,
    /// Where document snapshots are kept
    pub snapshot_dir: PathBuf,
    /// Public origin used in uploaded image URLs (e.g., "http://localhost:8080")
    pub public_base: String,
    pub engine: EngineConfig,
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub templates: BuiltinTemplates,
    pub images: Arc<dyn ImageStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Download exports, in the configured format.
    pub raster: Arc<RasterExporter>,
    /// Inline previews, always PNG at 1x.
    pub preview: Arc<RasterExporter>,
    pub sheets: SheetExporter,
    pub gate: ExportGate,
}

impl AppState {
    /// State backed by the upload and snapshot directories.
    pub fn new(config: ServerConfig) -> Result<Self, VitrineError> {
        let images = HttpImageStore::new(
            &config.engine.fetch,
            config.upload_dir.clone(),
            config.public_base.clone(),
        )?;
        let snapshots = FileSnapshotStore::new(config.snapshot_dir.clone());
        Ok(Self::with_stores(config, Arc::new(images), Arc::new(snapshots)))
    }

    pub fn with_stores(
        config: ServerConfig,
        images: Arc<dyn ImageStore>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        let raster = RasterExporter::new(config.engine.raster.clone());
        let preview = RasterExporter::new(RasterConfig {
            pixel_ratio: 1,
            format: ImageFormat::Png,
            ..config.engine.raster.clone()
        });
        let sheets = SheetExporter::new(config.engine.sheet.clone());
        Self {
            config,
            templates: BuiltinTemplates::new(),
            images,
            snapshots,
            raster: Arc::new(raster),
            preview: Arc::new(preview),
            sheets,
            gate: ExportGate::new(),
        }
    }
}
