//! # Engine Configuration
//!
//! Tunables for the interaction controller and the two export pipelines.
//! Every field has a default, so a config file only needs the keys it
//! overrides:
//!
//! ```
//! use vitrine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{"interaction": {"resize_scale": 0.5}}"#).unwrap();
//! assert_eq!(config.interaction.resize_scale, 0.5);
//! assert_eq!(config.interaction.min_size, 50.0);
//! assert_eq!(config.raster.reference_width, 800);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::document::{SIZE_LIMIT_PERCENT, clamp_size_within};
use crate::error::VitrineError;

/// Top-level configuration, grouped by consumer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub interaction: InteractionConfig,
    pub raster: RasterConfig,
    pub sheet: SheetConfig,
    pub fetch: FetchConfig,
}

impl EngineConfig {
    /// Parse a JSON config document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, VitrineError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| VitrineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> Result<(), VitrineError> {
        self.interaction.validate()?;
        if self.raster.reference_width == 0 || self.raster.pixel_ratio == 0 {
            return Err(VitrineError::Config(
                "raster.reference_width and raster.pixel_ratio must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, VitrineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Direct-manipulation tuning.
///
/// `resize_scale` converts the projected pointer delta (pixels) into
/// size-percent points. 0.3 was tuned for an 800px wide page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub resize_scale: f64,
    pub min_size: f64,
    pub max_size: f64,
    /// How long a paste acknowledgment stays visible, in milliseconds.
    pub ack_millis: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            resize_scale: 0.3,
            min_size: 50.0,
            max_size: 300.0,
            ack_millis: 2000,
        }
    }
}

impl InteractionConfig {
    pub fn ack_duration(&self) -> Duration {
        Duration::from_millis(self.ack_millis)
    }

    /// Clamp a size percentage into the configured range.
    pub fn clamp_size(&self, size: f64) -> f64 {
        clamp_size_within(size, self.min_size, self.max_size)
    }

    fn validate(&self) -> Result<(), VitrineError> {
        if !self.resize_scale.is_finite() {
            return Err(VitrineError::Config(
                "interaction.resize_scale must be a finite number".into(),
            ));
        }
        let (floor, ceiling) = SIZE_LIMIT_PERCENT;
        let in_limit = |v: f64| (floor..=ceiling).contains(&v);
        if !in_limit(self.min_size) || !in_limit(self.max_size) {
            return Err(VitrineError::Config(format!(
                "interaction size bounds must lie within {floor}..={ceiling}"
            )));
        }
        if self.min_size > self.max_size {
            return Err(VitrineError::Config(format!(
                "interaction.min_size ({}) exceeds max_size ({})",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }
}

/// Output encoding for rasterized pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// Rasterization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Width in CSS pixels the page is forced to before capture.
    pub reference_width: u32,
    /// Oversampling factor applied on top of the reference width.
    pub pixel_ratio: u32,
    /// Opaque background, `#rrggbb`.
    pub background: String,
    pub format: ImageFormat,
    pub jpeg_quality: u8,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            reference_width: 800,
            pixel_ratio: 2,
            background: "#ffffff".to_string(),
            format: ImageFormat::Jpeg,
            jpeg_quality: 100,
        }
    }
}

/// Spreadsheet styling knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Header fill as `0xRRGGBB`.
    pub header_fill: u32,
    /// Row height (points) for rows carrying an embedded image.
    pub image_row_height: f64,
    /// Default column width (characters) for image columns.
    pub image_column_width: f64,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            header_fill: 0xD9E1F2,
            image_row_height: 60.0,
            image_column_width: 14.0,
        }
    }
}

/// Remote image fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "vitrine/0.1".to_string(),
            timeout_secs: 20,
        }
    }
}
