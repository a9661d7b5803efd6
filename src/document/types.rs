//! Data types of the document model.
//!
//! Sections, editable fields, image slots and their style overlays. All
//! types are plain data; behavior lives on [`super::Document`].

use serde::{Deserialize, Serialize};

/// Smallest size percentage an image slot can take.
pub const MIN_SIZE_PERCENT: f64 = 50.0;
/// Largest size percentage an image slot can take.
pub const MAX_SIZE_PERCENT: f64 = 300.0;
/// Size percentage of a freshly created slot.
pub const DEFAULT_SIZE_PERCENT: f64 = 100.0;
/// Outer range for configured size bounds and stored sizes.
pub const SIZE_LIMIT_PERCENT: (f64, f64) = (10.0, 1000.0);
/// Font sizes outside this range are clamped when a style is applied.
pub const FONT_SIZE_RANGE: (f32, f32) = (6.0, 200.0);

/// A named, hideable layout region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub key: String,
    /// Soft-delete flag. Hidden sections keep their content.
    #[serde(default)]
    pub hidden: bool,
}

impl Section {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            hidden: false,
        }
    }
}

/// Horizontal alignment of text or an image within its container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    pub const ALL: [Alignment; 3] = [Alignment::Left, Alignment::Center, Alignment::Right];

    /// Offset of a box of `inner` width inside a container of `outer` width.
    pub fn offset(self, outer: f32, inner: f32) -> f32 {
        match self {
            Alignment::Left => 0.0,
            Alignment::Center => (outer - inner) / 2.0,
            Alignment::Right => outer - inner,
        }
    }
}

/// Text style overlay set from the properties panel.
///
/// Unset properties fall back to the template's role defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// `#rrggbb`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<Alignment>,
}

impl FieldStyle {
    /// Clamp font size and weight into renderable ranges.
    pub fn normalized(mut self) -> Self {
        let (min, max) = FONT_SIZE_RANGE;
        self.font_size = self
            .font_size
            .filter(|size| size.is_finite())
            .map(|size| size.clamp(min, max));
        self.font_weight = self.font_weight.map(|w| w.clamp(100, 900));
        self
    }
}

/// One piece of copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditableField {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<FieldStyle>,
}

impl EditableField {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            style: None,
        }
    }
}

/// Free-form pixel offset layered on top of normal flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// Drop shadow presets offered by the slot style panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowPreset {
    #[default]
    None,
    Soft,
    Medium,
    Strong,
}

impl ShadowPreset {
    /// (offset in px, darkness 0..1) of the rendered shadow.
    pub fn params(self) -> Option<(f32, f32)> {
        match self {
            ShadowPreset::None => None,
            ShadowPreset::Soft => Some((4.0, 0.12)),
            ShadowPreset::Medium => Some((8.0, 0.22)),
            ShadowPreset::Strong => Some((14.0, 0.35)),
        }
    }
}

fn default_percent() -> f32 {
    100.0
}

fn default_opacity() -> f32 {
    1.0
}

fn default_border_color() -> String {
    "#000000".to_string()
}

/// Visual overrides for an image slot.
///
/// `brightness`, `contrast` and `saturate` are CSS filter percentages
/// (100 = unchanged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStyle {
    #[serde(default)]
    pub shadow_preset: ShadowPreset,
    #[serde(default)]
    pub border_radius: f32,
    #[serde(default)]
    pub border_width: f32,
    #[serde(default = "default_border_color")]
    pub border_color: String,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_percent")]
    pub brightness: f32,
    #[serde(default = "default_percent")]
    pub contrast: f32,
    #[serde(default = "default_percent")]
    pub saturate: f32,
}

impl Default for SlotStyle {
    fn default() -> Self {
        Self {
            shadow_preset: ShadowPreset::None,
            border_radius: 0.0,
            border_width: 0.0,
            border_color: default_border_color(),
            opacity: 1.0,
            brightness: 100.0,
            contrast: 100.0,
            saturate: 100.0,
        }
    }
}

impl SlotStyle {
    /// Clamp values into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.opacity = self.opacity.clamp(0.0, 1.0);
        self.border_radius = self.border_radius.max(0.0);
        self.border_width = self.border_width.max(0.0);
        self.brightness = self.brightness.max(0.0);
        self.contrast = self.contrast.max(0.0);
        self.saturate = self.saturate.max(0.0);
        self
    }

    /// True if the style changes pixels of the image itself.
    pub fn has_filters(&self) -> bool {
        self.brightness != 100.0 || self.contrast != 100.0 || self.saturate != 100.0
    }
}

/// A named image binding with geometry and style overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSlot {
    pub key: String,
    /// `None` for placeholder slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub size_percent: f64,
    pub position: Position,
    pub alignment: Alignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_width_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_settings: Option<SlotStyle>,
}

impl ImageSlot {
    /// An empty slot at default geometry.
    pub fn placeholder(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: None,
            size_percent: DEFAULT_SIZE_PERCENT,
            position: Position::ORIGIN,
            alignment: Alignment::Center,
            container_width_percent: None,
            style_settings: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.url.as_deref().is_none_or(str::is_empty)
    }
}

/// Clamp a size percentage into the model range.
pub fn clamp_size_percent(size: f64) -> f64 {
    clamp_size_within(size, MIN_SIZE_PERCENT, MAX_SIZE_PERCENT)
}

/// Clamp a size percentage into `[min, max]`.
///
/// NaN maps to the default size. Bounds are first pulled into
/// [`SIZE_LIMIT_PERCENT`], and an inverted pair collapses onto `min`.
pub fn clamp_size_within(size: f64, min: f64, max: f64) -> f64 {
    let (floor, ceiling) = SIZE_LIMIT_PERCENT;
    let min = if min.is_nan() { floor } else { min.clamp(floor, ceiling) };
    let max = if max.is_nan() { ceiling } else { max.clamp(min, ceiling) };
    if size.is_nan() {
        return DEFAULT_SIZE_PERCENT.clamp(min, max);
    }
    size.clamp(min, max)
}
