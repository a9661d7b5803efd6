//! # Template Registry
//!
//! Read-only layout definitions. A template declares its sections, the
//! default copy for every field, and the fixed image slots with their
//! layout flags. Documents are built from a template; the template is never
//! mutated by editing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What kind of copy a field holds. Drives the default text style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Title,
    Heading,
    #[default]
    Body,
    Caption,
    Price,
}

impl FieldRole {
    /// Default font size in CSS pixels.
    pub fn font_size(self) -> f32 {
        match self {
            FieldRole::Title => 32.0,
            FieldRole::Heading => 24.0,
            FieldRole::Body => 16.0,
            FieldRole::Caption => 12.0,
            FieldRole::Price => 28.0,
        }
    }

    /// Default weight (CSS numeric scale).
    pub fn font_weight(self) -> u16 {
        match self {
            FieldRole::Title | FieldRole::Heading | FieldRole::Price => 700,
            FieldRole::Body | FieldRole::Caption => 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub key: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub section: String,
    pub default: String,
    #[serde(default)]
    pub role: FieldRole,
}

/// A fixed image slot.
///
/// `fill_container` slots always occupy their whole container and ignore
/// the document's size percentage. Intrinsic slots render at
/// `base_width * size_percent / 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub key: String,
    pub section: String,
    #[serde(default)]
    pub fill_container: bool,
    /// Width in CSS pixels at 100%.
    pub base_width: f32,
    /// Height as a fraction of the rendered width.
    pub aspect: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub id: String,
    pub name: String,
    pub sections: Vec<SectionSpec>,
    pub fields: Vec<FieldSpec>,
    pub slots: Vec<SlotSpec>,
    /// Section that hosts user-added extra image slots.
    #[serde(default)]
    pub extra_slot_section: Option<String>,
}

impl TemplateDefinition {
    /// The default-field table: field key → default copy.
    pub fn defaults(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|f| (f.key.clone(), f.default.clone()))
            .collect()
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn slot(&self, key: &str) -> Option<&SlotSpec> {
        self.slots.iter().find(|s| s.key == key)
    }

    pub fn fields_in<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a FieldSpec> + 'a {
        self.fields.iter().filter(move |f| f.section == section)
    }

    pub fn slots_in<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a SlotSpec> + 'a {
        self.slots.iter().filter(move |s| s.section == section)
    }

    /// An empty template, used when a snapshot names an unknown template.
    pub fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            sections: Vec::new(),
            fields: Vec::new(),
            slots: Vec::new(),
            extra_slot_section: None,
        }
    }
}

/// Lookup of templates by identifier.
pub trait TemplateRegistry: Send + Sync {
    fn get(&self, id: &str) -> Option<&TemplateDefinition>;
    fn ids(&self) -> Vec<&str>;
}

/// The templates shipped with the engine.
pub struct BuiltinTemplates {
    templates: Vec<TemplateDefinition>,
}

impl Default for BuiltinTemplates {
    fn default() -> Self {
        Self {
            templates: vec![product_showcase(), minimal_card()],
        }
    }
}

impl BuiltinTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a template.
    pub fn insert(&mut self, template: TemplateDefinition) {
        self.templates.retain(|t| t.id != template.id);
        self.templates.push(template);
    }
}

impl TemplateRegistry for BuiltinTemplates {
    fn get(&self, id: &str) -> Option<&TemplateDefinition> {
        self.templates.iter().find(|t| t.id == id)
    }

    fn ids(&self) -> Vec<&str> {
        self.templates.iter().map(|t| t.id.as_str()).collect()
    }
}

fn section(key: &str, title: &str) -> SectionSpec {
    SectionSpec {
        key: key.to_string(),
        title: title.to_string(),
    }
}

fn field(key: &str, section: &str, role: FieldRole, default: &str) -> FieldSpec {
    FieldSpec {
        key: key.to_string(),
        section: section.to_string(),
        default: default.to_string(),
        role,
    }
}

fn slot(key: &str, section: &str, fill_container: bool, base_width: f32, aspect: f32) -> SlotSpec {
    SlotSpec {
        key: key.to_string(),
        section: section.to_string(),
        fill_container,
        base_width,
        aspect,
    }
}

/// Hero banner, feature list with two images, specs and a gallery.
pub fn product_showcase() -> TemplateDefinition {
    TemplateDefinition {
        id: "product-showcase".to_string(),
        name: "Product showcase".to_string(),
        sections: vec![
            section("hero", "Hero"),
            section("features", "Features"),
            section("specs", "Specifications"),
            section("gallery", "Gallery"),
        ],
        fields: vec![
            field("title", "hero", FieldRole::Title, "Product name"),
            field("tagline", "hero", FieldRole::Body, "A short line that sells the product"),
            field("price", "hero", FieldRole::Price, "0.00"),
            field("feature_heading", "features", FieldRole::Heading, "Why you'll love it"),
            field("feature_1", "features", FieldRole::Body, "First key benefit"),
            field("feature_2", "features", FieldRole::Body, "Second key benefit"),
            field("specs_heading", "specs", FieldRole::Heading, "Specifications"),
            field("specs_body", "specs", FieldRole::Body, "Size, material and care details"),
            field("gallery_caption", "gallery", FieldRole::Caption, "More views"),
        ],
        slots: vec![
            slot("hero_image", "hero", true, 800.0, 0.5),
            slot("feature_image_1", "features", false, 240.0, 1.0),
            slot("feature_image_2", "features", false, 240.0, 1.0),
            slot("detail_image", "specs", false, 320.0, 0.75),
        ],
        extra_slot_section: Some("gallery".to_string()),
    }
}

/// A single card: image, title and description.
pub fn minimal_card() -> TemplateDefinition {
    TemplateDefinition {
        id: "minimal-card".to_string(),
        name: "Minimal card".to_string(),
        sections: vec![section("card", "Card")],
        fields: vec![
            field("title", "card", FieldRole::Heading, "Product name"),
            field("description", "card", FieldRole::Body, "Describe the product"),
        ],
        slots: vec![slot("main_image", "card", false, 360.0, 1.0)],
        extra_slot_section: None,
    }
}
