//! # Document Model
//!
//! The live, editable composition: sections, a flat bag of fields and image
//! slots keyed by string, and an ordered list of user-added extra slots.
//!
//! Fields and slots are not nested inside sections so a key can be reused
//! across sections by the template. Extra slots behave like an array: their
//! keys are derived from their position (`extra_image_<index>`) and are
//! renumbered when a slot in the middle is removed.
//!
//! ```
//! use std::collections::HashMap;
//! use vitrine::document::Document;
//! use vitrine::template::product_showcase;
//!
//! let template = product_showcase();
//! let mut doc = Document::from_template(&template, &HashMap::new());
//! assert_eq!(doc.get_field("title"), "Product name");
//!
//! doc.set_field("title", "Linen shirt");
//! assert_eq!(doc.get_field("title"), "Linen shirt");
//!
//! let key = doc.add_extra_slot();
//! assert_eq!(key.as_deref(), Some("extra_image_0"));
//! ```

pub mod types;

pub use types::*;

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::template::TemplateDefinition;

/// Shown for a field that has neither a value nor a template default.
pub const FIELD_PLACEHOLDER: &str = "Click to edit";

/// Most extra slots a document holds.
pub const MAX_EXTRA_SLOTS: usize = 64;

const EXTRA_SLOT_PREFIX: &str = "extra_image_";

/// Key of the extra slot at `index`.
pub fn extra_slot_key(index: usize) -> String {
    format!("{EXTRA_SLOT_PREFIX}{index}")
}

/// Index encoded in an extra slot key, if `key` is one.
pub fn parse_extra_slot_key(key: &str) -> Option<usize> {
    let digits = key.strip_prefix(EXTRA_SLOT_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Reject "extra_image_01" so keys stay canonical.
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

/// A composition being edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub template_id: String,
    pub sections: Vec<Section>,
    pub fields: BTreeMap<String, EditableField>,
    /// Fixed template slots plus opaque slots the template does not declare.
    pub slots: BTreeMap<String, ImageSlot>,
    /// User-added slots, in display order.
    pub extra_slots: Vec<ImageSlot>,
    /// Template default copy, used as the fallback for empty fields.
    #[serde(skip)]
    pub(crate) defaults: BTreeMap<String, String>,
}

impl Document {
    /// An empty document bound to `template_id` with no content.
    pub fn empty(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            sections: Vec::new(),
            fields: BTreeMap::new(),
            slots: BTreeMap::new(),
            extra_slots: Vec::new(),
            defaults: BTreeMap::new(),
        }
    }

    /// Build a document from a template and externally supplied copy.
    ///
    /// Content bindings override template defaults. Bindings for keys the
    /// template does not declare are kept as opaque fields.
    pub fn from_template(template: &TemplateDefinition, content: &HashMap<String, String>) -> Self {
        let mut doc = Self::empty(&template.id);
        doc.defaults = template.defaults();
        doc.sections = template
            .sections
            .iter()
            .map(|s| Section::new(&s.key))
            .collect();

        for spec in &template.fields {
            let value = content
                .get(&spec.key)
                .cloned()
                .unwrap_or_else(|| spec.default.clone());
            doc.fields
                .insert(spec.key.clone(), EditableField::new(&spec.key, value));
        }
        for (key, value) in content {
            doc.fields
                .entry(key.clone())
                .or_insert_with(|| EditableField::new(key, value));
        }
        for spec in &template.slots {
            doc.slots
                .insert(spec.key.clone(), ImageSlot::placeholder(&spec.key));
        }
        doc
    }

    /// Default-field table this document falls back to.
    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    /// Display value of a field.
    ///
    /// Falls back to the template default, then to [`FIELD_PLACEHOLDER`].
    pub fn get_field(&self, key: &str) -> String {
        self.fields
            .get(key)
            .map(|f| f.value.as_str())
            .filter(|v| !v.is_empty())
            .or_else(|| self.defaults.get(key).map(String::as_str))
            .filter(|v| !v.is_empty())
            .unwrap_or(FIELD_PLACEHOLDER)
            .to_string()
    }

    /// True if the field would render its placeholder.
    pub fn field_is_placeholder(&self, key: &str) -> bool {
        let has_value = self.fields.get(key).is_some_and(|f| !f.value.is_empty());
        let has_default = self.defaults.get(key).is_some_and(|d| !d.is_empty());
        !has_value && !has_default
    }

    pub fn set_field(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.get_mut(key) {
            Some(field) => field.value = value,
            None => {
                self.fields
                    .insert(key.to_string(), EditableField::new(key, value));
            }
        }
    }

    /// Replace a field's style overlay. `None` clears it.
    pub fn set_field_style(&mut self, key: &str, style: Option<FieldStyle>) {
        let field = self
            .fields
            .entry(key.to_string())
            .or_insert_with(|| EditableField::new(key, ""));
        field.style = style.map(FieldStyle::normalized);
    }

    pub fn field_style(&self, key: &str) -> Option<&FieldStyle> {
        self.fields.get(key).and_then(|f| f.style.as_ref())
    }

    // ------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------

    /// The slot bound to `key`, or an empty placeholder if unset.
    pub fn get_slot(&self, key: &str) -> ImageSlot {
        self.slot(key)
            .cloned()
            .unwrap_or_else(|| ImageSlot::placeholder(key))
    }

    pub fn slot(&self, key: &str) -> Option<&ImageSlot> {
        if let Some(index) = parse_extra_slot_key(key)
            && let Some(slot) = self.extra_slots.get(index)
        {
            return Some(slot);
        }
        self.slots.get(key)
    }

    pub fn slot_mut(&mut self, key: &str) -> Option<&mut ImageSlot> {
        if let Some(index) = parse_extra_slot_key(key)
            && index < self.extra_slots.len()
        {
            return self.extra_slots.get_mut(index);
        }
        self.slots.get_mut(key)
    }

    /// Mutable slot, created if the key is unknown.
    ///
    /// An extra slot key past the end grows the list up to that index, the
    /// way assigning past the end of an array would. Any other unknown key,
    /// including an extra slot index at or past [`MAX_EXTRA_SLOTS`], becomes
    /// an opaque slot.
    pub(crate) fn slot_entry(&mut self, key: &str) -> &mut ImageSlot {
        if let Some(index) = parse_extra_slot_key(key)
            && index < MAX_EXTRA_SLOTS
        {
            while self.extra_slots.len() <= index {
                let next = extra_slot_key(self.extra_slots.len());
                self.extra_slots.push(ImageSlot::placeholder(next));
            }
            return &mut self.extra_slots[index];
        }
        self.slots
            .entry(key.to_string())
            .or_insert_with(|| ImageSlot::placeholder(key))
    }

    /// Bind (or clear, with `None`) the image of a slot.
    pub fn set_slot_url(&mut self, key: &str, url: Option<String>) {
        self.slot_entry(key).url = url.filter(|u| !u.is_empty());
    }

    /// Set size and position together. Size is clamped to the model range.
    pub fn set_slot_geometry(&mut self, key: &str, size_percent: f64, position: Position) {
        self.set_slot_geometry_within(key, size_percent, position, MIN_SIZE_PERCENT, MAX_SIZE_PERCENT);
    }

    /// [`Document::set_slot_geometry`] with caller-supplied size bounds.
    pub fn set_slot_geometry_within(
        &mut self,
        key: &str,
        size_percent: f64,
        position: Position,
        min: f64,
        max: f64,
    ) {
        let slot = self.slot_entry(key);
        slot.size_percent = clamp_size_within(size_percent, min, max);
        slot.position = position;
    }

    pub fn set_slot_alignment(&mut self, key: &str, alignment: Alignment) {
        self.slot_entry(key).alignment = alignment;
    }

    pub fn set_slot_style(&mut self, key: &str, style: Option<SlotStyle>) {
        self.slot_entry(key).style_settings = style.map(SlotStyle::normalized);
    }

    /// Width of the slot's container as a percentage of its section.
    pub fn set_container_width(&mut self, key: &str, percent: Option<f64>) {
        self.slot_entry(key).container_width_percent = percent.map(|p| p.clamp(10.0, 100.0));
    }

    /// Empty a slot. The slot itself stays addressable.
    pub fn clear_slot(&mut self, key: &str) {
        if let Some(slot) = self.slot_mut(key) {
            slot.url = None;
        }
    }

    // ------------------------------------------------------------------
    // Extra slots
    // ------------------------------------------------------------------

    /// Append an empty extra slot and return its key, or `None` once the
    /// document holds [`MAX_EXTRA_SLOTS`].
    pub fn add_extra_slot(&mut self) -> Option<String> {
        if self.extra_slots.len() >= MAX_EXTRA_SLOTS {
            return None;
        }
        let key = extra_slot_key(self.extra_slots.len());
        self.extra_slots.push(ImageSlot::placeholder(&key));
        Some(key)
    }

    /// Remove the extra slot at `index`; later slots shift down by one and
    /// are rekeyed to their new position.
    pub fn remove_extra_slot(&mut self, index: usize) -> Option<ImageSlot> {
        if index >= self.extra_slots.len() {
            return None;
        }
        let removed = self.extra_slots.remove(index);
        for (i, slot) in self.extra_slots.iter_mut().enumerate().skip(index) {
            slot.key = extra_slot_key(i);
        }
        Some(removed)
    }

    pub fn extra_slot_count(&self) -> usize {
        self.extra_slots.len()
    }

    // ------------------------------------------------------------------
    // Sections
    // ------------------------------------------------------------------

    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    /// Soft-delete a section. Returns false for unknown keys.
    pub fn hide_section(&mut self, key: &str) -> bool {
        self.set_section_hidden(key, true)
    }

    /// Reverse [`Document::hide_section`]. Not exposed in the editor UI.
    pub fn unhide_section(&mut self, key: &str) -> bool {
        self.set_section_hidden(key, false)
    }

    fn set_section_hidden(&mut self, key: &str, hidden: bool) -> bool {
        match self.sections.iter_mut().find(|s| s.key == key) {
            Some(section) => {
                section.hidden = hidden;
                true
            }
            None => false,
        }
    }

    pub fn is_section_visible(&self, key: &str) -> bool {
        self.section(key).is_some_and(|s| !s.hidden)
    }
}
