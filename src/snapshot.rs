//! # Snapshot Serializer
//!
//! A [`Snapshot`] is the portable, storage-ready form of a [`Document`]: a
//! flat, string-keyed record with no engine types beyond plain data. The
//! document is rebuilt from a snapshot plus the template's default table.
//!
//! ```
//! use std::collections::HashMap;
//! use vitrine::document::Document;
//! use vitrine::snapshot::{deserialize, serialize};
//! use vitrine::template::product_showcase;
//!
//! let template = product_showcase();
//! let mut doc = Document::from_template(&template, &HashMap::new());
//! doc.set_field("title", "Canvas tote");
//! doc.add_extra_slot();
//!
//! let snapshot = serialize(&doc);
//! assert_eq!(deserialize(&snapshot, &template), doc);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::document::{
    Alignment, Document, FieldStyle, MAX_EXTRA_SLOTS, Position, SIZE_LIMIT_PERCENT, Section,
    SlotStyle, clamp_size_within,
};
use crate::template::{TemplateDefinition, TemplateRegistry};

/// Persisted form of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub template_id: String,
    /// Field key → value.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Slot key → image URL. Empty slots are absent.
    #[serde(default)]
    pub image_slots: BTreeMap<String, String>,
    /// Slot key → size percentage.
    #[serde(default)]
    pub sizes: BTreeMap<String, f64>,
    /// Slot key → pixel offset.
    #[serde(default)]
    pub positions: BTreeMap<String, Position>,
    /// Slot key → visual overrides.
    #[serde(default)]
    pub styles: BTreeMap<String, SlotStyle>,
    #[serde(default)]
    pub field_styles: BTreeMap<String, FieldStyle>,
    #[serde(default)]
    pub alignments: BTreeMap<String, Alignment>,
    #[serde(default)]
    pub container_widths: BTreeMap<String, f64>,
    #[serde(default)]
    pub hidden_sections: Vec<String>,
    /// Number of user-added extra slots.
    #[serde(default)]
    pub extra_slots: usize,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    /// A snapshot with nothing in it.
    pub fn empty(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            fields: BTreeMap::new(),
            image_slots: BTreeMap::new(),
            sizes: BTreeMap::new(),
            positions: BTreeMap::new(),
            styles: BTreeMap::new(),
            field_styles: BTreeMap::new(),
            alignments: BTreeMap::new(),
            container_widths: BTreeMap::new(),
            hidden_sections: Vec::new(),
            extra_slots: 0,
            created_at: DateTime::<Utc>::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a snapshot without ever failing.
    ///
    /// Anything that is not a JSON object yields an empty snapshot. Each
    /// known key is read independently, and inside maps each entry is read
    /// independently, so one bad value only drops itself. Scalar field
    /// values (numbers, booleans) are kept as their string form.
    pub fn parse_lenient(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Self::from_object(&map),
            _ => Self::empty(""),
        }
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        let template_id = map
            .get("templateId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let fields = map
            .get("fields")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
                    .collect()
            })
            .unwrap_or_default();

        let image_slots = map
            .get("imageSlots")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .filter(|(_, v)| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let hidden_sections = map
            .get("hiddenSections")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            template_id,
            fields,
            image_slots,
            sizes: lenient_map(map, "sizes"),
            positions: lenient_map(map, "positions"),
            styles: lenient_map(map, "styles"),
            field_styles: lenient_map(map, "fieldStyles"),
            alignments: lenient_map(map, "alignments"),
            container_widths: lenient_map(map, "containerWidths"),
            hidden_sections,
            extra_slots: map
                .get("extraSlots")
                .and_then(Value::as_u64)
                .map(|n| n.min(MAX_EXTRA_SLOTS as u64) as usize)
                .unwrap_or(0),
            created_at: map
                .get("createdAt")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default(),
        }
    }

    /// Every slot key mentioned anywhere in the snapshot.
    fn slot_keys(&self) -> BTreeSet<&str> {
        self.image_slots
            .keys()
            .chain(self.sizes.keys())
            .chain(self.positions.keys())
            .chain(self.styles.keys())
            .chain(self.alignments.keys())
            .chain(self.container_widths.keys())
            .map(String::as_str)
            .collect()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_map<T: DeserializeOwned>(map: &Map<String, Value>, key: &str) -> BTreeMap<String, T> {
    map.get(key)
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| {
                    serde_json::from_value(v.clone())
                        .ok()
                        .map(|parsed| (k.clone(), parsed))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Flatten a document into a snapshot stamped with the current time.
pub fn serialize(doc: &Document) -> Snapshot {
    serialize_at(doc, Utc::now())
}

/// Flatten a document into a snapshot with an explicit timestamp.
pub fn serialize_at(doc: &Document, created_at: DateTime<Utc>) -> Snapshot {
    let mut snapshot = Snapshot::empty(&doc.template_id);
    snapshot.created_at = created_at;
    snapshot.extra_slots = doc.extra_slots.len();

    for (key, field) in &doc.fields {
        snapshot.fields.insert(key.clone(), field.value.clone());
        if let Some(style) = &field.style {
            snapshot.field_styles.insert(key.clone(), style.clone());
        }
    }

    for slot in doc.slots.values().chain(doc.extra_slots.iter()) {
        let key = &slot.key;
        if let Some(url) = &slot.url {
            snapshot.image_slots.insert(key.clone(), url.clone());
        }
        // Geometry is written for every slot so empty opaque slots survive.
        snapshot.sizes.insert(key.clone(), slot.size_percent);
        snapshot.positions.insert(key.clone(), slot.position);
        snapshot.alignments.insert(key.clone(), slot.alignment);
        if let Some(width) = slot.container_width_percent {
            snapshot.container_widths.insert(key.clone(), width);
        }
        if let Some(style) = &slot.style_settings {
            snapshot.styles.insert(key.clone(), style.clone());
        }
    }

    snapshot.hidden_sections = doc
        .sections
        .iter()
        .filter(|s| s.hidden)
        .map(|s| s.key.clone())
        .collect();

    snapshot
}

/// Rebuild a document from a snapshot and its template.
///
/// Template keys missing from the snapshot take their defaults; keys the
/// template does not declare are kept verbatim as opaque fields or slots.
pub fn deserialize(snapshot: &Snapshot, template: &TemplateDefinition) -> Document {
    let mut doc = Document::from_template(template, &HashMap::new());

    for (key, value) in &snapshot.fields {
        doc.set_field(key, value.as_str());
    }
    for (key, style) in &snapshot.field_styles {
        doc.set_field_style(key, Some(style.clone()));
    }

    for _ in 0..snapshot.extra_slots.min(MAX_EXTRA_SLOTS) {
        doc.add_extra_slot();
    }

    for key in snapshot.slot_keys() {
        let slot = doc.slot_entry(key);
        if let Some(url) = snapshot.image_slots.get(key) {
            slot.url = Some(url.clone());
        }
        if let Some(size) = snapshot.sizes.get(key) {
            let (min, max) = SIZE_LIMIT_PERCENT;
            slot.size_percent = clamp_size_within(*size, min, max);
        }
        if let Some(position) = snapshot.positions.get(key) {
            slot.position = *position;
        }
        if let Some(alignment) = snapshot.alignments.get(key) {
            slot.alignment = *alignment;
        }
        if let Some(width) = snapshot.container_widths.get(key) {
            slot.container_width_percent = Some(width.clamp(10.0, 100.0));
        }
        if let Some(style) = snapshot.styles.get(key) {
            slot.style_settings = Some(style.clone().normalized());
        }
    }

    for key in &snapshot.hidden_sections {
        if !doc.hide_section(key) {
            doc.sections.push(Section {
                key: key.clone(),
                hidden: true,
            });
        }
    }

    doc
}

/// Load a document from optional snapshot text.
///
/// Missing or malformed text degrades to the template's default document;
/// an unknown template yields a document with no sections. Never fails.
pub fn load_document(
    text: Option<&str>,
    template_id: &str,
    registry: &dyn TemplateRegistry,
) -> Document {
    let snapshot = text.map(Snapshot::parse_lenient).unwrap_or_else(|| Snapshot::empty(""));
    let id = if snapshot.template_id.is_empty() {
        template_id
    } else {
        snapshot.template_id.as_str()
    };
    match registry.get(id) {
        Some(template) => deserialize(&snapshot, template),
        None => {
            tracing::warn!(template = id, "snapshot names an unknown template");
            deserialize(&snapshot, &TemplateDefinition::empty(id))
        }
    }
}
