//! Document → render tree.
//!
//! Layout is a single column: visible sections stack top to bottom, and
//! inside a section fields come first, then fixed slots, then extra slots.
//! Slot offsets are applied as a translate and never move later content.
//! Editor chrome is overlaid on top of the layout and never takes space, so
//! an editable tree minus its chrome paints exactly like the frozen tree.

use crate::document::{Alignment, Document, FONT_SIZE_RANGE, ImageSlot};
use crate::interaction::{Command, Corner, Hit, SlotPart, Target};
use crate::template::{FieldRole, SlotSpec, TemplateDefinition};

use super::tree::{
    Border, ButtonKind, NodeFlags, NodeKind, Rect, RenderMode, RenderNode, RenderTree, Rgb,
    parse_hex_color,
};

pub const DEFAULT_LAYOUT_WIDTH: f32 = 800.0;

const PAGE_PADDING: f32 = 24.0;
const SECTION_PADDING: f32 = 16.0;
const SECTION_GAP: f32 = 16.0;
const BLOCK_GAP: f32 = 12.0;
const LINE_HEIGHT: f32 = 1.4;
/// Glyph advance as a fraction of the font size (bitmap font cell is 1:2).
pub const GLYPH_ASPECT: f32 = 0.5;
const EXTRA_SLOT_BASE_WIDTH: f32 = 200.0;

const PAGE_BACKGROUND: Rgb = [255, 255, 255];
const TEXT_COLOR: Rgb = [17, 17, 17];
const FOCUS_COLOR: Rgb = [37, 99, 235];
const HANDLE_SIZE: f32 = 10.0;
const CONTROL_SIZE: f32 = 22.0;

/// Renders documents of one template.
pub struct Composer<'a> {
    template: &'a TemplateDefinition,
    layout_width: f32,
}

impl<'a> Composer<'a> {
    pub fn new(template: &'a TemplateDefinition) -> Self {
        Self {
            template,
            layout_width: DEFAULT_LAYOUT_WIDTH,
        }
    }

    /// Lay out at the given viewport width instead of the default.
    pub fn with_width(mut self, width: f32) -> Self {
        self.layout_width = width.max(PAGE_PADDING * 2.0 + SECTION_PADDING * 2.0 + 1.0);
        self
    }

    pub fn render(&self, doc: &Document, mode: &RenderMode) -> RenderTree {
        let mut page = RenderNode::new(
            NodeKind::Page {
                background: PAGE_BACKGROUND,
            },
            Rect::default(),
        );
        if mode.is_editable() {
            page.hit = Some(Hit::Background);
        }

        let mut y = PAGE_PADDING;
        for section in &doc.sections {
            if section.hidden {
                continue;
            }
            let node = self.render_section(doc, &section.key, y, mode);
            y = node.rect.bottom() + SECTION_GAP;
            page.children.push(node);
        }
        let height = (y - SECTION_GAP).max(PAGE_PADDING) + PAGE_PADDING;
        page.rect = Rect::new(0.0, 0.0, self.layout_width, height);

        RenderTree {
            layout_width: self.layout_width,
            width: self.layout_width,
            height,
            mode: mode.clone(),
            root: page,
        }
    }

    fn content_x(&self) -> f32 {
        PAGE_PADDING + SECTION_PADDING
    }

    fn content_width(&self) -> f32 {
        self.layout_width - 2.0 * (PAGE_PADDING + SECTION_PADDING)
    }

    fn render_section(&self, doc: &Document, key: &str, top: f32, mode: &RenderMode) -> RenderNode {
        let editable = mode.is_editable();
        let mut node = RenderNode::new(NodeKind::Section { key: key.to_string() }, Rect::default());
        let mut y = top + SECTION_PADDING;
        let mut blocks = 0usize;

        for spec in self.template.fields_in(key) {
            if blocks > 0 {
                y += BLOCK_GAP;
            }
            let text = self.render_field(doc, &spec.key, spec.role, y, editable);
            y = text.rect.bottom();
            node.children.push(text);
            blocks += 1;
        }

        for spec in self.template.slots_in(key) {
            if blocks > 0 {
                y += BLOCK_GAP;
            }
            let slot = doc.get_slot(&spec.key);
            let frame = self.render_slot(&slot, SlotLayout::from_spec(spec), y, mode);
            y += frame.flow_height;
            node.children.push(frame.node);
            blocks += 1;
        }

        if self.template.extra_slot_section.as_deref() == Some(key) {
            for slot in &doc.extra_slots {
                if blocks > 0 {
                    y += BLOCK_GAP;
                }
                let frame = self.render_slot(slot, SlotLayout::extra(), y, mode);
                y += frame.flow_height;
                node.children.push(frame.node);
                blocks += 1;
            }
        }

        let bottom = y + SECTION_PADDING;
        node.rect = Rect::new(
            PAGE_PADDING,
            top,
            self.layout_width - 2.0 * PAGE_PADDING,
            bottom - top,
        );

        if editable {
            let remove = Rect::new(
                node.rect.right() - CONTROL_SIZE - 4.0,
                top + 4.0,
                CONTROL_SIZE,
                CONTROL_SIZE,
            );
            let mut button = RenderNode::chrome(
                NodeKind::Button {
                    kind: ButtonKind::RemoveSection,
                },
                remove,
                NodeFlags::HOVER_CHROME,
            );
            button.command = Some(Command::RemoveSection {
                section: key.to_string(),
            });
            node.children.push(button);

            if self.template.extra_slot_section.as_deref() == Some(key) {
                // Sits in the bottom padding so it never pushes content.
                let add = Rect::new(
                    self.content_x(),
                    bottom - SECTION_PADDING + 2.0,
                    CONTROL_SIZE * 2.0,
                    SECTION_PADDING - 4.0,
                );
                let mut button = RenderNode::chrome(
                    NodeKind::Button {
                        kind: ButtonKind::AddSlot,
                    },
                    add,
                    NodeFlags::CHROME,
                );
                button.command = Some(Command::AddExtraSlot);
                node.children.push(button);
            }
        }

        node
    }

    fn render_field(
        &self,
        doc: &Document,
        key: &str,
        role: FieldRole,
        y: f32,
        editable: bool,
    ) -> RenderNode {
        let style = doc.field_style(key);
        let font_size = style
            .and_then(|s| s.font_size)
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1))
            .unwrap_or_else(|| role.font_size());
        let color = style
            .and_then(|s| s.color.as_deref())
            .and_then(parse_hex_color)
            .unwrap_or(TEXT_COLOR);
        let bold = style
            .and_then(|s| s.font_weight)
            .unwrap_or_else(|| role.font_weight())
            >= 600;
        let align = style.and_then(|s| s.text_align).unwrap_or(match role {
            FieldRole::Title | FieldRole::Price => Alignment::Center,
            _ => Alignment::Left,
        });

        let placeholder = doc.field_is_placeholder(key);
        let value = doc.get_field(key);
        let max_chars = (self.content_width() / (font_size * GLYPH_ASPECT)).floor().max(1.0) as usize;
        let lines = wrap_text(&value, max_chars);
        let height = lines.len() as f32 * font_size * LINE_HEIGHT;
        let rect = Rect::new(self.content_x(), y, self.content_width(), height);

        let text = NodeKind::Text {
            field: key.to_string(),
            lines,
            font_size,
            color,
            bold,
            align,
        };

        // A field with nothing to show keeps its space; its placeholder copy
        // only exists while editing.
        let mut node = if placeholder {
            let mut node = RenderNode::new(
                NodeKind::Text {
                    field: key.to_string(),
                    lines: Vec::new(),
                    font_size,
                    color,
                    bold,
                    align,
                },
                rect,
            );
            if editable {
                let mut hint = RenderNode::new(text, rect);
                hint.flags.exclude_from_export = true;
                node.children.push(hint);
            }
            node
        } else {
            RenderNode::new(text, rect)
        };

        if editable {
            node.hit = Some(Hit::Field {
                key: key.to_string(),
            });
        }
        node
    }

    fn render_slot(
        &self,
        slot: &ImageSlot,
        layout: SlotLayout,
        y: f32,
        mode: &RenderMode,
    ) -> SlotFrame {
        let container_width =
            self.content_width() * slot.container_width_percent.unwrap_or(100.0) as f32 / 100.0;
        let container_x = self.content_x() + Alignment::Center.offset(self.content_width(), container_width);

        let width = if layout.fill_container {
            container_width
        } else {
            layout.base_width * slot.size_percent as f32 / 100.0
        };
        let height = width * layout.aspect;
        let x = if layout.fill_container {
            container_x
        } else {
            container_x + slot.alignment.offset(container_width, width)
        };
        let rect = Rect::new(
            x + slot.position.x as f32,
            y + slot.position.y as f32,
            width,
            height,
        );

        let mut frame = RenderNode::new(
            NodeKind::SlotFrame {
                slot: slot.key.clone(),
            },
            rect,
        );

        if let Some(url) = slot.url.as_deref().filter(|u| !u.is_empty()) {
            frame.children.push(RenderNode::new(
                NodeKind::Image {
                    slot: slot.key.clone(),
                    url: url.to_string(),
                    style: slot.style_settings.clone().unwrap_or_default(),
                },
                rect,
            ));
        }

        if let RenderMode::Editable { focus } = mode {
            let focused = *focus == Some(Target::Slot(slot.key.clone()));
            self.decorate_slot(&mut frame, slot, layout.fill_container, focused);
        }

        SlotFrame {
            node: frame,
            flow_height: height,
        }
    }

    /// Editor affordances for one slot frame.
    fn decorate_slot(&self, frame: &mut RenderNode, slot: &ImageSlot, fill: bool, focused: bool) {
        let rect = frame.rect;
        let key = slot.key.clone();
        frame.hit = Some(Hit::Slot {
            key: key.clone(),
            part: SlotPart::Body,
        });
        frame.border = Some(Border {
            width: if focused { 2.0 } else { 1.0 },
            color: if focused { FOCUS_COLOR } else { [203, 213, 225] },
            editor_only: true,
        });

        if slot.is_empty() {
            frame.children.push(RenderNode::chrome(
                NodeKind::Placeholder { slot: key.clone() },
                rect,
                NodeFlags::CHROME,
            ));
        }

        let button_y = rect.y + 4.0;
        let buttons: &[ButtonKind] = if slot.is_empty() {
            &[ButtonKind::Upload]
        } else {
            &[ButtonKind::Replace, ButtonKind::Delete]
        };
        for (i, kind) in buttons.iter().enumerate() {
            let x = rect.right() - (i as f32 + 1.0) * (CONTROL_SIZE + 4.0);
            let mut button = RenderNode::chrome(
                NodeKind::Button { kind: *kind },
                Rect::new(x, button_y, CONTROL_SIZE, CONTROL_SIZE),
                NodeFlags::HOVER_CHROME,
            );
            if *kind == ButtonKind::Delete {
                button.command = Some(Command::DeleteImage { slot: key.clone() });
            }
            frame.children.push(button);
        }

        if !focused {
            return;
        }

        for corner in Corner::ALL {
            let (cx, cy) = match corner {
                Corner::TopLeft => (rect.x, rect.y),
                Corner::TopRight => (rect.right(), rect.y),
                Corner::BottomLeft => (rect.x, rect.bottom()),
                Corner::BottomRight => (rect.right(), rect.bottom()),
            };
            let mut handle = RenderNode::chrome(
                NodeKind::Handle {
                    slot: key.clone(),
                    corner,
                },
                Rect::new(
                    cx - HANDLE_SIZE / 2.0,
                    cy - HANDLE_SIZE / 2.0,
                    HANDLE_SIZE,
                    HANDLE_SIZE,
                ),
                NodeFlags::CHROME,
            );
            handle.hit = Some(Hit::Slot {
                key: key.clone(),
                part: SlotPart::Handle(corner),
            });
            frame.children.push(handle);
        }

        // A fill slot stores its size but always spans the container, so
        // there is nothing to align.
        if fill {
            return;
        }

        let controls_width = 3.0 * CONTROL_SIZE;
        let controls_x = rect.x + (rect.width - controls_width) / 2.0;
        for (i, alignment) in Alignment::ALL.into_iter().enumerate() {
            let mut control = RenderNode::chrome(
                NodeKind::AlignControl {
                    slot: key.clone(),
                    alignment,
                    active: slot.alignment == alignment,
                },
                Rect::new(
                    controls_x + i as f32 * CONTROL_SIZE,
                    rect.bottom() + 4.0,
                    CONTROL_SIZE,
                    CONTROL_SIZE,
                ),
                NodeFlags::CHROME,
            );
            if slot.alignment == alignment {
                control.flags.disabled = true;
            } else {
                control.command = Some(Command::Align {
                    slot: key.clone(),
                    alignment,
                });
            }
            frame.children.push(control);
        }
    }
}

struct SlotFrame {
    node: RenderNode,
    /// Vertical space the slot takes in the flow (offsets excluded).
    flow_height: f32,
}

#[derive(Debug, Clone, Copy)]
struct SlotLayout {
    fill_container: bool,
    base_width: f32,
    aspect: f32,
}

impl SlotLayout {
    fn from_spec(spec: &SlotSpec) -> Self {
        Self {
            fill_container: spec.fill_container,
            base_width: spec.base_width,
            aspect: spec.aspect,
        }
    }

    fn extra() -> Self {
        Self {
            fill_container: false,
            base_width: EXTRA_SLOT_BASE_WIDTH,
            aspect: 1.0,
        }
    }
}

/// Greedy word wrap to `max_chars` columns. Words longer than a line are
/// split. Explicit newlines are kept.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_len = 0usize;
        for word in paragraph.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > max_chars {
                if line_len > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                let rest = chars.split_off(max_chars);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }
            let word_len = chars.len();
            let needed = if line_len == 0 { word_len } else { line_len + 1 + word_len };
            if needed > max_chars && line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.extend(chars);
            line_len += word_len;
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Position;
    use crate::template::{minimal_card, product_showcase};
    use std::collections::HashMap;

    fn doc() -> Document {
        Document::from_template(&product_showcase(), &HashMap::new())
    }

    fn editable(focus: Option<&str>) -> RenderMode {
        RenderMode::Editable {
            focus: focus.map(|k| Target::Slot(k.to_string())),
        }
    }

    fn frame_rect(tree: &RenderTree, key: &str) -> Rect {
        tree.nodes()
            .into_iter()
            .find(|n| matches!(&n.kind, NodeKind::SlotFrame { slot } if slot == key))
            .map(|n| n.rect)
            .unwrap()
    }

    fn is_chrome(node: &RenderNode) -> bool {
        let f = node.flags;
        f.editor_chrome || f.hover_only || f.disabled || f.exclude_from_export
    }

    #[test]
    fn test_frozen_has_no_chrome_or_interaction() {
        let template = product_showcase();
        let mut d = doc();
        d.add_extra_slot();
        let tree = Composer::new(&template).render(&d, &RenderMode::Frozen);
        for node in tree.nodes() {
            assert!(!is_chrome(node), "chrome in frozen tree: {:?}", node.kind);
            assert!(node.hit.is_none());
            assert!(node.command.is_none());
            assert!(node.border.is_none());
        }
        assert_eq!(tree.hit_test(100.0, 100.0), Hit::Background);
    }

    #[test]
    fn test_editable_has_affordances() {
        let template = product_showcase();
        let tree = Composer::new(&template).render(&doc(), &editable(Some("feature_image_1")));
        let nodes = tree.nodes();
        let handles = nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Handle { .. }))
            .count();
        assert_eq!(handles, 4);
        assert!(nodes.iter().any(|n| matches!(n.kind, NodeKind::Placeholder { .. })));
        assert!(nodes.iter().any(|n| matches!(
            n.kind,
            NodeKind::Button {
                kind: ButtonKind::AddSlot
            }
        )));
        assert!(nodes.iter().any(|n| matches!(n.kind, NodeKind::AlignControl { .. })));
    }

    #[test]
    fn test_chrome_does_not_move_content() {
        let template = product_showcase();
        let mut d = doc();
        d.add_extra_slot();
        let frozen = Composer::new(&template).render(&d, &RenderMode::Frozen);
        let edit = Composer::new(&template).render(&d, &editable(Some("hero_image")));
        assert_eq!(frozen.height, edit.height);
        for key in ["hero_image", "feature_image_1", "detail_image", "extra_image_0"] {
            assert_eq!(frame_rect(&frozen, key), frame_rect(&edit, key));
        }
    }

    #[test]
    fn test_hidden_section_renders_nothing() {
        let template = product_showcase();
        let mut d = doc();
        let full = Composer::new(&template).render(&d, &RenderMode::Frozen);
        d.hide_section("features");
        let tree = Composer::new(&template).render(&d, &RenderMode::Frozen);
        assert!(tree.height < full.height);
        assert!(!tree.nodes().iter().any(|n| matches!(
            &n.kind,
            NodeKind::Section { key } if key == "features"
        )));
        assert!(d.slot("feature_image_1").is_some());
    }

    #[test]
    fn test_fill_slot_ignores_size_percent() {
        let template = product_showcase();
        let mut d = doc();
        let before = frame_rect(&Composer::new(&template).render(&d, &RenderMode::Frozen), "hero_image");
        d.set_slot_geometry("hero_image", 250.0, Position::ORIGIN);
        let after = frame_rect(&Composer::new(&template).render(&d, &RenderMode::Frozen), "hero_image");
        assert_eq!(before, after);
    }

    #[test]
    fn test_focused_fill_slot_has_handles_but_no_align_controls() {
        let template = product_showcase();
        let tree = Composer::new(&template).render(&doc(), &editable(Some("hero_image")));
        let nodes = tree.nodes();
        let handles = nodes
            .iter()
            .filter(|n| matches!(&n.kind, NodeKind::Handle { slot, .. } if slot == "hero_image"))
            .count();
        assert_eq!(handles, 4);
        assert!(!nodes.iter().any(|n| matches!(n.kind, NodeKind::AlignControl { .. })));
    }

    #[test]
    fn test_oversized_font_is_clamped() {
        let template = product_showcase();
        let mut d = doc();
        d.fields.get_mut("title").unwrap().style = Some(crate::document::FieldStyle {
            font_size: Some(1e9),
            ..Default::default()
        });
        let tree = Composer::new(&template).render(&d, &RenderMode::Frozen);
        assert!(tree.height < 100_000.0, "height {}", tree.height);
    }

    #[test]
    fn test_intrinsic_slot_scales_with_size_percent() {
        let template = minimal_card();
        let mut d = Document::from_template(&template, &HashMap::new());
        let base = frame_rect(&Composer::new(&template).render(&d, &RenderMode::Frozen), "main_image");
        d.set_slot_geometry("main_image", 50.0, Position::ORIGIN);
        let half = frame_rect(&Composer::new(&template).render(&d, &RenderMode::Frozen), "main_image");
        assert!((half.width - base.width / 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_position_is_a_translate() {
        let template = product_showcase();
        let mut d = doc();
        let before = Composer::new(&template).render(&d, &RenderMode::Frozen);
        d.set_slot_geometry("feature_image_1", 100.0, Position::new(30, 40));
        let after = Composer::new(&template).render(&d, &RenderMode::Frozen);
        let (a, b) = (frame_rect(&before, "feature_image_1"), frame_rect(&after, "feature_image_1"));
        assert_eq!((b.x - a.x, b.y - a.y), (30.0, 40.0));
        // Later content does not move
        assert_eq!(frame_rect(&before, "feature_image_2"), frame_rect(&after, "feature_image_2"));
        assert_eq!(before.height, after.height);
    }

    #[test]
    fn test_alignment_moves_intrinsic_slot() {
        let template = minimal_card();
        let mut d = Document::from_template(&template, &HashMap::new());
        d.set_slot_alignment("main_image", Alignment::Left);
        let left = frame_rect(&Composer::new(&template).render(&d, &RenderMode::Frozen), "main_image");
        d.set_slot_alignment("main_image", Alignment::Right);
        let right = frame_rect(&Composer::new(&template).render(&d, &RenderMode::Frozen), "main_image");
        assert!(right.x > left.x);
    }

    #[test]
    fn test_hit_test_finds_handles() {
        let template = minimal_card();
        let d = Document::from_template(&template, &HashMap::new());
        let tree = Composer::new(&template).render(&d, &editable(Some("main_image")));
        let rect = frame_rect(&tree, "main_image");
        assert_eq!(
            tree.hit_test(rect.right(), rect.bottom()),
            Hit::Slot {
                key: "main_image".into(),
                part: SlotPart::Handle(Corner::BottomRight)
            }
        );
        assert_eq!(
            tree.hit_test(rect.x + rect.width / 2.0, rect.y + rect.height / 2.0),
            Hit::Slot {
                key: "main_image".into(),
                part: SlotPart::Body
            }
        );
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("hello world", 20), vec!["hello world"]);
        assert_eq!(wrap_text("hello world", 7), vec!["hello", "world"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }
}
