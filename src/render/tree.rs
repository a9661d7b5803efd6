//! The renderable tree produced by the composer.
//!
//! A `RenderTree` is plain data: boxes in CSS pixels with what to paint in
//! them. Editor affordances are ordinary nodes carrying [`NodeFlags`] so
//! consumers can tell them apart from page content.

use crate::document::{Alignment, SlotStyle};
use crate::interaction::{Command, Corner, Hit, Target};

/// An axis-aligned box in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// `[r, g, b]`
pub type Rgb = [u8; 3];

/// Parse `#rrggbb` or `#rgb`.
pub fn parse_hex_color(s: &str) -> Option<Rgb> {
    let hex = s.trim().strip_prefix('#')?;
    let channel = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
    match hex.len() {
        6 => Some([channel(0, 2)?, channel(2, 2)?, channel(4, 2)?]),
        3 => {
            let [r, g, b] = [channel(0, 1)?, channel(1, 1)?, channel(2, 1)?];
            Some([r * 17, g * 17, b * 17])
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Border {
    pub width: f32,
    pub color: Rgb,
    /// Drawn only as an editing aid (focus outline, hover frame).
    pub editor_only: bool,
}

/// Classification used by export to leave editor chrome out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    /// Handles, controls and other affordances.
    pub editor_chrome: bool,
    /// Only shown while hovering.
    pub hover_only: bool,
    /// Disabled inputs and buttons.
    pub disabled: bool,
    /// Explicitly kept out of exports.
    pub exclude_from_export: bool,
}

impl NodeFlags {
    pub const CHROME: NodeFlags = NodeFlags {
        editor_chrome: true,
        hover_only: false,
        disabled: false,
        exclude_from_export: false,
    };

    pub const HOVER_CHROME: NodeFlags = NodeFlags {
        editor_chrome: true,
        hover_only: true,
        disabled: false,
        exclude_from_export: false,
    };
}

/// Editor buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Upload,
    Replace,
    Delete,
    RemoveSection,
    AddSlot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Page { background: Rgb },
    Section { key: String },
    /// Wrapped copy, one entry per line.
    Text {
        field: String,
        lines: Vec<String>,
        font_size: f32,
        color: Rgb,
        bold: bool,
        align: Alignment,
    },
    /// Box that holds one image slot. Empty slots have no `Image` child.
    SlotFrame { slot: String },
    Image {
        slot: String,
        url: String,
        style: SlotStyle,
    },
    /// Art shown in an empty slot while editing.
    Placeholder { slot: String },
    Handle { slot: String, corner: Corner },
    AlignControl { slot: String, alignment: Alignment, active: bool },
    Button { kind: ButtonKind },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub kind: NodeKind,
    pub rect: Rect,
    pub border: Option<Border>,
    pub flags: NodeFlags,
    /// What a pointer-down here means to the controller.
    pub hit: Option<Hit>,
    /// Discrete command fired by clicking this node.
    pub command: Option<Command>,
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    pub fn new(kind: NodeKind, rect: Rect) -> Self {
        Self {
            kind,
            rect,
            border: None,
            flags: NodeFlags::default(),
            hit: None,
            command: None,
            children: Vec::new(),
        }
    }

    pub fn chrome(kind: NodeKind, rect: Rect, flags: NodeFlags) -> Self {
        Self {
            flags,
            ..Self::new(kind, rect)
        }
    }

    /// Depth-first visit of this node and its descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a RenderNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut RenderNode)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }
}

/// How the composer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Handles, controls and placeholder art, with `focus` highlighted.
    Editable { focus: Option<Target> },
    /// No affordances and no interaction. Used for preview and export.
    #[default]
    Frozen,
}

impl RenderMode {
    pub fn is_editable(&self) -> bool {
        matches!(self, RenderMode::Editable { .. })
    }
}

/// Output of the composer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    /// Width the layout was computed at.
    pub layout_width: f32,
    /// Width the tree is displayed at. Exports force this to a reference.
    pub width: f32,
    pub height: f32,
    pub mode: RenderMode,
    pub root: RenderNode,
}

impl RenderTree {
    /// Ratio between display width and layout width.
    pub fn scale(&self) -> f32 {
        if self.layout_width > 0.0 {
            self.width / self.layout_width
        } else {
            1.0
        }
    }

    pub fn nodes(&self) -> Vec<&RenderNode> {
        let mut out = Vec::new();
        self.root.walk(&mut |n| out.push(n));
        out
    }

    /// Translate a pointer position (display pixels) into a controller hit.
    ///
    /// The topmost node with a hit target wins. Frozen trees carry no hit
    /// targets, so everything is background.
    pub fn hit_test(&self, x: f32, y: f32) -> Hit {
        let scale = self.scale();
        let (lx, ly) = (x / scale, y / scale);
        let mut found = None;
        self.root.walk(&mut |node| {
            if node.hit.is_some() && node.rect.contains(lx, ly) {
                found = node.hit.clone();
            }
        });
        found.unwrap_or(Hit::Background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex_color("#fff"), Some([255, 255, 255]));
        assert_eq!(parse_hex_color(" #000000 "), Some([0, 0, 0]));
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }

    #[test]
    fn test_rect_contains() {
        let rect = Rect::new(10.0, 10.0, 5.0, 5.0);
        assert!(rect.contains(10.0, 10.0));
        assert!(rect.contains(14.9, 14.9));
        assert!(!rect.contains(15.0, 12.0));
    }
}
