//! # Rendering Module
//!
//! Turns a [`Document`](crate::document::Document) into a [`RenderTree`]:
//! positioned boxes ready to paint or hit-test.
//!
//! The same composer serves both the editor and export. In
//! [`RenderMode::Editable`] the tree carries handles, alignment controls,
//! buttons and placeholder art, all flagged as editor chrome. In
//! [`RenderMode::Frozen`] none of that is emitted and nothing is
//! interactive.
//!
//! ```
//! use std::collections::HashMap;
//! use vitrine::document::Document;
//! use vitrine::render::{Composer, RenderMode};
//! use vitrine::template::product_showcase;
//!
//! let template = product_showcase();
//! let doc = Document::from_template(&template, &HashMap::new());
//! let tree = Composer::new(&template).render(&doc, &RenderMode::Frozen);
//! assert_eq!(tree.layout_width, 800.0);
//! ```

mod composer;
mod tree;

pub use composer::{Composer, DEFAULT_LAYOUT_WIDTH, GLYPH_ASPECT, wrap_text};
pub use tree::{
    Border, ButtonKind, NodeFlags, NodeKind, Rect, RenderMode, RenderNode, RenderTree, Rgb,
    parse_hex_color,
};

use crate::document::Document;
use crate::template::TemplateDefinition;

/// Render `doc` at the default layout width.
pub fn render(doc: &Document, template: &TemplateDefinition, mode: &RenderMode) -> RenderTree {
    Composer::new(template).render(doc, mode)
}
