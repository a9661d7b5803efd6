//! # Raster Export
//!
//! Paints a render tree into a flat image the way the page looks, minus
//! everything that only exists for editing.
//!
//! ## Capture steps
//!
//! 1. Force the tree to the reference width.
//! 2. Strip editor-only borders (focus outlines, hover frames).
//! 3. Paint on an opaque background at the pixel ratio, skipping every
//!    node [`is_editor_chrome`] matches along with its subtree.
//! 4. Restore width and borders. A [`CaptureGuard`] does this on drop, so
//!    it happens on every exit path including encode failure.
//! 5. Encode (JPEG quality 100 by default) and wrap in an [`Artifact`].
//!
//! Remote images are fetched up front with [`resolve_images`]. An image
//! that cannot be fetched or decoded leaves its box blank.

use chrono::{DateTime, Utc};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use spleen_font::{FONT_12X24, PSF2Font};
use std::collections::HashMap;
use std::io::Cursor;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Artifact, CancelToken, ExportError, ExportOutcome, artifact_filename};
use crate::config::{ImageFormat, RasterConfig};
use crate::document::{Alignment, SlotStyle};
use crate::render::{Border, GLYPH_ASPECT, NodeKind, Rect, RenderNode, RenderTree, Rgb, parse_hex_color};
use crate::store::ImageStore;

/// Decoded images keyed by URL.
pub type ResolvedImages = HashMap<String, DynamicImage>;

const GLYPH_COLS: f32 = 12.0;
const GLYPH_ROWS: f32 = 24.0;
const LINE_HEIGHT: f32 = 1.4;

/// Largest frame, in device pixels, a capture may allocate.
pub const MAX_CANVAS_PIXELS: u64 = 100_000_000;

/// True for nodes that must never reach an export: affordances, hover-only
/// controls, disabled inputs and anything explicitly excluded.
pub fn is_editor_chrome(node: &RenderNode) -> bool {
    let flags = node.flags;
    flags.editor_chrome || flags.hover_only || flags.disabled || flags.exclude_from_export
}

/// Holds a tree in capture state. Restores it when dropped.
pub struct CaptureGuard<'a> {
    tree: &'a mut RenderTree,
    saved_width: f32,
    /// One entry per node in walk order.
    saved_borders: Vec<Option<Border>>,
}

impl<'a> CaptureGuard<'a> {
    pub fn new(tree: &'a mut RenderTree, reference_width: f32) -> Self {
        let saved_width = tree.width;
        tree.width = reference_width;
        let mut saved_borders = Vec::new();
        tree.root.walk_mut(&mut |node| {
            let taken = if node.border.as_ref().is_some_and(|b| b.editor_only) {
                node.border.take()
            } else {
                None
            };
            saved_borders.push(taken);
        });
        Self {
            tree,
            saved_width,
            saved_borders,
        }
    }
}

impl Deref for CaptureGuard<'_> {
    type Target = RenderTree;

    fn deref(&self) -> &RenderTree {
        self.tree
    }
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        self.tree.width = self.saved_width;
        let mut saved = std::mem::take(&mut self.saved_borders).into_iter();
        self.tree.root.walk_mut(&mut |node| {
            if let Some(Some(border)) = saved.next() {
                node.border = Some(border);
            }
        });
    }
}

/// Encodes a finished frame.
pub trait FrameEncoder: Send + Sync {
    fn format(&self) -> ImageFormat;
    fn encode(&self, frame: &RgbaImage) -> Result<Vec<u8>, ExportError>;
}

pub struct JpegFrameEncoder {
    pub quality: u8,
}

impl FrameEncoder for JpegFrameEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn encode(&self, frame: &RgbaImage) -> Result<Vec<u8>, ExportError> {
        let rgb = DynamicImage::ImageRgba8(frame.clone()).to_rgb8();
        let mut bytes = Vec::new();
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, self.quality.clamp(1, 100));
        encoder.encode_image(&rgb).map_err(|e| ExportError::Encode {
            cause: e.to_string(),
        })?;
        Ok(bytes)
    }
}

pub struct PngFrameEncoder;

impl FrameEncoder for PngFrameEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    fn encode(&self, frame: &RgbaImage) -> Result<Vec<u8>, ExportError> {
        let mut bytes = Vec::new();
        frame
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| ExportError::Encode {
                cause: e.to_string(),
            })?;
        Ok(bytes)
    }
}

/// Render tree → image artifact.
pub struct RasterExporter {
    config: RasterConfig,
    encoder: Box<dyn FrameEncoder>,
}

impl RasterExporter {
    pub fn new(config: RasterConfig) -> Self {
        let encoder: Box<dyn FrameEncoder> = match config.format {
            ImageFormat::Jpeg => Box::new(JpegFrameEncoder {
                quality: config.jpeg_quality,
            }),
            ImageFormat::Png => Box::new(PngFrameEncoder),
        };
        Self { config, encoder }
    }

    pub fn with_encoder(config: RasterConfig, encoder: Box<dyn FrameEncoder>) -> Self {
        Self { config, encoder }
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Paint `tree` in capture state. The tree is restored before returning.
    pub fn rasterize(
        &self,
        tree: &mut RenderTree,
        images: &ResolvedImages,
    ) -> Result<RgbaImage, ExportError> {
        let guard = CaptureGuard::new(tree, self.config.reference_width as f32);
        self.paint(&guard, images)
    }

    /// Rasterize and encode into an artifact named after `subject`.
    pub fn export(
        &self,
        tree: &mut RenderTree,
        images: &ResolvedImages,
        subject: &str,
        at: DateTime<Utc>,
    ) -> Result<Artifact, ExportError> {
        let guard = CaptureGuard::new(tree, self.config.reference_width as f32);
        let frame = self.paint(&guard, images)?;
        let bytes = self.encoder.encode(&frame)?;
        drop(guard);

        let format = self.encoder.format();
        let artifact = Artifact {
            filename: artifact_filename(subject, at, format.extension()),
            content_type: format.content_type().to_string(),
            bytes,
        };
        debug!(
            filename = %artifact.filename,
            width = frame.width(),
            height = frame.height(),
            bytes = artifact.bytes.len(),
            "Rasterized"
        );
        Ok(artifact)
    }

    fn paint(&self, tree: &RenderTree, images: &ResolvedImages) -> Result<RgbaImage, ExportError> {
        let (width, height, scale) = self.frame_size(tree)?;
        let background = parse_hex_color(&self.config.background).unwrap_or([255, 255, 255]);

        let mut canvas = Canvas {
            image: RgbaImage::from_pixel(width, height, opaque(background)),
            scale,
        };
        canvas.paint_node(&tree.root, images);
        Ok(canvas.image)
    }

    /// Device-pixel frame size and paint scale for `tree`.
    fn frame_size(&self, tree: &RenderTree) -> Result<(u32, u32, f32), ExportError> {
        let ratio = self.config.pixel_ratio.max(1) as f64;
        let scale = tree.scale() as f64 * ratio;
        let width = (tree.width as f64 * ratio).round().max(1.0);
        let height = (tree.height as f64 * scale).round().max(1.0);
        if !width.is_finite() || !height.is_finite() || width * height > MAX_CANVAS_PIXELS as f64 {
            return Err(ExportError::Layout(format!(
                "frame of {width}x{height} px exceeds {MAX_CANVAS_PIXELS} pixels"
            )));
        }
        Ok((width as u32, height as u32, scale as f32))
    }
}

/// Fetch and decode every image the exportable part of `tree` shows.
///
/// Returns `None` if cancelled. Fetch and decode failures are logged and
/// the image is left out.
pub async fn resolve_images(
    tree: &RenderTree,
    store: &dyn ImageStore,
    cancel: &CancelToken,
) -> Option<ResolvedImages> {
    let mut urls = Vec::new();
    collect_image_urls(&tree.root, &mut urls);

    let mut images = ResolvedImages::new();
    for url in urls {
        if images.contains_key(&url) {
            continue;
        }
        match cancel.run(store.fetch(&url)).await? {
            Ok(bytes) => match image::load_from_memory(&bytes) {
                Ok(image) => {
                    images.insert(url, image);
                }
                Err(e) => warn!(%url, error = %e, "Failed to decode image"),
            },
            Err(e) => warn!(%url, error = %e, "Failed to fetch image"),
        }
    }
    Some(images)
}

fn collect_image_urls(node: &RenderNode, urls: &mut Vec<String>) {
    if is_editor_chrome(node) {
        return;
    }
    if let NodeKind::Image { url, .. } = &node.kind {
        urls.push(url.clone());
    }
    for child in &node.children {
        collect_image_urls(child, urls);
    }
}

/// Resolve images, rasterize off the async runtime and encode.
pub async fn export_tree(
    exporter: Arc<RasterExporter>,
    tree: RenderTree,
    store: &dyn ImageStore,
    cancel: &CancelToken,
    subject: &str,
) -> Result<ExportOutcome, ExportError> {
    info!(subject, "Starting raster export");
    let Some(images) = resolve_images(&tree, store, cancel).await else {
        debug!(subject, "Raster export cancelled while fetching images");
        return Ok(ExportOutcome::Cancelled);
    };

    let subject_owned = subject.to_string();
    let at = Utc::now();
    let artifact = tokio::task::spawn_blocking(move || {
        let mut tree = tree;
        exporter.export(&mut tree, &images, &subject_owned, at)
    })
    .await
    .map_err(|e| ExportError::Task(e.to_string()))??;

    if cancel.is_cancelled() {
        debug!(subject, "Raster export cancelled before delivery");
        return Ok(ExportOutcome::Cancelled);
    }
    info!(subject, filename = %artifact.filename, "Raster export finished");
    Ok(ExportOutcome::Completed(artifact))
}

fn opaque([r, g, b]: Rgb) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

struct Canvas {
    image: RgbaImage,
    scale: f32,
}

/// Device-pixel box, clipped to the canvas.
#[derive(Debug, Clone, Copy)]
struct DeviceRect {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl DeviceRect {
    fn width(&self) -> i64 {
        self.x1 - self.x0
    }

    fn height(&self) -> i64 {
        self.y1 - self.y0
    }
}

impl Canvas {
    fn device(&self, rect: Rect) -> DeviceRect {
        DeviceRect {
            x0: (rect.x * self.scale).round() as i64,
            y0: (rect.y * self.scale).round() as i64,
            x1: (rect.right() * self.scale).round() as i64,
            y1: (rect.bottom() * self.scale).round() as i64,
        }
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgb, alpha: f32) {
        if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
            return;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        for c in 0..3 {
            let mixed = color[c] as f32 * alpha + dst[c] as f32 * (1.0 - alpha);
            dst[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = 255;
    }

    fn fill(&mut self, rect: Rect, color: Rgb, alpha: f32) {
        let d = self.device(rect);
        for y in d.y0..d.y1 {
            for x in d.x0..d.x1 {
                self.blend(x, y, color, alpha);
            }
        }
    }

    fn stroke(&mut self, rect: Rect, border: &Border) {
        let d = self.device(rect);
        let w = (border.width * self.scale).round().max(1.0) as i64;
        for y in d.y0..d.y1 {
            for x in d.x0..d.x1 {
                let edge = x < d.x0 + w || x >= d.x1 - w || y < d.y0 + w || y >= d.y1 - w;
                if edge {
                    self.blend(x, y, border.color, 1.0);
                }
            }
        }
    }

    fn paint_node(&mut self, node: &RenderNode, images: &ResolvedImages) {
        if is_editor_chrome(node) {
            return;
        }
        match &node.kind {
            NodeKind::Page { background } => self.fill(node.rect, *background, 1.0),
            NodeKind::Text {
                lines,
                font_size,
                color,
                bold,
                align,
                ..
            } => self.draw_text(node.rect, lines, *font_size, *color, *bold, *align),
            NodeKind::Image { url, style, .. } => match images.get(url) {
                Some(image) => self.draw_image(node.rect, image, style),
                None => debug!(%url, "Image not resolved, leaving box empty"),
            },
            _ => {}
        }
        if let Some(border) = &node.border {
            self.stroke(node.rect, border);
        }
        for child in &node.children {
            self.paint_node(child, images);
        }
    }

    fn draw_text(
        &mut self,
        rect: Rect,
        lines: &[String],
        font_size: f32,
        color: Rgb,
        bold: bool,
        align: Alignment,
    ) {
        if lines.iter().all(String::is_empty) {
            return;
        }
        let Ok(mut font) = PSF2Font::new(FONT_12X24) else {
            warn!("Bitmap font unavailable, skipping text");
            return;
        };
        let cell_w = font_size * GLYPH_ASPECT;
        let line_height = font_size * LINE_HEIGHT;
        let dot_w = cell_w / GLYPH_COLS;
        let dot_h = font_size / GLYPH_ROWS;

        for (i, line) in lines.iter().enumerate() {
            let top = rect.y + i as f32 * line_height + (line_height - font_size) / 2.0;
            let line_width = line.chars().count() as f32 * cell_w;
            let mut x = rect.x + align.offset(rect.width, line_width);
            for ch in line.chars() {
                let mut utf8 = [0u8; 4];
                let encoded = ch.encode_utf8(&mut utf8);
                if let Some(glyph) = font.glyph_for_utf8(encoded.as_bytes()) {
                    for (row_y, row) in glyph.enumerate() {
                        for (col_x, on) in row.enumerate() {
                            if !on {
                                continue;
                            }
                            let dot = Rect::new(
                                x + col_x as f32 * dot_w,
                                top + row_y as f32 * dot_h,
                                dot_w,
                                dot_h,
                            );
                            self.fill(dot, color, 1.0);
                            if bold {
                                self.fill(Rect { x: dot.x + dot_w, ..dot }, color, 1.0);
                            }
                        }
                    }
                }
                x += cell_w;
            }
        }
    }

    fn draw_image(&mut self, rect: Rect, source: &DynamicImage, style: &SlotStyle) {
        let d = self.device(rect);
        if d.width() <= 0 || d.height() <= 0 {
            return;
        }
        let (w, h) = (d.width() as u32, d.height() as u32);
        let radius = style.border_radius * self.scale;

        if let Some((offset, darkness)) = style.shadow_preset.params() {
            let offset = (offset * self.scale).round() as i64;
            for y in 0..h {
                for x in 0..w {
                    if inside_rounded(x as f32, y as f32, w as f32, h as f32, radius) {
                        self.blend(
                            d.x0 + x as i64 + offset,
                            d.y0 + y as i64 + offset,
                            [0, 0, 0],
                            darkness * style.opacity,
                        );
                    }
                }
            }
        }

        let fitted = source.resize_to_fill(w, h, FilterType::Triangle).to_rgba8();
        for (x, y, pixel) in fitted.enumerate_pixels() {
            if !inside_rounded(x as f32, y as f32, w as f32, h as f32, radius) {
                continue;
            }
            let mut rgb = [pixel[0], pixel[1], pixel[2]];
            if style.has_filters() {
                rgb = apply_filters(rgb, style);
            }
            let alpha = pixel[3] as f32 / 255.0 * style.opacity;
            self.blend(d.x0 + x as i64, d.y0 + y as i64, rgb, alpha);
        }

        if style.border_width > 0.0 {
            let color = parse_hex_color(&style.border_color).unwrap_or([0, 0, 0]);
            let bw = (style.border_width * self.scale).max(1.0);
            let inner_radius = (radius - bw).max(0.0);
            for y in 0..h {
                for x in 0..w {
                    let (fx, fy) = (x as f32, y as f32);
                    let outer = inside_rounded(fx, fy, w as f32, h as f32, radius);
                    let inner = inside_rounded(
                        fx - bw,
                        fy - bw,
                        w as f32 - 2.0 * bw,
                        h as f32 - 2.0 * bw,
                        inner_radius,
                    );
                    if outer && !inner {
                        self.blend(d.x0 + x as i64, d.y0 + y as i64, color, style.opacity);
                    }
                }
            }
        }
    }
}

/// Is pixel `(x, y)` inside a `w`×`h` box with rounded corners.
fn inside_rounded(x: f32, y: f32, w: f32, h: f32, radius: f32) -> bool {
    if x < 0.0 || y < 0.0 || x >= w || y >= h {
        return false;
    }
    let r = radius.min(w / 2.0).min(h / 2.0);
    if r <= 0.0 {
        return true;
    }
    let (px, py) = (x + 0.5, y + 0.5);
    let cx = px.clamp(r, w - r);
    let cy = py.clamp(r, h - r);
    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy <= r * r
}

/// CSS-style `brightness()`, `contrast()` and `saturate()`, in that order.
fn apply_filters(rgb: [u8; 3], style: &SlotStyle) -> [u8; 3] {
    let brightness = style.brightness / 100.0;
    let contrast = style.contrast / 100.0;
    let saturate = style.saturate / 100.0;

    let mut c = rgb.map(|v| v as f32 / 255.0);
    for v in &mut c {
        *v = ((*v * brightness - 0.5) * contrast + 0.5).clamp(0.0, 1.0);
    }
    let luma = 0.2126 * c[0] + 0.7152 * c[1] + 0.0722 * c[2];
    c.map(|v| ((luma + (v - luma) * saturate).clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, FieldStyle, ShadowPreset};
    use crate::interaction::Target;
    use crate::render::{Composer, RenderMode};
    use crate::store::MemoryImageStore;
    use crate::template::product_showcase;
    use chrono::TimeZone;
    use std::collections::HashMap;

    struct FailingEncoder;

    impl FrameEncoder for FailingEncoder {
        fn format(&self) -> ImageFormat {
            ImageFormat::Png
        }

        fn encode(&self, _frame: &RgbaImage) -> Result<Vec<u8>, ExportError> {
            Err(ExportError::Encode {
                cause: "disk full".into(),
            })
        }
    }

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(8, 8, Rgba(color));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn document() -> Document {
        let template = product_showcase();
        let mut content = HashMap::new();
        content.insert("title".to_string(), "Desk Lamp".to_string());
        let mut doc = Document::from_template(&template, &content);
        doc.set_slot_url("hero_image", Some("memory://hero.png".into()));
        doc.set_slot_url("feature_image_1", Some("memory://feature.png".into()));
        doc.set_slot_style(
            "feature_image_1",
            Some(SlotStyle {
                shadow_preset: ShadowPreset::Medium,
                border_radius: 12.0,
                border_width: 2.0,
                ..SlotStyle::default()
            }),
        );
        doc.add_extra_slot();
        doc
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    async fn store() -> MemoryImageStore {
        let store = MemoryImageStore::new();
        store.insert("memory://hero.png", png_bytes([200, 40, 40, 255])).await;
        store.insert("memory://feature.png", png_bytes([40, 40, 200, 255])).await;
        store
    }

    #[tokio::test]
    async fn test_editable_and_frozen_export_identically() {
        let template = product_showcase();
        let doc = document();
        let store = store().await;
        let composer = Composer::new(&template);
        let mut frozen = composer.render(&doc, &RenderMode::Frozen);
        let mut editable = composer.render(
            &doc,
            &RenderMode::Editable {
                focus: Some(Target::Slot("feature_image_1".into())),
            },
        );

        let cancel = CancelToken::new();
        let images = resolve_images(&editable, &store, &cancel).await.unwrap();
        assert_eq!(images.len(), 2);

        let exporter = RasterExporter::new(RasterConfig::default());
        let a = exporter.export(&mut frozen, &images, "lamp", at()).unwrap();
        let b = exporter.export(&mut editable, &images, "lamp", at()).unwrap();
        assert_eq!(a.content_type, "image/jpeg");
        assert_eq!(a.filename, "lamp_20240601T080000000Z.jpg");
        assert!(a.bytes == b.bytes, "editor chrome leaked into the export");
    }

    #[test]
    fn test_capture_restores_tree_after_encode_failure() {
        let template = product_showcase();
        let mut tree = Composer::new(&template).render(
            &document(),
            &RenderMode::Editable {
                focus: Some(Target::Slot("feature_image_1".into())),
            },
        );
        tree.width = 412.0;
        let before = tree.clone();
        assert!(tree.nodes().iter().any(|n| n.border.as_ref().is_some_and(|b| b.editor_only)));

        let exporter = RasterExporter::with_encoder(RasterConfig::default(), Box::new(FailingEncoder));
        let err = exporter
            .export(&mut tree, &ResolvedImages::new(), "lamp", at())
            .unwrap_err();
        assert!(matches!(err, ExportError::Encode { ref cause } if cause == "disk full"));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_capture_guard_forces_width_and_strips_outlines() {
        let template = product_showcase();
        let mut tree = Composer::new(&template).render(
            &document(),
            &RenderMode::Editable { focus: None },
        );
        tree.width = 500.0;
        {
            let guard = CaptureGuard::new(&mut tree, 800.0);
            assert_eq!(guard.width, 800.0);
            assert!(guard.nodes().iter().all(|n| n.border.is_none()));
        }
        assert_eq!(tree.width, 500.0);
    }

    #[test]
    fn test_frame_size_follows_reference_width_and_ratio() {
        let template = product_showcase();
        let mut tree = Composer::new(&template).render(&document(), &RenderMode::Frozen);
        let exporter = RasterExporter::new(RasterConfig::default());
        let frame = exporter.rasterize(&mut tree, &ResolvedImages::new()).unwrap();
        assert_eq!(frame.width(), 1600);
        assert_eq!(frame.height(), (tree.height * 2.0).round() as u32);
        // Opaque white background
        assert_eq!(*frame.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_oversized_frame_is_a_layout_error() {
        let template = product_showcase();
        let mut tree = Composer::new(&template).render(&document(), &RenderMode::Frozen);
        tree.height = 15_400_001_000.0;
        let before = tree.clone();

        let exporter = RasterExporter::new(RasterConfig::default());
        let err = exporter.rasterize(&mut tree, &ResolvedImages::new()).unwrap_err();
        assert!(matches!(err, ExportError::Layout(_)));
        let err = exporter
            .export(&mut tree, &ResolvedImages::new(), "lamp", at())
            .unwrap_err();
        assert!(matches!(err, ExportError::Layout(_)));
        assert_eq!(tree, before);
    }

    #[tokio::test]
    async fn test_huge_font_style_still_exports() {
        let template = product_showcase();
        let mut doc = document();
        doc.set_field_style(
            "title",
            Some(FieldStyle {
                font_size: Some(1e9),
                ..FieldStyle::default()
            }),
        );
        let tree = Composer::new(&template).render(&doc, &RenderMode::Frozen);
        let outcome = export_tree(
            Arc::new(RasterExporter::new(RasterConfig::default())),
            tree,
            &MemoryImageStore::new(),
            &CancelToken::new(),
            "lamp",
        )
        .await
        .unwrap();
        assert!(outcome.artifact().is_some());
    }

    #[tokio::test]
    async fn test_missing_image_leaves_box_blank() {
        let template = product_showcase();
        let doc = document();
        let store = MemoryImageStore::new();
        let tree = Composer::new(&template).render(&doc, &RenderMode::Frozen);
        let images = resolve_images(&tree, &store, &CancelToken::new()).await.unwrap();
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn test_export_tree_png() {
        let template = product_showcase();
        let tree = Composer::new(&template).render(&document(), &RenderMode::Frozen);
        let store = store().await;
        let config = RasterConfig {
            format: ImageFormat::Png,
            ..RasterConfig::default()
        };
        let outcome = export_tree(
            Arc::new(RasterExporter::new(config)),
            tree,
            &store,
            &CancelToken::new(),
            "lamp",
        )
        .await
        .unwrap();
        let artifact = outcome.artifact().unwrap();
        assert_eq!(artifact.content_type, "image/png");
        assert!(artifact.filename.ends_with(".png"));
        assert_eq!(image::guess_format(&artifact.bytes).unwrap(), image::ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_export_tree_cancelled() {
        let template = product_showcase();
        let tree = Composer::new(&template).render(&document(), &RenderMode::Frozen);
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = export_tree(
            Arc::new(RasterExporter::new(RasterConfig::default())),
            tree,
            &MemoryImageStore::new(),
            &cancel,
            "lamp",
        )
        .await
        .unwrap();
        assert!(matches!(outcome, ExportOutcome::Cancelled));
    }

    #[test]
    fn test_filters_identity() {
        let style = SlotStyle::default();
        assert_eq!(apply_filters([10, 128, 250], &style), [10, 128, 250]);
        let gray = SlotStyle {
            saturate: 0.0,
            ..SlotStyle::default()
        };
        let [r, g, b] = apply_filters([255, 0, 0], &gray);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn test_inside_rounded() {
        assert!(inside_rounded(0.0, 0.0, 10.0, 10.0, 0.0));
        assert!(!inside_rounded(0.0, 0.0, 10.0, 10.0, 4.0));
        assert!(inside_rounded(5.0, 5.0, 10.0, 10.0, 4.0));
        assert!(!inside_rounded(10.0, 5.0, 10.0, 10.0, 0.0));
    }
}
