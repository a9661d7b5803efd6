//! # Interaction Controller
//!
//! Turns raw pointer events into document mutations.
//!
//! ```text
//!            pointer-down               pointer-down on handle
//!   Idle ───────────────────▶ Focused ─────────────────────────▶ Resizing
//!    ▲                          │  │    pointer-down on body          │
//!    │            blur          │  └─────────────────────▶ Moving     │
//!    └──────────────────────────┘                          │          │
//!    ▲                     pointer-up                      │          │
//!    └─────────────────────────────────────────────────────┴──────────┘
//! ```
//!
//! Every mutation happens synchronously inside [`InteractionController::handle`]
//! or [`InteractionController::apply`]; the composer simply re-renders the
//! document on the next paint.

mod notice;
mod surface;

pub use notice::{Notice, NoticeBoard, NoticeKind};
pub use surface::{CountingSurface, ListenerId, ListenerLease, PointerSurface};

use std::rc::Rc;
use std::time::Instant;
use thiserror::Error;

use crate::config::InteractionConfig;
use crate::document::{Alignment, Document, FieldStyle, Position, SlotStyle, parse_extra_slot_key};
use crate::store::{ImageStore, StoreError, UploadedImage};

/// Resize handle position on a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Project a pointer delta onto the single resize scalar for this corner.
    ///
    /// Dragging diagonally away from the slot's center is positive for every
    /// corner, dragging toward it is negative.
    pub fn project(self, dx: i32, dy: i32) -> f64 {
        let (dx, dy) = (dx as f64, dy as f64);
        match self {
            Corner::BottomRight => (dx + dy) / 2.0,
            Corner::TopLeft => -(dx + dy) / 2.0,
            Corner::TopRight => (dx - dy) / 2.0,
            Corner::BottomLeft => (-dx + dy) / 2.0,
        }
    }
}

/// What is being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Slot(String),
    Field(String),
}

/// Which part of a slot the pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPart {
    Body,
    Handle(Corner),
}

/// Result of hit-testing a pointer-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    Slot { key: String, part: SlotPart },
    Field { key: String },
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerEvent {
    Down { hit: Hit, x: i32, y: i32 },
    Move { x: i32, y: i32 },
    Up { x: i32, y: i32 },
    /// Focus left the editor.
    Blur,
}

#[derive(Debug)]
struct ResizeDrag {
    slot: String,
    corner: Corner,
    start_x: i32,
    start_y: i32,
    start_size: f64,
    _listener: ListenerLease,
}

#[derive(Debug)]
struct MoveDrag {
    slot: String,
    start_x: i32,
    start_y: i32,
    start_position: Position,
    _listener: ListenerLease,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Focused(Target),
    Resizing(ResizeDrag),
    Moving(MoveDrag),
}

/// Observable controller state, without the drag internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Idle,
    Focused,
    Resizing,
    Moving,
}

/// Discrete edits that do not go through the pointer state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Align { slot: String, alignment: Alignment },
    /// Replace the text of the focused field.
    EditText { value: String },
    SetFieldStyle { field: String, style: Option<FieldStyle> },
    SetSlotStyle { slot: String, style: Option<SlotStyle> },
    SetContainerWidth { slot: String, percent: Option<f64> },
    RemoveSection { section: String },
    /// Empty a fixed slot, or remove an extra slot entirely.
    DeleteImage { slot: String },
    AddExtraSlot,
}

/// How an image reached a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Upload,
    Drop,
    Paste,
}

/// Input refused by the controller. The document is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Only image files can be placed in an image slot")]
    NotAnImage { file_name: Option<String> },
}

/// True if an incoming file is an image, judged by declared MIME type,
/// then file extension, then content sniffing.
pub fn is_image_payload(file: &UploadedImage) -> bool {
    if let Some(content_type) = file.content_type.as_deref()
        && !content_type.is_empty()
        && content_type != "application/octet-stream"
    {
        return content_type.starts_with("image/");
    }
    if let Some(name) = file.file_name.as_deref()
        && let Some(mime) = mime_guess::from_path(name).first()
    {
        return mime.type_() == mime_guess::mime::IMAGE;
    }
    image::guess_format(&file.bytes).is_ok()
}

/// Pointer-driven editor for one document.
pub struct InteractionController {
    config: InteractionConfig,
    surface: Rc<dyn PointerSurface>,
    state: State,
    notices: NoticeBoard,
}

impl InteractionController {
    pub fn new(config: InteractionConfig, surface: Rc<dyn PointerSurface>) -> Self {
        Self {
            config,
            surface,
            state: State::Idle,
            notices: NoticeBoard::default(),
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn state(&self) -> StateKind {
        match self.state {
            State::Idle => StateKind::Idle,
            State::Focused(_) => StateKind::Focused,
            State::Resizing(_) => StateKind::Resizing,
            State::Moving(_) => StateKind::Moving,
        }
    }

    /// The focused slot or field. Drags keep their slot focused.
    pub fn focus(&self) -> Option<Target> {
        match &self.state {
            State::Idle => None,
            State::Focused(target) => Some(target.clone()),
            State::Resizing(drag) => Some(Target::Slot(drag.slot.clone())),
            State::Moving(drag) => Some(Target::Slot(drag.slot.clone())),
        }
    }

    /// Key of the focused slot, if a slot is focused.
    pub fn focused_slot(&self) -> Option<String> {
        match self.focus() {
            Some(Target::Slot(key)) => Some(key),
            _ => None,
        }
    }

    /// Feed one pointer event. Returns the state after the event.
    pub fn handle(&mut self, doc: &mut Document, event: PointerEvent) -> StateKind {
        match event {
            PointerEvent::Down { hit, x, y } => self.pointer_down(doc, hit, x, y),
            PointerEvent::Move { x, y } => self.pointer_move(doc, x, y),
            PointerEvent::Up { x, y } => {
                if matches!(self.state, State::Resizing(_) | State::Moving(_)) {
                    self.pointer_move(doc, x, y);
                    tracing::debug!(state = ?self.state(), "drag committed");
                    // Dropping the drag releases its global listener.
                    self.state = State::Idle;
                }
            }
            PointerEvent::Blur => {
                if matches!(self.state, State::Focused(_)) {
                    self.state = State::Idle;
                }
            }
        }
        self.state()
    }

    fn pointer_down(&mut self, doc: &Document, hit: Hit, x: i32, y: i32) {
        if matches!(self.state, State::Resizing(_) | State::Moving(_)) {
            return;
        }
        let focused_slot = self.focused_slot();

        self.state = match hit {
            Hit::Background => State::Idle,
            Hit::Field { key } => State::Focused(Target::Field(key)),
            // Handles and body only act on the slot that already has focus.
            Hit::Slot { key, .. } if focused_slot.as_deref() != Some(key.as_str()) => {
                State::Focused(Target::Slot(key))
            }
            Hit::Slot {
                key,
                part: SlotPart::Handle(corner),
            } => {
                let slot = doc.get_slot(&key);
                tracing::debug!(slot = %key, ?corner, "resize started");
                State::Resizing(ResizeDrag {
                    slot: key,
                    corner,
                    start_x: x,
                    start_y: y,
                    start_size: slot.size_percent,
                    _listener: ListenerLease::acquire(&self.surface),
                })
            }
            Hit::Slot {
                key,
                part: SlotPart::Body,
            } => {
                let slot = doc.get_slot(&key);
                tracing::debug!(slot = %key, "move started");
                State::Moving(MoveDrag {
                    slot: key,
                    start_x: x,
                    start_y: y,
                    start_position: slot.position,
                    _listener: ListenerLease::acquire(&self.surface),
                })
            }
        };
    }

    fn pointer_move(&mut self, doc: &mut Document, x: i32, y: i32) {
        match &self.state {
            State::Resizing(drag) => {
                let scalar = drag.corner.project(
                    x.saturating_sub(drag.start_x),
                    y.saturating_sub(drag.start_y),
                );
                let size = drag.start_size + scalar * self.config.resize_scale;
                let position = doc.get_slot(&drag.slot).position;
                doc.set_slot_geometry_within(
                    &drag.slot,
                    size,
                    position,
                    self.config.min_size,
                    self.config.max_size,
                );
            }
            State::Moving(drag) => {
                let position = drag
                    .start_position
                    .offset(x.saturating_sub(drag.start_x), y.saturating_sub(drag.start_y));
                let slot = doc.slot_entry(&drag.slot);
                slot.position = position;
            }
            State::Idle | State::Focused(_) => {}
        }
    }

    /// Apply a discrete edit. Returns false if it did not apply.
    pub fn apply(&mut self, doc: &mut Document, command: Command) -> bool {
        match command {
            Command::Align { slot, alignment } => {
                doc.set_slot_alignment(&slot, alignment);
                true
            }
            Command::EditText { value } => match self.focus() {
                Some(Target::Field(key)) => {
                    doc.set_field(&key, value);
                    true
                }
                _ => false,
            },
            Command::SetFieldStyle { field, style } => {
                doc.set_field_style(&field, style);
                true
            }
            Command::SetSlotStyle { slot, style } => {
                doc.set_slot_style(&slot, style);
                true
            }
            Command::SetContainerWidth { slot, percent } => {
                doc.set_container_width(&slot, percent);
                true
            }
            Command::RemoveSection { section } => doc.hide_section(&section),
            Command::DeleteImage { slot } => {
                if let Some(index) = parse_extra_slot_key(&slot) {
                    if doc.remove_extra_slot(index).is_none() {
                        return false;
                    }
                    // Later extra slots were renumbered; drop any stale focus.
                    if matches!(self.state, State::Focused(_)) {
                        self.state = State::Idle;
                    }
                    true
                } else if doc.slot(&slot).is_some() {
                    doc.clear_slot(&slot);
                    true
                } else {
                    false
                }
            }
            Command::AddExtraSlot => match doc.add_extra_slot() {
                Some(key) => {
                    tracing::debug!(slot = %key, "extra slot added");
                    true
                }
                None => false,
            },
        }
    }

    /// Check an incoming file before it is uploaded.
    ///
    /// A non-image is refused with a visible rejection notice.
    pub fn accept_image(&mut self, file: &UploadedImage) -> Result<(), Rejection> {
        if is_image_payload(file) {
            return Ok(());
        }
        let rejection = Rejection::NotAnImage {
            file_name: file.file_name.clone(),
        };
        tracing::info!(file = ?file.file_name, "rejected non-image payload");
        self.notices.push(
            NoticeKind::Rejection,
            rejection.to_string(),
            Instant::now(),
            self.config.ack_duration(),
        );
        Err(rejection)
    }

    /// Bind an uploaded image URL to a slot.
    ///
    /// Upload, drop and paste share this effect; paste additionally shows a
    /// one-shot acknowledgment.
    pub fn bind_image(&mut self, doc: &mut Document, slot: &str, url: String, source: ImageSource) {
        doc.set_slot_url(slot, Some(url));
        if source == ImageSource::Paste {
            self.notices.push(
                NoticeKind::Acknowledgment,
                "Image pasted",
                Instant::now(),
                self.config.ack_duration(),
            );
        }
    }

    /// Validate, upload and bind an incoming file in one step.
    ///
    /// Returns `Ok(None)` when the file was rejected (a notice is queued),
    /// `Ok(Some(url))` once bound. Storage failures are returned as-is.
    pub async fn place_image(
        &mut self,
        doc: &mut Document,
        store: &dyn ImageStore,
        slot: &str,
        source: ImageSource,
        file: UploadedImage,
    ) -> Result<Option<String>, StoreError> {
        if self.accept_image(&file).is_err() {
            return Ok(None);
        }
        let url = store.upload(file).await?;
        self.bind_image(doc, slot, url.clone(), source);
        Ok(Some(url))
    }

    /// Notices visible at `now`.
    pub fn notices(&mut self, now: Instant) -> &[Notice] {
        self.notices.visible(now)
    }

    /// Abandon any drag and focus. Called when the editor view goes away.
    pub fn teardown(&mut self) {
        self.state = State::Idle;
        self.notices.clear();
    }
}
