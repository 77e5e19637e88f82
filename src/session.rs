use egui::Color32;
use log::debug;

use crate::document::CanvasDocument;
use crate::error::StyleError;
use crate::history::{HistorySubscription, StrokeHistory};
use crate::input::CanvasInput;
use crate::settings::CanvasSettings;
use crate::stroke::StrokeStyle;

/// One drawing session: the stroke history plus the style for the next stroke.
///
/// Pointer events come in through [`CanvasSession::handle_input`] on the UI
/// thread. Style setters only affect strokes started afterwards.
#[derive(Debug, Default)]
pub struct CanvasSession {
    history: StrokeHistory,
    style: StrokeStyle,
    drawing: bool,
}

impl CanvasSession {
    pub fn new(settings: &CanvasSettings) -> Self {
        Self {
            history: StrokeHistory::with_background(settings.background),
            style: settings.style,
            drawing: false,
        }
    }

    /// Apply one pointer event. Returns true if the canvas content changed.
    pub fn handle_input(&mut self, input: CanvasInput) -> bool {
        match input {
            CanvasInput::Down(point) => {
                self.drawing = true;
                self.history.insert_new_stroke(point, &self.style);
                true
            }
            // Only the stroke opened by the current press may grow
            CanvasInput::Move(point) => self.drawing && self.history.append_point(point),
            CanvasInput::Up => {
                self.drawing = false;
                false
            }
            CanvasInput::Tap(point) => {
                // A tap is a stroke whose second point repeats the first
                self.history.insert_new_stroke(point, &self.style);
                self.history.append_point(point);
                true
            }
        }
    }

    /// True between a press and its release
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn set_color(&mut self, color: Color32) {
        self.style.set_color(color);
    }

    pub fn set_stroke_width(&mut self, width: f32) -> Result<(), StyleError> {
        self.style.set_width(width)
    }

    pub fn set_opacity(&mut self, opacity: f32) -> Result<(), StyleError> {
        self.style.set_opacity(opacity)
    }

    pub fn set_background_color(&mut self, color: Color32) {
        self.history.set_background(color);
    }

    /// Undo and redo end any drag in progress; later moves are ignored until the next press
    pub fn undo(&mut self) -> bool {
        self.drawing = false;
        self.history.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.drawing = false;
        self.history.redo()
    }

    pub fn reset(&mut self) {
        self.drawing = false;
        self.history.reset();
    }

    pub fn export_document(&self) -> CanvasDocument {
        self.history.export_document()
    }

    pub fn import_document(&mut self, document: CanvasDocument) {
        debug!("Session importing document");
        self.drawing = false;
        self.history.import_document(document);
    }

    pub fn subscribe(&self) -> HistorySubscription {
        self.history.subscribe()
    }

    pub fn history(&self) -> &StrokeHistory {
        &self.history
    }
}
