use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::stroke::Stroke;

/// Serializable snapshot of a canvas: background color plus the visible strokes.
///
/// A document owns its strokes, so later edits to the history it came from never
/// show up in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasDocument {
    background: Color32,
    #[serde(default)]
    strokes: Vec<Stroke>,
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self::new(Color32::BLACK, Vec::new())
    }
}

impl CanvasDocument {
    pub fn new(background: Color32, strokes: Vec<Stroke>) -> Self {
        Self { background, strokes }
    }

    pub fn background(&self) -> Color32 {
        self.background
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Strokes that actually leave a mark
    pub fn visible_strokes(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter().filter(|stroke| stroke.is_visible())
    }

    pub fn into_parts(self) -> (Color32, Vec<Stroke>) {
        (self.background, self.strokes)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
