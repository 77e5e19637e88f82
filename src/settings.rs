use std::path::PathBuf;

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::capture::{PixelFormat, DEFAULT_TOLERANCE};
use crate::stroke::StrokeStyle;

/// User settings restored between runs.
///
/// Strokes themselves are not part of the settings and never outlive a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old settings
pub struct CanvasSettings {
    /// Style applied to new strokes
    pub style: StrokeStyle,
    pub background: Color32,
    pub capture_format: PixelFormat,
    /// Directory exported images and saved drawings go to; must already exist
    pub export_dir: PathBuf,
    /// How far the straight pieces a curve is drawn with may stray from it, in points
    pub flatten_tolerance: f32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            style: StrokeStyle::default(),
            background: Color32::BLACK,
            capture_format: PixelFormat::default(),
            export_dir: PathBuf::from("."),
            flatten_tolerance: DEFAULT_TOLERANCE,
        }
    }
}
