use egui::{Color32, Pos2, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StyleError;
use crate::geometry::{self, SmoothPath};

/// The style applied to the next stroke that gets started.
///
/// Changing the style never touches strokes that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StyleFields")]
pub struct StrokeStyle {
    color: Color32,
    width: f32,
    opacity: f32,
}

/// Stored form of a [`StrokeStyle`]; goes through the same checks as the setters
#[derive(Deserialize)]
#[serde(default)]
struct StyleFields {
    color: Color32,
    width: f32,
    opacity: f32,
}

impl Default for StyleFields {
    fn default() -> Self {
        let style = StrokeStyle::default();
        Self {
            color: style.color,
            width: style.width,
            opacity: style.opacity,
        }
    }
}

impl TryFrom<StyleFields> for StrokeStyle {
    type Error = StyleError;

    fn try_from(fields: StyleFields) -> Result<Self, Self::Error> {
        Self::new(fields.color, fields.width, fields.opacity)
    }
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Color32::RED,
            width: 10.0,
            opacity: 1.0,
        }
    }
}

impl StrokeStyle {
    pub fn new(color: Color32, width: f32, opacity: f32) -> Result<Self, StyleError> {
        let mut style = Self { color, ..Self::default() };
        style.set_width(width)?;
        style.set_opacity(opacity)?;
        Ok(style)
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_color(&mut self, color: Color32) {
        self.color = color;
    }

    /// Width must be finite and strictly positive
    pub fn set_width(&mut self, width: f32) -> Result<(), StyleError> {
        if !width.is_finite() || width <= 0.0 {
            return Err(StyleError::InvalidWidth(width));
        }
        self.width = width;
        Ok(())
    }

    /// Opacity is clamped into [0, 1]; NaN is rejected
    pub fn set_opacity(&mut self, opacity: f32) -> Result<(), StyleError> {
        if opacity.is_nan() {
            return Err(StyleError::InvalidOpacity(opacity));
        }
        self.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }
}

/// One continuous drawn path with a fixed color, width and opacity.
///
/// Points can only be appended by the history while the stroke is the one
/// being drawn. Everything else about a stroke is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StrokeFields")]
pub struct Stroke {
    id: Uuid,
    points: Vec<Pos2>,
    color: Color32,
    width: f32,
    opacity: f32,
}

#[derive(Deserialize)]
struct StrokeFields {
    id: Uuid,
    points: Vec<Pos2>,
    color: Color32,
    width: f32,
    opacity: f32,
}

impl TryFrom<StrokeFields> for Stroke {
    type Error = StyleError;

    fn try_from(fields: StrokeFields) -> Result<Self, Self::Error> {
        let style = StrokeStyle::new(fields.color, fields.width, fields.opacity)?;
        Ok(Self {
            id: fields.id,
            points: fields.points,
            color: style.color(),
            width: style.width(),
            opacity: style.opacity(),
        })
    }
}

impl Stroke {
    /// Start a stroke with a single point
    pub(crate) fn begin(first_point: Pos2, style: &StrokeStyle) -> Self {
        Self::from_points(vec![first_point], style)
    }

    /// Build a finished stroke, e.g. when assembling a document to import
    pub fn from_points(points: Vec<Pos2>, style: &StrokeStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            color: style.color(),
            width: style.width(),
            opacity: style.opacity(),
        }
    }

    pub(crate) fn push_point(&mut self, point: Pos2) {
        self.points.push(point);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// A stroke leaves no mark until it has at least two points
    pub fn is_visible(&self) -> bool {
        self.points.len() >= 2
    }

    /// Stroke color with the stroke opacity folded in
    pub fn effective_color(&self) -> Color32 {
        self.color.gamma_multiply(self.opacity)
    }

    pub fn path(&self) -> SmoothPath {
        geometry::smooth_path(&self.points)
    }

    /// Area covered by the stroke, including half the line width on each side
    pub fn rect(&self) -> Rect {
        if !self.is_visible() {
            return Rect::NOTHING;
        }
        geometry::calculate_bounds(&self.points, self.width / 2.0)
    }
}
