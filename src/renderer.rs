// src/renderer.rs
use egui::{Color32, Painter, Pos2, Rect, Shape, Stroke as EguiStroke};

use crate::capture::DEFAULT_TOLERANCE;
use crate::stroke::Stroke;

/// Paints strokes onto an egui canvas
#[derive(Debug, Clone)]
pub struct Renderer {
    /// Curve flattening tolerance, in points
    tolerance: f32,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl Renderer {
    pub fn new(tolerance: f32) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f32) {
        self.tolerance = tolerance;
    }

    /// Shapes for one stroke, with canvas coordinates offset by `origin`.
    ///
    /// The smoothed path is recomputed on every call so in-progress strokes
    /// always show their latest points.
    pub fn stroke_shapes(&self, stroke: &Stroke, origin: Pos2) -> Vec<Shape> {
        if !stroke.is_visible() {
            return Vec::new();
        }

        let points: Vec<Pos2> = stroke
            .path()
            .flatten(self.tolerance)
            .into_iter()
            .map(|p| origin + p.to_vec2())
            .collect();
        let color = stroke.effective_color();
        let radius = stroke.width() / 2.0;

        let mut shapes = Vec::with_capacity(3);
        // Round caps
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            shapes.push(Shape::circle_filled(first, radius, color));
            shapes.push(Shape::circle_filled(last, radius, color));
        }
        shapes.push(Shape::line(points, EguiStroke::new(stroke.width(), color)));
        shapes
    }

    /// Renders the background and every stroke inside `rect`
    pub fn render(&self, painter: &Painter, rect: Rect, background: Color32, strokes: &[Stroke]) {
        painter.rect_filled(rect, 0.0, background);

        let shapes: Vec<Shape> = strokes
            .iter()
            .flat_map(|stroke| self.stroke_shapes(stroke, rect.min))
            .collect();
        painter.extend(shapes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::StrokeStyle;
    use egui::pos2;

    #[test]
    fn test_single_point_stroke_has_no_shapes() {
        let renderer = Renderer::default();
        let stroke = Stroke::from_points(vec![pos2(1.0, 1.0)], &StrokeStyle::default());
        assert!(renderer.stroke_shapes(&stroke, Pos2::ZERO).is_empty());
    }

    #[test]
    fn test_stroke_shapes_are_offset() {
        let renderer = Renderer::default();
        let style = StrokeStyle::default();
        let stroke = Stroke::from_points(vec![pos2(0.0, 0.0), pos2(10.0, 0.0)], &style);
        let shapes = renderer.stroke_shapes(&stroke, pos2(100.0, 100.0));

        assert_eq!(shapes.len(), 3);
        let rect = shapes[2].visual_bounding_rect();
        assert!(rect.contains(pos2(105.0, 100.0)));
        assert!(!rect.contains(pos2(5.0, 0.0)));
    }

    #[test]
    fn test_render_basics() {
        let renderer = Renderer::default();
        let ctx = egui::Context::default();
        let layer_id = egui::LayerId::background();
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(100.0, 100.0));
        let painter = egui::Painter::new(ctx.clone(), layer_id, rect);

        let style = StrokeStyle::default();
        let stroke = Stroke::from_points(vec![pos2(0.0, 0.0), pos2(50.0, 50.0)], &style);
        renderer.render(&painter, rect, Color32::WHITE, &[stroke]);
    }
}
