use egui::{Pos2, Rect};

use super::common::{calculate_bounds, midpoint};

/// Upper bound on the pieces a single quadratic segment is flattened into
pub const MAX_QUAD_SUBDIVISIONS: usize = 64;

/// One drawing instruction of a smoothed stroke path
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    /// Place the cursor without drawing
    MoveTo(Pos2),
    /// Straight line from the cursor
    LineTo(Pos2),
    /// Quadratic curve from the cursor through `control` to `to`
    QuadTo { control: Pos2, to: Pos2 },
}

impl PathSegment {
    /// Where the cursor ends up after this segment
    pub fn end_point(&self) -> Pos2 {
        match *self {
            PathSegment::MoveTo(p) | PathSegment::LineTo(p) => p,
            PathSegment::QuadTo { to, .. } => to,
        }
    }
}

/// A renderable smooth path built from raw stroke points.
///
/// Paths are cheap to rebuild and are recomputed whenever the stroke gains a point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothPath {
    segments: Vec<PathSegment>,
}

/// Build a smooth path through `points` using midpoint quadratic interpolation.
///
/// Every interior point becomes the control point of a quadratic curve that ends
/// at the midpoint between it and its successor. The first midpoint is reached
/// with a straight line and the path is closed off with a straight line to the
/// final point. Fewer than two points yield an empty path, so a lone touch
/// renders nothing until the stroke receives a second point.
pub fn smooth_path(points: &[Pos2]) -> SmoothPath {
    if points.len() < 2 {
        return SmoothPath::default();
    }

    let mut segments = Vec::with_capacity(points.len() + 1);
    segments.push(PathSegment::MoveTo(points[0]));

    for i in 1..points.len() {
        let previous = points[i - 1];
        let mid = midpoint(previous, points[i]);
        if i == 1 {
            segments.push(PathSegment::LineTo(mid));
        } else {
            segments.push(PathSegment::QuadTo { control: previous, to: mid });
        }
    }

    segments.push(PathSegment::LineTo(points[points.len() - 1]));

    SmoothPath { segments }
}

impl SmoothPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First cursor position of the path
    pub fn start(&self) -> Option<Pos2> {
        self.segments.first().map(PathSegment::end_point)
    }

    /// Last cursor position of the path
    pub fn end(&self) -> Option<Pos2> {
        self.segments.last().map(PathSegment::end_point)
    }

    /// Approximate the path with a polyline.
    ///
    /// Quadratic segments are cut into equal parameter steps so that the
    /// polyline never strays more than `tolerance` from the curve.
    pub fn flatten(&self, tolerance: f32) -> Vec<Pos2> {
        let tolerance = tolerance.max(f32::EPSILON);
        let mut polyline = Vec::with_capacity(self.segments.len() * 2);
        let mut cursor = Pos2::ZERO;

        for segment in &self.segments {
            match *segment {
                PathSegment::MoveTo(p) | PathSegment::LineTo(p) => {
                    polyline.push(p);
                    cursor = p;
                }
                PathSegment::QuadTo { control, to } => {
                    // n equal steps keep each chord within |from - 2 control + to| / (4 n^2)
                    let bend = (cursor.to_vec2() - 2.0 * control.to_vec2() + to.to_vec2()).length();
                    let pieces = ((bend / (4.0 * tolerance)).sqrt().ceil() as usize)
                        .clamp(1, MAX_QUAD_SUBDIVISIONS);
                    for k in 1..=pieces {
                        let t = k as f32 / pieces as f32;
                        polyline.push(quadratic_point(cursor, control, to, t));
                    }
                    cursor = to;
                }
            }
        }

        polyline
    }

    /// Bounding box of every point the path references, control points included
    pub fn bounding_rect(&self) -> Rect {
        let points: Vec<Pos2> = self
            .segments
            .iter()
            .flat_map(|segment| match *segment {
                PathSegment::QuadTo { control, to } => vec![control, to],
                other => vec![other.end_point()],
            })
            .collect();
        calculate_bounds(&points, 0.0)
    }
}

fn quadratic_point(from: Pos2, control: Pos2, to: Pos2, t: f32) -> Pos2 {
    let u = 1.0 - t;
    Pos2::new(
        u * u * from.x + 2.0 * u * t * control.x + t * t * to.x,
        u * u * from.y + 2.0 * u * t * control.y + t * t * to.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn test_short_inputs_render_nothing() {
        assert!(smooth_path(&[]).is_empty());
        assert!(smooth_path(&[pos2(3.0, 4.0)]).is_empty());
        assert!(smooth_path(&[pos2(3.0, 4.0)]).flatten(0.5).is_empty());
    }

    #[test]
    fn test_two_points_are_a_straight_line() {
        let path = smooth_path(&[pos2(0.0, 0.0), pos2(10.0, 0.0)]);
        assert_eq!(
            path.segments(),
            &[
                PathSegment::MoveTo(pos2(0.0, 0.0)),
                PathSegment::LineTo(pos2(5.0, 0.0)),
                PathSegment::LineTo(pos2(10.0, 0.0)),
            ]
        );
    }

    #[test]
    fn test_interior_points_become_controls() {
        let points = [pos2(0.0, 0.0), pos2(10.0, 10.0), pos2(20.0, 5.0), pos2(30.0, 0.0)];
        let path = smooth_path(&points);

        assert_eq!(path.segments().len(), points.len() + 1);
        assert_eq!(
            path.segments()[2],
            PathSegment::QuadTo { control: pos2(10.0, 10.0), to: pos2(15.0, 7.5) }
        );
        assert_eq!(
            path.segments()[3],
            PathSegment::QuadTo { control: pos2(20.0, 5.0), to: pos2(25.0, 2.5) }
        );
    }

    #[test]
    fn test_final_segment_uses_last_point_coordinates() {
        let path = smooth_path(&[pos2(0.0, 0.0), pos2(10.0, 10.0), pos2(20.0, 5.0)]);
        assert_eq!(path.segments().last(), Some(&PathSegment::LineTo(pos2(20.0, 5.0))));
    }

    #[test]
    fn test_flatten_keeps_endpoints() {
        let path = smooth_path(&[pos2(0.0, 0.0), pos2(40.0, 40.0), pos2(80.0, 0.0)]);
        let polyline = path.flatten(0.25);

        assert_eq!(polyline.first(), Some(&pos2(0.0, 0.0)));
        assert_eq!(polyline.last(), Some(&pos2(80.0, 0.0)));
        // The curve got subdivided
        assert!(polyline.len() > 4);
        assert!(polyline.len() <= 3 + MAX_QUAD_SUBDIVISIONS);
    }

    #[test]
    fn test_flatten_stays_within_tolerance() {
        use crate::geometry::distance_to_line_segment;

        // The only curved segment runs between the two midpoints around the peak
        let path = smooth_path(&[pos2(0.0, 0.0), pos2(50.0, 100.0), pos2(100.0, 0.0)]);
        let (from, control, to) = (pos2(25.0, 50.0), pos2(50.0, 100.0), pos2(75.0, 50.0));

        for tolerance in [0.1, 0.5, 2.0] {
            let polyline = path.flatten(tolerance);
            for step in 0..=200 {
                let point = quadratic_point(from, control, to, step as f32 / 200.0);
                let nearest = polyline
                    .windows(2)
                    .map(|w| distance_to_line_segment(point, w[0], w[1]))
                    .fold(f32::INFINITY, f32::min);
                assert!(nearest <= tolerance + 1e-3, "{} away at tolerance {}", nearest, tolerance);
            }
        }
    }

    #[test]
    fn test_flat_quadratics_are_not_subdivided() {
        // Control on the chord midpoint: the curve is a straight line
        let path = smooth_path(&[pos2(0.0, 0.0), pos2(10.0, 0.0), pos2(20.0, 0.0)]);
        assert_eq!(path.flatten(0.1).len(), path.segments().len());
    }

    #[test]
    fn test_bounding_rect_contains_controls() {
        let path = smooth_path(&[pos2(0.0, 0.0), pos2(10.0, 20.0), pos2(20.0, 0.0)]);
        let rect = path.bounding_rect();
        assert!(rect.contains(pos2(10.0, 20.0)));
        assert!(rect.contains(pos2(0.0, 0.0)));
    }
}
