use egui::{Pos2, Rect};

/// Midpoint between two points
pub fn midpoint(start: Pos2, end: Pos2) -> Pos2 {
    Pos2::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0)
}

/// Calculate distance from a point to a line segment
pub(crate) fn distance_to_line_segment(point: Pos2, line_start: Pos2, line_end: Pos2) -> f32 {
    let line_vec = line_end - line_start;
    let point_vec = point - line_start;

    let line_len = line_vec.length();
    if line_len == 0.0 {
        return point_vec.length();
    }

    let t = ((point_vec.x * line_vec.x + point_vec.y * line_vec.y) / line_len).clamp(0.0, line_len);
    let projection = line_start + (line_vec * t / line_len);
    (point - projection).length()
}

/// Calculate the bounding box for a set of points
pub(crate) fn calculate_bounds(points: &[Pos2], padding: f32) -> Rect {
    if points.is_empty() {
        return Rect::NOTHING;
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    Rect::from_min_max(
        Pos2::new(min_x - padding, min_y - padding),
        Pos2::new(max_x + padding, max_y + padding),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint() {
        let mid = midpoint(Pos2::new(0.0, 0.0), Pos2::new(10.0, -4.0));
        assert_eq!(mid, Pos2::new(5.0, -2.0));
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);

        assert!((distance_to_line_segment(Pos2::new(5.0, 3.0), a, b) - 3.0).abs() < 0.001);
        // Past the end cap the distance is measured to the endpoint
        assert!((distance_to_line_segment(Pos2::new(13.0, 4.0), a, b) - 5.0).abs() < 0.001);
        // Degenerate segment
        assert!((distance_to_line_segment(Pos2::new(3.0, 4.0), a, a) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_bounds_with_padding() {
        let rect = calculate_bounds(&[Pos2::new(1.0, 2.0), Pos2::new(5.0, -1.0)], 1.0);
        assert_eq!(rect.min, Pos2::new(0.0, -2.0));
        assert_eq!(rect.max, Pos2::new(6.0, 3.0));

        assert_eq!(calculate_bounds(&[], 1.0), Rect::NOTHING);
    }
}
