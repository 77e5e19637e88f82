use std::sync::Arc;

use egui::{Color32, Pos2};
use futures::FutureExt;
use futures::future::BoxFuture;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use crate::document::CanvasDocument;
use crate::error::CaptureError;
use crate::geometry::{calculate_bounds, distance_to_line_segment};

/// Largest width or height the software rasterizer accepts
pub const MAX_SURFACE_DIMENSION: u32 = 16_384;

/// Default flattening tolerance for curves, in pixels
pub const DEFAULT_TOLERANCE: f32 = 0.5;

/// What the coordinator asks the platform to grab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTarget {
    /// Surface size in physical pixels, both dimensions non-zero
    pub size: [u32; 2],
}

/// Pixels grabbed from the surface, resolved off the UI thread
pub type SurfaceFuture = BoxFuture<'static, Result<RgbaImage, CaptureError>>;

/// Platform side of a capture: produce the pixels currently shown on the surface.
///
/// Implementations only grab pixels. Ordering, layout waiting and delivery are
/// handled by the [`CaptureWorker`](super::CaptureWorker).
pub trait SurfaceCapturer: Send + Sync + 'static {
    fn capture_surface(&self, target: CaptureTarget) -> SurfaceFuture;
}

#[derive(Debug)]
struct PresentedScene {
    document: CanvasDocument,
    pixels_per_point: f32,
    tolerance: f32,
}

/// A surface that keeps the last presented document and rasterizes it in software.
///
/// Call [`SoftwareSurface::present`] whenever the on-screen content changes.
/// Clones share the presented scene.
#[derive(Debug, Clone)]
pub struct SoftwareSurface {
    scene: Arc<Mutex<PresentedScene>>,
}

impl Default for SoftwareSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareSurface {
    pub fn new() -> Self {
        Self {
            scene: Arc::new(Mutex::new(PresentedScene {
                document: CanvasDocument::default(),
                pixels_per_point: 1.0,
                tolerance: DEFAULT_TOLERANCE,
            })),
        }
    }

    /// Replace what the surface shows. Stroke coordinates are in points and get
    /// scaled by `pixels_per_point` when rasterized.
    pub fn present(&self, document: CanvasDocument, pixels_per_point: f32) {
        let mut scene = self.scene.lock();
        scene.document = document;
        scene.pixels_per_point = pixels_per_point;
    }

    pub fn set_tolerance(&self, tolerance: f32) {
        self.scene.lock().tolerance = tolerance;
    }
}

impl SurfaceCapturer for SoftwareSurface {
    fn capture_surface(&self, target: CaptureTarget) -> SurfaceFuture {
        let scene = Arc::clone(&self.scene);
        async move {
            let presented = scene.lock();
            rasterize(
                &presented.document,
                target.size,
                presented.pixels_per_point,
                presented.tolerance,
            )
        }
        .boxed()
    }
}

/// Render `document` into an image of `size` pixels.
///
/// The background fills the whole image, then every visible stroke is drawn
/// with round caps and joins. Each stroke is blended once, so overlapping
/// parts of the same stroke do not darken.
pub fn rasterize(
    document: &CanvasDocument,
    size: [u32; 2],
    pixels_per_point: f32,
    tolerance: f32,
) -> Result<RgbaImage, CaptureError> {
    let [width, height] = size;
    if width == 0 || height == 0 {
        return Err(CaptureError::ZeroArea { width, height });
    }
    if width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION {
        return Err(CaptureError::Rasterization(format!(
            "surface {}x{} exceeds {} pixels per side",
            width, height, MAX_SURFACE_DIMENSION
        )));
    }

    let background = Rgba(document.background().to_srgba_unmultiplied());
    let mut image = RgbaImage::from_pixel(width, height, background);
    let scale = if pixels_per_point.is_finite() && pixels_per_point > 0.0 {
        pixels_per_point
    } else {
        1.0
    };

    for stroke in document.visible_strokes() {
        let polyline: Vec<Pos2> = stroke
            .path()
            .flatten(tolerance / scale)
            .into_iter()
            .map(|p| Pos2::new(p.x * scale, p.y * scale))
            .collect();
        let radius = stroke.width() * scale / 2.0;
        paint_polyline(&mut image, &polyline, radius, stroke.color(), stroke.opacity());
    }

    Ok(image)
}

/// Pixel rectangle `[x0, y0, x1, y1)` within `reach` of the polyline, clipped to the image
fn covered_region(polyline: &[Pos2], reach: f32, width: u32, height: u32) -> Option<[u32; 4]> {
    let bounds = calculate_bounds(polyline, reach);
    if bounds.is_negative() {
        return None;
    }
    let x0 = bounds.min.x.floor().max(0.0) as u32;
    let y0 = bounds.min.y.floor().max(0.0) as u32;
    let x1 = (bounds.max.x.ceil().max(0.0) as u32).min(width);
    let y1 = (bounds.max.y.ceil().max(0.0) as u32).min(height);
    (x0 < x1 && y0 < y1).then_some([x0, y0, x1, y1])
}

fn paint_polyline(
    image: &mut RgbaImage,
    polyline: &[Pos2],
    radius: f32,
    color: Color32,
    opacity: f32,
) {
    let (width, height) = image.dimensions();
    let reach = radius + 1.0;
    let Some([left, top, right, bottom]) = covered_region(polyline, reach, width, height) else {
        return;
    };
    let region_width = right - left;
    let mut coverage = vec![0.0f32; region_width as usize * (bottom - top) as usize];

    for segment in polyline.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let x0 = ((a.x.min(b.x) - reach).floor().max(0.0) as u32).max(left);
        let y0 = ((a.y.min(b.y) - reach).floor().max(0.0) as u32).max(top);
        let x1 = ((a.x.max(b.x) + reach).ceil().max(0.0) as u32).min(right);
        let y1 = ((a.y.max(b.y) + reach).ceil().max(0.0) as u32).min(bottom);

        for y in y0..y1 {
            for x in x0..x1 {
                let center = Pos2::new(x as f32 + 0.5, y as f32 + 0.5);
                let distance = distance_to_line_segment(center, a, b);
                // One pixel of linear falloff at the edge
                let covered = (radius + 0.5 - distance).clamp(0.0, 1.0);
                let cell = &mut coverage[((y - top) * region_width + (x - left)) as usize];
                *cell = cell.max(covered);
            }
        }
    }

    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let alpha = a as f32 / 255.0 * opacity.clamp(0.0, 1.0);

    for (index, covered) in coverage.into_iter().enumerate() {
        if covered <= 0.0 {
            continue;
        }
        let x = left + index as u32 % region_width;
        let y = top + index as u32 / region_width;
        let src_alpha = alpha * covered;
        let pixel = image.get_pixel_mut(x, y);
        let Rgba([dr, dg, db, da]) = *pixel;
        *pixel = Rgba([
            blend(r, dr, src_alpha),
            blend(g, dg, src_alpha),
            blend(b, db, src_alpha),
            (src_alpha * 255.0 + da as f32 * (1.0 - src_alpha)).round() as u8,
        ]);
    }
}

fn blend(src: u8, dst: u8, alpha: f32) -> u8 {
    (src as f32 * alpha + dst as f32 * (1.0 - alpha)).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::{Stroke, StrokeStyle};
    use egui::pos2;

    fn document_with_line(opacity: f32) -> CanvasDocument {
        let style = StrokeStyle::new(Color32::RED, 4.0, opacity).unwrap();
        let stroke = Stroke::from_points(vec![pos2(2.0, 10.0), pos2(18.0, 10.0)], &style);
        CanvasDocument::new(Color32::WHITE, vec![stroke])
    }

    #[test]
    fn test_background_fill() {
        let document = CanvasDocument::new(Color32::from_rgb(1, 2, 3), Vec::new());
        let image = rasterize(&document, [4, 3], 1.0, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(image.dimensions(), (4, 3));
        assert!(image.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));
    }

    #[test]
    fn test_stroke_is_drawn() {
        let image = rasterize(&document_with_line(1.0), [20, 20], 1.0, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(*image.get_pixel(10, 10), Rgba([255, 0, 0, 255]));
        // Far away from the line
        assert_eq!(*image.get_pixel(10, 1), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_opacity_blends_with_background() {
        let image = rasterize(&document_with_line(0.5), [20, 20], 1.0, DEFAULT_TOLERANCE).unwrap();
        let Rgba([r, g, b, _]) = *image.get_pixel(10, 10);
        assert_eq!(r, 255);
        assert!((126..=129).contains(&g));
        assert_eq!(g, b);
    }

    #[test]
    fn test_pixels_per_point_scales_strokes() {
        let image = rasterize(&document_with_line(1.0), [40, 40], 2.0, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(*image.get_pixel(20, 20), Rgba([255, 0, 0, 255]));
        assert_eq!(*image.get_pixel(20, 10), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_single_point_strokes_leave_no_mark() {
        let style = StrokeStyle::new(Color32::RED, 8.0, 1.0).unwrap();
        let dot = Stroke::from_points(vec![pos2(5.0, 5.0)], &style);
        let document = CanvasDocument::new(Color32::WHITE, vec![dot]);
        let image = rasterize(&document, [10, 10], 1.0, DEFAULT_TOLERANCE).unwrap();
        assert!(image.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_covered_region_is_clipped() {
        let polyline = [pos2(-5.0, 2.0), pos2(3.5, 4.0)];
        assert_eq!(covered_region(&polyline, 1.5, 10, 10), Some([0, 0, 5, 6]));
        assert_eq!(covered_region(&polyline, 1.5, 3, 3), Some([0, 0, 3, 3]));
        assert_eq!(covered_region(&[pos2(-20.0, -20.0)], 2.0, 10, 10), None);
        assert_eq!(covered_region(&[pos2(30.0, 5.0)], 2.0, 10, 10), None);
    }

    #[test]
    fn test_only_pixels_near_the_stroke_change() {
        let style = StrokeStyle::new(Color32::RED, 2.0, 1.0).unwrap();
        let stroke = Stroke::from_points(vec![pos2(28.0, 28.0), pos2(31.0, 28.0)], &style);
        let document = CanvasDocument::new(Color32::WHITE, vec![stroke]);
        let image = rasterize(&document, [32, 32], 1.0, DEFAULT_TOLERANCE).unwrap();

        assert_eq!(*image.get_pixel(30, 27), Rgba([255, 0, 0, 255]));
        for (x, y, pixel) in image.enumerate_pixels() {
            if x < 26 || y < 25 || y > 30 {
                assert_eq!(*pixel, Rgba([255, 255, 255, 255]), "pixel {},{} changed", x, y);
            }
        }
    }

    #[test]
    fn test_strokes_outside_the_surface_are_skipped() {
        let style = StrokeStyle::new(Color32::RED, 4.0, 1.0).unwrap();
        let stroke = Stroke::from_points(vec![pos2(100.0, 100.0), pos2(120.0, 100.0)], &style);
        let document = CanvasDocument::new(Color32::WHITE, vec![stroke]);
        let image = rasterize(&document, [16, 16], 1.0, DEFAULT_TOLERANCE).unwrap();
        assert!(image.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_rejects_degenerate_sizes() {
        let document = CanvasDocument::default();
        assert!(matches!(
            rasterize(&document, [0, 10], 1.0, DEFAULT_TOLERANCE),
            Err(CaptureError::ZeroArea { width: 0, height: 10 })
        ));
        assert!(matches!(
            rasterize(&document, [MAX_SURFACE_DIMENSION + 1, 1], 1.0, DEFAULT_TOLERANCE),
            Err(CaptureError::Rasterization(_))
        ));
    }
}
