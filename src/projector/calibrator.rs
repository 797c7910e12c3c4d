//! Projector calibration
//!
//! One-shot geometric calibration: the arena renders a triangular marker in
//! its top-left corner and a quadrilateral marker in its bottom-right
//! corner. Each calibration frame is thresholded and searched for both
//! marker outlines; a new bounding box is locked only when both shapes
//! appear in the same frame, otherwise the previous lock is retained.

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;

use super::CalibrationBox;

const MARKER_THRESHOLD: u8 = 200;
/// Polygon approximation tolerance as a fraction of the contour perimeter
const APPROX_EPSILON: f64 = 0.01;

/// Finds the projected calibration markers on camera frames
#[derive(Debug)]
pub struct ProjectorCalibrator {
    marker_threshold: u8,
    locked: Option<CalibrationBox>,
}

impl ProjectorCalibrator {
    pub fn new() -> Self {
        Self {
            marker_threshold: MARKER_THRESHOLD,
            locked: None,
        }
    }

    /// Adjust the marker brightness cutoff (exposed as a slider in the UI)
    pub fn set_marker_threshold(&mut self, thresh: u8) {
        self.marker_threshold = thresh;
    }

    /// The last locked bounding box, if a lock was ever achieved
    pub fn locked_bbox(&self) -> Option<CalibrationBox> {
        self.locked
    }

    /// Search one grayscale camera frame for both markers.
    ///
    /// Returns the newly locked box when both markers were found; `None`
    /// leaves any previous lock in place.
    pub fn process_frame(&mut self, frame: &GrayImage) -> Option<CalibrationBox> {
        let binary = threshold(frame, self.marker_threshold, ThresholdType::Binary);

        let mut top_left: Option<(f64, f64)> = None;
        let mut bottom_right: Option<(f64, f64)> = None;

        for contour in find_contours::<i32>(&binary) {
            if contour.points.len() < 3 {
                continue;
            }

            let perimeter = arc_length(&contour.points, true);
            let approx = approximate_polygon_dp(
                &contour.points,
                APPROX_EPSILON * perimeter,
                true,
            );

            match approx.len() {
                // Triangle marks the arena's top-left corner
                3 => top_left = Some(far_left_vertex(&approx)),
                // Quadrilateral marks the bottom-right corner
                4 => bottom_right = Some(max_vertex(&approx)),
                _ => {}
            }
        }

        let (tl, br) = (top_left?, bottom_right?);
        let bbox = CalibrationBox::new(tl, br);
        log::debug!(
            "Calibration markers found: triangle at ({:.0},{:.0}), quad at ({:.0},{:.0})",
            tl.0,
            tl.1,
            br.0,
            br.1
        );

        self.locked = Some(bbox);
        Some(bbox)
    }
}

impl Default for ProjectorCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Leftmost vertex of the triangle marker
fn far_left_vertex(points: &[Point<i32>]) -> (f64, f64) {
    let mut best = points[0];
    for p in &points[1..] {
        if p.x <= best.x {
            best = *p;
        }
    }
    (best.x as f64, best.y as f64)
}

/// Farthest-from-origin vertex of the quadrilateral marker
fn max_vertex(points: &[Point<i32>]) -> (f64, f64) {
    let mut best = points[0];
    for p in &points[1..] {
        if p.x >= best.x && p.y >= best.y {
            best = *p;
        }
    }
    (best.x as f64, best.y as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::{draw_polygon_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    fn calibration_frame() -> GrayImage {
        let mut frame = GrayImage::new(640, 480);

        // Bright triangle in the top-left corner
        draw_polygon_mut(
            &mut frame,
            &[
                Point::new(20, 20),
                Point::new(120, 20),
                Point::new(70, 120),
            ],
            image::Luma([255u8]),
        );

        // Bright rectangle in the bottom-right corner
        draw_filled_rect_mut(
            &mut frame,
            Rect::at(500, 400).of_size(100, 50),
            image::Luma([255u8]),
        );

        frame
    }

    #[test]
    fn test_lock_requires_both_markers() {
        let mut calibrator = ProjectorCalibrator::new();

        // Dark frame: nothing to find, no lock
        let dark = GrayImage::new(640, 480);
        assert!(calibrator.process_frame(&dark).is_none());
        assert!(calibrator.locked_bbox().is_none());

        // Triangle only: still no lock
        let mut triangle_only = GrayImage::new(640, 480);
        draw_polygon_mut(
            &mut triangle_only,
            &[
                Point::new(20, 20),
                Point::new(120, 20),
                Point::new(70, 120),
            ],
            image::Luma([255u8]),
        );
        assert!(calibrator.process_frame(&triangle_only).is_none());
        assert!(calibrator.locked_bbox().is_none());
    }

    #[test]
    fn test_lock_from_both_markers() {
        let mut calibrator = ProjectorCalibrator::new();
        let bbox = calibrator
            .process_frame(&calibration_frame())
            .expect("both markers visible");

        // Triangle's leftmost vertex anchors the top-left
        assert!(bbox.min.0 < 40.0);
        // Quad's far corner anchors the bottom-right
        assert!(bbox.max.0 > 560.0);
        assert!(bbox.max.1 > 420.0);
        assert_eq!(calibrator.locked_bbox(), Some(bbox));
    }

    #[test]
    fn test_failed_frame_retains_previous_lock() {
        let mut calibrator = ProjectorCalibrator::new();
        let bbox = calibrator.process_frame(&calibration_frame()).unwrap();

        let dark = GrayImage::new(640, 480);
        assert!(calibrator.process_frame(&dark).is_none());
        assert_eq!(calibrator.locked_bbox(), Some(bbox));
    }
}
