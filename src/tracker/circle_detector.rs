//! Bounded-search circle detector for depth images.
//!
//! The detector crops a window around the expected marker position,
//! thresholds it to the expected depth band, cleans the mask with a
//! morphological opening and fits a minimum enclosing circle to each
//! external contour, largest first. The first circle that lands near the
//! expected origin with a plausible radius wins.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tracker::depth_frame::DepthFrame;
use crate::tracker::rect::PixelRect;
use crate::tracker::search_planner::SearchDescription;

/// A circular blob found in a depth frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Center in full-frame pixel coordinates
    pub center: Point2<f32>,
    /// Radius in pixels
    pub radius: f32,
}

impl Circle {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            center: Point2::new(x, y),
            radius,
        }
    }
}

/// Search window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Width of the cropped search window (pixels).
    pub window_width: u32,
    /// Height of the cropped search window (pixels).
    pub window_height: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_width: 100,
            window_height: 100,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::EmptySearchWindow {
                width: self.window_width,
                height: self.window_height,
            });
        }
        Ok(())
    }
}

/// Result of one detection attempt.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    /// Accepted circle, if any
    pub circle: Option<Circle>,
    /// Cleaned binary mask of the search window (diagnostics only)
    pub mask: GrayImage,
    /// Search window in frame coordinates (diagnostics only)
    pub window: PixelRect,
}

#[derive(Debug, Clone, Default)]
pub struct CircleDetector {
    config: DetectorConfig,
}

impl CircleDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Window cropped around `origin`, clipped to the frame.
    pub fn search_window(&self, frame: &DepthFrame, origin: Point2<f32>) -> PixelRect {
        let origin_x = (origin.x + 0.5).floor() as i32;
        let origin_y = (origin.y + 0.5).floor() as i32;
        let left = origin_x
            .saturating_sub((self.config.window_width / 2) as i32)
            .max(0);
        let top = origin_y
            .saturating_sub((self.config.window_height / 2) as i32)
            .max(0);

        PixelRect::new(left, top, self.config.window_width, self.config.window_height)
            .intersect(&PixelRect::frame(frame.width(), frame.height()))
    }

    /// Look for a marker inside the bounds of `search`.
    ///
    /// `origin_tolerance` is the side length (pixels) of the square, centered
    /// on the search origin, that an accepted circle center must fall in.
    pub fn detect(
        &self,
        frame: &DepthFrame,
        search: &SearchDescription,
        origin_tolerance: u32,
    ) -> DetectionOutcome {
        let window = self.search_window(frame, search.origin);
        let raw = frame.depth_mask(&window, search.min_depth, search.max_depth);

        // One opening pass with a 3x3 square
        let mask = if raw.width() == 0 || raw.height() == 0 {
            raw
        } else {
            dilate(&erode(&raw, Norm::LInf, 1), Norm::LInf, 1)
        };

        let circle = if mask.width() == 0 || mask.height() == 0 {
            None
        } else {
            select_circle(&mask, &window, search, origin_tolerance)
        };

        match circle {
            Some(c) => tracing::trace!(
                x = c.center.x,
                y = c.center.y,
                radius = c.radius,
                "circle accepted"
            ),
            None => tracing::trace!(?window, "no circle in search window"),
        }

        DetectionOutcome {
            circle,
            mask,
            window,
        }
    }
}

/// Square acceptance region of side `tolerance` around the rounded origin.
pub fn origin_region(origin: Point2<f32>, tolerance: u32) -> PixelRect {
    PixelRect::centered(
        origin.x.round() as i32,
        origin.y.round() as i32,
        tolerance,
        tolerance,
    )
}

fn select_circle(
    mask: &GrayImage,
    window: &PixelRect,
    search: &SearchDescription,
    origin_tolerance: u32,
) -> Option<Circle> {
    // Contour tracing only opens an outer border after a background pixel, so
    // blobs touching the window edge need a zero frame around the mask
    let padded = GrayImage::from_fn(mask.width() + 2, mask.height() + 2, |x, y| {
        if x == 0 || y == 0 || x > mask.width() || y > mask.height() {
            Luma([0])
        } else {
            *mask.get_pixel(x - 1, y - 1)
        }
    });

    let mut contours: Vec<Contour<i32>> = find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .collect();
    if contours.is_empty() {
        return None;
    }

    // Larger outlines first
    contours.sort_by(|a, b| b.points.len().cmp(&a.points.len()));

    let region = origin_region(search.origin, origin_tolerance);

    contours.iter().find_map(|contour| {
        let points: Vec<Point2<f64>> = contour
            .points
            .iter()
            .map(|p| Point2::new((p.x - 1) as f64, (p.y - 1) as f64))
            .collect();
        let (center, radius) = min_enclosing_circle(&points)?;
        let abs_x = center.x as f32 + window.x as f32;
        let abs_y = center.y as f32 + window.y as f32;
        let radius = radius as f32;

        let accepted = region.contains(abs_x, abs_y)
            && radius >= search.min_radius
            && radius <= search.max_radius;
        accepted.then(|| Circle::new(abs_x, abs_y, radius))
    })
}

const CONTAIN_EPS: f64 = 1e-7;

#[inline]
fn encloses(center: &Point2<f64>, radius: f64, p: &Point2<f64>) -> bool {
    nalgebra::distance(center, p) <= radius + CONTAIN_EPS * radius.max(1.0)
}

fn circle_from_two(a: &Point2<f64>, b: &Point2<f64>) -> (Point2<f64>, f64) {
    let center = nalgebra::center(a, b);
    (center, nalgebra::distance(a, &center))
}

fn circle_from_three(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> (Point2<f64>, f64) {
    let (bx, by) = (b.x - a.x, b.y - a.y);
    let (cx, cy) = (c.x - a.x, c.y - a.y);
    let d = 2.0 * (bx * cy - by * cx);

    if d.abs() < 1e-12 {
        // Collinear: the two farthest points span the circle
        let candidates = [circle_from_two(a, b), circle_from_two(a, c), circle_from_two(b, c)];
        return candidates
            .into_iter()
            .fold((*a, 0.0), |best, cand| if cand.1 > best.1 { cand } else { best });
    }

    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let ux = (cy * b2 - by * c2) / d;
    let uy = (bx * c2 - cx * b2) / d;
    let center = Point2::new(a.x + ux, a.y + uy);
    (center, (ux * ux + uy * uy).sqrt())
}

/// Smallest circle enclosing every point (incremental Welzl construction).
///
/// Returns `None` for an empty point set.
pub fn min_enclosing_circle(points: &[Point2<f64>]) -> Option<(Point2<f64>, f64)> {
    let first = points.first()?;
    let (mut center, mut radius) = (*first, 0.0);

    for i in 1..points.len() {
        if encloses(&center, radius, &points[i]) {
            continue;
        }
        center = points[i];
        radius = 0.0;
        for j in 0..i {
            if encloses(&center, radius, &points[j]) {
                continue;
            }
            (center, radius) = circle_from_two(&points[i], &points[j]);
            for k in 0..j {
                if !encloses(&center, radius, &points[k]) {
                    (center, radius) = circle_from_three(&points[i], &points[j], &points[k]);
                }
            }
        }
    }

    Some((center, radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_disk;

    const BACKGROUND: u16 = 2000;

    fn search(min_radius: f32, max_radius: f32, origin: (f32, f32)) -> SearchDescription {
        SearchDescription {
            min_depth: 700,
            max_depth: 800,
            min_radius,
            max_radius,
            origin: Point2::new(origin.0, origin.1),
        }
    }

    fn disk_frame() -> DepthFrame {
        let mut frame = DepthFrame::filled(200, 150, BACKGROUND);
        draw_disk(&mut frame, (80, 70), 12, 750);
        frame
    }

    #[test]
    fn test_min_enclosing_circle_square() {
        let points = [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
            Point2::new(2.0, 2.0),
        ];
        let (center, radius) = min_enclosing_circle(&points).unwrap();
        assert!((center.x - 2.0).abs() < 1e-9);
        assert!((center.y - 2.0).abs() < 1e-9);
        assert!((radius - 8.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_min_enclosing_circle_degenerate() {
        assert!(min_enclosing_circle(&[]).is_none());

        let (center, radius) = min_enclosing_circle(&[Point2::new(3.0, 5.0)]).unwrap();
        assert_eq!(center, Point2::new(3.0, 5.0));
        assert_eq!(radius, 0.0);

        let line = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(6.0, 0.0),
            Point2::new(3.0, 0.0),
        ];
        let (center, radius) = min_enclosing_circle(&line).unwrap();
        assert!((center.x - 3.0).abs() < 1e-9);
        assert!((radius - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_detects_disk() {
        let frame = disk_frame();
        let detector = CircleDetector::default();
        let outcome = detector.detect(&frame, &search(5.0, 20.0, (82.0, 68.0)), 25);

        let circle = outcome.circle.expect("disk should be found");
        assert!((circle.center.x - 80.0).abs() < 0.5);
        assert!((circle.center.y - 70.0).abs() < 0.5);
        assert!(circle.radius > 10.0 && circle.radius <= 12.0);
        assert_eq!(outcome.window, PixelRect::new(32, 18, 100, 100));
    }

    #[test]
    fn test_all_invalid_frame_gives_none() {
        let frame = DepthFrame::filled(200, 150, 0);
        let detector = CircleDetector::default();
        let outcome = detector.detect(&frame, &search(1.0, 100.0, (80.0, 70.0)), 200);
        assert!(outcome.circle.is_none());
        assert!(outcome.mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_speckle_is_removed() {
        let mut frame = DepthFrame::filled(200, 150, BACKGROUND);
        frame.view_mut()[[70, 80]] = 750;
        frame.view_mut()[[71, 80]] = 750;
        let detector = CircleDetector::default();
        let outcome = detector.detect(&frame, &search(0.0, 100.0, (80.0, 70.0)), 200);
        assert!(outcome.circle.is_none());
    }

    #[test]
    fn test_radius_bounds_are_inclusive() {
        let frame = disk_frame();
        let detector = CircleDetector::default();
        let found = detector
            .detect(&frame, &search(1.0, 50.0, (80.0, 70.0)), 25)
            .circle
            .unwrap();
        let r = found.radius;

        let exact = detector.detect(&frame, &search(r, r, (80.0, 70.0)), 25);
        assert_eq!(exact.circle, Some(found));

        let too_small = detector.detect(&frame, &search(1.0, r - 0.01, (80.0, 70.0)), 25);
        assert!(too_small.circle.is_none());
        let too_large = detector.detect(&frame, &search(r + 0.01, 50.0, (80.0, 70.0)), 25);
        assert!(too_large.circle.is_none());
    }

    #[test]
    fn test_origin_tolerance_rejects_far_blob() {
        let frame = disk_frame();
        let detector = CircleDetector::default();
        // Disk center is 20 px left of the origin; a 25 px box reaches only 12 px
        let outcome = detector.detect(&frame, &search(1.0, 50.0, (100.0, 70.0)), 25);
        assert!(outcome.circle.is_none());

        let wide = detector.detect(&frame, &search(1.0, 50.0, (100.0, 70.0)), 60);
        assert!(wide.circle.is_some());
    }

    #[test]
    fn test_acceptance_monotonic_in_tolerance() {
        let mut frame = disk_frame();
        draw_disk(&mut frame, (110, 70), 6, 760);
        let detector = CircleDetector::default();

        let origin = (95.0, 70.0);
        let mut accepted_before = false;
        for (k, tolerance) in [10u32, 20, 30, 40, 60, 80].into_iter().enumerate() {
            let widen = k as f32;
            let outcome = detector.detect(
                &frame,
                &search(5.0 - widen * 0.5, 7.0 + widen, origin),
                tolerance,
            );
            if accepted_before {
                assert!(outcome.circle.is_some(), "lost detection at tolerance {tolerance}");
            }
            accepted_before |= outcome.circle.is_some();
        }
        assert!(accepted_before);
    }

    #[test]
    fn test_larger_contour_considered_first() {
        let mut frame = disk_frame();
        draw_disk(&mut frame, (100, 70), 4, 760);
        let detector = CircleDetector::default();
        let outcome = detector.detect(&frame, &search(1.0, 50.0, (88.0, 70.0)), 40);
        let circle = outcome.circle.unwrap();
        assert!((circle.center.x - 80.0).abs() < 0.5);
    }

    #[test]
    fn test_detects_disk_cut_by_left_edge() {
        let mut frame = DepthFrame::filled(200, 150, BACKGROUND);
        draw_disk(&mut frame, (0, 70), 12, 750);
        let detector = CircleDetector::default();
        let outcome = detector.detect(&frame, &search(1.0, 50.0, (3.0, 70.0)), 25);

        let circle = outcome.circle.expect("edge disk should be found");
        assert!(circle.center.x >= 0.0 && circle.center.x < 1.5);
        assert!((circle.center.y - 70.0).abs() < 1.0);
        assert!(circle.radius > 10.0 && circle.radius <= 12.5);
    }

    #[test]
    fn test_window_inside_depth_band_yields_contour() {
        let frame = DepthFrame::filled(200, 150, 750);
        let detector = CircleDetector::default();
        let outcome = detector.detect(&frame, &search(1.0, 1000.0, (80.0, 70.0)), 200);

        // The outline is the window border: half the diagonal of 99x99
        let circle = outcome.circle.expect("full window should form a contour");
        assert!((circle.center.x - 79.5).abs() < 0.5);
        assert!((circle.radius - 70.0).abs() < 0.5);

        let tight = detector.detect(&frame, &search(1.0, 50.0, (80.0, 70.0)), 200);
        assert!(tight.circle.is_none());
    }

    #[test]
    fn test_extreme_origin_does_not_overflow() {
        let frame = DepthFrame::filled(64, 48, 750);
        let detector = CircleDetector::default();
        let outcome = detector.detect(&frame, &search(1.0, 1000.0, (-3.0e9, 0.0)), 25);
        assert!(outcome.circle.is_none());
        assert_eq!(outcome.window, PixelRect::new(0, 0, 64, 48));
    }

    #[test]
    fn test_window_clipped_at_frame_edge() {
        let frame = DepthFrame::filled(60, 40, BACKGROUND);
        let detector = CircleDetector::default();
        let window = detector.search_window(&frame, Point2::new(5.0, 35.0));
        assert_eq!(window, PixelRect::new(0, 0, 60, 40));

        let outside = detector.search_window(&frame, Point2::new(500.0, 500.0));
        assert!(outside.is_empty());
        let outcome = detector.detect(&frame, &search(1.0, 50.0, (500.0, 500.0)), 25);
        assert!(outcome.circle.is_none());
    }
}
