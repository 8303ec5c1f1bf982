//! Planning where, and at what depth and size, to look for a marker next.

use nalgebra::Point2;

use crate::tracker::depth_frame::DepthFrame;
use crate::tracker::kalman_filter::MotionFilter;
use crate::tracker::rect::PixelRect;

/// Bounds for one detection attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchDescription {
    /// Nearest accepted depth (mm)
    pub min_depth: u16,
    /// Farthest accepted depth (mm)
    pub max_depth: u16,
    /// Smallest accepted radius (px)
    pub min_radius: f32,
    /// Largest accepted radius (px)
    pub max_radius: f32,
    /// Expected marker center (px)
    pub origin: Point2<f32>,
}

/// Apparent size, in pixels, of an object `object_mm` tall at `distance_mm`.
pub fn object_height_px(
    vertical_fov_rad: f64,
    object_mm: f64,
    distance_mm: f64,
    image_height_px: usize,
) -> f64 {
    let visible_mm = 2.0 * distance_mm * (vertical_fov_rad / 2.0).tan();
    object_mm / visible_mm * image_height_px as f64
}

/// Derives [`SearchDescription`]s from the tracker phase.
#[derive(Debug, Clone)]
pub struct SearchPlanner {
    vertical_fov_rad: f64,
    marker_radius_mm: u16,
    radius_tolerance: f32,
    init_origin: Point2<f32>,
    init_depth_mm: u16,
}

impl SearchPlanner {
    pub fn new(
        vertical_fov_deg: f64,
        marker_radius_mm: u16,
        radius_tolerance: f32,
        init_origin: Point2<f32>,
        init_depth_mm: u16,
    ) -> Self {
        Self {
            vertical_fov_rad: vertical_fov_deg.to_radians(),
            marker_radius_mm,
            radius_tolerance,
            init_origin,
            init_depth_mm,
        }
    }

    /// Search around the configured starting point and distance.
    pub fn plan_acquisition(&self, frame_height: usize) -> SearchDescription {
        let min_depth = self.init_depth_mm.saturating_sub(self.marker_radius_mm);
        let max_depth = self.init_depth_mm.saturating_add(self.marker_radius_mm);
        let widen = 1.0 + self.radius_tolerance as f64;
        let size_at = |depth: u16| {
            object_height_px(
                self.vertical_fov_rad,
                self.marker_radius_mm as f64,
                depth as f64,
                frame_height,
            )
        };

        SearchDescription {
            min_depth,
            max_depth,
            // Far edge gives the smallest apparent radius
            min_radius: (size_at(max_depth) / widen) as f32,
            max_radius: (size_at(min_depth) * widen) as f32,
            origin: self.init_origin,
        }
    }

    /// Search around the filter's one-step prediction.
    ///
    /// Advances `filter` by `dt` seconds; the expected depth is the median of
    /// a small patch at the predicted center.
    pub fn plan_tracking(
        &self,
        filter: &mut MotionFilter,
        frame: &DepthFrame,
        dt: f64,
    ) -> SearchDescription {
        filter.set_time_step(dt);
        let predicted = filter.predict();
        let (px, py) = (predicted.x as f32, predicted.y as f32);
        let radius = predicted.radius as f32;

        let side = ((radius as i32) / 2).max(1) as u32;
        let patch = PixelRect::centered(px as i32, py as i32, side, side)
            .clamped_within(frame.width(), frame.height());
        let depth = frame.median_in(&patch);

        let widen = 1.0 + self.radius_tolerance;
        let (lo, hi) = (radius / widen, radius * widen);

        tracing::trace!(x = px, y = py, radius, depth, "predicted search");

        SearchDescription {
            min_depth: depth.saturating_sub(self.marker_radius_mm),
            max_depth: depth.saturating_add(self.marker_radius_mm),
            min_radius: lo.min(hi),
            max_radius: lo.max(hi),
            origin: Point2::new(px, py),
        }
    }
}
