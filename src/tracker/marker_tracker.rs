//! Per-marker tracker: search planning, detection and filtering tied
//! together by the acquisition/tracking state machine.

use image::GrayImage;
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tracker::circle_detector::{Circle, CircleDetector, DetectorConfig};
use crate::tracker::depth_frame::DepthFrame;
use crate::tracker::kalman_filter::{FilterNoise, MotionFilter, MotionState};
use crate::tracker::rect::PixelRect;
use crate::tracker::search_planner::{SearchDescription, SearchPlanner};
use crate::tracker::track_state::{Hysteresis, PhaseEvent, TrackPhase};

/// Largest accepted magnitude of an acquisition origin coordinate (px).
pub const MAX_ORIGIN_PX: f32 = 16_777_216.0;

/// Configuration for a [`MarkerTracker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Vertical field of view of the depth sensor (degrees).
    pub vertical_fov_deg: f64,
    /// Physical marker radius (mm).
    pub marker_radius_mm: u16,
    /// Fractional widening applied to expected pixel radii.
    pub radius_tolerance: f32,
    /// Where to look for the marker while acquiring (px).
    pub init_origin: [f32; 2],
    /// Expected marker distance while acquiring (mm).
    pub init_depth_mm: u16,
    /// Side of the square around the expected origin that a detection
    /// center must fall in (px).
    pub origin_tolerance_px: u32,
    pub hysteresis: Hysteresis,
    pub detector: DetectorConfig,
    pub noise: FilterNoise,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            vertical_fov_deg: 60.0,
            marker_radius_mm: 34,
            radius_tolerance: 0.2,
            init_origin: [170.0, 212.0],
            init_depth_mm: 750,
            origin_tolerance_px: 25,
            hysteresis: Hysteresis::default(),
            detector: DetectorConfig::default(),
            noise: FilterNoise::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.vertical_fov_deg > 0.0 && self.vertical_fov_deg < 180.0) {
            return Err(ConfigError::InvalidFieldOfView(self.vertical_fov_deg));
        }
        if self.marker_radius_mm == 0 {
            return Err(ConfigError::ZeroMarkerRadius);
        }
        if !self.radius_tolerance.is_finite() || self.radius_tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance {
                name: "radius_tolerance",
                value: self.radius_tolerance as f64,
            });
        }
        let [x, y] = self.init_origin;
        if !(x.abs() <= MAX_ORIGIN_PX && y.abs() <= MAX_ORIGIN_PX) {
            return Err(ConfigError::InvalidOrigin {
                x,
                y,
                limit: MAX_ORIGIN_PX,
            });
        }
        self.hysteresis.validate()?;
        self.detector.validate()?;
        self.noise.validate()
    }
}

/// Outcome reported for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackStatus {
    /// Acquiring, and nothing found this frame
    Empty,
    /// Acquiring, and the marker was found
    Initializing,
    /// Tracking, and the marker was found
    Tracking,
    /// Tracking, but the marker was not found this frame
    TrackingEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackResult {
    pub status: TrackStatus,
    /// Pixel x, pixel y and depth (mm); only set with [`TrackStatus::Tracking`]
    pub position: Option<Point3<f32>>,
}

/// Intermediate values of one update, for visualization.
#[derive(Debug, Clone)]
pub struct TrackerDiagnostics {
    pub search: SearchDescription,
    /// Filter prediction used for the search, when tracking
    pub predicted: Option<Point2<f32>>,
    pub detection: Option<Circle>,
    pub mask: GrayImage,
    pub window: PixelRect,
}

/// Tracks one spherical marker through a depth stream.
#[derive(Debug, Clone)]
pub struct MarkerTracker {
    config: TrackerConfig,
    planner: SearchPlanner,
    detector: CircleDetector,
    phase: TrackPhase,
    filter: Option<MotionFilter>,
}

impl MarkerTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let planner = SearchPlanner::new(
            config.vertical_fov_deg,
            config.marker_radius_mm,
            config.radius_tolerance,
            Point2::from(config.init_origin),
            config.init_depth_mm,
        );
        let detector = CircleDetector::new(config.detector);
        Ok(Self {
            config,
            planner,
            detector,
            phase: TrackPhase::default(),
            filter: None,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn phase(&self) -> TrackPhase {
        self.phase
    }

    /// Current filter estimate, once the marker has been seen.
    pub fn estimate(&self) -> Option<MotionState> {
        self.filter.as_ref().map(MotionFilter::state)
    }

    /// Drop any track and start acquiring again.
    pub fn reset(&mut self) {
        self.phase = TrackPhase::default();
        self.filter = None;
    }

    /// Process one depth frame, `dt` seconds after the previous one.
    pub fn update(&mut self, frame: &DepthFrame, dt: f64) -> TrackResult {
        self.update_with_diagnostics(frame, dt).0
    }

    /// Like [`MarkerTracker::update`], also returning intermediate values.
    pub fn update_with_diagnostics(
        &mut self,
        frame: &DepthFrame,
        dt: f64,
    ) -> (TrackResult, TrackerDiagnostics) {
        // Step 1: Plan the search
        let (search, predicted) = match (self.phase, self.filter.as_mut()) {
            (TrackPhase::Tracking { .. }, Some(filter)) => {
                let sd = self.planner.plan_tracking(filter, frame, dt);
                (sd, Some(sd.origin))
            }
            _ => (self.planner.plan_acquisition(frame.height()), None),
        };

        // Step 2: Detect
        let outcome = self
            .detector
            .detect(frame, &search, self.config.origin_tolerance_px);

        // Step 3: Update phase and filter
        let event = match outcome.circle {
            Some(circle) => self.on_detection(&circle, dt),
            None => self.phase.on_miss(&self.config.hysteresis),
        };
        match event {
            PhaseEvent::Confirmed | PhaseEvent::Lost => {
                tracing::debug!(?event, phase = ?self.phase, "marker phase changed")
            }
            _ => tracing::trace!(?event, phase = ?self.phase),
        }

        // Step 4: Package the result
        let result = match (outcome.circle, self.phase.is_tracking()) {
            (None, false) => TrackResult {
                status: TrackStatus::Empty,
                position: None,
            },
            (None, true) => TrackResult {
                status: TrackStatus::TrackingEmpty,
                position: None,
            },
            (Some(_), false) => TrackResult {
                status: TrackStatus::Initializing,
                position: None,
            },
            (Some(circle), true) => TrackResult {
                status: TrackStatus::Tracking,
                position: Some(marker_position(frame, &circle)),
            },
        };

        let diagnostics = TrackerDiagnostics {
            search,
            predicted,
            detection: outcome.circle,
            mask: outcome.mask,
            window: outcome.window,
        };
        (result, diagnostics)
    }

    fn on_detection(&mut self, circle: &Circle, dt: f64) -> PhaseEvent {
        let fresh_run = self.phase == TrackPhase::Acquiring { hits: 0 };
        let tracking = self.phase.is_tracking();

        match self.filter.as_mut() {
            Some(filter) if !fresh_run => {
                // While tracking, the planner already predicted this frame
                if !tracking {
                    filter.set_time_step(dt);
                    filter.predict();
                }
                filter.correct(circle);
            }
            _ => self.filter = Some(MotionFilter::new(circle, &self.config.noise)),
        }
        self.phase.on_hit(&self.config.hysteresis)
    }
}

/// Detected center plus the median depth of a small patch under it.
fn marker_position(frame: &DepthFrame, circle: &Circle) -> Point3<f32> {
    let side = ((circle.radius / 2.0) as i32).max(1) as u32;
    let patch = PixelRect::centered(
        circle.center.x as i32,
        circle.center.y as i32,
        side,
        side,
    )
    .clamped_within(frame.width(), frame.height());
    let depth = frame.median_in(&patch);
    Point3::new(circle.center.x, circle.center.y, depth as f32)
}
