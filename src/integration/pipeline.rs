//! MarkerPairPipeline for tracking both ends of a two-marker rig.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tracker::{DepthFrame, MarkerTracker, TrackResult, TrackStatus, TrackerConfig};

use super::{CameraSpaceMapper, DepthFrameSource};

/// Configuration for a [`MarkerPairPipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairConfig {
    /// Tracker for marker A.
    pub marker_a: TrackerConfig,
    /// Tracker for marker B.
    pub marker_b: TrackerConfig,
    /// Expected camera-space distance between the markers (mm).
    pub separation_mm: f32,
    /// Accepted fractional deviation from `separation_mm`.
    pub separation_tolerance: f32,
}

impl Default for PairConfig {
    fn default() -> Self {
        const WIDTH: f32 = 512.0;
        const HEIGHT: f32 = 424.0;
        Self {
            marker_a: TrackerConfig {
                init_origin: [(WIDTH / 3.0).floor(), HEIGHT / 2.0],
                ..TrackerConfig::default()
            },
            marker_b: TrackerConfig {
                init_origin: [(2.0 * WIDTH / 3.0).floor(), HEIGHT / 2.0],
                ..TrackerConfig::default()
            },
            separation_mm: 490.0,
            separation_tolerance: 0.2,
        }
    }
}

impl PairConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.separation_mm.is_finite() || self.separation_mm <= 0.0 {
            return Err(ConfigError::InvalidSeparation(self.separation_mm as f64));
        }
        if !self.separation_tolerance.is_finite() || self.separation_tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance {
                name: "separation_tolerance",
                value: self.separation_tolerance as f64,
            });
        }
        self.marker_a.validate()?;
        self.marker_b.validate()
    }

    /// Whether a measured separation is plausible for the rig.
    pub fn accepts_separation(&self, distance_mm: f32) -> bool {
        let min = self.separation_mm * (1.0 - self.separation_tolerance);
        let max = self.separation_mm * (1.0 + self.separation_tolerance);
        distance_mm >= min && distance_mm <= max
    }
}

/// Results of both trackers for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairResult {
    pub a: TrackResult,
    pub b: TrackResult,
    /// Camera-space distance between the markers, when both are tracked
    pub separation_mm: Option<f32>,
    /// Camera-space positions of A and B, when both are tracked at a
    /// plausible separation
    pub positions: Option<[Point3<f32>; 2]>,
}

/// Runs two marker trackers over one depth stream.
pub struct MarkerPairPipeline<S: DepthFrameSource, M: CameraSpaceMapper> {
    source: S,
    mapper: M,
    tracker_a: MarkerTracker,
    tracker_b: MarkerTracker,
    config: PairConfig,
}

impl<S: DepthFrameSource, M: CameraSpaceMapper> MarkerPairPipeline<S, M> {
    pub fn new(source: S, mapper: M, config: PairConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            mapper,
            tracker_a: MarkerTracker::new(config.marker_a.clone())?,
            tracker_b: MarkerTracker::new(config.marker_b.clone())?,
            config,
        })
    }

    /// Create a pipeline with the default two-marker layout.
    pub fn with_default_config(source: S, mapper: M) -> Result<Self, ConfigError> {
        Self::new(source, mapper, PairConfig::default())
    }

    /// Update both trackers with one frame.
    pub fn process(&mut self, frame: &DepthFrame, dt: f64) -> PairResult {
        let a = self.tracker_a.update(frame, dt);
        let b = self.tracker_b.update(frame, dt);

        let (Some(pixel_a), Some(pixel_b)) = (a.position, b.position) else {
            return PairResult {
                a,
                b,
                separation_mm: None,
                positions: None,
            };
        };
        debug_assert!(a.status == TrackStatus::Tracking && b.status == TrackStatus::Tracking);

        let pos_a = self.mapper.to_camera_space(&pixel_a);
        let pos_b = self.mapper.to_camera_space(&pixel_b);
        let distance = nalgebra::distance(&pos_a, &pos_b);

        let positions = if self.config.accepts_separation(distance) {
            Some([pos_a, pos_b])
        } else {
            tracing::debug!(distance, expected = self.config.separation_mm, "implausible marker separation");
            None
        };

        PairResult {
            a,
            b,
            separation_mm: Some(distance),
            positions,
        }
    }

    /// Pull the next frame from the source and process it.
    ///
    /// Returns `Ok(None)` when the source has no new frame.
    pub fn process_next(&mut self) -> Result<Option<PairResult>, S::Error> {
        let Some(timed) = self.source.acquire()? else {
            return Ok(None);
        };
        Ok(Some(self.process(&timed.frame, timed.dt)))
    }

    pub fn config(&self) -> &PairConfig {
        &self.config
    }

    pub fn tracker_a(&self) -> &MarkerTracker {
        &self.tracker_a
    }

    pub fn tracker_b(&self) -> &MarkerTracker {
        &self.tracker_b
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }
}
