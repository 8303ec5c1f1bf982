//! Depth-image tracking of spherical markers.
//!
//! Each [`MarkerTracker`] looks for one marker in a stream of depth frames.
//! It starts by acquiring the marker near a configured position and distance,
//! then follows it with a Kalman filter that narrows the search window and
//! bridges short detection dropouts. The [`integration`] module pairs two
//! trackers on a shared frame stream.

pub mod error;
pub mod integration;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{ConfigError, FrameError};
pub use integration::{
    CameraSpaceMapper, DepthFrameSource, MarkerPairPipeline, PairConfig, PairResult,
    PinholeMapper, TimedFrame,
};
pub use tracker::{
    Circle, DepthFrame, MarkerTracker, SearchDescription, TrackPhase, TrackResult, TrackStatus,
    TrackerConfig,
};
