//! Integration module for running marker trackers against a depth sensor.
//!
//! This module provides the sensor-facing traits and a pipeline that drives
//! two [`MarkerTracker`](crate::tracker::MarkerTracker)s over one frame stream.

mod camera;
mod frame_source;
mod pipeline;

pub use camera::{CameraSpaceMapper, PinholeMapper};
pub use frame_source::{DepthFrameSource, ReplaySource, TimedFrame};
pub use pipeline::{MarkerPairPipeline, PairConfig, PairResult};
