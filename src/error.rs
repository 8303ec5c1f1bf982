//! Error types raised at the construction boundary.
//!
//! Per-frame tracking never fails: a missing marker is an ordinary input to the
//! state machine. Only configuration and frame construction can be rejected.

use thiserror::Error;

/// Invalid tracker, detector or filter configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("vertical field of view must lie in (0, 180) degrees, got {0}")]
    InvalidFieldOfView(f64),
    #[error("marker radius must be positive")]
    ZeroMarkerRadius,
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },
    #[error("{name} threshold must be at least 1")]
    ZeroThreshold { name: &'static str },
    #[error("detector window must be non-empty, got {width}x{height}")]
    EmptySearchWindow { width: u32, height: u32 },
    #[error("{name} must be finite and positive, got {value}")]
    InvalidNoise { name: &'static str, value: f64 },
    #[error("marker separation must be finite and positive, got {0} mm")]
    InvalidSeparation(f64),
    #[error("search origin must be finite and within {limit} px, got ({x}, {y})")]
    InvalidOrigin { x: f32, y: f32, limit: f32 },
    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },
}

/// Invalid depth frame input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("depth buffer holds {got} samples, expected {expected} ({width}x{height})")]
    ShapeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        got: usize,
    },
}
