//! Acquisition/tracking phases with hit and miss hysteresis.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Consecutive-frame thresholds for switching phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hysteresis {
    /// Consecutive detections needed to start tracking.
    pub confirm_hits: u32,
    /// Consecutive misses that drop a track back to acquisition.
    pub drop_misses: u32,
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self {
            confirm_hits: 5,
            drop_misses: 5,
        }
    }
}

impl Hysteresis {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirm_hits == 0 {
            return Err(ConfigError::ZeroThreshold {
                name: "confirm_hits",
            });
        }
        if self.drop_misses == 0 {
            return Err(ConfigError::ZeroThreshold {
                name: "drop_misses",
            });
        }
        Ok(())
    }
}

/// Marker tracker phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackPhase {
    /// Looking for the marker at its configured start position
    Acquiring {
        /// Consecutive detections so far
        hits: u32,
    },
    /// Following the marker with the motion filter
    Tracking {
        /// Consecutive frames without a detection
        misses: u32,
    },
}

impl Default for TrackPhase {
    fn default() -> Self {
        TrackPhase::Acquiring { hits: 0 }
    }
}

/// What a single hit or miss did to the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// First detection of a new acquisition run
    AcquisitionStarted,
    /// Another consecutive detection while acquiring
    AcquisitionProgress,
    /// Enough detections; now tracking
    Confirmed,
    /// Detection while tracking
    Refreshed,
    /// Miss while acquiring; the run starts over
    AcquisitionReset,
    /// Miss while tracking, still within the allowance
    Coasting,
    /// Too many misses; back to acquiring
    Lost,
}

impl TrackPhase {
    #[inline]
    pub fn is_tracking(&self) -> bool {
        matches!(self, TrackPhase::Tracking { .. })
    }

    /// Apply a frame with a detection.
    pub fn on_hit(&mut self, hysteresis: &Hysteresis) -> PhaseEvent {
        match *self {
            TrackPhase::Acquiring { hits } => {
                let hits = hits + 1;
                if hits >= hysteresis.confirm_hits {
                    *self = TrackPhase::Tracking { misses: 0 };
                    PhaseEvent::Confirmed
                } else {
                    *self = TrackPhase::Acquiring { hits };
                    if hits == 1 {
                        PhaseEvent::AcquisitionStarted
                    } else {
                        PhaseEvent::AcquisitionProgress
                    }
                }
            }
            TrackPhase::Tracking { .. } => {
                *self = TrackPhase::Tracking { misses: 0 };
                PhaseEvent::Refreshed
            }
        }
    }

    /// Apply a frame without a detection.
    pub fn on_miss(&mut self, hysteresis: &Hysteresis) -> PhaseEvent {
        match *self {
            TrackPhase::Acquiring { .. } => {
                *self = TrackPhase::Acquiring { hits: 0 };
                PhaseEvent::AcquisitionReset
            }
            TrackPhase::Tracking { misses } => {
                let misses = misses + 1;
                if misses >= hysteresis.drop_misses {
                    *self = TrackPhase::Acquiring { hits: 0 };
                    PhaseEvent::Lost
                } else {
                    *self = TrackPhase::Tracking { misses };
                    PhaseEvent::Coasting
                }
            }
        }
    }
}
