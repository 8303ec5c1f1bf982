mod circle_detector;
mod depth_frame;
mod kalman_filter;
mod marker_tracker;
mod rect;
mod search_planner;
mod track_state;

pub use circle_detector::{
    Circle, CircleDetector, DetectionOutcome, DetectorConfig, min_enclosing_circle, origin_region,
};
pub use depth_frame::{DepthFrame, MASK_ON};
pub use kalman_filter::{FilterNoise, MotionFilter, MotionState};
pub use marker_tracker::{
    MAX_ORIGIN_PX, MarkerTracker, TrackResult, TrackStatus, TrackerConfig, TrackerDiagnostics,
};
pub use rect::PixelRect;
pub use search_planner::{SearchDescription, SearchPlanner, object_height_px};
pub use track_state::{Hysteresis, PhaseEvent, TrackPhase};
