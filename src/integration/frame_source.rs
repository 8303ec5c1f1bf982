//! Trait for depth sensor backends.

use std::collections::VecDeque;
use std::convert::Infallible;

use crate::tracker::DepthFrame;

/// A depth frame together with the time elapsed since the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedFrame {
    pub frame: DepthFrame,
    /// Seconds since the previous frame
    pub dt: f64,
}

impl TimedFrame {
    pub fn new(frame: DepthFrame, dt: f64) -> Self {
        Self { frame, dt }
    }
}

/// Source of depth frames, such as a sensor driver or a recording.
///
/// Implement this trait to feed a [`MarkerPairPipeline`](super::MarkerPairPipeline).
///
/// # Example
///
/// ```ignore
/// use depthmarker_rs::{DepthFrame, DepthFrameSource, TimedFrame};
///
/// struct MySensor {
///     // Driver handle here
/// }
///
/// impl DepthFrameSource for MySensor {
///     type Error = std::io::Error;
///
///     fn acquire(&mut self) -> Result<Option<TimedFrame>, Self::Error> {
///         // Read the latest frame, if a new one is ready
///         Ok(None)
///     }
/// }
/// ```
pub trait DepthFrameSource {
    /// Error type for acquisition failures.
    type Error;

    /// Fetch the next frame.
    ///
    /// Returns `Ok(None)` when no new frame is available.
    fn acquire(&mut self) -> Result<Option<TimedFrame>, Self::Error>;
}

/// Plays back a fixed sequence of frames.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    frames: VecDeque<TimedFrame>,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = TimedFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Frames not yet played.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl DepthFrameSource for ReplaySource {
    type Error = Infallible;

    fn acquire(&mut self) -> Result<Option<TimedFrame>, Self::Error> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_source_order() {
        let mut source = ReplaySource::new([
            TimedFrame::new(DepthFrame::filled(2, 2, 1), 0.1),
            TimedFrame::new(DepthFrame::filled(2, 2, 2), 0.2),
        ]);
        assert_eq!(source.remaining(), 2);

        let first = source.acquire().unwrap().unwrap();
        assert_eq!(first.frame.get(0, 0), Some(1));
        assert_eq!(first.dt, 0.1);

        let second = source.acquire().unwrap().unwrap();
        assert_eq!(second.frame.get(1, 1), Some(2));
        assert!(source.acquire().unwrap().is_none());
    }
}
