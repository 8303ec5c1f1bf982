//! Depth frames and the sampling helpers the tracker runs on them.

use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayView2, s};

use crate::error::FrameError;
use crate::tracker::rect::PixelRect;

/// Mask value for pixels inside the requested depth range.
pub const MASK_ON: u8 = 255;

/// A single depth image in millimetres; `0` marks pixels without a return.
///
/// Samples are stored row-major with shape `(height, width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    data: Array2<u16>,
}

impl DepthFrame {
    /// Wrap a flat row-major buffer of `width * height` samples.
    pub fn from_vec(width: usize, height: usize, samples: Vec<u16>) -> Result<Self, FrameError> {
        let (expected, got) = (width * height, samples.len());
        let data = Array2::from_shape_vec((height, width), samples).map_err(|_| {
            FrameError::ShapeMismatch {
                width,
                height,
                expected,
                got,
            }
        })?;
        Ok(Self { data })
    }

    /// Frame with every pixel set to `depth`.
    pub fn filled(width: usize, height: usize, depth: u16) -> Self {
        Self {
            data: Array2::from_elem((height, width), depth),
        }
    }

    pub fn from_array(data: Array2<u16>) -> Self {
        Self { data }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Depth at column `x`, row `y`, or `None` outside the frame.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u16> {
        self.data.get((y, x)).copied()
    }

    pub fn view(&self) -> ArrayView2<'_, u16> {
        self.data.view()
    }

    pub fn view_mut(&mut self) -> ndarray::ArrayViewMut2<'_, u16> {
        self.data.view_mut()
    }

    /// Samples covered by `rect` after clipping it to the frame.
    pub fn window(&self, rect: &PixelRect) -> ArrayView2<'_, u16> {
        let clipped = rect.intersect(&PixelRect::frame(self.width(), self.height()));
        if clipped.is_empty() {
            return self.data.slice(s![0..0, 0..0]);
        }
        let (x0, y0) = (clipped.x as usize, clipped.y as usize);
        let (x1, y1) = (clipped.right() as usize, clipped.bottom() as usize);
        self.data.slice(s![y0..y1, x0..x1])
    }

    /// Median of the samples inside `rect`, invalid (zero) samples included.
    ///
    /// Takes the upper median for even counts. An empty window yields `0`.
    pub fn median_in(&self, rect: &PixelRect) -> u16 {
        let mut samples: Vec<u16> = self.window(rect).iter().copied().collect();
        if samples.is_empty() {
            return 0;
        }
        let mid = samples.len() / 2;
        let (_, median, _) = samples.select_nth_unstable(mid);
        *median
    }

    /// Binary mask of the pixels in `rect` whose depth lies in
    /// `[min_depth, max_depth]`, sized like the clipped window.
    pub fn depth_mask(&self, rect: &PixelRect, min_depth: u16, max_depth: u16) -> GrayImage {
        let window = self.window(rect);
        let (rows, cols) = window.dim();
        GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
            let depth = window[[y as usize, x as usize]];
            if depth >= min_depth && depth <= max_depth {
                Luma([MASK_ON])
            } else {
                Luma([0])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> DepthFrame {
        let samples = (0..width * height).map(|i| i as u16).collect();
        DepthFrame::from_vec(width, height, samples).unwrap()
    }

    #[test]
    fn test_from_vec_shape() {
        let frame = ramp(4, 3);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.get(1, 2), Some(9));
        assert_eq!(frame.get(4, 0), None);
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        let err = DepthFrame::from_vec(4, 3, vec![0; 11]).unwrap_err();
        assert_eq!(
            err,
            FrameError::ShapeMismatch {
                width: 4,
                height: 3,
                expected: 12,
                got: 11
            }
        );
    }

    #[test]
    fn test_window_is_clipped() {
        let frame = ramp(10, 10);
        let window = frame.window(&PixelRect::new(-2, 8, 4, 4));
        assert_eq!(window.dim(), (2, 2));
        assert_eq!(window[[0, 0]], 80);

        let outside = frame.window(&PixelRect::new(20, 20, 4, 4));
        assert_eq!(outside.len(), 0);
    }

    #[test]
    fn test_median_ignores_outliers() {
        let mut frame = DepthFrame::filled(5, 5, 750);
        frame.view_mut()[[0, 0]] = 0;
        frame.view_mut()[[4, 4]] = 4000;
        frame.view_mut()[[2, 0]] = 10;
        assert_eq!(frame.median_in(&PixelRect::new(0, 0, 5, 5)), 750);
    }

    #[test]
    fn test_median_counts_invalid_samples() {
        let mut frame = DepthFrame::filled(2, 2, 0);
        frame.view_mut()[[0, 0]] = 900;
        // Sorted: 0, 0, 0, 900 -> element at index 2
        assert_eq!(frame.median_in(&PixelRect::new(0, 0, 2, 2)), 0);
        assert_eq!(frame.median_in(&PixelRect::new(5, 5, 2, 2)), 0);
    }

    #[test]
    fn test_depth_mask_inclusive_bounds() {
        let samples = vec![99, 100, 150, 200, 201, 0];
        let frame = DepthFrame::from_vec(3, 2, samples).unwrap();
        let mask = frame.depth_mask(&PixelRect::frame(3, 2), 100, 200);
        let on: Vec<bool> = mask.pixels().map(|p| p[0] == MASK_ON).collect();
        assert_eq!(on, vec![false, true, true, true, false, false]);
    }
}
