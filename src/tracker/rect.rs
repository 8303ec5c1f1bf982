/// Integer pixel rectangle used for search windows and sampling patches.
///
/// The rectangle covers columns `x..x + width` and rows `y..y + height`.
/// The origin may be negative while a window is being positioned; clip it
/// with [`PixelRect::intersect`] or [`PixelRect::clamped_within`] before
/// indexing into a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelRect {
    /// Left column
    pub x: i32,
    /// Top row
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl PixelRect {
    #[inline]
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size whose center is `(cx, cy)`.
    ///
    /// Odd sizes put the extra pixel after the center.
    #[inline]
    pub fn centered(cx: i32, cy: i32, width: u32, height: u32) -> Self {
        Self {
            x: cx.saturating_sub((width / 2) as i32),
            y: cy.saturating_sub((height / 2) as i32),
            width,
            height,
        }
    }

    /// The whole frame of the given size.
    #[inline]
    pub fn frame(width: usize, height: usize) -> Self {
        Self::new(0, 0, width as u32, height as u32)
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> i32 {
        self.x.saturating_add_unsigned(self.width)
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add_unsigned(self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether a sub-pixel point lies inside, with half-open edges.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x as f32
            && px < self.right() as f32
            && py >= self.y as f32
            && py < self.bottom() as f32
    }

    /// Overlap of two rectangles; empty (zero-sized) when they are disjoint.
    pub fn intersect(&self, other: &PixelRect) -> PixelRect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return PixelRect::new(x1, y1, 0, 0);
        }
        PixelRect::new(x1, y1, x2.abs_diff(x1), y2.abs_diff(y1))
    }

    /// Slide the rectangle so that it lies inside a `frame_width` x
    /// `frame_height` frame, keeping its size where the frame allows.
    ///
    /// A rectangle larger than the frame is pinned to the top-left corner
    /// and cut down to the frame size.
    pub fn clamped_within(&self, frame_width: usize, frame_height: usize) -> PixelRect {
        let (fw, fh) = (frame_width as i32, frame_height as i32);
        let mut moved = *self;

        if moved.x < 0 {
            moved.x = 0;
        }
        if moved.right() >= fw {
            moved.x = fw.saturating_sub_unsigned(moved.width).max(0);
        }
        if moved.y < 0 {
            moved.y = 0;
        }
        if moved.bottom() >= fh {
            moved.y = fh.saturating_sub_unsigned(moved.height).max(0);
        }

        moved.intersect(&PixelRect::frame(frame_width, frame_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered() {
        let rect = PixelRect::centered(50, 40, 10, 6);
        assert_eq!(rect, PixelRect::new(45, 37, 10, 6));
        assert_eq!(rect.right(), 55);
        assert_eq!(rect.bottom(), 43);

        let odd = PixelRect::centered(10, 10, 3, 3);
        assert_eq!(odd, PixelRect::new(9, 9, 3, 3));
    }

    #[test]
    fn test_contains_half_open() {
        let rect = PixelRect::new(10, 20, 5, 5);
        assert!(rect.contains(10.0, 20.0));
        assert!(rect.contains(14.9, 24.9));
        assert!(!rect.contains(15.0, 22.0));
        assert!(!rect.contains(12.0, 25.0));
        assert!(!rect.contains(9.99, 22.0));
    }

    #[test]
    fn test_intersect() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), PixelRect::new(5, 5, 5, 5));

        let c = PixelRect::new(20, 20, 4, 4);
        assert!(a.intersect(&c).is_empty());
    }

    #[test]
    fn test_extreme_origin_saturates() {
        let rect = PixelRect::centered(i32::MIN, 0, 100, 100);
        assert_eq!(rect.x, i32::MIN);
        assert_eq!(rect.right(), i32::MIN + 100);
        assert!(!rect.contains(0.0, 0.0));
        assert!(rect.intersect(&PixelRect::frame(64, 48)).is_empty());

        let rect = PixelRect::centered(i32::MAX, i32::MAX, 10, 10);
        assert_eq!(rect.right(), i32::MAX);
        assert_eq!(rect.bottom(), i32::MAX);
    }

    #[test]
    fn test_clamped_within_edges() {
        // Hanging off the top-left corner
        let rect = PixelRect::centered(1, 1, 6, 6).clamped_within(100, 80);
        assert_eq!(rect, PixelRect::new(0, 0, 6, 6));

        // Hanging off the bottom-right corner
        let rect = PixelRect::centered(99, 79, 6, 6).clamped_within(100, 80);
        assert_eq!(rect, PixelRect::new(94, 74, 6, 6));

        // Larger than the frame
        let rect = PixelRect::centered(5, 5, 20, 20).clamped_within(8, 8);
        assert_eq!(rect, PixelRect::new(0, 0, 8, 8));
    }
}
