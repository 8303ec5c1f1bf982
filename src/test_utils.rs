//! Synthetic depth frames for unit tests.

use crate::tracker::DepthFrame;

/// Paint a filled disk of pixels within `radius` of `center` at `depth`.
pub(crate) fn draw_disk(frame: &mut DepthFrame, center: (i64, i64), radius: i64, depth: u16) {
    let (width, height) = (frame.width() as i64, frame.height() as i64);
    let mut view = frame.view_mut();
    for y in (center.1 - radius).max(0)..(center.1 + radius + 1).min(height) {
        for x in (center.0 - radius).max(0)..(center.0 + radius + 1).min(width) {
            let (dx, dy) = (x - center.0, y - center.1);
            if dx * dx + dy * dy <= radius * radius {
                view[[y as usize, x as usize]] = depth;
            }
        }
    }
}
