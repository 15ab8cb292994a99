//! Diagnostic test pattern
//!
//! Even scanlines are colour 1, odd scanlines colour 2, and every 10th line
//! starts with a 20 pixel colour 15 tick. Replicated lines show up as doubled
//! stripes; the ticks make line counts readable on the panel.

use super::{FramebufferWriter, PixelRun};

pub const EVEN_COLOR: u8 = 1;
pub const ODD_COLOR: u8 = 2;
pub const TICK_COLOR: u8 = 15;
pub const TICK_WIDTH: usize = 20;
pub const TICK_PERIOD: usize = 10;

/// Runs for scanline `y`, in drawing order.
pub fn line_runs(y: usize, width: usize) -> impl Iterator<Item = PixelRun> {
    let base = if y % 2 == 0 { EVEN_COLOR } else { ODD_COLOR };
    let fill = PixelRun::new(y, 0, width, base);
    // The tick goes after the fill so the fill never covers it
    let tick = (y % TICK_PERIOD == 0).then(|| PixelRun::new(y, 0, width.min(TICK_WIDTH), TICK_COLOR));
    std::iter::once(fill).chain(tick)
}

/// Draw the full pattern for a `width` x `height` mode.
pub fn draw_pattern(writer: &mut dyn FramebufferWriter, width: usize, height: usize) {
    writer.begin();
    for y in 0..height {
        for run in line_runs(y, width) {
            writer.write_run(run);
        }
    }
}
