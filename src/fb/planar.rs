//! 16-colour planar framebuffer (EGA/VGA mode 10h)
//!
//! Colour is never written as data. The controller is set up once so every
//! CPU write replicates the set/reset colour into all four planes at the bit
//! positions enabled by the bit mask; a run then becomes "set/reset = colour,
//! write 0xFF bytes". Set/reset is shared controller state, so it is
//! reprogrammed on every run.

use super::{FramebufferWriter, PixelRun};
use crate::hw::ports::{
    GC_BIT_MASK, GC_DATA_ROTATE, GC_ENABLE_SET_RESET, GC_INDEX, GC_MODE, GC_SET_RESET, SEQ_INDEX,
    SEQ_MAP_MASK,
};
use crate::hw::{PortIo, VideoMemory};

const ALL_PLANES: u8 = 0x0F;
const ALL_BITS: u8 = 0xFF;

pub struct PlanarWriter<H: PortIo + VideoMemory> {
    hw: H,
    /// Bytes per scanline (width / 8)
    stride: usize,
}

impl<H: PortIo + VideoMemory> PlanarWriter<H> {
    pub fn new(hw: H, stride: usize) -> Self {
        Self { hw, stride }
    }

    /// Write one partially covered byte. The latches are loaded by a read
    /// first so the bits outside `mask` keep their colour.
    fn write_masked(&mut self, offset: usize, mask: u8) {
        self.hw.write_indexed(GC_INDEX, GC_BIT_MASK, mask);
        let _ = self.hw.read_byte(offset);
        self.hw.write_bytes(offset, &[ALL_BITS]);
        self.hw.write_indexed(GC_INDEX, GC_BIT_MASK, ALL_BITS);
    }
}

/// Bit mask covering pixels `first..=last` of one byte (pixel 0 is bit 7).
fn pixel_mask(first: usize, last: usize) -> u8 {
    let left = ALL_BITS >> first;
    let right = ALL_BITS << (7 - last);
    left & right
}

impl<H: PortIo + VideoMemory> FramebufferWriter for PlanarWriter<H> {
    fn begin(&mut self) {
        self.hw.write_indexed(SEQ_INDEX, SEQ_MAP_MASK, ALL_PLANES);
        self.hw.write_indexed(GC_INDEX, GC_ENABLE_SET_RESET, ALL_PLANES);
        self.hw.write_indexed(GC_INDEX, GC_DATA_ROTATE, 0x00);
        self.hw.write_indexed(GC_INDEX, GC_BIT_MASK, ALL_BITS);
        self.hw.write_indexed(GC_INDEX, GC_MODE, 0x00);
    }

    fn write_run(&mut self, run: PixelRun) {
        if run.len == 0 {
            return;
        }
        self.hw
            .write_indexed(GC_INDEX, GC_SET_RESET, run.color & ALL_PLANES);

        let line = run.y * self.stride;
        let end = run.x + run.len - 1;
        let (first_byte, last_byte) = (run.x / 8, end / 8);

        if first_byte == last_byte {
            let mask = pixel_mask(run.x % 8, end % 8);
            if mask == ALL_BITS {
                self.hw.write_bytes(line + first_byte, &[ALL_BITS]);
            } else {
                self.write_masked(line + first_byte, mask);
            }
            return;
        }

        let mut full_start = first_byte;
        if run.x % 8 != 0 {
            self.write_masked(line + first_byte, pixel_mask(run.x % 8, 7));
            full_start += 1;
        }

        let mut full_end = last_byte + 1;
        if end % 8 != 7 {
            full_end -= 1;
            self.write_masked(line + last_byte, pixel_mask(0, end % 8));
        }

        if full_end > full_start {
            self.hw
                .fill_bytes(line + full_start, full_end - full_start, ALL_BITS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::hw::{ModeId, ModeService};
    use crate::sim::SimAdapter;

    fn ega() -> SimAdapter {
        let mut sim = SimAdapter::new(&SimConfig::default());
        sim.set_mode(ModeId::EGA_640X350X16).unwrap();
        sim
    }

    #[test]
    fn test_pixel_mask() {
        assert_eq!(pixel_mask(0, 7), 0xFF);
        assert_eq!(pixel_mask(0, 3), 0xF0);
        assert_eq!(pixel_mask(4, 7), 0x0F);
        assert_eq!(pixel_mask(2, 2), 0x20);
    }

    #[test]
    fn test_full_line_fill() {
        let mut sim = ega();
        {
            let mut writer = PlanarWriter::new(&mut sim, 80);
            writer.begin();
            writer.write_run(PixelRun::new(3, 0, 640, 2));
        }
        assert!(sim.row(3).iter().all(|&c| c == 2));
        assert!(sim.row(2).iter().all(|&c| c == 0));
        assert!(sim.row(4).iter().all(|&c| c == 0));
    }

    #[test]
    fn test_accent_over_fill_keeps_neighbours() {
        let mut sim = ega();
        {
            let mut writer = PlanarWriter::new(&mut sim, 80);
            writer.begin();
            writer.write_run(PixelRun::new(0, 0, 640, 1));
            writer.write_run(PixelRun::new(0, 0, 20, 15));
            writer.write_run(PixelRun::new(0, 27, 3, 12));
        }
        let row = sim.row(0);
        assert!(row[..20].iter().all(|&c| c == 15));
        assert!(row[20..27].iter().all(|&c| c == 1));
        assert!(row[27..30].iter().all(|&c| c == 12));
        assert!(row[30..].iter().all(|&c| c == 1));
    }

    #[test]
    fn test_set_reset_programmed_per_run() {
        let mut sim = ega();
        {
            let mut writer = PlanarWriter::new(&mut sim, 80);
            writer.begin();
            writer.write_run(PixelRun::new(0, 0, 8, 4));
            writer.write_run(PixelRun::new(0, 8, 8, 9));
        }
        let row = sim.row(0);
        assert!(row[..8].iter().all(|&c| c == 4));
        assert!(row[8..16].iter().all(|&c| c == 9));
        assert_eq!(sim.graphics_register(GC_SET_RESET), 9);
        assert_eq!(sim.graphics_register(GC_BIT_MASK), 0xFF);
    }
}
