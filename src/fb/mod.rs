//! Framebuffer writing and the diagnostic test pattern.
//!
//! - **linear**: one byte per pixel, whole screen in the aperture (mode 13h)
//! - **planar**: 4bpp bit planes filled through set/reset (mode 10h)
//! - **banked**: one byte per pixel behind a VBE window (modes 100h-103h)
//! - **pattern**: alternating scanlines with tick marks every 10th line
//! - **palette**: the four DAC entries the pattern uses
//!
//! The pattern generator only sees [`FramebufferWriter`]; the memory model is
//! picked once by [`writer_for`].

pub mod linear;
pub mod planar;
pub mod banked;
pub mod pattern;
pub mod palette;

pub use banked::BankedWriter;
pub use linear::LinearWriter;
pub use pattern::draw_pattern;
pub use planar::PlanarWriter;

use crate::hw::{BankSwitch, DisplayProfile, MemoryModel, PortIo, VideoMemory};

/// A horizontal run of one colour on one scanline, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRun {
    pub y: usize,
    pub x: usize,
    pub len: usize,
    pub color: u8,
}

impl PixelRun {
    pub fn new(y: usize, x: usize, len: usize, color: u8) -> Self {
        Self { y, x, len, color }
    }
}

/// Writes pixel runs into video memory for one memory model.
///
/// Callers keep runs inside the active resolution; out-of-range runs are not
/// checked.
pub trait FramebufferWriter {
    /// Controller setup before the first run of a drawing pass.
    fn begin(&mut self) {}

    fn write_run(&mut self, run: PixelRun);
}

/// Writer for the memory model of `profile`.
pub fn writer_for<'a, H>(profile: &DisplayProfile, hw: &'a mut H) -> Box<dyn FramebufferWriter + 'a>
where
    H: PortIo + VideoMemory + BankSwitch,
{
    match profile.memory_model {
        MemoryModel::Linear { stride } => Box::new(LinearWriter::new(hw, stride)),
        MemoryModel::Planar4bpp { stride } => Box::new(PlanarWriter::new(hw, stride)),
        MemoryModel::BankedFramebuffer(window) => Box::new(BankedWriter::new(hw, window)),
    }
}
