//! Bank-switched 8bpp framebuffer (VBE windowed modes)
//!
//! Only `window_size` bytes of video memory are visible at a time, starting at
//! `bank * granularity`. A block write is split wherever it leaves the window,
//! which can happen mid-line and any number of times per run.

use tracing::debug;

use super::{FramebufferWriter, PixelRun};
use crate::hw::{BankSwitch, BankWindow, VideoMemory};

pub struct BankedWriter<H: VideoMemory + BankSwitch> {
    hw: H,
    window: BankWindow,
    /// Bank currently mapped, if known
    bank: Option<u32>,
    /// Scratch line for run fills
    line: Vec<u8>,
}

impl<H: VideoMemory + BankSwitch> BankedWriter<H> {
    pub fn new(hw: H, window: BankWindow) -> Self {
        Self {
            hw,
            window,
            bank: None,
            line: Vec::new(),
        }
    }

    /// Copy `data` to flat video memory address `addr`.
    pub fn write_block(&mut self, addr: usize, data: &[u8]) {
        let granularity = self.window.granularity;
        let mut addr = addr;
        let mut remaining = data;

        while !remaining.is_empty() {
            let bank = addr / granularity;
            let offset = addr % granularity;
            // Bank-relative: the window may extend past the next granule
            let room = self.window.window_size - offset;
            let chunk = remaining.len().min(room);

            self.map_bank(bank as u32);
            self.hw.write_bytes(offset, &remaining[..chunk]);

            addr += chunk;
            remaining = &remaining[chunk..];
        }
    }

    fn map_bank(&mut self, bank: u32) {
        if self.bank != Some(bank) {
            debug!("bank -> {}", bank);
            self.hw.select_bank(bank);
            self.bank = Some(bank);
        }
    }
}

impl<H: VideoMemory + BankSwitch> FramebufferWriter for BankedWriter<H> {
    fn write_run(&mut self, run: PixelRun) {
        let addr = run.y * self.window.bytes_per_scanline + run.x;
        let mut line = std::mem::take(&mut self.line);
        line.clear();
        line.resize(run.len, run.color);
        self.write_block(addr, &line);
        self.line = line;
    }
}
