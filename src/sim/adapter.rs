//! The simulated adapter
//!
//! Port map:
//!
//! | Port | Function |
//! |------|----------|
//! | 0x3C4/0x3C5 | Sequencer index/data |
//! | 0x3C8/0x3C9 | DAC write index/data |
//! | 0x3CE/0x3CF | Graphics controller index/data |
//! | 0x3D0/0x3D1 | Flat-panel register index/data |
//! | 0x3DA | Input status 1 (bit 3 = vertical retrace) |
//!
//! Video memory is one flat array. Mode 13h maps its first 64 KiB directly,
//! mode 10h treats it as four 64 KiB planes, and the VESA modes see it through
//! a window of `win_size_kb` positioned in `win_granularity_kb` steps.

use tracing::{debug, warn};

use super::retrace::RetraceClock;
use super::vga::{VgaRegs, PLANE_COUNT, PLANE_SIZE};
use crate::config::SimConfig;
use crate::hw::ports::{
    InputStatus, DAC_DATA, DAC_WRITE_INDEX, FP_DATA, FP_INDEX, GC_DATA, GC_INDEX,
    INPUT_STATUS_1, SEQ_DATA, SEQ_INDEX,
};
use crate::hw::{
    BankSwitch, BankWindow, DisplayProfile, MemoryModel, ModeError, ModeId, ModeService, PortIo,
    Profile, VideoMemory,
};

/// VBE "function failed" status
const VBE_FAILED: u16 = 0x014F;
const APERTURE_SEGMENT: u16 = 0xA000;

/// Observable adapter activity, in order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimEvent {
    FrRead(u8),
    FrWrite(u8, u8),
    RetracePoll(bool),
    BankSelect(u32),
    ModeSet(ModeId),
    TextMode,
}

#[derive(Debug)]
pub struct SimAdapter {
    config: SimConfig,
    mode: ModeId,
    layout: Option<DisplayProfile>,
    fr_index: u8,
    fr: [u8; 256],
    vga: VgaRegs,
    dac_index: u8,
    dac_component: usize,
    dac: Vec<[u8; 3]>,
    vram: Vec<u8>,
    bank: u32,
    retrace: RetraceClock,
    events: Vec<SimEvent>,
    failing_query: Option<ModeId>,
    failing_set: Option<ModeId>,
}

impl SimAdapter {
    pub fn new(config: &SimConfig) -> Self {
        let mut fr = [0u8; 256];
        for &[index, value] in &config.fr {
            fr[index as usize] = value;
        }
        // Planar mode needs four full planes even with a tiny configured VRAM
        let vram_size = (config.vram_kb * 1024).max(PLANE_SIZE * PLANE_COUNT);

        Self {
            config: config.clone(),
            mode: ModeId::TEXT_80X25,
            layout: None,
            fr_index: 0,
            fr,
            vga: VgaRegs::default(),
            dac_index: 0,
            dac_component: 0,
            dac: vec![[0; 3]; 256],
            vram: vec![0; vram_size],
            bank: 0,
            retrace: RetraceClock::new(config.frame_polls, config.blank_polls),
            events: Vec::new(),
            failing_query: None,
            failing_set: None,
        }
    }

    #[cfg(test)]
    pub fn mode(&self) -> ModeId {
        self.mode
    }

    #[cfg(test)]
    /// Flat-panel register value, without logging an access
    pub fn fr(&self, index: u8) -> u8 {
        self.fr[index as usize]
    }

    #[cfg(test)]
    pub fn graphics_register(&self, index: u8) -> u8 {
        self.vga.gc(index)
    }

    #[cfg(test)]
    pub fn dac_entry(&self, index: u8) -> [u8; 3] {
        self.dac[index as usize]
    }

    #[cfg(test)]
    /// Raw video memory
    pub fn framebuffer(&self) -> &[u8] {
        &self.vram
    }

    #[cfg(test)]
    pub fn retrace_mut(&mut self) -> &mut RetraceClock {
        &mut self.retrace
    }

    #[cfg(test)]
    /// Drain the activity log
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    #[cfg(test)]
    /// Make mode queries for `mode` fail
    pub fn fail_query(&mut self, mode: ModeId) {
        self.failing_query = Some(mode);
    }

    #[cfg(test)]
    /// Make mode sets for `mode` fail
    pub fn fail_set(&mut self, mode: ModeId) {
        self.failing_set = Some(mode);
    }

    #[cfg(test)]
    /// Colour indices of scanline `y` in the current mode
    pub fn row(&self, y: usize) -> Vec<u8> {
        let Some(layout) = self.layout else {
            return Vec::new();
        };
        match layout.memory_model {
            MemoryModel::Linear { stride } => {
                let start = y * stride;
                self.vram[start..start + layout.width].to_vec()
            }
            MemoryModel::Planar4bpp { stride } => (0..layout.width)
                .map(|x| VgaRegs::pixel(&self.vram, y * stride + x / 8, 7 - (x % 8) as u8))
                .collect(),
            MemoryModel::BankedFramebuffer(window) => {
                let start = y * window.bytes_per_scanline;
                self.vram[start..start + layout.width].to_vec()
            }
        }
    }

    fn vesa_geometry(mode: ModeId) -> Option<(usize, usize)> {
        match mode {
            ModeId::VESA_640X400X256 => Some((640, 400)),
            ModeId::VESA_640X480X256 => Some((640, 480)),
            ModeId::VESA_800X600X256 => Some((800, 600)),
            _ => None,
        }
    }

    fn window(&self, mode: ModeId, width: usize) -> Result<BankWindow, ModeError> {
        BankWindow::new(
            mode,
            APERTURE_SEGMENT,
            self.config.win_size_kb * 1024,
            self.config.win_granularity_kb * 1024,
            width,
            0,
        )
    }

    fn layout_for(&self, mode: ModeId) -> Result<DisplayProfile, ModeError> {
        let fixed = Profile::ALL
            .iter()
            .find(|p| p.mode() == mode)
            .and_then(|p| p.fixed_profile());
        if let Some(layout) = fixed {
            return Ok(layout);
        }

        let (width, height) = Self::vesa_geometry(mode).ok_or(ModeError::Query {
            mode,
            status: VBE_FAILED,
        })?;
        if width * height > self.vram.len() {
            return Err(ModeError::Query {
                mode,
                status: VBE_FAILED,
            });
        }
        Ok(DisplayProfile {
            width,
            height,
            bits_per_pixel: 8,
            memory_model: MemoryModel::BankedFramebuffer(self.window(mode, width)?),
        })
    }

    fn write_dac(&mut self, value: u8) {
        self.dac[self.dac_index as usize][self.dac_component] = value & 0x3F;
        self.dac_component += 1;
        if self.dac_component == 3 {
            self.dac_component = 0;
            self.dac_index = self.dac_index.wrapping_add(1);
        }
    }

    /// Physical address of an aperture offset in the current bank-switched mode
    fn banked_address(&self, window: &BankWindow, offset: usize) -> Option<usize> {
        if offset >= window.window_size {
            return None;
        }
        let addr = self.bank as usize * window.granularity + offset;
        (addr < self.vram.len()).then_some(addr)
    }
}

impl PortIo for SimAdapter {
    fn inb(&mut self, port: u16) -> u8 {
        match port {
            FP_INDEX => self.fr_index,
            FP_DATA => {
                self.events.push(SimEvent::FrRead(self.fr_index));
                self.fr[self.fr_index as usize]
            }
            INPUT_STATUS_1 => {
                let in_blank = self.retrace.poll();
                self.events.push(SimEvent::RetracePoll(in_blank));
                let mut status = InputStatus::empty();
                if in_blank {
                    status |= InputStatus::VERTICAL_RETRACE | InputStatus::DISPLAY_DISABLED;
                }
                status.bits()
            }
            SEQ_DATA => self.vga.read_seq(),
            GC_DATA => self.vga.read_gc(),
            _ => 0xFF,
        }
    }

    fn outb(&mut self, port: u16, value: u8) {
        match port {
            FP_INDEX => self.fr_index = value,
            FP_DATA => {
                self.events.push(SimEvent::FrWrite(self.fr_index, value));
                self.fr[self.fr_index as usize] = value;
            }
            SEQ_INDEX => self.vga.set_seq_index(value),
            SEQ_DATA => self.vga.write_seq(value),
            GC_INDEX => self.vga.set_gc_index(value),
            GC_DATA => self.vga.write_gc(value),
            DAC_WRITE_INDEX => {
                self.dac_index = value;
                self.dac_component = 0;
            }
            DAC_DATA => self.write_dac(value),
            _ => debug!("sim: unhandled out 0x{:04X} <- 0x{:02X}", port, value),
        }
    }
}

impl VideoMemory for SimAdapter {
    fn read_byte(&mut self, offset: usize) -> u8 {
        let Some(layout) = self.layout else {
            return 0xFF;
        };
        match layout.memory_model {
            MemoryModel::Linear { .. } => self.vram.get(offset).copied().unwrap_or(0xFF),
            MemoryModel::Planar4bpp { .. } if offset < PLANE_SIZE => {
                self.vga.read_planar(&self.vram, offset)
            }
            MemoryModel::Planar4bpp { .. } => 0xFF,
            MemoryModel::BankedFramebuffer(window) => self
                .banked_address(&window, offset)
                .map(|addr| self.vram[addr])
                .unwrap_or(0xFF),
        }
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        let Some(layout) = self.layout else {
            return;
        };
        match layout.memory_model {
            MemoryModel::Linear { .. } => {
                let end = (offset + data.len()).min(PLANE_SIZE);
                if offset < end {
                    self.vram[offset..end].copy_from_slice(&data[..end - offset]);
                }
            }
            MemoryModel::Planar4bpp { .. } => {
                for (i, &value) in data.iter().enumerate() {
                    let off = offset + i;
                    if off >= PLANE_SIZE {
                        break;
                    }
                    self.vga.write_planar(&mut self.vram, off, value);
                }
            }
            MemoryModel::BankedFramebuffer(window) => {
                for (i, &value) in data.iter().enumerate() {
                    match self.banked_address(&window, offset + i) {
                        Some(addr) => self.vram[addr] = value,
                        None => {
                            warn!("sim: write outside window at offset 0x{:X}", offset + i);
                            break;
                        }
                    }
                }
            }
        }
    }

    fn fill_bytes(&mut self, offset: usize, len: usize, value: u8) {
        let run = vec![value; len];
        self.write_bytes(offset, &run);
    }
}

impl BankSwitch for SimAdapter {
    fn select_bank(&mut self, bank: u32) {
        self.events.push(SimEvent::BankSelect(bank));
        self.bank = bank;
    }
}

impl ModeService for SimAdapter {
    fn query_profile(&mut self, mode: ModeId) -> Result<DisplayProfile, ModeError> {
        if self.failing_query == Some(mode) || !mode.is_vesa() {
            return Err(ModeError::Query {
                mode,
                status: VBE_FAILED,
            });
        }
        self.layout_for(mode)
    }

    fn set_mode(&mut self, mode: ModeId) -> Result<(), ModeError> {
        if self.failing_set == Some(mode) {
            return Err(ModeError::SetMode {
                mode,
                status: VBE_FAILED,
            });
        }
        let layout = self.layout_for(mode).map_err(|_| ModeError::SetMode {
            mode,
            status: VBE_FAILED,
        })?;

        debug!("sim: mode {} ({}x{} {})", mode, layout.width, layout.height, layout.memory_model.name());
        self.events.push(SimEvent::ModeSet(mode));
        self.mode = mode;
        self.layout = Some(layout);
        self.bank = 0;
        self.vga.reset();
        self.vram.fill(0);
        Ok(())
    }

    fn restore_text_mode(&mut self) {
        debug!("sim: text mode (was {})", self.mode);
        self.events.push(SimEvent::TextMode);
        self.mode = ModeId::TEXT_80X25;
        self.layout = None;
        self.vga.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::{FpRegisters, RegisterMap, VerticalBlank};

    #[test]
    fn test_power_on_registers_from_config() {
        let sim = SimAdapter::new(&SimConfig::default());
        assert_eq!(sim.fr(0x48), 0x13);
        assert_eq!(sim.fr(0x01), 0x01);
        assert_eq!(sim.mode(), ModeId::TEXT_80X25);
    }

    #[test]
    fn test_fr_traffic_is_logged() {
        let mut sim = SimAdapter::new(&SimConfig::default());
        {
            let mut regs = FpRegisters::new(&mut sim);
            regs.write_register(0x4D, 0x33);
            assert_eq!(regs.read_register(0x4D), 0x33);
        }
        assert_eq!(sim.take_events(), vec![SimEvent::FrWrite(0x4D, 0x33), SimEvent::FrRead(0x4D)]);
        assert!(sim.take_events().is_empty());
    }

    #[test]
    fn test_retrace_polls_reach_blank() {
        let mut sim = SimAdapter::new(&SimConfig::default());
        FpRegisters::new(&mut sim).wait_for_blank_boundary();
        let events = sim.take_events();
        assert_eq!(events.last(), Some(&SimEvent::RetracePoll(true)));
        assert!(events.contains(&SimEvent::RetracePoll(false)));
    }

    #[test]
    fn test_vesa_query_uses_window_config() {
        let config = SimConfig {
            win_granularity_kb: 4,
            ..SimConfig::default()
        };
        let mut sim = SimAdapter::new(&config);
        let layout = sim.query_profile(ModeId::VESA_800X600X256).unwrap();
        assert_eq!((layout.width, layout.height), (800, 600));
        match layout.memory_model {
            MemoryModel::BankedFramebuffer(window) => {
                assert_eq!(window.granularity, 0x1000);
                assert_eq!(window.window_size, 0x10000);
                assert_eq!(window.bytes_per_scanline, 800);
                assert_eq!(window.segment, 0xA000);
            }
            other => panic!("unexpected model {:?}", other),
        }
    }

    #[test]
    fn test_query_rejects_bios_modes_and_small_vram() {
        let mut sim = SimAdapter::new(&SimConfig::default());
        assert!(sim.query_profile(ModeId::VGA_320X200X256).is_err());

        let mut small = SimAdapter::new(&SimConfig {
            vram_kb: 256,
            ..SimConfig::default()
        });
        assert!(small.query_profile(ModeId::VESA_640X400X256).is_ok());
        assert!(small.query_profile(ModeId::VESA_800X600X256).is_err());
    }

    #[test]
    fn test_injected_failures() {
        let mut sim = SimAdapter::new(&SimConfig::default());
        sim.fail_set(ModeId::VGA_320X200X256);
        assert_eq!(
            sim.set_mode(ModeId::VGA_320X200X256),
            Err(ModeError::SetMode {
                mode: ModeId::VGA_320X200X256,
                status: VBE_FAILED
            })
        );
        assert_eq!(sim.mode(), ModeId::TEXT_80X25);
    }

    #[test]
    fn test_banked_window_addressing() {
        let config = SimConfig {
            win_granularity_kb: 4,
            ..SimConfig::default()
        };
        let mut sim = SimAdapter::new(&config);
        sim.set_mode(ModeId::VESA_640X480X256).unwrap();
        sim.select_bank(3);
        sim.write_bytes(0x10, &[9, 8]);
        assert_eq!(sim.framebuffer()[0x3010], 9);
        assert_eq!(sim.framebuffer()[0x3011], 8);
        assert_eq!(sim.read_byte(0x10), 9);

        // Past the end of the window is dropped
        sim.write_bytes(0xFFFF, &[1, 2]);
        assert_eq!(sim.framebuffer()[0x3000 + 0xFFFF], 1);
        assert_eq!(sim.framebuffer()[0x3000 + 0x10000], 0);
    }
}
