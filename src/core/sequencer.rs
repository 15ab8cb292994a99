//! Register sequencer
//!
//! Owns the save / apply / restore protocol for the replication registers.
//! Apply always runs in one fixed order inside a single fresh vertical blank:
//!
//! ```text
//! wait blank -> FR4D range -> FR4E enable -> FR48 stretch B -> FR41 stretch A -> FR40 latch
//! ```
//!
//! FR40 must be last: the controller picks up the new vertical parameters only
//! when it is written.
//!
//! The sequencer holds no port handle. Each call borrows the register file,
//! so tests can pass a recording fake.

use tracing::{debug, info};

use super::regs::{
    pack_range, DisplayType, DumpRange, FpRegister, RegisterDump, RegisterSnapshot,
    RegisterStatus, ReplicationState, VerticalStretch, NIBBLE_MAX,
};
use crate::config::ApplyConfig;
use crate::hw::{RegisterMap, VerticalBlank};

/// Fixed values written by the apply sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplySettings {
    pub enable_all: u8,
    pub stretch_a: u8,
    pub compensation_latch: u8,
}

impl From<&ApplyConfig> for ApplySettings {
    fn from(config: &ApplyConfig) -> Self {
        Self {
            enable_all: config.enable_all,
            stretch_a: config.stretch_a,
            compensation_latch: config.compensation_latch,
        }
    }
}

/// Direction for the stepping commands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Down,
    Up,
}

impl Step {
    fn apply(self, value: u8, floor: u8, ceiling: u8) -> u8 {
        match self {
            Step::Down if value > floor => value - 1,
            Step::Up if value < ceiling => value + 1,
            _ => value,
        }
    }
}

/// (low, high) nibbles of FR4D as the controller holds them now
fn read_range<R: RegisterMap>(regs: &mut R) -> (u8, u8) {
    let range = regs.read_register(FpRegister::ReplicationRange.index());
    (range & NIBBLE_MAX, range >> 4)
}

/// Save/apply/restore state for one session.
///
/// Only [`RegisterSequencer::capture`] creates one, so a sequencer always
/// holds exactly one original snapshot, taken before any write.
#[derive(Debug)]
pub struct RegisterSequencer {
    original: RegisterSnapshot,
    state: ReplicationState,
    settings: ApplySettings,
}

impl RegisterSequencer {
    /// Save every tracked register. Nothing is written.
    pub fn capture<R: RegisterMap>(
        regs: &mut R,
        settings: ApplySettings,
        initial: ReplicationState,
    ) -> Self {
        let original = RegisterSnapshot::capture(regs);
        info!("Captured originals: {}", original);
        Self {
            original,
            state: initial,
            settings,
        }
    }

    #[cfg(test)]
    pub fn original(&self) -> &RegisterSnapshot {
        &self.original
    }

    #[cfg(test)]
    pub fn state(&self) -> ReplicationState {
        self.state
    }

    /// Route output to the flat panel (FR01 bit 1), keeping the other bits.
    pub fn enable_fp_path<R: RegisterMap>(&self, regs: &mut R) {
        let index = FpRegister::FpPath.index();
        let value = DisplayType::from_bits_retain(regs.read_register(index)) | DisplayType::FLAT_PANEL;
        regs.write_register(index, value.bits());
    }

    /// Program the replication range and latch it during one vertical blank.
    pub fn apply<R: RegisterMap + VerticalBlank>(&mut self, regs: &mut R, low: u8, high: u8) {
        let high = high & NIBBLE_MAX;
        let low = (low & NIBBLE_MAX).min(high);
        self.state.low = low;
        self.state.high = high;

        debug!("apply low={} high={} FR48={:02X}", low, high, self.state.stretch_b);
        regs.wait_for_blank_boundary();
        regs.write_register(FpRegister::ReplicationRange.index(), pack_range(low, high));
        regs.write_register(FpRegister::ReplicationEnable.index(), self.settings.enable_all);
        regs.write_register(FpRegister::StretchControlB.index(), self.state.stretch_b);
        regs.write_register(FpRegister::StretchControlA.index(), self.settings.stretch_a);
        regs.write_register(
            FpRegister::CompensationLatch.index(),
            self.settings.compensation_latch,
        );
    }

    /// Re-run apply with the current range
    pub fn reapply<R: RegisterMap + VerticalBlank>(&mut self, regs: &mut R) {
        let ReplicationState { low, high, .. } = self.state;
        self.apply(regs, low, high);
    }

    /// Step the fixed value (low = high = n). The current value is the low
    /// nibble of FR4D as read back from the controller.
    pub fn step_fixed<R: RegisterMap + VerticalBlank>(&mut self, regs: &mut R, step: Step) {
        let current = regs.read_register(FpRegister::ReplicationRange.index()) & NIBBLE_MAX;
        let n = step.apply(current, 0, NIBBLE_MAX);
        self.apply(regs, n, n);
    }

    /// Step the low nibble within 0..=high, starting from FR4D as read back
    pub fn step_low<R: RegisterMap + VerticalBlank>(&mut self, regs: &mut R, step: Step) {
        let (low, high) = read_range(regs);
        self.apply(regs, step.apply(low, 0, high), high);
    }

    /// Step the high nibble within low..=15, starting from FR4D as read back
    pub fn step_high<R: RegisterMap + VerticalBlank>(&mut self, regs: &mut R, step: Step) {
        let (low, high) = read_range(regs);
        self.apply(regs, low, step.apply(high, low, NIBBLE_MAX));
    }

    /// Flip EVLR and EVCP in FR48 (as read back) and re-apply the range.
    pub fn toggle_stretch<R: RegisterMap + VerticalBlank>(&mut self, regs: &mut R) -> u8 {
        let current = regs.read_register(FpRegister::StretchControlB.index());
        let toggled = current ^ (VerticalStretch::EVLR | VerticalStretch::EVCP).bits();
        self.state.stretch_b = toggled;
        self.state.toggled = !self.state.toggled;
        debug!("FR48 {:02X} -> {:02X}, flipped: {}", current, toggled, self.state.toggled);
        self.reapply(regs);
        toggled
    }

    /// Write back every saved register, latch first and FP path last.
    /// No blank wait; the mode is usually about to change anyway.
    pub fn restore<R: RegisterMap>(&self, regs: &mut R) {
        const ORDER: [FpRegister; 6] = [
            FpRegister::CompensationLatch,
            FpRegister::StretchControlA,
            FpRegister::StretchControlB,
            FpRegister::ReplicationEnable,
            FpRegister::ReplicationRange,
            FpRegister::FpPath,
        ];
        info!("Restoring originals: {}", self.original);
        for reg in ORDER {
            regs.write_register(reg.index(), self.original.get(reg));
        }
    }

    /// Read a register range. No side effects on the sequencer.
    pub fn dump<R: RegisterMap>(&self, regs: &mut R, range: DumpRange) -> RegisterDump {
        RegisterDump::read(regs, range)
    }

    /// Write any register unconditionally, then dump.
    pub fn write_direct<R: RegisterMap>(
        &self,
        regs: &mut R,
        index: u8,
        value: u8,
        range: DumpRange,
    ) -> RegisterDump {
        info!("Direct write FR{:02X} = {:02X}", index, value);
        regs.write_register(index, value);
        self.dump(regs, range)
    }

    /// The five applied registers as read back
    pub fn status<R: RegisterMap>(&self, regs: &mut R) -> RegisterStatus {
        RegisterStatus::read(regs)
    }
}
