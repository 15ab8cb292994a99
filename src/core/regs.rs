//! Flat-panel registers touched by the tester
//!
//! | Register | Role |
//! |----------|------|
//! | FR01 | display type; bit 1 routes output to the flat panel |
//! | FR40 | horizontal compensation; writing it latches new vertical parameters |
//! | FR41 | horizontal stretching |
//! | FR48 | vertical compensation / replication control |
//! | FR4D | replication range, high nibble : low nibble |
//! | FR4E | stretching enable per vertical display class |

use std::fmt;

use bitflags::bitflags;

use crate::hw::RegisterMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FpRegister {
    FpPath = 0x01,
    CompensationLatch = 0x40,
    StretchControlA = 0x41,
    StretchControlB = 0x48,
    ReplicationRange = 0x4D,
    ReplicationEnable = 0x4E,
}

impl FpRegister {
    /// Every register saved at capture time, in capture order
    pub const TRACKED: [FpRegister; 6] = [
        FpRegister::FpPath,
        FpRegister::ReplicationRange,
        FpRegister::ReplicationEnable,
        FpRegister::StretchControlB,
        FpRegister::StretchControlA,
        FpRegister::CompensationLatch,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    fn slot(self) -> usize {
        match self {
            FpRegister::FpPath => 0,
            FpRegister::ReplicationRange => 1,
            FpRegister::ReplicationEnable => 2,
            FpRegister::StretchControlB => 3,
            FpRegister::StretchControlA => 4,
            FpRegister::CompensationLatch => 5,
        }
    }
}

impl fmt::Display for FpRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FR{:02X}", self.index())
    }
}

bitflags! {
    /// FR01 bits
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DisplayType: u8 {
        const CRT = 0b0000_0001;
        const FLAT_PANEL = 0b0000_0010;
    }
}

bitflags! {
    /// FR48 bits flipped by the toggle command
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct VerticalStretch: u8 {
        /// Enable vertical line replication
        const EVLR = 0b0000_0001;
        /// Enable vertical compensation
        const EVCP = 0b0000_0100;
    }
}

/// Largest nibble value of the replication range
pub const NIBBLE_MAX: u8 = 0x0F;

/// Pack a replication range into FR4D. `low` above `high` is clamped to `high`.
pub fn pack_range(low: u8, high: u8) -> u8 {
    let high = high & NIBBLE_MAX;
    let low = (low & NIBBLE_MAX).min(high);
    (high << 4) | low
}

/// Register values saved before the tester changes anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterSnapshot {
    values: [u8; FpRegister::TRACKED.len()],
}

impl RegisterSnapshot {
    pub fn capture<R: RegisterMap>(regs: &mut R) -> Self {
        let mut values = [0u8; FpRegister::TRACKED.len()];
        for reg in FpRegister::TRACKED {
            values[reg.slot()] = regs.read_register(reg.index());
        }
        Self { values }
    }

    pub fn get(&self, reg: FpRegister) -> u8 {
        self.values[reg.slot()]
    }
}

impl fmt::Display for RegisterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reg) in FpRegister::TRACKED.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={:02X}", reg, self.get(*reg))?;
        }
        Ok(())
    }
}

/// Operator-tunable part of the register set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplicationState {
    pub low: u8,
    pub high: u8,
    /// FR48 value programmed by apply
    pub stretch_b: u8,
    /// Whether the toggle bits are flipped relative to the starting value
    pub toggled: bool,
}

impl ReplicationState {
    pub fn new(low: u8, high: u8, stretch_b: u8) -> Self {
        let high = high.min(NIBBLE_MAX);
        Self {
            low: low.min(high),
            high,
            stretch_b,
            toggled: false,
        }
    }

    #[cfg(test)]
    pub fn packed(&self) -> u8 {
        pack_range(self.low, self.high)
    }
}

/// Inclusive contiguous register range for dumps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DumpRange {
    pub first: u8,
    pub last: u8,
}

impl DumpRange {
    pub fn new(first: u8, last: u8) -> Self {
        Self {
            first: first.min(last),
            last: first.max(last),
        }
    }
}

/// Values read from a [`DumpRange`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterDump {
    pub first: u8,
    pub values: Vec<u8>,
}

impl RegisterDump {
    pub fn read<R: RegisterMap>(regs: &mut R, range: DumpRange) -> Self {
        let values = (range.first..=range.last)
            .map(|index| regs.read_register(index))
            .collect();
        Self {
            first: range.first,
            values,
        }
    }

    #[cfg(test)]
    pub fn get(&self, index: u8) -> Option<u8> {
        let slot = index.checked_sub(self.first)? as usize;
        self.values.get(slot).copied()
    }

    fn last(&self) -> u8 {
        self.first
            .wrapping_add(self.values.len().saturating_sub(1) as u8)
    }
}

impl fmt::Display for RegisterDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FR{:02X}..{:02X}:", self.first, self.last())?;
        for value in &self.values {
            write!(f, " {:02X}", value)?;
        }
        Ok(())
    }
}

/// The five registers written by apply, as read back from the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterStatus {
    pub range: u8,
    pub enable: u8,
    pub stretch_b: u8,
    pub stretch_a: u8,
    pub latch: u8,
}

impl RegisterStatus {
    pub fn read<R: RegisterMap>(regs: &mut R) -> Self {
        Self {
            range: regs.read_register(FpRegister::ReplicationRange.index()),
            enable: regs.read_register(FpRegister::ReplicationEnable.index()),
            stretch_b: regs.read_register(FpRegister::StretchControlB.index()),
            stretch_a: regs.read_register(FpRegister::StretchControlA.index()),
            latch: regs.read_register(FpRegister::CompensationLatch.index()),
        }
    }
}

impl fmt::Display for RegisterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FR4D={:02X} FR4E={:02X} FR48={:02X} FR41={:02X} FR40={:02X}",
            self.range, self.enable, self.stretch_b, self.stretch_a, self.latch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat([u8; 256]);

    impl RegisterMap for Flat {
        fn read_register(&mut self, index: u8) -> u8 {
            self.0[index as usize]
        }

        fn write_register(&mut self, index: u8, value: u8) {
            self.0[index as usize] = value;
        }
    }

    #[test]
    fn test_pack_range() {
        assert_eq!(pack_range(0, 0), 0x00);
        assert_eq!(pack_range(2, 2), 0x22);
        assert_eq!(pack_range(1, 7), 0x71);
        assert_eq!(pack_range(9, 3), pack_range(3, 3));
        assert_eq!(pack_range(0x1F, 0x2F), 0xFF);
    }

    #[test]
    fn test_snapshot_reads_tracked_registers() {
        let mut regs = Flat([0; 256]);
        for (i, reg) in FpRegister::TRACKED.iter().enumerate() {
            regs.0[reg.index() as usize] = 0x10 + i as u8;
        }
        let snapshot = RegisterSnapshot::capture(&mut regs);
        assert_eq!(snapshot.get(FpRegister::FpPath), 0x10);
        assert_eq!(snapshot.get(FpRegister::CompensationLatch), 0x15);
        assert_eq!(
            snapshot.to_string(),
            "FR01=10 FR4D=11 FR4E=12 FR48=13 FR41=14 FR40=15"
        );
    }

    #[test]
    fn test_dump_format() {
        let mut regs = Flat([0; 256]);
        regs.0[0x40] = 0x3F;
        regs.0[0x4F] = 0xA5;
        let dump = RegisterDump::read(&mut regs, DumpRange::new(0x40, 0x4F));
        assert_eq!(dump.values.len(), 16);
        assert_eq!(dump.get(0x4F), Some(0xA5));
        assert_eq!(dump.get(0x3F), None);
        assert_eq!(dump.get(0x50), None);
        assert_eq!(
            dump.to_string(),
            "FR40..4F: 3F 00 00 00 00 00 00 00 00 00 00 00 00 00 00 A5"
        );
    }

    #[test]
    fn test_dump_range_whole_file() {
        let mut regs = Flat([7; 256]);
        let dump = RegisterDump::read(&mut regs, DumpRange::new(0xFF, 0x00));
        assert_eq!(dump.values.len(), 256);
        assert_eq!(dump.to_string().len(), "FR00..FF:".len() + 256 * 3);
    }

    #[test]
    fn test_state_starts_ordered() {
        let state = ReplicationState::new(9, 3, 0x17);
        assert_eq!((state.low, state.high), (3, 3));
        assert_eq!(state.packed(), 0x33);
        assert_eq!(ReplicationState::new(0, 20, 0).high, 15);
    }
}
