//! Port I/O and the flat-panel register file
//!
//! The panel controller exposes its `FRxx` registers through an index/data
//! port pair. Vertical retrace is reported by the standard VGA input status
//! register 1.

use bitflags::bitflags;

/// Flat-panel register index port
pub const FP_INDEX: u16 = 0x3D0;
/// Flat-panel register data port
pub const FP_DATA: u16 = 0x3D1;
/// Input status register 1 (colour addressing)
pub const INPUT_STATUS_1: u16 = 0x3DA;
/// Sequencer index/data
pub const SEQ_INDEX: u16 = 0x3C4;
pub const SEQ_DATA: u16 = 0x3C5;
/// Graphics controller index/data
pub const GC_INDEX: u16 = 0x3CE;
pub const GC_DATA: u16 = 0x3CF;
/// DAC write index / data
pub const DAC_WRITE_INDEX: u16 = 0x3C8;
pub const DAC_DATA: u16 = 0x3C9;

/// Sequencer map mask (plane write enable)
pub const SEQ_MAP_MASK: u8 = 0x02;
/// Graphics controller registers
pub const GC_SET_RESET: u8 = 0x00;
pub const GC_ENABLE_SET_RESET: u8 = 0x01;
pub const GC_DATA_ROTATE: u8 = 0x03;
pub const GC_READ_MAP: u8 = 0x04;
pub const GC_MODE: u8 = 0x05;
pub const GC_BIT_MASK: u8 = 0x08;

bitflags! {
    /// Input status register 1 bits
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct InputStatus: u8 {
        const DISPLAY_DISABLED = 0b0000_0001;
        const VERTICAL_RETRACE = 0b0000_1000;
    }
}

/// Byte-wide port I/O.
///
/// Reads take `&mut self` because reading a real port can have side effects
/// (status reads reset the attribute flip-flop, retrace counters advance).
pub trait PortIo {
    fn inb(&mut self, port: u16) -> u8;
    fn outb(&mut self, port: u16, value: u8);

    /// Write `value` to register `index` of an index/data port pair.
    fn write_indexed(&mut self, index_port: u16, index: u8, value: u8) {
        self.outb(index_port, index);
        self.outb(index_port + 1, value);
    }

    /// Read register `index` of an index/data port pair.
    fn read_indexed(&mut self, index_port: u16, index: u8) -> u8 {
        self.outb(index_port, index);
        self.inb(index_port + 1)
    }
}

impl<P: PortIo + ?Sized> PortIo for &mut P {
    fn inb(&mut self, port: u16) -> u8 {
        (**self).inb(port)
    }

    fn outb(&mut self, port: u16, value: u8) {
        (**self).outb(port, value)
    }
}

/// A byte-addressed register file.
pub trait RegisterMap {
    fn read_register(&mut self, index: u8) -> u8;
    fn write_register(&mut self, index: u8, value: u8);
}

/// Vertical blank status source.
pub trait VerticalBlank {
    /// Poll the retrace flag once.
    fn in_vertical_blank(&mut self) -> bool;

    /// Busy-wait for the start of a fresh blank interval.
    ///
    /// If a blank is already in progress, its end is awaited first so the
    /// caller always gets a whole interval. There is no timeout: a stuck
    /// status line hangs here.
    fn wait_for_blank_boundary(&mut self) {
        while self.in_vertical_blank() {
            std::hint::spin_loop();
        }
        while !self.in_vertical_blank() {
            std::hint::spin_loop();
        }
    }
}

/// The flat-panel register file reached through its index/data ports.
pub struct FpRegisters<P: PortIo> {
    ports: P,
}

impl<P: PortIo> FpRegisters<P> {
    pub fn new(ports: P) -> Self {
        Self { ports }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> P {
        self.ports
    }
}

impl<P: PortIo> RegisterMap for FpRegisters<P> {
    fn read_register(&mut self, index: u8) -> u8 {
        self.ports.read_indexed(FP_INDEX, index)
    }

    fn write_register(&mut self, index: u8, value: u8) {
        tracing::debug!("FR{:02X} <- {:02X}", index, value);
        self.ports.write_indexed(FP_INDEX, index, value);
    }
}

impl<P: PortIo> VerticalBlank for FpRegisters<P> {
    fn in_vertical_blank(&mut self) -> bool {
        InputStatus::from_bits_truncate(self.ports.inb(INPUT_STATUS_1))
            .contains(InputStatus::VERTICAL_RETRACE)
    }
}
