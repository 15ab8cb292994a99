//! CPU-visible video memory
//!
//! Offsets are relative to the start of the aperture (segment A000h in the
//! real-mode layout). Which physical bytes an offset reaches depends on the
//! active mode: the planar controller logic, or the selected VBE bank.

/// The video memory aperture.
pub trait VideoMemory {
    /// Read one byte. In planar modes this also loads the controller latches.
    fn read_byte(&mut self, offset: usize) -> u8;

    /// Write `data` starting at `offset`.
    fn write_bytes(&mut self, offset: usize, data: &[u8]);

    /// Write `len` copies of `value` starting at `offset`.
    fn fill_bytes(&mut self, offset: usize, len: usize, value: u8) {
        for i in 0..len {
            self.write_bytes(offset + i, &[value]);
        }
    }
}

/// Window A bank selection (VBE function 05h).
pub trait BankSwitch {
    fn select_bank(&mut self, bank: u32);
}

impl<M: VideoMemory + ?Sized> VideoMemory for &mut M {
    fn read_byte(&mut self, offset: usize) -> u8 {
        (**self).read_byte(offset)
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        (**self).write_bytes(offset, data)
    }

    fn fill_bytes(&mut self, offset: usize, len: usize, value: u8) {
        (**self).fill_bytes(offset, len, value)
    }
}

impl<B: BankSwitch + ?Sized> BankSwitch for &mut B {
    fn select_bank(&mut self, bank: u32) {
        (**self).select_bank(bank)
    }
}
