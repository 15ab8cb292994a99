//! VGA sequencer, graphics controller and planar memory

use crate::hw::ports::{
    GC_BIT_MASK, GC_DATA_ROTATE, GC_ENABLE_SET_RESET, GC_MODE, GC_READ_MAP, GC_SET_RESET,
    SEQ_MAP_MASK,
};

/// Bytes per plane in the A000h aperture
pub const PLANE_SIZE: usize = 0x10000;
pub const PLANE_COUNT: usize = 4;

const SEQ_REGS_LEN: usize = 5;
const GC_REGS_LEN: usize = 9;

#[derive(Debug, Clone)]
pub struct VgaRegs {
    seq_index: u8,
    seq: [u8; SEQ_REGS_LEN],
    gc_index: u8,
    gc: [u8; GC_REGS_LEN],
    latches: [u8; PLANE_COUNT],
}

impl Default for VgaRegs {
    fn default() -> Self {
        let mut regs = Self {
            seq_index: 0,
            seq: [0; SEQ_REGS_LEN],
            gc_index: 0,
            gc: [0; GC_REGS_LEN],
            latches: [0; PLANE_COUNT],
        };
        regs.reset();
        regs
    }
}

impl VgaRegs {
    /// Register state after a BIOS mode set
    pub fn reset(&mut self) {
        self.seq = [0x03, 0x01, 0x0F, 0x00, 0x06];
        self.gc = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x0F, 0xFF];
        self.latches = [0; PLANE_COUNT];
    }

    pub fn set_seq_index(&mut self, index: u8) {
        self.seq_index = index;
    }

    pub fn set_gc_index(&mut self, index: u8) {
        self.gc_index = index;
    }

    pub fn write_seq(&mut self, value: u8) {
        if let Some(reg) = self.seq.get_mut(self.seq_index as usize) {
            *reg = value;
        }
    }

    pub fn read_seq(&self) -> u8 {
        self.seq.get(self.seq_index as usize).copied().unwrap_or(0xFF)
    }

    pub fn write_gc(&mut self, value: u8) {
        let index = self.gc_index as usize;
        if let Some(reg) = self.gc.get_mut(index) {
            // Set/reset and enable set/reset only have one bit per plane
            *reg = match index as u8 {
                GC_SET_RESET | GC_ENABLE_SET_RESET => value & 0x0F,
                _ => value,
            };
        }
    }

    pub fn read_gc(&self) -> u8 {
        self.gc.get(self.gc_index as usize).copied().unwrap_or(0xFF)
    }

    pub fn gc(&self, index: u8) -> u8 {
        self.gc.get(index as usize).copied().unwrap_or(0xFF)
    }

    /// CPU read: loads all four latches, returns the read-map plane
    pub fn read_planar(&mut self, planes: &[u8], offset: usize) -> u8 {
        for plane in 0..PLANE_COUNT {
            self.latches[plane] = planes[plane * PLANE_SIZE + offset];
        }
        self.latches[(self.gc(GC_READ_MAP) & 0x03) as usize]
    }

    /// CPU write in write mode 0 or 3; other modes leave memory untouched
    pub fn write_planar(&mut self, planes: &mut [u8], offset: usize, value: u8) {
        let write_mode = self.gc(GC_MODE) & 0x03;
        let rotate = self.gc(GC_DATA_ROTATE);
        let rotated = value.rotate_right((rotate & 0x07) as u32);
        let func_select = (rotate >> 3) & 0x03;
        let bit_mask = self.gc(GC_BIT_MASK);
        let set_reset = self.gc(GC_SET_RESET);
        let enable_set_reset = self.gc(GC_ENABLE_SET_RESET);
        let map_mask = self.seq[SEQ_MAP_MASK as usize] & 0x0F;

        for plane in 0..PLANE_COUNT {
            let plane_bit = 1u8 << plane;
            if map_mask & plane_bit == 0 {
                continue;
            }

            let latch = self.latches[plane];
            let set_reset_byte = if set_reset & plane_bit != 0 { 0xFF } else { 0x00 };
            let (data, mask) = match write_mode {
                0 => {
                    let data = if enable_set_reset & plane_bit != 0 {
                        set_reset_byte
                    } else {
                        rotated
                    };
                    (data, bit_mask)
                }
                3 => (set_reset_byte, bit_mask & rotated),
                _ => continue,
            };

            let alu = match func_select {
                0 => data,
                1 => data & latch,
                2 => data | latch,
                _ => data ^ latch,
            };

            planes[plane * PLANE_SIZE + offset] = (alu & mask) | (latch & !mask);
        }
    }

    #[cfg(test)]
    /// 4-bit colour of pixel `bit` (7 = leftmost) of byte `offset`
    pub fn pixel(planes: &[u8], offset: usize, bit: u8) -> u8 {
        (0..PLANE_COUNT).fold(0, |color, plane| {
            let set = (planes[plane * PLANE_SIZE + offset] >> bit) & 1;
            color | (set << plane)
        })
    }
}
