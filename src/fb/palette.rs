//! DAC setup for the pattern colours in 256-colour modes

use crate::hw::ports::{DAC_DATA, DAC_WRITE_INDEX};
use crate::hw::PortIo;

/// (index, r, g, b) with 6-bit components
pub const BASIC_PALETTE: [(u8, u8, u8, u8); 4] = [
    (0, 0, 0, 0),     // black
    (1, 0, 0, 63),    // blue
    (2, 0, 63, 0),    // green
    (15, 63, 63, 63), // white
];

pub fn set_palette_rgb<P: PortIo>(ports: &mut P, index: u8, r: u8, g: u8, b: u8) {
    ports.outb(DAC_WRITE_INDEX, index);
    ports.outb(DAC_DATA, r);
    ports.outb(DAC_DATA, g);
    ports.outb(DAC_DATA, b);
}

pub fn init_basic_palette<P: PortIo>(ports: &mut P) {
    for (index, r, g, b) in BASIC_PALETTE {
        set_palette_rgb(ports, index, r, g, b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::sim::SimAdapter;

    #[test]
    fn test_basic_palette_entries() {
        let mut sim = SimAdapter::new(&SimConfig::default());
        init_basic_palette(&mut sim);
        assert_eq!(sim.dac_entry(1), [0, 0, 63]);
        assert_eq!(sim.dac_entry(2), [0, 63, 0]);
        assert_eq!(sim.dac_entry(15), [63, 63, 63]);
        assert_eq!(sim.dac_entry(0), [0, 0, 0]);
    }
}
