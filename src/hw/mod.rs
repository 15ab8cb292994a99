//! Platform collaborator seams.
//!
//! Everything the tool needs from the machine goes through the traits in this
//! module, so the same drawing and sequencing code runs against real ports or
//! against the simulated adapter in [`crate::sim`]:
//!
//! - **ports**: byte port I/O, the flat-panel register file, vertical blank
//! - **memory**: the CPU-visible video aperture and bank switching
//! - **mode**: mode query / mode set / return to text mode
//!
//! # Architecture
//!
//! ```text
//! PortIo (inb/outb)
//! └── FpRegisters (0x3D0 index / 0x3D1 data, 0x3DA status)
//!     ├── RegisterMap
//!     └── VerticalBlank
//! VideoMemory + BankSwitch (A000h aperture, VBE window A)
//! ModeService (BIOS / VBE mode calls)
//! ```

pub mod ports;
pub mod memory;
pub mod mode;

pub use ports::{FpRegisters, PortIo, RegisterMap, VerticalBlank};
pub use memory::{BankSwitch, VideoMemory};
pub use mode::{BankWindow, DisplayProfile, MemoryModel, ModeError, ModeId, ModeService, Profile};

/// Everything a display session needs from the platform in one bound.
pub trait Platform: PortIo + VideoMemory + BankSwitch + ModeService {}

impl<T: PortIo + VideoMemory + BankSwitch + ModeService> Platform for T {}
