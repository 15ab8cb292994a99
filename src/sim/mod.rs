//! Simulated display adapter.
//!
//! Stands in for a CT65550-class controller with VGA and VBE BIOS support, so
//! the tester runs on machines without the real part and tests can inspect
//! register traffic and video memory:
//!
//! - **adapter**: `SimAdapter`, implementing every [`crate::hw`] trait
//! - **vga**: sequencer / graphics controller state and planar write logic
//! - **retrace**: a poll-driven vertical retrace clock

pub mod adapter;
pub mod vga;
pub mod retrace;

pub use adapter::SimAdapter;
#[cfg(test)]
pub use adapter::SimEvent;
