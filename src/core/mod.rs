//! Core tester logic.
//!
//! - **regs**: flat-panel register names, snapshots, dumps and status lines
//! - **sequencer**: save / apply / restore protocol for vertical replication
//! - **session**: the operator session from mode menu to text mode
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── Platform (ports, video memory, mode service)
//! ├── Framebuffer writer + test pattern (drawing phase)
//! └── RegisterSequencer (tuning phase)
//!     ├── RegisterSnapshot (originals)
//!     └── ReplicationState (low / high / FR48)
//! ```

pub mod regs;
pub mod sequencer;
pub mod session;

pub use session::{ExitOutcome, Session, SessionSettings};
