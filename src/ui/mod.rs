//! Operator input and console output.
//!
//! - **keymapper**: crossterm events to PC key codes and back to keys
//! - **command**: key bindings of the tuning loop
//! - **prompt**: hex byte entry for register writes
//! - **console**: line output (raw-mode terminal, or a buffer in tests)

pub mod keymapper;
pub mod command;
pub mod prompt;
pub mod console;

pub use command::Command;
pub use console::{Console, TerminalConsole};
pub use keymapper::{Key, KeyReader, KeySource, TerminalKeys};
pub use prompt::prompt_hex_byte;
