//! Line-oriented console output
//!
//! The terminal runs in raw mode while the tester is up, so lines end in
//! CR LF like BIOS teletype output.

use std::io::{self, Stdout, Write};

use crossterm::{execute, style::Print, terminal};

pub trait Console {
    fn write_str(&mut self, s: &str) -> io::Result<()>;

    fn write_line(&mut self, s: &str) -> io::Result<()> {
        self.write_str(s)?;
        self.write_str("\r\n")
    }
}

impl<C: Console + ?Sized> Console for &mut C {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        (**self).write_str(s)
    }
}

/// stdout in raw mode; raw mode is left again on drop
pub struct TerminalConsole {
    out: Stdout,
}

impl TerminalConsole {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self { out: io::stdout() })
    }
}

impl Console for TerminalConsole {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        execute!(self.out, Print(s))?;
        self.out.flush()
    }
}

impl Drop for TerminalConsole {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Collects output in memory
#[cfg(test)]
#[derive(Default)]
pub struct BufferConsole {
    pub text: String,
}

#[cfg(test)]
impl BufferConsole {
    /// Output split into lines
    pub fn lines(&self) -> Vec<&str> {
        self.text.split("\r\n").collect()
    }
}

#[cfg(test)]
impl Console for BufferConsole {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.text.push_str(s);
        Ok(())
    }
}
