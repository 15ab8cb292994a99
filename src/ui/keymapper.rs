//! Key mapping for operator input
//!
//! Input arrives as PC keyboard codes, one byte per read. Plain keys are their
//! ASCII code. Extended keys take two reads: a prefix (0x00 or 0xE0) and then
//! the scan code, e.g. Up arrow is `0xE0, 72`.
//!
//! [`KeyMapper`] turns crossterm events into that byte stream and
//! [`KeyDecoder`] turns the stream back into [`Key`]s.

use std::collections::VecDeque;
use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Prefix for function keys
pub const PREFIX_NUL: u8 = 0x00;
/// Prefix for the grey cursor / editing keys
pub const PREFIX_EXTENDED: u8 = 0xE0;

/// Scan codes delivered after a prefix
pub mod scan {
    pub const F1: u8 = 59;
    pub const HOME: u8 = 71;
    pub const UP: u8 = 72;
    pub const PAGE_UP: u8 = 73;
    pub const LEFT: u8 = 75;
    pub const RIGHT: u8 = 77;
    pub const END: u8 = 79;
    pub const DOWN: u8 = 80;
    pub const PAGE_DOWN: u8 = 81;
    pub const INSERT: u8 = 82;
    pub const DELETE: u8 = 83;
}

/// Blocking single-code key input
pub trait KeySource {
    fn read_key(&mut self) -> io::Result<u8>;
}

impl<S: KeySource + ?Sized> KeySource for &mut S {
    fn read_key(&mut self) -> io::Result<u8> {
        (**self).read_key()
    }
}

/// A decoded keystroke
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(u8),
    /// Scan code of an extended key
    Special(u8),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum DecodeState {
    #[default]
    Plain,
    Prefixed,
}

/// Two-state decoder for the prefix protocol
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyDecoder {
    state: DecodeState,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one code; returns a key once one is complete
    pub fn feed(&mut self, code: u8) -> Option<Key> {
        match self.state {
            DecodeState::Plain if code == PREFIX_NUL || code == PREFIX_EXTENDED => {
                self.state = DecodeState::Prefixed;
                None
            }
            DecodeState::Plain => Some(Key::Char(code)),
            DecodeState::Prefixed => {
                self.state = DecodeState::Plain;
                Some(Key::Special(code))
            }
        }
    }
}

/// Key source plus decoder
pub struct KeyReader<S: KeySource> {
    source: S,
    decoder: KeyDecoder,
}

impl<S: KeySource> KeyReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            decoder: KeyDecoder::new(),
        }
    }

    /// Block until a whole key has been read
    pub fn next_key(&mut self) -> io::Result<Key> {
        loop {
            let code = self.source.read_key()?;
            if let Some(key) = self.decoder.feed(code) {
                return Ok(key);
            }
        }
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }
}

/// Key mapper for converting key events to keyboard codes
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent to codes; empty if the key has no PC code
    pub fn map(event: &KeyEvent) -> Vec<u8> {
        match event.code {
            KeyCode::Char(ch) => Self::map_char(ch, event.modifiers),
            KeyCode::Enter => vec![0x0D],
            KeyCode::Backspace => vec![0x08],
            KeyCode::Tab => vec![0x09],
            KeyCode::Esc => vec![0x1B],

            KeyCode::Up => vec![PREFIX_EXTENDED, scan::UP],
            KeyCode::Down => vec![PREFIX_EXTENDED, scan::DOWN],
            KeyCode::Left => vec![PREFIX_EXTENDED, scan::LEFT],
            KeyCode::Right => vec![PREFIX_EXTENDED, scan::RIGHT],
            KeyCode::Home => vec![PREFIX_EXTENDED, scan::HOME],
            KeyCode::End => vec![PREFIX_EXTENDED, scan::END],
            KeyCode::PageUp => vec![PREFIX_EXTENDED, scan::PAGE_UP],
            KeyCode::PageDown => vec![PREFIX_EXTENDED, scan::PAGE_DOWN],
            KeyCode::Insert => vec![PREFIX_EXTENDED, scan::INSERT],
            KeyCode::Delete => vec![PREFIX_EXTENDED, scan::DELETE],

            // F1-F10 are 59-68 after a NUL prefix
            KeyCode::F(n @ 1..=10) => vec![PREFIX_NUL, scan::F1 + (n - 1)],

            _ => Vec::new(),
        }
    }

    /// Map a character with modifiers
    fn map_char(ch: char, mods: KeyModifiers) -> Vec<u8> {
        if !ch.is_ascii() {
            return Vec::new();
        }
        // Ctrl + letter = control character
        if mods.contains(KeyModifiers::CONTROL) && ch.is_ascii_alphabetic() {
            return vec![(ch.to_ascii_lowercase() as u8) - b'a' + 1];
        }
        vec![ch as u8]
    }
}

/// Keys from the terminal via crossterm (raw mode must be on)
#[derive(Default)]
pub struct TerminalKeys {
    pending: VecDeque<u8>,
}

impl TerminalKeys {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeySource for TerminalKeys {
    fn read_key(&mut self) -> io::Result<u8> {
        loop {
            if let Some(code) = self.pending.pop_front() {
                return Ok(code);
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Release {
                    self.pending.extend(KeyMapper::map(&key));
                }
            }
        }
    }
}

/// Keys from a fixed script; reading past the end is an EOF error
#[cfg(test)]
pub struct ScriptedKeys {
    codes: VecDeque<u8>,
}

#[cfg(test)]
impl ScriptedKeys {
    pub fn new(codes: &[u8]) -> Self {
        Self {
            codes: codes.iter().copied().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.codes.len()
    }
}

#[cfg(test)]
impl KeySource for ScriptedKeys {
    fn read_key(&mut self) -> io::Result<u8> {
        self.codes
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "key script exhausted"))
    }
}
