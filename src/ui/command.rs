//! Tuning commands

use super::keymapper::{scan, Key};

/// One operator command in the tuning loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Fixed value up (FR4D = N|N)
    Increment,
    /// Fixed value down
    Decrement,
    LowDown,
    LowUp,
    HighDown,
    HighUp,
    /// Flip the FR48 toggle bits and re-apply
    ToggleStretch,
    /// Prompt for index and value, write, dump
    WriteRegister,
    Dump,
    /// Write back the saved registers and keep going
    RestoreOriginals,
    /// Restore, text mode, exit
    Quit,
    /// Text mode and exit, registers left as tuned
    Exit,
}

impl Command {
    /// Decode a key; `None` for keys without a binding
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::Char(b'+') | Key::Special(scan::UP) => Some(Command::Increment),
            Key::Char(b'-') | Key::Special(scan::DOWN) => Some(Command::Decrement),
            Key::Char(b'l') => Some(Command::LowDown),
            Key::Char(b'L') => Some(Command::LowUp),
            Key::Char(b'h') => Some(Command::HighDown),
            Key::Char(b'H') => Some(Command::HighUp),
            Key::Char(b'e' | b'E') => Some(Command::ToggleStretch),
            Key::Char(b'w' | b'W') => Some(Command::WriteRegister),
            Key::Char(b'd' | b'D') => Some(Command::Dump),
            Key::Char(b'g' | b'G') => Some(Command::RestoreOriginals),
            // Ctrl+C quits the safe way
            Key::Char(b'q' | b'Q' | 0x03) => Some(Command::Quit),
            Key::Char(b'x' | b'X') => Some(Command::Exit),
            _ => None,
        }
    }
}

/// Help line shown once tuning starts
pub const HELP: &str = "KEYS: +/- or Up/Down FR4D  l/L low  h/H high  e FR48  w write  d dump  g restore  q quit  x exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_special_bindings() {
        assert_eq!(Command::from_key(Key::Char(b'+')), Some(Command::Increment));
        assert_eq!(Command::from_key(Key::Special(scan::UP)), Some(Command::Increment));
        assert_eq!(Command::from_key(Key::Special(scan::DOWN)), Some(Command::Decrement));
        assert_eq!(Command::from_key(Key::Char(b'E')), Some(Command::ToggleStretch));
        assert_eq!(Command::from_key(Key::Char(0x03)), Some(Command::Quit));
        assert_eq!(Command::from_key(Key::Char(b'X')), Some(Command::Exit));
    }

    #[test]
    fn test_nibble_keys_are_case_sensitive() {
        assert_eq!(Command::from_key(Key::Char(b'l')), Some(Command::LowDown));
        assert_eq!(Command::from_key(Key::Char(b'L')), Some(Command::LowUp));
        assert_eq!(Command::from_key(Key::Char(b'h')), Some(Command::HighDown));
        assert_eq!(Command::from_key(Key::Char(b'H')), Some(Command::HighUp));
    }

    #[test]
    fn test_unbound_keys() {
        assert_eq!(Command::from_key(Key::Char(b'z')), None);
        // 'H' as a scan code is the Up arrow, not the high nibble key
        assert_eq!(Command::from_key(Key::Special(b'H')), Some(Command::Increment));
        assert_eq!(Command::from_key(Key::Special(scan::LEFT)), None);
    }
}
