//! Hex byte prompt for the register write command

use std::io;

use tracing::warn;

use super::console::Console;
use super::keymapper::{Key, KeyReader, KeySource};

/// Value of one hex digit
pub fn hex_nibble(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

fn echo<C: Console>(console: &mut C, key: Key) -> io::Result<()> {
    match key {
        Key::Char(ch) if ch.is_ascii_graphic() => console.write_str(&(ch as char).to_string()),
        _ => Ok(()),
    }
}

fn read_nibble<S: KeySource, C: Console>(
    keys: &mut KeyReader<S>,
    console: &mut C,
) -> io::Result<Option<u8>> {
    let key = keys.next_key()?;
    echo(console, key)?;
    Ok(match key {
        Key::Char(ch) => hex_nibble(ch),
        Key::Special(_) => None,
    })
}

/// Read two hex digits. A bad digit prints `! hex` and starts the byte over.
pub fn prompt_hex_byte<S: KeySource, C: Console>(
    keys: &mut KeyReader<S>,
    console: &mut C,
    label: &str,
) -> io::Result<u8> {
    console.write_str(&format!("{} (00-FF): ", label))?;
    loop {
        let Some(high) = read_nibble(keys, console)? else {
            warn!("{}: rejected non-hex digit", label);
            console.write_str("\r\n! hex\r\n")?;
            continue;
        };
        let Some(low) = read_nibble(keys, console)? else {
            warn!("{}: rejected non-hex digit", label);
            console.write_str("\r\n! hex\r\n")?;
            continue;
        };
        console.write_str("\r\n")?;
        return Ok((high << 4) | low);
    }
}
