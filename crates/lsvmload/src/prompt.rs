//! The interactive passphrase prompt (spec.md §4.O1 `S3`, §8's
//! non-printable-input boundary behavior). Grounded on
//! `original_source/lsvmutils/pass.c`'s backspace-editable line buffer:
//! typed characters append to a buffer up to a fixed limit; backspace
//! (`0x08`/`0x7F`) pops the last character and re-echoes it as erased.

use lsvmload_interpose::{Console, Key};

/// `spec.md` §8: "read up to 63 printable chars (backspace-editable)".
pub const MAX_PASSPHRASE_LEN: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("input contained a non-printable character")]
    NonPrintable,
    #[error("passphrase buffer is full")]
    BufferFull,
}

/// Reads one line of passphrase input from `console`, applying backspace
/// editing and rejecting non-printable bytes (ASCII outside `0x20..=0x7E`).
pub fn read_passphrase(console: &mut impl Console) -> Result<Vec<u8>, PromptError> {
    let mut buf: Vec<u8> = Vec::new();

    loop {
        match console.read_key() {
            Key::Enter => break,
            Key::Backspace => {
                if buf.pop().is_some() {
                    console.write_str("\x08 \x08");
                }
            }
            Key::Char(b) => {
                if !(0x20..=0x7E).contains(&b) {
                    return Err(PromptError::NonPrintable);
                }
                if buf.len() >= MAX_PASSPHRASE_LEN {
                    return Err(PromptError::BufferFull);
                }
                buf.push(b);
                console.write_str("*");
            }
        }
    }

    Ok(buf)
}
