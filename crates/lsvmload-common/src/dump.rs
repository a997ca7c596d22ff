//! Debug-only hex dump helper, used by `log::debug!` call sites that want to
//! show raw header bytes (LUKS header, GPT entries) without formatting them
//! by hand at every call site.

/// Wraps a byte slice so it can be passed directly to `{}`/`{:?}` format
/// strings and rendered as a classic `offset: hex  ascii` hex dump.
pub struct HexDump<'a>(pub &'a [u8]);

pub fn hexdump(bytes: &[u8]) -> HexDump<'_> {
    HexDump(bytes)
}

impl core::fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (row, chunk) in self.0.chunks(16).enumerate() {
            write!(f, "{:08x}: ", row * 16)?;
            for byte in chunk {
                write!(f, "{:02x} ", byte)?;
            }
            for _ in chunk.len()..16 {
                write!(f, "   ")?;
            }
            write!(f, " ")?;
            for &byte in chunk {
                let c = if byte.is_ascii_graphic() { byte as char } else { '.' };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_ascii_run() {
        let out = alloc_string(&hexdump(b"hello"));
        assert!(out.contains("hello"));
        assert!(out.contains("68 65 6c 6c 6f"));
    }

    fn alloc_string(d: &HexDump<'_>) -> std::string::String {
        std::format!("{}", d)
    }
}
