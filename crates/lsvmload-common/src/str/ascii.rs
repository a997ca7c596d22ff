//! Fixed-width, NUL-padded ASCII strings as used by LUKS (`cipher_name`,
//! `cipher_mode`, `hash_spec`, `uuid`) and EXT2 (volume label).

/// A fixed-size byte buffer holding a NUL-terminated (or NUL-padded) ASCII
/// string, as embedded directly in an on-disk struct.
#[repr(transparent)]
#[derive(Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
pub struct FixedAsciiStr<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> FixedAsciiStr<N> {
    pub const fn zeroed() -> Self {
        Self { bytes: [0u8; N] }
    }

    /// Builds a buffer from a `&str`, NUL-padding the remainder.
    ///
    /// Returns `None` if `value` does not fit in `N` bytes.
    pub fn from_str(value: &str) -> Option<Self> {
        if value.len() > N {
            return None;
        }
        let mut bytes = [0u8; N];
        bytes[..value.len()].copy_from_slice(value.as_bytes());
        Some(Self { bytes })
    }

    /// Reads back the string up to the first NUL byte (or the full width if
    /// there is none).
    pub fn as_str(&self) -> &str {
        let len = self
            .bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.bytes.len());
        core::str::from_utf8(&self.bytes[..len]).unwrap_or("")
    }

    pub fn raw(&self) -> &[u8; N] {
        &self.bytes
    }
}

impl<const N: usize> core::fmt::Debug for FixedAsciiStr<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("FixedAsciiStr").field(&self.as_str()).finish()
    }
}
