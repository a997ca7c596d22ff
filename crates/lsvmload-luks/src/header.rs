use alloc::string::{String, ToString};
use lsvmload_common::types::{BigEndian, Endianness};

pub const LUKS_MAGIC: [u8; 6] = [b'L', b'U', b'K', b'S', 0xba, 0xbe];
pub const LUKS_SALT_SIZE: usize = 32;
pub const LUKS_SECTOR_SIZE: usize = 512;
pub const LUKS_CIPHER_NAME_SIZE: usize = 32;
pub const LUKS_CIPHER_MODE_SIZE: usize = 32;
pub const LUKS_HASH_SPEC_SIZE: usize = 32;
pub const LUKS_DIGEST_SIZE: usize = 20;
pub const LUKS_UUID_STRING_SIZE: usize = 40;
pub const LUKS_SLOTS: usize = 8;

pub const SLOT_ENABLED: u32 = 0x00ac71f3;
pub const SLOT_DISABLED: u32 = 0x0000dead;

const HEADER_LEN: usize = 2 * LUKS_SECTOR_SIZE;

/// One of `LUKS_SLOTS` key slots in a [`LuksHeader`].
#[derive(Debug, Clone, Copy)]
pub struct KeySlot {
    pub enabled: bool,
    pub password_iters: u32,
    pub password_salt: [u8; LUKS_SALT_SIZE],
    pub key_material_offset: u32,
    pub af_stripes: u32,
}

/// The on-disk LUKS1 header (spec.md §3, §4.L3), parsed from the big-endian
/// raw bytes at block 0 into host-native fields.
///
/// Unlike `hadris-fat`'s boot-sector structs, which keep the raw
/// `#[repr(C, packed)]` layout around for zero-copy access, the LUKS header
/// mixes big-endian integers with fixed ASCII strings in a way that doesn't
/// round-trip cleanly through `bytemuck` on a little-endian host, so this
/// type holds already-converted values and is built directly from the wire
/// bytes in [`LuksHeader::parse`].
#[derive(Debug, Clone)]
pub struct LuksHeader {
    pub version: u16,
    pub cipher_name: String,
    pub cipher_mode: String,
    pub hash_spec: String,
    pub payload_offset: u32,
    pub key_bytes: u32,
    pub mk_digest: [u8; LUKS_DIGEST_SIZE],
    pub mk_digest_salt: [u8; LUKS_SALT_SIZE],
    pub mk_digest_iter: u32,
    pub uuid: String,
    pub slots: [KeySlot; LUKS_SLOTS],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("bad LUKS magic")]
    BadMagic,
    #[error("unsupported LUKS header version")]
    UnsupportedVersion,
    #[error("header field is not valid UTF-8/ASCII")]
    BadString,
    #[error("buffer too short for a LUKS header")]
    Truncated,
}

fn be_u16(bytes: &[u8]) -> u16 {
    BigEndian::get_u16(bytes[..2].try_into().unwrap())
}

fn be_u32(bytes: &[u8]) -> u32 {
    BigEndian::get_u32(bytes[..4].try_into().unwrap())
}

fn trim_cstr(bytes: &[u8]) -> Result<String, HeaderError> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end])
        .map(ToString::to_string)
        .map_err(|_| HeaderError::BadString)
}

impl LuksHeader {
    /// Parses a 1024-byte big-endian LUKS1 header (block 0 of the device).
    pub fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_LEN {
            return Err(HeaderError::Truncated);
        }
        if bytes[0..6] != LUKS_MAGIC {
            return Err(HeaderError::BadMagic);
        }
        let version = be_u16(&bytes[6..8]);
        if version != 1 {
            return Err(HeaderError::UnsupportedVersion);
        }

        let mut off = 8;
        let cipher_name = trim_cstr(&bytes[off..off + LUKS_CIPHER_NAME_SIZE])?;
        off += LUKS_CIPHER_NAME_SIZE;
        let cipher_mode = trim_cstr(&bytes[off..off + LUKS_CIPHER_MODE_SIZE])?;
        off += LUKS_CIPHER_MODE_SIZE;
        let hash_spec = trim_cstr(&bytes[off..off + LUKS_HASH_SPEC_SIZE])?;
        off += LUKS_HASH_SPEC_SIZE;

        let payload_offset = be_u32(&bytes[off..off + 4]);
        off += 4;
        let key_bytes = be_u32(&bytes[off..off + 4]);
        off += 4;

        let mut mk_digest = [0u8; LUKS_DIGEST_SIZE];
        mk_digest.copy_from_slice(&bytes[off..off + LUKS_DIGEST_SIZE]);
        off += LUKS_DIGEST_SIZE;

        let mut mk_digest_salt = [0u8; LUKS_SALT_SIZE];
        mk_digest_salt.copy_from_slice(&bytes[off..off + LUKS_SALT_SIZE]);
        off += LUKS_SALT_SIZE;

        let mk_digest_iter = be_u32(&bytes[off..off + 4]);
        off += 4;

        let uuid = trim_cstr(&bytes[off..off + LUKS_UUID_STRING_SIZE])?;
        off += LUKS_UUID_STRING_SIZE;

        let mut slots = [KeySlot {
            enabled: false,
            password_iters: 0,
            password_salt: [0; LUKS_SALT_SIZE],
            key_material_offset: 0,
            af_stripes: 0,
        }; LUKS_SLOTS];

        for slot in slots.iter_mut() {
            let enabled = be_u32(&bytes[off..off + 4]);
            off += 4;
            let password_iters = be_u32(&bytes[off..off + 4]);
            off += 4;
            let mut password_salt = [0u8; LUKS_SALT_SIZE];
            password_salt.copy_from_slice(&bytes[off..off + LUKS_SALT_SIZE]);
            off += LUKS_SALT_SIZE;
            let key_material_offset = be_u32(&bytes[off..off + 4]);
            off += 4;
            let af_stripes = be_u32(&bytes[off..off + 4]);
            off += 4;

            *slot = KeySlot {
                enabled: enabled == SLOT_ENABLED,
                password_iters,
                password_salt,
                key_material_offset,
                af_stripes,
            };
        }

        Ok(Self {
            version,
            cipher_name,
            cipher_mode,
            hash_spec,
            payload_offset,
            key_bytes,
            mk_digest,
            mk_digest_salt,
            mk_digest_iter,
            uuid,
            slots,
        })
    }

    pub fn enabled_slots(&self) -> impl Iterator<Item = (usize, &KeySlot)> {
        self.slots.iter().enumerate().filter(|(_, s)| s.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn sample_header_bytes() -> alloc::vec::Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[0..6].copy_from_slice(&LUKS_MAGIC);
        buf[6..8].copy_from_slice(&1u16.to_be_bytes());
        buf[8..8 + 9].copy_from_slice(b"aes-xts-p");
        buf[40..40 + 7].copy_from_slice(b"plain64");
        buf[72..72 + 6].copy_from_slice(b"sha256");
        buf[104..108].copy_from_slice(&4096u32.to_be_bytes());
        buf[108..112].copy_from_slice(&64u32.to_be_bytes());
        buf[168..172].copy_from_slice(&100000u32.to_be_bytes());
        buf[172..172 + 36].copy_from_slice(b"11111111-2222-3333-4444-555555555555");
        let slot0_off = 208;
        buf[slot0_off..slot0_off + 4].copy_from_slice(&SLOT_ENABLED.to_be_bytes());
        buf[slot0_off + 4..slot0_off + 8].copy_from_slice(&50000u32.to_be_bytes());
        buf[slot0_off + 48..slot0_off + 52].copy_from_slice(&SLOT_DISABLED.to_be_bytes());
        buf
    }

    #[test]
    fn parses_magic_and_strings() {
        let bytes = sample_header_bytes();
        let header = LuksHeader::parse(&bytes).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.hash_spec, "sha256");
        assert_eq!(header.payload_offset, 4096);
        assert_eq!(header.key_bytes, 64);
        assert_eq!(header.mk_digest_iter, 100000);
        assert!(header.uuid.starts_with("11111111"));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_header_bytes();
        bytes[0] = b'X';
        assert_eq!(LuksHeader::parse(&bytes).unwrap_err(), HeaderError::BadMagic);
    }

    #[test]
    fn reports_enabled_and_disabled_slots() {
        let bytes = sample_header_bytes();
        let header = LuksHeader::parse(&bytes).unwrap();
        assert!(header.slots[0].enabled);
        assert!(!header.slots[1].enabled);
        assert_eq!(header.enabled_slots().count(), 1);
    }

    #[test]
    fn rejects_truncated_buffer() {
        assert_eq!(LuksHeader::parse(&[0u8; 16]).unwrap_err(), HeaderError::Truncated);
    }
}
