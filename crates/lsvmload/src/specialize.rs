//! The specialization applier (spec.md §4.O2): decrypts an encrypted
//! blob using the boot volume's LUKS master key and drops the plaintext
//! onto the boot volume. Grounded on
//! `original_source/lsvmtool/specialize.c`'s header layout — this crate
//! only ports the *applier* half (decrypt + drop); the authoring side
//! (`specialize.c`'s encrypt path) is a host-side tool outside this
//! pre-boot core's scope (spec.md's Non-goals).

use aes::cipher::generic_array::GenericArray;
use aes::cipher::KeyIvInit;
use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::OrchestratorError;

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

const HEADER_LEN: usize = 32;
const MODE_AES_CBC: u32 = 1;
const MODE_AES_CBC_SHA256: u32 = 2;

pub const SPECIALIZE_PATH: &str = "/lsvmload/specialize";
pub const SPECIALIZE_MODE: u16 = 0o600;

#[derive(Debug, Clone, Copy)]
struct Header {
    length: u32,
    version: u32,
    mode: u32,
    iv_off: u32,
    iv_len: u32,
    hmac_off: u32,
    hmac_len: u32,
    cipher_off: u32,
    cipher_len: u32,
}

fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

impl Header {
    fn parse(bytes: &[u8]) -> Result<Self, OrchestratorError> {
        if bytes.len() < HEADER_LEN {
            return Err(OrchestratorError::SpecializationFormat("blob shorter than the 32-byte header"));
        }
        Ok(Self {
            length: le_u32(bytes, 0),
            version: le_u32(bytes, 4),
            mode: le_u32(bytes, 8),
            iv_off: le_u32(bytes, 12),
            iv_len: le_u32(bytes, 16),
            hmac_off: le_u32(bytes, 20),
            hmac_len: le_u32(bytes, 24),
            cipher_off: le_u32(bytes, 28),
            cipher_len: 0, // filled in by `validate` once `length` is known
        })
    }

    fn field_in_bounds(&self, off: u32, len: u32, total_len: u32) -> bool {
        off >= HEADER_LEN as u32 && (off as u64 + len as u64) <= total_len as u64
    }

    fn validate(mut self, blob_len: usize) -> Result<Self, OrchestratorError> {
        if self.version != 1 {
            return Err(OrchestratorError::SpecializationFormat("unsupported version"));
        }
        if self.mode != MODE_AES_CBC && self.mode != MODE_AES_CBC_SHA256 {
            return Err(OrchestratorError::SpecializationFormat("unsupported mode"));
        }
        let total = self.length.min(blob_len as u32);
        self.cipher_len = total.saturating_sub(self.cipher_off);

        if !self.field_in_bounds(self.iv_off, self.iv_len, total) {
            return Err(OrchestratorError::SpecializationFormat("iv field out of bounds"));
        }
        if self.mode == MODE_AES_CBC_SHA256 && !self.field_in_bounds(self.hmac_off, self.hmac_len, total) {
            return Err(OrchestratorError::SpecializationFormat("hmac field out of bounds"));
        }
        if !self.field_in_bounds(self.cipher_off, self.cipher_len, total) {
            return Err(OrchestratorError::SpecializationFormat("cipher field out of bounds"));
        }
        Ok(self)
    }
}

/// Decrypts `blob` (the full on-disk specialization file) using
/// `boot_master_key` as the AES-256 key, returning the plaintext destined
/// for [`SPECIALIZE_PATH`].
pub fn decrypt_specialization(blob: &[u8], boot_master_key: &[u8]) -> Result<Vec<u8>, OrchestratorError> {
    let header = Header::parse(blob)?.validate(blob.len())?;

    let iv_bytes = &blob[header.iv_off as usize..(header.iv_off + header.iv_len) as usize];
    let ciphertext = &blob[header.cipher_off as usize..(header.cipher_off + header.cipher_len) as usize];

    if header.mode == MODE_AES_CBC_SHA256 {
        let hmac_bytes = &blob[header.hmac_off as usize..(header.hmac_off + header.hmac_len) as usize];
        let mut mac = HmacSha256::new_from_slice(boot_master_key)
            .map_err(|_| OrchestratorError::SpecializationFormat("hmac key has invalid length"))?;
        mac.update(ciphertext);
        mac.verify_slice(hmac_bytes)
            .map_err(|_| OrchestratorError::SpecializationAuthFailed)?;
    }

    let mut key = [0u8; 32];
    let n = boot_master_key.len().min(32);
    key[..n].copy_from_slice(&boot_master_key[..n]);
    let mut iv = [0u8; 16];
    let iv_n = iv_bytes.len().min(16);
    iv[..iv_n].copy_from_slice(&iv_bytes[..iv_n]);

    let mut buf = ciphertext.to_vec();
    let plaintext = Aes256CbcDec::new(GenericArray::from_slice(&key), GenericArray::from_slice(&iv))
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| OrchestratorError::SpecializationFormat("bad padding after decryption"))?;

    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::KeyIvInit as _;
    use cbc::cipher::BlockEncryptMut;

    type Aes256CbcEnc = cbc::Encryptor<Aes256>;

    fn build_blob(mode: u32, key: &[u8; 32], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
        let mut ciphertext = plaintext.to_vec();
        ciphertext.resize(plaintext.len() + 16, 0);
        let ct_len = Aes256CbcEnc::new(GenericArray::from_slice(key), GenericArray::from_slice(iv))
            .encrypt_padded_mut::<Pkcs7>(&mut ciphertext, plaintext.len())
            .unwrap()
            .len();
        ciphertext.truncate(ct_len);

        let iv_off = HEADER_LEN as u32;
        let iv_len = 16u32;
        let hmac_off = iv_off + iv_len;
        let mut hmac_len = 0u32;
        let mut hmac_tag = Vec::new();
        let cipher_off;

        if mode == MODE_AES_CBC_SHA256 {
            let mut mac = HmacSha256::new_from_slice(key).unwrap();
            mac.update(&ciphertext);
            hmac_tag = mac.finalize().into_bytes().to_vec();
            hmac_len = hmac_tag.len() as u32;
            cipher_off = hmac_off + hmac_len;
        } else {
            cipher_off = hmac_off;
        }

        let total_len = cipher_off + ciphertext.len() as u32;

        let mut blob = vec![0u8; total_len as usize];
        blob[0..4].copy_from_slice(&total_len.to_le_bytes());
        blob[4..8].copy_from_slice(&1u32.to_le_bytes());
        blob[8..12].copy_from_slice(&mode.to_le_bytes());
        blob[12..16].copy_from_slice(&iv_off.to_le_bytes());
        blob[16..20].copy_from_slice(&iv_len.to_le_bytes());
        blob[20..24].copy_from_slice(&hmac_off.to_le_bytes());
        blob[24..28].copy_from_slice(&hmac_len.to_le_bytes());
        blob[28..32].copy_from_slice(&cipher_off.to_le_bytes());

        blob[iv_off as usize..(iv_off + iv_len) as usize].copy_from_slice(iv);
        if hmac_len > 0 {
            blob[hmac_off as usize..(hmac_off + hmac_len) as usize].copy_from_slice(&hmac_tag);
        }
        blob[cipher_off as usize..].copy_from_slice(&ciphertext);
        blob
    }

    #[test]
    fn decrypts_aes_cbc_mode() {
        let key = [0x11u8; 32];
        let iv = [0x22u8; 16];
        let blob = build_blob(MODE_AES_CBC, &key, &iv, b"hello specialization");
        let plaintext = decrypt_specialization(&blob, &key).unwrap();
        assert_eq!(plaintext, b"hello specialization");
    }

    #[test]
    fn decrypts_and_verifies_aes_cbc_sha256_mode() {
        let key = [0x33u8; 32];
        let iv = [0x44u8; 16];
        let blob = build_blob(MODE_AES_CBC_SHA256, &key, &iv, b"authenticated payload");
        let plaintext = decrypt_specialization(&blob, &key).unwrap();
        assert_eq!(plaintext, b"authenticated payload");
    }

    #[test]
    fn rejects_tampered_hmac() {
        let key = [0x55u8; 32];
        let iv = [0x66u8; 16];
        let mut blob = build_blob(MODE_AES_CBC_SHA256, &key, &iv, b"payload");
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert!(matches!(decrypt_specialization(&blob, &key), Err(OrchestratorError::SpecializationAuthFailed)));
    }

    #[test]
    fn rejects_unsupported_version() {
        let key = [0x77u8; 32];
        let iv = [0x88u8; 16];
        let mut blob = build_blob(MODE_AES_CBC, &key, &iv, b"x");
        blob[4..8].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(decrypt_specialization(&blob, &key), Err(OrchestratorError::SpecializationFormat(_))));
    }

    #[test]
    fn rejects_out_of_bounds_field() {
        let key = [0x99u8; 32];
        let iv = [0xAAu8; 16];
        let mut blob = build_blob(MODE_AES_CBC, &key, &iv, b"x");
        blob[12..16].copy_from_slice(&4u32.to_le_bytes()); // iv_off inside the header
        assert!(matches!(decrypt_specialization(&blob, &key), Err(OrchestratorError::SpecializationFormat(_))));
    }
}
