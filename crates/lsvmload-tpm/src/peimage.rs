//! Authenticode-style PE/COFF image hashing: the digest `hash_log_extend_pe`
//! measures is over the image with its checksum field, certificate-table
//! directory entry, and attached certificate table all excluded, per the
//! published Windows Authenticode signature format. Image *relocation* is
//! explicitly out of scope (spec.md §1); only this hash is needed here.

use alloc::vec::Vec;

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::TpmError;

const DOS_LFANEW_OFFSET: usize = 0x3C;
const COFF_HEADER_LEN: usize = 20;
const PE32_MAGIC: u16 = 0x10b;
const PE32_PLUS_MAGIC: u16 = 0x20b;
const CHECKSUM_OFFSET_IN_OPT_HEADER: usize = 64;
const CERT_DIR_OFFSET_PE32: usize = 128;
const CERT_DIR_OFFSET_PE32_PLUS: usize = 144;

fn u16_at(data: &[u8], offset: usize) -> Result<u16, TpmError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(TpmError::BadPeImage)
}

fn u32_at(data: &[u8], offset: usize) -> Result<u32, TpmError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(TpmError::BadPeImage)
}

struct HashableRanges {
    checksum_offset: usize,
    cert_dir_offset: usize,
}

fn locate_ranges(data: &[u8]) -> Result<HashableRanges, TpmError> {
    if data.len() < DOS_LFANEW_OFFSET + 4 {
        return Err(TpmError::BadPeImage);
    }
    let lfanew = u32_at(data, DOS_LFANEW_OFFSET)? as usize;
    if data.get(lfanew..lfanew + 4) != Some(b"PE\0\0".as_slice()) {
        return Err(TpmError::BadPeImage);
    }

    let opt_start = lfanew + 4 + COFF_HEADER_LEN;
    let magic = u16_at(data, opt_start)?;
    let cert_dir_offset = match magic {
        PE32_MAGIC => opt_start + CERT_DIR_OFFSET_PE32,
        PE32_PLUS_MAGIC => opt_start + CERT_DIR_OFFSET_PE32_PLUS,
        _ => return Err(TpmError::BadPeImage),
    };

    Ok(HashableRanges {
        checksum_offset: opt_start + CHECKSUM_OFFSET_IN_OPT_HEADER,
        cert_dir_offset,
    })
}

/// Computes the SHA-1 and SHA-256 Authenticode digests of `data`.
pub fn authenticode_hash(data: &[u8]) -> Result<([u8; 20], [u8; 32]), TpmError> {
    let ranges = locate_ranges(data)?;
    if data.len() < ranges.cert_dir_offset + 8 {
        return Err(TpmError::BadPeImage);
    }

    let cert_rva = u32_at(data, ranges.cert_dir_offset)? as usize;
    let cert_size = u32_at(data, ranges.cert_dir_offset + 4)?;
    let hash_end = if cert_size > 0 { cert_rva } else { data.len() };
    if hash_end > data.len() {
        return Err(TpmError::BadPeImage);
    }

    let segments: [&[u8]; 3] = [
        &data[..ranges.checksum_offset],
        &data[ranges.checksum_offset + 4..ranges.cert_dir_offset],
        &data[ranges.cert_dir_offset + 8..hash_end],
    ];

    let mut sha1 = Sha1::new();
    let mut sha256 = Sha256::new();
    for segment in segments {
        sha1.update(segment);
        sha256.update(segment);
    }

    let mut sha1_out = [0u8; 20];
    sha1_out.copy_from_slice(&sha1.finalize());
    let mut sha256_out = [0u8; 32];
    sha256_out.copy_from_slice(&sha256.finalize());
    Ok((sha1_out, sha256_out))
}

/// Builds a minimal, well-formed PE32 image for tests: DOS stub, COFF
/// header, optional header with a zeroed checksum and no certificate
/// table, and a trailer of arbitrary "code" bytes.
#[cfg(test)]
pub fn synthetic_pe32(code: &[u8]) -> Vec<u8> {
    let mut out = alloc::vec![0u8; 0x40];
    out[0] = b'M';
    out[1] = b'Z';
    let lfanew = 0x40u32;
    out[DOS_LFANEW_OFFSET..DOS_LFANEW_OFFSET + 4].copy_from_slice(&lfanew.to_le_bytes());

    out.extend_from_slice(b"PE\0\0");
    out.extend_from_slice(&[0u8; COFF_HEADER_LEN]);

    let opt_start = out.len();
    let mut opt = alloc::vec![0u8; CERT_DIR_OFFSET_PE32 + 8];
    opt[0..2].copy_from_slice(&PE32_MAGIC.to_le_bytes());
    // checksum field left zero; certificate directory entry left zero (no cert table)
    out.extend_from_slice(&opt);
    debug_assert_eq!(out.len(), opt_start + opt.len());

    out.extend_from_slice(code);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_a_synthetic_pe32_image() {
        let image = synthetic_pe32(b"hello world");
        let (sha1, sha256) = authenticode_hash(&image).unwrap();
        assert_ne!(sha1, [0u8; 20]);
        assert_ne!(sha256, [0u8; 32]);
    }

    #[test]
    fn checksum_field_does_not_affect_the_digest() {
        let mut a = synthetic_pe32(b"payload");
        let mut b = a.clone();
        let checksum_offset = 0x40 + 4 + COFF_HEADER_LEN + CHECKSUM_OFFSET_IN_OPT_HEADER;
        b[checksum_offset..checksum_offset + 4].copy_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_ne!(a, b);

        let (sha1_a, sha256_a) = authenticode_hash(&a).unwrap();
        let (sha1_b, sha256_b) = authenticode_hash(&b).unwrap();
        assert_eq!(sha1_a, sha1_b);
        assert_eq!(sha256_a, sha256_b);

        a[checksum_offset] = 0xFF;
        let (sha1_c, _) = authenticode_hash(&a).unwrap();
        assert_eq!(sha1_c, sha1_a);
    }

    #[test]
    fn code_bytes_change_the_digest() {
        let a = synthetic_pe32(b"version-1");
        let b = synthetic_pe32(b"version-2");
        let (_, sha256_a) = authenticode_hash(&a).unwrap();
        let (_, sha256_b) = authenticode_hash(&b).unwrap();
        assert_ne!(sha256_a, sha256_b);
    }

    #[test]
    fn rejects_missing_pe_signature() {
        let image = alloc::vec![0u8; 128];
        assert_eq!(authenticode_hash(&image), Err(TpmError::BadPeImage));
    }
}
