use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;

use lsvmload_block::{Bdev, BdevExt};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::cipher::SectorCipher;
use crate::error::LuksError;
use crate::header::{LuksHeader, LUKS_SECTOR_SIZE};

/// The hash algorithm named by a LUKS header's `hash_spec` (and, for
/// `cbc-essiv:`, by the cipher mode suffix). Spec.md §3 supports exactly
/// these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlg {
    pub fn from_name(name: &str) -> Result<Self, LuksError> {
        match name {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(LuksError::UnsupportedHash(other.to_string())),
        }
    }

    pub fn digest_size(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    pub fn pbkdf2(self, password: &[u8], salt: &[u8], iters: u32, out: &mut [u8]) {
        match self {
            Self::Sha1 => pbkdf2::pbkdf2_hmac::<Sha1>(password, salt, iters, out),
            Self::Sha256 => pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iters, out),
            Self::Sha384 => pbkdf2::pbkdf2_hmac::<Sha384>(password, salt, iters, out),
            Self::Sha512 => pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, iters, out),
        }
    }
}

/// AF-diffuser: replaces each `digest_size`-byte chunk `c_j` of `k` with
/// `H(be_u32(j) || c_j)` truncated back to the chunk's length.
fn diffuse(k: &[u8], hash: HashAlg) -> Vec<u8> {
    let digest_size = hash.digest_size();
    let mut out = Vec::with_capacity(k.len());
    for (j, chunk) in k.chunks(digest_size).enumerate() {
        let mut input = Vec::with_capacity(4 + chunk.len());
        input.extend_from_slice(&(j as u32).to_be_bytes());
        input.extend_from_slice(chunk);
        let h = hash.digest(&input);
        out.extend_from_slice(&h[..chunk.len()]);
    }
    out
}

/// AF-merge over `stripes` (`mk_len * stripe_count` bytes): XOR each stripe
/// into a running `mk_len`-byte accumulator, diffusing the accumulator
/// between stripes (spec.md §4.L3).
pub fn af_merge(stripes: &[u8], mk_len: usize, hash: HashAlg) -> Vec<u8> {
    let stripe_count = stripes.len() / mk_len;
    let mut k = vec![0u8; mk_len];
    for i in 0..stripe_count {
        let stripe = &stripes[i * mk_len..(i + 1) * mk_len];
        for (kb, sb) in k.iter_mut().zip(stripe) {
            *kb ^= sb;
        }
        if i + 1 < stripe_count {
            k = diffuse(&k, hash);
        }
    }
    k
}

/// Recovers the LUKS master key for `header` from `passphrase`, trying
/// every enabled key slot in order (spec.md §4.L3). `dev` is the raw,
/// unencrypted block device the header was read from.
pub fn recover_master_key<D: Bdev>(
    dev: &mut D,
    header: &LuksHeader,
    passphrase: &[u8],
) -> Result<Vec<u8>, LuksError> {
    let hash = HashAlg::from_name(&header.hash_spec)?;
    let key_len = header.key_bytes as usize;

    for (idx, slot) in header.enabled_slots() {
        log::trace!("trying LUKS key slot {idx}");
        let mut derived = vec![0u8; key_len];
        hash.pbkdf2(passphrase, &slot.password_salt, slot.password_iters, &mut derived);

        let stripe_count = slot.af_stripes as usize;
        let material_len = key_len * stripe_count;
        let material_offset_bytes = slot.key_material_offset as u64 * LUKS_SECTOR_SIZE as u64;

        let mut material = vec![0u8; material_len];
        dev.read_bytes(material_offset_bytes, &mut material)?;

        let cipher = SectorCipher::new(&header.cipher_name, &header.cipher_mode, &derived)?;
        let first_sector = slot.key_material_offset as u64;
        for (i, chunk) in material.chunks_mut(LUKS_SECTOR_SIZE).enumerate() {
            let block: &mut [u8; LUKS_SECTOR_SIZE] = chunk.try_into().expect("chunk is sector-sized");
            cipher.decrypt_sector(first_sector + i as u64, block);
        }

        let candidate = af_merge(&material, key_len, hash);

        let mut digest = vec![0u8; header.mk_digest.len()];
        hash.pbkdf2(&candidate, &header.mk_digest_salt, header.mk_digest_iter, &mut digest);
        if digest == header.mk_digest {
            log::debug!("LUKS key slot {idx} accepted the passphrase");
            return Ok(candidate);
        }
    }

    log::warn!("no LUKS key slot accepted the supplied passphrase");
    Err(LuksError::BadPassphrase)
}

/// Checks a candidate master key against `header.mk_digest` directly,
/// without scanning any key slot — the check `recover_master_key` runs
/// internally, exposed for callers that already obtained a candidate key
/// some other way (spec.md §4.O1 `S3`'s TPM-unsealed path).
pub fn verify_master_key(header: &LuksHeader, candidate: &[u8]) -> Result<bool, LuksError> {
    let hash = HashAlg::from_name(&header.hash_spec)?;
    let mut digest = vec![0u8; header.mk_digest.len()];
    hash.pbkdf2(candidate, &header.mk_digest_salt, header.mk_digest_iter, &mut digest);
    Ok(digest == header.mk_digest)
}
