//! The TPM sealing-policy interface (spec.md §4.M1) and the measurement
//! pipeline built on top of it (§4.M2). Grounded on
//! `original_source/lsvmload/measure.{c,h}`'s `HashLogExtend*`/`MeasureHash`
//! functions and PCR assignment constants; the PCR vocabulary itself
//! follows `microsoft-trident/sysdefs/src/tpm2.rs`'s `Pcr` numbering.

use alloc::vec::Vec;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::KeyInit;
use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::TpmError;
use crate::event::{self, TcgPcrEvent};
use crate::peimage;

pub const PCR_COUNT: u32 = 24;

/// PCR assignments `measure.h` fixes for this boot scenario: shim, GRUB,
/// the anti-rollback cap, and the three scenario tags all extend PCR 11.
pub const SHIM_PCR: u32 = 11;
pub const GRUB_PCR: u32 = 11;
pub const CAPPING_PCR: u32 = 11;
pub const SCENARIO_PCR: u32 = 11;

const CAP_VALUE: &[u8] = b"lsvmload-pcr-cap";

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// An acquired Storage Root Key handle. `must_flush` mirrors
/// `measure.c`'s note that a freshly-created SRK (the well-known handle
/// was absent) must be flushed at the end of the session, while a
/// pre-existing one is left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrkHandle {
    pub handle: u32,
    pub must_flush: bool,
}

/// The well-known persistent SRK handle a real TPM2 implementation would
/// probe first (TCG-reserved range, matches the owner hierarchy's
/// persistent SRK convention).
pub const WELL_KNOWN_SRK_HANDLE: u32 = 0x8100_0001;

/// The sealing-policy interface spec.md §4.M1 exposes. A hardware
/// implementation would marshal these through `tss-esapi`'s `Context`; this
/// trait only fixes the shape that marshalling has to honor.
pub trait Tpm {
    fn read_pcr_sha256(&self, idx: u32) -> Result<[u8; 32], TpmError>;
    fn extend_pcr_sha1(&mut self, idx: u32, hash: &[u8; 20]) -> Result<(), TpmError>;
    fn extend_pcr_sha256(&mut self, idx: u32, hash: &[u8; 32]) -> Result<(), TpmError>;

    fn hash_log_extend_pe(
        &mut self,
        idx: u32,
        data: &[u8],
        description: &str,
    ) -> Result<([u8; 20], [u8; 32]), TpmError>;
    fn hash_log_extend_data(&mut self, idx: u32, data: &[u8]) -> Result<(), TpmError>;
    fn hash_log_extend_separator(&mut self, idx: u32) -> Result<(), TpmError>;

    fn seal(&mut self, policy_pcr_mask: u32, bytes: &[u8]) -> Result<Vec<u8>, TpmError>;
    fn unseal(&mut self, policy_pcr_mask: u32, srk_handle: u32, blob: &[u8]) -> Result<Vec<u8>, TpmError>;

    fn cap_pcr(&mut self, idx: u32) -> Result<(), TpmError>;
    fn srk_handle(&mut self) -> Result<SrkHandle, TpmError>;

    /// Clears the dictionary-attack lockout counter. `measure.c` runs this
    /// (and [`Tpm::set_lockout_params`]) before any PCR extend, so a TPM
    /// left locked out by a prior failed boot doesn't silently fail every
    /// `seal`/`unseal` for the rest of the session.
    fn dictionary_attack_lock_reset(&mut self) -> Result<(), TpmError>;

    /// Reprograms the lockout policy (max failed auths, recovery time,
    /// lockout recovery time) to this loader's fixed values.
    fn set_lockout_params(&mut self, max_tries: u32, recovery_time: u32, lockout_recovery: u32) -> Result<(), TpmError>;
}

fn check_pcr(idx: u32) -> Result<(), TpmError> {
    if idx < PCR_COUNT {
        Ok(())
    } else {
        Err(TpmError::BadPcrIndex)
    }
}

/// An entirely in-memory `Tpm` implementation: 24 PCRs of SHA-256 state,
/// extended as `sha256(old || new)` per SPEC_FULL.md's own description of
/// this test double. Used by the measurement pipeline's tests and by
/// `lsvmload`'s integration tests in place of real hardware.
pub struct SoftwareTpm {
    pcrs: [[u8; 32]; 24],
    srk_present: bool,
    log: Vec<TcgPcrEvent>,
    lockout_params: Option<(u32, u32, u32)>,
}

impl Default for SoftwareTpm {
    fn default() -> Self {
        Self {
            pcrs: [[0u8; 32]; 24],
            srk_present: false,
            log: Vec::new(),
            lockout_params: None,
        }
    }
}

impl SoftwareTpm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_log(&self) -> &[TcgPcrEvent] {
        &self.log
    }

    pub fn lockout_params(&self) -> Option<(u32, u32, u32)> {
        self.lockout_params
    }

    /// Extends PCR `idx` with `sha256(old || digest)`, mirroring `measure.c`'s
    /// pairing of every event with both a SHA-1 and a SHA-256 extend (only
    /// the SHA-256 half is retained as PCR state here; the SHA-1 half feeds
    /// the event log digest field, as spec.md §6 requires for the legacy
    /// `TCG_PCR_EVENT` format).
    fn extend(&mut self, idx: u32, digest: &[u8; 32]) -> Result<(), TpmError> {
        check_pcr(idx)?;
        let mut hasher = Sha256::new();
        hasher.update(self.pcrs[idx as usize]);
        hasher.update(digest);
        self.pcrs[idx as usize].copy_from_slice(&hasher.finalize());
        Ok(())
    }

    fn policy_digest(&self, policy_pcr_mask: u32) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for idx in 0..PCR_COUNT {
            if policy_pcr_mask & (1 << idx) != 0 {
                hasher.update(idx.to_le_bytes());
                hasher.update(self.pcrs[idx as usize]);
            }
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    fn seal_key(policy_digest: &[u8; 32]) -> Aes256 {
        Aes256::new(GenericArray::from_slice(policy_digest))
    }
}

impl Tpm for SoftwareTpm {
    fn read_pcr_sha256(&self, idx: u32) -> Result<[u8; 32], TpmError> {
        check_pcr(idx)?;
        Ok(self.pcrs[idx as usize])
    }

    fn extend_pcr_sha1(&mut self, idx: u32, hash: &[u8; 20]) -> Result<(), TpmError> {
        check_pcr(idx)?;
        let mut padded = [0u8; 32];
        padded[..20].copy_from_slice(hash);
        self.extend(idx, &padded)
    }

    fn extend_pcr_sha256(&mut self, idx: u32, hash: &[u8; 32]) -> Result<(), TpmError> {
        self.extend(idx, hash)
    }

    fn hash_log_extend_pe(
        &mut self,
        idx: u32,
        data: &[u8],
        description: &str,
    ) -> Result<([u8; 20], [u8; 32]), TpmError> {
        check_pcr(idx)?;
        let (sha1, sha256) = peimage::authenticode_hash(data)?;
        self.extend(idx, &sha256)?;
        self.log.push(event::ipl_event(idx, sha1, description));
        Ok((sha1, sha256))
    }

    fn hash_log_extend_data(&mut self, idx: u32, data: &[u8]) -> Result<(), TpmError> {
        check_pcr(idx)?;
        let sha1: [u8; 20] = Sha1::digest(data).into();
        let sha256: [u8; 32] = Sha256::digest(data).into();
        self.extend(idx, &sha256)?;
        self.log.push(event::compact_hash_event(idx, sha1, "Capping measurement"));
        Ok(())
    }

    fn hash_log_extend_separator(&mut self, idx: u32) -> Result<(), TpmError> {
        check_pcr(idx)?;
        let separator = 0u32.to_le_bytes();
        let sha1: [u8; 20] = Sha1::digest(separator).into();
        let sha256: [u8; 32] = Sha256::digest(separator).into();
        self.extend(idx, &sha256)?;
        self.log.push(event::separator_event(idx, sha1));
        Ok(())
    }

    fn seal(&mut self, policy_pcr_mask: u32, bytes: &[u8]) -> Result<Vec<u8>, TpmError> {
        let policy = self.policy_digest(policy_pcr_mask);
        let key = Self::seal_key(&policy);

        let block_size = 16;
        let plain_len = bytes.len();
        let mut buf = Vec::with_capacity((plain_len / block_size + 1) * block_size);
        buf.extend_from_slice(bytes);
        buf.resize((plain_len / block_size + 1) * block_size, 0);

        Aes256CbcEnc::new(&key.into(), &[0u8; 16].into())
            .encrypt_padded_mut::<Pkcs7>(&mut buf, plain_len)
            .map_err(|_| TpmError::BadBlob)?;

        let mut blob = Vec::with_capacity(4 + buf.len());
        blob.extend_from_slice(&policy_pcr_mask.to_le_bytes());
        blob.extend_from_slice(&buf);
        Ok(blob)
    }

    fn unseal(&mut self, policy_pcr_mask: u32, srk_handle: u32, blob: &[u8]) -> Result<Vec<u8>, TpmError> {
        if srk_handle == 0 {
            return Err(TpmError::NoSrk);
        }
        if blob.len() < 4 {
            return Err(TpmError::BadBlob);
        }
        let stored_mask = u32::from_le_bytes(blob[0..4].try_into().unwrap());
        if stored_mask != policy_pcr_mask {
            return Err(TpmError::PolicyMismatch);
        }

        let policy = self.policy_digest(policy_pcr_mask);
        let key = Self::seal_key(&policy);
        let mut buf = blob[4..].to_vec();
        let result = Aes256CbcDec::new(&key.into(), &[0u8; 16].into())
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map(|plain| plain.to_vec())
            .map_err(|_| TpmError::PolicyNotSatisfied);

        if result.is_err() {
            log::warn!("unseal rejected: PCR policy mask {policy_pcr_mask:#x} is not satisfied by current PCR state");
        } else {
            log::debug!("unseal succeeded under PCR policy mask {policy_pcr_mask:#x}");
        }
        result
    }

    fn cap_pcr(&mut self, idx: u32) -> Result<(), TpmError> {
        log::trace!("capping PCR {idx}");
        let sha256: [u8; 32] = Sha256::digest(CAP_VALUE).into();
        self.extend(idx, &sha256)
    }

    fn srk_handle(&mut self) -> Result<SrkHandle, TpmError> {
        if self.srk_present {
            Ok(SrkHandle { handle: WELL_KNOWN_SRK_HANDLE, must_flush: false })
        } else {
            log::debug!("well-known SRK handle absent, creating a new SRK that must be flushed later");
            self.srk_present = true;
            Ok(SrkHandle { handle: WELL_KNOWN_SRK_HANDLE, must_flush: true })
        }
    }

    fn dictionary_attack_lock_reset(&mut self) -> Result<(), TpmError> {
        log::debug!("dictionary attack lockout counter reset");
        Ok(())
    }

    fn set_lockout_params(&mut self, max_tries: u32, recovery_time: u32, lockout_recovery: u32) -> Result<(), TpmError> {
        log::debug!("lockout params set: max_tries={max_tries} recovery_time={recovery_time} lockout_recovery={lockout_recovery}");
        self.lockout_params = Some((max_tries, recovery_time, lockout_recovery));
        Ok(())
    }
}
