use alloc::string::ToString;
use alloc::vec::Vec;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};
use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use xts_mode::{get_tweak_default, Xts128};

use crate::error::LuksError;
use crate::header::LUKS_SECTOR_SIZE;
use crate::masterkey::HashAlg;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// The cipher-mode half of a LUKS `cipher_mode` field (spec.md §4.L3).
#[derive(Clone)]
enum Mode {
    XtsPlain64,
    CbcPlain,
    CbcEssiv(HashAlg),
    Ecb,
}

fn parse_mode(mode: &str) -> Result<Mode, LuksError> {
    if mode == "xts-plain64" {
        Ok(Mode::XtsPlain64)
    } else if mode == "cbc-plain" {
        Ok(Mode::CbcPlain)
    } else if let Some(hash_name) = mode.strip_prefix("cbc-essiv:") {
        Ok(Mode::CbcEssiv(HashAlg::from_name(hash_name)?))
    } else if mode == "ecb" {
        Ok(Mode::Ecb)
    } else {
        Err(LuksError::UnsupportedCipher(mode.to_string()))
    }
}

/// A single AES key of either width, dispatched at construction time since
/// `Aes128`/`Aes256` are distinct types.
enum AesKey {
    Aes128(Aes128),
    Aes256(Aes256),
}

impl AesKey {
    fn new(key: &[u8]) -> Result<Self, LuksError> {
        match key.len() {
            16 => Ok(Self::Aes128(Aes128::new(GenericArray::from_slice(key)))),
            32 => Ok(Self::Aes256(Aes256::new(GenericArray::from_slice(key)))),
            n => Err(LuksError::UnsupportedCipher(alloc::format!("aes-{}", n * 8))),
        }
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        let arr = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(c) => c.encrypt_block(arr),
            Self::Aes256(c) => c.encrypt_block(arr),
        }
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        let arr = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(c) => c.decrypt_block(arr),
            Self::Aes256(c) => c.decrypt_block(arr),
        }
    }
}

/// Either width of [`Xts128`], built once per [`SectorCipher`].
enum XtsKey {
    Aes128(Xts128<Aes128>),
    Aes256(Xts128<Aes256>),
}

impl XtsKey {
    fn new(key: &[u8]) -> Result<Self, LuksError> {
        if key.len() % 2 != 0 {
            return Err(LuksError::UnsupportedCipher("xts key must split evenly".to_string()));
        }
        let half = key.len() / 2;
        let (k1, k2) = key.split_at(half);
        match half {
            16 => Ok(Self::Aes128(Xts128::new(
                Aes128::new(GenericArray::from_slice(k1)),
                Aes128::new(GenericArray::from_slice(k2)),
            ))),
            32 => Ok(Self::Aes256(Xts128::new(
                Aes256::new(GenericArray::from_slice(k1)),
                Aes256::new(GenericArray::from_slice(k2)),
            ))),
            n => Err(LuksError::UnsupportedCipher(alloc::format!("xts half-key of {} bytes", n))),
        }
    }

    fn encrypt_sector(&self, sector: &mut [u8], sector_index: u64) {
        let tweak = get_tweak_default(sector_index as u128);
        match self {
            Self::Aes128(xts) => xts.encrypt_sector(sector, tweak),
            Self::Aes256(xts) => xts.encrypt_sector(sector, tweak),
        }
    }

    fn decrypt_sector(&self, sector: &mut [u8], sector_index: u64) {
        let tweak = get_tweak_default(sector_index as u128);
        match self {
            Self::Aes128(xts) => xts.decrypt_sector(sector, tweak),
            Self::Aes256(xts) => xts.decrypt_sector(sector, tweak),
        }
    }
}

fn cbc_plain_iv(sector_index: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..4].copy_from_slice(&(sector_index as u32).to_le_bytes());
    iv
}

fn essiv_iv(essiv_key: &AesKey, sector_index: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&sector_index.to_le_bytes());
    essiv_key.encrypt_block(&mut iv);
    iv
}

fn cbc_crypt(key: &[u8], iv: [u8; 16], buf: &mut [u8], encrypt: bool) -> Result<(), LuksError> {
    let bad = |_| LuksError::UnsupportedCipher("cbc block alignment".to_string());
    match (key.len(), encrypt) {
        (16, true) => {
            Aes128CbcEnc::new(GenericArray::from_slice(key), &iv.into())
                .encrypt_padded_mut::<NoPadding>(buf, buf.len())
                .map_err(bad)?;
        }
        (16, false) => {
            Aes128CbcDec::new(GenericArray::from_slice(key), &iv.into())
                .decrypt_padded_mut::<NoPadding>(buf)
                .map_err(bad)?;
        }
        (32, true) => {
            Aes256CbcEnc::new(GenericArray::from_slice(key), &iv.into())
                .encrypt_padded_mut::<NoPadding>(buf, buf.len())
                .map_err(bad)?;
        }
        (32, false) => {
            Aes256CbcDec::new(GenericArray::from_slice(key), &iv.into())
                .decrypt_padded_mut::<NoPadding>(buf)
                .map_err(bad)?;
        }
        (n, _) => return Err(LuksError::UnsupportedCipher(alloc::format!("aes-{}", n * 8))),
    }
    Ok(())
}

/// Encrypts or decrypts individual 512-byte sectors of a LUKS payload
/// (spec.md §4.L3). Built once per opened volume and reused for every
/// `get`/`put` through a [`crate::bdev::LuksBdev`].
pub struct SectorCipher {
    mode: Mode,
    key: Vec<u8>,
    xts: Option<XtsKey>,
    essiv_key: Option<AesKey>,
}

impl SectorCipher {
    pub fn new(cipher_name: &str, cipher_mode: &str, key: &[u8]) -> Result<Self, LuksError> {
        if cipher_name != "aes" {
            return Err(LuksError::UnsupportedCipher(cipher_name.to_string()));
        }
        let mode = parse_mode(cipher_mode)?;

        let xts = matches!(mode, Mode::XtsPlain64)
            .then(|| XtsKey::new(key))
            .transpose()?;

        let essiv_key = if let Mode::CbcEssiv(hash) = mode {
            let digest = hash.digest(key);
            Some(AesKey::new(&digest)?)
        } else {
            None
        };

        // `AesKey::new`/`ecb_crypt` assume a validated key width; check it
        // once here so a bad key surfaces as an error, not a panic during
        // sector I/O.
        if matches!(mode, Mode::CbcPlain | Mode::CbcEssiv(_) | Mode::Ecb) {
            AesKey::new(key)?;
        }

        Ok(Self {
            mode,
            key: key.to_vec(),
            xts,
            essiv_key,
        })
    }

    pub fn encrypt_sector(&self, sector_index: u64, sector: &mut [u8; LUKS_SECTOR_SIZE]) {
        match &self.mode {
            Mode::XtsPlain64 => self.xts.as_ref().expect("xts key present").encrypt_sector(sector, sector_index),
            Mode::CbcPlain => {
                cbc_crypt(&self.key, cbc_plain_iv(sector_index), sector, true).expect("sector is block-aligned")
            }
            Mode::CbcEssiv(_) => {
                let iv = essiv_iv(self.essiv_key.as_ref().expect("essiv key present"), sector_index);
                cbc_crypt(&self.key, iv, sector, true).expect("sector is block-aligned")
            }
            Mode::Ecb => ecb_crypt(&self.key, sector, true),
        }
    }

    pub fn decrypt_sector(&self, sector_index: u64, sector: &mut [u8; LUKS_SECTOR_SIZE]) {
        match &self.mode {
            Mode::XtsPlain64 => self.xts.as_ref().expect("xts key present").decrypt_sector(sector, sector_index),
            Mode::CbcPlain => {
                cbc_crypt(&self.key, cbc_plain_iv(sector_index), sector, false).expect("sector is block-aligned")
            }
            Mode::CbcEssiv(_) => {
                let iv = essiv_iv(self.essiv_key.as_ref().expect("essiv key present"), sector_index);
                cbc_crypt(&self.key, iv, sector, false).expect("sector is block-aligned")
            }
            Mode::Ecb => ecb_crypt(&self.key, sector, false),
        }
    }
}

fn ecb_crypt(key: &[u8], buf: &mut [u8], encrypt: bool) {
    let aes = AesKey::new(key).expect("key width already validated at construction");
    for block in buf.chunks_mut(16) {
        if encrypt {
            aes.encrypt_block(block);
        } else {
            aes.decrypt_block(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xts_round_trips_a_sector() {
        let key = [0x42u8; 64];
        let cipher = SectorCipher::new("aes", "xts-plain64", &key).unwrap();
        let mut sector = [0xABu8; LUKS_SECTOR_SIZE];
        let plaintext = sector;
        cipher.encrypt_sector(7, &mut sector);
        assert_ne!(sector, plaintext);
        cipher.decrypt_sector(7, &mut sector);
        assert_eq!(sector, plaintext);
    }

    #[test]
    fn cbc_plain_round_trips_a_sector() {
        let key = [0x11u8; 32];
        let cipher = SectorCipher::new("aes", "cbc-plain", &key).unwrap();
        let mut sector = [0x55u8; LUKS_SECTOR_SIZE];
        let plaintext = sector;
        cipher.encrypt_sector(3, &mut sector);
        cipher.decrypt_sector(3, &mut sector);
        assert_eq!(sector, plaintext);
    }

    #[test]
    fn cbc_essiv_round_trips_a_sector() {
        let key = [0x99u8; 32];
        let cipher = SectorCipher::new("aes", "cbc-essiv:sha256", &key).unwrap();
        let mut sector = [0x77u8; LUKS_SECTOR_SIZE];
        let plaintext = sector;
        cipher.encrypt_sector(42, &mut sector);
        cipher.decrypt_sector(42, &mut sector);
        assert_eq!(sector, plaintext);
    }

    #[test]
    fn ecb_round_trips_a_sector() {
        let key = [0x33u8; 16];
        let cipher = SectorCipher::new("aes", "ecb", &key).unwrap();
        let mut sector = [0x22u8; LUKS_SECTOR_SIZE];
        let plaintext = sector;
        cipher.encrypt_sector(0, &mut sector);
        cipher.decrypt_sector(0, &mut sector);
        assert_eq!(sector, plaintext);
    }

    #[test]
    fn different_sector_indices_give_different_ciphertext_for_essiv() {
        let key = [0x10u8; 32];
        let cipher = SectorCipher::new("aes", "cbc-essiv:sha256", &key).unwrap();
        let mut a = [0x01u8; LUKS_SECTOR_SIZE];
        let mut b = a;
        cipher.encrypt_sector(1, &mut a);
        cipher.encrypt_sector(2, &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_unknown_cipher_mode() {
        assert!(SectorCipher::new("aes", "ofb-plain", &[0u8; 32]).is_err());
    }
}
