use alloc::vec::Vec;

use lsvmload_block::{Bdev, BdevError, Block};

use crate::cipher::SectorCipher;
use crate::error::LuksError;
use crate::header::LuksHeader;
use crate::masterkey::recover_master_key;

/// A [`Bdev`] that presents the decrypted LUKS payload of `child` as a
/// plain block device, translating payload-relative LBAs by
/// `header.payload_offset` and running every block through the sector
/// cipher on the way in and out (spec.md §4.L3's "LUKS Bdev").
///
/// Holds a private copy of the master key, zeroed by [`Bdev::close`] so it
/// does not linger in memory past the life of this device.
pub struct LuksBdev<D: Bdev> {
    child: D,
    payload_offset: u64,
    cipher: SectorCipher,
    master_key: Vec<u8>,
}

impl<D: Bdev> LuksBdev<D> {
    /// Opens `child` using an already-unsealed master key (the TPM-unseal
    /// path of spec.md §4.O1's `S2`/`S3`).
    pub fn from_master_key(child: D, header: &LuksHeader, master_key: Vec<u8>) -> Result<Self, LuksError> {
        let cipher = SectorCipher::new(&header.cipher_name, &header.cipher_mode, &master_key)?;
        Ok(Self {
            child,
            payload_offset: header.payload_offset as u64,
            cipher,
            master_key,
        })
    }

    /// Opens `child` by recovering the master key from `passphrase` against
    /// `header` (the interactive fallback path of spec.md §4.O1).
    pub fn from_raw_bytes(mut child: D, header: &LuksHeader, passphrase: &[u8]) -> Result<Self, LuksError> {
        let master_key = recover_master_key(&mut child, header, passphrase)?;
        Self::from_master_key(child, header, master_key)
    }

    pub fn master_key(&self) -> &[u8] {
        &self.master_key
    }

    pub fn into_child(self) -> D {
        let Self { child, .. } = self;
        child
    }
}

impl<D: Bdev> Bdev for LuksBdev<D> {
    fn get(&mut self, lba: u64) -> Result<Block, BdevError> {
        let mut block = self.child.get(self.payload_offset + lba)?;
        self.cipher.decrypt_sector(lba, &mut block);
        Ok(block)
    }

    fn put(&mut self, lba: u64, block: &Block) -> Result<(), BdevError> {
        let mut ciphertext = *block;
        self.cipher.encrypt_sector(lba, &mut ciphertext);
        self.child.put(self.payload_offset + lba, &ciphertext)
    }

    fn set_flags(&mut self, flags: u32) {
        self.child.set_flags(flags);
    }

    fn close(&mut self) -> Result<(), BdevError> {
        for b in self.master_key.iter_mut() {
            *b = 0;
        }
        self.child.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsvmload_block::BdevExt;
    use lsvmload_block::VecBdev;

    fn sample_header() -> LuksHeader {
        use crate::header::{KeySlot, LUKS_SALT_SIZE, LUKS_SLOTS};
        LuksHeader {
            version: 1,
            cipher_name: "aes".into(),
            cipher_mode: "cbc-plain".into(),
            hash_spec: "sha256".into(),
            payload_offset: 2,
            key_bytes: 32,
            mk_digest: [0u8; 20],
            mk_digest_salt: [0u8; LUKS_SALT_SIZE],
            mk_digest_iter: 1000,
            uuid: "test".into(),
            slots: [KeySlot {
                enabled: false,
                password_iters: 0,
                password_salt: [0u8; LUKS_SALT_SIZE],
                key_material_offset: 0,
                af_stripes: 0,
            }; LUKS_SLOTS],
        }
    }

    struct RecordingBdev {
        inner: VecBdev,
        last_lba: Option<u64>,
    }

    impl Bdev for RecordingBdev {
        fn get(&mut self, lba: u64) -> Result<Block, BdevError> {
            self.last_lba = Some(lba);
            self.inner.get(lba)
        }
        fn put(&mut self, lba: u64, block: &Block) -> Result<(), BdevError> {
            self.last_lba = Some(lba);
            self.inner.put(lba, block)
        }
        fn set_flags(&mut self, flags: u32) {
            self.inner.set_flags(flags);
        }
    }

    #[test]
    fn translates_payload_relative_lba_by_offset() {
        let header = sample_header();
        let child = RecordingBdev {
            inner: VecBdev::new(16),
            last_lba: None,
        };
        let mut dev = LuksBdev::from_master_key(child, &header, alloc::vec![0x42u8; 32]).unwrap();

        dev.put(0, &[0xAAu8; 512]).unwrap();
        assert_eq!(dev.into_child().last_lba, Some(header.payload_offset));
    }

    #[test]
    fn round_trips_through_cipher() {
        let header = sample_header();
        let child = VecBdev::new(16);
        let mut dev = LuksBdev::from_master_key(child, &header, alloc::vec![0x11u8; 32]).unwrap();

        dev.put(1, &[0x5Cu8; 512]).unwrap();
        let block = dev.get(1).unwrap();
        assert_eq!(block, [0x5Cu8; 512]);
    }

    #[test]
    fn close_zeroes_the_master_key() {
        let header = sample_header();
        let child = VecBdev::new(16);
        let mut dev = LuksBdev::from_master_key(child, &header, alloc::vec![0x77u8; 32]).unwrap();
        dev.close().unwrap();
        assert!(dev.master_key().iter().all(|&b| b == 0));
    }
}
