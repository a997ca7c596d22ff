use crate::bdev::{Bdev, BdevError, Block, BLOCK_SIZE};
use alloc::vec::Vec;

/// An in-memory `Bdev` backed by an owned `Vec` of blocks.
///
/// Generalizes `hadris-core`'s `impl DiskReader for &[u8]` to an owned
/// buffer: every crate's unit tests build a synthetic image this way
/// instead of reaching for real media.
pub struct VecBdev {
    blocks: Vec<Block>,
    read_only: bool,
}

impl VecBdev {
    pub fn new(block_count: usize) -> Self {
        Self {
            blocks: alloc::vec![[0u8; BLOCK_SIZE]; block_count],
            read_only: false,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let block_count = bytes.len().div_ceil(BLOCK_SIZE);
        let mut dev = Self::new(block_count);
        for (lba, chunk) in bytes.chunks(BLOCK_SIZE).enumerate() {
            dev.blocks[lba][..chunk.len()].copy_from_slice(chunk);
        }
        dev
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.blocks.into_iter().flatten().collect()
    }
}

impl Bdev for VecBdev {
    fn get(&mut self, lba: u64) -> Result<Block, BdevError> {
        self.blocks
            .get(lba as usize)
            .copied()
            .ok_or(BdevError::OutOfBounds)
    }

    fn put(&mut self, lba: u64, block: &Block) -> Result<(), BdevError> {
        if self.read_only {
            return Err(BdevError::WriteProtected);
        }
        let slot = self.blocks.get_mut(lba as usize).ok_or(BdevError::OutOfBounds)?;
        *slot = *block;
        Ok(())
    }

    fn set_flags(&mut self, _flags: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdev::BdevExt;

    #[test]
    fn round_trips_bytes() {
        let mut dev = VecBdev::new(4);
        dev.write_bytes(100, b"hello world").unwrap();
        let mut buf = [0u8; 11];
        dev.read_bytes(100, &mut buf).unwrap();
        assert_eq!(&buf, b"hello world");
    }

    #[test]
    fn write_protected_device_rejects_put() {
        let mut dev = VecBdev::new(1);
        dev.set_read_only(true);
        assert_eq!(dev.put(0, &[0; BLOCK_SIZE]), Err(BdevError::WriteProtected));
    }
}
