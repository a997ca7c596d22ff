//! The region table (spec.md §3's "Region table"): the process-wide
//! ordered list of LBA ranges the root-BIO interposer (§4.I1) serves in
//! place of the real disk.

use alloc::boxed::Box;
use alloc::vec::Vec;

use lsvmload_block::{Bdev, Block, BLOCK_SIZE};

use crate::error::InterposeError;

/// At most this many regions may be installed at once (spec.md §3).
pub const MAX_REGIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionId {
    Gpt,
    Esp,
    Boot,
}

/// A region's backing store: either an owned in-RAM block array (the GPT
/// copy I1 patches) or another block device (the decrypted boot volume
/// I2 registers as `REGION_ID_BOOT`).
pub enum RegionBacking {
    Ram(Vec<Block>),
    Bdev(Box<dyn Bdev + Send>),
}

pub struct Region {
    pub id: RegionId,
    pub first_lba: u64,
    pub last_lba: u64,
    pub read_only: bool,
    pub backing: RegionBacking,
}

impl Region {
    pub fn ram(id: RegionId, first_lba: u64, read_only: bool, bytes: &[u8]) -> Self {
        let block_count = bytes.len().div_ceil(BLOCK_SIZE);
        let mut blocks = alloc::vec![[0u8; BLOCK_SIZE]; block_count];
        for (block, chunk) in blocks.iter_mut().zip(bytes.chunks(BLOCK_SIZE)) {
            block[..chunk.len()].copy_from_slice(chunk);
        }
        let last_lba = first_lba + block_count as u64 - 1;
        Self {
            id,
            first_lba,
            last_lba,
            read_only,
            backing: RegionBacking::Ram(blocks),
        }
    }

    pub fn bdev(id: RegionId, first_lba: u64, last_lba: u64, read_only: bool, dev: Box<dyn Bdev + Send>) -> Self {
        Self {
            id,
            first_lba,
            last_lba,
            read_only,
            backing: RegionBacking::Bdev(dev),
        }
    }

    pub fn contains(&self, lba: u64) -> bool {
        lba >= self.first_lba && lba <= self.last_lba
    }

    fn overlaps(&self, other_first: u64, other_last: u64) -> bool {
        self.first_lba <= other_last && other_first <= self.last_lba
    }

    pub fn get(&mut self, lba: u64) -> Result<Block, InterposeError> {
        let local = lba - self.first_lba;
        match &mut self.backing {
            RegionBacking::Ram(blocks) => blocks
                .get(local as usize)
                .copied()
                .ok_or(InterposeError::OutOfBounds),
            RegionBacking::Bdev(dev) => Ok(dev.get(local)?),
        }
    }

    pub fn put(&mut self, lba: u64, block: &Block) -> Result<(), InterposeError> {
        if self.read_only {
            return Err(InterposeError::WriteProtected);
        }
        let local = lba - self.first_lba;
        match &mut self.backing {
            RegionBacking::Ram(blocks) => {
                let slot = blocks.get_mut(local as usize).ok_or(InterposeError::OutOfBounds)?;
                *slot = *block;
                Ok(())
            }
            RegionBacking::Bdev(dev) => Ok(dev.put(local, block)?),
        }
    }
}

/// Linear-scan, disjoint-ranges region table. Lookup is O(n) over at most
/// [`MAX_REGIONS`] entries, which is cheap enough that an index is not
/// worth the complexity.
#[derive(Default)]
pub struct RegionTable {
    regions: Vec<Region>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self { regions: Vec::new() }
    }

    pub fn install(&mut self, region: Region) -> Result<(), InterposeError> {
        if self.regions.len() >= MAX_REGIONS {
            return Err(InterposeError::TooManyRegions);
        }
        if self.regions.iter().any(|r| r.overlaps(region.first_lba, region.last_lba)) {
            return Err(InterposeError::OverlappingRegion);
        }
        log::debug!(
            "installed region {:?} spanning LBA {}..={}",
            region.id,
            region.first_lba,
            region.last_lba
        );
        self.regions.push(region);
        Ok(())
    }

    pub fn lookup(&mut self, lba: u64) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.contains(lba))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_region_serves_bytes() {
        let mut region = Region::ram(RegionId::Gpt, 0, true, &[0xAB; 512]);
        let block = region.get(0).unwrap();
        assert_eq!(block, [0xAB; 512]);
    }

    #[test]
    fn ram_region_spans_multiple_blocks() {
        let mut bytes = alloc::vec![0u8; 1024];
        bytes[512] = 0x42;
        let region = Region::ram(RegionId::Gpt, 10, true, &bytes);
        assert_eq!(region.first_lba, 10);
        assert_eq!(region.last_lba, 11);
    }

    #[test]
    fn read_only_region_rejects_writes() {
        let mut region = Region::ram(RegionId::Gpt, 0, true, &[0u8; 512]);
        assert_eq!(region.put(0, &[1u8; 512]), Err(InterposeError::WriteProtected));
    }

    #[test]
    fn table_rejects_overlapping_regions() {
        let mut table = RegionTable::new();
        table.install(Region::ram(RegionId::Gpt, 0, true, &[0u8; 512])).unwrap();
        let overlapping = Region::ram(RegionId::Esp, 0, true, &[0u8; 512]);
        assert_eq!(table.install(overlapping), Err(InterposeError::OverlappingRegion));
    }

    #[test]
    fn table_rejects_a_ninth_region() {
        let mut table = RegionTable::new();
        for i in 0..MAX_REGIONS {
            table.install(Region::ram(RegionId::Gpt, i as u64, true, &[0u8; 512])).unwrap();
        }
        let one_more = Region::ram(RegionId::Esp, MAX_REGIONS as u64, true, &[0u8; 512]);
        assert_eq!(table.install(one_more), Err(InterposeError::TooManyRegions));
    }

    #[test]
    fn lookup_finds_the_owning_region() {
        let mut table = RegionTable::new();
        table.install(Region::ram(RegionId::Gpt, 100, true, &[0u8; 1024])).unwrap();
        assert!(table.lookup(100).is_some());
        assert!(table.lookup(101).is_some());
        assert!(table.lookup(102).is_none());
    }
}
