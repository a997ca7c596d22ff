//! An in-memory copy of a disk's GPT: the primary header plus its
//! partition-entry array. Grounded on `hadris-common`'s
//! `GptPartitionTableHeader`/`GptPartitionEntry` structs (adapted into
//! [`lsvmload_common::part::gpt`], which this crate builds on) and on
//! spec.md §4.I1's description of region installation reading "the on-disk
//! GPT ... once into a module-static buffer" — here, an owned [`GptImage`]
//! rather than a static, since `BootContext` replaces ambient globals.

use alloc::vec;
use alloc::vec::Vec;

use lsvmload_block::{Bdev, BdevExt, BLOCK_SIZE};
use lsvmload_common::alg::crc::crc32;
use lsvmload_common::part::gpt::{GptPartitionEntry, GptPartitionTableHeader};
use lsvmload_common::types::{Endian, LittleEndian, U32};

use crate::error::GptError;

const GPT_HEADER_LBA: u64 = 1;
const HEADER_SIZE: usize = core::mem::size_of::<GptPartitionTableHeader>();
static_assertions::const_assert_eq!(HEADER_SIZE, 0x5c);

/// A parsed primary GPT: header plus its full partition-entry array, in
/// entry order (array index 0 is partition number 1).
#[derive(Debug, Clone)]
pub struct GptImage {
    pub header: GptPartitionTableHeader,
    pub entries: Vec<GptPartitionEntry>,
}

impl GptImage {
    /// Reads LBA 1 (the primary header) and its partition-entry array from
    /// `dev`, validating both checksums.
    pub fn read_from(dev: &mut impl Bdev) -> Result<Self, GptError> {
        let header_block = dev.get(GPT_HEADER_LBA)?;
        let header: GptPartitionTableHeader = *bytemuck::from_bytes(&header_block[..HEADER_SIZE]);
        if !header.is_valid() {
            return Err(GptError::BadSignature);
        }

        let mut header_for_crc = header;
        header_for_crc.crc32 = U32::<LittleEndian>::new(0);
        if crc32(bytemuck::bytes_of(&header_for_crc)) != header.crc32.get() {
            return Err(GptError::BadHeaderChecksum);
        }

        let entry_size = header.size_of_partition_entry.get() as usize;
        let count = header.num_partition_entries.get() as usize;
        let array_bytes = entry_size * count;
        let mut raw = vec![0u8; array_bytes];
        dev.read_bytes(header.partition_entry_lba.get() * BLOCK_SIZE as u64, &mut raw)?;

        if crc32(&raw) != header.partition_entry_array_crc32.get() {
            return Err(GptError::BadEntryArrayChecksum);
        }

        let entries = raw
            .chunks_exact(entry_size)
            .map(|chunk| *bytemuck::from_bytes(&chunk[..core::mem::size_of::<GptPartitionEntry>()]))
            .collect::<Vec<GptPartitionEntry>>();

        log::trace!("read GPT with {} partition entries", entries.len());
        Ok(Self { header, entries })
    }

    /// Recomputes the partition-entry array checksum, then the header
    /// checksum over the header with `crc32` zeroed, per the GPT spec.
    pub fn recompute_checksums(&mut self) {
        let raw: Vec<u8> = self.entries.iter().flat_map(|e| bytemuck::bytes_of(e).to_vec()).collect();
        self.header.partition_entry_array_crc32 = U32::<LittleEndian>::new(crc32(&raw));

        self.header.crc32 = U32::<LittleEndian>::new(0);
        self.header.crc32 = U32::<LittleEndian>::new(crc32(bytemuck::bytes_of(&self.header)));
    }

    /// Serializes the header and entry array into a flat byte buffer
    /// suitable for backing the in-RAM `REGION_ID_GPT` region (spec.md
    /// §4.I1): header at offset 0 (one block), entry array immediately
    /// following, both padded out to block boundaries.
    pub fn to_region_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; BLOCK_SIZE];
        out[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&self.header));

        for entry in &self.entries {
            out.extend_from_slice(bytemuck::bytes_of(entry));
        }
        let entry_size = self.header.size_of_partition_entry.get() as usize;
        let total_entry_bytes = entry_size * self.entries.len();
        let padded_len = HEADER_SIZE + total_entry_bytes;
        let padded_len = padded_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        out.resize(padded_len, 0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsvmload_block::VecBdev;
    use lsvmload_common::part::gpt::Guid;

    fn header_with(num_entries: u32, first_usable: u64, last_usable: u64) -> GptPartitionTableHeader {
        GptPartitionTableHeader {
            signature: GptPartitionTableHeader::SIGNATURE,
            revision: U32::new(0x0001_0000),
            header_size: U32::new(HEADER_SIZE as u32),
            crc32: U32::new(0),
            reserved: U32::new(0),
            current_lba: lsvmload_common::types::U64::new(1),
            backup_lba: lsvmload_common::types::U64::new(0),
            first_usable_lba: lsvmload_common::types::U64::new(first_usable),
            last_usable_lba: lsvmload_common::types::U64::new(last_usable),
            disk_guid: Guid::ZERO,
            partition_entry_lba: lsvmload_common::types::U64::new(2),
            num_partition_entries: U32::new(num_entries),
            size_of_partition_entry: U32::new(128),
            partition_entry_array_crc32: U32::new(0),
        }
    }

    fn one_entry() -> GptPartitionEntry {
        let mut e: GptPartitionEntry = bytemuck::Zeroable::zeroed();
        e.type_guid = Guid::BASIC_DATA_PART;
        e.unique_partition_guid = Guid::from_bytes([0xAA; 16]);
        e.starting_lba = lsvmload_common::types::U64::new(100);
        e.ending_lba = lsvmload_common::types::U64::new(199);
        e
    }

    fn write_image(dev: &mut VecBdev, mut image: GptImage) {
        image.recompute_checksums();
        dev.write_bytes(GPT_HEADER_LBA * BLOCK_SIZE as u64, bytemuck::bytes_of(&image.header)).unwrap();
        let raw: Vec<u8> = image.entries.iter().flat_map(|e| bytemuck::bytes_of(e).to_vec()).collect();
        dev.write_bytes(image.header.partition_entry_lba.get() * BLOCK_SIZE as u64, &raw).unwrap();
    }

    #[test]
    fn round_trips_header_and_entries() {
        let mut dev = VecBdev::new(64);
        let image = GptImage {
            header: header_with(4, 34, 63),
            entries: vec![one_entry(), bytemuck::Zeroable::zeroed(), bytemuck::Zeroable::zeroed(), bytemuck::Zeroable::zeroed()],
        };
        write_image(&mut dev, image);

        let read_back = GptImage::read_from(&mut dev).unwrap();
        assert_eq!(read_back.entries.len(), 4);
        assert_eq!(read_back.entries[0].starting_lba.get(), 100);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut dev = VecBdev::new(64);
        assert!(matches!(GptImage::read_from(&mut dev), Err(GptError::BadSignature)));
    }

    #[test]
    fn rejects_tampered_entry_array() {
        let mut dev = VecBdev::new(64);
        let image = GptImage {
            header: header_with(1, 34, 63),
            entries: vec![one_entry()],
        };
        write_image(&mut dev, image);

        let mut block = dev.get(2).unwrap();
        block[0] ^= 0xFF;
        dev.put(2, &block).unwrap();

        assert!(matches!(GptImage::read_from(&mut dev), Err(GptError::BadEntryArrayChecksum)));
    }
}
