//! The pseudo-partition GPT patch (spec.md §4.I2): given the number of
//! sectors in the decrypted LUKS boot volume, extend a [`GptImage`] with a
//! synthetic `BOOTFS` entry immediately after the existing partition with
//! the largest starting LBA.

use alloc::vec;

use lsvmload_common::part::gpt::Guid;
use lsvmload_common::types::{Endian, LittleEndian, U64};

use crate::error::GptError;
use crate::image::GptImage;

/// The synthesized partition's number (1-based, matching its entry-array
/// index + 1) and LBA range, returned so the interposer can register the
/// matching `REGION_ID_BOOT` range (spec.md §4.I2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootfsPlacement {
    pub partition_number: u32,
    pub starting_lba: u64,
    pub ending_lba: u64,
}

/// Mutates `image` in place: finds the highest-numbered used entry and the
/// entry with the largest starting LBA (these are always the same entry on
/// a normally laid out disk, but the algorithm tracks them independently
/// per spec.md's wording), appends a `BOOTFS` entry of `sectors` blocks
/// immediately after it, and extends `last_usable_lba` if needed.
pub fn add_bootfs_partition(image: &mut GptImage, sectors: u64) -> Result<BootfsPlacement, GptError> {
    // spec.md §8: applying this twice must fail the second time rather than
    // duplicate the entry.
    if image.entries.iter().any(|e| !e.is_unused() && e.unique_partition_guid == Guid::BOOTFS_PART) {
        return Err(GptError::AlreadyPresent);
    }

    // Partition number == entry-array index + 1, so the highest-numbered
    // used entry is simply the last used slot.
    let max_entry_idx = image
        .entries
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_unused())
        .map(|(idx, _)| idx)
        .max()
        .ok_or(GptError::NoExistingPartitions)?;

    let adjacent = image.entries[max_entry_idx];
    let adjacent_end = adjacent.ending_lba.get();
    let starting_lba = adjacent_end + 1;
    let ending_lba = starting_lba
        .checked_add(sectors)
        .and_then(|v| v.checked_sub(1))
        .ok_or(GptError::Overflow)?;

    let slot = image
        .entries
        .iter()
        .position(|e| e.is_unused())
        .ok_or(GptError::NoFreeSlot)?;

    let mut entry = image.entries[slot];
    entry.type_guid = adjacent.type_guid;
    entry.unique_partition_guid = Guid::BOOTFS_PART;
    entry.starting_lba = U64::<LittleEndian>::new(starting_lba);
    entry.ending_lba = U64::<LittleEndian>::new(ending_lba);
    entry.attributes = U64::<LittleEndian>::new(0);
    entry.partition_name.set("BOOTFS");
    image.entries[slot] = entry;

    if ending_lba > image.header.last_usable_lba.get() {
        log::debug!("extending GPT last_usable_lba to {ending_lba} to fit the BOOTFS partition");
        image.header.last_usable_lba = U64::<LittleEndian>::new(ending_lba);
    }

    log::debug!("synthesized BOOTFS partition {} at LBA {starting_lba}..={ending_lba}", slot + 1);
    Ok(BootfsPlacement {
        partition_number: (slot as u32) + 1,
        starting_lba,
        ending_lba,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsvmload_common::part::gpt::GptPartitionTableHeader;
    use lsvmload_common::types::U32;

    fn header(num_entries: u32, last_usable: u64) -> GptPartitionTableHeader {
        GptPartitionTableHeader {
            signature: GptPartitionTableHeader::SIGNATURE,
            revision: U32::new(0x0001_0000),
            header_size: U32::new(core::mem::size_of::<GptPartitionTableHeader>() as u32),
            crc32: U32::new(0),
            reserved: U32::new(0),
            current_lba: U64::new(1),
            backup_lba: U64::new(0),
            first_usable_lba: U64::new(34),
            last_usable_lba: U64::new(last_usable),
            disk_guid: Guid::ZERO,
            partition_entry_lba: U64::new(2),
            num_partition_entries: U32::new(num_entries),
            size_of_partition_entry: U32::new(128),
            partition_entry_array_crc32: U32::new(0),
        }
    }

    fn used_entry(start: u64, end: u64) -> lsvmload_common::part::gpt::GptPartitionEntry {
        let mut e: lsvmload_common::part::gpt::GptPartitionEntry = bytemuck::Zeroable::zeroed();
        e.type_guid = Guid::EFI_SYSTEM_PART;
        e.unique_partition_guid = Guid::from_bytes([0x11; 16]);
        e.starting_lba = U64::new(start);
        e.ending_lba = U64::new(end);
        e
    }

    #[test]
    fn appends_immediately_after_the_highest_partition() {
        let mut image = GptImage {
            header: header(4, 999),
            entries: vec![used_entry(34, 999), bytemuck::Zeroable::zeroed(), bytemuck::Zeroable::zeroed(), bytemuck::Zeroable::zeroed()],
        };

        let placement = add_bootfs_partition(&mut image, 500).unwrap();
        assert_eq!(placement.partition_number, 2);
        assert_eq!(placement.starting_lba, 1000);
        assert_eq!(placement.ending_lba, 1499);

        let new_entry = image.entries[1];
        assert_eq!(new_entry.type_guid, Guid::EFI_SYSTEM_PART);
        assert_eq!(new_entry.unique_partition_guid, Guid::BOOTFS_PART);
    }

    #[test]
    fn extends_last_usable_lba_when_the_new_partition_runs_past_it() {
        let mut image = GptImage {
            header: header(2, 999),
            entries: vec![used_entry(34, 999), bytemuck::Zeroable::zeroed()],
        };

        add_bootfs_partition(&mut image, 500).unwrap();
        assert_eq!(image.header.last_usable_lba.get(), 1499);
    }

    #[test]
    fn does_not_shrink_last_usable_lba_when_already_large_enough() {
        let mut image = GptImage {
            header: header(2, 5000),
            entries: vec![used_entry(34, 999), bytemuck::Zeroable::zeroed()],
        };

        add_bootfs_partition(&mut image, 500).unwrap();
        assert_eq!(image.header.last_usable_lba.get(), 5000);
    }

    #[test]
    fn fails_with_no_existing_partitions() {
        let mut image = GptImage {
            header: header(2, 999),
            entries: vec![bytemuck::Zeroable::zeroed(), bytemuck::Zeroable::zeroed()],
        };
        assert!(matches!(add_bootfs_partition(&mut image, 500), Err(GptError::NoExistingPartitions)));
    }

    #[test]
    fn fails_if_a_bootfs_partition_already_exists() {
        let mut image = GptImage {
            header: header(4, 999),
            entries: vec![used_entry(34, 999), bytemuck::Zeroable::zeroed(), bytemuck::Zeroable::zeroed(), bytemuck::Zeroable::zeroed()],
        };
        add_bootfs_partition(&mut image, 500).unwrap();
        assert!(matches!(add_bootfs_partition(&mut image, 500), Err(GptError::AlreadyPresent)));
    }

    #[test]
    fn fails_with_no_free_slot() {
        let mut image = GptImage {
            header: header(1, 999),
            entries: vec![used_entry(34, 999)],
        };
        assert!(matches!(add_bootfs_partition(&mut image, 500), Err(GptError::NoFreeSlot)));
    }
}
