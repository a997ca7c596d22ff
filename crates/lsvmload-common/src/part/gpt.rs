//! GPT header and partition-entry layout (GPT v1, all fields little-endian).
//!
//! Shared between `lsvmload-gpt` (which patches an in-memory GPT copy to add
//! the synthetic boot partition) and `lsvmload-luks` (which reads the GUID
//! constants to recognize the type of an existing entry).

use crate::str::FixedUtf16Str;
use crate::types::{Endian, LittleEndian, U32, U64};

/// A 16-byte GUID, stored exactly as it appears on disk (mixed-endian per
/// the RFC 4122 "Microsoft" variant — treated here as an opaque byte string
/// since we never need to interpret its fields, only compare/copy it).
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, bytemuck::Zeroable, bytemuck::Pod)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    pub const ZERO: Self = Self([0; 16]);

    /// `EBD0A0A2-B9E5-4433-87C0-68B6B72699C7` — Microsoft basic data partition.
    pub const BASIC_DATA_PART: Self = Self([
        0xa2, 0xa0, 0xd0, 0xeb, 0xe5, 0xb9, 0x33, 0x44, 0x87, 0xc0, 0x68, 0xb6, 0xb7, 0x26, 0x99,
        0xc7,
    ]);

    /// `C12A7328-F81F-11D2-BA4B-00A0C93EC93B` — EFI System Partition.
    pub const EFI_SYSTEM_PART: Self = Self([
        0x28, 0x73, 0x2a, 0xc1, 0x1f, 0xf8, 0xd2, 0x11, 0xba, 0x4b, 0x00, 0xa0, 0xc9, 0x3e, 0xc9,
        0x3b,
    ]);

    /// Fixed GUID this design uses for the synthesized `BOOTFS` partition
    /// entry (spec.md §4.I2: "write a fresh unique GUID (a fixed constant in
    /// this design)").
    pub const BOOTFS_PART: Self = Self([
        0x6c, 0x73, 0x76, 0x6d, 0x6c, 0x6f, 0x61, 0x64, 0x62, 0x6f, 0x6f, 0x74, 0x66, 0x73, 0x00,
        0x01,
    ]);

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Debug for Guid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.0[3], self.0[2], self.0[1], self.0[0],
            self.0[5], self.0[4],
            self.0[7], self.0[6],
            self.0[8], self.0[9],
            self.0[10], self.0[11], self.0[12], self.0[13], self.0[14], self.0[15],
        )
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Zeroable, bytemuck::Pod)]
pub struct GptPartitionTableHeader {
    pub signature: [u8; 8],
    pub revision: U32<LittleEndian>,
    pub header_size: U32<LittleEndian>,
    pub crc32: U32<LittleEndian>,
    pub reserved: U32<LittleEndian>,
    pub current_lba: U64<LittleEndian>,
    pub backup_lba: U64<LittleEndian>,
    pub first_usable_lba: U64<LittleEndian>,
    pub last_usable_lba: U64<LittleEndian>,
    pub disk_guid: Guid,
    pub partition_entry_lba: U64<LittleEndian>,
    pub num_partition_entries: U32<LittleEndian>,
    pub size_of_partition_entry: U32<LittleEndian>,
    pub partition_entry_array_crc32: U32<LittleEndian>,
}

impl GptPartitionTableHeader {
    pub const SIGNATURE: [u8; 8] = *b"EFI PART";

    pub fn is_valid(&self) -> bool {
        self.signature == Self::SIGNATURE
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Zeroable, bytemuck::Pod)]
pub struct GptPartitionEntry {
    pub type_guid: Guid,
    pub unique_partition_guid: Guid,
    pub starting_lba: U64<LittleEndian>,
    pub ending_lba: U64<LittleEndian>,
    pub attributes: U64<LittleEndian>,
    pub partition_name: FixedUtf16Str<36>,
}

impl GptPartitionEntry {
    pub fn is_unused(&self) -> bool {
        self.type_guid == Guid::ZERO
    }

    pub fn sector_count(&self) -> u64 {
        self.ending_lba.get() + 1 - self.starting_lba.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_matches_gpt_spec() {
        assert_eq!(core::mem::size_of::<GptPartitionTableHeader>(), 0x5c);
    }

    #[test]
    fn entry_size_matches_gpt_spec() {
        assert_eq!(core::mem::size_of::<GptPartitionEntry>(), 128);
    }

    #[test]
    fn sector_count_is_inclusive_range() {
        let mut entry: GptPartitionEntry = bytemuck::Zeroable::zeroed();
        entry.starting_lba = U64::<LittleEndian>::new(1000);
        entry.ending_lba = U64::<LittleEndian>::new(1999);
        assert_eq!(entry.sector_count(), 1000);
    }
}
