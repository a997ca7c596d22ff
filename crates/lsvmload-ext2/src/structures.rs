//! On-disk EXT2 revision-1 structures (spec.md §3, §4.L4).
//!
//! Laid out the way `hadris-fat/src/structures/boot_sector.rs` lays out
//! FAT's BPB: `#[repr(C, packed)]` structs of endian-tagged fields, derived
//! `bytemuck::Pod`/`Zeroable` for zero-copy block access.

use lsvmload_common::types::{LittleEndian, U16, U32};

pub const EXT2_MAGIC: u16 = 0xEF53;
pub const EXT2_DYNAMIC_REV: u32 = 1;
pub const ROOT_INO: u32 = 2;
pub const FIRST_INO_DEFAULT: u32 = 11;
pub const EXT2_NDIR_BLOCKS: usize = 12;
pub const EXT2_IND_BLOCK: usize = 12;
pub const EXT2_DIND_BLOCK: usize = 13;
pub const EXT2_TIND_BLOCK: usize = 14;
pub const EXT2_N_BLOCKS: usize = 15;

pub const EXT2_S_IFDIR: u16 = 0x4000;
pub const EXT2_S_IFREG: u16 = 0x8000;

pub const EXT2_FT_UNKNOWN: u8 = 0;
pub const EXT2_FT_REG_FILE: u8 = 1;
pub const EXT2_FT_DIR: u8 = 2;

type LE16 = U16<LittleEndian>;
type LE32 = U32<LittleEndian>;

/// The EXT2 superblock, located at byte offset 1024 regardless of block
/// size.
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Superblock {
    pub inodes_count: LE32,
    pub blocks_count: LE32,
    pub r_blocks_count: LE32,
    pub free_blocks_count: LE32,
    pub free_inodes_count: LE32,
    pub first_data_block: LE32,
    pub log_block_size: LE32,
    pub log_frag_size: LE32,
    pub blocks_per_group: LE32,
    pub frags_per_group: LE32,
    pub inodes_per_group: LE32,
    pub mtime: LE32,
    pub wtime: LE32,
    pub mnt_count: LE16,
    pub max_mnt_count: LE16,
    pub magic: LE16,
    pub state: LE16,
    pub errors: LE16,
    pub minor_rev_level: LE16,
    pub lastcheck: LE32,
    pub checkinterval: LE32,
    pub creator_os: LE32,
    pub rev_level: LE32,
    pub def_resuid: LE16,
    pub def_resgid: LE16,
    // -- EXT2_DYNAMIC_REV fields --
    pub first_ino: LE32,
    pub inode_size: LE16,
    pub block_group_nr: LE16,
    pub feature_compat: LE32,
    pub feature_incompat: LE32,
    pub feature_ro_compat: LE32,
    pub uuid: [u8; 16],
    pub volume_name: [u8; 16],
    pub last_mounted: [u8; 64],
    pub algo_bitmap: LE32,
    pub padding: [u8; 820],
}

static_assertions::const_assert_eq!(core::mem::size_of::<Superblock>(), 1024);

impl Superblock {
    pub fn is_valid(&self) -> bool {
        self.magic.get() == EXT2_MAGIC && self.rev_level.get() >= EXT2_DYNAMIC_REV
    }

    pub fn block_size(&self) -> u32 {
        1024 << self.log_block_size.get()
    }

    pub fn group_count(&self) -> u32 {
        let blocks = self.blocks_count.get();
        let per_group = self.blocks_per_group.get();
        blocks.div_ceil(per_group)
    }

    pub fn inode_size(&self) -> u16 {
        if self.rev_level.get() >= EXT2_DYNAMIC_REV {
            self.inode_size.get()
        } else {
            128
        }
    }

    pub fn first_ino(&self) -> u32 {
        if self.rev_level.get() >= EXT2_DYNAMIC_REV {
            self.first_ino.get()
        } else {
            FIRST_INO_DEFAULT
        }
    }
}

/// One block-group descriptor (32 bytes).
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GroupDesc {
    pub block_bitmap: LE32,
    pub inode_bitmap: LE32,
    pub inode_table: LE32,
    pub free_blocks_count: LE16,
    pub free_inodes_count: LE16,
    pub used_dirs_count: LE16,
    pub pad: LE16,
    pub reserved: [u8; 12],
}

static_assertions::const_assert_eq!(core::mem::size_of::<GroupDesc>(), 32);

/// An on-disk inode (128 bytes at minimum; `Superblock::inode_size` may be
/// larger, in which case the extra bytes are skipped rather than parsed).
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Inode {
    pub mode: LE16,
    pub uid: LE16,
    pub size: LE32,
    pub atime: LE32,
    pub ctime: LE32,
    pub mtime: LE32,
    pub dtime: LE32,
    pub gid: LE16,
    pub links_count: LE16,
    pub blocks: LE32,
    pub flags: LE32,
    pub osd1: LE32,
    pub block: [LE32; EXT2_N_BLOCKS],
    pub generation: LE32,
    pub file_acl: LE32,
    pub dir_acl: LE32,
    pub faddr: LE32,
    pub osd2: [u8; 12],
}

static_assertions::const_assert_eq!(core::mem::size_of::<Inode>(), 128);

impl Inode {
    pub fn is_dir(&self) -> bool {
        self.mode.get() & 0xF000 == EXT2_S_IFDIR
    }

    pub fn is_reg(&self) -> bool {
        self.mode.get() & 0xF000 == EXT2_S_IFREG
    }
}

/// A directory entry header; the name bytes immediately follow.
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirEntryHeader {
    pub inode: LE32,
    pub rec_len: LE16,
    pub name_len: u8,
    pub file_type: u8,
}

pub const DIR_ENTRY_HEADER_LEN: usize = core::mem::size_of::<DirEntryHeader>();

static_assertions::const_assert_eq!(DIR_ENTRY_HEADER_LEN, 8);

/// `round_up(DIR_ENTRY_HEADER_LEN + name_len, 4)` — the minimum `rec_len`
/// that fits a directory entry with the given name length (spec.md
/// §4.L4's directory-mutation rule).
pub fn min_rec_len(name_len: usize) -> u16 {
    let raw = DIR_ENTRY_HEADER_LEN + name_len;
    (raw.div_ceil(4) * 4) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superblock_is_1024_bytes() {
        assert_eq!(core::mem::size_of::<Superblock>(), 1024);
    }

    #[test]
    fn min_rec_len_rounds_up_to_four() {
        assert_eq!(min_rec_len(1), 12);
        assert_eq!(min_rec_len(4), 12);
        assert_eq!(min_rec_len(5), 16);
    }
}
