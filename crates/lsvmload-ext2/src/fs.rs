//! The mounted file system: superblock/group-descriptor bookkeeping, block
//! and inode allocation, path resolution, and the read/write operations
//! spec.md §4.L4 names (`stat-path`, `load-file-from-inode`, `list-dir`,
//! `put-file`, `remove-file`, `mkdir`, `recursive-hash`).

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use bytemuck::Zeroable;
use lsvmload_block::{Bdev, BdevExt};
use lsvmload_common::types::{Endian, LittleEndian, U16, U32};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::bitmap;
use crate::dirent::{self, DirEntry};
use crate::error::Ext2Error;
use crate::structures::{
    GroupDesc, Inode, Superblock, EXT2_DIND_BLOCK, EXT2_DYNAMIC_REV, EXT2_FT_DIR,
    EXT2_FT_REG_FILE, EXT2_IND_BLOCK, EXT2_MAGIC, EXT2_NDIR_BLOCKS, EXT2_S_IFDIR, EXT2_S_IFREG,
    EXT2_TIND_BLOCK, ROOT_INO,
};

type LE16 = U16<LittleEndian>;
type LE32 = U32<LittleEndian>;

const SUPERBLOCK_OFFSET: u64 = 1024;
const PATH_MAX: usize = 4096;

/// A mounted EXT2 volume. Owns its backing [`Bdev`]; `groups` and the
/// superblock are cached in memory and flushed eagerly after every mutation
/// (there is no write-back delay — spec.md's boot-time use never keeps the
/// volume mounted long enough for that to matter).
pub struct Ext2<D: Bdev> {
    dev: D,
    sb: Superblock,
    groups: Vec<GroupDesc>,
    block_size: u32,
    inode_size: u32,
}

impl<D: Bdev> Ext2<D> {
    pub fn open(mut dev: D) -> Result<Self, Ext2Error> {
        let mut sb_bytes = [0u8; core::mem::size_of::<Superblock>()];
        dev.read_bytes(SUPERBLOCK_OFFSET, &mut sb_bytes)?;
        let sb: Superblock = *bytemuck::from_bytes(&sb_bytes);

        if sb.magic.get() != EXT2_MAGIC {
            return Err(Ext2Error::BadMagic);
        }
        if sb.rev_level.get() < EXT2_DYNAMIC_REV {
            return Err(Ext2Error::UnsupportedRevision);
        }
        let inode_size = sb.inode_size() as u32;
        if (inode_size as usize) < core::mem::size_of::<Inode>() {
            return Err(Ext2Error::BadInodeSize);
        }

        let block_size = sb.block_size();
        let group_count = sb.group_count();
        let gdt_block = sb.first_data_block.get() as u64 + 1;
        let gdt_len = group_count as usize * core::mem::size_of::<GroupDesc>();
        let mut gdt_bytes = vec![0u8; gdt_len];
        dev.read_bytes(gdt_block * block_size as u64, &mut gdt_bytes)?;
        let groups = gdt_bytes
            .chunks_exact(core::mem::size_of::<GroupDesc>())
            .map(|c| *bytemuck::from_bytes(c))
            .collect();

        log::debug!(
            "mounted EXT2 volume: {} groups, {}-byte blocks, {}-byte inodes",
            group_count,
            block_size,
            inode_size
        );

        Ok(Self { dev, sb, groups, block_size, inode_size })
    }

    pub fn into_device(self) -> D {
        self.dev
    }

    fn gdt_block(&self) -> u64 {
        self.sb.first_data_block.get() as u64 + 1
    }

    fn flush_group(&mut self, group: u32) -> Result<(), Ext2Error> {
        let entry_size = core::mem::size_of::<GroupDesc>() as u64;
        let offset = self.gdt_block() * self.block_size as u64 + group as u64 * entry_size;
        self.dev.write_bytes(offset, bytemuck::bytes_of(&self.groups[group as usize]))?;
        Ok(())
    }

    fn flush_superblock(&mut self) -> Result<(), Ext2Error> {
        self.dev.write_bytes(SUPERBLOCK_OFFSET, bytemuck::bytes_of(&self.sb))?;
        Ok(())
    }

    fn read_block(&mut self, block_no: u32) -> Result<Vec<u8>, Ext2Error> {
        let mut buf = vec![0u8; self.block_size as usize];
        self.dev.read_bytes(block_no as u64 * self.block_size as u64, &mut buf)?;
        Ok(buf)
    }

    fn write_block(&mut self, block_no: u32, data: &[u8]) -> Result<(), Ext2Error> {
        self.dev.write_bytes(block_no as u64 * self.block_size as u64, data)?;
        Ok(())
    }

    fn inode_location(&self, ino: u32) -> (u32, u32) {
        let per_group = self.sb.inodes_per_group.get();
        let index0 = ino - 1;
        (index0 / per_group, index0 % per_group)
    }

    pub fn read_inode(&mut self, ino: u32) -> Result<Inode, Ext2Error> {
        let (group, index) = self.inode_location(ino);
        let table_block = self.groups[group as usize].inode_table.get() as u64;
        let offset = table_block * self.block_size as u64 + index as u64 * self.inode_size as u64;
        let mut buf = vec![0u8; core::mem::size_of::<Inode>()];
        self.dev.read_bytes(offset, &mut buf)?;
        Ok(*bytemuck::from_bytes(&buf))
    }

    fn write_inode(&mut self, ino: u32, inode: &Inode) -> Result<(), Ext2Error> {
        let (group, index) = self.inode_location(ino);
        let table_block = self.groups[group as usize].inode_table.get() as u64;
        let offset = table_block * self.block_size as u64 + index as u64 * self.inode_size as u64;
        self.dev.write_bytes(offset, bytemuck::bytes_of(inode))?;
        Ok(())
    }

    fn block_group_of(&self, block_no: u32) -> (u32, usize) {
        let first = self.sb.first_data_block.get();
        let per_group = self.sb.blocks_per_group.get();
        let rel = block_no - first;
        (rel / per_group, (rel % per_group) as usize)
    }

    fn blocks_in_group(&self, group: u32) -> u32 {
        let total = self.sb.blocks_count.get();
        let per_group = self.sb.blocks_per_group.get();
        let start = group * per_group;
        core::cmp::min(per_group, total - start)
    }

    /// Linear bitmap scan for a free block, starting at group 0 (spec.md
    /// §4.L4's allocator makes no locality effort — this is a boot-time
    /// shim, not a general-purpose file system).
    fn alloc_block(&mut self) -> Result<u32, Ext2Error> {
        let group_count = self.groups.len() as u32;
        for group in 0..group_count {
            let bitmap_block = self.groups[group as usize].block_bitmap.get();
            let mut bm = self.read_block(bitmap_block)?;
            let n = self.blocks_in_group(group) as usize;
            let Some(bit) = bitmap::find_clear(&bm, n) else { continue };

            bitmap::set(&mut bm, bit);
            self.write_block(bitmap_block, &bm)?;

            let g = &mut self.groups[group as usize];
            g.free_blocks_count = LE16::new(g.free_blocks_count.get() - 1);
            self.flush_group(group)?;

            self.sb.free_blocks_count = LE32::new(self.sb.free_blocks_count.get() - 1);
            self.flush_superblock()?;

            let block_no = self.sb.first_data_block.get() + group * self.sb.blocks_per_group.get() + bit as u32;
            let zero = vec![0u8; self.block_size as usize];
            self.write_block(block_no, &zero)?;
            return Ok(block_no);
        }
        Err(Ext2Error::OutOfSpace)
    }

    /// Frees a set of blocks, sweeping them group-by-group in ascending
    /// order so each group's bitmap is read and written at most once.
    fn free_blocks(&mut self, blocks: &mut [u32]) -> Result<(), Ext2Error> {
        blocks.sort_unstable();
        let mut i = 0;
        let mut total_freed = 0u32;
        while i < blocks.len() {
            let (group, _) = self.block_group_of(blocks[i]);
            let bitmap_block = self.groups[group as usize].block_bitmap.get();
            let mut bm = self.read_block(bitmap_block)?;
            let mut freed_here = 0u16;
            while i < blocks.len() && self.block_group_of(blocks[i]).0 == group {
                let (_, bit) = self.block_group_of(blocks[i]);
                bitmap::clear(&mut bm, bit);
                freed_here += 1;
                total_freed += 1;
                i += 1;
            }
            self.write_block(bitmap_block, &bm)?;
            let g = &mut self.groups[group as usize];
            g.free_blocks_count = LE16::new(g.free_blocks_count.get() + freed_here);
            self.flush_group(group)?;
        }
        self.sb.free_blocks_count = LE32::new(self.sb.free_blocks_count.get() + total_freed);
        self.flush_superblock()?;
        Ok(())
    }

    /// Linear bitmap scan for a free inode. Indices below `first_ino` are
    /// reserved and skipped, except `ROOT_INO` which is always already in
    /// use on a mounted volume.
    fn alloc_inode(&mut self) -> Result<u32, Ext2Error> {
        let first_ino = self.sb.first_ino();
        let per_group = self.sb.inodes_per_group.get();
        let group_count = self.groups.len() as u32;
        for group in 0..group_count {
            let bitmap_block = self.groups[group as usize].inode_bitmap.get();
            let mut bm = self.read_block(bitmap_block)?;
            for bit in 0..per_group as usize {
                let ino = group * per_group + bit as u32 + 1;
                if ino < first_ino && ino != ROOT_INO {
                    continue;
                }
                if bitmap::is_clear(&bm, bit) {
                    bitmap::set(&mut bm, bit);
                    self.write_block(bitmap_block, &bm)?;

                    let g = &mut self.groups[group as usize];
                    g.free_inodes_count = LE16::new(g.free_inodes_count.get() - 1);
                    self.flush_group(group)?;

                    self.sb.free_inodes_count = LE32::new(self.sb.free_inodes_count.get() - 1);
                    self.flush_superblock()?;
                    return Ok(ino);
                }
            }
        }
        Err(Ext2Error::OutOfSpace)
    }

    fn free_inode(&mut self, ino: u32) -> Result<(), Ext2Error> {
        let (group, index) = self.inode_location(ino);
        let bitmap_block = self.groups[group as usize].inode_bitmap.get();
        let mut bm = self.read_block(bitmap_block)?;
        bitmap::clear(&mut bm, index as usize);
        self.write_block(bitmap_block, &bm)?;

        let g = &mut self.groups[group as usize];
        g.free_inodes_count = LE16::new(g.free_inodes_count.get() + 1);
        self.flush_group(group)?;

        self.sb.free_inodes_count = LE32::new(self.sb.free_inodes_count.get() + 1);
        self.flush_superblock()?;
        Ok(())
    }

    fn read_indirect_block(&mut self, block_no: u32) -> Result<Vec<u32>, Ext2Error> {
        let raw = self.read_block(block_no)?;
        Ok(raw.chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap())).collect())
    }

    fn write_indirect_block(&mut self, block_no: u32, ptrs: &[u32]) -> Result<(), Ext2Error> {
        let mut raw = vec![0u8; self.block_size as usize];
        for (i, p) in ptrs.iter().enumerate() {
            raw[i * 4..i * 4 + 4].copy_from_slice(&p.to_le_bytes());
        }
        self.write_block(block_no, &raw)
    }

    /// Walks one pointer tree rooted at `block_no` at the given indirection
    /// `depth` (0 = direct data block, 1/2/3 = single/double/triple
    /// indirect), appending every visited block number to `out`. When
    /// `include_indirect` is set, the internal pointer blocks are included
    /// too (used by truncation to free them alongside the data).
    fn walk(&mut self, block_no: u32, depth: u32, include_indirect: bool, out: &mut Vec<u32>) -> Result<(), Ext2Error> {
        if block_no == 0 {
            return Ok(());
        }
        if depth == 0 {
            out.push(block_no);
            return Ok(());
        }
        if include_indirect {
            out.push(block_no);
        }
        let ptrs = self.read_indirect_block(block_no)?;
        for p in ptrs {
            self.walk(p, depth - 1, include_indirect, out)?;
        }
        Ok(())
    }

    /// Collects an inode's block numbers in file order: 12 direct pointers,
    /// then the single/double/triple indirect trees.
    fn file_blocks(&mut self, inode: &Inode, include_indirect: bool) -> Result<Vec<u32>, Ext2Error> {
        let mut out = Vec::new();
        for i in 0..EXT2_NDIR_BLOCKS {
            let b = inode.block[i].get();
            if b != 0 {
                out.push(b);
            }
        }
        self.walk(inode.block[EXT2_IND_BLOCK].get(), 1, include_indirect, &mut out)?;
        self.walk(inode.block[EXT2_DIND_BLOCK].get(), 2, include_indirect, &mut out)?;
        self.walk(inode.block[EXT2_TIND_BLOCK].get(), 3, include_indirect, &mut out)?;
        Ok(out)
    }

    /// Reads a regular file's full content, coalescing consecutive block
    /// numbers into a single multi-block read.
    pub fn load_file_from_inode(&mut self, inode: &Inode) -> Result<Vec<u8>, Ext2Error> {
        let size = inode.size.get() as usize;
        let blocks = self.file_blocks(inode, false)?;
        let mut out = Vec::with_capacity(size);

        let mut i = 0;
        while i < blocks.len() {
            let start = blocks[i];
            let mut run = 1usize;
            while i + run < blocks.len() && blocks[i + run] == start + run as u32 {
                run += 1;
            }
            let mut buf = vec![0u8; run * self.block_size as usize];
            self.dev.read_bytes(start as u64 * self.block_size as u64, &mut buf)?;
            out.extend_from_slice(&buf);
            i += run;
        }
        out.truncate(size);
        Ok(out)
    }

    /// Allocates and populates an inode's pointer structure (direct plus as
    /// many levels of indirection as `block_numbers.len()` requires),
    /// allocating indirect blocks as it goes.
    fn assign_blocks(&mut self, inode: &mut Inode, block_numbers: &[u32]) -> Result<(), Ext2Error> {
        let ptrs_per_block = (self.block_size / 4) as usize;
        let mut remaining = block_numbers;

        let direct = remaining.len().min(EXT2_NDIR_BLOCKS);
        for (i, &b) in remaining[..direct].iter().enumerate() {
            inode.block[i] = LE32::new(b);
        }
        remaining = &remaining[direct..];
        if remaining.is_empty() {
            return Ok(());
        }

        let single_cap = ptrs_per_block;
        let single = remaining.len().min(single_cap);
        let single_block = self.alloc_block()?;
        self.write_indirect_block(single_block, &remaining[..single])?;
        inode.block[EXT2_IND_BLOCK] = LE32::new(single_block);
        remaining = &remaining[single..];
        if remaining.is_empty() {
            return Ok(());
        }

        let double_cap = ptrs_per_block * ptrs_per_block;
        let double = remaining.len().min(double_cap);
        let dind_block = self.alloc_indirect_tree(&remaining[..double], ptrs_per_block)?;
        inode.block[EXT2_DIND_BLOCK] = LE32::new(dind_block);
        remaining = &remaining[double..];
        if remaining.is_empty() {
            return Ok(());
        }

        let tind_block = self.alloc_double_indirect_tree(remaining, ptrs_per_block)?;
        inode.block[EXT2_TIND_BLOCK] = LE32::new(tind_block);
        Ok(())
    }

    fn alloc_indirect_tree(&mut self, block_numbers: &[u32], ptrs_per_block: usize) -> Result<u32, Ext2Error> {
        let node = self.alloc_block()?;
        let mut ptrs = vec![0u32; ptrs_per_block];
        for (chunk_idx, chunk) in block_numbers.chunks(ptrs_per_block).enumerate() {
            let leaf = self.alloc_block()?;
            self.write_indirect_block(leaf, chunk)?;
            ptrs[chunk_idx] = leaf;
        }
        self.write_indirect_block(node, &ptrs)?;
        Ok(node)
    }

    fn alloc_double_indirect_tree(&mut self, block_numbers: &[u32], ptrs_per_block: usize) -> Result<u32, Ext2Error> {
        let node = self.alloc_block()?;
        let per_subtree = ptrs_per_block * ptrs_per_block;
        let mut ptrs = vec![0u32; ptrs_per_block];
        for (i, chunk) in block_numbers.chunks(per_subtree).enumerate() {
            ptrs[i] = self.alloc_indirect_tree(chunk, ptrs_per_block)?;
        }
        self.write_indirect_block(node, &ptrs)?;
        Ok(node)
    }

    /// Writes `content` as a new regular file, allocating data blocks and
    /// an inode, then inserting a directory entry for `name` in `parent`.
    /// `mode` is the permission bits only (spec.md §4.L4's `put-file(path,
    /// bytes, mode)`); the regular-file type bit is always added on top.
    pub fn put_file(&mut self, parent: u32, name: &str, content: &[u8], mode: u16) -> Result<u32, Ext2Error> {
        let n_blocks = content.len().div_ceil(self.block_size as usize).max(1);
        let mut block_numbers = Vec::with_capacity(n_blocks);
        for _ in 0..n_blocks {
            block_numbers.push(self.alloc_block()?);
        }
        for (i, chunk) in content.chunks(self.block_size as usize).enumerate() {
            let mut buf = vec![0u8; self.block_size as usize];
            buf[..chunk.len()].copy_from_slice(chunk);
            self.write_block(block_numbers[i], &buf)?;
        }

        let mut inode = Inode::zeroed();
        inode.mode = LE16::new(EXT2_S_IFREG | mode);
        inode.size = LE32::new(content.len() as u32);
        inode.links_count = LE16::new(1);
        inode.blocks = LE32::new((n_blocks * (self.block_size / 512) as usize) as u32);
        self.assign_blocks(&mut inode, &block_numbers)?;

        let ino = self.alloc_inode()?;
        self.write_inode(ino, &inode)?;

        self.insert_dir_entry(parent, name, ino, EXT2_FT_REG_FILE)?;
        Ok(ino)
    }

    /// Creates a new, empty subdirectory named `name` under `parent`.
    pub fn mkdir(&mut self, parent: u32, name: &str) -> Result<u32, Ext2Error> {
        let ino = self.alloc_inode()?;
        let block = self.alloc_block()?;

        let entries = vec![
            DirEntry { inode: ino, file_type: EXT2_FT_DIR, name: ".".to_string() },
            DirEntry { inode: parent, file_type: EXT2_FT_DIR, name: "..".to_string() },
        ];
        let body = dirent::rebuild_blocks(&entries, self.block_size as usize);
        self.write_block(block, &body)?;

        let mut inode = Inode::zeroed();
        inode.mode = LE16::new(EXT2_S_IFDIR | 0o755);
        inode.size = LE32::new(self.block_size);
        inode.links_count = LE16::new(2);
        inode.blocks = LE32::new((self.block_size / 512) as u32);
        inode.block[0] = LE32::new(block);
        self.write_inode(ino, &inode)?;

        self.insert_dir_entry(parent, name, ino, EXT2_FT_DIR)?;

        let mut parent_inode = self.read_inode(parent)?;
        parent_inode.links_count = LE16::new(parent_inode.links_count.get() + 1);
        self.write_inode(parent, &parent_inode)?;

        Ok(ino)
    }

    /// Removes a directory entry named `name` from `parent` and frees the
    /// target inode's data blocks, indirect blocks, and inode slot. Only
    /// regular files are supported (spec.md's boot-time use never removes
    /// directories).
    pub fn remove_file(&mut self, parent: u32, name: &str) -> Result<(), Ext2Error> {
        let entries = self.list_dir(parent)?;
        let target = entries.iter().find(|e| e.name == name).ok_or(Ext2Error::NotFound)?.clone();

        let inode = self.read_inode(target.inode)?;
        if inode.is_dir() {
            return Err(Ext2Error::IsADirectory);
        }

        let mut blocks = self.file_blocks(&inode, true)?;
        self.free_blocks(&mut blocks)?;
        self.free_inode(target.inode)?;

        let remaining: Vec<DirEntry> = entries.into_iter().filter(|e| e.name != name).collect();
        self.rewrite_dir_body(parent, &remaining)
    }

    fn insert_dir_entry(&mut self, parent: u32, name: &str, ino: u32, file_type: u8) -> Result<(), Ext2Error> {
        let mut entries = self.list_dir(parent)?;
        entries.push(DirEntry { inode: ino, file_type, name: name.to_string() });
        self.rewrite_dir_body(parent, &entries)
    }

    /// Rebuilds a directory's entire block-list body from `entries`,
    /// reusing already-allocated blocks where possible and freeing any
    /// surplus (or allocating more, if the new body grew past the old
    /// block count).
    fn rewrite_dir_body(&mut self, dir_ino: u32, entries: &[DirEntry]) -> Result<(), Ext2Error> {
        let mut inode = self.read_inode(dir_ino)?;
        let mut old_blocks = self.file_blocks(&inode, true)?;

        let body = dirent::rebuild_blocks(entries, self.block_size as usize);
        let needed = body.len() / self.block_size as usize;

        let mut new_blocks = Vec::with_capacity(needed);
        for _ in 0..needed.min(old_blocks.len()) {
            new_blocks.push(old_blocks.remove(0));
        }
        while new_blocks.len() < needed {
            new_blocks.push(self.alloc_block()?);
        }
        if !old_blocks.is_empty() {
            self.free_blocks(&mut old_blocks)?;
        }

        for (i, chunk) in body.chunks(self.block_size as usize).enumerate() {
            self.write_block(new_blocks[i], chunk)?;
        }

        for slot in inode.block.iter_mut() {
            *slot = LE32::new(0);
        }
        self.assign_blocks(&mut inode, &new_blocks)?;
        inode.size = LE32::new(body.len() as u32);
        inode.blocks = LE32::new((new_blocks.len() * (self.block_size / 512) as usize) as u32);
        self.write_inode(dir_ino, &inode)
    }

    /// Lists a directory's live entries (spec.md's `list-dir`).
    pub fn list_dir(&mut self, dir_ino: u32) -> Result<Vec<DirEntry>, Ext2Error> {
        let inode = self.read_inode(dir_ino)?;
        if !inode.is_dir() {
            return Err(Ext2Error::NotADirectory);
        }
        let body = self.load_file_from_inode(&inode)?;
        if body.len() % self.block_size as usize != 0 {
            return Err(Ext2Error::BadDirectorySize);
        }
        let mut out = Vec::new();
        for block in body.chunks(self.block_size as usize) {
            out.extend(dirent::parse_entries(block)?);
        }
        Ok(out)
    }

    /// Resolves an absolute path to an inode number, walking from the root
    /// and doing a case-sensitive linear search at each component (spec.md
    /// §4.L4's `stat-path`).
    pub fn stat_path(&mut self, path: &str) -> Result<u32, Ext2Error> {
        if !path.starts_with('/') {
            return Err(Ext2Error::NotAbsolute);
        }
        if path.len() > PATH_MAX {
            return Err(Ext2Error::PathTooLong);
        }
        self.resolve_relative(ROOT_INO, path)
    }

    fn resolve_relative(&mut self, base: u32, rel: &str) -> Result<u32, Ext2Error> {
        let mut current = base;
        for component in rel.split('/').filter(|c| !c.is_empty()) {
            let entries = self.list_dir(current)?;
            let hit = entries.iter().find(|e| e.name == component).ok_or(Ext2Error::NotFound)?;
            current = hit.inode;
        }
        Ok(current)
    }

    /// Recursively lists every regular file beneath `dir_ino`, returning
    /// paths relative to it (without a leading slash) in lexicographic
    /// order.
    fn recursive_list(&mut self, dir_ino: u32, prefix: &str, out: &mut Vec<String>) -> Result<(), Ext2Error> {
        let mut entries = self.list_dir(dir_ino)?;
        entries.retain(|e| e.name != "." && e.name != "..");
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        for entry in entries {
            let path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                alloc::format!("{prefix}/{}", entry.name)
            };
            if entry.file_type == EXT2_FT_DIR {
                self.recursive_list(entry.inode, &path, out)?;
            } else {
                out.push(path);
            }
        }
        Ok(())
    }

    /// Computes a combined SHA-1/SHA-256 digest over every regular file
    /// reachable from `dir_ino`, in lexicographic path order, for use as a
    /// measurement extend value (spec.md §4.L4's `recursive-hash`).
    pub fn recursive_hash(&mut self, dir_ino: u32) -> Result<([u8; 20], [u8; 32]), Ext2Error> {
        let mut paths = Vec::new();
        self.recursive_list(dir_ino, "", &mut paths)?;

        let mut sha1 = Sha1::new();
        let mut sha256 = Sha256::new();
        for rel in &paths {
            let ino = self.resolve_relative(dir_ino, rel)?;
            let inode = self.read_inode(ino)?;
            let content = self.load_file_from_inode(&inode)?;
            sha1.update(&content);
            sha256.update(&content);
        }

        Ok((sha1.finalize().into(), sha256.finalize().into()))
    }
}
