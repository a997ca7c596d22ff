//! The mounted synthetic FAT volume: `mkdir`, `put_file`, `stat`,
//! `get_file`, `dir` (spec.md §4.L5). Grounded on `hadris-fat/src/fs.rs`'s
//! split between a thin mount struct and the cluster-chain walk it drives,
//! simplified to the synthetic, near-empty-shell case: no long-name
//! creation, no deletion, no fragmentation-aware allocation.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use bytemuck::Zeroable;
use lsvmload_block::{Bdev, BdevExt};
use lsvmload_common::types::{Endian, LittleEndian, U16, U32};

use crate::error::VfatError;
use crate::fat::FatTable;
use crate::structures::{denormalize_short_name, normalize_short_name, Bpb, FatType, FileAttributes, ShortDirEntry};

type LE16 = U16<LittleEndian>;
type LE32 = U32<LittleEndian>;

const SHORT_ENTRY_LEN: usize = core::mem::size_of::<ShortDirEntry>();

/// A resolved directory body: either the fixed-size FAT12/16 root region
/// (no cluster chain, cannot grow) or a normal cluster chain (every
/// subdirectory, and the FAT32 root).
#[derive(Clone, Copy)]
enum DirLocation {
    FixedRoot,
    Chain(u32),
}

/// One live entry in a listed directory.
#[derive(Debug, Clone)]
pub struct FatEntry {
    pub name: String,
    pub attrs: FileAttributes,
    pub cluster: u32,
    pub size: u32,
}

pub struct Vfat<D: Bdev> {
    dev: D,
    bpb: Bpb,
    fat_type: FatType,
    fat: FatTable,
}

impl<D: Bdev> Vfat<D> {
    pub fn open(mut dev: D) -> Result<Self, VfatError> {
        let mut sector = [0u8; 512];
        dev.read_bytes(0, &mut sector)?;
        if sector[510] != 0x55 || sector[511] != 0xAA {
            return Err(VfatError::BadBootSector);
        }
        let bpb: Bpb = *bytemuck::from_bytes(&sector[..core::mem::size_of::<Bpb>()]);
        let fat_type = bpb.fat_type();

        let fat_offset = bpb.reserved_sector_count.get() as u64 * bpb.bytes_per_sector() as u64;
        let fat_len = (bpb.sectors_per_fat() * bpb.bytes_per_sector()) as usize;
        let mut fat_bytes = vec![0u8; fat_len];
        dev.read_bytes(fat_offset, &mut fat_bytes)?;
        let fat = FatTable::new(fat_type, fat_bytes);

        log::debug!(
            "mounted {:?} volume: {} clusters, {}-byte clusters",
            fat_type,
            bpb.cluster_count(),
            bpb.bytes_per_cluster()
        );

        Ok(Self { dev, bpb, fat_type, fat })
    }

    pub fn into_device(self) -> D {
        self.dev
    }

    fn flush_fat(&mut self) -> Result<(), VfatError> {
        let sector_bytes = self.bpb.bytes_per_sector() as u64;
        let sectors_per_fat = self.bpb.sectors_per_fat() as u64;
        for mirror in 0..self.bpb.fat_count as u64 {
            let offset =
                (self.bpb.reserved_sector_count.get() as u64 + mirror * sectors_per_fat) * sector_bytes;
            self.dev.write_bytes(offset, self.fat.bytes())?;
        }
        Ok(())
    }

    fn alloc_cluster(&mut self) -> Result<u32, VfatError> {
        let cluster = self.fat.find_free(self.bpb.cluster_count()).ok_or(VfatError::OutOfSpace)?;
        self.fat.set(cluster, self.fat_type.eoc());
        self.flush_fat()?;
        let zero = vec![0u8; self.bpb.bytes_per_cluster() as usize];
        self.write_cluster(cluster, &zero)?;
        Ok(cluster)
    }

    fn read_cluster(&mut self, cluster: u32) -> Result<Vec<u8>, VfatError> {
        let offset = self.bpb.cluster_to_sector(cluster) as u64 * self.bpb.bytes_per_sector() as u64;
        let mut buf = vec![0u8; self.bpb.bytes_per_cluster() as usize];
        self.dev.read_bytes(offset, &mut buf)?;
        Ok(buf)
    }

    fn write_cluster(&mut self, cluster: u32, data: &[u8]) -> Result<(), VfatError> {
        let offset = self.bpb.cluster_to_sector(cluster) as u64 * self.bpb.bytes_per_sector() as u64;
        self.dev.write_bytes(offset, data)?;
        Ok(())
    }

    fn read_dir_bytes(&mut self, loc: DirLocation) -> Result<Vec<u8>, VfatError> {
        match loc {
            DirLocation::FixedRoot => {
                let offset = self.bpb.root_dir_sector() as u64 * self.bpb.bytes_per_sector() as u64;
                let mut buf = vec![0u8; (self.bpb.root_dir_sectors() * self.bpb.bytes_per_sector()) as usize];
                self.dev.read_bytes(offset, &mut buf)?;
                Ok(buf)
            }
            DirLocation::Chain(first) => {
                let mut out = Vec::new();
                for cluster in self.fat.chain(first) {
                    out.extend(self.read_cluster(cluster)?);
                }
                Ok(out)
            }
        }
    }

    fn parse_dir(&self, body: &[u8]) -> Vec<(usize, FatEntry)> {
        let mut out = Vec::new();
        for (slot, raw) in body.chunks_exact(SHORT_ENTRY_LEN).enumerate() {
            let entry: ShortDirEntry = *bytemuck::from_bytes(raw);
            if entry.is_end_marker() {
                break;
            }
            if entry.is_free() || entry.is_long_name() {
                continue;
            }
            let name = denormalize_short_name(&entry.name);
            out.push((
                slot,
                FatEntry { name, attrs: entry.attrs(), cluster: entry.cluster(), size: entry.size.get() },
            ));
        }
        out
    }

    /// Lists a directory's live short-name entries.
    pub fn list_dir(&mut self, loc_cluster: Option<u32>) -> Result<Vec<FatEntry>, VfatError> {
        let loc = match loc_cluster {
            None => DirLocation::FixedRoot,
            Some(c) => DirLocation::Chain(c),
        };
        let body = self.read_dir_bytes(loc)?;
        Ok(self.parse_dir(&body).into_iter().map(|(_, e)| e).collect())
    }

    /// Inserts a new short-name entry into the directory rooted at
    /// `loc_cluster` (`None` for the fixed FAT12/16 root), growing a
    /// cluster-chain directory by one cluster if no free slot remains.
    fn insert_entry(&mut self, loc_cluster: Option<u32>, entry: ShortDirEntry) -> Result<(), VfatError> {
        let loc = match loc_cluster {
            None => DirLocation::FixedRoot,
            Some(c) => DirLocation::Chain(c),
        };
        let mut body = self.read_dir_bytes(loc)?;

        let mut target_slot = None;
        for (slot, raw) in body.chunks_exact(SHORT_ENTRY_LEN).enumerate() {
            let e: ShortDirEntry = *bytemuck::from_bytes(raw);
            if e.is_free() {
                target_slot = Some(slot);
                break;
            }
        }

        let slot = match target_slot {
            Some(s) => s,
            None => match loc {
                DirLocation::FixedRoot => return Err(VfatError::DirectoryFull),
                DirLocation::Chain(first) => {
                    let last = *self.fat.chain(first).last().unwrap();
                    let new_cluster = self.alloc_cluster()?;
                    self.fat.set(last, new_cluster);
                    self.flush_fat()?;
                    let old_len = body.len();
                    body.resize(old_len + self.bpb.bytes_per_cluster() as usize, 0);
                    old_len / SHORT_ENTRY_LEN
                }
            },
        };

        body[slot * SHORT_ENTRY_LEN..(slot + 1) * SHORT_ENTRY_LEN].copy_from_slice(bytemuck::bytes_of(&entry));
        self.write_dir_bytes(loc, &body)
    }

    fn write_dir_bytes(&mut self, loc: DirLocation, body: &[u8]) -> Result<(), VfatError> {
        match loc {
            DirLocation::FixedRoot => {
                let offset = self.bpb.root_dir_sector() as u64 * self.bpb.bytes_per_sector() as u64;
                self.dev.write_bytes(offset, body)?;
                Ok(())
            }
            DirLocation::Chain(first) => {
                let clusters = self.fat.chain(first);
                let cluster_bytes = self.bpb.bytes_per_cluster() as usize;
                for (i, cluster) in clusters.iter().enumerate() {
                    let chunk = &body[i * cluster_bytes..(i + 1) * cluster_bytes];
                    self.write_cluster(*cluster, chunk)?;
                }
                Ok(())
            }
        }
    }

    fn dir_cluster_for(entry: &FatEntry) -> Option<u32> {
        if entry.attrs.contains(FileAttributes::DIRECTORY) {
            Some(entry.cluster)
        } else {
            None
        }
    }

    /// Resolves an absolute path to its containing directory cluster
    /// (`None` for the root) and final matching entry, if any.
    fn resolve(&mut self, path: &str) -> Result<(Option<u32>, Option<FatEntry>), VfatError> {
        if !path.starts_with('/') {
            return Err(VfatError::NotAbsolute);
        }
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        if components.is_empty() {
            return Ok((None, None));
        }

        let mut parent: Option<u32> = None;
        for (i, component) in components.iter().enumerate() {
            let entries = self.list_dir(parent)?;
            let hit = entries.into_iter().find(|e| e.name.eq_ignore_ascii_case(component));
            if i + 1 == components.len() {
                return Ok((parent, hit));
            }
            let Some(entry) = hit else { return Err(VfatError::NotFound) };
            parent = Self::dir_cluster_for(&entry).ok_or(VfatError::NotADirectory)?.into();
        }
        unreachable!()
    }

    /// Returns the matching entry's metadata, if any (spec.md's `stat`).
    pub fn stat(&mut self, path: &str) -> Result<FatEntry, VfatError> {
        let (_, entry) = self.resolve(path)?;
        entry.ok_or(VfatError::NotFound)
    }

    /// Reads a file's full content (spec.md's `get_file`).
    pub fn get_file(&mut self, path: &str) -> Result<Vec<u8>, VfatError> {
        let entry = self.stat(path)?;
        if entry.attrs.contains(FileAttributes::DIRECTORY) {
            return Err(VfatError::NotADirectory);
        }
        let mut out = Vec::with_capacity(entry.size as usize);
        for cluster in self.fat.chain(entry.cluster) {
            out.extend(self.read_cluster(cluster)?);
        }
        out.truncate(entry.size as usize);
        Ok(out)
    }

    /// Lists a directory's entries (spec.md's `dir`).
    pub fn dir(&mut self, path: &str) -> Result<Vec<FatEntry>, VfatError> {
        if path == "/" {
            return self.list_dir(None);
        }
        let entry = self.stat(path)?;
        let cluster = Self::dir_cluster_for(&entry).ok_or(VfatError::NotADirectory)?;
        self.list_dir(Some(cluster))
    }

    fn split_parent(path: &str) -> (&str, &str) {
        match path.rsplit_once('/') {
            Some(("", name)) => ("/", name),
            Some((parent, name)) => (parent, name),
            None => ("/", path),
        }
    }

    fn parent_cluster(&mut self, parent_path: &str) -> Result<Option<u32>, VfatError> {
        if parent_path == "/" {
            return Ok(None);
        }
        let entry = self.stat(parent_path)?;
        Ok(Some(Self::dir_cluster_for(&entry).ok_or(VfatError::NotADirectory)?))
    }

    /// Writes `content` as a new file at `path`, allocating a cluster
    /// chain and inserting a short-name entry in the parent directory
    /// (spec.md's `put_file`).
    pub fn put_file(&mut self, path: &str, content: &[u8]) -> Result<(), VfatError> {
        if !path.starts_with('/') {
            return Err(VfatError::NotAbsolute);
        }
        let (parent_path, name) = Self::split_parent(path);
        let short_name = normalize_short_name(name).ok_or(VfatError::NameTooLong)?;
        let parent = self.parent_cluster(parent_path)?;

        let cluster_bytes = self.bpb.bytes_per_cluster() as usize;
        let n_clusters = content.len().div_ceil(cluster_bytes).max(1);
        let mut clusters = Vec::with_capacity(n_clusters);
        for _ in 0..n_clusters {
            clusters.push(self.alloc_cluster()?);
        }
        for i in 0..clusters.len() - 1 {
            self.fat.set(clusters[i], clusters[i + 1]);
        }
        self.fat.set(*clusters.last().unwrap(), self.fat_type.eoc());
        self.flush_fat()?;

        for (i, chunk) in content.chunks(cluster_bytes).enumerate() {
            let mut buf = vec![0u8; cluster_bytes];
            buf[..chunk.len()].copy_from_slice(chunk);
            self.write_cluster(clusters[i], &buf)?;
        }

        let mut entry = ShortDirEntry::zeroed();
        entry.name = short_name;
        entry.attributes = FileAttributes::ARCHIVE.bits();
        entry.size = LE32::new(content.len() as u32);
        entry.set_cluster(clusters[0]);

        self.insert_entry(parent, entry)
    }

    /// Creates a new, empty subdirectory at `path` (spec.md's `mkdir`).
    pub fn mkdir(&mut self, path: &str) -> Result<(), VfatError> {
        if !path.starts_with('/') {
            return Err(VfatError::NotAbsolute);
        }
        let (parent_path, name) = Self::split_parent(path);
        let short_name = normalize_short_name(name).ok_or(VfatError::NameTooLong)?;
        let parent = self.parent_cluster(parent_path)?;

        let new_cluster = self.alloc_cluster()?;

        let mut dot = ShortDirEntry::zeroed();
        dot.name = [b'.', b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' '];
        dot.attributes = FileAttributes::DIRECTORY.bits();
        dot.set_cluster(new_cluster);

        let mut dotdot = ShortDirEntry::zeroed();
        dotdot.name = [b'.', b'.', b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' '];
        dotdot.attributes = FileAttributes::DIRECTORY.bits();
        dotdot.set_cluster(parent.unwrap_or(0));

        let mut body = vec![0u8; self.bpb.bytes_per_cluster() as usize];
        body[0..SHORT_ENTRY_LEN].copy_from_slice(bytemuck::bytes_of(&dot));
        body[SHORT_ENTRY_LEN..2 * SHORT_ENTRY_LEN].copy_from_slice(bytemuck::bytes_of(&dotdot));
        self.write_cluster(new_cluster, &body)?;

        let mut entry = ShortDirEntry::zeroed();
        entry.name = short_name;
        entry.attributes = FileAttributes::DIRECTORY.bits();
        entry.set_cluster(new_cluster);

        self.insert_entry(parent, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsvmload_block::VecBdev;

    /// Builds a minimal FAT image: 512-byte sectors, 1 reserved sector, 2
    /// FAT mirrors, a fixed root directory, no data yet. Small enough that
    /// the cluster count falls under the FAT12 threshold.
    fn format_volume(total_sectors: u32, sectors_per_fat: u32, root_entries: u16) -> VecBdev {
        let mut dev = VecBdev::new(total_sectors as usize);

        let mut bpb = Bpb::zeroed();
        bpb.bytes_per_sector = LE16::new(512);
        bpb.sectors_per_cluster = 1;
        bpb.reserved_sector_count = LE16::new(1);
        bpb.fat_count = 2;
        bpb.root_entry_count = LE16::new(root_entries);
        bpb.total_sectors_16 = LE16::new(total_sectors as u16);
        bpb.media_type = 0xF8;
        bpb.sectors_per_fat_16 = LE16::new(sectors_per_fat);

        let mut raw = vec![0u8; 512];
        raw[..core::mem::size_of::<Bpb>()].copy_from_slice(bytemuck::bytes_of(&bpb));
        raw[510] = 0x55;
        raw[511] = 0xAA;
        dev.write_bytes(0, &raw).unwrap();

        dev
    }

    #[test]
    fn opens_a_formatted_volume() {
        let dev = format_volume(128, 1, 16);
        let fs = Vfat::open(dev).unwrap();
        assert_eq!(fs.fat_type, FatType::Fat12);
    }

    #[test]
    fn rejects_missing_boot_signature() {
        let mut dev = format_volume(128, 1, 16);
        dev.write_bytes(510, &[0, 0]).unwrap();
        assert_eq!(Vfat::open(dev).unwrap_err(), VfatError::BadBootSector);
    }

    #[test]
    fn put_file_then_get_file_round_trips() {
        let dev = format_volume(128, 1, 16);
        let mut fs = Vfat::open(dev).unwrap();
        let content = vec![0xABu8; 600];
        fs.put_file("/grub.cfg", &content).unwrap();
        let loaded = fs.get_file("/grub.cfg").unwrap();
        assert_eq!(loaded, content);
    }

    #[test]
    fn mkdir_then_nested_put_file() {
        let dev = format_volume(128, 1, 16);
        let mut fs = Vfat::open(dev).unwrap();
        fs.mkdir("/boot").unwrap();
        fs.put_file("/boot/grub.cfg", b"timeout=0").unwrap();
        let loaded = fs.get_file("/boot/grub.cfg").unwrap();
        assert_eq!(loaded, b"timeout=0");
    }

    #[test]
    fn stat_reports_directory_attribute() {
        let dev = format_volume(128, 1, 16);
        let mut fs = Vfat::open(dev).unwrap();
        fs.mkdir("/boot").unwrap();
        let entry = fs.stat("/boot").unwrap();
        assert!(entry.attrs.contains(FileAttributes::DIRECTORY));
    }

    #[test]
    fn dir_lists_root_contents() {
        let dev = format_volume(128, 1, 16);
        let mut fs = Vfat::open(dev).unwrap();
        fs.put_file("/a.txt", b"x").unwrap();
        fs.put_file("/b.txt", b"y").unwrap();
        let listed = fs.dir("/").unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let dev = format_volume(128, 1, 16);
        let mut fs = Vfat::open(dev).unwrap();
        fs.put_file("/grub.cfg", b"x").unwrap();
        assert!(fs.stat("/GRUB.CFG").is_ok());
    }
}
