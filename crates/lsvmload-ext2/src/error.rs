/// The error taxonomy for this crate (spec.md §7's `Format`/`Io`/`NotFound`/
/// `Capacity`/`Invariant` kinds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Ext2Error {
    #[error("block I/O error")]
    Io,
    #[error("bad EXT2 magic")]
    BadMagic,
    #[error("unsupported EXT2 revision (need rev >= 1)")]
    UnsupportedRevision,
    #[error("on-disk inode size is smaller than the minimal 128-byte inode layout")]
    BadInodeSize,
    #[error("bitmap size is inconsistent with the superblock")]
    BadBitmapSize,
    #[error("directory body size is not a multiple of the block size")]
    BadDirectorySize,
    #[error("a directory entry's rec_len does not tile its block")]
    BadRecLen,
    #[error("path is not absolute")]
    NotAbsolute,
    #[error("path exceeds PATH_MAX")]
    PathTooLong,
    #[error("no such file or directory")]
    NotFound,
    #[error("path component is not a directory")]
    NotADirectory,
    #[error("path names an existing directory where a file was expected")]
    IsADirectory,
    #[error("file system has no free blocks or inodes")]
    OutOfSpace,
}

impl From<lsvmload_block::BdevError> for Ext2Error {
    fn from(_: lsvmload_block::BdevError) -> Self {
        Self::Io
    }
}
