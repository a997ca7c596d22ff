#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VfatError {
    #[error("block I/O error")]
    Io,
    #[error("unrecognized boot sector signature")]
    BadBootSector,
    #[error("path is not absolute")]
    NotAbsolute,
    #[error("path component does not fit the 8.3 short-name limit")]
    NameTooLong,
    #[error("no such file or directory")]
    NotFound,
    #[error("path component is not a directory")]
    NotADirectory,
    #[error("directory has no free entry and cannot grow")]
    DirectoryFull,
    #[error("volume has no free clusters")]
    OutOfSpace,
}

impl From<lsvmload_block::BdevError> for VfatError {
    fn from(_: lsvmload_block::BdevError) -> Self {
        Self::Io
    }
}
