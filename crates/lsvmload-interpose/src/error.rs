/// The error taxonomy for this crate (spec.md §7's `Io`/`Capacity`/
/// `NotFound` kinds, plus the redesigned `OutOfBounds` spec.md §9's design
/// notes call for in place of the original's silent excess-write handling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InterposeError {
    #[error("block I/O error")]
    Io,
    #[error("region is read-only")]
    WriteProtected,
    #[error("LBA lies outside every installed region and the backing root device")]
    OutOfBounds,
    #[error("region table already holds MAX_REGIONS entries")]
    TooManyRegions,
    #[error("new region's LBA range overlaps an already-installed region")]
    OverlappingRegion,
    #[error("no file with that name is preloaded")]
    NotFound,
    #[error("operation is not supported by the ESP shim")]
    Unsupported,
}

impl From<lsvmload_block::BdevError> for InterposeError {
    fn from(err: lsvmload_block::BdevError) -> Self {
        match err {
            lsvmload_block::BdevError::WriteProtected => Self::WriteProtected,
            lsvmload_block::BdevError::OutOfBounds => Self::OutOfBounds,
            lsvmload_block::BdevError::Io => Self::Io,
        }
    }
}
