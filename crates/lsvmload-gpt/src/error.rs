/// The error taxonomy for this crate (spec.md §7's `Format`/`Io`/`Capacity`
/// kinds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GptError {
    #[error("block I/O error")]
    Io,
    #[error("GPT header signature is not \"EFI PART\"")]
    BadSignature,
    #[error("GPT header checksum does not match its contents")]
    BadHeaderChecksum,
    #[error("GPT partition entry array checksum does not match its contents")]
    BadEntryArrayChecksum,
    #[error("GPT has no free partition entry slot")]
    NoFreeSlot,
    #[error("GPT has no existing partitions to extend from")]
    NoExistingPartitions,
    #[error("GPT already has a BOOTFS partition")]
    AlreadyPresent,
    #[error("new partition's ending LBA would overflow the header's usable range")]
    Overflow,
    #[error("device path has no HardDrive node to clone")]
    NoHardDriveNode,
    #[error("device path node is truncated")]
    TruncatedDevicePath,
}

impl From<lsvmload_block::BdevError> for GptError {
    fn from(_: lsvmload_block::BdevError) -> Self {
        Self::Io
    }
}
