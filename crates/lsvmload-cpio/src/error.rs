#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CpioError {
    #[error("I/O error reading or writing an archive buffer")]
    Io,
    #[error("bad CPIO newc magic")]
    BadMagic,
    #[error("archive header field is not valid hexadecimal")]
    BadHeaderField,
    #[error("archive is truncated before the declared name or data length")]
    Truncated,
    #[error("initrd has more segments than MAX_SUBFILES")]
    TooManySegments,
    #[error("segment is neither CPIO nor a supported compressor")]
    UnknownSegment,
    #[error("compressed segment failed to decompress")]
    Decompress,
}
