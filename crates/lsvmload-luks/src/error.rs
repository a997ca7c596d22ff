use alloc::string::String;

use lsvmload_block::BdevError;

use crate::header::HeaderError;

/// The error taxonomy for this crate, matching the `Format`/`Crypto`/`Auth`/
/// `Io` kinds of spec.md §7. Wrapped with `#[from]` as it propagates up into
/// `lsvmload::OrchestratorError`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LuksError {
    #[error("block I/O error: {0}")]
    Io(#[from] BdevError),
    #[error("malformed LUKS header: {0}")]
    Format(#[from] HeaderError),
    #[error("unsupported cipher: {0}")]
    UnsupportedCipher(String),
    #[error("unsupported hash spec: {0}")]
    UnsupportedHash(String),
    #[error("no key slot accepted the supplied passphrase")]
    BadPassphrase,
}
