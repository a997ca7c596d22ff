//! The one error type the orchestrator's `main` matches on to choose the
//! fatal-vs-recoverable path (spec.md §7). Every lower crate's error
//! wraps in via `#[from]`, matching the propagation policy in `hadris-fat`
//! where a top-level `FileSystemError` accumulates `#[from]` conversions
//! from its submodules.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("block I/O error: {0}")]
    Block(#[from] lsvmload_block::BdevError),
    #[error("LUKS error: {0}")]
    Luks(#[from] lsvmload_luks::LuksError),
    #[error("EXT2 error: {0}")]
    Ext2(#[from] lsvmload_ext2::Ext2Error),
    #[error("VFAT error: {0}")]
    Vfat(#[from] lsvmload_vfat::VfatError),
    #[error("initrd error: {0}")]
    Cpio(#[from] lsvmload_cpio::CpioError),
    #[error("TPM error: {0}")]
    Tpm(#[from] lsvmload_tpm::TpmError),
    #[error("GPT error: {0}")]
    Gpt(#[from] lsvmload_gpt::GptError),
    #[error("LUKS header error: {0}")]
    LuksHeader(#[from] lsvmload_luks::HeaderError),
    #[error("interposer error: {0}")]
    Interpose(#[from] lsvmload_interpose::InterposeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("passphrase rejected after 3 attempts")]
    PassphraseExhausted,
    #[error("no TPM is present and the configuration requires one")]
    TpmRequired,
    #[error("specialization blob failed integrity verification")]
    SpecializationAuthFailed,
    #[error("specialization blob is malformed: {0}")]
    SpecializationFormat(&'static str),
    #[error("PE image failed validation")]
    PeValidation,
    #[error("PCR cap failed to change the PCR value")]
    CapDidNotChange,
    #[error("interposer install failed")]
    InterposerInstall,
}
