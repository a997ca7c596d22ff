#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TpmError {
    #[error("PCR index is out of the 0..24 range")]
    BadPcrIndex,
    #[error("sealed blob is malformed")]
    BadBlob,
    #[error("sealed blob's policy mask does not match the requested unseal policy")]
    PolicyMismatch,
    #[error("sealed blob does not unseal under the current PCR state")]
    PolicyNotSatisfied,
    #[error("SRK handle acquisition failed")]
    NoSrk,
    #[error("PE image is malformed")]
    BadPeImage,
}
