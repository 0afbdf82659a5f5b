use thiserror::Error;

use crate::controller::PatchState;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Pattern is empty")]
    EmptyPattern,

    #[error("Malformed pattern token '{0}'")]
    MalformedToken(String),

    #[error("Memory region at {base:#x} (length {length:#x}) is not readable")]
    RegionUnreadable { base: u64, length: usize },

    #[error("Module image unavailable: {0}")]
    ModuleUnavailable(String),

    #[error("Failed to read {size} bytes at address {address:#x}")]
    ReadFailed { address: u64, size: usize },

    #[error("Failed to write {size} bytes at address {address:#x}")]
    WriteFailed { address: u64, size: usize },

    #[error("Patch cannot be enabled in state {0}")]
    NotReady(PatchState),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check whether this error came from a failed memory access.
    pub fn is_access_failure(&self) -> bool {
        matches!(
            self,
            Error::ReadFailed { .. } | Error::WriteFailed { .. } | Error::RegionUnreadable { .. }
        )
    }
}
