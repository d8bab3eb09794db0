use epw::ArchiveError;
use thiserror::Error;

use crate::base64::DecodeError;

/// Shown on the surface after a failed load.
pub const DOWNLOAD_FAILED: &str = "Failed to download EPW file!";
pub const ARCHIVE_INVALID: &str = "EPW file is invalid!";
pub const RETRY_HINT: &str = "Try again later";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid loader options: {0}")]
    Config(String),

    #[error("container {0:?} is not a known surface")]
    UnknownContainer(String),

    #[error("couldn't acquire {source_name}: {reason}")]
    AcquisitionFailed { source_name: String, reason: String },

    #[error("invalid inline payload: {0}")]
    InvalidEncoding(#[from] DecodeError),

    #[error("acquisition was cancelled")]
    Cancelled,

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("archive has no {0}")]
    MissingComponent(String),

    #[error("checksum mismatch for {path}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        path:     String,
        expected: u32,
        actual:   u32,
    },
}

/// Where a failed load gave up, deciding what the surface reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Acquisition,
    Validation,
}
impl FailureStage {
    pub fn message(self) -> &'static str {
        match self {
            FailureStage::Acquisition => DOWNLOAD_FAILED,
            FailureStage::Validation => ARCHIVE_INVALID,
        }
    }
}

impl LoadError {
    pub(crate) fn acquisition(source_name: impl Into<String>, reason: impl ToString) -> Self {
        LoadError::AcquisitionFailed {
            source_name: source_name.into(),
            reason:      reason.to_string(),
        }
    }

    /// `None` for errors raised before a surface was claimed.
    ///
    /// Only buffers too short for any header count as a failed download.
    /// Layouts are picked by magic and directory archives can be smaller
    /// than the 384 byte fixed-slot header, so a short buffer with an
    /// unknown magic is reported as invalid, not as a failed download.
    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            LoadError::Config(_) | LoadError::UnknownContainer(_) => None,
            LoadError::AcquisitionFailed { .. }
            | LoadError::InvalidEncoding(_)
            | LoadError::Cancelled
            | LoadError::Archive(ArchiveError::TooShort { .. }) => Some(FailureStage::Acquisition),
            _ => Some(FailureStage::Validation),
        }
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
