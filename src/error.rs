use thiserror::Error;

use crate::cursor::CursorError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive is too short: {length} bytes, at least {minimum} required")]
    TooShort { length: usize, minimum: usize },

    #[error("archive magic mismatch")]
    BadMagic,

    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u32),

    #[error("unsupported archive flags {0:#x}")]
    UnsupportedFlags(u32),

    #[error("archive declares {declared} bytes but is {actual} bytes long")]
    LengthMismatch { declared: u32, actual: usize },

    #[error("archive contains an invalid offset (component: {component})")]
    InvalidOffset { component: String },

    #[error("invalid entry path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("duplicate entry path {0:?}")]
    DuplicatePath(String),

    #[error("checksum mismatch for {path}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        path:     String,
        expected: u32,
        actual:   u32,
    },

    #[error("archive would exceed the 4 GiB format limit")]
    TooLarge,

    #[error("couldn't compress {path}: {source}")]
    Compress {
        path:   String,
        source: std::io::Error,
    },

    #[error("couldn't decompress {path}: {source}")]
    Decompress {
        path:   String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

impl ArchiveError {
    pub(crate) fn invalid_offset(component: impl Into<String>) -> Self {
        ArchiveError::InvalidOffset {
            component: component.into(),
        }
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
