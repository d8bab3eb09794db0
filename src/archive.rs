use std::borrow::Cow;

use indexmap::IndexMap;

use crate::{
    error::{ArchiveError, ArchiveResult},
    types::{Flags, Slot},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Slots,
    Directory,
    Legacy,
}
impl Layout {
    pub fn name(self) -> &'static str {
        match self {
            Layout::Slots => "slots",
            Layout::Directory => "directory",
            Layout::Legacy => "legacy",
        }
    }
}

/// A validated archive borrowing the buffer it was parsed from.
#[derive(Debug)]
pub enum Archive<'a> {
    Slots(SlotArchive<'a>),
    Directory(DirectoryArchive<'a>),
}
impl<'a> Archive<'a> {
    /// Parse any layout of the format family, see [`crate::parse`].
    pub fn parse(bytes: &'a [u8]) -> ArchiveResult<Self> { crate::parse::parse(bytes) }

    pub fn len(&self) -> usize {
        match self {
            Archive::Slots(archive) => archive.len(),
            Archive::Directory(archive) => archive.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn layout(&self) -> Layout {
        match self {
            Archive::Slots(_) => Layout::Slots,
            Archive::Directory(archive) => archive.layout(),
        }
    }

    /// Every component whose stored checksum didn't match, as
    /// [`ArchiveError::ChecksumMismatch`].
    pub fn checksum_failures(&self) -> Vec<ArchiveError> {
        match self {
            Archive::Slots(_) => Vec::new(),
            Archive::Directory(archive) => archive
                .components()
                .filter_map(|component| component.verify().err())
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlotArchive<'a> {
    pub(crate) length:    usize,
    pub(crate) splash:    &'a [u8],
    pub(crate) mime:      &'a [u8],
    pub(crate) script:    &'a [u8],
    pub(crate) secondary: &'a [u8],
}
impl<'a> SlotArchive<'a> {
    pub fn len(&self) -> usize { self.length }

    pub fn is_empty(&self) -> bool { self.length == 0 }

    pub fn slot(&self, slot: Slot) -> &'a [u8] {
        match slot {
            Slot::Splash => self.splash,
            Slot::MimeType => self.mime,
            Slot::Script => self.script,
            Slot::Secondary => self.secondary,
        }
    }

    /// The splash MIME type, `None` when the slot is empty or blank.
    pub fn mime_type(&self) -> Option<String> {
        let mime = String::from_utf8_lossy(self.mime);
        let mime = mime.trim();
        if mime.is_empty() {
            None
        } else {
            Some(mime.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checksum {
    Absent,
    Valid(u32),
    Mismatch { expected: u32, actual: u32 },
}

#[derive(Debug, Clone)]
pub struct Component<'a> {
    pub(crate) path:       &'a str,
    pub(crate) stored:     &'a [u8],
    pub(crate) compressed: bool,
    pub(crate) checksum:   Checksum,
}
impl<'a> Component<'a> {
    pub fn path(&self) -> &'a str { self.path }

    /// The payload as stored in the archive, possibly compressed.
    pub fn stored(&self) -> &'a [u8] { self.stored }

    pub fn is_compressed(&self) -> bool { self.compressed }

    pub fn checksum(&self) -> Checksum { self.checksum }

    pub fn verify(&self) -> ArchiveResult<()> {
        match self.checksum {
            Checksum::Mismatch { expected, actual } => Err(ArchiveError::ChecksumMismatch {
                path: self.path.to_string(),
                expected,
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// The uncompressed payload, inflated when the archive is compressed.
    pub fn contents(&self) -> ArchiveResult<Cow<'a, [u8]>> {
        if !self.compressed {
            return Ok(Cow::Borrowed(self.stored));
        }
        zstd::decode_all(self.stored)
            .map(Cow::Owned)
            .map_err(|source| ArchiveError::Decompress {
                path: self.path.to_string(),
                source,
            })
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryArchive<'a> {
    pub(crate) layout:     Layout,
    pub(crate) length:     usize,
    pub(crate) flags:      Flags,
    pub(crate) components: IndexMap<&'a str, Component<'a>>,
}
impl<'a> DirectoryArchive<'a> {
    pub fn layout(&self) -> Layout { self.layout }

    pub fn len(&self) -> usize { self.length }

    pub fn is_empty(&self) -> bool { self.length == 0 }

    pub fn flags(&self) -> Flags { self.flags }

    pub fn entry_count(&self) -> usize { self.components.len() }

    pub fn get(&self, path: &str) -> Option<&Component<'a>> { self.components.get(path) }

    /// Components in archive order.
    pub fn components(&self) -> impl Iterator<Item = &Component<'a>> { self.components.values() }
}
