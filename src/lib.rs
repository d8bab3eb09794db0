//! Reading and writing EPW archives.
//!
//! Two layouts share the format family: the fixed-slot layout holding a
//! splash image, its MIME type, a script and a secondary payload, and the
//! directory layout holding any number of path-keyed entries. New archives
//! default to the directory layout, [`parse`] accepts every layout.

pub mod archive;
pub mod compress;
pub mod crc;
pub mod cursor;
pub mod entry;
pub mod error;
pub mod mime;
pub mod pack;
pub mod parse;
pub mod types;

pub use archive::{Archive, Checksum, Component, DirectoryArchive, Layout, SlotArchive};
pub use cursor::{ByteReader, ByteWriter, CursorError};
pub use entry::{normalize_path, Entry};
pub use error::{ArchiveError, ArchiveResult};
pub use pack::{pack, pack_directory, pack_legacy, pack_slots, PackOptions, SlotPayloads};
pub use parse::{parse, parse_directory, parse_slots};
pub use types::{Flags, Slot};
