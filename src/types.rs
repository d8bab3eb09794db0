use std::mem::size_of;

use bitflags::bitflags;
pub use zerocopy::{little_endian::U32, FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

/// `EAG$WASM`, read as the two little-endian words `0x24474145`, `0x4D534157`.
pub const SLOT_MAGIC: [u8; 8] = *b"EAG$WASM";
pub const SLOT_HEADER_SIZE: usize = size_of::<SlotHeader>();

pub const DIRECTORY_MAGIC: [u8; 4] = *b"EPW\0";
pub const VERSION_LEGACY: u32 = 1;
pub const VERSION_CURRENT: u32 = 2;
pub const DIRECTORY_HEADER_SIZE: usize = size_of::<DirectoryHeader>();
pub const LEGACY_HEADER_SIZE: usize = size_of::<LegacyHeader>();
pub const ROW_SIZE: usize = size_of::<EntryRow>();
pub const LEGACY_ROW_SIZE: usize = 4;
pub const CHECKSUM_SIZE: usize = 4;
pub const PATH_PREFIX_SIZE: usize = 4;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u32 {
        /// A CRC-32 table follows the path table.
        const CHECKSUMS = 1;
        /// Every payload is a zstd frame.
        const ZSTD = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Splash,
    MimeType,
    Script,
    Secondary,
}
impl Slot {
    pub const ALL: [Slot; 4] = [Slot::Splash, Slot::MimeType, Slot::Script, Slot::Secondary];

    pub fn name(self) -> &'static str {
        match self {
            Slot::Splash => "splash",
            Slot::MimeType => "mime",
            Slot::Script => "script",
            Slot::Secondary => "secondary",
        }
    }
}
impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.name()) }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct SlotRange {
    pub offset: U32,
    pub length: U32,
}

/// Fixed-slot header. Field positions are part of the format, the reserved
/// runs pad them to their offsets and are written as zeroes.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct SlotHeader {
    pub magic:           [u8; 8],
    pub declared_length: U32,
    pub reserved_0:      [u8; 88],
    pub splash:          SlotRange,
    pub mime:            SlotRange,
    pub reserved_1:      [u8; 48],
    pub script:          SlotRange,
    pub reserved_2:      [u8; 8],
    pub secondary:       SlotRange,
    pub reserved_3:      [u8; 196],
}
impl SlotHeader {
    pub fn range(&self, slot: Slot) -> &SlotRange {
        match slot {
            Slot::Splash => &self.splash,
            Slot::MimeType => &self.mime,
            Slot::Script => &self.script,
            Slot::Secondary => &self.secondary,
        }
    }

    pub fn range_mut(&mut self, slot: Slot) -> &mut SlotRange {
        match slot {
            Slot::Splash => &mut self.splash,
            Slot::MimeType => &mut self.mime,
            Slot::Script => &mut self.script,
            Slot::Secondary => &mut self.secondary,
        }
    }
}

#[repr(C)]
#[derive(Debug, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DirectoryHeader {
    pub magic:           [u8; 4],
    pub version:         U32,
    pub declared_length: U32,
    pub entry_count:     U32,
    pub flags:           U32,
}

#[repr(C)]
#[derive(Debug, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct LegacyHeader {
    pub magic:       [u8; 4],
    pub version:     U32,
    pub entry_count: U32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct EntryRow {
    pub offset: U32,
    pub length: U32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_sizes() {
        assert_eq!(SLOT_HEADER_SIZE, 384);
        assert_eq!(DIRECTORY_HEADER_SIZE, 20);
        assert_eq!(LEGACY_HEADER_SIZE, 12);
        assert_eq!(ROW_SIZE, 8);
    }

    #[test]
    fn slot_field_positions() {
        let mut header = SlotHeader::new_zeroed();
        header.declared_length = U32::new(0x0a0b_0c0d);
        for (i, slot) in Slot::ALL.into_iter().enumerate() {
            let range = header.range_mut(slot);
            range.offset = U32::new(0x100 + i as u32);
            range.length = U32::new(0x200 + i as u32);
        }
        let bytes = header.as_bytes();
        let word = |at: usize| u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
        assert_eq!(word(8), 0x0a0b_0c0d);
        assert_eq!((word(100), word(104)), (0x100, 0x200));
        assert_eq!((word(108), word(112)), (0x101, 0x201));
        assert_eq!((word(164), word(168)), (0x102, 0x202));
        assert_eq!((word(180), word(184)), (0x103, 0x203));
    }

    #[test]
    fn slot_magic_words() {
        assert_eq!(u32::from_le_bytes(SLOT_MAGIC[0..4].try_into().unwrap()), 608649541);
        assert_eq!(u32::from_le_bytes(SLOT_MAGIC[4..8].try_into().unwrap()), 1297301847);
    }
}
