use std::{borrow::Cow, collections::HashSet};

use rayon::prelude::*;

use crate::{
    compress,
    crc::crc32,
    cursor::ByteWriter,
    entry::Entry,
    error::{ArchiveError, ArchiveResult},
    types::*,
};

#[derive(Debug, Clone, Copy)]
pub struct PackOptions {
    /// Write a CRC-32 per entry.
    pub checksums:   bool,
    /// Compress every payload with zstd at this level.
    pub compression: Option<i32>,
}
impl Default for PackOptions {
    fn default() -> Self {
        PackOptions {
            checksums:   true,
            compression: None,
        }
    }
}

/// Payloads of a fixed-slot archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotPayloads<'a> {
    pub splash:    &'a [u8],
    pub mime:      &'a str,
    pub script:    &'a [u8],
    pub secondary: &'a [u8],
}
impl<'a> SlotPayloads<'a> {
    pub fn slot(&self, slot: Slot) -> &'a [u8] {
        match slot {
            Slot::Splash => self.splash,
            Slot::MimeType => self.mime.as_bytes(),
            Slot::Script => self.script,
            Slot::Secondary => self.secondary,
        }
    }
}

fn to_u32(value: usize) -> ArchiveResult<u32> { u32::try_from(value).map_err(|_| ArchiveError::TooLarge) }

fn check_unique(entries: &[Entry]) -> ArchiveResult<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.path()) {
            return Err(ArchiveError::DuplicatePath(entry.path().to_string()));
        }
    }
    Ok(())
}

/// Sum of section sizes, refusing anything that doesn't fit the 32-bit offsets.
fn total_size(sections: impl IntoIterator<Item = usize>) -> ArchiveResult<usize> {
    let total = sections
        .into_iter()
        .try_fold(0usize, |total, size| total.checked_add(size))
        .ok_or(ArchiveError::TooLarge)?;
    to_u32(total)?;
    Ok(total)
}

fn path_table_size(entries: &[Entry]) -> usize {
    entries
        .iter()
        .map(|entry| PATH_PREFIX_SIZE + entry.path().len())
        .sum()
}

/// Pack `entries` into the canonical layout with checksums and no
/// compression.
pub fn pack(entries: &[Entry]) -> ArchiveResult<Vec<u8>> { pack_directory(entries, &PackOptions::default()) }

/// Pack `entries` into the current directory layout.
///
/// Sections are written in this order:
/// - header
/// - one `(offset, length)` row per entry
/// - path table, each path prefixed with its byte length
/// - checksum table, if enabled
/// - payloads, in entry order
pub fn pack_directory(entries: &[Entry], options: &PackOptions) -> ArchiveResult<Vec<u8>> {
    check_unique(entries)?;

    let stored: Vec<Cow<[u8]>> = match options.compression {
        Some(level) => entries
            .par_iter()
            .map(|entry| {
                compress::encode(entry.data(), level)
                    .map(Cow::Owned)
                    .map_err(|source| ArchiveError::Compress {
                        path: entry.path().to_string(),
                        source,
                    })
            })
            .collect::<ArchiveResult<Vec<_>>>()?,
        None => entries
            .iter()
            .map(|entry| Cow::Borrowed(entry.data()))
            .collect::<Vec<_>>(),
    };

    let mut flags = Flags::empty();
    flags.set(Flags::CHECKSUMS, options.checksums);
    flags.set(Flags::ZSTD, options.compression.is_some());

    let count = entries.len();
    let checksum_table = if options.checksums { count * CHECKSUM_SIZE } else { 0 };
    let data_start = total_size([
        DIRECTORY_HEADER_SIZE,
        count * ROW_SIZE,
        path_table_size(entries),
        checksum_table,
    ])?;
    let total = total_size(
        std::iter::once(data_start).chain(stored.iter().map(|payload| payload.len())),
    )?;

    let mut buffer = vec![0u8; total];
    let mut writer = ByteWriter::new(&mut buffer);

    let header = DirectoryHeader {
        magic:           DIRECTORY_MAGIC,
        version:         U32::new(VERSION_CURRENT),
        declared_length: U32::new(to_u32(total)?),
        entry_count:     U32::new(to_u32(count)?),
        flags:           U32::new(flags.bits()),
    };
    writer.put_slice(header.as_bytes())?;

    let mut offset = data_start;
    for payload in &stored {
        writer.put_u32(to_u32(offset)?)?;
        writer.put_u32(to_u32(payload.len())?)?;
        offset += payload.len();
    }
    for entry in entries {
        writer.put_u32(to_u32(entry.path().len())?)?;
        writer.put_slice(entry.path().as_bytes())?;
    }
    if options.checksums {
        let checksums = stored
            .par_iter()
            .map(|payload| crc32(payload))
            .collect::<Vec<_>>();
        for checksum in checksums {
            writer.put_u32(checksum)?;
        }
    }
    for payload in &stored {
        writer.put_slice(payload)?;
    }
    debug_assert_eq!(writer.position(), total);

    Ok(buffer)
}

/// Pack `entries` into the legacy directory layout: offsets only, payloads
/// followed by a CRC-32 per entry.
///
/// Offsets are counted from the end of the offset table and skip the path
/// table, matching the archives already in circulation.
pub fn pack_legacy(entries: &[Entry]) -> ArchiveResult<Vec<u8>> {
    check_unique(entries)?;

    let count = entries.len();
    let data_start = total_size([
        LEGACY_HEADER_SIZE,
        count * LEGACY_ROW_SIZE,
        path_table_size(entries),
    ])?;
    let total = total_size(
        std::iter::once(data_start)
            .chain(entries.iter().map(Entry::len))
            .chain(std::iter::once(count * CHECKSUM_SIZE)),
    )?;

    let mut buffer = vec![0u8; total];
    let mut writer = ByteWriter::new(&mut buffer);

    let header = LegacyHeader {
        magic:       DIRECTORY_MAGIC,
        version:     U32::new(VERSION_LEGACY),
        entry_count: U32::new(to_u32(count)?),
    };
    writer.put_slice(header.as_bytes())?;

    let mut offset = LEGACY_HEADER_SIZE + count * LEGACY_ROW_SIZE;
    for entry in entries {
        writer.put_u32(to_u32(offset)?)?;
        offset += entry.len();
    }
    for entry in entries {
        writer.put_u32(to_u32(entry.path().len())?)?;
        writer.put_slice(entry.path().as_bytes())?;
    }
    for entry in entries {
        writer.put_slice(entry.data())?;
    }
    for entry in entries {
        writer.put_u32(crc32(entry.data()))?;
    }
    debug_assert_eq!(writer.position(), total);

    Ok(buffer)
}

/// Pack the fixed-slot layout: the 384 byte header followed by the splash,
/// MIME type, script and secondary payloads.
pub fn pack_slots(payloads: &SlotPayloads) -> ArchiveResult<Vec<u8>> {
    let total = total_size(
        std::iter::once(SLOT_HEADER_SIZE)
            .chain(Slot::ALL.iter().map(|&slot| payloads.slot(slot).len())),
    )?;

    let mut header = SlotHeader::new_zeroed();
    header.magic = SLOT_MAGIC;
    header.declared_length = U32::new(to_u32(total)?);
    let mut offset = SLOT_HEADER_SIZE;
    for slot in Slot::ALL {
        let length = payloads.slot(slot).len();
        let range = header.range_mut(slot);
        range.offset = U32::new(to_u32(offset)?);
        range.length = U32::new(to_u32(length)?);
        offset += length;
    }

    let mut buffer = vec![0u8; total];
    let mut writer = ByteWriter::new(&mut buffer);
    writer.put_slice(header.as_bytes())?;
    for slot in Slot::ALL {
        writer.put_slice(payloads.slot(slot))?;
    }
    debug_assert_eq!(writer.position(), total);

    Ok(buffer)
}
