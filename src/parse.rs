use indexmap::{map::Entry as MapEntry, IndexMap};
use rayon::prelude::*;

use crate::{
    archive::*,
    crc::crc32,
    cursor::ByteReader,
    entry::normalize_path,
    error::{ArchiveError, ArchiveResult},
    types::*,
};

/// Parse an archive of any supported layout.
///
/// The layout is picked by magic: `EPW\0` selects the directory layouts,
/// `EAG$WASM` the fixed-slot layout. Buffers matching neither are rejected
/// with [`ArchiveError::TooShort`] when shorter than the smallest header and
/// [`ArchiveError::BadMagic`] otherwise.
pub fn parse(bytes: &[u8]) -> ArchiveResult<Archive<'_>> {
    if bytes.starts_with(&DIRECTORY_MAGIC) {
        return parse_directory(bytes).map(Archive::Directory);
    }
    if bytes.starts_with(&SLOT_MAGIC) {
        return parse_slots(bytes).map(Archive::Slots);
    }
    if bytes.len() < LEGACY_HEADER_SIZE {
        return Err(ArchiveError::TooShort {
            length:  bytes.len(),
            minimum: LEGACY_HEADER_SIZE,
        });
    }
    Err(ArchiveError::BadMagic)
}

fn check_declared_length(declared: u32, actual: usize) -> ArchiveResult<()> {
    if declared as usize != actual {
        return Err(ArchiveError::LengthMismatch { declared, actual });
    }
    Ok(())
}

/// Parse the fixed-slot layout. Buffers shorter than the 384 byte header are
/// rejected before any field is looked at.
pub fn parse_slots(bytes: &[u8]) -> ArchiveResult<SlotArchive<'_>> {
    let too_short = || ArchiveError::TooShort {
        length:  bytes.len(),
        minimum: SLOT_HEADER_SIZE,
    };
    if bytes.len() < SLOT_HEADER_SIZE {
        return Err(too_short());
    }
    let (header, _) = SlotHeader::ref_from_prefix(bytes).map_err(|_| too_short())?;

    if header.magic != SLOT_MAGIC {
        return Err(ArchiveError::BadMagic);
    }
    check_declared_length(header.declared_length.get(), bytes.len())?;

    let reader = ByteReader::new(bytes);
    let slot = |slot: Slot| {
        let range = header.range(slot);
        reader
            .range(range.offset.get(), range.length.get())
            .map_err(|_| ArchiveError::invalid_offset(slot.name()))
    };
    Ok(SlotArchive {
        length:    bytes.len(),
        splash:    slot(Slot::Splash)?,
        mime:      slot(Slot::MimeType)?,
        script:    slot(Slot::Script)?,
        secondary: slot(Slot::Secondary)?,
    })
}

/// Parse either directory layout, dispatching on the version field.
pub fn parse_directory(bytes: &[u8]) -> ArchiveResult<DirectoryArchive<'_>> {
    if bytes.len() < LEGACY_HEADER_SIZE {
        return Err(ArchiveError::TooShort {
            length:  bytes.len(),
            minimum: LEGACY_HEADER_SIZE,
        });
    }
    if !bytes.starts_with(&DIRECTORY_MAGIC) {
        return Err(ArchiveError::BadMagic);
    }
    match ByteReader::new(bytes).read_u32_at(DIRECTORY_MAGIC.len())? {
        VERSION_CURRENT => parse_current(bytes),
        VERSION_LEGACY => parse_legacy(bytes),
        version => Err(ArchiveError::UnsupportedVersion(version)),
    }
}

struct Row<'a> {
    path:   &'a str,
    offset: u32,
    length: u32,
}

/// Byte range of a table with `count` fixed-size rows starting at `start`.
fn table_end(start: usize, count: usize, row: usize, len: usize, name: &str) -> ArchiveResult<usize> {
    count
        .checked_mul(row)
        .and_then(|size| size.checked_add(start))
        .filter(|&end| end <= len)
        .ok_or_else(|| ArchiveError::invalid_offset(name))
}

fn read_paths<'a>(reader: &mut ByteReader<'a>, count: usize) -> ArchiveResult<Vec<&'a str>> {
    let mut paths = Vec::with_capacity(count);
    for _ in 0..count {
        let length = reader
            .read_u32()
            .map_err(|_| ArchiveError::invalid_offset("path table"))?;
        let bytes = reader
            .take(length as usize)
            .map_err(|_| ArchiveError::invalid_offset("path table"))?;
        let path = std::str::from_utf8(bytes).map_err(|_| ArchiveError::InvalidPath {
            path:   String::from_utf8_lossy(bytes).into_owned(),
            reason: "path is not valid utf-8",
        })?;
        if normalize_path(path)? != path {
            return Err(ArchiveError::InvalidPath {
                path:   path.to_string(),
                reason: "path is not normalized",
            });
        }
        paths.push(path);
    }
    Ok(paths)
}

fn read_checksums(reader: &mut ByteReader, count: usize) -> ArchiveResult<Vec<u32>> {
    (0..count)
        .map(|_| {
            reader
                .read_u32()
                .map_err(|_| ArchiveError::invalid_offset("checksum table"))
        })
        .collect()
}

/// Resolve rows against the buffer. Payloads may not start inside the
/// metadata sections preceding `data_start`.
fn collect_components<'a>(
    reader: &ByteReader<'a>, rows: Vec<Row<'a>>, data_start: usize, layout: Layout, flags: Flags,
    checksums: Option<Vec<u32>>,
) -> ArchiveResult<DirectoryArchive<'a>> {
    let mut components = rows
        .into_iter()
        .map(|row| {
            if (row.offset as usize) < data_start {
                return Err(ArchiveError::invalid_offset(row.path));
            }
            let stored = reader
                .range(row.offset, row.length)
                .map_err(|_| ArchiveError::invalid_offset(row.path))?;
            Ok(Component {
                path: row.path,
                stored,
                compressed: flags.contains(Flags::ZSTD),
                checksum: Checksum::Absent,
            })
        })
        .collect::<ArchiveResult<Vec<_>>>()?;

    if let Some(expected) = checksums {
        components
            .par_iter_mut()
            .zip(expected.par_iter())
            .for_each(|(component, &expected)| {
                let actual = crc32(component.stored);
                component.checksum = if actual == expected {
                    Checksum::Valid(actual)
                } else {
                    Checksum::Mismatch { expected, actual }
                };
            });
    }

    let mut map = IndexMap::with_capacity(components.len());
    for component in components {
        match map.entry(component.path) {
            MapEntry::Occupied(_) => {
                return Err(ArchiveError::DuplicatePath(component.path.to_string()))
            }
            MapEntry::Vacant(slot) => {
                slot.insert(component);
            }
        }
    }

    Ok(DirectoryArchive {
        layout,
        length: reader.len(),
        flags,
        components: map,
    })
}

fn parse_current(bytes: &[u8]) -> ArchiveResult<DirectoryArchive<'_>> {
    let (header, _) =
        DirectoryHeader::ref_from_prefix(bytes).map_err(|_| ArchiveError::TooShort {
            length:  bytes.len(),
            minimum: DIRECTORY_HEADER_SIZE,
        })?;
    let flags = Flags::from_bits(header.flags.get())
        .ok_or(ArchiveError::UnsupportedFlags(header.flags.get()))?;
    check_declared_length(header.declared_length.get(), bytes.len())?;

    let count = header.entry_count.get() as usize;
    let rows_end = table_end(DIRECTORY_HEADER_SIZE, count, ROW_SIZE, bytes.len(), "entry table")?;

    let mut reader = ByteReader::new(bytes);
    reader.seek(DIRECTORY_HEADER_SIZE)?;
    let mut ranges = Vec::with_capacity(count);
    for _ in 0..count {
        ranges.push((reader.read_u32()?, reader.read_u32()?));
    }
    debug_assert_eq!(reader.position(), rows_end);

    let paths = read_paths(&mut reader, count)?;
    let checksums = if flags.contains(Flags::CHECKSUMS) {
        Some(read_checksums(&mut reader, count)?)
    } else {
        None
    };
    let data_start = reader.position();

    let rows = paths
        .into_iter()
        .zip(ranges)
        .map(|(path, (offset, length))| Row { path, offset, length })
        .collect();
    collect_components(&reader, rows, data_start, Layout::Directory, flags, checksums)
}

fn parse_legacy(bytes: &[u8]) -> ArchiveResult<DirectoryArchive<'_>> {
    let (header, _) = LegacyHeader::ref_from_prefix(bytes).map_err(|_| ArchiveError::TooShort {
        length:  bytes.len(),
        minimum: LEGACY_HEADER_SIZE,
    })?;
    let count = header.entry_count.get() as usize;
    let rows_end = table_end(LEGACY_HEADER_SIZE, count, LEGACY_ROW_SIZE, bytes.len(), "entry table")?;

    let mut reader = ByteReader::new(bytes);
    reader.seek(LEGACY_HEADER_SIZE)?;
    let offsets = (0..count)
        .map(|_| reader.read_u32())
        .collect::<Result<Vec<_>, _>>()?;
    let paths = read_paths(&mut reader, count)?;
    let data_start = reader.position();

    // the checksum table closes the file, payload sizes are implied by the
    // next offset
    let checksums_start = bytes
        .len()
        .checked_sub(count * CHECKSUM_SIZE)
        .filter(|&start| start >= data_start)
        .ok_or_else(|| ArchiveError::invalid_offset("checksum table"))?;
    reader.seek(checksums_start)?;
    let checksums = read_checksums(&mut reader, count)?;

    // Offsets are either absolute or, as existing v1 archives store them,
    // counted from the end of the offset table without the path table.
    // Absolute offsets can never point at the path table, so a first offset
    // equal to `rows_end` marks the second form.
    let shift = match offsets.first() {
        Some(&first) if first as usize == rows_end => data_start - rows_end,
        _ => 0,
    };

    let mut rows = Vec::with_capacity(count);
    for (i, path) in paths.into_iter().enumerate() {
        let rebase = |offset: u32| {
            (offset as usize)
                .checked_add(shift)
                .ok_or_else(|| ArchiveError::invalid_offset(path))
        };
        let offset = rebase(offsets[i])?;
        let end = match offsets.get(i + 1) {
            Some(&next) => rebase(next)?,
            None => checksums_start,
        };
        if offset > end || end > checksums_start {
            return Err(ArchiveError::invalid_offset(path));
        }
        rows.push(Row {
            path,
            offset: u32::try_from(offset).map_err(|_| ArchiveError::invalid_offset(path))?,
            length: u32::try_from(end - offset).map_err(|_| ArchiveError::invalid_offset(path))?,
        });
    }
    collect_components(
        &reader,
        rows,
        data_start,
        Layout::Legacy,
        Flags::CHECKSUMS,
        Some(checksums),
    )
}
