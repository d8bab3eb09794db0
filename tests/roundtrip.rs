use std::collections::BTreeMap;

use epw::{
    pack, pack_directory, pack_legacy, pack_slots, parse, Archive, ArchiveError, Checksum, Entry,
    Layout, PackOptions, Slot, SlotPayloads,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn entries(files: &BTreeMap<String, Vec<u8>>) -> Vec<Entry> {
    files
        .iter()
        .map(|(path, data)| Entry::new(path, data.clone()).unwrap())
        .collect()
}

fn files(min: usize) -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(
        "[a-z]{1,8}(/[a-z0-9._]{1,8}){0,2}",
        prop::collection::vec(any::<u8>(), 0..64),
        min..8,
    )
    .prop_filter("paths must be normalized", |files| {
        files
            .keys()
            .all(|path| path.split('/').all(|segment| segment != "." && segment != ".."))
    })
}

fn directory(archive: Archive<'_>) -> epw::DirectoryArchive<'_> {
    match archive {
        Archive::Directory(archive) => archive,
        Archive::Slots(_) => panic!("expected a directory archive"),
    }
}

fn put(bytes: &mut [u8], at: usize, value: u32) { bytes[at..at + 4].copy_from_slice(&value.to_le_bytes()); }

proptest! {
    #[test]
    fn directory_roundtrip(files in files(0), checksums in any::<bool>()) {
        let options = PackOptions { checksums, compression: None };
        let packed = pack_directory(&entries(&files), &options).unwrap();
        let declared = u32::from_le_bytes(packed[8..12].try_into().unwrap());
        prop_assert_eq!(declared as usize, packed.len());

        let archive = directory(parse(&packed).unwrap());
        prop_assert_eq!(archive.entry_count(), files.len());
        for ((path, data), component) in files.iter().zip(archive.components()) {
            prop_assert_eq!(component.path(), path.as_str());
            prop_assert_eq!(component.stored(), data.as_slice());
            prop_assert_eq!(matches!(component.checksum(), Checksum::Valid(_)), checksums);
        }
    }

    #[test]
    fn legacy_roundtrip(files in files(0)) {
        let packed = pack_legacy(&entries(&files)).unwrap();
        let archive = directory(parse(&packed).unwrap());
        prop_assert_eq!(archive.layout(), Layout::Legacy);
        for (path, data) in &files {
            let component = archive.get(path).unwrap();
            prop_assert_eq!(component.stored(), data.as_slice());
            prop_assert!(component.verify().is_ok());
        }
    }

    #[test]
    fn out_of_bounds_rows_are_rejected(
        files in files(1),
        index in any::<prop::sample::Index>(),
        excess in 1u32..1024,
        mutate_offset in any::<bool>(),
    ) {
        let mut packed = pack(&entries(&files)).unwrap();
        let total = packed.len() as u32;
        let row = 20 + index.index(files.len()) * 8;
        let offset = u32::from_le_bytes(packed[row..row + 4].try_into().unwrap());
        let length = u32::from_le_bytes(packed[row + 4..row + 8].try_into().unwrap());
        if mutate_offset {
            put(&mut packed, row, (total - length).saturating_add(excess));
        } else {
            put(&mut packed, row + 4, (total - offset).saturating_add(excess));
        }
        let rejected = matches!(
            parse(&packed),
            Err(ArchiveError::InvalidOffset { .. })
        );
        prop_assert!(rejected);
    }

    #[test]
    fn out_of_bounds_slots_are_rejected(
        splash in prop::collection::vec(any::<u8>(), 0..32),
        script in prop::collection::vec(any::<u8>(), 0..32),
        slot in prop::sample::select(Slot::ALL.to_vec()),
        excess in 1u32..=u32::MAX,
    ) {
        let mut packed = pack_slots(&SlotPayloads {
            splash: &splash,
            mime: "image/png",
            script: &script,
            secondary: b"\0asm",
        })
        .unwrap();
        let at = match slot {
            Slot::Splash => 100,
            Slot::MimeType => 108,
            Slot::Script => 164,
            Slot::Secondary => 180,
        };
        let offset = u32::from_le_bytes(packed[at..at + 4].try_into().unwrap());
        let total = packed.len() as u32;
        put(&mut packed, at + 4, (total - offset).saturating_add(excess));
        match parse(&packed) {
            Err(ArchiveError::InvalidOffset { component }) => prop_assert_eq!(component, slot.name()),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn truncation_is_a_length_mismatch(files in files(1)) {
        let packed = pack(&entries(&files)).unwrap();
        let rejected = matches!(
            parse(&packed[..packed.len() - 1]),
            Err(ArchiveError::LengthMismatch { .. })
        );
        prop_assert!(rejected);
    }

    #[test]
    fn flipped_magic_is_rejected(files in files(0), at in 0usize..4, mask in 1u8..=255) {
        let mut packed = pack(&entries(&files)).unwrap();
        packed[at] ^= mask;
        prop_assert!(matches!(parse(&packed), Err(ArchiveError::BadMagic)));

        let mut slots = pack_slots(&SlotPayloads::default()).unwrap();
        slots[at + 4] ^= mask;
        prop_assert!(matches!(parse(&slots), Err(ArchiveError::BadMagic)));
    }
}

#[test]
fn three_files() {
    let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0];
    let entries = vec![
        Entry::new("a.txt", b"hi".to_vec()).unwrap(),
        Entry::new("b/c.bin", vec![0; 3]).unwrap(),
        Entry::new("d.png", png.to_vec()).unwrap(),
    ];
    let packed = pack(&entries).unwrap();

    let header = 20;
    let rows = 3 * 8;
    let paths = (4 + 5) + (4 + 7) + (4 + 5);
    let checksums = 3 * 4;
    let payloads = 2 + 3 + 10;
    assert_eq!(packed.len(), header + rows + paths + checksums + payloads);

    let archive = directory(parse(&packed).unwrap());
    assert_eq!(archive.len(), packed.len());
    assert_eq!(archive.get("a.txt").unwrap().stored(), b"hi");
    assert_eq!(archive.get("b/c.bin").unwrap().stored(), [0, 0, 0]);
    assert_eq!(archive.get("d.png").unwrap().stored(), png);
    assert!(Archive::parse(&packed).unwrap().checksum_failures().is_empty());
}

#[test]
fn compressed_directory_inflates() {
    let entries = vec![
        Entry::new("loader.js", b"console.log(1);\n".repeat(64)).unwrap(),
        Entry::new("loader.wasm", b"\0asm\x01\0\0\0".to_vec()).unwrap(),
    ];
    let options = PackOptions {
        checksums:   true,
        compression: Some(9),
    };
    let packed = pack_directory(&entries, &options).unwrap();
    let archive = directory(parse(&packed).unwrap());
    for entry in &entries {
        let component = archive.get(entry.path()).unwrap();
        assert_eq!(component.checksum(), Checksum::Valid(epw::crc::crc32(component.stored())));
        assert_eq!(component.contents().unwrap().as_ref(), entry.data());
    }
}

#[test]
fn slot_minimum_length() {
    let mut bytes = vec![0u8; 383];
    bytes[..8].copy_from_slice(b"EAG$WASM");
    assert!(matches!(
        parse(&bytes),
        Err(ArchiveError::TooShort { length: 383, minimum: 384 })
    ));

    let empty = pack_slots(&SlotPayloads::default()).unwrap();
    assert_eq!(empty.len(), 384);
    let Archive::Slots(archive) = parse(&empty).unwrap() else {
        panic!("expected a slot archive");
    };
    assert!(archive.slot(Slot::Splash).is_empty());
    assert_eq!(archive.mime_type(), None);
}

#[test]
fn corrupted_payload_names_the_entry() {
    let entries = vec![
        Entry::new("splash.png", vec![1; 8]).unwrap(),
        Entry::new("loader.js", vec![2; 8]).unwrap(),
    ];
    let mut packed = pack(&entries).unwrap();
    let first = u32::from_le_bytes(packed[20..24].try_into().unwrap()) as usize;
    packed[first] ^= 0xff;
    let failures = parse(&packed).unwrap().checksum_failures();
    assert_eq!(failures.len(), 1);
    match &failures[0] {
        ArchiveError::ChecksumMismatch { path, .. } => assert_eq!(path, "splash.png"),
        other => panic!("unexpected {other:?}"),
    }
}
