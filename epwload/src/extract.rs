use std::path::Path;

use epw::{mime::guess_mime, Archive, Checksum, Component, DirectoryArchive, Slot, SlotArchive};

use crate::{
    config::{ChecksumPolicy, ComponentPaths},
    context::{LoadableUnit, SplashOrigin, SplashResource},
    error::{LoadError, LoadResult},
};

/// Components copied out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub splash:    SplashResource,
    pub script:    LoadableUnit,
    pub secondary: LoadableUnit,
}

pub fn extract(archive: &Archive, paths: &ComponentPaths, policy: ChecksumPolicy) -> LoadResult<Extracted> {
    match archive {
        Archive::Slots(archive) => Ok(extract_slots(archive)),
        Archive::Directory(archive) => extract_directory(archive, paths, policy),
    }
}

fn extract_slots(archive: &SlotArchive) -> Extracted {
    Extracted {
        splash:    SplashResource {
            bytes:  archive.slot(Slot::Splash).to_vec(),
            mime:   archive.mime_type(),
            origin: SplashOrigin::Archive,
        },
        script:    LoadableUnit::script(archive.slot(Slot::Script).to_vec()),
        secondary: LoadableUnit::secondary(archive.slot(Slot::Secondary).to_vec()),
    }
}

/// The component stored at `name`, or the first one whose file stem is
/// `name` when it has no extension.
pub fn find<'a, 'b>(archive: &'b DirectoryArchive<'a>, name: &str) -> Option<&'b Component<'a>> {
    archive.get(name).or_else(|| {
        if name.contains('.') {
            return None;
        }
        archive
            .components()
            .find(|component| Path::new(component.path()).file_stem().is_some_and(|stem| stem == name))
    })
}

fn component<'a, 'b>(
    archive: &'b DirectoryArchive<'a>, name: &str, policy: ChecksumPolicy,
) -> LoadResult<&'b Component<'a>> {
    let component = find(archive, name).ok_or_else(|| LoadError::MissingComponent(name.to_string()))?;
    if let (ChecksumPolicy::Enforce, Checksum::Mismatch { expected, actual }) =
        (policy, component.checksum())
    {
        return Err(LoadError::ChecksumMismatch {
            path: component.path().to_string(),
            expected,
            actual,
        });
    }
    Ok(component)
}

fn extract_directory(
    archive: &DirectoryArchive, paths: &ComponentPaths, policy: ChecksumPolicy,
) -> LoadResult<Extracted> {
    let splash = component(archive, &paths.splash, policy)?;
    let script = component(archive, &paths.script, policy)?;
    let secondary = component(archive, &paths.secondary, policy)?;

    let splash_bytes = splash.contents()?.into_owned();
    let mime = guess_mime(&splash_bytes, Some(splash.path())).map(String::from);
    Ok(Extracted {
        splash:    SplashResource {
            bytes: splash_bytes,
            mime,
            origin: SplashOrigin::Archive,
        },
        script:    LoadableUnit::script(script.contents()?.into_owned()),
        secondary: LoadableUnit::secondary(secondary.contents()?.into_owned()),
    })
}

#[cfg(test)]
mod tests {
    use epw::{pack, pack_slots, Entry, SlotPayloads};
    use pretty_assertions::assert_eq;

    use super::*;

    fn directory() -> Vec<u8> {
        pack(&[
            Entry::new("img/splash.png", vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]).unwrap(),
            Entry::new("loader.js", b"main();".to_vec()).unwrap(),
            Entry::new("loader.wasm", b"\0asm".to_vec()).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn slots() {
        let packed = pack_slots(&SlotPayloads {
            splash:    b"gif",
            mime:      " image/gif\n",
            script:    b"main();",
            secondary: b"\0asm",
        })
        .unwrap();
        let archive = Archive::parse(&packed).unwrap();
        let extracted = extract(&archive, &ComponentPaths::default(), ChecksumPolicy::Enforce).unwrap();
        assert_eq!(extracted.splash.bytes, b"gif");
        assert_eq!(extracted.splash.mime.as_deref(), Some("image/gif"));
        assert_eq!(extracted.script, LoadableUnit::script(b"main();".to_vec()));
        assert_eq!(extracted.secondary.mime, "application/wasm");
    }

    #[test]
    fn directory_components_by_stem() {
        let packed = directory();
        let archive = Archive::parse(&packed).unwrap();
        let extracted = extract(&archive, &ComponentPaths::default(), ChecksumPolicy::Warn).unwrap();
        assert_eq!(extracted.splash.mime.as_deref(), Some("image/png"));
        assert_eq!(extracted.script.bytes, b"main();");
        assert_eq!(extracted.secondary.bytes, b"\0asm");
    }

    #[test]
    fn missing_component() {
        let packed = directory();
        let archive = Archive::parse(&packed).unwrap();
        let paths = ComponentPaths {
            script: "boot.js".into(),
            ..Default::default()
        };
        assert!(matches!(
            extract(&archive, &paths, ChecksumPolicy::Warn),
            Err(LoadError::MissingComponent(name)) if name == "boot.js"
        ));
    }

    #[test]
    fn checksum_policy() {
        let mut packed = directory();
        let last = packed.len() - 1;
        packed[last] ^= 0xff;
        let archive = Archive::parse(&packed).unwrap();
        let warned = extract(&archive, &ComponentPaths::default(), ChecksumPolicy::Warn).unwrap();
        assert_eq!(warned.secondary.bytes, [0, b'a', b's', b'm' ^ 0xff]);
        assert!(matches!(
            extract(&archive, &ComponentPaths::default(), ChecksumPolicy::Enforce),
            Err(LoadError::ChecksumMismatch { path, .. }) if path == "loader.wasm"
        ));
    }
}
