use std::{
    fs,
    io::{copy, Read, Result, Write},
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};

use jwalk::WalkDir;
use path_slash::PathExt;
use rayon::prelude::*;
use thiserror::Error;
use zstd::Encoder;

use crate::entry::Entry;

/// Payloads above this size are compressed with several zstd workers.
pub const LARGE_PAYLOAD: usize = 32 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("couldn't collect {failed} input entries")]
    Incomplete { failed: usize },
}

pub fn copy_encode<R: Read, W: Write>(
    mut source: R, destination: W, level: i32, threads: u32,
) -> Result<()> {
    let mut encoder = Encoder::new(destination, level)?;
    encoder.multithread(threads)?;
    copy(&mut source, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}

/// Compress `data` into a single zstd frame.
pub fn encode(data: &[u8], level: i32) -> Result<Vec<u8>> {
    let threads = if data.len() > LARGE_PAYLOAD {
        usize::max(
            1,
            usize::min(num_cpus::get() / 2, data.len() / LARGE_PAYLOAD + 1),
        ) as u32
    } else {
        0
    };
    let mut encoded = Vec::with_capacity(data.len() / 2);
    copy_encode(data, &mut encoded, level, threads)?;
    Ok(encoded)
}

fn walk(source: &Path) -> WalkDir { WalkDir::new(source).skip_hidden(false).sort(true).follow_links(true) }

/// Number of regular files below `source`.
pub fn count_files<T: AsRef<Path>>(source: T) -> u64 {
    walk(source.as_ref())
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .count() as u64
}

/// Read every file below `source` into an [`Entry`], keyed by its
/// forward-slash path relative to `source`. A single file is keyed by its
/// file name.
///
/// Files are read in parallel, entries keep the sorted walk order. Every
/// entry that can't be read is reported through `error_callback` and fails
/// the whole collection once the walk is done.
pub fn collect<
    T: AsRef<Path>,
    P: Fn() + Sync + Send,
    E: Fn(&str) + Sync + Send,
    I: Fn(&str) + Sync + Send,
>(
    source: T, progress_callback: P, error_callback: E, info_callback: I,
) -> std::result::Result<Vec<Entry>, CollectError> {
    let source: &Path = source.as_ref();
    let root = if source.is_dir() {
        source
    } else {
        source.parent().unwrap_or(source)
    };

    let failed = AtomicUsize::new(0);
    let fail = |message: String| {
        failed.fetch_add(1, Ordering::Relaxed);
        error_callback(&message);
    };

    let files = walk(source)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(entry.path()),
            Ok(_) => None,
            Err(e) => {
                fail(format!("couldn't read entry: {}", e));
                None
            }
        })
        .collect::<Vec<_>>();

    let entries = files
        .par_iter()
        .filter_map(|path| {
            let relative = path.strip_prefix(root).unwrap_or(path);
            let Some(name) = relative.to_slash() else {
                fail(format!("skipping file with a non utf-8 path: {}", path.display()));
                return None;
            };
            info_callback(&name);

            let data = match fs::read(path) {
                Ok(data) => data,
                Err(e) => {
                    fail(format!("couldn't read {}: {}", path.display(), e));
                    return None;
                }
            };
            let entry = match Entry::new(&name, data) {
                Ok(entry) => entry,
                Err(e) => {
                    fail(format!("skipping {}: {}", path.display(), e));
                    return None;
                }
            };

            progress_callback();
            Some(entry)
        })
        .collect::<Vec<_>>();

    match failed.into_inner() {
        0 => Ok(entries),
        failed => Err(CollectError::Incomplete { failed }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_produces_a_zstd_frame() {
        let data = b"splash".repeat(512);
        let encoded = encode(&data, 3).unwrap();
        assert!(encoded.len() < data.len());
        assert_eq!(zstd::decode_all(&encoded[..]).unwrap(), data);
    }

    #[test]
    fn encode_empty() {
        let encoded = encode(&[], 1).unwrap();
        assert!(zstd::decode_all(&encoded[..]).unwrap().is_empty());
    }
}
