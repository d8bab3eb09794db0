use std::path::{Path, PathBuf};

use console::style;
use epw::{archive::Layout, Entry};

pub fn list_layouts() {
    println!(
        "{}: directory {}, slots, legacy",
        style("available layouts").blue().bright(),
        style("(default)").bold().black()
    );
}

pub fn get_layout(layout: &str) -> Layout {
    match layout.to_lowercase().as_str() {
        "directory" | "default" => Layout::Directory,
        "slots" => Layout::Slots,
        "legacy" => Layout::Legacy,
        _ => {
            println!(
                "{}: {}",
                style("not a valid layout").red(),
                style(layout).red()
            );
            list_layouts();
            std::process::exit(-1);
        }
    }
}

pub fn get_compression(compression: Option<i32>, layout: Layout) -> Option<i32> {
    let level = compression?;
    if layout != Layout::Directory {
        println!(
            "{}: {}",
            style("compression is not supported by the layout").red(),
            style(layout.name()).red()
        );
        std::process::exit(-1);
    }
    let range = zstd::compression_level_range();
    if !range.contains(&level) {
        println!(
            "{}: {} ({}-{})",
            style("not a valid compression level").red(),
            style(level).red(),
            range.start(),
            range.end()
        );
        std::process::exit(-1);
    }
    Some(level)
}

pub fn get_checksums(no_checksums: bool, layout: Layout) -> bool {
    if no_checksums && layout != Layout::Directory {
        println!(
            "{}: {}",
            style("checksums can't be disabled for the layout").red(),
            style(layout.name()).red()
        );
        std::process::exit(-1);
    }
    !no_checksums
}

pub fn get_source(source: &Path) -> PathBuf {
    let source = std::fs::canonicalize(source).unwrap_or_else(|_| {
        println!(
            "{}: {}",
            style("input path does not exist").red(),
            source.display()
        );
        std::process::exit(-1);
    });
    if !source.is_dir() && !source.is_file() {
        println!(
            "{}: {}",
            style("input path is not a file or directory").red(),
            source.display()
        );
        std::process::exit(-1);
    }
    source
}

pub fn get_output(output: &Path) -> PathBuf {
    if output.is_dir() {
        println!(
            "{}: {}",
            style("output path is a directory").red(),
            output.display()
        );
        std::process::exit(-1);
    }
    let parent = match output.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => Path::new("."),
    };
    let (Ok(parent), Some(name)) = (std::fs::canonicalize(parent), output.file_name()) else {
        println!(
            "{}: {}",
            style("output path has no parent directory").red(),
            output.display()
        );
        std::process::exit(-1);
    };
    parent.join(name)
}

/// `path` relative to the working directory when it lies below it.
pub fn relative(path: &Path) -> String {
    std::env::current_dir()
        .and_then(std::fs::canonicalize)
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(|path| path.display().to_string()))
        .unwrap_or_else(|| path.display().to_string())
}

/// The entry stored at `name`, or the first entry whose file stem is `name`
/// when `name` has no extension.
pub fn find_entry<'a>(entries: &'a [Entry], name: &str) -> Option<&'a Entry> {
    entries.iter().find(|entry| entry.path() == name).or_else(|| {
        if name.contains('.') {
            return None;
        }
        entries
            .iter()
            .find(|entry| Path::new(entry.path()).file_stem().is_some_and(|stem| stem == name))
    })
}

pub fn get_entry<'a>(entries: &'a [Entry], name: &str, role: &str) -> &'a Entry {
    find_entry(entries, name).unwrap_or_else(|| {
        println!(
            "{} {}: {}",
            style("input has no").red(),
            style(role).red(),
            style(name).red()
        );
        std::process::exit(-1);
    })
}
