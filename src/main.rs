use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use console::{style, Emoji};
use epw::{archive::Layout, compress, mime::guess_mime, Entry, PackOptions, SlotPayloads};
use indicatif::{ProgressBar, ProgressStyle};

mod args;
use args::*;

#[derive(Parser)]
#[command(about, version)]
pub struct Args {
    /// Archive layout (directory, slots, legacy)
    #[arg(short = 'l', long, default_value = "directory")]
    layout:       String,
    /// Zstd compression level, directory layout only [default: no compression]
    #[arg(short = 'c', long)]
    compression:  Option<i32>,
    /// Don't write a checksum per entry
    #[arg(short = 'n', long)]
    no_checksums: bool,
    /// Splash image in the input, slots layout only [default: first file named splash]
    #[arg(long, default_value = "splash")]
    splash:       String,
    /// Script in the input, slots layout only
    #[arg(long, default_value = "loader.js")]
    script:       String,
    /// Secondary payload in the input, slots layout only
    #[arg(long, default_value = "loader.wasm")]
    secondary:    String,
    /// Path to the input directory or file
    input:        PathBuf,
    /// Path to the output archive
    output:       PathBuf,
}

fn pack_slots(entries: &[Entry], args: &Args) -> epw::ArchiveResult<Vec<u8>> {
    let splash = get_entry(entries, &args.splash, "splash image");
    let script = get_entry(entries, &args.script, "script");
    let secondary = get_entry(entries, &args.secondary, "secondary payload");
    let mime = guess_mime(splash.data(), Some(splash.path())).unwrap_or_else(|| {
        println!(
            "      {}{}: {}",
            Emoji("⚠ ", ""),
            style("couldn't determine the splash image type").red(),
            splash.path()
        );
        ""
    });
    epw::pack_slots(&SlotPayloads {
        splash: splash.data(),
        mime,
        script: script.data(),
        secondary: secondary.data(),
    })
}

fn main() {
    color_backtrace::install();

    let args = Args::parse();

    let layout = get_layout(&args.layout);
    let options = PackOptions {
        checksums:   get_checksums(args.no_checksums, layout),
        compression: get_compression(args.compression, layout),
    };
    let source = get_source(&args.input);
    let output = get_output(&args.output);

    println!(
        "{} {}counting contents of {}…",
        style("[1/4]").bold().black(),
        Emoji("🔍 ", ""),
        style(relative(&source)).blue()
    );
    let count = compress::count_files(&source);

    println!(
        "{} {}reading {} files…",
        style("[2/4]").bold().black(),
        Emoji("🚚 ", ""),
        style(count).magenta(),
    );
    let bar_progress = ProgressBar::new(count).with_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {elapsed_precise} [{wide_bar:.green}] {pos}/{len}\n{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar_progress.enable_steady_tick(Duration::from_millis(12));
    let entries = compress::collect(
        &source,
        || {
            bar_progress.inc(1);
        },
        |message| {
            bar_progress.inc(1);
            bar_progress.println(format!(
                "      {}{}",
                Emoji("⚠ ", ""),
                style(message).red()
            ));
        },
        |message| {
            bar_progress.set_message(format!("{}", style(message).blue()));
        },
    );
    bar_progress.finish_and_clear();
    let entries = entries.unwrap_or_else(|e| {
        println!("{}: {}", style("couldn't read input").red(), e);
        std::process::exit(-1);
    });
    let size = entries.iter().map(Entry::len).sum::<usize>();
    println!(
        "      {}{} {} {} {}",
        Emoji("✨ ", ""),
        style("successfully read").green(),
        style(entries.len()).magenta(),
        style("files, bytes:").green(),
        style(size).magenta(),
    );

    println!(
        "{} {}packing {} archive…",
        style("[3/4]").bold().black(),
        Emoji("📦 ", ""),
        style(layout.name()).blue()
    );
    let packed = match layout {
        Layout::Directory => epw::pack_directory(&entries, &options),
        Layout::Legacy => epw::pack_legacy(&entries),
        Layout::Slots => pack_slots(&entries, &args),
    }
    .unwrap_or_else(|e| {
        println!("{}: {}", style("couldn't pack archive").red(), e);
        std::process::exit(-1);
    });

    println!(
        "{} {}writing {}…",
        style("[4/4]").bold().black(),
        Emoji("📃 ", ""),
        style(relative(&output)).blue()
    );
    let written = File::create(&output).and_then(|file| {
        let mut writer = BufWriter::new(file);
        writer.write_all(&packed)?;
        writer.flush()
    });
    if let Err(e) = written {
        println!(
            "{}: {}: {}",
            style("couldn't write output file").red(),
            output.display(),
            e
        );
        std::process::exit(-1);
    }

    println!(
        "     {} {} {}",
        Emoji("✨ ", ""),
        style("done!").green(),
        style(format!("({} bytes)", packed.len())).dim()
    );
}
