use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use console::{style, Emoji};
use epw::{archive::Layout, mime, Archive, Checksum, Slot};
use epwload::{
    config::{ASSETS_KEY, CONTAINER_KEY},
    ChecksumPolicy, LoaderContext, LoaderOptions, LoaderSettings, Source, SplashResource, Surface,
};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::Level;

const DEFAULT_CONTAINER: &str = "terminal";

#[derive(Parser)]
#[command(about, version)]
pub struct Args {
    /// Container id to load into [default: from the options file, or terminal]
    #[arg(short, long)]
    container:         Option<String>,
    /// JSON file with loader options
    #[arg(short, long)]
    options:           Option<PathBuf>,
    /// Directory to write the extracted components to
    #[arg(short = 'd', long, default_value = "epw_extract")]
    output:            PathBuf,
    /// List the archive contents instead of extracting
    #[arg(short, long)]
    list:              bool,
    /// Fail when an extracted component doesn't match its checksum
    #[arg(long)]
    enforce_checksums: bool,
    /// Write the raw archive next to the extracted components
    #[arg(long)]
    retain_archive:    bool,
    /// Give up acquiring the archive after this many seconds
    #[arg(short, long)]
    timeout:           Option<u64>,
    /// Verbose logging
    #[arg(short, long)]
    verbose:           bool,
    /// Archive path, URL or data URI
    source:            String,
}

struct Terminal {
    container: String,
}
impl Surface for Terminal {
    fn clear(&mut self) {}

    fn show_splash(&mut self, splash: &SplashResource) {
        println!(
            "      {}{} {} ({}, {} bytes)",
            Emoji("🖼  ", ""),
            style("splash ready in").green(),
            style(&self.container).blue(),
            splash.mime.as_deref().unwrap_or("unknown type"),
            style(splash.bytes.len()).magenta()
        );
    }

    fn show_error(&mut self, message: &str, detail: &str) {
        println!("      {}{}", Emoji("⚠ ", ""), style(message).red().bold());
        println!("      {}", style(detail).dim());
    }
}

fn fail(message: &str, error: impl std::fmt::Display) -> ! {
    println!("{}: {}", style(message).red(), error);
    std::process::exit(-1);
}

fn setup_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .init();
}

fn get_options(args: &Args) -> LoaderOptions {
    let mut value = match &args.options {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<Value>(&text).map_err(|e| e.to_string()))
            .unwrap_or_else(|e| fail("couldn't read options file", e)),
        None => Value::Object(Map::new()),
    };
    let Some(object) = value.as_object_mut() else {
        let path = args.options.as_deref().unwrap_or(Path::new("-"));
        fail("options file is not a JSON object", path.display());
    };
    object.insert(ASSETS_KEY.into(), Value::String(args.source.clone()));
    match &args.container {
        Some(container) => {
            object.insert(CONTAINER_KEY.into(), Value::String(container.clone()));
        }
        None => {
            object
                .entry(CONTAINER_KEY)
                .or_insert_with(|| Value::String(DEFAULT_CONTAINER.into()));
        }
    }
    LoaderOptions::from_value(value).unwrap_or_else(|e| fail("invalid options", e))
}

fn write(directory: &Path, name: &str, bytes: &[u8]) {
    let path = directory.join(name);
    if let Err(e) = fs::write(&path, bytes) {
        fail(&format!("couldn't write {}", path.display()), e);
    }
    println!(
        "      {}{} {}",
        Emoji("✨ ", ""),
        style(name).green(),
        style(format!("({} bytes)", bytes.len())).dim()
    );
}

fn write_components(context: &LoaderContext<Terminal>, directory: &Path) {
    if let Err(e) = fs::create_dir_all(directory) {
        fail("couldn't create output directory", e);
    }
    let extension = context
        .splash
        .mime
        .as_deref()
        .and_then(mime::extension)
        .unwrap_or("bin");
    write(directory, &format!("splash.{}", extension), &context.splash.bytes);
    write(directory, "loader.js", &context.script.bytes);
    write(directory, "loader.wasm", &context.secondary.bytes);
    if !context.options.is_empty() {
        let options = serde_json::to_vec_pretty(&context.options)
            .unwrap_or_else(|e| fail("couldn't serialize options", e));
        write(directory, "options.json", &options);
    }
    if let Some(archive) = &context.archive {
        write(directory, "archive.epw", archive);
    }
}

async fn list(args: &Args) {
    let source = Source::parse(&args.source).unwrap_or_else(|e| fail("invalid source", e));
    let bytes = source
        .acquire(&CancellationToken::new(), args.timeout.map(Duration::from_secs))
        .await
        .unwrap_or_else(|e| fail("couldn't acquire archive", e));
    let archive = Archive::parse(&bytes).unwrap_or_else(|e| fail("invalid archive", e));
    println!(
        "{} {} {}",
        style(source).blue(),
        style(archive.layout().name()).bold(),
        style(format!("({} bytes)", archive.len())).dim()
    );
    match &archive {
        Archive::Slots(slots) => {
            for slot in Slot::ALL {
                println!("  {:<10} {:>10}", slot.name(), slots.slot(slot).len());
            }
            println!(
                "  {:<10} {}",
                "type",
                slots.mime_type().unwrap_or_else(|| "unknown".into())
            );
        }
        Archive::Directory(directory) => {
            for component in directory.components() {
                let checksum = match component.checksum() {
                    Checksum::Absent => style("-".to_string()).dim(),
                    Checksum::Valid(crc) => style(format!("{:08x}", crc)).green(),
                    Checksum::Mismatch { expected, .. } => {
                        style(format!("{:08x} mismatch", expected)).red()
                    }
                };
                println!(
                    "  {:>10} {}{} {}",
                    component.stored().len(),
                    if component.is_compressed() { "z " } else { "" },
                    checksum,
                    component.path()
                );
            }
            if directory.layout() == Layout::Legacy {
                println!("  {}", style("legacy layout, repack to upgrade").yellow());
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    color_backtrace::install();

    let args = Args::parse();
    setup_tracing(args.verbose);

    if args.list {
        list(&args).await;
        return;
    }

    let options = get_options(&args);
    let settings = LoaderSettings {
        checksum_policy: if args.enforce_checksums {
            ChecksumPolicy::Enforce
        } else {
            ChecksumPolicy::Warn
        },
        retain_archive: args.retain_archive,
        fetch_timeout: args.timeout.map(Duration::from_secs),
        ..Default::default()
    };
    let surfaces = HashMap::from([(
        options.container.clone(),
        Terminal {
            container: options.container.clone(),
        },
    )]);
    let mut loader = epwload::Loader::new(surfaces, settings);

    let shown = Source::parse(&args.source)
        .map_or_else(|_| args.source.clone(), |source| source.to_string());
    println!(
        "{} {}loading {}…",
        style("[1/2]").bold().black(),
        Emoji("🚚 ", ""),
        style(shown).blue()
    );
    let context = loader
        .load(&options)
        .await
        .unwrap_or_else(|e| fail("couldn't load archive", e));

    println!(
        "{} {}writing components to {}…",
        style("[2/2]").bold().black(),
        Emoji("📃 ", ""),
        style(args.output.display()).blue()
    );
    write_components(&context, &args.output);
    println!("     {} {}", Emoji("✨ ", ""), style("done!").green());
}
