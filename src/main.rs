//! Main entry point for the zipfly CLI application.
//!
//! Packs local files into a ZIP/ZIP64 archive written either to a file or,
//! in streaming mode, straight to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::VecDeque;
use std::io::{self, BufWriter, StdoutLock};
use std::path::Path;

use zipfly::{
    ArchiveWriter, Cli, ClosedArchive, CompressionMethod, EntryOptions, FileSink, HeaderKind,
    HeaderObserver, Sink, StreamSink,
};

/// Application entry point.
///
/// Dispatches on the archive argument: `-` streams to stdout, anything else
/// is created as a file.
fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.is_stdout() {
        let mut writer: ArchiveWriter<StreamSink<BufWriter<StdoutLock<'static>>>> =
            configure(&cli)?;
        writer.create(StreamSink::new(BufWriter::new(io::stdout().lock())))?;
        let closed = pack(&mut writer, &cli)?;
        report(&closed, &cli);
    } else {
        let mut writer: ArchiveWriter<FileSink> = configure(&cli)?;
        writer
            .create_file(&cli.archive, !cli.never_overwrite)
            .with_context(|| format!("cannot create {}", cli.archive))?;
        let closed = pack(&mut writer, &cli)?;
        report(&closed, &cli);
    }

    Ok(())
}

/// Build a writer with the features and hooks selected on the command line.
fn configure<S: Sink>(cli: &Cli) -> Result<ArchiveWriter<S>> {
    let mut writer = ArchiveWriter::with_duplicate_filter(cli.dedupe.into());
    writer.set_zip_feature(!cli.no_zip64, cli.is_streaming())?;
    if cli.debug {
        writer.set_header_observer(Box::new(HeaderDump));
    }
    Ok(writer)
}

/// Add every input file and close the archive.
///
/// Progress goes to stderr so it never mixes with a streamed archive.
fn pack<S: Sink>(writer: &mut ArchiveWriter<S>, cli: &Cli) -> Result<ClosedArchive<S>> {
    let method: CompressionMethod = cli.method.into();
    let options = EntryOptions::new().method(method).level(cli.level.into());

    for file in &cli.files {
        let name = archive_name(file, cli.junk_paths);
        writer
            .add_file(file, &name, options)
            .with_context(|| format!("cannot add {}", file))?;

        if !cli.is_quiet() {
            let ratio = writer
                .last_entry()
                .map(|d| compression_ratio(d.compressed_size, d.uncompressed_size))
                .unwrap_or(0);
            eprintln!("  adding: {} ({} {}%)", name, method_verb(method), ratio);
        }
    }

    Ok(writer.close()?)
}

/// Print the archive summary unless quiet.
fn report<S>(closed: &ClosedArchive<S>, cli: &Cli) {
    if cli.is_quiet() {
        return;
    }
    eprintln!(
        "{} entries, {} written to {}",
        closed.entries,
        format_size(closed.total_size),
        if cli.is_stdout() { "stdout" } else { cli.archive.as_str() }
    );
}

/// In-archive name for a local path; `-j` keeps the file name only.
fn archive_name(local: &str, junk_paths: bool) -> String {
    if junk_paths {
        Path::new(local)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| local.to_string())
    } else {
        local.to_string()
    }
}

fn method_verb(method: CompressionMethod) -> &'static str {
    match method {
        CompressionMethod::Store => "stored",
        CompressionMethod::Deflate => "deflated",
        CompressionMethod::Bzip2 => "bzipped",
    }
}

/// Space saved as a whole percentage; 0 for empty or grown entries.
fn compression_ratio(compressed: u64, uncompressed: u64) -> u64 {
    if uncompressed == 0 || compressed >= uncompressed {
        0
    } else {
        100 - (compressed * 100 / uncompressed)
    }
}

/// Hex field dump of every header, on stderr.
struct HeaderDump;

impl HeaderObserver for HeaderDump {
    fn on_header(&mut self, kind: HeaderKind, offset: Option<u64>, bytes: &[u8]) {
        match offset {
            Some(offset) => eprintln!("{} @ {:#x} ({} bytes)", kind.name(), offset, bytes.len()),
            None => eprintln!("{} ({} bytes)", kind.name(), bytes.len()),
        }

        let fields = kind.fields();
        // Variable fields take their widths from the preceding length fields
        // in order; without any (data descriptor) they split what is left.
        let mut lengths: VecDeque<usize> = VecDeque::new();
        let mut pos = 0;

        for (i, field) in fields.iter().enumerate() {
            let width = if field.width > 0 {
                field.width
            } else if let Some(len) = lengths.pop_front() {
                len
            } else {
                let open = fields[i..].iter().filter(|f| f.width == 0).count();
                bytes.len().saturating_sub(pos) / open.max(1)
            };
            let end = (pos + width).min(bytes.len());
            let value = &bytes[pos..end];

            if field.width > 0 && field.name.ends_with("length") {
                lengths.push_back(le_value(value) as usize);
            }
            eprintln!("  {:<48} {}", field.name, hex(value));
            pos = end;
        }
    }
}

fn le_value(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
