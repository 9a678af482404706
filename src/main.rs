// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for gpt2md.
//!
//! This binary provides the `gpt2md` command for converting ChatGPT data
//! exports into one Markdown file per conversation and a searchable
//! `INDEX.html`.

use gpt2md::conversation::{self, ConversationRecord};
use gpt2md::filename::FileNamer;
use gpt2md::index::{self, IndexEntry};
use gpt2md::{parser, renderer, thread};
use lexopt::prelude::*;
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// File name ChatGPT uses for the conversations in an export.
const EXPORT_FILE_NAME: &str = "conversations.json";

/// File name of the generated index page.
const INDEX_FILE_NAME: &str = "INDEX.html";

/// How often to report progress while converting.
const PROGRESS_INTERVAL: usize = 100;

/// Where to write the rendered output.
#[derive(Clone)]
enum OutputTarget {
    /// Write each conversation and the index to the specified directory.
    Directory(PathBuf),
    /// Write all conversations to stdout.
    Stdout,
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: Vec<PathBuf>,
    output: OutputTarget,
    all_branches: bool,
    show_timestamps: bool,
    heading_offset: u8,
    write_index: bool,
    quiet: bool,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("at least one input file or directory is required"))]
    NoInputFiles,

    #[snafu(display("no conversations.json found in the given inputs"))]
    NoExportFound,

    #[snafu(display("failed to create output directory: {source}"))]
    CreateOutputDir { source: std::io::Error },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseFile {
        path: PathBuf,
        source: parser::ParseError,
    },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert ChatGPT conversation exports to Markdown with a searchable index

Usage: {name} [OPTIONS] -o <OUTPUT> <INPUT>...

Arguments:
  <INPUT>...  {export} files, or directories to search for them

Options:
  -o, --output <OUTPUT>     Output directory (or - for stdout, without index)
      --heading-offset <N>  Shift heading levels by N (0-5, default: 0)
      --no-index            Do not write {index}

Branch handling:
      --all-branches        Include every edited/regenerated branch (default)
      --latest-branch       Follow only the latest branch at each edit

Metadata display (use --show-* or --hide-*):
      --show-timestamps     Include per-message timestamps (default: off)
      --hide-timestamps     Hide per-message timestamps

Other options:
  -q, --quiet               Suppress progress messages
  -n, --dry-run             Show what would be written without writing
  -f, --force               Overwrite existing output files
  -h, --help                Print help
  -V, --version             Print version

Diagnostics are controlled with RUST_LOG (default: warn).",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        export = EXPORT_FILE_NAME,
        index = INDEX_FILE_NAME,
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input = Vec::new();
    let mut output: Option<OutputTarget> = None;
    let mut all_branches = true;
    let mut show_timestamps = false;
    let mut heading_offset: u8 = 0;
    let mut write_index = true;
    let mut quiet = false;
    let mut dry_run = false;
    let mut force = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => {
                let val: PathBuf = parser.value()?.parse()?;
                output = Some(if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::Directory(val)
                });
            }
            // Show/hide flags - last one wins
            Long("all-branches") => all_branches = true,
            Long("latest-branch") => all_branches = false,
            Long("show-timestamps") => show_timestamps = true,
            Long("hide-timestamps") => show_timestamps = false,
            Long("no-index") => write_index = false,
            Long("heading-offset") => {
                let val: u8 = parser
                    .value()?
                    .parse()
                    .map_err(|_| "heading-offset must be a number 0-5")?;
                if val > 5 {
                    return Err("heading-offset must be 0-5".into());
                }
                heading_offset = val;
            }
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => input.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input,
        output: output.ok_or("missing required option: --output")?,
        all_branches,
        show_timestamps,
        heading_offset,
        write_index,
        quiet,
        dry_run,
        force,
    })
}

/// Installs the stderr diagnostics subscriber, filtered by `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;
    init_tracing();

    ensure!(!cli.input.is_empty(), NoInputFilesSnafu);

    // Collect all export files first
    let files = collect_input_files(&cli.input);
    ensure!(!files.is_empty(), NoExportFoundSnafu);

    let mut records = Vec::new();
    for file in &files {
        records.extend(load_records(file, &cli)?);
    }

    match &cli.output {
        OutputTarget::Stdout => write_to_stdout(&records, &cli),
        OutputTarget::Directory(dir) => write_to_directory(&records, dir, &cli)?,
    }

    Ok(())
}

/// Collects export files from the given inputs (files and directories).
///
/// Directories are searched recursively for `conversations.json`.
fn collect_input_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file() && e.file_name() == EXPORT_FILE_NAME)
            {
                files.push(entry.path().to_path_buf());
            }
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Creates thread options from CLI arguments.
const fn make_thread_options(cli: &Cli) -> thread::ThreadOptions {
    thread::ThreadOptions {
        include_all_branches: cli.all_branches,
    }
}

/// Creates render options from CLI arguments.
const fn make_render_options(cli: &Cli) -> renderer::RenderOptions {
    renderer::RenderOptions {
        show_timestamps: cli.show_timestamps,
        heading_offset: cli.heading_offset,
    }
}

/// Reads one export file and assembles a record per conversation.
fn load_records(path: &Path, cli: &Cli) -> Result<Vec<ConversationRecord>, Error> {
    if !cli.quiet {
        eprintln!("Reading {}...", path.display());
    }

    let json = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
    let export = parser::parse_export(&json).context(ParseFileSnafu { path })?;
    let total = export.len();

    if !cli.quiet {
        eprintln!("Found {total} conversations");
    }

    let opts = make_thread_options(cli);
    let mut records = Vec::with_capacity(total);
    for (i, conv) in export.iter().enumerate() {
        let record = conversation::assemble(conv, &opts);
        debug!(
            title = %record.title,
            messages = record.messages.len(),
            counted = record.message_count,
            "assembled conversation"
        );
        records.push(record);

        if !cli.quiet && (i + 1) % PROGRESS_INTERVAL == 0 {
            eprintln!("  Processed {}/{total}...", i + 1);
        }
    }

    Ok(records)
}

/// Writes every conversation to stdout, separated by horizontal rules.
fn write_to_stdout(records: &[ConversationRecord], cli: &Cli) {
    if cli.dry_run {
        eprintln!("Would output {} conversations", records.len());
        return;
    }

    let opts = make_render_options(cli);
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            print!("\n---\n\n");
        }
        print!("{}", renderer::render_conversation(record, &opts));
    }
}

/// Writes one Markdown file per conversation plus the index.
fn write_to_directory(records: &[ConversationRecord], dir: &Path, cli: &Cli) -> Result<(), Error> {
    if !cli.dry_run {
        std::fs::create_dir_all(dir).context(CreateOutputDirSnafu)?;
    }

    let opts = make_render_options(cli);
    let mut namer = FileNamer::new();
    let mut entries = Vec::with_capacity(records.len());
    let mut written = 0;

    for record in records {
        let name = namer.name_for(record);
        let path = dir.join(&name);
        let markdown = renderer::render_conversation(record, &opts);
        if write_output(&path, &markdown, cli)? {
            written += 1;
        }
        entries.push(IndexEntry::new(record, name));
    }

    if cli.write_index {
        let path = dir.join(INDEX_FILE_NAME);
        if write_output(&path, &index::render_index(&entries), cli)? && !cli.quiet {
            eprintln!("Wrote {}", path.display());
        }
    }

    if !cli.quiet && !cli.dry_run {
        eprintln!(
            "Wrote {written} of {} conversations to {}",
            records.len(),
            dir.display()
        );
    }
    Ok(())
}

/// Writes `contents` to `path` unless this is a dry run or the file exists.
///
/// Returns whether the file was written.
fn write_output(path: &Path, contents: &str, cli: &Cli) -> Result<bool, Error> {
    // Handle dry-run mode
    if cli.dry_run {
        eprintln!("Would write {}", path.display());
        return Ok(false);
    }

    // Check if output exists and handle overwrite
    if path.exists() && !cli.force {
        eprintln!(
            "Skipping {} (already exists, use --force to overwrite)",
            path.display()
        );
        return Ok(false);
    }

    std::fs::write(path, contents).context(WriteFileSnafu { path })?;
    Ok(true)
}
