//! linkwalk - walk a directory tree, reporting each inode once.
//!
//! Usage:
//!   linkwalk [PATH]                   Print every entry under PATH
//!   linkwalk --report-hard-links      Also print repeated hard links
//!   linkwalk -L --max-depth 2         Follow symlinks, two levels deep
//!   linkwalk --format json            One JSON object per event
//!   linkwalk --help                   Show help

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use linkwalk_core::{EventKind, EventMask, WalkConfig, WalkEvent, WalkSummary};
use linkwalk_engine::Walker;

#[derive(Parser)]
#[command(
    name = "linkwalk",
    version,
    about = "Walk a directory tree, reporting each inode once",
    long_about = "linkwalk lists every entry under a directory, skipping extra names \
                  of hard-linked files unless asked to report them.\n\n\
                  Failures on individual entries are reported and the walk carries on."
)]
struct Cli {
    /// Path to walk (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Report repeated hard links as links instead of skipping them
    #[arg(long)]
    report_hard_links: bool,

    /// Deepest directory level that is still listed
    #[arg(short = 'd', long)]
    max_depth: Option<u32>,

    /// Follow symbolic links
    #[arg(short = 'L', long)]
    follow_symlinks: bool,

    /// Report every hard-linked name as a regular entry
    #[arg(long)]
    no_track_hard_links: bool,

    /// Directories listed concurrently (0 = default)
    #[arg(short = 'j', long, default_value = "0")]
    concurrency: usize,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Print only the summary
    #[arg(short, long)]
    summary: bool,

    /// Verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = build_config(&cli)?;
    debug!(?config, "starting walk");

    let mut handle = Walker::new(config).walk(&cli.path);

    let stopper = handle.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping walk");
            stopper.stop();
        }
    });

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut summary = WalkSummary::default();

    while let Some(event) = handle.next().await {
        if let WalkEvent::End(end) = &event {
            summary = end.clone();
        }
        if cli.summary {
            continue;
        }
        let written = match cli.format {
            OutputFormat::Text => write_text(&mut out, &event),
            OutputFormat::Json => write_json(&mut out, &event),
        };
        // A closed pipe ends the walk quietly
        if let Err(err) = written {
            if err.kind() == io::ErrorKind::BrokenPipe {
                handle.stop();
                return Ok(());
            }
            return Err(err).context("Failed to write output");
        }
    }
    out.flush().context("Failed to write output")?;
    drop(out);

    if cli.summary {
        match cli.format {
            OutputFormat::Text => print_summary(&cli.path, &summary),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("linkwalk=debug,linkwalk_engine=debug,warn")
    } else {
        EnvFilter::new("linkwalk=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Map command-line flags onto a walk config.
fn build_config(cli: &Cli) -> Result<WalkConfig> {
    // The text listing prints kind events, so the duplicate Path events are dropped
    let events = match (cli.summary, cli.format) {
        (true, _) => EventMask::none(),
        (false, OutputFormat::Text) => EventMask::all().without(EventKind::Path),
        (false, OutputFormat::Json) => EventMask::all(),
    };

    WalkConfig::builder()
        .report_hard_links(cli.report_hard_links)
        .max_depth(cli.max_depth)
        .follow_symlinks(cli.follow_symlinks)
        .track_hard_links(!cli.no_track_hard_links)
        .concurrency(cli.concurrency)
        .events(events)
        .build()
        .context("Invalid walk configuration")
}

/// Write one event as `kind<TAB>path`.
fn write_text(out: &mut impl Write, event: &WalkEvent) -> io::Result<()> {
    match event {
        WalkEvent::Error { path, error } => {
            writeln!(out, "{}\t{}\t{}", event.kind(), path.display(), error)
        }
        WalkEvent::Fail(failure) => writeln!(
            out,
            "{}\t{}\t{}",
            event.kind(),
            failure.path.display(),
            failure.message
        ),
        WalkEvent::End(summary) => writeln!(out, "{}\t{}", event.kind(), summary),
        _ => match event.path() {
            Some(path) => writeln!(out, "{}\t{}", event.kind(), path.display()),
            None => Ok(()),
        },
    }
}

/// Write one event as a single-line JSON object.
fn write_json(out: &mut impl Write, event: &WalkEvent) -> io::Result<()> {
    let kind = event.kind();
    let value = match event {
        WalkEvent::Error { path, error } => json!({
            "event": kind,
            "path": path,
            "message": error.to_string(),
        }),
        WalkEvent::Fail(failure) => json!({ "event": kind, "failure": failure }),
        WalkEvent::Empty(path) => json!({ "event": kind, "path": path }),
        WalkEvent::End(summary) => json!({ "event": kind, "summary": summary }),
        _ => json!({ "event": kind, "entry": event.entry() }),
    };
    serde_json::to_writer(&mut *out, &value)?;
    writeln!(out)
}

fn print_summary(path: &Path, summary: &WalkSummary) {
    println!();
    println!("{}", "─".repeat(60));
    println!(" {} - {}", path.display(), format_size(summary.bytes));
    println!(" {summary}");
    println!(
        " Walked {} directories in {:.2}s",
        summary.expanded,
        summary.elapsed.as_secs_f64()
    );
    println!("{}", "─".repeat(60));
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
