//! dirtally - Concurrent filtered directory listing and size aggregation.
//!
//! Usage:
//!   dirtally files [PATH]    List files
//!   dirtally dirs [PATH]     List directories
//!   dirtally all [PATH]      List files and directories
//!   dirtally get [PATH]      Show a single entry
//!   dirtally du [PATH]       Aggregate sizes and counts
//!   dirtally --help          Show help

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dirtally_core::{DirectoryAggregate, Entry, TimeFilter, TraversalOptions};
use dirtally_scan::{ListKind, ResultStream, TreeWalker};

#[derive(Parser)]
#[command(
    name = "dirtally",
    version,
    about = "Concurrent filtered directory listing and size aggregation",
    long_about = "dirtally walks directory trees concurrently, listing entries that pass \
                  match, ignore, depth and time filters, or totalling size, file count \
                  and directory count per tree."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List files
    Files(ListArgs),

    /// List directories
    Dirs(ListArgs),

    /// List files and directories
    All(ListArgs),

    /// Show the entry for PATH itself
    Get(ListArgs),

    /// Total size, file count and directory count
    Du {
        #[command(flatten)]
        list: ListArgs,

        /// Leave unreadable subtrees out of the totals instead of failing
        #[arg(long)]
        err_skip: bool,

        /// Report every directory, not just the root
        #[arg(long)]
        each: bool,

        /// Include child aggregates in the output
        #[arg(long)]
        children: bool,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Path to walk
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Include only paths matching any of these regular expressions
    #[arg(short, long = "match", value_name = "REGEX")]
    matches: Vec<String>,

    /// Exclude paths matching any of these regular expressions
    #[arg(short, long, value_name = "REGEX")]
    ignore: Vec<String>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recurse: bool,

    /// Maximum depth below PATH (0 = unbounded with --recurse)
    #[arg(short, long)]
    depth: Option<usize>,

    /// Modification-time filter, e.g. "after:2024-01-01T00:00:00Z"
    #[arg(short, long, value_name = "OP:TIME")]
    time: Vec<TimeFilter>,

    /// Concurrent descent permits (0 = available parallelism)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Read base options from a JSON file; flags override it
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Print JSON lines instead of text
    #[arg(long)]
    json: bool,
}

impl ListArgs {
    /// Merge the options file (if any) with the flags.
    fn traversal_options(&self) -> Result<TraversalOptions> {
        let mut options = match &self.options {
            Some(file) => {
                let raw = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Invalid options file {}", file.display()))?
            }
            None => TraversalOptions::default(),
        };

        options.match_patterns.extend(self.matches.iter().cloned());
        options.ignore_patterns.extend(self.ignore.iter().cloned());
        options.time_filters.extend(self.time.iter().copied());
        options.recurse |= self.recurse;
        if let Some(depth) = self.depth {
            options.max_depth = depth;
        }
        if let Some(jobs) = self.jobs {
            options.concurrency = jobs;
        }

        Ok(options)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let walker = TreeWalker::new();
    let cancel = walker.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling traversal");
            cancel.cancel();
        }
    });

    match cli.command {
        Command::Files(args) => run_list(&walker, &args, ListKind::Files).await,
        Command::Dirs(args) => run_list(&walker, &args, ListKind::Dirs).await,
        Command::All(args) => run_list(&walker, &args, ListKind::All).await,
        Command::Get(args) => run_get(&walker, &args).await,
        Command::Du {
            list,
            err_skip,
            each,
            children,
        } => run_du(&walker, &list, err_skip, each, children).await,
    }
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("dirtally=debug,dirtally_scan=debug,warn")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Stream a listing to stdout.
async fn run_list(walker: &TreeWalker, args: &ListArgs, kind: ListKind) -> Result<()> {
    let options = args.traversal_options()?;
    let mut stream = walker
        .walk(&args.path, &options, kind)
        .await
        .with_context(|| format!("Cannot list {}", args.path.display()))?;

    let mut count = 0u64;
    let mut errors = 0u64;
    while let Some(entry) = stream.next().await {
        if entry.has_error() {
            errors += 1;
        }
        count += 1;
        print_entry(&entry, args.json)?;
    }

    debug!(count, errors, "Listing finished");
    if errors > 0 {
        eprintln!("{} error(s) during listing", errors);
    }
    Ok(())
}

/// Look up a single entry.
async fn run_get(walker: &TreeWalker, args: &ListArgs) -> Result<()> {
    let options = args.traversal_options()?;
    let entry = walker
        .get_entry(&args.path, &options)
        .await
        .with_context(|| format!("Cannot read {}", args.path.display()))?;

    print_entry(&entry, args.json)
}

/// Aggregate the tree under PATH.
async fn run_du(
    walker: &TreeWalker,
    args: &ListArgs,
    err_skip: bool,
    each: bool,
    children: bool,
) -> Result<()> {
    let mut options = args.traversal_options()?;
    options.err_skip |= err_skip;
    options.keep_children |= children;

    if each {
        let stream = walker
            .list_aggregates(&args.path, &options)
            .await
            .with_context(|| format!("Cannot aggregate {}", args.path.display()))?;
        return print_aggregates(stream, &args.path, args.json).await;
    }

    let aggregate = walker
        .aggregate(&args.path, &options)
        .await
        .with_context(|| format!("Cannot aggregate {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&aggregate)?);
    } else {
        print_aggregate(&aggregate, &args.path, 0);
        println!(
            "{} files, {} directories",
            aggregate.file_count, aggregate.dir_count
        );
        for skipped in &aggregate.skipped {
            eprintln!("skipped: {}", skipped);
        }
    }
    Ok(())
}

async fn print_aggregates(
    mut stream: ResultStream<DirectoryAggregate>,
    root: &Path,
    json: bool,
) -> Result<()> {
    while let Some(aggregate) = stream.next().await {
        if json {
            println!("{}", serde_json::to_string(&aggregate)?);
        } else {
            print_aggregate(&aggregate, root, 0);
        }
    }
    Ok(())
}

/// Print an aggregate and, when kept, its children.
fn print_aggregate(aggregate: &DirectoryAggregate, root: &Path, indent: usize) {
    let label = match aggregate.path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.display().to_string(),
        _ => aggregate.path.display().to_string(),
    };

    match &aggregate.error {
        Some(err) => println!("{}{:>10}  {}  ({})", "  ".repeat(indent), "-", label, err),
        None => println!(
            "{}{:>10}  {}",
            "  ".repeat(indent),
            format_size(aggregate.size),
            label
        ),
    }

    for child in &aggregate.children {
        print_aggregate(child, root, indent + 1);
    }
}

fn print_entry(entry: &Entry, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(entry)?);
        return Ok(());
    }

    match (&entry.error, entry.metadata) {
        (Some(err), _) => eprintln!("{}: {}", entry.path.display(), err),
        (None, Some(metadata)) => {
            let modified: chrono::DateTime<chrono::Local> = metadata.modified.into();
            let size = if metadata.is_dir {
                "-".to_string()
            } else {
                format_size(metadata.size)
            };
            println!(
                "{:>10}  {}  {}{}",
                size,
                modified.format("%Y-%m-%d %H:%M"),
                entry.path.display(),
                if metadata.is_dir { "/" } else { "" }
            );
        }
        (None, None) => println!("{}", entry.path.display()),
    }
    Ok(())
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
