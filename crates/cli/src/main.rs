//! codemap CLI
//!
//! Generates a map of code symbols from a directory using universal-ctags.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codemap_core::{format_output, MapConfig, MapScanner, OutputFormat};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Generate a map of code symbols from a directory
#[derive(Parser)]
#[command(name = "codemap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate a map of code symbols from a directory using universal-ctags")]
#[command(long_about = r#"
codemap: Repository Symbol Maps

Walks a directory, honoring .gitignore and .mapignore rules at every
level, runs universal-ctags over it, and writes an indented map of the
classes, functions, and variables found in each file.

Output formats:
  - Text (default) - The classic indented map
  - JSON / YAML    - Structured data for programmatic use
  - Summary        - Counts only

Examples:
  codemap                      # Map the current directory into MAP.txt
  codemap src -o -             # Map src/ to stdout
  codemap --format json        # Structured output
  codemap list --all           # Show every file with its inclusion status
"#)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory to analyze (default: current directory)
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Output file path (use - for stdout)
    #[arg(short, long, default_value = "MAP.txt")]
    pub output: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Text)]
    pub format: OutputFormatArg,

    /// Include symbols that would normally be filtered out
    #[arg(short, long)]
    pub debug: bool,

    /// Tagger executable to run
    #[arg(long, default_value = "ctags")]
    pub tagger: String,

    /// Number of threads for parallel processing (default: auto)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// List files that would be included in the map (one per line)
    List {
        /// Directory to analyze
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Also show excluded files, with a status marker per line
        #[arg(long)]
        all: bool,
    },
}

/// Output format argument
#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormatArg {
    Text,
    Json,
    Yaml,
    Summary,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Text => OutputFormat::Text,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Summary => OutputFormat::Summary,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    match &args.command {
        Some(Commands::List { path, all }) => run_list(path, *all, &args),
        None => run_map(&args.directory, &args),
    }
}

/// Build scanner configuration from args
fn build_config(directory: &Path, args: &Args) -> MapConfig {
    let output_path = if args.output == "-" {
        None
    } else {
        Some(PathBuf::from(&args.output))
    };

    let mut config = MapConfig::new(directory.to_path_buf())
        .with_output_path(output_path)
        .with_tagger_program(args.tagger.clone())
        .with_debug(args.debug);

    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }

    config
}

fn run_map(directory: &Path, args: &Args) -> Result<()> {
    if !directory.is_dir() {
        anyhow::bail!("{} is not a directory", directory.display());
    }

    let config = build_config(directory, args);

    // Show progress spinner
    let spinner = if args.verbose && atty::is(atty::Stream::Stderr) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Mapping repository...");
        Some(pb)
    } else {
        None
    };

    let scanner = MapScanner::new(config);
    let result = scanner.scan().context("Failed to scan directory")?;

    if let Some(ref pb) = spinner {
        pb.finish_with_message(format!(
            "Mapped {} files in {}ms",
            result.stats.total_files, result.metadata.scan_duration_ms
        ));
    }

    let format: OutputFormat = args.format.clone().into();
    let output = format_output(&result, format)?;

    if args.output == "-" {
        print!("{}", output);
        return Ok(());
    }

    // Relative output paths resolve against the repository root so the
    // map lands in a predictable place regardless of the scanned subtree.
    let requested = PathBuf::from(&args.output);
    let map_file = if requested.is_absolute() {
        requested
    } else {
        let base = scanner
            .base_dir()
            .context("Failed to resolve repository root")?;
        base.join(requested)
    };

    backup_existing(&map_file)?;
    fs::write(&map_file, output).context("Failed to write output file")?;
    println!("Created/updated: {}", map_file.display());

    Ok(())
}

/// Move an existing map aside to `<name>~`, replacing any older backup.
fn backup_existing(map_file: &Path) -> Result<()> {
    if !map_file.exists() {
        return Ok(());
    }
    let mut backup = map_file.as_os_str().to_os_string();
    backup.push("~");
    let backup = PathBuf::from(backup);
    if backup.exists() {
        fs::remove_file(&backup).context("Failed to remove old backup")?;
    }
    fs::rename(map_file, &backup).context("Failed to back up existing map")?;
    Ok(())
}

fn run_list(path: &Path, all: bool, args: &Args) -> Result<()> {
    if !path.is_dir() {
        anyhow::bail!("{} is not a directory", path.display());
    }

    let config = build_config(path, args);
    let scanner = MapScanner::new(config);
    let listing = scanner.list_files(all).context("Failed to list files")?;

    for status in listing {
        match (&status.display, all) {
            (Some(display), true) => {
                let marker = if status.included {
                    "I".green()
                } else {
                    ".".dimmed()
                };
                println!("{} {}", marker, display.display());
            }
            (Some(display), false) => println!("{}", display.display()),
            // Outside the repository root there is nothing to resolve
            // rules against.
            (None, true) => println!("{} {}", "E".red(), status.path.display()),
            (None, false) => {}
        }
    }

    Ok(())
}
