//! # musdex CLI
//!
//! Command-line front end for the musdex library.
//!
//! ## Usage
//! ```bash
//! # Start tracking a document (extracts it into _musdex/report.docx/)
//! musdex add report.docx
//!
//! # Start a new archive from files already in _musdex/new.zip/
//! musdex add --new new.zip
//!
//! # Refresh extraction directories from changed archives (the default)
//! musdex extract
//!
//! # Pack edited directories back into their archives
//! musdex combine
//!
//! # Stop tracking
//! musdex remove report.docx
//! ```
//!
//! Invoked as `xedsum`, the default command is `combine` instead of
//! `extract`, which makes it convenient as a pre-commit hook.

use clap::{Parser, Subcommand};
use colored::*;
use humantime::format_duration;
use musdex::{AddOptions, MusdexBuilder, Result, SyncReport};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// musdex - keep zip archives and their extracted contents in sync
#[derive(Parser)]
#[command(name = "musdex")]
#[command(version)]
#[command(about = "VCS-aware zip archive extraction and combination")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file (defaults to _musdex/musdex.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract changed archives into their directories
    #[command(alias = "x")]
    Extract {
        /// Extract every entry, ignoring timestamps
        #[arg(short, long)]
        force: bool,

        /// Archives to extract (default: all)
        archive: Vec<PathBuf>,
    },

    /// Combine changed directories back into their archives
    #[command(alias = "c")]
    Combine {
        /// Combine even if nothing changed
        #[arg(short, long)]
        force: bool,

        /// Archives to combine (default: all)
        archive: Vec<PathBuf>,
    },

    /// Start tracking archives
    Add {
        /// Create a new archive from its extraction directory
        #[arg(short, long)]
        new: bool,

        /// Archive handler to use
        #[arg(long)]
        handler: Option<String>,

        /// Archives to add
        #[arg(required = true)]
        archive: Vec<PathBuf>,
    },

    /// Stop tracking archives
    #[command(alias = "rm")]
    Remove {
        /// Archives to remove
        #[arg(required = true)]
        archive: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

/// Command used when none is given on the command line
fn default_command(program: Option<&str>) -> Commands {
    let invoked_as = program
        .map(Path::new)
        .and_then(Path::file_stem)
        .and_then(|stem| stem.to_str());
    if invoked_as == Some("xedsum") {
        Commands::Combine {
            force: false,
            archive: Vec::new(),
        }
    } else {
        Commands::Extract {
            force: false,
            archive: Vec::new(),
        }
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    let root = std::env::current_dir()?;
    let mut builder = MusdexBuilder::new();
    if let Some(config) = cli.config {
        builder = builder.config_file(config);
    }
    let mut musdex = builder.build(root)?;

    let command = match cli.command {
        Some(command) => command,
        None => default_command(std::env::args().next().as_deref()),
    };

    let start = Instant::now();
    match command {
        Commands::Extract { force, archive } => {
            let report = musdex.extract(&archive, force)?;
            print_sync_report("Extracted", &report, !cli.quiet);
        }
        Commands::Combine { force, archive } => {
            let report = musdex.combine(&archive, force)?;
            print_sync_report("Combined", &report, !cli.quiet);
        }
        Commands::Add {
            new,
            handler,
            archive,
        } => {
            let report = musdex.add(&archive, &AddOptions { new, handler })?;
            if !cli.quiet {
                for path in &report.added {
                    println!("{} Tracking {}", "✓".green().bold(), path.display().to_string().cyan());
                }
                for (path, reason) in &report.skipped {
                    println!("{} Skipped {}: {}", "!".yellow().bold(), path.display(), reason.dimmed());
                }
                println!("  Files: {}", report.files);
            }
        }
        Commands::Remove { archive } => {
            let report = musdex.remove(&archive)?;
            if !cli.quiet {
                for path in &report.removed {
                    println!("{} Untracked {}", "✓".green().bold(), path.display().to_string().cyan());
                }
                for path in &report.skipped {
                    println!("{} Not configured: {}", "!".yellow().bold(), path.display());
                }
                println!("  Files removed from VCS: {}", report.files_removed);
            }
        }
    }

    if !cli.quiet {
        let elapsed = Duration::from_millis(start.elapsed().as_millis() as u64);
        println!("{}", format!("Total time: {}", format_duration(elapsed)).dimmed());
    }
    Ok(())
}

fn print_sync_report(verb: &str, report: &SyncReport, show: bool) {
    if !show {
        return;
    }
    if report.archives_processed.is_empty() {
        println!("{} Everything up to date", "✓".green().bold());
        return;
    }
    for path in &report.archives_processed {
        println!("{} {} {}", "✓".green().bold(), verb, path.display().to_string().cyan());
    }
    println!("  Files written: {}", report.files_written);
    if report.files_removed > 0 {
        println!("  Files removed: {}", report.files_removed.to_string().yellow());
    }
    if report.vcs_added > 0 {
        println!("  Added to VCS: {}", report.vcs_added);
    }
}
