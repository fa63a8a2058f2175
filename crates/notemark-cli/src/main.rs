use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use notemark_core::{EditorConfig, LinkResolution, parse_tags};
use tracing_subscriber::EnvFilter;

use crate::store::DirectoryStore;

mod commands;
mod store;

#[derive(Parser)]
#[command(version, about = "Notemark - markdown note normalizer and inspector", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to an editor config (JSON)
    #[arg(long, global = true, env = "NOTEMARK_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-encode a note in canonical form
    Normalize {
        /// Markdown file
        file: PathBuf,

        /// Write the result back instead of printing it
        #[arg(long)]
        write: bool,
    },
    /// Print the decoded blocks of a note as JSON
    Blocks {
        /// Markdown file
        file: PathBuf,
    },
    /// Check every wikilink in a directory of notes
    Links {
        /// Directory of `.md` notes
        dir: PathBuf,
    },
    /// Toggle a task checkbox in a note and save it
    Toggle {
        /// Directory of `.md` notes
        dir: PathBuf,

        /// Note id (file stem)
        note: String,

        /// 1-based task number within the note
        task: usize,
    },
    /// Parse a comma-separated tag list
    Tags {
        /// e.g. "Rust, notes, ideas"
        list: String,
    },
}

fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Commands::Normalize { file, write } => {
            let markdown = std::fs::read_to_string(&file).into_diagnostic()?;
            let normalized = commands::normalize(&markdown, &config);
            if write {
                if normalized != markdown {
                    std::fs::write(&file, &normalized).into_diagnostic()?;
                    println!("✓ Normalized {}", file.display());
                } else {
                    println!("✓ {} already normalized", file.display());
                }
            } else {
                print!("{normalized}");
            }
        }
        Commands::Blocks { file } => {
            let markdown = std::fs::read_to_string(&file).into_diagnostic()?;
            println!("{}", commands::blocks_json(&markdown)?);
        }
        Commands::Links { dir } => {
            let store = DirectoryStore::new(dir);
            let reports = commands::link_report(&store)?;
            let missing = reports
                .iter()
                .filter(|r| r.resolution == LinkResolution::NotFound)
                .count();
            for report in &reports {
                match &report.resolution {
                    LinkResolution::Found { title } => {
                        println!("✓ {}: [[{}]] → {}", report.note, report.target, title)
                    }
                    LinkResolution::NotFound => {
                        println!("⚠ {}: [[{}]] not found", report.note, report.target)
                    }
                }
            }
            println!("{} link(s), {} missing", reports.len(), missing);
        }
        Commands::Toggle { dir, note, task } => {
            let mut store = DirectoryStore::new(dir);
            let checked = commands::toggle_task(&mut store, &config, &note, task)?;
            let mark = if checked { "x" } else { " " };
            println!("✓ {note} task #{task} is now [{mark}]");
        }
        Commands::Tags { list } => {
            for tag in parse_tags(&list) {
                println!("{tag}");
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "notemark=info,warn",
        _ => "notemark=trace,debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(3)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
