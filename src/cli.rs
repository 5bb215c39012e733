use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
}

impl From<OutputFormat> for crate::io::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => crate::io::OutputFormat::Json,
            OutputFormat::Markdown => crate::io::OutputFormat::Markdown,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "codesweep")]
#[command(about = "Automated codebase cleanup and refactoring engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze the tree and print the cleanup plan without touching it
    Scan {
        /// Root of the tree to analyze
        path: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the full cleanup session against a git-controlled tree
    Clean {
        /// Root of the tree to clean
        path: PathBuf,

        /// Plan and report only; perform no mutation, backup, or commit
        #[arg(long)]
        dry_run: bool,

        /// Output format for the report
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report cross-file duplicates and extraction candidates
    Duplicates {
        /// Root of the tree to analyze
        path: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
