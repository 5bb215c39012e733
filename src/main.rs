use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};

use codesweep::cli::{Cli, Commands, OutputFormat};
use codesweep::config::CleanupConfig;
use codesweep::io::create_writer;
use codesweep::pipeline::CleanupPipeline;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { path, output } => handle_scan(&path, output),
        Commands::Clean {
            path,
            dry_run,
            format,
            output,
        } => handle_clean(&path, dry_run, format, output),
        Commands::Duplicates { path, output } => handle_duplicates(&path, output),
    }
}

fn handle_scan(path: &Path, output: Option<PathBuf>) -> Result<()> {
    let config = CleanupConfig::load(path)?;
    let scan = CleanupPipeline::new(path.to_path_buf(), config).scan()?;

    let json = serde_json::to_string_pretty(&scan.summary())?;
    write_output(output, format!("{json}\n").as_bytes())
}

fn handle_clean(
    path: &Path,
    dry_run: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let outcome = codesweep::pipeline::run_cleanup(path, dry_run)?;

    let sink = output_sink(output)?;
    let mut writer = create_writer(format.into(), sink);
    writer.write_report(&outcome.report)?;

    if !outcome.report.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn handle_duplicates(path: &Path, output: Option<PathBuf>) -> Result<()> {
    let config = CleanupConfig::load(path)?;
    let scan = CleanupPipeline::new(path.to_path_buf(), config).scan()?;

    let json = serde_json::to_string_pretty(&scan.duplicates)?;
    write_output(output, format!("{json}\n").as_bytes())
}

fn output_sink(output: Option<PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    })
}

fn write_output(output: Option<PathBuf>, bytes: &[u8]) -> Result<()> {
    let mut sink = output_sink(output)?;
    sink.write_all(bytes)?;
    Ok(())
}
