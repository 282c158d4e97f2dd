use anyhow::Context;
use clap::Parser;
use config::{Config, DEFAULT_LIMIT_RECORDS_IN_MEMORY, DEFAULT_RESULT_PATH};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod compute;
mod config;
mod data;
mod discover;
mod driver;
mod read;
mod write;

/// Sums the A, B and C columns of every `;`-separated CSV file under a directory,
/// grouped by date, into a single result file.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Directory searched recursively for `.csv` files
    path: PathBuf,
    /// Maximum number of distinct dates kept in memory between two writes
    #[arg(short, long, default_value_t = DEFAULT_LIMIT_RECORDS_IN_MEMORY)]
    limit: usize,
    /// Result file
    #[arg(short, long, default_value = DEFAULT_RESULT_PATH)]
    output: PathBuf,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env).with_writer(std::io::stderr).init();

    let config = Config::new(cli.output, cli.limit).context("invalid configuration")?;
    let report = driver::run(&cli.path, &config)
        .with_context(|| format!("aggregating {}", cli.path.display()))?;
    println!("{report}");
    Ok(())
}
