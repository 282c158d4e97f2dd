use crate::{
    compute::Aggregator,
    config::Config,
    data::Error,
    discover::discover,
    read::CsvRowReader,
    write::ResultMerger,
};
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing::{info, instrument};

/// What a finished run prints out.
#[derive(Debug)]
pub(crate) struct Report {
    pub limit_records_in_memory: usize,
    pub flush_count: usize,
    pub result_path: PathBuf,
    pub elapsed: Duration,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Max records in memory: {}", self.limit_records_in_memory)?;
        writeln!(f, "Write cycles: {}", self.flush_count)?;
        writeln!(f, "Result file: {}", self.result_path.display())?;
        write!(f, "Elapsed: {:.3}s", self.elapsed.as_secs_f64())
    }
}

/// Aggregates every CSV file under `root` into a fresh result file.
#[instrument(level = "info", skip(root, config), fields(root = %root.display()))]
pub(crate) fn run(root: &Path, config: &Config) -> Result<Report, Error> {
    let start = Instant::now();
    // a run never merges with leftovers of a previous one
    remove_stale(config.result_path())?;
    remove_stale(&config.temp_path())?;

    let files = discover(root)?;
    info!("{} input files", files.len());

    let mut aggregator = Aggregator::new(config, ResultMerger::new(config));
    let flush_count = aggregator.aggregate(CsvRowReader::new(&files))?;
    let elapsed = start.elapsed();
    info!(flush_count, "done in {:?}", elapsed);

    Ok(Report {
        limit_records_in_memory: config.limit_records_in_memory(),
        flush_count,
        result_path: config.result_path().to_path_buf(),
        elapsed,
    })
}

fn remove_stale(path: &Path) -> Result<(), Error> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(Error::ResultWrite {
            path: path.to_path_buf(),
            source: e,
        }),
        _ => Ok(()),
    }
}
