use crate::data::Error;
use regex::bytes::Regex;
use std::path::{Path, PathBuf};

/// Maximum distinct dates kept in memory before the bucket is flushed to disk.
pub const DEFAULT_LIMIT_RECORDS_IN_MEMORY: usize = 400;
pub const DEFAULT_RESULT_PATH: &str = "result.csv";
/// Inserted between the result file stem and its extension to name the temp file.
pub const TEMP_SUFFIX: &str = "_new";
/// A row is a data row only if its first field starts with this.
pub const DATE_PATTERN: &str = r"^[0-9]{4}-[0-9]{2}-[0-9]{2}";

/// Settings shared by the aggregator, the merger and the driver. Built once, then
/// only ever borrowed.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    limit_records_in_memory: usize,
    result_path: PathBuf,
    date_pattern: Regex,
}

impl Config {
    /// `limit_records_in_memory` must be at least 1 and `result_path` must end in a
    /// file name.
    pub fn new(
        result_path: impl Into<PathBuf>,
        limit_records_in_memory: usize,
    ) -> Result<Self, Error> {
        if limit_records_in_memory == 0 {
            return Err(Error::InvalidThreshold);
        }
        let result_path = result_path.into();
        if result_path.file_stem().is_none() {
            return Err(Error::InvalidResultPath(result_path));
        }
        Ok(Self {
            limit_records_in_memory,
            result_path,
            date_pattern: Regex::new(DATE_PATTERN)?,
        })
    }

    pub fn limit_records_in_memory(&self) -> usize {
        self.limit_records_in_memory
    }

    pub fn result_path(&self) -> &Path {
        &self.result_path
    }

    pub fn date_pattern(&self) -> &Regex {
        &self.date_pattern
    }

    /// Sibling of the result file the merger writes to before renaming it:
    /// `out/result.csv` becomes `out/result_new.csv`.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self.result_path.file_stem().unwrap_or_default().to_os_string();
        name.push(TEMP_SUFFIX);
        if let Some(extension) = self.result_path.extension() {
            name.push(".");
            name.push(extension);
        }
        self.result_path.with_file_name(name)
    }
}
