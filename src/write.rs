use crate::{
    compute::BucketSink,
    config::Config,
    data::{parse_row, Bucket, Error, ResultRow, RESULT_HEADER},
    read::CsvRowReader,
};
use std::{fs, fs::File, path::Path};
use tracing::debug;

/// Folds buckets into the result file. The new content is written to a temp sibling
/// and renamed over the result, so the result path only ever holds a complete file.
pub(crate) struct ResultMerger<'c> {
    config: &'c Config,
}

impl<'c> ResultMerger<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Rewrites the result file as the sum of its current content and `bucket`:
    /// rows already in the file keep their position, new dates are appended in date
    /// order. `bucket` is left empty.
    pub fn merge(&self, bucket: &mut Bucket) -> Result<(), Error> {
        let result_path = self.config.result_path();
        let temp_path = self.config.temp_path();
        let file = File::create(&temp_path).map_err(|source| Error::ResultWrite {
            path: temp_path.clone(),
            source,
        })?;
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        wtr.write_record(RESULT_HEADER)?;

        let mut updated = 0;
        if result_path.exists() {
            for row in CsvRowReader::new([result_path]) {
                let row = row?;
                let Some((date, mut sums)) = parse_row(self.config.date_pattern(), &row)? else {
                    continue;
                };
                if let Some(extra) = bucket.remove(date) {
                    sums += extra;
                    updated += 1;
                }
                wtr.serialize(ResultRow::new(date, sums))?;
            }
        }
        let appended = bucket.len();
        for (date, sums) in std::mem::take(bucket) {
            wtr.serialize(ResultRow::new(&date, sums))?;
        }

        let file = wtr.into_inner().map_err(|e| Error::ResultWrite {
            path: temp_path.clone(),
            source: e.into_error(),
        })?;
        file.sync_all().map_err(|source| Error::ResultWrite {
            path: temp_path.clone(),
            source,
        })?;
        drop(file);
        replace(&temp_path, result_path)?;
        debug!(updated, appended, "merged into {}", result_path.display());
        Ok(())
    }
}

/// Moves the finished temp file over the result; the rename replaces the old file
/// in a single step on the same volume.
fn replace(temp_path: &Path, result_path: &Path) -> Result<(), Error> {
    fs::rename(temp_path, result_path).map_err(|source| Error::ResultWrite {
        path: result_path.to_path_buf(),
        source,
    })
}

impl BucketSink for ResultMerger<'_> {
    fn flush(&mut self, bucket: &mut Bucket) -> Result<(), Error> {
        self.merge(bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::ResultMerger;
    use crate::{
        config::Config,
        data::{Bucket, Error, Sums},
    };
    use std::fs;
    use tempfile::tempdir;

    fn bucket(entries: &[(&str, [f64; 3])]) -> Bucket {
        entries
            .iter()
            .map(|(date, sums)| (date.to_string(), Sums(*sums)))
            .collect()
    }

    #[test]
    fn test_merge_twice() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().join("test.csv"), 400).unwrap();
        let merger = ResultMerger::new(&config);

        let mut first = bucket(&[
            ("1993-03-21", [9.0, 21.0, 1.0]),
            ("1995-03-21", [9.0, 21.0, 1.0]),
        ]);
        merger.merge(&mut first).unwrap();
        assert!(first.is_empty());
        assert_eq!(
            fs::read_to_string(config.result_path()).unwrap(),
            "date; A; B; C\n1993-03-21; 9; 21; 1\n1995-03-21; 9; 21; 1\n"
        );

        merger
            .merge(&mut bucket(&[("1995-03-21", [0.0, 10.0, 2.0])]))
            .unwrap();
        assert_eq!(
            fs::read_to_string(config.result_path()).unwrap(),
            "date; A; B; C\n1993-03-21; 9; 21; 1\n1995-03-21; 9; 31; 3\n"
        );
        assert!(!config.temp_path().exists());
    }

    #[test]
    fn test_existing_rows_first_new_dates_appended() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().join("result.csv"), 400).unwrap();
        fs::write(
            config.result_path(),
            "date; A; B; C\n2020-02-01; 1; 1; 1\n2020-01-01; 2; 2; 2\n",
        )
        .unwrap();

        ResultMerger::new(&config)
            .merge(&mut bucket(&[
                ("2019-12-31", [0.25, 0.0, 0.0]),
                ("2020-01-01", [1.0, -2.0, 0.5]),
                ("2021-01-01", [3.0, 3.0, 3.0]),
            ]))
            .unwrap();
        assert_eq!(
            fs::read_to_string(config.result_path()).unwrap(),
            "date; A; B; C\n\
             2020-02-01; 1; 1; 1\n\
             2020-01-01; 3; 0; 2.5\n\
             2019-12-31; 0.25; 0; 0\n\
             2021-01-01; 3; 3; 3\n"
        );
    }

    #[test]
    fn test_empty_bucket_keeps_content() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().join("result.csv"), 400).unwrap();
        fs::write(
            config.result_path(),
            "date;A;B;C\n\n2020-01-01;1.50;2;3\nstray line\n",
        )
        .unwrap();

        ResultMerger::new(&config).merge(&mut Bucket::new()).unwrap();
        assert_eq!(
            fs::read_to_string(config.result_path()).unwrap(),
            "date; A; B; C\n2020-01-01; 1.5; 2; 3\n"
        );
    }

    #[test]
    fn test_no_duplicate_dates() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().join("result.csv"), 400).unwrap();
        let merger = ResultMerger::new(&config);
        for day in ["2020-01-01", "2020-01-02", "2020-01-01", "2020-01-02"] {
            merger.merge(&mut bucket(&[(day, [1.0, 2.0, 3.0])])).unwrap();
        }
        let content = fs::read_to_string(config.result_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            ["date; A; B; C", "2020-01-01; 2; 4; 6", "2020-01-02; 2; 4; 6"]
        );
    }

    #[test]
    fn test_corrupt_result_keeps_old_file() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().join("result.csv"), 400).unwrap();
        let corrupt = "date; A; B; C\n2020-01-01; one; 2; 3\n";
        fs::write(config.result_path(), corrupt).unwrap();

        let result =
            ResultMerger::new(&config).merge(&mut bucket(&[("2020-01-01", [1.0; 3])]));
        assert!(matches!(result, Err(Error::InvalidNumber { .. })));
        assert_eq!(fs::read_to_string(config.result_path()).unwrap(), corrupt);
    }

    #[test]
    fn test_unwritable_temp_is_an_error() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().join("missing/result.csv"), 400).unwrap();
        let result =
            ResultMerger::new(&config).merge(&mut bucket(&[("2020-01-01", [1.0; 3])]));
        assert!(matches!(result, Err(Error::ResultWrite { .. })));
    }
}
