use crate::{
    config::Config,
    data::{parse_row, Bucket, Error, Row},
};
use tracing::debug;

/// Somewhere to put a full bucket. The real one is the `ResultMerger`, which folds it
/// into the result file; tests use an in-memory mock to look at the flush cadence.
/// Implementations may drain the bucket, the aggregator clears it afterwards anyway.
pub(crate) trait BucketSink {
    fn flush(&mut self, bucket: &mut Bucket) -> Result<(), Error>;
}

/// Streaming reducer: sums rows by date in a bucket that never holds more than
/// `limit_records_in_memory` dates, handing it to the sink whenever it fills up.
pub(crate) struct Aggregator<'c, S> {
    config: &'c Config,
    sink: S,
    bucket: Bucket,
}

impl<'c, S: BucketSink> Aggregator<'c, S> {
    pub fn new(config: &'c Config, sink: S) -> Self {
        Self {
            config,
            sink,
            bucket: Bucket::new(),
        }
    }

    /// Consumes the whole row stream and returns how many times the bucket was flushed.
    /// Stops at the first read or parse error; what was flushed before stays flushed.
    pub fn aggregate<R>(&mut self, rows: R) -> Result<usize, Error>
    where
        R: IntoIterator<Item = Result<Row, Error>>,
    {
        let mut flushes = 0;
        for row in rows {
            let row = row?;
            let Some((date, sums)) = parse_row(self.config.date_pattern(), &row)? else {
                continue;
            };
            // avoids allocating a key for dates already in the bucket
            match self.bucket.get_mut(date) {
                Some(entry) => *entry += sums,
                None => {
                    self.bucket.insert(date.to_string(), sums);
                }
            }
            if self.bucket.len() >= self.config.limit_records_in_memory() {
                self.flush()?;
                flushes += 1;
            }
        }
        if !self.bucket.is_empty() {
            self.flush()?;
            flushes += 1;
        }
        Ok(flushes)
    }

    fn flush(&mut self) -> Result<(), Error> {
        debug!(dates = self.bucket.len(), "flushing bucket");
        self.sink.flush(&mut self.bucket)?;
        self.bucket.clear();
        Ok(())
    }
}
