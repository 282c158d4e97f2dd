use crate::data::{Error, Row};
use std::{fs::File, path::Path};
use tracing::debug;

/// Lazily chains the rows of several `;`-separated files, in the order the paths come.
/// Only one file is open at a time: its reader is dropped (and the handle closed) as
/// soon as it runs out of rows, or when this iterator is dropped.
/// Paths that can't be opened are skipped. Rows are raw bytes, whatever the encoding.
pub(crate) struct CsvRowReader<I> {
    paths: I,
    current: Option<csv::ByteRecordsIntoIter<File>>,
}

impl<I> CsvRowReader<I>
where
    I: Iterator,
    I::Item: AsRef<Path>,
{
    pub fn new<P: IntoIterator<IntoIter = I>>(paths: P) -> Self {
        Self {
            paths: paths.into_iter(),
            current: None,
        }
    }
}

fn open(path: &Path) -> csv::Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
}

impl<I> Iterator for CsvRowReader<I>
where
    I: Iterator,
    I::Item: AsRef<Path>,
{
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(records) = &mut self.current {
                match records.next() {
                    Some(row) => return Some(row.map_err(Error::from)),
                    None => self.current = None,
                }
            }
            let path = self.paths.next()?;
            let path = path.as_ref();
            match open(path) {
                Ok(reader) => self.current = Some(reader.into_byte_records()),
                Err(e) => debug!("skipping {}: {e}", path.display()),
            }
        }
    }
}
