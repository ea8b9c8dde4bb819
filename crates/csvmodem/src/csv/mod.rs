//! Record assembly for the quoted, comma separated format.

mod scanner;

use std::mem;

use tracing::debug;

use self::scanner::{ScanStep, scan_record};
use crate::{
    cursor::ChunkCursor,
    encoding::StreamEncoding,
    error::LoadError,
    format::RecordFormat,
    line::LineScanner,
    options::CsvOptions,
    record::Record,
};

/// Incremental CSV record assembler.
///
/// Each call to [`CsvRecords::feed`] yields every record completed by the
/// chunk. A record left unfinished at the end of the chunk is kept and
/// scanned again, together with the next chunk, from its first byte.
///
/// ```rust
/// use csvmodem::{CsvOptions, CsvRecords};
///
/// let mut records = CsvRecords::new(&CsvOptions::default()).unwrap();
/// assert_eq!(records.feed(b"1,100,ba").count(), 0);
/// assert!(records.pending().is_some());
///
/// let rows: Vec<_> = records.feed(b"r\n2,200,bash\n").map(Result::unwrap).collect();
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0].get(2), Some(Some(&b"bar"[..])));
/// assert!(records.pending().is_none());
/// ```
#[derive(Debug)]
pub struct CsvRecords {
    delimiter: Vec<u8>,
    carry: Vec<u8>,
    line: u64,
    encoding: StreamEncoding,
}

impl CsvRecords {
    /// Creates an assembler for the given options.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidOptions`] if the options fail validation.
    pub fn new(options: &CsvOptions) -> Result<Self, LoadError> {
        options.validate()?;
        Ok(Self {
            delimiter: options.delimiter.as_bytes().to_vec(),
            carry: Vec::new(),
            line: 0,
            encoding: StreamEncoding::default(),
        })
    }

    /// Scans `chunk`, continuing any record left open by earlier chunks.
    pub fn feed<'a>(&'a mut self, chunk: &'a [u8]) -> CsvFeed<'a> {
        let Self {
            delimiter,
            carry,
            line,
            encoding,
        } = self;
        let decoded = encoding.decode(chunk);
        let cursor = ChunkCursor::new(mem::take(carry), decoded);
        CsvFeed {
            lines: LineScanner::new(cursor, *line),
            delimiter,
            carry,
            line,
            done: false,
        }
    }

    /// Bytes of an unfinished record, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&[u8]> {
        let held = self.encoding.held();
        if !self.carry.is_empty() {
            Some(&self.carry)
        } else if !held.is_empty() {
            Some(held)
        } else {
            None
        }
    }
}

impl RecordFormat for CsvRecords {
    const NAME: &'static str = "csv";

    type Records<'a>
        = CsvFeed<'a>
    where
        Self: 'a;

    fn feed<'a>(&'a mut self, chunk: &'a [u8]) -> Self::Records<'a> {
        CsvRecords::feed(self, chunk)
    }

    fn pending(&self) -> Option<&[u8]> {
        CsvRecords::pending(self)
    }

    fn end_input(&mut self) {
        let tail = self.encoding.flush();
        self.carry.extend_from_slice(&tail);
    }
}

/// Records completed by one chunk, in input order.
///
/// Iteration stops after the end-of-data marker or the first error; bytes
/// after either are discarded.
#[derive(Debug)]
pub struct CsvFeed<'a> {
    lines: LineScanner<'a>,
    delimiter: &'a [u8],
    carry: &'a mut Vec<u8>,
    line: &'a mut u64,
    done: bool,
}

impl Iterator for CsvFeed<'_> {
    type Item = Result<Record, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match scan_record(&mut self.lines, self.delimiter) {
            Ok(ScanStep::Record(record)) => {
                *self.line = self.lines.line();
                if record.is_end_of_data() {
                    self.done = true;
                    debug!(
                        line = record.line(),
                        ignored_bytes = self.lines.remaining(),
                        "end-of-data marker"
                    );
                }
                Some(Ok(record))
            }
            Ok(ScanStep::Partial(raw)) => {
                *self.line = self.lines.line() - line_feeds(&raw);
                *self.carry = raw;
                self.done = true;
                None
            }
            Ok(ScanStep::Exhausted) => {
                *self.line = self.lines.line();
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err.into()))
            }
        }
    }
}

impl std::iter::FusedIterator for CsvFeed<'_> {}

/// Complete lines inside a carried record, which are read again next feed.
fn line_feeds(raw: &[u8]) -> u64 {
    raw.iter().filter(|&&b| b == b'\n').count() as u64
}
