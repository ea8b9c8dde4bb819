//! Record assembly for the unquoted text format: one record per line, fields
//! split on a delimiter, a marker token for NULL.

use std::{borrow::Cow, iter::FusedIterator, mem};

use bstr::ByteSlice;
use tracing::debug;

use crate::{
    cursor::ChunkCursor,
    error::LoadError,
    format::RecordFormat,
    line::{LineScanner, ReadLine, newline_len},
    options::TabularOptions,
    record::Record,
};

const END_OF_DATA: &[u8] = b"\\.";

/// Incremental assembler for delimiter separated lines without quoting.
///
/// ```rust
/// use csvmodem::{TabularOptions, TabularRecords};
///
/// let mut records = TabularRecords::new(&TabularOptions::default()).unwrap();
/// let rows: Vec<_> = records.feed(b"1\t\\N\tx\n2\t").map(Result::unwrap).collect();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].get(1), Some(None));
/// assert_eq!(records.pending(), Some(&b"2\t"[..]));
/// ```
#[derive(Debug)]
pub struct TabularRecords {
    delimiter: Vec<u8>,
    null_marker: Vec<u8>,
    carry: Vec<u8>,
    line: u64,
    skip_header: bool,
}

impl TabularRecords {
    /// Creates an assembler for the given options.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidOptions`] if the options fail validation.
    pub fn new(options: &TabularOptions) -> Result<Self, LoadError> {
        options.validate()?;
        Ok(Self {
            delimiter: options.delimiter.as_bytes().to_vec(),
            null_marker: options.null_marker.as_bytes().to_vec(),
            carry: Vec::new(),
            line: 0,
            skip_header: options.header,
        })
    }

    /// Splits the complete lines of `chunk`, continuing a line left open by
    /// earlier chunks.
    pub fn feed<'a>(&'a mut self, chunk: &'a [u8]) -> TabularFeed<'a> {
        let Self {
            delimiter,
            null_marker,
            carry,
            line,
            skip_header,
        } = self;
        let cursor = ChunkCursor::new(mem::take(carry), Cow::Borrowed(chunk));
        TabularFeed {
            lines: LineScanner::new(cursor, *line),
            delimiter,
            null_marker,
            carry,
            line,
            skip_header,
            buf: Vec::new(),
            done: false,
        }
    }

    /// Bytes of an unfinished line, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&[u8]> {
        (!self.carry.is_empty()).then_some(self.carry.as_slice())
    }
}

impl RecordFormat for TabularRecords {
    const NAME: &'static str = "text";

    type Records<'a>
        = TabularFeed<'a>
    where
        Self: 'a;

    fn feed<'a>(&'a mut self, chunk: &'a [u8]) -> Self::Records<'a> {
        TabularRecords::feed(self, chunk)
    }

    fn pending(&self) -> Option<&[u8]> {
        TabularRecords::pending(self)
    }
}

/// Records completed by one chunk, in input order.
#[derive(Debug)]
pub struct TabularFeed<'a> {
    lines: LineScanner<'a>,
    delimiter: &'a [u8],
    null_marker: &'a [u8],
    carry: &'a mut Vec<u8>,
    line: &'a mut u64,
    skip_header: &'a mut bool,
    buf: Vec<u8>,
    done: bool,
}

impl TabularFeed<'_> {
    fn split(&self, line: &[u8]) -> Record {
        let mut record = Record::default();
        for field in line.split_str(self.delimiter) {
            if field == self.null_marker {
                record.end_field(true);
            } else {
                record.extend_value(field);
                record.end_field(false);
            }
        }
        record
    }
}

impl Iterator for TabularFeed<'_> {
    type Item = Result<Record, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            match self.lines.read_line(&mut self.buf) {
                ReadLine::Complete(_) => {}
                ReadLine::Partial(_) => {
                    *self.carry = mem::take(&mut self.buf);
                    self.done = true;
                    return None;
                }
                ReadLine::EndOfInput => {
                    self.done = true;
                    return None;
                }
            }
            *self.line = self.lines.line();
            if mem::take(&mut *self.skip_header) {
                continue;
            }

            // The line reader has already turned `\r\n` into `\n`.
            let text = &self.buf[..self.buf.len() - newline_len(&self.buf)];
            if text.is_empty() {
                continue;
            }

            if text == END_OF_DATA {
                self.done = true;
                debug!(
                    line = *self.line,
                    ignored_bytes = self.lines.remaining(),
                    "end-of-data marker"
                );
                let mut record = Record::from_fields([Some("\\.")]);
                record.set_line(*self.line);
                record.mark_end_of_data();
                return Some(Ok(record));
            }

            let mut record = self.split(text);
            record.set_line(*self.line);
            return Some(Ok(record));
        }
    }
}

impl FusedIterator for TabularFeed<'_> {}
