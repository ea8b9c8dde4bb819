//! Streaming bulk loader for CSV and delimiter separated text.
//!
//! Data arrives in chunks of arbitrary size, as it does on a `COPY FROM
//! STDIN` connection. A [`LoadSession`] scans every record the chunks
//! complete, decodes each field with the target column's
//! [`ColumnDecoder`], and inserts the rows into a [`RowSink`] inside one
//! transaction. A record cut off by the end of a chunk is carried over and
//! finished by the next one, so the rows never depend on where the chunks
//! were split.
//!
//! ```rust
//! use csvmodem::{Column, CsvDataLoader, CsvOptions, MemorySink};
//!
//! let mut sink = MemorySink::new();
//! let columns = vec![Column::text("id"), Column::text("note")];
//! let mut loader = CsvDataLoader::begin(&mut sink, columns, &CsvOptions::default())?;
//!
//! loader.feed(b"1,\"multi\nli")?;
//! loader.feed(b"ne\"\n2,\"\"\n\\.\n")?;
//! let summary = loader.finish()?;
//!
//! assert_eq!(summary.rows_loaded, 2);
//! assert_eq!(sink.rows()[0][1].as_deref(), Some("multi\nline"));
//! assert_eq!(sink.rows()[1][1].as_deref(), Some(""));
//! # Ok::<(), csvmodem::LoadError>(())
//! ```

#[cfg(any(test, feature = "fuzzing"))]
#[doc(hidden)]
pub mod chunk_utils;

mod csv;
mod cursor;
mod encoding;
mod error;
mod format;
mod line;
mod options;
mod record;
mod session;
mod sink;
mod tabular;

#[cfg(test)]
mod tests;

pub use csv::{CsvFeed, CsvRecords};
pub use error::{BoxError, FieldCountError, FieldCountKind, LoadError, QuoteError};
pub use format::RecordFormat;
pub use options::{CsvOptions, TabularOptions};
pub use record::{Fields, Record};
pub use session::{
    CsvDataLoader, DataLoader, LoadSession, LoadSummary, TabularDataLoader, feed_reader,
};
pub use sink::{Column, ColumnDecoder, MemorySink, MemorySinkError, Row, RowSink, TextDecoder};
pub use tabular::{TabularFeed, TabularRecords};
