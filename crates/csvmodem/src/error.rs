use std::{error::Error, io};

use thiserror::Error;

/// Boxed failure reported by a sink or a column decoder.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// An unescaped `"` inside a quoted field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "parse error on line {line}, column {column}: extraneous or missing \" in quoted field \
     (record starts on line {start_line})"
)]
pub struct QuoteError {
    /// Line on which the offending record begins.
    pub start_line: u64,
    /// Line holding the offending quote.
    pub line: u64,
    /// 1-based character column of the byte following the quote.
    pub column: usize,
}

/// How a record's width disagreed with the target columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCountKind {
    /// The record ended before this column received a value.
    Missing {
        /// Name of the first column without a value.
        column: String,
    },
    /// The record carried more fields than there are columns.
    Extra,
}

/// A record whose field count does not match the target columns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} (expected {expected} fields, found {actual}) on line {line}", describe(.kind))]
pub struct FieldCountError {
    /// Missing or extra data.
    pub kind: FieldCountKind,
    /// Number of target columns.
    pub expected: usize,
    /// Number of fields parsed from the record.
    pub actual: usize,
    /// Line on which the record begins.
    pub line: u64,
}

fn describe(kind: &FieldCountKind) -> String {
    match kind {
        FieldCountKind::Missing { column } => format!("missing data for column \"{column}\""),
        FieldCountKind::Extra => "extra data after last expected column".to_string(),
    }
}

/// Terminal failures surfaced by a load session.
///
/// Running out of input in the middle of a record is not represented here:
/// the session keeps the unfinished bytes and resumes on the next chunk. Only
/// [`LoadError::IncompleteFinalRecord`] reports such bytes, and only once the
/// caller declares the stream finished.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The format options cannot describe an unambiguous stream.
    #[error("invalid load options: {0}")]
    InvalidOptions(&'static str),

    /// A quoted field contained a bare quote.
    #[error(transparent)]
    Quote(#[from] QuoteError),

    /// A record was shorter or longer than the target columns.
    #[error(transparent)]
    FieldCount(#[from] FieldCountError),

    /// A field was not valid UTF-8.
    #[error("invalid UTF-8 in column \"{column}\" on line {line}")]
    InvalidUtf8 {
        /// Column receiving the field.
        column: String,
        /// Line on which the record begins.
        line: u64,
    },

    /// A column decoder rejected a field.
    #[error("invalid input for column \"{column}\" on line {line}: {text:?}: {source}")]
    Decode {
        /// Column whose decoder failed.
        column: String,
        /// The raw field text.
        text: String,
        /// Line on which the record begins.
        line: u64,
        /// The decoder's own error.
        #[source]
        source: BoxError,
    },

    /// The sink refused to open its transaction.
    #[error("failed to begin load transaction: {0}")]
    Begin(#[source] BoxError),

    /// The sink rejected a row.
    #[error("failed to insert row {row}: {source}")]
    Insert {
        /// 1-based index of the rejected row within this load.
        row: u64,
        /// The sink's own error.
        #[source]
        source: BoxError,
    },

    /// The sink could not commit the load; the load was discarded instead.
    #[error("failed to finalize load: {0}")]
    Finalize(#[source] BoxError),

    /// The sink could not discard the load.
    #[error("failed to discard load: {0}")]
    Discard(#[source] BoxError),

    /// Input ended while a record was still open.
    #[error("incomplete record found at end of data: {partial:?}")]
    IncompleteFinalRecord {
        /// The unterminated tail, lossily decoded.
        partial: String,
    },

    /// Reading a chunk from an underlying reader failed.
    #[error("failed to read load data: {0}")]
    Io(#[from] io::Error),

    /// An earlier `feed` failed; the session only accepts `abort` now.
    #[error("load session failed earlier and must be aborted")]
    Failed,

    /// The session has already released its sink.
    #[error("load session is closed")]
    Closed,
}

impl LoadError {
    /// Returns `true` when the error came from the sink rather than the data.
    #[must_use]
    pub fn is_sink_error(&self) -> bool {
        matches!(
            self,
            Self::Begin(_) | Self::Insert { .. } | Self::Finalize(_) | Self::Discard(_)
        )
    }
}
