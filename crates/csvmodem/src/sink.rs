//! The two seams a load session drives: per-column text decoders and the row
//! sink that owns the insertion transaction.

use std::{convert::Infallible, error::Error};

use thiserror::Error;

use crate::error::LoadError;

/// One decoded row: a value per target column, `None` for NULL.
pub type Row<V> = Vec<Option<V>>;

/// Converts the text of a non-NULL field into a typed value.
pub trait ColumnDecoder {
    /// The decoded value.
    type Value;
    /// Why a text could not be decoded.
    type Error: Error + Send + Sync + 'static;

    /// Decodes one field.
    ///
    /// # Errors
    ///
    /// Returns the decoder's error if `text` is not a valid value.
    fn decode(&self, text: &str) -> Result<Self::Value, Self::Error>;
}

/// Decoder that keeps field text as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextDecoder;

impl ColumnDecoder for TextDecoder {
    type Value = String;
    type Error = Infallible;

    fn decode(&self, text: &str) -> Result<String, Infallible> {
        Ok(text.to_owned())
    }
}

/// A target column: its name, used in error messages, and its decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column<D> {
    /// Column name.
    pub name: String,
    /// Decoder for the column's type.
    pub decoder: D,
}

impl<D> Column<D> {
    /// Creates a column.
    pub fn new(name: impl Into<String>, decoder: D) -> Self {
        Self {
            name: name.into(),
            decoder,
        }
    }
}

impl Column<TextDecoder> {
    /// Creates a column whose values are kept as text.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, TextDecoder)
    }
}

/// Destination of decoded rows.
///
/// A session calls [`RowSink::begin_transaction`] once, then
/// [`RowSink::insert`] per row, then exactly one of [`RowSink::finalize`] or
/// [`RowSink::discard`], and finally [`RowSink::close`]. Rows must not become
/// visible to readers before `finalize` succeeds.
pub trait RowSink {
    /// Value type of the decoded columns.
    type Value;
    /// Sink specific failure.
    type Error: Error + Send + Sync + 'static;

    /// Opens the insertion transaction.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the transaction cannot be opened.
    fn begin_transaction(&mut self) -> Result<(), Self::Error>;

    /// Stages one row.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the row is rejected.
    fn insert(&mut self, row: Row<Self::Value>) -> Result<(), Self::Error>;

    /// Throws away everything staged since the transaction began. `cause` is
    /// the error that ended the load, if any.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the staged rows cannot be discarded.
    fn discard(&mut self, cause: Option<&LoadError>) -> Result<(), Self::Error>;

    /// Commits the staged rows.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the commit fails.
    fn finalize(&mut self) -> Result<(), Self::Error>;

    /// Releases the sink's resources.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if releasing fails. Sessions log it and move
    /// on.
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    type Value = S::Value;
    type Error = S::Error;

    fn begin_transaction(&mut self) -> Result<(), Self::Error> {
        (**self).begin_transaction()
    }

    fn insert(&mut self, row: Row<Self::Value>) -> Result<(), Self::Error> {
        (**self).insert(row)
    }

    fn discard(&mut self, cause: Option<&LoadError>) -> Result<(), Self::Error> {
        (**self).discard(cause)
    }

    fn finalize(&mut self) -> Result<(), Self::Error> {
        (**self).finalize()
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        (**self).close()
    }
}

/// Misuse of a [`MemorySink`] transaction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySinkError {
    /// A row or commit arrived with no open transaction.
    #[error("no open transaction")]
    NotOpen,
    /// A transaction was already open.
    #[error("a transaction is already open")]
    AlreadyOpen,
}

/// A sink that keeps rows in memory.
///
/// Inserted rows are staged and move to [`MemorySink::rows`] only when the
/// transaction is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySink<V> {
    staged: Vec<Row<V>>,
    committed: Vec<Row<V>>,
    open: bool,
    closed: bool,
    discard_cause: Option<String>,
}

impl<V> Default for MemorySink<V> {
    fn default() -> Self {
        Self {
            staged: Vec::new(),
            committed: Vec::new(),
            open: false,
            closed: false,
            discard_cause: None,
        }
    }
}

impl<V> MemorySink<V> {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed rows.
    #[must_use]
    pub fn rows(&self) -> &[Row<V>] {
        &self.committed
    }

    /// Rows inserted since the transaction began and not yet committed.
    #[must_use]
    pub fn staged(&self) -> &[Row<V>] {
        &self.staged
    }

    /// Whether [`RowSink::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Message of the error passed to the last [`RowSink::discard`].
    #[must_use]
    pub fn discard_cause(&self) -> Option<&str> {
        self.discard_cause.as_deref()
    }

    /// Takes the committed rows out of the sink.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row<V>> {
        self.committed
    }
}

impl<V> RowSink for MemorySink<V> {
    type Value = V;
    type Error = MemorySinkError;

    fn begin_transaction(&mut self) -> Result<(), MemorySinkError> {
        if self.open {
            return Err(MemorySinkError::AlreadyOpen);
        }
        self.open = true;
        self.closed = false;
        Ok(())
    }

    fn insert(&mut self, row: Row<V>) -> Result<(), MemorySinkError> {
        if !self.open {
            return Err(MemorySinkError::NotOpen);
        }
        self.staged.push(row);
        Ok(())
    }

    fn discard(&mut self, cause: Option<&LoadError>) -> Result<(), MemorySinkError> {
        self.staged.clear();
        self.open = false;
        self.discard_cause = cause.map(ToString::to_string);
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), MemorySinkError> {
        if !self.open {
            return Err(MemorySinkError::NotOpen);
        }
        self.committed.append(&mut self.staged);
        self.open = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), MemorySinkError> {
        if self.open {
            self.staged.clear();
            self.open = false;
        }
        self.closed = true;
        Ok(())
    }
}
