//! Load sessions: drive a record format, decode each record against the
//! target columns, and hand the rows to a sink inside one transaction.

use std::{
    io::{self, Read},
    mem,
};

use bstr::ByteSlice;
use tracing::{debug, info, trace, warn};

use crate::{
    csv::CsvRecords,
    error::{FieldCountError, FieldCountKind, LoadError},
    format::RecordFormat,
    options::{CsvOptions, TabularOptions},
    record::Record,
    sink::{Column, ColumnDecoder, Row, RowSink},
    tabular::TabularRecords,
};

/// Outcome of a committed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Number of rows handed to the sink.
    pub rows_loaded: u64,
}

/// A bulk load in progress.
///
/// The session owns the sink from [`LoadSession::begin`] until
/// [`LoadSession::finish`] or [`LoadSession::abort`]. A session dropped
/// before either discards the load and closes the sink.
///
/// ```rust
/// use csvmodem::{Column, CsvDataLoader, CsvOptions, MemorySink};
///
/// let mut sink = MemorySink::new();
/// let columns = vec![Column::text("id"), Column::text("name")];
/// let mut loader = CsvDataLoader::begin(&mut sink, columns, &CsvOptions::default()).unwrap();
/// loader.feed(b"1,ali").unwrap();
/// loader.feed(b"ce\n2,\n").unwrap();
/// assert_eq!(loader.finish().unwrap().rows_loaded, 2);
///
/// assert_eq!(
///     sink.rows(),
///     [
///         vec![Some("1".to_string()), Some("alice".to_string())],
///         vec![Some("2".to_string()), None],
///     ]
/// );
/// ```
#[derive(Debug)]
pub struct LoadSession<F, D, S>
where
    F: RecordFormat,
    D: ColumnDecoder,
    S: RowSink<Value = D::Value>,
{
    format: F,
    columns: Vec<Column<D>>,
    sink: Option<S>,
    rows_loaded: u64,
    skip_header: bool,
    end_of_data: bool,
    failed: bool,
}

/// Session for the quoted, comma separated format.
pub type CsvDataLoader<D, S> = LoadSession<CsvRecords, D, S>;

/// Session for the unquoted, delimiter separated text format.
pub type TabularDataLoader<D, S> = LoadSession<TabularRecords, D, S>;

impl<D, S> LoadSession<CsvRecords, D, S>
where
    D: ColumnDecoder,
    S: RowSink<Value = D::Value>,
{
    /// Opens the sink's transaction and starts a CSV load into `columns`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidOptions`] for invalid options or an empty
    /// column list, and [`LoadError::Begin`] if the sink cannot open its
    /// transaction (the sink is closed in that case).
    pub fn begin(sink: S, columns: Vec<Column<D>>, options: &CsvOptions) -> Result<Self, LoadError> {
        Self::open(CsvRecords::new(options)?, sink, columns, options.header)
    }
}

impl<D, S> LoadSession<TabularRecords, D, S>
where
    D: ColumnDecoder,
    S: RowSink<Value = D::Value>,
{
    /// Opens the sink's transaction and starts a text format load into
    /// `columns`.
    ///
    /// # Errors
    ///
    /// Same as for the CSV format.
    pub fn begin(
        sink: S,
        columns: Vec<Column<D>>,
        options: &TabularOptions,
    ) -> Result<Self, LoadError> {
        Self::open(TabularRecords::new(options)?, sink, columns, false)
    }
}

impl<F, D, S> LoadSession<F, D, S>
where
    F: RecordFormat,
    D: ColumnDecoder,
    S: RowSink<Value = D::Value>,
{
    /// `header` skips the first record; the text format skips its header
    /// line itself.
    fn open(format: F, mut sink: S, columns: Vec<Column<D>>, header: bool) -> Result<Self, LoadError> {
        if columns.is_empty() {
            return Err(LoadError::InvalidOptions("a load needs at least one column"));
        }
        if let Err(err) = sink.begin_transaction() {
            close_sink(&mut sink);
            return Err(LoadError::Begin(Box::new(err)));
        }
        debug!(format = F::NAME, columns = columns.len(), header, "load started");
        Ok(Self {
            format,
            columns,
            sink: Some(sink),
            rows_loaded: 0,
            skip_header: header,
            end_of_data: false,
            failed: false,
        })
    }

    /// Loads every record completed by `chunk`.
    ///
    /// Chunks may split records, fields, quotes and delimiters anywhere. The
    /// unfinished tail is kept until the next call. Once the end-of-data
    /// marker has been seen, further chunks are ignored.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed record, field count mismatch, decode
    /// failure or rejected insert. Rows inserted earlier stay staged in the
    /// sink; call [`LoadSession::abort`] to discard them. After a failure
    /// every later `feed` or `finish` returns [`LoadError::Failed`].
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), LoadError> {
        if self.sink.is_none() {
            return Err(LoadError::Closed);
        }
        if self.failed {
            return Err(LoadError::Failed);
        }
        if self.end_of_data {
            debug!(bytes = chunk.len(), "ignoring data after end-of-data marker");
            return Ok(());
        }

        let before = self.rows_loaded;
        if let Err(err) = self.load_chunk(chunk) {
            self.failed = true;
            debug!(format = F::NAME, error = %err, "load failed");
            return Err(err);
        }
        trace!(
            format = F::NAME,
            bytes = chunk.len(),
            rows = self.rows_loaded - before,
            "chunk loaded"
        );
        Ok(())
    }

    fn load_chunk(&mut self, chunk: &[u8]) -> Result<(), LoadError> {
        let Self {
            format,
            columns,
            sink,
            rows_loaded,
            skip_header,
            end_of_data,
            ..
        } = self;
        let sink = sink.as_mut().ok_or(LoadError::Closed)?;
        for record in format.feed(chunk) {
            let record = record?;
            if mem::take(skip_header) {
                continue;
            }
            if record.is_end_of_data() {
                *end_of_data = true;
                break;
            }
            let row = decode_row(columns, &record)?;
            sink.insert(row).map_err(|err| LoadError::Insert {
                row: *rows_loaded + 1,
                source: Box::new(err),
            })?;
            *rows_loaded += 1;
        }
        Ok(())
    }

    /// Commits the load and releases the sink.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::IncompleteFinalRecord`] if the input stopped in
    /// the middle of a record, [`LoadError::Failed`] if an earlier `feed`
    /// failed, and [`LoadError::Finalize`] if the sink could not commit. In
    /// each case the load is discarded and the sink closed.
    pub fn finish(mut self) -> Result<LoadSummary, LoadError> {
        let mut sink = self.sink.take().ok_or(LoadError::Closed)?;

        if self.failed {
            let err = LoadError::Failed;
            discard_and_close(&mut sink, &err);
            return Err(err);
        }
        if !self.end_of_data {
            self.format.end_input();
            if let Some(partial) = self.format.pending() {
                let err = LoadError::IncompleteFinalRecord {
                    partial: String::from_utf8_lossy(partial).into_owned(),
                };
                discard_and_close(&mut sink, &err);
                return Err(err);
            }
        }

        if let Err(source) = sink.finalize() {
            let err = LoadError::Finalize(Box::new(source));
            discard_and_close(&mut sink, &err);
            return Err(err);
        }
        close_sink(&mut sink);
        info!(format = F::NAME, rows_loaded = self.rows_loaded, "load finished");
        Ok(LoadSummary {
            rows_loaded: self.rows_loaded,
        })
    }

    /// Discards the load and releases the sink.
    ///
    /// The sink is closed even when discarding fails; a close failure is only
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Discard`] if the sink could not discard the
    /// staged rows.
    pub fn abort(mut self) -> Result<(), LoadError> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };
        debug!(format = F::NAME, rows_discarded = self.rows_loaded, "load aborted");
        let discarded = sink.discard(None);
        close_sink(&mut sink);
        discarded.map_err(|err| LoadError::Discard(Box::new(err)))
    }

    /// Rows handed to the sink so far.
    #[must_use]
    pub fn rows_loaded(&self) -> u64 {
        self.rows_loaded
    }

    /// Whether an unfinished record is waiting for more input.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.end_of_data && self.format.pending().is_some()
    }

    /// Whether the end-of-data marker has been seen.
    #[must_use]
    pub fn is_end_of_data(&self) -> bool {
        self.end_of_data
    }
}

impl<F, D, S> Drop for LoadSession<F, D, S>
where
    F: RecordFormat,
    D: ColumnDecoder,
    S: RowSink<Value = D::Value>,
{
    fn drop(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            warn!(
                format = F::NAME,
                rows_discarded = self.rows_loaded,
                "load session dropped before finish or abort"
            );
            if let Err(err) = sink.discard(None) {
                warn!(error = %err, "failed to discard load");
            }
            close_sink(&mut sink);
        }
    }
}

fn decode_row<D: ColumnDecoder>(
    columns: &[Column<D>],
    record: &Record,
) -> Result<Row<D::Value>, LoadError> {
    if record.len() != columns.len() {
        let kind = match columns.get(record.len()) {
            Some(column) => FieldCountKind::Missing {
                column: column.name.clone(),
            },
            None => FieldCountKind::Extra,
        };
        return Err(FieldCountError {
            kind,
            expected: columns.len(),
            actual: record.len(),
            line: record.line(),
        }
        .into());
    }

    columns
        .iter()
        .zip(record)
        .map(|(column, field)| {
            field
                .map(|bytes| decode_field(column, bytes, record.line()))
                .transpose()
        })
        .collect()
}

fn decode_field<D: ColumnDecoder>(
    column: &Column<D>,
    bytes: &[u8],
    line: u64,
) -> Result<D::Value, LoadError> {
    let text = bytes.to_str().map_err(|_| LoadError::InvalidUtf8 {
        column: column.name.clone(),
        line,
    })?;
    column
        .decoder
        .decode(text)
        .map_err(|source| LoadError::Decode {
            column: column.name.clone(),
            text: text.to_owned(),
            line,
            source: Box::new(source),
        })
}

fn discard_and_close<S: RowSink>(sink: &mut S, cause: &LoadError) {
    if let Err(err) = sink.discard(Some(cause)) {
        warn!(error = %err, cause = %cause, "failed to discard load");
    }
    close_sink(sink);
}

fn close_sink<S: RowSink>(sink: &mut S) {
    if let Err(err) = sink.close() {
        warn!(error = %err, "failed to close row sink");
    }
}

/// A load session of either format, driven by a transport that only moves
/// bytes.
///
/// `finish` and `abort` take a boxed receiver so sessions can be held as
/// `Box<dyn DataLoader>`.
pub trait DataLoader {
    /// See [`LoadSession::feed`].
    ///
    /// # Errors
    ///
    /// See [`LoadSession::feed`].
    fn feed(&mut self, chunk: &[u8]) -> Result<(), LoadError>;

    /// See [`LoadSession::finish`].
    ///
    /// # Errors
    ///
    /// See [`LoadSession::finish`].
    fn finish(self: Box<Self>) -> Result<LoadSummary, LoadError>;

    /// See [`LoadSession::abort`].
    ///
    /// # Errors
    ///
    /// See [`LoadSession::abort`].
    fn abort(self: Box<Self>) -> Result<(), LoadError>;

    /// Rows handed to the sink so far.
    fn rows_loaded(&self) -> u64;

    /// Whether an unfinished record is waiting for more input.
    fn has_pending(&self) -> bool;
}

impl<F, D, S> DataLoader for LoadSession<F, D, S>
where
    F: RecordFormat,
    D: ColumnDecoder,
    S: RowSink<Value = D::Value>,
{
    fn feed(&mut self, chunk: &[u8]) -> Result<(), LoadError> {
        LoadSession::feed(self, chunk)
    }

    fn finish(self: Box<Self>) -> Result<LoadSummary, LoadError> {
        LoadSession::finish(*self)
    }

    fn abort(self: Box<Self>) -> Result<(), LoadError> {
        LoadSession::abort(*self)
    }

    fn rows_loaded(&self) -> u64 {
        self.rows_loaded
    }

    fn has_pending(&self) -> bool {
        LoadSession::has_pending(self)
    }
}

/// Feeds everything `reader` yields to `loader`, `buf_size` bytes at a time.
///
/// Returns the number of bytes read. The loader is neither finished nor
/// aborted.
///
/// # Errors
///
/// Returns [`LoadError::Io`] if reading fails, or the loader's error.
pub fn feed_reader<L, R>(loader: &mut L, mut reader: R, buf_size: usize) -> Result<u64, LoadError>
where
    L: DataLoader + ?Sized,
    R: Read,
{
    let mut buf = vec![0; buf_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        loader.feed(&buf[..n])?;
        total += n as u64;
    }
}
