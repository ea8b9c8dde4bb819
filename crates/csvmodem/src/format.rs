use crate::{error::LoadError, record::Record};

/// A text format that turns a stream of chunks into records.
///
/// Implementors keep whatever bytes of an unfinished record they need between
/// calls to [`RecordFormat::feed`]; feeding a document in any number of
/// pieces must yield the same records as feeding it whole.
pub trait RecordFormat {
    /// Short format name used in log events.
    const NAME: &'static str;

    /// Iterator over the records completed by one chunk.
    type Records<'a>: Iterator<Item = Result<Record, LoadError>>
    where
        Self: 'a;

    /// Scans `chunk`, continuing any record left open by earlier chunks.
    fn feed<'a>(&'a mut self, chunk: &'a [u8]) -> Self::Records<'a>;

    /// Bytes of an unfinished record, if any.
    fn pending(&self) -> Option<&[u8]>;

    /// Marks the end of the stream. Anything a decoder still holds becomes
    /// part of [`RecordFormat::pending`].
    fn end_input(&mut self) {}
}
