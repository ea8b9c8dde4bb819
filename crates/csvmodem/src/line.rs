//! Physical line reader over a [`ChunkCursor`].

use std::ops::Range;

use crate::cursor::ChunkCursor;

/// Outcome of reading one physical line.
///
/// Ranges index into the buffer passed to [`LineScanner::read_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadLine {
    /// A line ending in `\n`. A trailing `\r\n` has been rewritten to `\n`.
    Complete(Range<usize>),
    /// The input ran out before a line feed. The bytes are exactly those
    /// seen so far, with nothing appended.
    Partial(Range<usize>),
    /// No bytes were left at all.
    EndOfInput,
}

#[derive(Debug)]
pub(crate) struct LineScanner<'src> {
    cursor: ChunkCursor<'src>,
    line: u64,
}

impl<'src> LineScanner<'src> {
    /// `line` is the number of lines already consumed by earlier feeds.
    pub(crate) fn new(cursor: ChunkCursor<'src>, line: u64) -> Self {
        Self { cursor, line }
    }

    /// Number of complete lines read, counting from the start of the stream.
    pub(crate) fn line(&self) -> u64 {
        self.line
    }

    pub(crate) fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Appends the next physical line to `dst`.
    pub(crate) fn read_line(&mut self, dst: &mut Vec<u8>) -> ReadLine {
        let start = dst.len();
        if self.cursor.read_until_newline(dst) {
            self.line += 1;
            let end = dst.len();
            if end - start >= 2 && dst[end - 2] == b'\r' {
                dst.truncate(end - 2);
                dst.push(b'\n');
            }
            ReadLine::Complete(start..dst.len())
        } else if dst.len() == start {
            ReadLine::EndOfInput
        } else {
            ReadLine::Partial(start..dst.len())
        }
    }
}

/// Length of the line terminator at the end of `line` (0 or 1).
pub(crate) fn newline_len(line: &[u8]) -> usize {
    usize::from(line.last() == Some(&b'\n'))
}
