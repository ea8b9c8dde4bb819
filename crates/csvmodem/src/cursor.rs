//! Cursor over the carried prefix of an unfinished record followed by a new
//! chunk.
//!
//! The prefix is owned by the cursor for the duration of one feed; the chunk
//! is borrowed (or owned, when it had to be transcoded). Readers copy out only
//! the bytes they consume, so a chunk that ends in the middle of a record is
//! never duplicated beyond that record's tail.

use std::borrow::Cow;

use bstr::ByteSlice;

#[derive(Debug)]
pub(crate) struct ChunkCursor<'src> {
    prefix: Vec<u8>,
    prefix_pos: usize,
    chunk: Cow<'src, [u8]>,
    chunk_pos: usize,
}

impl<'src> ChunkCursor<'src> {
    pub(crate) fn new(prefix: Vec<u8>, chunk: Cow<'src, [u8]>) -> Self {
        Self {
            prefix,
            prefix_pos: 0,
            chunk,
            chunk_pos: 0,
        }
    }

    /// Appends bytes up to and including the next `\n` to `dst`.
    ///
    /// Returns `true` if a line feed was found. Otherwise everything left in
    /// the cursor has been appended and the cursor is exhausted.
    pub(crate) fn read_until_newline(&mut self, dst: &mut Vec<u8>) -> bool {
        if self.prefix_pos < self.prefix.len() {
            let rest = &self.prefix[self.prefix_pos..];
            if let Some(i) = rest.find_byte(b'\n') {
                dst.extend_from_slice(&rest[..=i]);
                self.prefix_pos += i + 1;
                return true;
            }
            dst.extend_from_slice(rest);
            self.prefix_pos = self.prefix.len();
        }

        let rest = &self.chunk[self.chunk_pos..];
        if let Some(i) = rest.find_byte(b'\n') {
            dst.extend_from_slice(&rest[..=i]);
            self.chunk_pos += i + 1;
            return true;
        }
        dst.extend_from_slice(rest);
        self.chunk_pos = self.chunk.len();
        false
    }

    /// Number of bytes not yet handed out.
    pub(crate) fn remaining(&self) -> usize {
        (self.prefix.len() - self.prefix_pos) + (self.chunk.len() - self.chunk_pos)
    }
}
