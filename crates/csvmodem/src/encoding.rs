//! Byte-order-mark detection at the start of a CSV stream.
//!
//! A UTF-8 BOM is stripped. A UTF-16LE or UTF-16BE BOM is stripped and the
//! rest of the stream is transcoded to UTF-8 with a streaming decoder, so a
//! code unit split across two chunks still decodes correctly. Without a BOM
//! the bytes pass through untouched.

use std::{borrow::Cow, fmt, mem};

use encoding_rs::{Decoder, Encoding, UTF_8};

const BOMS: [&[u8]; 3] = [b"\xEF\xBB\xBF", b"\xFF\xFE", b"\xFE\xFF"];

pub(crate) enum StreamEncoding {
    /// Not enough bytes seen yet to rule a BOM in or out.
    Sniffing(Vec<u8>),
    Passthrough,
    Transcoding(Decoder),
}

impl fmt::Debug for StreamEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sniffing(held) => f.debug_tuple("Sniffing").field(held).finish(),
            Self::Passthrough => f.write_str("Passthrough"),
            Self::Transcoding(decoder) => f
                .debug_tuple("Transcoding")
                .field(&decoder.encoding().name())
                .finish(),
        }
    }
}

impl Default for StreamEncoding {
    fn default() -> Self {
        Self::Sniffing(Vec::new())
    }
}

impl StreamEncoding {
    /// Converts one chunk to the byte stream the scanner reads.
    pub(crate) fn decode<'a>(&mut self, chunk: &'a [u8]) -> Cow<'a, [u8]> {
        let held = match self {
            Self::Passthrough => return Cow::Borrowed(chunk),
            Self::Transcoding(decoder) => return Cow::Owned(transcode(decoder, chunk)),
            Self::Sniffing(held) => mem::take(held),
        };

        let candidate = if held.is_empty() {
            Cow::Borrowed(chunk)
        } else {
            let mut joined = held;
            joined.extend_from_slice(chunk);
            Cow::Owned(joined)
        };

        match Encoding::for_bom(&candidate) {
            Some((encoding, bom_len)) if encoding == UTF_8 => {
                *self = Self::Passthrough;
                skip_prefix(candidate, bom_len)
            }
            Some((encoding, bom_len)) => {
                let mut decoder = encoding.new_decoder_without_bom_handling();
                let decoded = transcode(&mut decoder, &candidate[bom_len..]);
                *self = Self::Transcoding(decoder);
                Cow::Owned(decoded)
            }
            None if is_bom_prefix(&candidate) => {
                *self = Self::Sniffing(candidate.into_owned());
                Cow::Borrowed(&[])
            }
            None => {
                *self = Self::Passthrough;
                candidate
            }
        }
    }

    /// Ends the stream and returns what the decoder still held, as UTF-8.
    ///
    /// A dangling byte or unpaired surrogate comes out as U+FFFD.
    pub(crate) fn flush(&mut self) -> Vec<u8> {
        let Self::Transcoding(decoder) = self else {
            return Vec::new();
        };
        let capacity = decoder.max_utf8_buffer_length(0).unwrap_or(0).max(8);
        let mut out = String::with_capacity(capacity);
        let (_, _, _) = decoder.decode_to_string(&[], &mut out, true);
        *self = Self::Passthrough;
        out.into_bytes()
    }

    /// Bytes held back while sniffing.
    pub(crate) fn held(&self) -> &[u8] {
        match self {
            Self::Sniffing(held) => held,
            Self::Passthrough | Self::Transcoding(_) => &[],
        }
    }
}

fn is_bom_prefix(bytes: &[u8]) -> bool {
    BOMS.iter()
        .any(|bom| bytes.len() < bom.len() && bom.starts_with(bytes))
}

fn skip_prefix(bytes: Cow<'_, [u8]>, len: usize) -> Cow<'_, [u8]> {
    match bytes {
        Cow::Borrowed(b) => Cow::Borrowed(&b[len..]),
        Cow::Owned(mut b) => {
            b.drain(..len);
            Cow::Owned(b)
        }
    }
}

fn transcode(decoder: &mut Decoder, src: &[u8]) -> Vec<u8> {
    let capacity = decoder
        .max_utf8_buffer_length(src.len())
        .unwrap_or(src.len().saturating_mul(3).saturating_add(4));
    let mut out = String::with_capacity(capacity);
    let (_, _, _) = decoder.decode_to_string(src, &mut out, false);
    out.into_bytes()
}
