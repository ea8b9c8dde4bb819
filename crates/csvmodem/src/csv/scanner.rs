//! Field scanner: assembles one logical record from one or more physical
//! lines.
//!
//! Every physical line read for the record is appended to `raw`, so when the
//! input runs out mid-record `raw` is exactly the tail that must be replayed
//! in front of the next chunk. Field values are unescaped into the record's
//! shared buffer as they are scanned.
//!
//! Unquoted fields end at the delimiter (matched as a whole byte sequence) or
//! at the line terminator; an empty unquoted field is NULL. A quoted field
//! ends at `"` followed by the delimiter or the line terminator, `""` stands
//! for one literal quote, and a line terminator inside the quotes belongs to
//! the value. Any other byte after a closing quote is a [`QuoteError`].

use bstr::ByteSlice;

use crate::{
    error::QuoteError,
    line::{LineScanner, ReadLine, newline_len},
    record::Record,
};

const QUOTE: u8 = b'"';
const END_OF_DATA: &[u8] = b"\\.\n";

/// Result of scanning for one record.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ScanStep {
    Record(Record),
    /// The input ran out inside a record; carries every raw byte of it.
    Partial(Vec<u8>),
    /// The input ran out between records.
    Exhausted,
}

enum FieldEnd {
    /// Another field follows on the same line.
    Delimiter,
    /// The record is complete.
    EndOfRecord,
    /// The input ran out inside a quoted field.
    NeedMoreInput,
}

struct RecordState {
    raw: Vec<u8>,
    /// Scan position in `raw`.
    pos: usize,
    /// Start of the physical line currently being scanned.
    line_start: usize,
    start_line: u64,
    record: Record,
}

pub(crate) fn scan_record(
    lines: &mut LineScanner<'_>,
    delimiter: &[u8],
) -> Result<ScanStep, QuoteError> {
    let mut raw = Vec::new();
    loop {
        match lines.read_line(&mut raw) {
            ReadLine::EndOfInput => return Ok(ScanStep::Exhausted),
            ReadLine::Partial(_) => return Ok(ScanStep::Partial(raw)),
            ReadLine::Complete(range) if range.len() == 1 => raw.clear(),
            ReadLine::Complete(_) => break,
        }
    }

    let mut state = RecordState {
        raw,
        pos: 0,
        line_start: 0,
        start_line: lines.line(),
        record: Record::default(),
    };

    loop {
        let end = if state.raw.get(state.pos) == Some(&QUOTE) {
            parse_quoted_field(&mut state, lines, delimiter)?
        } else {
            parse_field(&mut state, delimiter)
        };
        match end {
            FieldEnd::Delimiter => {}
            FieldEnd::EndOfRecord => break,
            FieldEnd::NeedMoreInput => return Ok(ScanStep::Partial(state.raw)),
        }
    }

    let RecordState {
        raw,
        start_line,
        mut record,
        ..
    } = state;
    record.set_line(start_line);
    if raw == END_OF_DATA {
        record.mark_end_of_data();
    }
    Ok(ScanStep::Record(record))
}

fn parse_field(state: &mut RecordState, delimiter: &[u8]) -> FieldEnd {
    let line = &state.raw[state.pos..];
    if let Some(i) = line.find(delimiter) {
        state.record.extend_value(&line[..i]);
        state.record.end_field(i == 0);
        state.pos += i + delimiter.len();
        return FieldEnd::Delimiter;
    }

    let field = &line[..line.len() - newline_len(line)];
    state.record.extend_value(field);
    state.record.end_field(field.is_empty());
    state.pos = state.raw.len();
    FieldEnd::EndOfRecord
}

fn parse_quoted_field(
    state: &mut RecordState,
    lines: &mut LineScanner<'_>,
    delimiter: &[u8],
) -> Result<FieldEnd, QuoteError> {
    state.pos += 1;
    loop {
        let line = &state.raw[state.pos..];
        if let Some(i) = line.find_byte(QUOTE) {
            state.record.extend_value(&line[..i]);
            let after = &line[i + 1..];

            if after.starts_with(delimiter) {
                state.record.end_field(false);
                state.pos += i + 1 + delimiter.len();
                return Ok(FieldEnd::Delimiter);
            }
            if after.first() == Some(&QUOTE) {
                state.record.push_value_byte(QUOTE);
                state.pos += i + 2;
                continue;
            }
            if after.len() == newline_len(after) {
                state.record.end_field(false);
                state.pos = state.raw.len();
                return Ok(FieldEnd::EndOfRecord);
            }

            let offending = state.pos + i + 1;
            return Err(QuoteError {
                start_line: state.start_line,
                line: lines.line(),
                column: state.raw[state.line_start..offending].chars().count() + 1,
            });
        }

        if line.is_empty() {
            return Ok(FieldEnd::NeedMoreInput);
        }

        // The quote is still open at the end of this line: keep the line
        // break in the value and continue on the next physical line.
        state.record.extend_value(line);
        state.pos = state.raw.len();
        match lines.read_line(&mut state.raw) {
            ReadLine::Complete(range) => state.line_start = range.start,
            ReadLine::Partial(_) | ReadLine::EndOfInput => return Ok(FieldEnd::NeedMoreInput),
        }
    }
}
