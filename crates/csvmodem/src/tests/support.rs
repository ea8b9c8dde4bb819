use std::num::ParseIntError;

use thiserror::Error;

use crate::{Column, ColumnDecoder, LoadError, Row, RowSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Int64,
    VarChar,
}

impl ColumnDecoder for SqlType {
    type Value = SqlValue;
    type Error = ParseIntError;

    fn decode(&self, text: &str) -> Result<SqlValue, ParseIntError> {
        match self {
            Self::Int64 => text.parse().map(SqlValue::Int),
            Self::VarChar => Ok(SqlValue::Text(text.to_owned())),
        }
    }
}

pub fn columns(defs: &[(&str, SqlType)]) -> Vec<Column<SqlType>> {
    defs.iter()
        .map(|&(name, ty)| Column::new(name, ty))
        .collect()
}

pub fn int(v: i64) -> Option<SqlValue> {
    Some(SqlValue::Int(v))
}

pub fn text(v: &str) -> Option<SqlValue> {
    Some(SqlValue::Text(v.to_owned()))
}

#[derive(Error, Debug)]
#[error("sink failure: {0}")]
pub struct SinkError(pub &'static str);

/// Which sink operation should fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct Failures {
    pub begin: bool,
    /// Fail the n-th insert (1-based).
    pub insert: Option<usize>,
    pub finalize: bool,
    pub discard: bool,
    pub close: bool,
}

/// Sink that records every call and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<&'static str>,
    pub staged: Vec<Row<SqlValue>>,
    pub committed: Vec<Row<SqlValue>>,
    pub discard_cause: Option<String>,
    pub failures: Failures,
}

impl RecordingSink {
    pub fn failing(failures: Failures) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl RowSink for RecordingSink {
    type Value = SqlValue;
    type Error = SinkError;

    fn begin_transaction(&mut self) -> Result<(), SinkError> {
        self.calls.push("begin");
        if self.failures.begin {
            return Err(SinkError("begin"));
        }
        Ok(())
    }

    fn insert(&mut self, row: Row<SqlValue>) -> Result<(), SinkError> {
        self.calls.push("insert");
        if self.failures.insert == Some(self.count("insert")) {
            return Err(SinkError("insert"));
        }
        self.staged.push(row);
        Ok(())
    }

    fn discard(&mut self, cause: Option<&LoadError>) -> Result<(), SinkError> {
        self.calls.push("discard");
        self.discard_cause = cause.map(ToString::to_string);
        self.staged.clear();
        if self.failures.discard {
            return Err(SinkError("discard"));
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        self.calls.push("finalize");
        if self.failures.finalize {
            return Err(SinkError("finalize"));
        }
        self.committed.append(&mut self.staged);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.calls.push("close");
        if self.failures.close {
            return Err(SinkError("close"));
        }
        Ok(())
    }
}
