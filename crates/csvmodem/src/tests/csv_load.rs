use std::io::Cursor;

use rstest::rstest;

use super::support::{Failures, RecordingSink, SqlType, SqlValue, columns, int, text};
use crate::{
    Column, CsvDataLoader, CsvOptions, DataLoader, FieldCountError, FieldCountKind, LoadError,
    MemorySink, QuoteError, chunk_utils::produce_chunks, feed_reader,
};

fn int_text_text() -> Vec<Column<SqlType>> {
    columns(&[
        ("id", SqlType::Int64),
        ("color", SqlType::VarChar),
        ("name", SqlType::VarChar),
    ])
}

fn load(
    options: &CsvOptions,
    schema: Vec<Column<SqlType>>,
    chunks: &[&[u8]],
) -> Result<(u64, RecordingSink), LoadError> {
    let mut sink = RecordingSink::default();
    let mut loader = CsvDataLoader::begin(&mut sink, schema, options)?;
    for chunk in chunks {
        loader.feed(chunk)?;
    }
    let summary = loader.finish()?;
    Ok((summary.rows_loaded, sink))
}

#[test]
fn loads_basic_rows() {
    let (rows, sink) = load(
        &CsvOptions::default(),
        int_text_text(),
        &[b"1,foo,bar\n2,  ,bash\n"],
    )
    .unwrap();
    assert_eq!(rows, 2);
    assert_eq!(
        sink.committed,
        [
            vec![int(1), text("foo"), text("bar")],
            vec![int(2), text("  "), text("bash")],
        ]
    );
    assert_eq!(
        sink.calls,
        ["begin", "insert", "insert", "finalize", "close"]
    );
}

#[test]
fn record_split_across_chunks() {
    let schema = columns(&[
        ("a", SqlType::Int64),
        ("b", SqlType::Int64),
        ("c", SqlType::VarChar),
    ]);
    let (rows, sink) = load(
        &CsvOptions::default(),
        schema,
        &[b"1,100,ba", b"r\n2,200,bash\n"],
    )
    .unwrap();
    assert_eq!(rows, 2);
    assert_eq!(
        sink.committed,
        [
            vec![int(1), int(100), text("bar")],
            vec![int(2), int(200), text("bash")],
        ]
    );
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(5)]
#[case(64)]
fn header_is_skipped_once(#[case] parts: usize) {
    let input = b"id,color,name\n1,red,\"a\nb\"\n2,blue,c\n";
    let options = CsvOptions {
        header: true,
        ..CsvOptions::default()
    };
    let (rows, sink) = load(&options, int_text_text(), &produce_chunks(input, parts)).unwrap();
    assert_eq!(rows, 2);
    assert_eq!(sink.committed[0], [int(1), text("red"), text("a\nb")]);
}

#[test]
fn pipe_delimiter() {
    let options = CsvOptions {
        delimiter: "|".into(),
        header: false,
    };
    let (_, sink) = load(&options, int_text_text(), &[b"1|a,b|\"x|y\"\n"]).unwrap();
    assert_eq!(sink.committed, [vec![int(1), text("a,b"), text("x|y")]]);
}

#[test]
fn quoted_newlines_across_chunks() {
    let (rows, sink) = load(
        &CsvOptions::default(),
        int_text_text(),
        &[b"1,\"baz\n", b"bar\n", b"bash\",\"", b"\"\"\"\n"],
    )
    .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(
        sink.committed,
        [vec![int(1), text("baz\nbar\nbash"), text("\"")]]
    );
}

#[test]
fn extra_columns_fail() {
    let err = load(
        &CsvOptions::default(),
        int_text_text(),
        &[b"1,foo,bar,baz,bash\n"],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        LoadError::FieldCount(FieldCountError {
            kind: FieldCountKind::Extra,
            expected: 3,
            actual: 5,
            line: 1,
        })
    ));
    assert_eq!(
        err.to_string(),
        "extra data after last expected column (expected 3 fields, found 5) on line 1"
    );
}

#[test]
fn missing_columns_name_the_first_absent_column() {
    let err = load(
        &CsvOptions::default(),
        int_text_text(),
        &[b"1,red,x\n2,blue\n"],
    )
    .unwrap_err();
    let LoadError::FieldCount(FieldCountError { kind, line, .. }) = err else {
        panic!("expected a field count error");
    };
    assert_eq!(
        kind,
        FieldCountKind::Missing {
            column: "name".into()
        }
    );
    assert_eq!(line, 2);
}

#[test]
fn incomplete_final_record_fails_finish_and_discards() {
    let mut sink = RecordingSink::default();
    let mut loader =
        CsvDataLoader::begin(&mut sink, int_text_text(), &CsvOptions::default()).unwrap();
    loader.feed(b"1,red,a\n2,blue,\"unterminated\n").unwrap();
    assert!(loader.has_pending());
    let err = loader.finish().unwrap_err();
    assert!(
        matches!(&err, LoadError::IncompleteFinalRecord { partial } if partial == "2,blue,\"unterminated\n")
    );
    assert!(sink.committed.is_empty());
    assert_eq!(sink.calls[sink.calls.len() - 2..], ["discard", "close"]);
    assert!(
        sink.discard_cause
            .as_deref()
            .is_some_and(|c| c.starts_with("incomplete record"))
    );
}

#[test]
fn missing_trailing_line_feed_is_incomplete() {
    let err = load(&CsvOptions::default(), int_text_text(), &[b"1,red,a"]).unwrap_err();
    assert!(matches!(err, LoadError::IncompleteFinalRecord { .. }));
}

#[rstest]
#[case::no_feeds(&[])]
#[case::one_feed(&[b"1,red,a\n".as_slice()])]
#[case::many_feeds(&[b"1,red,a\n".as_slice(), b"2,blue", b",b\n3,green,c\n"])]
fn abort_never_commits(#[case] chunks: &[&[u8]]) {
    let mut sink = RecordingSink::default();
    let mut loader =
        CsvDataLoader::begin(&mut sink, int_text_text(), &CsvOptions::default()).unwrap();
    for chunk in chunks {
        loader.feed(chunk).unwrap();
    }
    loader.abort().unwrap();
    assert!(sink.committed.is_empty());
    assert!(sink.staged.is_empty());
    assert_eq!(sink.count("finalize"), 0);
    assert_eq!(sink.calls[sink.calls.len() - 2..], ["discard", "close"]);
}

#[test]
fn decode_error_names_column_and_text() {
    let mut sink = RecordingSink::default();
    let mut loader =
        CsvDataLoader::begin(&mut sink, int_text_text(), &CsvOptions::default()).unwrap();
    let err = loader.feed(b"1,red,a\nx1,blue,b\n3,green,c\n").unwrap_err();
    assert!(matches!(
        &err,
        LoadError::Decode { column, text, line: 2, .. } if column == "id" && text == "x1"
    ));
    assert_eq!(loader.rows_loaded(), 1);
    loader.abort().unwrap();
    assert!(sink.committed.is_empty());
    assert_eq!(sink.count("insert"), 1);
}

#[test]
fn quote_error_propagates() {
    let err = load(
        &CsvOptions::default(),
        int_text_text(),
        &[b"1,\"re\"d,a\n"],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        LoadError::Quote(QuoteError {
            start_line: 1,
            line: 1,
            column: 7
        })
    ));
}

#[test]
fn invalid_utf8_is_rejected() {
    let err = load(&CsvOptions::default(), int_text_text(), &[b"1,\xFF,a\n"]).unwrap_err();
    assert!(matches!(
        &err,
        LoadError::InvalidUtf8 { column, line: 1 } if column == "color"
    ));
}

#[test]
fn empty_quoted_is_empty_string_and_empty_unquoted_is_null() {
    let (_, sink) = load(&CsvOptions::default(), int_text_text(), &[b"1,\"\",\n,,\"\"\n"]).unwrap();
    assert_eq!(
        sink.committed,
        [
            vec![int(1), text(""), None],
            vec![None, None, text("")],
        ]
    );
}

#[test]
fn end_of_data_marker_ends_the_load() {
    let mut sink = RecordingSink::default();
    let mut loader =
        CsvDataLoader::begin(&mut sink, int_text_text(), &CsvOptions::default()).unwrap();
    loader.feed(b"1,red,a\n\\.\ngarbage,\"\n").unwrap();
    assert!(loader.is_end_of_data());
    loader.feed(b"more garbage").unwrap();
    assert!(!loader.has_pending());
    assert_eq!(loader.finish().unwrap().rows_loaded, 1);
    assert_eq!(sink.committed, [vec![int(1), text("red"), text("a")]]);
}

#[test]
fn marker_split_across_chunks() {
    let (rows, _) = load(
        &CsvOptions::default(),
        int_text_text(),
        &[b"1,red,a\n\\", b".", b"\nignored\n"],
    )
    .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn utf8_bom_and_crlf() {
    let (_, sink) = load(
        &CsvOptions::default(),
        int_text_text(),
        &[b"\xEF\xBB", b"\xBF1,red,a\r", b"\n2,blue,b\r\n"],
    )
    .unwrap();
    assert_eq!(
        sink.committed,
        [
            vec![int(1), text("red"), text("a")],
            vec![int(2), text("blue"), text("b")],
        ]
    );
}

#[test]
fn utf16_stream_is_transcoded() {
    let mut bytes = b"\xFF\xFE".to_vec();
    for unit in "1,gr\u{fc}n,\u{1F600}\n".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let (_, sink) = load(
        &CsvOptions::default(),
        int_text_text(),
        &produce_chunks(&bytes, bytes.len()),
    )
    .unwrap();
    assert_eq!(
        sink.committed,
        [vec![int(1), text("gr\u{fc}n"), text("\u{1F600}")]]
    );
}

#[test]
fn lone_bom_prefix_is_pending() {
    let err = load(&CsvOptions::default(), int_text_text(), &[b"\xEF\xBB"]).unwrap_err();
    assert!(matches!(err, LoadError::IncompleteFinalRecord { .. }));
}

#[test]
fn insert_failure_reports_row() {
    let mut sink = RecordingSink::failing(Failures {
        insert: Some(2),
        ..Failures::default()
    });
    let mut loader =
        CsvDataLoader::begin(&mut sink, int_text_text(), &CsvOptions::default()).unwrap();
    let err = loader.feed(b"1,a,b\n2,c,d\n").unwrap_err();
    assert!(matches!(err, LoadError::Insert { row: 2, .. }));
    assert!(err.is_sink_error());
    assert_eq!(loader.rows_loaded(), 1);
    loader.abort().unwrap();
}

#[test]
fn finalize_failure_discards_instead() {
    let mut sink = RecordingSink::failing(Failures {
        finalize: true,
        ..Failures::default()
    });
    let err = {
        let mut loader =
            CsvDataLoader::begin(&mut sink, int_text_text(), &CsvOptions::default()).unwrap();
        loader.feed(b"1,a,b\n").unwrap();
        loader.finish().unwrap_err()
    };
    assert!(matches!(err, LoadError::Finalize(_)));
    assert_eq!(
        sink.calls,
        ["begin", "insert", "finalize", "discard", "close"]
    );
    assert!(sink.committed.is_empty());
}

#[test]
fn begin_failure_closes_sink() {
    let mut sink = RecordingSink::failing(Failures {
        begin: true,
        ..Failures::default()
    });
    let err = CsvDataLoader::begin(&mut sink, int_text_text(), &CsvOptions::default())
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, LoadError::Begin(_)));
    assert_eq!(sink.calls, ["begin", "close"]);
}

#[test]
fn abort_closes_even_when_discard_fails() {
    let mut sink = RecordingSink::failing(Failures {
        discard: true,
        close: true,
        ..Failures::default()
    });
    let loader =
        CsvDataLoader::begin(&mut sink, int_text_text(), &CsvOptions::default()).unwrap();
    let err = loader.abort().unwrap_err();
    assert!(matches!(err, LoadError::Discard(_)));
    assert_eq!(sink.calls, ["begin", "discard", "close"]);
}

#[test]
fn dropped_session_discards_and_closes() {
    let mut sink = RecordingSink::default();
    {
        let mut loader =
            CsvDataLoader::begin(&mut sink, int_text_text(), &CsvOptions::default()).unwrap();
        loader.feed(b"1,a,b\n").unwrap();
    }
    assert_eq!(sink.calls, ["begin", "insert", "discard", "close"]);
    assert!(sink.committed.is_empty());
}

#[test]
fn invalid_options_are_rejected_before_begin() {
    let mut sink = RecordingSink::default();
    let options = CsvOptions {
        delimiter: String::new(),
        header: false,
    };
    let err = CsvDataLoader::begin(&mut sink, int_text_text(), &options)
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, LoadError::InvalidOptions(_)));
    assert!(sink.calls.is_empty());
}

#[test]
fn reader_is_fed_in_fixed_chunks() {
    let mut sink = MemorySink::new();
    let mut loader = CsvDataLoader::begin(
        &mut sink,
        vec![Column::text("a"), Column::text("b")],
        &CsvOptions::default(),
    )
    .unwrap();
    let input = "x,\"y\nz\"\n1,2\n";
    let read = feed_reader(&mut loader, Cursor::new(input), 3).unwrap();
    assert_eq!(read, input.len() as u64);
    assert_eq!(loader.finish().unwrap().rows_loaded, 2);
    assert_eq!(sink.rows()[0][1].as_deref(), Some("y\nz"));
}

#[test]
fn boxed_loader_drives_the_session() {
    let mut sink = MemorySink::<String>::new();
    let mut loader: Box<dyn DataLoader + '_> = Box::new(
        CsvDataLoader::begin(&mut sink, vec![Column::text("a")], &CsvOptions::default())
            .unwrap(),
    );
    loader.feed(b"a\nb").unwrap();
    assert!(loader.has_pending());
    loader.feed(b"\n").unwrap();
    assert_eq!(loader.rows_loaded(), 2);
    assert_eq!(loader.finish().unwrap().rows_loaded, 2);
    assert_eq!(sink.rows().len(), 2);
}

#[test]
fn value_types_flow_through() {
    let (_, sink) = load(&CsvOptions::default(), int_text_text(), &[b"-7,x,y\n"]).unwrap();
    assert_eq!(sink.committed[0][0], Some(SqlValue::Int(-7)));
}

#[test]
fn failed_feed_poisons_the_session() {
    let mut sink = RecordingSink::default();
    let err = {
        let mut loader =
            CsvDataLoader::begin(&mut sink, int_text_text(), &CsvOptions::default()).unwrap();
        let err = loader.feed(b"1,a,b\n2\n3,x").unwrap_err();
        assert!(matches!(err, LoadError::FieldCount(_)));
        assert!(matches!(loader.feed(b",y\n"), Err(LoadError::Failed)));
        loader.finish().unwrap_err()
    };
    assert!(matches!(err, LoadError::Failed));
    assert_eq!(sink.calls, ["begin", "insert", "discard", "close"]);
    assert!(sink.committed.is_empty());
}

#[test]
fn dangling_utf16_byte_fails_finish() {
    let mut input = b"\xFF\xFE".to_vec();
    for unit in "1,a,b\n".encode_utf16() {
        input.extend_from_slice(&unit.to_le_bytes());
    }
    input.push(b'2');
    let err = load(&CsvOptions::default(), int_text_text(), &[input.as_slice()]).unwrap_err();
    assert!(matches!(
        &err,
        LoadError::IncompleteFinalRecord { partial } if partial == "\u{FFFD}"
    ));
}
