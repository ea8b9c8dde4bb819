#![no_main]
use std::cell::RefCell;

use csvmodem::{
    Column, CsvDataLoader, CsvOptions, DataLoader, LoadError, MemorySink, Row, TabularDataLoader,
    TabularOptions, chunk_utils::split_by_sizes,
};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

const HEADER: usize = 5; // 1 flag + 4-byte seed

const DELIMITERS: [&str; 4] = [",", "|", "::", "\t"];

thread_local! {
    static RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_os_rng());
}

/// Byte sequences that exercise quoting, escapes, delimiters, line endings,
/// markers and multi-byte characters.
static FIELD_BYTES: &[&[u8]] = &[
    b"a",
    b"42",
    b" ",
    b"\"",
    b"\"\"",
    b",",
    b"|",
    b":",
    b"\t",
    b"\n",
    b"\r\n",
    b"\\",
    b"\\N",
    b"\\.",
    "\u{e9}".as_bytes(),
    "\u{1F600}".as_bytes(),
    b"\xEF\xBB\xBF",
    b"\xFF",
];

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if max_size < HEADER {
        return fuzzer_mutate(data, size, max_size);
    }
    if size < HEADER || seed.is_multiple_of(10) {
        data[0] = with_rng(|rng| rng.next_u32() as u8 & 0x3F);
        data[1..5].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

        let delimiter = DELIMITERS[usize::from(data[0] & 3)].as_bytes();
        let mut prefix = HEADER;
        let records = with_rng(|rng| rng.random_range(1..=8));
        for _ in 0..records {
            let written = append_record(&mut data[prefix..], delimiter);
            if written == 0 {
                break;
            }
            prefix += written;
        }
        prefix
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

/// Append one record of 1-4 fields, each quoted or not, to `buf`. Returns
/// the number of bytes written, or 0 if the record does not fit.
fn append_record(buf: &mut [u8], delimiter: &[u8]) -> usize {
    let record = with_rng(|rng| {
        let mut record = Vec::new();
        let fields = rng.random_range(1..=4);
        for i in 0..fields {
            if i > 0 {
                record.extend_from_slice(delimiter);
            }
            let quoted = rng.random_bool(0.5);
            if quoted {
                record.push(b'"');
            }
            for _ in 0..rng.random_range(0..6) {
                let piece = FIELD_BYTES[rng.random_range(0..FIELD_BYTES.len())];
                if quoted && piece == b"\"" {
                    record.extend_from_slice(b"\"\"");
                } else {
                    record.extend_from_slice(piece);
                }
            }
            if quoted {
                record.push(b'"');
            }
        }
        record.push(b'\n');
        record
    });

    if record.len() > buf.len() {
        return 0;
    }
    buf[..record.len()].copy_from_slice(&record);
    record.len()
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

fn run(flags: u8, chunks: &[&[u8]]) -> Result<Vec<Row<String>>, LoadError> {
    let delimiter = DELIMITERS[usize::from(flags & 3)];
    let header = flags & 4 != 0;
    let columns: Vec<_> = (0..=usize::from((flags >> 4) & 3))
        .map(|i| Column::text(format!("c{i}")))
        .collect();

    let mut sink = MemorySink::new();
    let mut loader: Box<dyn DataLoader + '_> = if flags & 8 != 0 {
        let options = TabularOptions {
            delimiter: delimiter.into(),
            header,
            ..TabularOptions::default()
        };
        Box::new(TabularDataLoader::begin(&mut sink, columns, &options)?)
    } else {
        let options = CsvOptions {
            delimiter: delimiter.into(),
            header,
        };
        Box::new(CsvDataLoader::begin(&mut sink, columns, &options)?)
    };
    for chunk in chunks {
        loader.feed(chunk)?;
    }
    loader.finish()?;
    Ok(sink.into_rows())
}

fn loader(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }

    let flags = data[0];
    let split_seed = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
    let body = &data[HEADER..];

    let sizes: Vec<usize> = (0..body.len())
        .map(|i| split_seed.rotate_left(i as u32 % 32) as usize % 16)
        .collect();
    let chunks = split_by_sizes(body, &sizes);

    let whole = run(flags, &[body]).map_err(|err| err.to_string());
    let chunked = run(flags, &chunks).map_err(|err| err.to_string());
    assert_eq!(whole, chunked, "chunk boundaries changed the outcome");
}

fuzz_target!(|data: &[u8]| loader(data));
