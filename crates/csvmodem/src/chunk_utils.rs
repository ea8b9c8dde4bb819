//! Helpers for splitting test and fuzz payloads into chunks.

/// Split `payload` into approximately equal-sized chunks.
///
/// Chunks may end inside a multi-byte character; loaders must cope with that.
///
/// # Panics
///
/// Panics if `parts` is zero.
#[must_use]
pub fn produce_chunks(payload: &[u8], parts: usize) -> Vec<&[u8]> {
    assert!(parts > 0);
    let chunk_size = payload.len().div_ceil(parts).max(1);
    payload.chunks(chunk_size).collect()
}

/// Split `payload` into chunks whose lengths are taken from `sizes` in turn
/// (each reduced modulo the bytes left, plus one). Whatever is left after the
/// sizes run out forms the last chunk.
#[must_use]
pub fn split_by_sizes<'a>(payload: &'a [u8], sizes: &[usize]) -> Vec<&'a [u8]> {
    let mut chunks = Vec::new();
    let mut rest = payload;
    for &size in sizes {
        if rest.is_empty() {
            break;
        }
        let (head, tail) = rest.split_at(1 + size % rest.len());
        chunks.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}
