/// Number of fixed-size chunks needed to carry `len` bytes.
#[inline]
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    len.div_ceil(chunk_size)
}

/// Zero bytes appended to the final chunk.
#[inline]
pub fn padding_len(len: usize, chunk_size: usize) -> usize {
    chunk_count(len, chunk_size) * chunk_size - len
}

/// Split `data` into `ceil(len / chunk_size)` chunks of exactly `chunk_size`
/// bytes, right-padding the last one with zeros. Empty input yields no chunks.
pub fn chunk(data: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    debug_assert!(chunk_size > 0, "chunk size must be positive");
    let total = chunk_count(data.len(), chunk_size);
    let mut out = Vec::with_capacity(total);
    for piece in data.chunks(chunk_size.max(1)) {
        let mut c = Vec::with_capacity(chunk_size);
        c.extend_from_slice(piece);
        c.resize(chunk_size, 0);
        out.push(c);
    }
    out
}
