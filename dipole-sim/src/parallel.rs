use rayon::prelude::*;

/// Dispatch a per-chunk closure over contiguous site ranges in parallel.
///
/// `items` is split into `streams.len()` chunks of `ceil(n / streams.len())`
/// sites; chunk `k` is paired with `streams[k]`, so the random sequence each
/// site sees depends only on the stream count, not on the pool size or on
/// scheduling. The closure receives `(offset, chunk, stream)`, where
/// `offset` is the index of the chunk's first site.
pub fn par_over_sites<T, S>(
    items: &mut [T],
    streams: &mut [S],
    body: impl Fn(usize, &mut [T], &mut S) + Send + Sync,
) where
    T: Send,
    S: Send,
{
    if items.is_empty() || streams.is_empty() {
        return;
    }
    let chunk_len = items.len().div_ceil(streams.len());

    items
        .par_chunks_mut(chunk_len)
        .zip(streams.par_iter_mut())
        .enumerate()
        .for_each(|(k, (chunk, stream))| body(k * chunk_len, chunk, stream));
}
