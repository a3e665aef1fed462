/// How a payload travels to its upload target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One multipart request carrying the whole payload.
    Single,
    /// A strictly sequential series of range-framed chunk requests.
    Chunked,
}

/// Picks the transfer strategy for a payload of `total_len` bytes.
///
/// Returns [`Strategy::Single`] exactly when the chunker would yield one
/// chunk, i.e. `total_len <= threshold`.
pub fn select_strategy(total_len: u64, threshold: u64) -> Strategy {
    if total_len <= threshold {
        Strategy::Single
    } else {
        Strategy::Chunked
    }
}
