//! Error types surfaced at the crate's call boundaries.

use thiserror::Error;

/// Failure modes for the search and index-build entry points.
///
/// Every error is surfaced at a call boundary; nothing is swallowed and there
/// are no retries — the caller decides what to do next.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    /// The caller's cancellation signal fired mid-run. All per-query buffers
    /// for in-flight and not-yet-started queries are dropped before this is
    /// returned; there are no partial results.
    #[error("received user interrupt")]
    Cancelled,

    /// A query's target hits exceeded the range of a signed 32-bit integer
    /// while gathering. Fatal for the whole call. Carries the offending
    /// query's 1-based index.
    #[error("too many target k-mer hits for query {0}")]
    HitOverflow(usize),

    /// A builder entry point (`count_index`, `update_index`, `approx_freqs`)
    /// was called on an array that is not exclusively owned by the caller.
    #[error("'{0}' was called on an array that is shared with another owner")]
    SharedArray(&'static str),
}
