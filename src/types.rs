//! Shared types for the search entry point: queries, output modes, and the
//! external collaborators (cancellation and progress) the core depends on
//! but does not own.

use serde::{Deserialize, Serialize};

/// A k-mer code, or `None` for a masked position that must never produce a
/// hit.
pub type Kmer = Option<u32>;

/// A single query: a sequence of k-mer codes in query order.
pub type Query = Vec<Kmer>;

/// The three output policies a search can apply to candidate chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    /// Retain the highest-scoring representative chain per origin anchor.
    AllChains,
    /// Retain the highest-scoring chain per target.
    BestPerTarget,
    /// Retain only the single highest-scoring chain across all targets.
    TopOne,
}

/// One reconstructed anchor in a chain's traceback, in increasing query
/// coordinate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub q_start: u32,
    pub q_end: u32,
    pub t_start: u32,
    pub t_end: u32,
}

/// Cooperative cancellation, checked by the search's coordinator thread at
/// most once per second.
pub trait CancelSignal: Sync {
    fn is_cancelled(&self) -> bool;
}

/// A no-op cancellation signal for callers that never cancel.
impl CancelSignal for () {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// External progress sink. Reported only when the integer percentage has
/// increased since the last report.
pub trait ProgressSink: Sync {
    fn report(&self, percent_complete: u32);
}

/// Per-query results, flattened across the whole batch in query order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutput {
    /// 1-based query index for each result row.
    pub query_id: Vec<u32>,
    /// 1-based target id for each result row.
    pub target_id: Vec<u32>,
    /// Chain score for each result row.
    pub score: Vec<f64>,
    /// Present unless the search was run with `score_only`; one entry per
    /// result row, each a traceback ordered by increasing query coordinate.
    pub anchors: Option<Vec<Vec<Anchor>>>,
}

/// Parameters for a search call; mirrors the reference implementation's
/// flat argument list (see spec §6) as a configuration struct. `sepC`/`gapC`
/// and `logFreqs` are not here: they're consumed once by [`crate::freq::FreqTables::build`]
/// rather than per search call, since a caller typically builds the tables
/// once and searches many query batches against them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub output_mode: OutputMode,
    /// Total size of the target database, used to derive a per-candidate
    /// significance threshold when `min_score` is not supplied.
    pub total_corpus_size: f64,
    /// Explicit significance threshold. When absent, derived per-candidate
    /// from `total_corpus_size` and the target's matchable position count.
    pub min_score: Option<f64>,
    /// `true` to skip anchor-matrix reconstruction and return scores only.
    pub score_only: bool,
    /// Gates progress reporting to `progress`, reported at most once per
    /// second. Cancellation is polled at the same 1 Hz cadence regardless of
    /// this flag — a caller must always be able to interrupt a running
    /// search, even when it doesn't want progress output.
    pub verbose: bool,
    /// `None` uses all logical cores, matching the teacher's `cpus()` fallback.
    pub num_threads: Option<usize>,
}
