//! The read-only inverted index and the builder that populates it.
//!
//! `count_index` tallies k-mer occurrences across a corpus; `update_index`
//! then writes `(target, position)` entries at the offsets implied by those
//! counts, mirroring `countIndex`/`updateIndex` from the reference
//! implementation. Writable arrays are modeled as `Arc<Vec<T>>`: the builder
//! refuses to mutate one that has any other strong or weak reference,
//! matching the reference implementation's `MAYBE_SHARED` guard.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::instrument;

use crate::error::SearchError;
use crate::types::{CancelSignal, Query};

/// How often the builder polls for cancellation, regardless of corpus size.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Read-only structure mapping each k-mer code to the `(targetId, position)`
/// pairs that contain it, plus per-target matchable-position counts.
#[derive(Debug, Clone)]
pub struct InvertedIndex {
    pub alphabet_size: u32,
    pub k: u32,
    pub step: u32,
    /// Length `A^K + 1`; bucket `c` occupies `offset[c]..offset[c+1]`.
    pub offset: Vec<u64>,
    /// Parallel to `location`; length = total hits across all k-mers.
    pub target_id: Vec<u32>,
    /// 1-based position within the owning target.
    pub location: Vec<u32>,
    /// Matchable-position count per target, indexed by `targetId - 1`.
    pub positions: Vec<u64>,
}

impl InvertedIndex {
    /// Number of occurrences of k-mer `code` in the corpus.
    pub fn count(&self, code: u32) -> u32 {
        (self.offset[code as usize + 1] - self.offset[code as usize]) as u32
    }

    /// The `(targetId, location)` pair at `offset[code] + k`.
    pub fn entry(&self, code: u32, k: u32) -> (u32, u32) {
        let p = (self.offset[code as usize] + k as u64) as usize;
        (self.target_id[p], self.location[p])
    }
}

/// Computes cumulative offsets from per-k-mer counts: `offset[0] = 0`,
/// `offset[c+1] = offset[c] + counts[c]`.
pub fn offsets_from_counts(counts: &[u32]) -> Vec<u64> {
    let mut offset = Vec::with_capacity(counts.len() + 1);
    offset.push(0u64);
    let mut acc = 0u64;
    for &c in counts {
        acc += c as u64;
        offset.push(acc);
    }
    offset
}

fn exclusive_mut<'a, T>(arc: &'a mut Arc<T>, site: &'static str) -> Result<&'a mut T, SearchError> {
    Arc::get_mut(arc).ok_or(SearchError::SharedArray(site))
}

/// Tallies k-mer occurrences: for every query, for every stride position
/// `j = 0, step, 2*step, ...`, if the code is unmasked, increments
/// `counts[code]`. `counts` must be exclusively owned.
#[instrument(skip(counts, queries, cancel), fields(queries = queries.len()))]
pub fn count_index(
    counts: &mut Arc<Vec<u32>>,
    queries: &[Query],
    step: u32,
    cancel: &dyn CancelSignal,
) -> Result<(), SearchError> {
    let counts = exclusive_mut(counts, "count_index")?;
    let mut last_check = Instant::now();
    for query in queries {
        for j in (0..query.len()).step_by(step.max(1) as usize) {
            if let Some(code) = query[j] {
                counts[code as usize] += 1;
            }
        }
        if last_check.elapsed() >= CANCEL_CHECK_INTERVAL {
            last_check = Instant::now();
            if cancel.is_cancelled() {
                tracing::debug!("count_index cancelled by caller");
                return Err(SearchError::Cancelled);
            }
        }
    }
    Ok(())
}

/// Writes `(target, position)` entries into the inverted index at the
/// offsets implied by `counts`, and records each target's unmasked-position
/// span. `offset`, `location`, `index`, and `positions` must each be
/// exclusively owned; `offset` is consumed as a mutable write cursor (callers
/// must reseed it with the cumulative prefix of `counts` before each build
/// pass — see [`offsets_from_counts`]).
///
/// `targets[i]` is assigned id `start_target_id + i + 1` (1-based).
#[instrument(skip(offset, queries, location, index, positions, cancel), fields(queries = queries.len()))]
#[allow(clippy::too_many_arguments)]
pub fn update_index(
    offset: &mut Arc<Vec<u64>>,
    queries: &[Query],
    k: u32,
    step: u32,
    location: &mut Arc<Vec<u32>>,
    index: &mut Arc<Vec<u32>>,
    positions: &mut Arc<Vec<u64>>,
    start_target_id: u32,
    cancel: &dyn CancelSignal,
) -> Result<(), SearchError> {
    let offset = exclusive_mut(offset, "update_index")?;
    let location = exclusive_mut(location, "update_index")?;
    let index = exclusive_mut(index, "update_index")?;
    let positions = exclusive_mut(positions, "update_index")?;

    let mut last_check = Instant::now();
    let stride = step.max(1) as usize;

    for (i, query) in queries.iter().enumerate() {
        let target_id = start_target_id + i as u32 + 1;

        // matchable-position span for this target
        let mut last_unmasked: Option<usize> = None;
        let mut span = 0u64;
        for (j, code) in query.iter().enumerate() {
            if code.is_some() {
                let contiguous = match (last_unmasked, j.checked_sub(stride)) {
                    (Some(p), Some(d)) => p == d,
                    _ => false,
                };
                span += if contiguous { step as u64 } else { k as u64 };
                last_unmasked = Some(j);
            }
        }
        positions[i] += span;

        // write inverted-index entries
        for j in (0..query.len()).step_by(stride) {
            if let Some(code) = query[j] {
                let c = code as usize;
                let p = offset[c] as usize;
                index[p] = target_id;
                location[p] = (j + 1) as u32;
                offset[c] += 1;
            }
        }

        if last_check.elapsed() >= CANCEL_CHECK_INTERVAL {
            last_check = Instant::now();
            if cancel.is_cancelled() {
                tracing::debug!("update_index cancelled by caller");
                return Err(SearchError::Cancelled);
            }
        }
    }
    Ok(())
}

/// Buckets raw per-k-mer counts into `freqs.len()` coarse frequency
/// estimates and writes the cumulative offsets into `offset`, mirroring the
/// reference implementation's `approxFreqs`: offsets and a coarse frequency
/// profile are computed together in one pass over `counts`.
pub fn approx_freqs(
    offset: &mut Arc<Vec<f64>>,
    freqs: &mut Arc<Vec<f64>>,
    counts: &[u32],
) -> Result<(), SearchError> {
    let offset = exclusive_mut(offset, "approx_freqs")?;
    let freqs = exclusive_mut(freqs, "approx_freqs")?;

    let l = offset.len();
    let s = freqs.len();
    if l == 0 || s == 0 {
        return Ok(());
    }
    let bin_size = l / s;
    let mut bin_end = bin_size;
    let mut bin = 0usize;
    freqs[0] = counts[0] as f64;

    let mut i = 0usize;
    while i < l - 1 {
        let j = i + 1;
        offset[j] = offset[i] + counts[i] as f64;
        i = j;
        if i >= bin_end {
            bin += 1;
            bin_end += bin_size;
        }
        if bin < s {
            freqs[bin] += counts[i] as f64;
        }
    }
    Ok(())
}
