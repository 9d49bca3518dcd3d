//! Per-query hit gathering: expands a query's k-mers into a flat set of
//! target occurrences, and computes the query's effective "width".

use crate::error::SearchError;
use crate::freq::FreqTables;
use crate::index::InvertedIndex;
use crate::types::Query;

/// Flat, parallel-array representation of all target occurrences of a
/// query's k-mers, plus the per-k-mer bucket sizes the sorter uses as its
/// initial runs.
#[derive(Debug, Clone, Default)]
pub struct Hits {
    pub q_pos: Vec<u32>,
    pub t_pos: Vec<u32>,
    pub t_id: Vec<u32>,
    pub score: Vec<f64>,
    pub extend_score: Vec<f64>,
    /// One entry per query position (including masked/zero-hit positions);
    /// the cumulative prefix of this array are the sorter's initial run
    /// boundaries.
    pub batch_sizes: Vec<u32>,
}

impl Hits {
    pub fn len(&self) -> usize {
        self.q_pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q_pos.is_empty()
    }
}

/// The query's effective length in letters, excluding masked regions.
///
/// Unlike the per-target matchable-position span computed during index
/// building (which credits a stride of `step`), width always checks the
/// immediately preceding array position: an unmasked k-mer adjacent to
/// another unmasked k-mer contributes 1, otherwise it contributes `K`.
pub fn query_width(query: &Query, k: u32) -> u32 {
    let mut width = 0u32;
    let mut last_unmasked: Option<usize> = None;
    for (j, code) in query.iter().enumerate() {
        if code.is_some() {
            let adjacent = j > 0 && last_unmasked == Some(j - 1);
            width += if adjacent { 1 } else { k };
            last_unmasked = Some(j);
        }
    }
    width
}

/// Gathers every target occurrence of every unmasked k-mer in `query`.
///
/// Returns `Ok(None)` when the query has no unmasked positions or no
/// k-mer in it occurs anywhere in the index (an empty result, not an
/// error). Returns `Err(SearchError::HitOverflow)` if the running hit total
/// would exceed the range of a signed 32-bit integer, naming the 1-based
/// `query_index`.
pub fn gather_hits(
    query: &Query,
    freq: &FreqTables,
    index: &InvertedIndex,
    query_index: usize,
) -> Result<Option<Hits>, SearchError> {
    let mut batch_sizes = vec![0u32; query.len()];
    let mut total: i64 = 0;
    for (j, code) in query.iter().enumerate() {
        if let Some(code) = code {
            let count = index.count(*code);
            batch_sizes[j] = count;
            total += count as i64;
            if total > i32::MAX as i64 {
                return Err(SearchError::HitOverflow(query_index));
            }
        }
    }

    if total == 0 {
        return Ok(None);
    }

    let total = total as usize;
    let mut hits = Hits {
        q_pos: Vec::with_capacity(total),
        t_pos: Vec::with_capacity(total),
        t_id: Vec::with_capacity(total),
        score: Vec::with_capacity(total),
        extend_score: Vec::with_capacity(total),
        batch_sizes,
    };

    for (j, code) in query.iter().enumerate() {
        let Some(code) = code else { continue };
        let count = hits.batch_sizes[j];
        for k in 0..count {
            let (t_id, t_pos) = index.entry(*code, k);
            hits.q_pos.push((j + 1) as u32);
            hits.t_pos.push(t_pos);
            hits.t_id.push(t_id);
            hits.score.push(freq.scores[*code as usize]);
            hits.extend_score.push(freq.extend_scores[*code as usize]);
        }
    }

    Ok(Some(hits))
}
