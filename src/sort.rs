//! Two-key stable sort on `(targetId, targetPos)`.
//!
//! Each k-mer's bucket of hits arrives already sorted on `targetPos` (it was
//! read off the inverted index in position order), so the initial "runs"
//! for the merge are exactly those buckets — an `O(s log l)` bottom-up
//! pairwise merge rather than an `O(s log s)` general sort, where `l` is the
//! query length and `s` the total hit count.

use crate::hits::Hits;

/// Produces the index permutation that sorts hits by `(tId asc, tPos asc)`,
/// stable, from the per-k-mer `batch_sizes` as the initial runs.
pub fn sort_order(t_id: &[u32], t_pos: &[u32], batch_sizes: &[u32]) -> Vec<usize> {
    let s = t_id.len();
    let mut order: Vec<usize> = (0..s).collect();

    // Cumulative run boundaries: bounds[i] is the end (exclusive) of run i.
    let mut bounds: Vec<usize> = Vec::with_capacity(batch_sizes.len());
    let mut acc = 0usize;
    for &b in batch_sizes {
        acc += b as usize;
        bounds.push(acc);
    }
    while bounds.len() > 1 {
        let prev = order;
        let mut merged = Vec::with_capacity(s);
        let mut new_bounds = Vec::with_capacity((bounds.len() + 1) / 2);
        let mut start = 0usize;
        let mut i = 0usize;
        while i < bounds.len() {
            if i + 1 < bounds.len() {
                let mid = bounds[i];
                let end = bounds[i + 1];
                merge_pair(&prev, t_id, t_pos, start, mid, end, &mut merged);
                new_bounds.push(end);
                start = end;
                i += 2;
            } else {
                // odd leftover run: carried through untouched
                let end = bounds[i];
                merged.extend_from_slice(&prev[start..end]);
                new_bounds.push(end);
                start = end;
                i += 1;
            }
        }
        order = merged;
        bounds = new_bounds;
    }

    order
}

fn merge_pair(
    prev: &[usize],
    t_id: &[u32],
    t_pos: &[u32],
    start: usize,
    mid: usize,
    end: usize,
    out: &mut Vec<usize>,
) {
    let mut j = start;
    let mut k = mid;
    while j < mid && k < end {
        let (ja, ka) = (prev[j], prev[k]);
        let take_left = if t_id[ja] == t_id[ka] {
            t_pos[ja] <= t_pos[ka]
        } else {
            t_id[ja] < t_id[ka]
        };
        if take_left {
            out.push(ja);
            j += 1;
        } else {
            out.push(ka);
            k += 1;
        }
    }
    out.extend_from_slice(&prev[j..mid]);
    out.extend_from_slice(&prev[k..end]);
}

/// Applies a sort permutation to every per-hit array in one pass.
pub fn apply_order(hits: &Hits, order: &[usize]) -> Hits {
    let n = order.len();
    let mut sorted = Hits {
        q_pos: Vec::with_capacity(n),
        t_pos: Vec::with_capacity(n),
        t_id: Vec::with_capacity(n),
        score: Vec::with_capacity(n),
        extend_score: Vec::with_capacity(n),
        batch_sizes: Vec::new(),
    };
    for &i in order {
        sorted.q_pos.push(hits.q_pos[i]);
        sorted.t_pos.push(hits.t_pos[i]);
        sorted.t_id.push(hits.t_id[i]);
        sorted.score.push(hits.score[i]);
        sorted.extend_score.push(hits.extend_score[i]);
    }
    sorted
}
