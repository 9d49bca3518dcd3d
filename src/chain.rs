//! Chain DP: bounded-window dynamic programming linking compatible anchors
//! on the same target into maximum-scoring chains.

use crate::freq::FreqTables;

/// Per-anchor DP state after the sweep: `prev`/`origin` let callers
/// reconstruct chains; `cov` and `score` are used by the result selector and
/// significance filter.
#[derive(Debug, Clone)]
pub struct ChainTable {
    /// `prev[j] == j` marks a chain's terminal (first) anchor.
    pub prev: Vec<usize>,
    /// The earliest anchor in `j`'s chain; `origin[j] == j` for a
    /// singleton chain.
    pub origin: Vec<usize>,
    /// Total query positions covered by the chain ending at `j`.
    ///
    /// Computed as `(sum of len along the chain) - (chain length)`: each
    /// anchor's raw `len - 1` is carried forward rather than `len`, an
    /// off-by-one preserved exactly from the reference implementation
    /// (its correctness is an open question there; this reproduces it for
    /// scoring parity rather than re-deriving a "corrected" formula).
    pub cov: Vec<u32>,
    /// Chain score ending at `j`, before the search-space correction.
    pub score: Vec<f64>,
}

/// Links anchors into chains via bounded-window DP.
///
/// For anchor `k`, only anchors `p` on the same target with
/// `tPos[k] >= tPos[p] + len[p]`, `qPos[k] >= qPos[p] + len[p]`, and
/// `tPos[k] - tPos[p] - len[p] <= maxSep` are considered; the window's left
/// edge `j` advances past any `p` that falls outside `maxSep`, since it can
/// never link again to anything after `k`.
pub fn chain(
    q_pos: &[u32],
    t_pos: &[u32],
    t_id: &[u32],
    len: &[u32],
    score_in: &[f64],
    freq: &FreqTables,
) -> ChainTable {
    let s = q_pos.len();
    let mut score = score_in.to_vec();
    let mut prev: Vec<usize> = (0..s).collect();
    let mut origin: Vec<usize> = (0..s).collect();
    let mut cov: Vec<i64> = len.iter().map(|&l| l as i64 - 1).collect();

    if s > 1 {
        let max_sep = freq.max_sep as i64;
        let mut j = 0usize;
        for k in 1..s {
            if t_id[k] != t_id[j] {
                j = k;
                continue;
            }
            let prev_score = score[k];
            let mut p = j;
            while p < k {
                let delta_t = t_pos[k] as i64 - t_pos[p] as i64 - len[p] as i64;
                if delta_t > max_sep {
                    j = p;
                } else if delta_t >= 0 {
                    let delta_q = q_pos[k] as i64 - q_pos[p] as i64 - len[p] as i64;
                    if delta_q >= 0 && delta_q <= max_sep {
                        let mut cand = score[p] + prev_score;
                        if cand > score[k] {
                            let (gap, sep) = if delta_q > delta_t {
                                ((delta_q - delta_t) as usize, delta_t as usize)
                            } else {
                                ((delta_t - delta_q) as usize, delta_q as usize)
                            };
                            cand += freq.gap_cost[gap] + freq.sep_cost[sep];
                            if cand > score[k] {
                                score[k] = cand;
                                prev[k] = p;
                                origin[k] = origin[p];
                                cov[k] = len[k] as i64 - 1 + cov[p];
                            }
                        }
                    }
                }
                p += 1;
            }
        }
    }

    ChainTable {
        prev,
        origin,
        cov: cov.into_iter().map(|c| c as u32).collect(),
        score,
    }
}
