//! Result selection: output-mode candidate policy, the significance filter,
//! and anchor traceback.

use crate::types::{Anchor, OutputMode};

/// Selects candidate anchor indices according to `mode`. Indices are
/// returned in natural (ascending) order, which for `AllChains` is the
/// collapsed-hit order (`tId` then `tPos`) since that's the order anchors
/// already carry coming out of the collapser and chain DP.
pub fn select_candidates(mode: OutputMode, t_id: &[u32], score: &[f64], origin: &[usize]) -> Vec<usize> {
    let s = t_id.len();
    match mode {
        OutputMode::AllChains => {
            // Retain exactly the highest-scoring representative per origin.
            // `origin[j] <= j` always (chains only link backward), so by the
            // time index `j` is visited, its origin's current representative
            // has already been recorded.
            let mut representative: Vec<Option<usize>> = vec![None; s];
            for j in 0..s {
                if origin[j] == j {
                    representative[j] = Some(j);
                } else {
                    let o = origin[j];
                    let cur = representative[o].expect("origin visited before its dependents");
                    if score[cur] < score[j] {
                        representative[o] = Some(j);
                        representative[j] = None;
                    } else {
                        representative[j] = None;
                    }
                }
            }
            let mut keep = vec![false; s];
            for slot in representative.iter().flatten() {
                keep[*slot] = true;
            }
            (0..s).filter(|&j| keep[j]).collect()
        }
        OutputMode::BestPerTarget => {
            let mut keep = vec![false; s];
            let mut current_target: Option<u32> = None;
            let mut current_best = 0usize;
            for j in 0..s {
                if current_target != Some(t_id[j]) {
                    current_target = Some(t_id[j]);
                    current_best = j;
                    keep[j] = true;
                } else if score[j] > score[current_best] {
                    keep[current_best] = false;
                    current_best = j;
                    keep[j] = true;
                }
            }
            (0..s).filter(|&j| keep[j]).collect()
        }
        OutputMode::TopOne => {
            if s == 0 {
                Vec::new()
            } else {
                let mut best = 0usize;
                for j in 1..s {
                    if score[j] > score[best] {
                        best = j;
                    }
                }
                vec![best]
            }
        }
    }
}

/// Keeps only candidates whose score meets the significance threshold:
/// `min_score` if supplied, otherwise a per-candidate threshold derived
/// from the total corpus size and the target's matchable-position count.
pub fn filter_significant(
    candidates: &[usize],
    t_id: &[u32],
    score: &[f64],
    positions: &[u64],
    min_score: Option<f64>,
    total_corpus_size: f64,
    step: u32,
) -> Vec<usize> {
    candidates
        .iter()
        .copied()
        .filter(|&j| {
            let threshold = match min_score {
                Some(m) => m,
                None => {
                    let target_positions = positions[(t_id[j] - 1) as usize] as f64;
                    ((total_corpus_size - target_positions) / step as f64).ln()
                }
            };
            score[j] >= threshold
        })
        .collect()
}

/// Reconstructs a chain's anchors by following `prev` back to the origin,
/// returned in increasing query-coordinate order.
pub fn traceback(
    result_index: usize,
    q_pos: &[u32],
    t_pos: &[u32],
    len: &[u32],
    prev: &[usize],
) -> Vec<Anchor> {
    let mut out = Vec::new();
    let mut p = result_index;
    loop {
        out.push(Anchor {
            q_start: q_pos[p],
            q_end: q_pos[p] + len[p] - 1,
            t_start: t_pos[p],
            t_end: t_pos[p] + len[p] - 1,
        });
        if prev[p] == p {
            break;
        }
        p = prev[p];
    }
    out.reverse();
    out
}
