//! Adjacency collapser: merges contiguous, co-linear k-mer matches into
//! longer anchors with accumulated score.

/// Sorted (by `tId` then `tPos`) hits collapsed into anchors.
#[derive(Debug, Clone, Default)]
pub struct Anchors {
    pub q_pos: Vec<u32>,
    pub t_pos: Vec<u32>,
    pub t_id: Vec<u32>,
    pub score: Vec<f64>,
    pub len: Vec<u32>,
}

impl Anchors {
    pub fn len_hits(&self) -> usize {
        self.q_pos.len()
    }
}

/// Walks sorted hits with a two-pointer scan, merging hit `c` into an
/// earlier hit `j` on the same target when `tPos` and `qPos` both advance by
/// exactly `step`. A merged hit is dropped; its origin absorbs `step` into
/// `len` and `extendScore` into `score`.
pub fn collapse(
    q_pos: &[u32],
    t_pos: &[u32],
    t_id: &[u32],
    score: &[f64],
    extend_score: &[f64],
    k: u32,
    step: u32,
) -> Anchors {
    let s = q_pos.len();
    let mut len = vec![k; s];
    let mut origin: Vec<usize> = (0..s).collect();
    let mut keep = vec![true; s];
    let mut score = score.to_vec();

    if s > 1 {
        let mut j = 0usize; // start of current target's window
        let mut c = 0usize;
        while c < s - 1 {
            c += 1;
            if t_id[j] == t_id[c] {
                let mut p = j;
                while p < c {
                    let delta_t = t_pos[c] as i64 - t_pos[p] as i64;
                    if delta_t > step as i64 {
                        j = p + 1;
                    } else if delta_t == step as i64 {
                        let delta_q = q_pos[c] as i64 - q_pos[p] as i64;
                        if delta_q == step as i64 {
                            keep[c] = false;
                            let o = origin[p];
                            origin[c] = o;
                            len[o] += step;
                            score[o] += extend_score[c];
                            break;
                        }
                    } else {
                        break;
                    }
                    p += 1;
                }
            } else {
                j = c;
            }
        }
    }

    let kept = keep.iter().filter(|&&k| k).count();
    let mut anchors = Anchors {
        q_pos: Vec::with_capacity(kept),
        t_pos: Vec::with_capacity(kept),
        t_id: Vec::with_capacity(kept),
        score: Vec::with_capacity(kept),
        len: Vec::with_capacity(kept),
    };
    for i in 0..s {
        if keep[i] {
            anchors.q_pos.push(q_pos[i]);
            anchors.t_pos.push(t_pos[i]);
            anchors.t_id.push(t_id[i]);
            anchors.score.push(score[i]);
            anchors.len.push(len[i]);
        }
    }
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_a_run_of_adjacent_kmers_into_one_anchor() {
        // K=3, step=1: five overlapping k-mers spanning a 7-letter run
        let q_pos = vec![1, 2, 3, 4, 5];
        let t_pos = vec![1, 2, 3, 4, 5];
        let t_id = vec![1, 1, 1, 1, 1];
        let score = vec![3.0, 3.0, 3.0, 3.0, 3.0];
        let extend_score = vec![1.0, 1.0, 1.0, 1.0, 1.0];
        let anchors = collapse(&q_pos, &t_pos, &t_id, &score, &extend_score, 3, 1);
        assert_eq!(anchors.len_hits(), 1);
        assert_eq!(anchors.len[0], 7); // K + 4*step
        assert!((anchors.score[0] - (3.0 + 4.0 * 1.0)).abs() < 1e-9);
        assert_eq!(anchors.q_pos[0], 1);
        assert_eq!(anchors.t_pos[0], 1);
    }

    #[test]
    fn does_not_merge_across_different_targets() {
        let q_pos = vec![1, 2];
        let t_pos = vec![1, 2];
        let t_id = vec![1, 2];
        let score = vec![3.0, 3.0];
        let extend_score = vec![1.0, 1.0];
        let anchors = collapse(&q_pos, &t_pos, &t_id, &score, &extend_score, 3, 1);
        assert_eq!(anchors.len_hits(), 2);
    }

    #[test]
    fn does_not_merge_when_query_delta_mismatches_target_delta() {
        // tPos advances by step but qPos does not: no merge, both kept.
        let q_pos = vec![1, 5];
        let t_pos = vec![1, 2];
        let t_id = vec![1, 1];
        let score = vec![3.0, 3.0];
        let extend_score = vec![1.0, 1.0];
        let anchors = collapse(&q_pos, &t_pos, &t_id, &score, &extend_score, 3, 1);
        assert_eq!(anchors.len_hits(), 2);
    }

    #[test]
    fn collapse_invariant_no_kept_pair_differs_by_exactly_step_with_matching_qdelta() {
        let q_pos = vec![1, 2, 10, 11];
        let t_pos = vec![1, 2, 20, 21];
        let t_id = vec![1, 1, 1, 1];
        let score = vec![1.0; 4];
        let extend_score = vec![0.5; 4];
        let anchors = collapse(&q_pos, &t_pos, &t_id, &score, &extend_score, 2, 1);
        for a in 0..anchors.len_hits() {
            for b in 0..anchors.len_hits() {
                if a == b {
                    continue;
                }
                if anchors.t_id[a] != anchors.t_id[b] {
                    continue;
                }
                let dt = anchors.t_pos[b] as i64 - anchors.t_pos[a] as i64;
                let dq = anchors.q_pos[b] as i64 - anchors.q_pos[a] as i64;
                assert!(!(dt == 1 && dq == 1));
            }
        }
    }
}
