//! Frequency & cost tables: per-k-mer prior scores and the gap/separation
//! cost lookup tables used by the chain DP.

/// Precomputed per-k-mer scores and DP cost tables.
///
/// `scores[c]` and `extend_scores[c]` are indexed by k-mer code `c`; both
/// have length `A^K`. `sep_cost` and `gap_cost` have length `max_sep + 1`.
#[derive(Debug, Clone)]
pub struct FreqTables {
    pub k: u32,
    pub step: u32,
    pub alphabet_size: u32,
    pub scores: Vec<f64>,
    pub extend_scores: Vec<f64>,
    pub sep_cost: Vec<f64>,
    pub gap_cost: Vec<f64>,
    /// `floor(sqrt(A^K))`: the DP window beyond which one k-mer hit is
    /// expected by chance.
    pub max_sep: u32,
}

impl FreqTables {
    /// Build the tables from `log_freqs` (length `A`, the `-log` of each
    /// letter's normalized frequency), the k-mer length `K`, the stride
    /// `step`, and the non-negative DP cost coefficients `sep_c`/`gap_c`.
    ///
    /// A k-mer code is a mixed-radix base-`A` integer; letter `i` (counted
    /// from the least-significant digit, i.e. from the last letter of the
    /// k-mer) is `(code / A^i) % A`. `scores[c]` sums `log_freqs` over all
    /// `K` letters; `extend_scores[c]` sums only the digits `i` in
    /// `K-step..K` — the most-significant `step` digits of the decomposition,
    /// i.e. the last `step` letters of the k-mer — the contribution used
    /// when an adjacent hit extends an existing anchor rather than starting
    /// a new one.
    pub fn build(log_freqs: &[f64], k: u32, step: u32, sep_c: f64, gap_c: f64) -> Self {
        let alphabet_size = log_freqs.len() as u32;
        let l = (alphabet_size as u64).pow(k);
        let mut scores = vec![0.0f64; l as usize];
        let mut extend_scores = vec![0.0f64; l as usize];

        for (code, (score, extend)) in scores.iter_mut().zip(extend_scores.iter_mut()).enumerate()
        {
            let mut c = code as u64;
            for i in 0..k {
                let letter = (c % alphabet_size as u64) as usize;
                *score += log_freqs[letter];
                if i >= k.saturating_sub(step) {
                    *extend += log_freqs[letter];
                }
                c /= alphabet_size as u64;
            }
        }

        let max_sep = (l as f64).sqrt().floor() as u32;
        let mut sep_cost = Vec::with_capacity(max_sep as usize + 1);
        let mut gap_cost = Vec::with_capacity(max_sep as usize + 1);
        for i in 0..=max_sep {
            let root = (i as f64).sqrt();
            sep_cost.push(sep_c * root);
            gap_cost.push(gap_c * root);
        }

        FreqTables {
            k,
            step,
            alphabet_size,
            scores,
            extend_scores,
            sep_cost,
            gap_cost,
            max_sep,
        }
    }

    /// Total number of possible k-mer codes, `A^K`.
    pub fn num_codes(&self) -> usize {
        self.scores.len()
    }
}
