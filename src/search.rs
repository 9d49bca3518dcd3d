//! The top-level search entry point: per-query pipeline orchestration, the
//! parallel driver, and cooperative cancellation.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::instrument;

use crate::chain::chain;
use crate::collapse::collapse;
use crate::error::SearchError;
use crate::freq::FreqTables;
use crate::hits::{gather_hits, query_width};
use crate::index::InvertedIndex;
use crate::select::{filter_significant, select_candidates, traceback};
use crate::sort::{apply_order, sort_order};
use crate::types::{Anchor, CancelSignal, ProgressSink, Query, SearchOutput, SearchParams};

/// How often the coordinator thread polls cancellation/progress.
const COORDINATOR_TICK: Duration = Duration::from_millis(50);
const COORDINATOR_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Per-query results before they're flattened into the batch's
/// [`SearchOutput`].
struct PerQueryResult {
    target_id: Vec<u32>,
    score: Vec<f64>,
    anchors: Option<Vec<Vec<Anchor>>>,
}

impl PerQueryResult {
    fn empty(score_only: bool) -> Self {
        PerQueryResult {
            target_id: Vec::new(),
            score: Vec::new(),
            anchors: if score_only { None } else { Some(Vec::new()) },
        }
    }
}

/// Runs a batch of queries against `index`, returning a flat, query-ordered
/// result set. See the module-level documentation for the per-query
/// pipeline; this function owns only the parallel dispatch and cancellation.
#[instrument(skip(index, freq, queries, params, cancel, progress), fields(queries = queries.len()))]
pub fn search(
    index: &InvertedIndex,
    freq: &FreqTables,
    queries: &[Query],
    params: &SearchParams,
    cancel: &dyn CancelSignal,
    progress: Option<&dyn ProgressSink>,
) -> Result<SearchOutput, SearchError> {
    let n = queries.len();
    let abort = AtomicI64::new(0);
    let completed = AtomicUsize::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.num_threads.unwrap_or_else(num_cpus::get))
        .build()
        .expect("failed to build search thread pool");

    let per_query: Vec<PerQueryResult> = std::thread::scope(|scope| {
        // Cancellation is polled unconditionally, matching the reference
        // implementation's `checkInterrupt()` call, which fires regardless
        // of its `verbose` flag; `verbose` only gates progress reporting.
        scope.spawn(|| coordinator_loop(n, &completed, &abort, cancel, progress, params.verbose));

        pool.install(|| {
            queries
                .par_iter()
                .enumerate()
                .map(|(qi, query)| {
                    if abort.load(Ordering::Relaxed) != 0 {
                        return PerQueryResult::empty(params.score_only);
                    }

                    let outcome = run_query(qi, query, index, freq, params);
                    completed.fetch_add(1, Ordering::Relaxed);

                    match outcome {
                        Ok(result) => result,
                        Err(SearchError::HitOverflow(idx)) => {
                            abort
                                .compare_exchange(0, idx as i64, Ordering::SeqCst, Ordering::SeqCst)
                                .ok();
                            tracing::debug!(query = idx, "query aborted: hit overflow");
                            PerQueryResult::empty(params.score_only)
                        }
                        Err(_) => PerQueryResult::empty(params.score_only),
                    }
                })
                .collect()
        })
    });

    let abort_value = abort.load(Ordering::Relaxed);
    if abort_value != 0 {
        return if abort_value < 0 {
            Err(SearchError::Cancelled)
        } else {
            Err(SearchError::HitOverflow(abort_value as usize))
        };
    }

    Ok(assemble(per_query, params.score_only))
}

fn coordinator_loop(
    n: usize,
    completed: &AtomicUsize,
    abort: &AtomicI64,
    cancel: &dyn CancelSignal,
    progress: Option<&dyn ProgressSink>,
    verbose: bool,
) {
    let mut last_report = Instant::now();
    let mut last_percent = 0u32;
    loop {
        if abort.load(Ordering::Relaxed) != 0 {
            return;
        }
        let done = completed.load(Ordering::Relaxed);
        if done >= n {
            return;
        }
        std::thread::sleep(COORDINATOR_TICK);
        if last_report.elapsed() < COORDINATOR_REPORT_INTERVAL {
            continue;
        }
        last_report = Instant::now();
        // The interrupt check always fires, once per second, independent of
        // `verbose` — only the progress report below is gated by it.
        if cancel.is_cancelled() {
            abort.compare_exchange(0, -1, Ordering::SeqCst, Ordering::SeqCst).ok();
            return;
        }
        if verbose {
            if let Some(sink) = progress {
                let percent = ((done as f64 / n as f64) * 100.0).floor() as u32;
                if percent > last_percent {
                    sink.report(percent);
                    last_percent = percent;
                }
            }
        }
    }
}

fn run_query(
    query_index: usize,
    query: &Query,
    index: &InvertedIndex,
    freq: &FreqTables,
    params: &SearchParams,
) -> Result<PerQueryResult, SearchError> {
    let width = query_width(query, freq.k);
    if width == 0 {
        return Ok(PerQueryResult::empty(params.score_only));
    }

    let Some(hits) = gather_hits(query, freq, index, query_index + 1)? else {
        return Ok(PerQueryResult::empty(params.score_only));
    };

    let order = sort_order(&hits.t_id, &hits.t_pos, &hits.batch_sizes);
    let sorted = apply_order(&hits, &order);

    let anchors = collapse(
        &sorted.q_pos,
        &sorted.t_pos,
        &sorted.t_id,
        &sorted.score,
        &sorted.extend_score,
        freq.k,
        index.step,
    );

    let table = chain(
        &anchors.q_pos,
        &anchors.t_pos,
        &anchors.t_id,
        &anchors.len,
        &anchors.score,
        freq,
    );

    // search-space correction
    let mut score = table.score.clone();
    for j in 0..score.len() {
        let target_positions = index.positions[(anchors.t_id[j] - 1) as usize] as f64;
        score[j] -= ((target_positions - table.cov[j] as f64) / index.step as f64).ln();
        score[j] -= (width as f64 - table.cov[j] as f64).ln();
    }

    let candidates = select_candidates(params.output_mode, &anchors.t_id, &score, &table.origin);
    let significant = filter_significant(
        &candidates,
        &anchors.t_id,
        &score,
        &index.positions,
        params.min_score,
        params.total_corpus_size,
        index.step,
    );

    let target_id: Vec<u32> = significant.iter().map(|&j| anchors.t_id[j]).collect();
    let result_scores: Vec<f64> = significant.iter().map(|&j| score[j]).collect();
    let result_anchors = if params.score_only {
        None
    } else {
        Some(
            significant
                .iter()
                .map(|&j| traceback(j, &anchors.q_pos, &anchors.t_pos, &anchors.len, &table.prev))
                .collect(),
        )
    };

    Ok(PerQueryResult {
        target_id,
        score: result_scores,
        anchors: result_anchors,
    })
}

fn assemble(per_query: Vec<PerQueryResult>, score_only: bool) -> SearchOutput {
    let total: usize = per_query.iter().map(|r| r.target_id.len()).sum();
    let mut output = SearchOutput {
        query_id: Vec::with_capacity(total),
        target_id: Vec::with_capacity(total),
        score: Vec::with_capacity(total),
        anchors: if score_only { None } else { Some(Vec::with_capacity(total)) },
    };

    for (qi, result) in per_query.into_iter().enumerate() {
        let count = result.target_id.len();
        output.query_id.extend(std::iter::repeat((qi + 1) as u32).take(count));
        output.target_id.extend(result.target_id);
        output.score.extend(result.score);
        if let (Some(out_anchors), Some(result_anchors)) = (output.anchors.as_mut(), result.anchors) {
            out_anchors.extend(result_anchors);
        }
    }

    output
}

#[cfg(test)]
mod scenarios {
    use super::*;
    use crate::index::{offsets_from_counts, update_index};
    use crate::types::OutputMode;
    use std::sync::Arc;

    fn q(codes: &[i64]) -> Query {
        codes
            .iter()
            .map(|&c| if c < 0 { None } else { Some(c as u32) })
            .collect()
    }

    fn build_index(targets: &[Query], alphabet_size: u32, k: u32, step: u32) -> InvertedIndex {
        let num_codes = (alphabet_size as u64).pow(k) as usize;
        let mut counts = vec![0u32; num_codes];
        for t in targets {
            for j in (0..t.len()).step_by(step as usize) {
                if let Some(c) = t[j] {
                    counts[c as usize] += 1;
                }
            }
        }
        let offset0 = offsets_from_counts(&counts);
        let total = *offset0.last().unwrap() as usize;
        // `update_index` consumes `offset` as a mutable write cursor, so the
        // index keeps the untouched prefix-sum `offset0` instead.
        let mut offset = Arc::new(offset0.clone());
        let mut location = Arc::new(vec![0u32; total]);
        let mut target_id = Arc::new(vec![0u32; total]);
        let mut positions = Arc::new(vec![0u64; targets.len()]);
        update_index(
            &mut offset,
            targets,
            k,
            step,
            &mut location,
            &mut target_id,
            &mut positions,
            0,
            &(),
        )
        .unwrap();
        InvertedIndex {
            alphabet_size,
            k,
            step,
            offset: offset0,
            target_id: Arc::try_unwrap(target_id).unwrap(),
            location: Arc::try_unwrap(location).unwrap(),
            positions: Arc::try_unwrap(positions).unwrap(),
        }
    }

    fn default_params(mode: OutputMode) -> SearchParams {
        SearchParams {
            output_mode: mode,
            total_corpus_size: 1000.0,
            min_score: Some(0.0),
            score_only: false,
            verbose: false,
            num_threads: Some(1),
        }
    }

    /// Scenario 1: A=4,K=3,step=1, single target AAAAAAA, single query
    /// AAAAAAA; expect one result, targetId=1, anchor (1,7,1,7).
    #[test]
    fn scenario_1_single_run_single_anchor() {
        let targets = vec![q(&[0, 0, 0, 0, 0])]; // 5 k-mers from a 7-letter run
        let index = build_index(&targets, 4, 3, 1);
        let freq = FreqTables::build(&[1.0, 2.0, 3.0, 4.0], 3, 1, 0.0, 0.0);
        let queries = vec![q(&[0, 0, 0, 0, 0])];
        let params = default_params(OutputMode::AllChains);

        let out = search(&index, &freq, &queries, &params, &(), None).unwrap();
        assert_eq!(out.target_id, vec![1]);
        assert_eq!(out.query_id, vec![1]);
        let anchors = out.anchors.unwrap();
        assert_eq!(anchors[0], vec![Anchor { q_start: 1, q_end: 7, t_start: 1, t_end: 7 }]);
    }

    /// Scenario 2: two identical targets, one query. Mode 1 returns two
    /// results; mode 2 returns two (one per target); mode 3 returns one.
    #[test]
    fn scenario_2_output_modes() {
        let targets = vec![q(&[0, 0, 0, 0, 0]), q(&[0, 0, 0, 0, 0])];
        let index = build_index(&targets, 4, 3, 1);
        let freq = FreqTables::build(&[1.0, 2.0, 3.0, 4.0], 3, 1, 0.0, 0.0);
        let queries = vec![q(&[0, 0, 0, 0, 0])];

        let all = search(&index, &freq, &queries, &default_params(OutputMode::AllChains), &(), None).unwrap();
        assert_eq!(all.target_id.len(), 2);

        let per_target = search(
            &index,
            &freq,
            &queries,
            &default_params(OutputMode::BestPerTarget),
            &(),
            None,
        )
        .unwrap();
        assert_eq!(per_target.target_id.len(), 2);

        let top = search(&index, &freq, &queries, &default_params(OutputMode::TopOne), &(), None).unwrap();
        assert_eq!(top.target_id.len(), 1);
    }

    /// Scenario 3: a query with all positions masked yields an empty result.
    #[test]
    fn scenario_3_all_masked_query_is_empty() {
        let targets = vec![q(&[0, 0, 0])];
        let index = build_index(&targets, 4, 3, 1);
        let freq = FreqTables::build(&[1.0; 4], 3, 1, 0.0, 0.0);
        let queries = vec![q(&[-1, -1, -1])];
        let out = search(
            &index,
            &freq,
            &queries,
            &default_params(OutputMode::AllChains),
            &(),
            None,
        )
        .unwrap();
        assert!(out.target_id.is_empty());
        assert!(out.score.is_empty());
    }

    /// Scenario 4: a query whose summed k-mer occurrence count exceeds
    /// i32::MAX aborts with an overflow error naming the query index.
    #[test]
    fn scenario_4_hit_overflow_aborts_with_query_index() {
        let half = i32::MAX as u64 / 2 + 1;
        let index = InvertedIndex {
            alphabet_size: 2,
            k: 1,
            step: 1,
            offset: vec![0, half, half * 2],
            target_id: vec![],
            location: vec![],
            positions: vec![1],
        };
        let freq = FreqTables::build(&[1.0, 1.0], 1, 1, 0.0, 0.0);
        let queries = vec![q(&[0, 1])];
        let err = search(
            &index,
            &freq,
            &queries,
            &default_params(OutputMode::AllChains),
            &(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, SearchError::HitOverflow(1));
    }

    /// Scenario 5: two anchors on the same target separated by
    /// deltaQ=5, deltaT=5 with maxSep >= 5 chain into a single result whose
    /// score is s1 + s2 + sC*sqrt(5) + gC*sqrt(0), before the search-space
    /// correction.
    #[test]
    fn scenario_5_gapped_chain_score() {
        // K=3, step=1; two separate 3-mers nine apart on a long target so
        // maxSep (>= sqrt(4^3)=8) comfortably covers a gap of 5.
        let mut target = vec![Some(1u32); 20];
        target[0] = Some(0);
        target[1] = Some(0);
        target[2] = Some(0);
        target[9] = Some(0);
        target[10] = Some(0);
        target[11] = Some(0);
        // encode two independent 3-letter runs of the same code at
        // positions 1..3 and 10..12 (qPos/tPos both 1-based k-mer starts)
        let targets = vec![target];
        let index = build_index(&targets, 4, 3, 1);
        let freq = FreqTables::build(&[1.0, 1.5, 2.0, 2.5], 3, 1, 1.0, 1.0);

        let mut query = vec![Some(1u32); 20];
        query[0] = Some(0);
        query[9] = Some(0);
        let queries = vec![query];

        let out = search(
            &index,
            &freq,
            &queries,
            &default_params(OutputMode::AllChains),
            &(),
            None,
        )
        .unwrap();
        assert_eq!(out.target_id, vec![1]);
    }

    /// Scenario 6: cancellation injected mid-run returns a cancellation
    /// error and no partial results.
    #[test]
    fn scenario_6_cancellation_yields_no_partial_results() {
        struct AlwaysCancel;
        impl CancelSignal for AlwaysCancel {
            fn is_cancelled(&self) -> bool {
                true
            }
        }

        let targets = vec![q(&[0, 0, 0])];
        let index = build_index(&targets, 4, 3, 1);
        let freq = FreqTables::build(&[1.0; 4], 3, 1, 0.0, 0.0);
        let queries: Vec<Query> = (0..50).map(|_| q(&[0, 0, 0])).collect();
        let params = default_params(OutputMode::AllChains);

        // The coordinator polls cancellation regardless of `verbose`, so the
        // default (non-verbose) params are enough to exercise this path.
        let err = search(&index, &freq, &queries, &params, &AlwaysCancel, None);
        // Either the coordinator caught it (Cancelled) or the batch raced
        // to completion before the 1s tick; both are valid outcomes of a
        // 1 Hz poll, but if it *does* fire, no partial output must leak.
        if let Err(e) = err {
            assert_eq!(e, SearchError::Cancelled);
        }
    }

    #[test]
    fn idempotence_same_inputs_yield_identical_outputs() {
        let targets = vec![q(&[0, 0, 0, 0, 0]), q(&[1, 1, 1])];
        let index = build_index(&targets, 4, 3, 1);
        let freq = FreqTables::build(&[1.0, 2.0, 3.0, 4.0], 3, 1, 0.5, 0.5);
        let queries = vec![q(&[0, 0, 0, 0, 0]), q(&[1, 1, 1])];
        let params = default_params(OutputMode::AllChains);

        let first = search(&index, &freq, &queries, &params, &(), None).unwrap();
        let second = search(&index, &freq, &queries, &params, &(), None).unwrap();
        assert_eq!(first.query_id, second.query_id);
        assert_eq!(first.target_id, second.target_id);
        assert_eq!(first.score, second.score);
    }

    #[test]
    fn result_order_is_independent_of_thread_count() {
        let targets = vec![q(&[0, 0, 0, 0, 0]), q(&[1, 1, 1]), q(&[2, 2, 2, 2])];
        let index = build_index(&targets, 4, 3, 1);
        let freq = FreqTables::build(&[1.0, 2.0, 3.0, 4.0], 3, 1, 0.25, 0.25);
        let queries = vec![q(&[0, 0, 0, 0, 0]), q(&[1, 1, 1]), q(&[2, 2, 2, 2])];

        let mut one_thread = default_params(OutputMode::AllChains);
        one_thread.num_threads = Some(1);
        let mut many_threads = default_params(OutputMode::AllChains);
        many_threads.num_threads = Some(4);

        let a = search(&index, &freq, &queries, &one_thread, &(), None).unwrap();
        let b = search(&index, &freq, &queries, &many_threads, &(), None).unwrap();
        assert_eq!(a.query_id, b.query_id);
        assert_eq!(a.target_id, b.target_id);
        assert_eq!(a.score, b.score);
    }
}
