//!
//! kmer_chain_search: seed-and-chain search over an inverted k-mer index.
//!
//! Given a corpus of target sequences and one or more query sequences drawn
//! from a shared alphabet, this crate builds a read-only inverted index
//! mapping each k-mer to its occurrences across the corpus, then for each
//! query: gathers every occurrence of every k-mer in the query ([`hits`]),
//! sorts them by target then position ([`sort`]), collapses runs of
//! adjacent, co-linear hits into anchors ([`collapse`]), links anchors into
//! maximum-scoring chains under a bounded gap/separation model
//! ([`chain`]), and selects significant results under one of three output
//! policies ([`select`]).
//!
//! ## Features
//!
//! `"jemalloc"` enables jemallocator as the global allocator.
//!
//! `"auto"` parallelizes the search batch across all logical cores via
//! [`rayon`]. Enabled by default; [`search::search`] also accepts an
//! explicit thread count through [`types::SearchParams::num_threads`].
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use kmer_chain_search::freq::FreqTables;
//! use kmer_chain_search::index::{offsets_from_counts, update_index, InvertedIndex};
//! use kmer_chain_search::search::search;
//! use kmer_chain_search::types::{OutputMode, Query, SearchParams};
//!
//! let targets: Vec<Query> = vec![vec![Some(0), Some(0), Some(0)]];
//! let counts = vec![3u32, 0, 0, 0];
//! let offset0 = offsets_from_counts(&counts);
//! let total = *offset0.last().unwrap() as usize;
//!
//! // `update_index` consumes `offset` as a mutable write cursor, so the
//! // index keeps the untouched prefix-sum `offset0` instead.
//! let mut offset = Arc::new(offset0.clone());
//! let mut location = Arc::new(vec![0u32; total]);
//! let mut target_id = Arc::new(vec![0u32; total]);
//! let mut positions = Arc::new(vec![0u64; targets.len()]);
//! update_index(&mut offset, &targets, 3, 1, &mut location, &mut target_id, &mut positions, 0, &()).unwrap();
//!
//! let index = InvertedIndex {
//!     alphabet_size: 4,
//!     k: 3,
//!     step: 1,
//!     offset: offset0,
//!     target_id: Arc::try_unwrap(target_id).unwrap(),
//!     location: Arc::try_unwrap(location).unwrap(),
//!     positions: Arc::try_unwrap(positions).unwrap(),
//! };
//!
//! let freq = FreqTables::build(&[1.0, 2.0, 3.0, 4.0], 3, 1, 1.0, 1.0);
//! let queries: Vec<Query> = vec![vec![Some(0), Some(0), Some(0)]];
//! let params = SearchParams {
//!     output_mode: OutputMode::AllChains,
//!     total_corpus_size: 1000.0,
//!     min_score: Some(f64::NEG_INFINITY),
//!     score_only: false,
//!     verbose: false,
//!     num_threads: Some(1),
//! };
//! let out = search(&index, &freq, &queries, &params, &(), None).unwrap();
//! assert_eq!(out.target_id, vec![1]);
//! ```

#[cfg(all(not(target_env = "msvc"), feature = "jemallocator"))]
use jemallocator::Jemalloc;

#[cfg(all(not(target_env = "msvc"), feature = "jemallocator"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

pub mod chain;
pub mod collapse;
pub mod error;
pub mod freq;
pub mod hits;
pub mod index;
pub mod search;
pub mod select;
pub mod sort;
pub mod types;

pub use error::SearchError;
pub use freq::FreqTables;
pub use index::InvertedIndex;
pub use search::search;
pub use types::{Anchor, CancelSignal, Kmer, OutputMode, ProgressSink, Query, SearchOutput, SearchParams};
