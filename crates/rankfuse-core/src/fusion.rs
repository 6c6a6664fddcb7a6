//! Fusion of ranked lists from independent retrievers.
//!
//! # Methods
//!
//! Every input list is first cut to its top `depth` entries.
//!
//! - **Linear interpolation** (`[sparse, dense]` only):
//!   `alpha * sparse + dense`, or `sparse + alpha * dense` with
//!   `weight_on_dense`. A document missing from one list takes that list's
//!   minimum observed score (0 for an empty list), not zero. With `normalize`
//!   each list is min-max-centered first.
//! - **Reciprocal rank fusion**: `sum(1 / (rrf_k + rank))` over the lists a
//!   document appears in; absence contributes 0.
//! - **Average**: mean of the scores a document received. With
//!   `missing_as_zero` the denominator is the number of input lists. With
//!   `normalize` each list is min-max-centered first.
//! - **Normalize**: min-max-center each list, then sum; absence contributes
//!   that list's minimum normalized score.
//!
//! # Ordering
//!
//! Fused score descending, docid ascending on ties, truncated to `top_k`.
//! Identical inputs always produce identical output.
//!
//! # Example
//!
//! ```
//! use rankfuse_core::{FusionConfig, FusionMethod, RankedList, ScoredDocument, fuse};
//!
//! let a: RankedList = [("d1", 3.0), ("d2", 1.0)]
//!     .into_iter()
//!     .map(|(id, s)| ScoredDocument::new(id, s))
//!     .collect();
//! let b: RankedList = [("d2", 0.9), ("d3", 0.4)]
//!     .into_iter()
//!     .map(|(id, s)| ScoredDocument::new(id, s))
//!     .collect();
//!
//! let fused = fuse(&[a, b], &FusionConfig::with_method(FusionMethod::ReciprocalRankFusion)).unwrap();
//! assert_eq!(fused.docs()[0].docid, "d2");
//! ```

use crate::config::{FusionConfig, FusionMethod};
use crate::error::ErrorCode;
use crate::model::{FusedResult, RankedList, ScoredDocument, ranking_order};
use crate::normalize::{NormalizeMode, ScoreRange};
use crate::run::Run;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Errors raised by fusion. These are caller mistakes and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FusionError {
    /// Unknown method, wrong list count, or a non-positive numeric field.
    #[error("invalid fusion config: {0}")]
    InvalidConfig(String),
}

impl FusionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
        }
    }
}

/// Fuse `lists` under `config`.
///
/// For linear interpolation the lists are `[sparse, dense]`. When every
/// input list is empty the result is an empty list, not an error.
///
/// # Errors
///
/// Returns [`FusionError::InvalidConfig`] if `config` fails validation, no
/// lists are given, or linear interpolation gets other than two lists.
pub fn fuse<L: AsRef<RankedList>>(
    lists: &[L],
    config: &FusionConfig,
) -> Result<FusedResult, FusionError> {
    config.validate()?;
    if lists.is_empty() {
        return Err(FusionError::InvalidConfig(
            "at least one ranked list is required".into(),
        ));
    }

    let heads: Vec<&[ScoredDocument]> = lists
        .iter()
        .map(|list| list.as_ref().head(config.depth))
        .collect();

    let scores = match config.method {
        FusionMethod::LinearInterpolation => {
            let [sparse, dense] = heads.as_slice() else {
                return Err(FusionError::InvalidConfig(format!(
                    "linear interpolation needs exactly 2 lists (sparse, dense), got {}",
                    heads.len()
                )));
            };
            interpolate(sparse, dense, config)
        }
        FusionMethod::ReciprocalRankFusion => reciprocal_rank(&heads, config.rrf_k),
        FusionMethod::Average => average(&heads, config),
        FusionMethod::Normalize => normalized_sum(&heads),
    };

    let fused = into_ranked(scores, config.top_k);
    debug!(
        method = %config.method,
        inputs = lists.len(),
        fused = fused.len(),
        "fused ranked lists"
    );
    Ok(fused)
}

/// Fuse whole runs query by query.
///
/// The output covers the union of query ids; a run with no entry for a query
/// contributes an empty list for it.
///
/// # Errors
///
/// Propagates the first [`FusionError`] from [`fuse`].
pub fn fuse_runs(runs: &[Run], config: &FusionConfig) -> Result<Run, FusionError> {
    config.validate()?;
    if runs.is_empty() {
        return Err(FusionError::InvalidConfig(
            "at least one run is required".into(),
        ));
    }

    let empty = RankedList::default();
    let query_ids: BTreeSet<&str> = runs
        .iter()
        .flat_map(|run| run.keys().map(String::as_str))
        .collect();

    let mut fused = Run::new();
    for qid in query_ids {
        let lists: Vec<&RankedList> = runs
            .iter()
            .map(|run| run.get(qid).unwrap_or(&empty))
            .collect();
        fused.insert(qid.to_string(), fuse(&lists, config)?);
    }
    Ok(fused)
}

fn interpolate<'a>(
    sparse: &'a [ScoredDocument],
    dense: &'a [ScoredDocument],
    config: &FusionConfig,
) -> BTreeMap<&'a str, f64> {
    let sparse_range = ScoreRange::of(sparse);
    let dense_range = ScoreRange::of(dense);
    let sparse_hits = score_map(sparse);
    let dense_hits = score_map(dense);
    let sparse_min = sparse_range.map_or(0.0, |r| r.min);
    let dense_min = dense_range.map_or(0.0, |r| r.min);

    let mode = normalize_mode(config);

    let mut fused = BTreeMap::new();
    for docid in sparse_hits.keys().chain(dense_hits.keys()) {
        if fused.contains_key(docid) {
            continue;
        }
        let sparse_score = sparse_hits.get(docid).copied().unwrap_or(sparse_min);
        let dense_score = dense_hits.get(docid).copied().unwrap_or(dense_min);
        let sparse_score = rescale(sparse_range, sparse_score, mode);
        let dense_score = rescale(dense_range, dense_score, mode);

        let score = if config.weight_on_dense {
            sparse_score + config.alpha * dense_score
        } else {
            config.alpha * sparse_score + dense_score
        };
        fused.insert(*docid, score);
    }
    fused
}

#[allow(clippy::cast_precision_loss)]
fn reciprocal_rank<'a>(lists: &[&'a [ScoredDocument]], k: usize) -> BTreeMap<&'a str, f64> {
    let mut fused: BTreeMap<&str, f64> = BTreeMap::new();
    for list in lists {
        for (idx, doc) in list.iter().enumerate() {
            let rank = idx + 1;
            *fused.entry(doc.docid.as_str()).or_default() += 1.0 / (k + rank) as f64;
        }
    }
    fused
}

#[allow(clippy::cast_precision_loss)]
fn average<'a>(lists: &[&'a [ScoredDocument]], config: &FusionConfig) -> BTreeMap<&'a str, f64> {
    let mode = normalize_mode(config);
    let mut totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for list in lists {
        let range = ScoreRange::of(list);
        for doc in *list {
            let entry = totals.entry(doc.docid.as_str()).or_default();
            entry.0 += rescale(range, doc.score, mode);
            entry.1 += 1;
        }
    }

    totals
        .into_iter()
        .map(|(docid, (sum, seen))| {
            let denominator = if config.missing_as_zero {
                lists.len()
            } else {
                seen
            };
            (docid, sum / denominator as f64)
        })
        .collect()
}

fn normalized_sum<'a>(lists: &[&'a [ScoredDocument]]) -> BTreeMap<&'a str, f64> {
    let normalized: Vec<(HashMap<&str, f64>, f64)> = lists
        .iter()
        .map(|list| {
            let range = ScoreRange::of(list);
            let hits = list
                .iter()
                .map(|doc| {
                    (
                        doc.docid.as_str(),
                        rescale(range, doc.score, NormalizeMode::MinMaxCentered),
                    )
                })
                .collect();
            let floor = range.map_or(0.0, |r| r.apply(r.min, NormalizeMode::MinMaxCentered));
            (hits, floor)
        })
        .collect();

    let docids: BTreeSet<&str> = lists
        .iter()
        .flat_map(|list| list.iter().map(|doc| doc.docid.as_str()))
        .collect();

    docids
        .into_iter()
        .map(|docid| {
            let score = normalized
                .iter()
                .map(|(hits, floor)| hits.get(docid).copied().unwrap_or(*floor))
                .sum::<f64>();
            (docid, score)
        })
        .collect()
}

const fn normalize_mode(config: &FusionConfig) -> NormalizeMode {
    if config.normalize {
        NormalizeMode::MinMaxCentered
    } else {
        NormalizeMode::None
    }
}

fn score_map(docs: &[ScoredDocument]) -> HashMap<&str, f64> {
    docs.iter()
        .map(|doc| (doc.docid.as_str(), doc.score))
        .collect()
}

fn rescale(range: Option<ScoreRange>, score: f64, mode: NormalizeMode) -> f64 {
    range.map_or(score, |r| r.apply(score, mode))
}

fn into_ranked(scores: BTreeMap<&str, f64>, top_k: usize) -> FusedResult {
    let mut docs: Vec<ScoredDocument> = scores
        .into_iter()
        .map(|(docid, score)| ScoredDocument::new(docid, score))
        .collect();
    docs.sort_by(ranking_order);
    docs.truncate(top_k);
    RankedList::from_ranked(docs)
}
