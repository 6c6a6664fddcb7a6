//! Hybrid search: one sparse and one dense retrieval per query, then fusion.
//!
//! Per query the two retrievals run concurrently and are joined before
//! fusion, so a fused list only ever exists for a query whose retrievals both
//! succeeded. Batches run on a bounded pool built per call; a failed query is
//! reported under its id and never aborts the rest of the batch.

use crate::retriever::{Retriever, worker_pool};
use rankfuse_core::error::ErrorCode;
use rankfuse_core::{FusedResult, FusionConfig, FusionError, Run, fuse};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

/// Per-query failure surfaced by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A retriever call failed. The cause is carried as-is.
    #[error("{retriever} retrieval failed for query `{query_id}`: {source}")]
    Retrieval {
        retriever: String,
        query_id: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error(transparent)]
    Fusion(#[from] FusionError),

    /// The batch was cancelled before this query started.
    #[error("query cancelled before it started")]
    Cancelled,

    #[error("failed to build search worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl SearchError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Retrieval { .. } => ErrorCode::RetrievalFailed,
            Self::Fusion(e) => e.code(),
            Self::Cancelled => ErrorCode::QueryCancelled,
            Self::WorkerPool(_) => ErrorCode::InternalUnexpected,
        }
    }
}

fn invalid(reason: impl Into<String>) -> SearchError {
    SearchError::Fusion(FusionError::InvalidConfig(reason.into()))
}

/// Outcome of a batch, split by query id.
#[derive(Debug, Default)]
pub struct BatchResults {
    pub results: BTreeMap<String, FusedResult>,
    pub failures: BTreeMap<String, SearchError>,
}

impl BatchResults {
    /// Number of queries accounted for, successful or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when every query produced a fused list.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Successful results as a run, ready for [`rankfuse_core::run::write_run`].
    #[must_use]
    pub fn into_run(self) -> Run {
        self.results
    }
}

/// Sparse + dense retrieval followed by fusion.
#[derive(Debug)]
pub struct HybridSearchOrchestrator<S, D> {
    sparse: S,
    dense: D,
}

impl<S: Retriever, D: Retriever> HybridSearchOrchestrator<S, D> {
    pub const fn new(sparse: S, dense: D) -> Self {
        Self { sparse, dense }
    }

    /// Retrieve `k0` hits from each retriever and fuse them down to `k`.
    ///
    /// Errors name the query text as the query id.
    ///
    /// # Errors
    ///
    /// [`SearchError::Retrieval`] if either retriever fails,
    /// [`SearchError::Fusion`] for an invalid config or a zero `k0`/`k`.
    #[instrument(skip(self, config), fields(sparse = self.sparse.name(), dense = self.dense.name()))]
    pub fn search(
        &self,
        query: &str,
        k0: usize,
        k: usize,
        config: &FusionConfig,
    ) -> Result<FusedResult, SearchError> {
        let config = query_config(k0, k, config)?;
        self.run_query(query, query, k0, &config)
    }

    /// [`Self::batch_search_cancellable`] without a cancellation flag.
    ///
    /// # Errors
    ///
    /// See [`Self::batch_search_cancellable`].
    pub fn batch_search(
        &self,
        queries: &[String],
        ids: &[String],
        k0: usize,
        k: usize,
        config: &FusionConfig,
        threads: usize,
    ) -> Result<BatchResults, SearchError> {
        let never = AtomicBool::new(false);
        self.batch_search_cancellable(queries, ids, k0, k, config, threads, &never)
    }

    /// Search and fuse every query on a pool of `threads` workers.
    ///
    /// `queries[i]` is reported under `ids[i]`. Once `cancel` is set, queries
    /// that have not started are reported as [`SearchError::Cancelled`];
    /// queries already running finish normally.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Fusion`] before any retrieval runs if the
    /// lengths differ, `threads` is zero, an id repeats, or the config is
    /// invalid. Returns [`SearchError::WorkerPool`] if the pool cannot start.
    #[allow(clippy::too_many_arguments)]
    #[instrument(
        skip_all,
        fields(queries = queries.len(), threads = threads, sparse = self.sparse.name(), dense = self.dense.name())
    )]
    pub fn batch_search_cancellable(
        &self,
        queries: &[String],
        ids: &[String],
        k0: usize,
        k: usize,
        config: &FusionConfig,
        threads: usize,
        cancel: &AtomicBool,
    ) -> Result<BatchResults, SearchError> {
        if queries.len() != ids.len() {
            return Err(invalid(format!(
                "got {} queries but {} ids",
                queries.len(),
                ids.len()
            )));
        }
        if threads == 0 {
            return Err(invalid("threads must be positive"));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(invalid(format!("duplicate query id `{dup}`")));
        }
        let config = query_config(k0, k, config)?;
        let pool = worker_pool(threads)?;

        let outcomes: Vec<(String, Result<FusedResult, SearchError>)> = pool.install(|| {
            queries
                .par_iter()
                .zip(ids.par_iter())
                .map(|(query, id)| {
                    if cancel.load(Ordering::Acquire) {
                        return (id.clone(), Err(SearchError::Cancelled));
                    }
                    (id.clone(), self.run_query(id, query, k0, &config))
                })
                .collect()
        });

        let mut batch = BatchResults::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(fused) => {
                    batch.results.insert(id, fused);
                }
                Err(SearchError::Cancelled) => {
                    batch.failures.insert(id, SearchError::Cancelled);
                }
                Err(e) => {
                    warn!(query_id = %id, code = %e.code(), "query failed: {e}");
                    batch.failures.insert(id, e);
                }
            }
        }

        let cancelled = batch
            .failures
            .values()
            .filter(|e| matches!(e, SearchError::Cancelled))
            .count();
        if cancelled > 0 {
            info!(cancelled, "batch cancelled");
        }
        debug!(
            succeeded = batch.results.len(),
            failed = batch.failures.len(),
            "batch search complete"
        );
        Ok(batch)
    }

    fn run_query(
        &self,
        query_id: &str,
        query: &str,
        k0: usize,
        config: &FusionConfig,
    ) -> Result<FusedResult, SearchError> {
        let (sparse, dense) = rayon::join(
            || self.sparse.search(query, k0),
            || self.dense.search(query, k0),
        );
        let sparse = sparse.map_err(|e| retrieval_error(self.sparse.name(), query_id, e))?;
        let dense = dense.map_err(|e| retrieval_error(self.dense.name(), query_id, e))?;
        Ok(fuse(&[sparse, dense], config)?)
    }
}

fn retrieval_error(retriever: &str, query_id: &str, source: anyhow::Error) -> SearchError {
    SearchError::Retrieval {
        retriever: retriever.to_string(),
        query_id: query_id.to_string(),
        source: source.into(),
    }
}

/// Fusion config for one query: output truncated to `k`.
fn query_config(k0: usize, k: usize, config: &FusionConfig) -> Result<FusionConfig, SearchError> {
    if k0 == 0 {
        return Err(invalid("k0 must be positive"));
    }
    let config = config.clone().top_k(k);
    config.validate()?;
    Ok(config)
}
