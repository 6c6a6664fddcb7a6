//! Retriever contract consumed by the hybrid orchestrator.
//!
//! Sparse (inverted index) and dense (vector index) engines both satisfy the
//! same shape: given a query and a cutoff, return a ranked list. Handles are
//! shared across worker threads by reference, so implementations must be
//! safe for concurrent read-only search.

use anyhow::{Context, Result, bail, ensure};
use rankfuse_core::{RankedList, Run};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// A search engine returning ranked `(docid, score)` lists.
pub trait Retriever: Send + Sync {
    /// Short label used in logs and error messages (e.g. `"bm25"`).
    fn name(&self) -> &str;

    /// Top `k` hits for `query`, best first.
    ///
    /// # Errors
    ///
    /// Engine-specific; callers propagate without interpreting the cause.
    fn search(&self, query: &str, k: usize) -> Result<RankedList>;

    /// Search many queries on a pool of `threads` workers, keyed by id.
    ///
    /// Each query's outcome is independent: one failure does not prevent
    /// the others from completing.
    ///
    /// # Errors
    ///
    /// Fails up front if `queries` and `ids` differ in length, `threads` is
    /// zero, or the worker pool cannot be built.
    fn batch_search(
        &self,
        queries: &[String],
        ids: &[String],
        k: usize,
        threads: usize,
    ) -> Result<BTreeMap<String, Result<RankedList>>> {
        ensure!(
            queries.len() == ids.len(),
            "got {} queries but {} ids",
            queries.len(),
            ids.len()
        );
        ensure!(threads > 0, "thread count must be positive");
        let pool = worker_pool(threads).context("failed to build search worker pool")?;

        Ok(pool.install(|| {
            queries
                .par_iter()
                .zip(ids.par_iter())
                .map(|(query, id)| (id.clone(), self.search(query, k)))
                .collect()
        }))
    }
}

/// Build a bounded pool for one batch. `threads` must be positive.
pub(crate) fn worker_pool(threads: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("rankfuse-worker-{idx}"))
        .build()
}

/// Answers queries from a precomputed run.
///
/// Query text is mapped to a query id through a topics list. A topic whose id
/// has no entries in the run has zero hits; query text that matches no topic
/// is a retrieval failure. Text shared by several topics cannot be resolved
/// to one id, so searching for it fails too.
#[derive(Debug, Clone)]
pub struct RunRetriever {
    name: String,
    by_query: HashMap<String, RankedList>,
    ambiguous: HashSet<String>,
}

impl RunRetriever {
    pub fn new(name: impl Into<String>, run: &Run, topics: &[(String, String)]) -> Self {
        let name = name.into();
        let mut by_query = HashMap::with_capacity(topics.len());
        let mut ambiguous = HashSet::new();

        for (qid, query) in topics {
            if by_query.remove(query).is_some() || ambiguous.contains(query) {
                warn!(retriever = %name, qid = %qid, "query text shared by several topics");
                ambiguous.insert(query.clone());
                continue;
            }
            by_query.insert(query.clone(), run.get(qid).cloned().unwrap_or_default());
        }

        debug!(
            retriever = %name,
            queries = by_query.len(),
            ambiguous = ambiguous.len(),
            "loaded precomputed run"
        );
        Self {
            name,
            by_query,
            ambiguous,
        }
    }
}

impl Retriever for RunRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(&self, query: &str, k: usize) -> Result<RankedList> {
        if self.ambiguous.contains(query) {
            bail!(
                "{}: query `{query}` matches more than one topic",
                self.name
            );
        }
        let Some(hits) = self.by_query.get(query) else {
            bail!("{}: no precomputed results for query `{query}`", self.name);
        };
        let mut hits = hits.clone();
        hits.truncate(k);
        Ok(hits)
    }
}
