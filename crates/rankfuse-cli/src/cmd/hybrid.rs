//! `rankfuse hybrid` — batch hybrid search over precomputed sparse and dense
//! runs.
//!
//! Each topic's query text is sent to a sparse and a dense retriever backed
//! by the given runs, and the two hit lists are fused per query on a bounded
//! worker pool.

use crate::cmd::{FusionArgs, RunOutputArgs, load_config, read_run, read_topics, write_run_output};
use crate::output::{CliError, OutputMode, render};
use clap::Args;
use rankfuse_core::error::ErrorCode;
use rankfuse_core::Run;
use rankfuse_search::{HybridSearchOrchestrator, RunRetriever};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
#[command(
    about = "Hybrid sparse + dense search over a topics file",
    long_about = "Answer every topic from a sparse and a dense run, then fuse the two hit lists \
                  per query.\n\n\
                  Queries run in parallel on --threads workers. A failed query is reported \
                  without stopping the others.",
    after_help = "EXAMPLES:\n    # Interpolate BM25 and dense runs with the default alpha\n    rankfuse hybrid --topics topics.tsv --sparse bm25.trec --dense dense.trec -m interpolation\n\n\
                  # Keep 100 fused hits per query using 8 workers\n    rankfuse hybrid --topics topics.tsv --sparse bm25.trec --dense dense.trec -k 100 --threads 8\n\n\
                  # Machine-readable output\n    rankfuse hybrid --topics topics.tsv --sparse bm25.trec --dense dense.trec --json"
)]
pub struct HybridArgs {
    /// Topics file (`qid<TAB>query`).
    #[arg(long, value_name = "PATH")]
    pub topics: PathBuf,

    /// Sparse (lexical) TREC run.
    #[arg(long, value_name = "PATH")]
    pub sparse: PathBuf,

    /// Dense (vector) TREC run.
    #[arg(long, value_name = "PATH")]
    pub dense: PathBuf,

    /// Hits requested from each retriever before fusion.
    #[arg(long)]
    pub k0: Option<usize>,

    /// Fused hits kept per query.
    #[arg(short = 'k', long)]
    pub hits: Option<usize>,

    /// Worker threads.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Exit successfully even when some queries fail.
    #[arg(long)]
    pub allow_partial: bool,

    #[command(flatten)]
    pub fusion: FusionArgs,

    #[command(flatten)]
    pub out: RunOutputArgs,
}

/// JSON envelope for hybrid output.
#[derive(Debug, Serialize)]
struct HybridOutput<'a> {
    method: &'static str,
    queries: usize,
    succeeded: usize,
    failures: BTreeMap<&'a str, CliError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    run: &'a Run,
}

/// Execute `rankfuse hybrid`.
///
/// Successful queries are always written. Failures are listed in the JSON
/// envelope and turn into a non-zero exit unless `--allow-partial` is set.
///
/// # Errors
///
/// Returns a coded [`CliError`] for unreadable inputs, an invalid config, or
/// failed queries.
pub fn run_hybrid(
    args: &HybridArgs,
    config_path: Option<&Path>,
    output: OutputMode,
    working_dir: &Path,
) -> anyhow::Result<()> {
    let (config, _) = load_config(config_path, working_dir)?;
    let fusion = args.fusion.apply(config.fusion);
    let k0 = args.k0.unwrap_or(config.hybrid.k0);
    let hits = args.hits.unwrap_or(fusion.top_k);
    let threads = args.threads.unwrap_or(config.hybrid.threads);
    let format = args.out.format.unwrap_or(config.output.format);
    let tag = args.out.run_tag.as_deref().unwrap_or(&config.output.run_tag);

    let topics = read_topics(&args.topics)?;
    let sparse = read_run(&args.sparse)?;
    let dense = read_run(&args.dense)?;

    let orchestrator = HybridSearchOrchestrator::new(
        RunRetriever::new("sparse", &sparse, &topics),
        RunRetriever::new("dense", &dense, &topics),
    );
    let (ids, queries): (Vec<String>, Vec<String>) = topics.into_iter().unzip();

    info!(queries = queries.len(), threads, k0, hits, method = %fusion.method, "starting hybrid batch");
    let batch = orchestrator
        .batch_search(&queries, &ids, k0, hits, &fusion, threads)
        .map_err(|err| CliError::with_code(err.to_string(), err.code()))?;

    let failed: Vec<String> = batch.failures.keys().cloned().collect();
    let failures: BTreeMap<&str, CliError> = batch
        .failures
        .iter()
        .map(|(id, err)| (id.as_str(), CliError::with_code(err.to_string(), err.code())))
        .collect();

    if output.is_json() {
        if let Some(path) = &args.out.output {
            write_run_output(&batch.results, Some(path), format, tag)?;
        }
        let envelope = HybridOutput {
            method: fusion.method.as_str(),
            queries: ids.len(),
            succeeded: batch.results.len(),
            failures,
            output: args.out.output.as_ref().map(|p| p.display().to_string()),
            run: &batch.results,
        };
        render(output, &envelope, |_, _| Ok(()))?;
    } else {
        write_run_output(&batch.results, args.out.output.as_deref(), format, tag)?;
    }

    if failed.is_empty() || args.allow_partial {
        return Ok(());
    }
    Err(CliError::with_code(
        format!(
            "{} of {} queries failed: {}",
            failed.len(),
            ids.len(),
            failed.join(", ")
        ),
        ErrorCode::RetrievalFailed,
    )
    .into())
}
