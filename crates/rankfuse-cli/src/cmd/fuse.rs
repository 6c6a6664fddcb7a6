//! `rankfuse fuse` — fuse precomputed TREC runs query by query.

use crate::cmd::{FusionArgs, RunOutputArgs, load_config, read_run, write_run_output};
use crate::output::{CliError, OutputMode, render};
use clap::Args;
use rankfuse_core::{Run, fuse_runs};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
#[command(
    about = "Fuse TREC run files",
    long_about = "Fuse two or more TREC run files query by query.\n\n\
                  Every query id in any input is fused; a run missing a query contributes an \
                  empty list for it. Linear interpolation takes exactly two runs: sparse first, \
                  then dense.",
    after_help = "EXAMPLES:\n    # Reciprocal rank fusion of two runs\n    rankfuse fuse bm25.trec dense.trec\n\n\
                  # Linear interpolation with normalization\n    rankfuse fuse bm25.trec dense.trec -m interpolation --alpha 0.5 --normalize\n\n\
                  # Write an MS MARCO run file\n    rankfuse fuse a.trec b.trec c.trec --format msmarco -o fused.tsv"
)]
pub struct FuseArgs {
    /// Input run files.
    #[arg(required = true, num_args = 1.., value_name = "RUN")]
    pub runs: Vec<PathBuf>,

    #[command(flatten)]
    pub fusion: FusionArgs,

    /// Fused hits kept per query.
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    #[command(flatten)]
    pub out: RunOutputArgs,
}

/// JSON envelope for fuse output.
#[derive(Debug, Serialize)]
struct FuseOutput<'a> {
    method: &'static str,
    inputs: usize,
    queries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    run: &'a Run,
}

/// Execute `rankfuse fuse`.
///
/// # Errors
///
/// Returns a coded [`CliError`] if the config or a run cannot be loaded, the
/// fusion config is invalid, or the output cannot be written.
pub fn run_fuse(
    args: &FuseArgs,
    config_path: Option<&Path>,
    output: OutputMode,
    working_dir: &Path,
) -> anyhow::Result<()> {
    let (config, _) = load_config(config_path, working_dir)?;
    let mut fusion = args.fusion.apply(config.fusion);
    if let Some(top_k) = args.top_k {
        fusion.top_k = top_k;
    }
    let format = args.out.format.unwrap_or(config.output.format);
    let tag = args.out.run_tag.as_deref().unwrap_or(&config.output.run_tag);

    let runs = args
        .runs
        .iter()
        .map(|path| read_run(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let fused = fuse_runs(&runs, &fusion)
        .map_err(|err| CliError::with_code(err.to_string(), err.code()))?;
    info!(
        method = %fusion.method,
        inputs = runs.len(),
        queries = fused.len(),
        "fused runs"
    );

    if output.is_json() {
        if let Some(path) = &args.out.output {
            write_run_output(&fused, Some(path), format, tag)?;
        }
        let envelope = FuseOutput {
            method: fusion.method.as_str(),
            inputs: runs.len(),
            queries: fused.len(),
            output: args.out.output.as_ref().map(|p| p.display().to_string()),
            run: &fused,
        };
        render(output, &envelope, |_, _| Ok(()))
    } else {
        write_run_output(&fused, args.out.output.as_deref(), format, tag)
    }
}
