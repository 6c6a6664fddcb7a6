//! Subcommand handlers and the flags they share.

pub mod completions;
pub mod config;
pub mod fuse;
pub mod hybrid;

use crate::output::CliError;
use clap::Args;
use rankfuse_core::config::discover_config;
use rankfuse_core::error::ErrorCode;
use rankfuse_core::run::{read_topics_file, read_trec_run_file, write_run};
use rankfuse_core::{FusionConfig, FusionMethod, OutputFormat, RankfuseConfig, Run, RunFileError};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fusion flags shared by `fuse` and `hybrid`. Unset flags keep the
/// configured value; switches take `--flag` or `--flag=false`.
#[derive(Args, Debug, Default)]
pub struct FusionArgs {
    /// Fusion method: rrf, linear-interpolation, average, normalize.
    #[arg(short, long)]
    pub method: Option<FusionMethod>,

    /// Interpolation weight.
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Apply alpha to the dense score instead of the sparse one.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub weight_on_dense: Option<bool>,

    /// Min-max-center each list before interpolation or averaging.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub normalize: Option<bool>,

    /// RRF smoothing constant.
    #[arg(long, value_name = "K")]
    pub rrf_k: Option<usize>,

    /// Ranks of each input list considered.
    #[arg(long)]
    pub depth: Option<usize>,

    /// Average over every input, counting absence as 0.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub missing_as_zero: Option<bool>,
}

impl FusionArgs {
    /// Overlay these flags on `config`.
    pub fn apply(&self, mut config: FusionConfig) -> FusionConfig {
        if let Some(method) = self.method {
            config.method = method;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(rrf_k) = self.rrf_k {
            config.rrf_k = rrf_k;
        }
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if let Some(weight_on_dense) = self.weight_on_dense {
            config.weight_on_dense = weight_on_dense;
        }
        if let Some(normalize) = self.normalize {
            config.normalize = normalize;
        }
        if let Some(missing_as_zero) = self.missing_as_zero {
            config.missing_as_zero = missing_as_zero;
        }
        config
    }
}

/// Run-file output flags.
#[derive(Args, Debug, Default)]
pub struct RunOutputArgs {
    /// Run-file layout: trec or msmarco.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Tag written in the last TREC column.
    #[arg(long)]
    pub run_tag: Option<String>,

    /// Write the run here instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Load config from `--config` or the discovery chain, with the file it
/// came from.
pub fn load_config(
    explicit: Option<&Path>,
    working_dir: &Path,
) -> anyhow::Result<(RankfuseConfig, Option<PathBuf>)> {
    if let Some(path) = explicit.filter(|p| !p.exists()) {
        return Err(CliError::with_code(
            format!("config file {} not found", path.display()),
            ErrorCode::InputNotFound,
        )
        .into());
    }

    match discover_config(explicit, working_dir) {
        Ok((config, source)) => {
            if let Some(source) = &source {
                debug!(path = %source.display(), "using config file");
            }
            Ok((config, source))
        }
        Err(err) => Err(CliError::with_code(format!("{err:#}"), ErrorCode::ConfigParseError).into()),
    }
}

/// Read a TREC run, mapping failures to coded CLI errors.
pub fn read_run(path: &Path) -> anyhow::Result<Run> {
    read_trec_run_file(path).map_err(|err| file_error(path, &err, ErrorCode::RunFileMalformed))
}

/// Read a topics file, mapping failures to coded CLI errors.
pub fn read_topics(path: &Path) -> anyhow::Result<Vec<(String, String)>> {
    read_topics_file(path).map_err(|err| file_error(path, &err, ErrorCode::TopicsMalformed))
}

fn file_error(path: &Path, err: &RunFileError, malformed: ErrorCode) -> anyhow::Error {
    let code = match err {
        RunFileError::Malformed { .. } => malformed,
        RunFileError::Io(_) => err.code(),
    };
    CliError::with_code(format!("{}: {err}", path.display()), code).into()
}

/// Write `run` to `path`, or stdout when absent.
pub fn write_run_output(
    run: &Run,
    path: Option<&Path>,
    format: OutputFormat,
    tag: &str,
) -> anyhow::Result<()> {
    let mut writer = run_writer(path)?;
    write_run(&mut writer, run, format, tag)?;
    writer.flush()?;
    Ok(())
}

fn run_writer(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|err| {
                CliError::with_code(
                    format!("cannot create {}: {err}", path.display()),
                    ErrorCode::InternalUnexpected,
                )
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn unset_flags_keep_config() {
        let config = FusionConfig {
            alpha: 0.3,
            normalize: true,
            ..FusionConfig::default()
        };
        let merged = FusionArgs::default().apply(config.clone());
        assert_eq!(merged, config);
    }

    #[test]
    fn flags_override_config() {
        let args = FusionArgs {
            method: Some(FusionMethod::Average),
            alpha: Some(0.5),
            rrf_k: Some(10),
            depth: Some(20),
            missing_as_zero: Some(true),
            ..FusionArgs::default()
        };
        let merged = args.apply(FusionConfig::default());
        assert_eq!(merged.method, FusionMethod::Average);
        assert!((merged.alpha - 0.5).abs() < f64::EPSILON);
        assert_eq!(merged.rrf_k, 10);
        assert_eq!(merged.depth, 20);
        assert!(merged.missing_as_zero);
        assert!(!merged.normalize);
    }

    #[test]
    fn explicit_false_switch_clears_config() {
        let config = FusionConfig {
            weight_on_dense: true,
            normalize: true,
            missing_as_zero: true,
            ..FusionConfig::default()
        };
        let args = FusionArgs {
            weight_on_dense: Some(false),
            normalize: Some(false),
            missing_as_zero: Some(false),
            ..FusionArgs::default()
        };
        let merged = args.apply(config);
        assert!(!merged.weight_on_dense);
        assert!(!merged.normalize);
        assert!(!merged.missing_as_zero);
    }

    #[test]
    fn missing_explicit_config_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml")), dir.path()).unwrap_err();
        let cli = err.downcast_ref::<CliError>().unwrap();
        assert_eq!(cli.error_code.as_deref(), Some(ErrorCode::InputNotFound.code()));
    }

    #[test]
    fn bad_config_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rankfuse.toml");
        fs::write(&path, "[fusion]\nrrf_k = 0\n").unwrap();
        let err = load_config(None, dir.path()).unwrap_err();
        let cli = err.downcast_ref::<CliError>().unwrap();
        assert_eq!(cli.error_code.as_deref(), Some("E1002"));
        assert!(cli.message.contains("rrf_k"));
    }

    #[test]
    fn malformed_topics_use_topics_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("topics.tsv");
        fs::write(&path, "no tab here\n").unwrap();
        let err = read_topics(&path).unwrap_err();
        let cli = err.downcast_ref::<CliError>().unwrap();
        assert_eq!(cli.error_code.as_deref(), Some("E2002"));
        assert!(cli.message.contains("line 1"));
    }

    #[test]
    fn writes_run_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.trec");
        let mut run = Run::new();
        run.insert(
            "7".into(),
            rankfuse_core::RankedList::new([rankfuse_core::ScoredDocument::new("d1", 0.5)]),
        );
        write_run_output(&run, Some(&path), OutputFormat::Trec, "tag").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "7 Q0 d1 1 0.500000 tag\n");
    }

    #[test]
    fn missing_run_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_run(&dir.path().join("missing.trec")).unwrap_err();
        let cli = err.downcast_ref::<CliError>().unwrap();
        assert_eq!(cli.error_code.as_deref(), Some("E2003"));
    }
}
