//! Fusion and hybrid-search configuration.
//!
//! Loaded from TOML with per-field defaults:
//!
//! ```toml
//! [fusion]
//! method = "linear-interpolation"
//! alpha = 0.1
//! weight_on_dense = false
//! normalize = true
//! rrf_k = 60
//! depth = 1000
//! top_k = 1000
//!
//! [hybrid]
//! k0 = 1000
//! threads = 4
//!
//! [output]
//! run_tag = "rankfuse"
//! format = "trec"
//! ```
//!
//! Discovery order: explicit path, `./rankfuse.toml`, then
//! `<config dir>/rankfuse/config.toml`. A missing file yields defaults; a
//! present but malformed file is an error.

use crate::fusion::FusionError;
use crate::run::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "rankfuse.toml";

/// How input lists are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FusionMethod {
    /// Weighted sum of sparse and dense scores (exactly two lists).
    #[serde(alias = "interpolation", alias = "linear")]
    LinearInterpolation,
    /// Sum of `1 / (k + rank)` across lists.
    #[default]
    #[serde(alias = "rrf")]
    ReciprocalRankFusion,
    /// Mean of the scores a document received.
    #[serde(alias = "avg")]
    Average,
    /// Min-max-centered each list, then sum.
    Normalize,
}

impl FusionMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LinearInterpolation => "linear-interpolation",
            Self::ReciprocalRankFusion => "reciprocal-rank-fusion",
            Self::Average => "average",
            Self::Normalize => "normalize",
        }
    }
}

impl fmt::Display for FusionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FusionMethod {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear-interpolation" | "interpolation" | "linear" => Ok(Self::LinearInterpolation),
            "reciprocal-rank-fusion" | "rrf" => Ok(Self::ReciprocalRankFusion),
            "average" | "avg" => Ok(Self::Average),
            "normalize" => Ok(Self::Normalize),
            other => Err(FusionError::InvalidConfig(format!(
                "unknown fusion method `{other}`"
            ))),
        }
    }
}

/// Parameters for one fusion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default)]
    pub method: FusionMethod,

    /// Interpolation weight; applied to the sparse score unless
    /// `weight_on_dense` is set.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    #[serde(default)]
    pub weight_on_dense: bool,

    /// Min-max-center each list before linear interpolation or averaging.
    #[serde(default)]
    pub normalize: bool,

    /// RRF smoothing constant.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,

    /// How many ranks of each input list are considered.
    #[serde(default = "default_depth")]
    pub depth: usize,

    /// Length of the fused output.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Average over all input lists, counting absence as 0.
    #[serde(default)]
    pub missing_as_zero: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            method: FusionMethod::default(),
            alpha: default_alpha(),
            weight_on_dense: false,
            normalize: false,
            rrf_k: default_rrf_k(),
            depth: default_depth(),
            top_k: default_top_k(),
            missing_as_zero: false,
        }
    }
}

impl FusionConfig {
    /// Default config for `method`.
    #[must_use]
    pub fn with_method(method: FusionMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub const fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Reject configurations no fusion method can run with.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidConfig`] for a zero `rrf_k`, `depth` or
    /// `top_k`, or a non-finite `alpha`.
    pub fn validate(&self) -> Result<(), FusionError> {
        if self.rrf_k == 0 {
            return Err(FusionError::InvalidConfig("rrf_k must be positive".into()));
        }
        if self.depth == 0 {
            return Err(FusionError::InvalidConfig("depth must be positive".into()));
        }
        if self.top_k == 0 {
            return Err(FusionError::InvalidConfig("top_k must be positive".into()));
        }
        if !self.alpha.is_finite() {
            return Err(FusionError::InvalidConfig(format!(
                "alpha must be finite, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Defaults for hybrid sparse + dense search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridConfig {
    /// Hits requested from each retriever before fusion.
    #[serde(default = "default_k0")]
    pub k0: usize,

    /// Worker threads for batch search.
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            k0: default_k0(),
            threads: default_threads(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_run_tag")]
    pub run_tag: String,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_tag: default_run_tag(),
            format: OutputFormat::default(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankfuseConfig {
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub hybrid: HybridConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

const fn default_alpha() -> f64 {
    0.1
}

const fn default_rrf_k() -> usize {
    60
}

const fn default_depth() -> usize {
    1000
}

const fn default_top_k() -> usize {
    1000
}

const fn default_k0() -> usize {
    1000
}

const fn default_threads() -> usize {
    1
}

fn default_run_tag() -> String {
    "rankfuse".to_string()
}

/// Parse and validate a config document.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or the fusion section fails
/// [`FusionConfig::validate`].
pub fn parse_config(content: &str) -> Result<RankfuseConfig> {
    let config: RankfuseConfig = toml::from_str(content).context("invalid rankfuse config")?;
    config
        .fusion
        .validate()
        .context("invalid [fusion] section")?;
    if config.hybrid.threads == 0 {
        anyhow::bail!("invalid [hybrid] section: threads must be positive");
    }
    Ok(config)
}

/// Load the config at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<RankfuseConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_config(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Candidate config locations, highest priority first.
#[must_use]
pub fn config_candidates(explicit: Option<&Path>, working_dir: &Path) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }

    let mut candidates = vec![working_dir.join(LOCAL_CONFIG_FILE)];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("rankfuse/config.toml"));
    }
    candidates
}

/// Resolve and load the effective configuration.
///
/// An explicit path must exist. Implicit locations are skipped when absent,
/// falling back to defaults. Returns the config and the file it came from.
///
/// # Errors
///
/// Returns an error if the explicit file is missing or any found file fails
/// to parse.
pub fn discover_config(
    explicit: Option<&Path>,
    working_dir: &Path,
) -> Result<(RankfuseConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((load_config(path)?, Some(path.to_path_buf())));
    }

    for candidate in config_candidates(None, working_dir) {
        if candidate.exists() {
            let config = load_config(&candidate)?;
            tracing::debug!(path = %candidate.display(), "loaded config");
            return Ok((config, Some(candidate)));
        }
    }

    Ok((RankfuseConfig::default(), None))
}
