//! `rankfuse config` — print the effective configuration.

use crate::cmd::load_config;
use crate::output::{OutputMode, render};
use clap::Args;
use rankfuse_core::RankfuseConfig;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
#[command(
    about = "Show the effective configuration",
    long_about = "Print the configuration commands would use, after discovery.\n\n\
                  Lookup order: --config, ./rankfuse.toml, then the user config directory \
                  (rankfuse/config.toml). Built-in defaults apply when no file is found.",
    after_help = "EXAMPLES:\n    # Show the config as TOML\n    rankfuse config\n\n\
                  # Show the config from a specific file as JSON\n    rankfuse --config exp.toml config --json"
)]
pub struct ConfigArgs {}

#[derive(Debug, Serialize)]
struct ConfigOutput {
    source: Option<String>,
    config: RankfuseConfig,
}

/// Execute `rankfuse config`.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or serialized.
pub fn run_config(
    _args: &ConfigArgs,
    config_path: Option<&Path>,
    output: OutputMode,
    working_dir: &Path,
) -> anyhow::Result<()> {
    let (config, source) = load_config(config_path, working_dir)?;
    let value = ConfigOutput {
        source: source.map(|p| p.display().to_string()),
        config,
    };

    render(output, &value, |v, w| {
        let body = toml::to_string_pretty(&v.config).map_err(io::Error::other)?;
        match &v.source {
            Some(source) => writeln!(w, "# source: {source}")?,
            None => writeln!(w, "# source: built-in defaults")?,
        }
        write!(w, "{body}")
    })
}
