#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "rankfuse: rank fusion for hybrid sparse + dense retrieval",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of run-file text.
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of discovery.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    Fuse(cmd::fuse::FuseArgs),

    Hybrid(cmd::hybrid::HybridArgs),

    Config(cmd::config::ConfigArgs),

    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    rankfuse completions bash > ~/.local/share/bash-completion/completions/rankfuse\n\n    # Zsh\n    rankfuse completions zsh > ~/.zfunc/_rankfuse"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("RANKFUSE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "rankfuse=debug,info"
        } else {
            "rankfuse=info,warn"
        })
    });

    let format = env::var("RANKFUSE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let working_dir = env::current_dir()?;
    let output = cli.output_mode();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Fuse(ref args) => cmd::fuse::run_fuse(args, config, output, &working_dir),
        Commands::Hybrid(ref args) => cmd::hybrid::run_hybrid(args, config, output, &working_dir),
        Commands::Config(ref args) => cmd::config::run_config(args, config, output, &working_dir),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            debug!("command failed: {err:?}");
            match err.downcast_ref::<CliError>() {
                Some(cli_error) => render_error(output, cli_error)?,
                None => render_error(output, &CliError::new(format!("{err:#}")))?,
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
