#![forbid(unsafe_code)]
//! rankfuse-core library.
//!
//! Ranked-list model, score normalization, the fusion combinator, fusion
//! configuration, and TREC/MS MARCO run-file I/O.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per module; `anyhow::Result` for
//!   config loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod fusion;
pub mod model;
pub mod normalize;
pub mod run;

pub use config::{FusionConfig, FusionMethod, RankfuseConfig};
pub use fusion::{FusionError, fuse, fuse_runs};
pub use model::{FusedResult, RankedList, ScoredDocument};
pub use normalize::{NormalizeMode, ScoreRange, normalize};
pub use run::{OutputFormat, Run, RunFileError};
