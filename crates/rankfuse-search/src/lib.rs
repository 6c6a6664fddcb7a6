#![forbid(unsafe_code)]
//! rankfuse-search library.
//!
//! Hybrid search over one sparse and one dense retriever, fused with
//! `rankfuse_core::fuse`.
//!
//! # Conventions
//!
//! - **Errors**: Retrievers return `anyhow::Result`; the orchestrator wraps
//!   failures in [`SearchError`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod hybrid;
pub mod retriever;

pub use hybrid::{BatchResults, HybridSearchOrchestrator, SearchError};
pub use retriever::{Retriever, RunRetriever};
