//! # inpho-jobs
//!
//! Orchestration of the InPhO mining pipeline.
//!
//! This crate provides:
//! - Environment configuration with fail-fast validation
//! - A fixed-size scan worker pool over the article corpus
//! - Miner adapters for the external apriori binary and the in-process
//!   pairwise miner
//! - The phase-by-phase mining pipeline with progress events
//! - Filesystem text supply and sql-file edge sink
//!
//! ## Example
//!
//! ```rust,ignore
//! use inpho_jobs::{MiningPipeline, PipelineConfig, RunOptions};
//!
//! let config = PipelineConfig::from_env()?;
//! let pipeline = MiningPipeline::new(config, ctx);
//! let report = pipeline.run(&RunOptions::default()).await?;
//! ```

pub mod config;
pub mod files;
pub mod miner;
pub mod pipeline;
pub mod scan;
pub mod sink;
pub mod text;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{MinerKind, PipelineConfig};
pub use miner::{miner_from_config, AprioriMiner, BuiltinMiner};
pub use pipeline::{MiningPipeline, MiningReport, PipelineContext, RunOptions, ScanSummary};
pub use scan::{ScanOutcome, ScanPool};
pub use sink::{read_edge_file, FileEdgeSink};
pub use text::FilesystemTextSupply;
