//! # inpho-core
//!
//! Core types, traits, and abstractions for InPhO corpus mining.
//!
//! This crate provides the data model, error type, defaults, logging schema
//! and collaborator traits that the corpus, database and pipeline crates
//! share.

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod tokenizer;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{EventBus, EventEnvelope, PipelineEvent};
pub use logging::{init_tracing, LogConfig, LogFormat};
pub use models::*;
pub use tokenizer::{RuleBasedSentenceTokenizer, SentenceTokenizer};
pub use traits::*;
