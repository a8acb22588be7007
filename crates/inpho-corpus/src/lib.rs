//! # inpho-corpus
//!
//! Synchronous mining algorithms over an article corpus:
//!
//! - Term registry with lazily compiled, fail-soft search patterns
//! - Document and sentence occurrence scanning with overlap resolution
//! - Basket file writing, filtering and parsing
//! - Association rule parsing and an in-process pairwise rule miner
//! - Graph assembly from rules, basket counts and document occurrences
//! - Node entropy and entropy-scaled edge weights
//!
//! Nothing here performs async I/O; the pipeline in `inpho-jobs` drives
//! these functions from its worker pool.

pub mod assembly;
pub mod baskets;
pub mod entropy;
pub mod rules;
pub mod scanner;
pub mod terms;

pub use assembly::{build_edges, CooccurrenceCounts, DocumentOccurrenceIndex};
pub use baskets::{
    filter_baskets, format_basket, parse_article_line, parse_item_baskets, parse_summaries,
    read_and_filter, read_item_baskets, read_summaries, write_baskets, write_document_summary,
};
pub use entropy::{edge_weight, node_entropy, to_node_entropies};
pub use rules::{j_measure, parse_rules, read_rules, MinedRule, PairwiseMiner};
pub use scanner::{
    document_occurrences, remove_overlap, sentence_occurrences, ArticleOccurrences,
    OccurrenceScanner, ScanOptions,
};
pub use terms::{expand_pattern, PatternAttempt, PatternFailure, SearchPattern, Term, TermRegistry};
