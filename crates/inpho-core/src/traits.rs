//! Collaborator interfaces of the mining pipeline.
//!
//! The pipeline only talks to the entity store, the corpus and the miner
//! through these traits, so each can be backed by PostgreSQL, the
//! filesystem, an external process or an in-memory test double.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// ENTITY STORE
// =============================================================================

/// Source of the controlled vocabulary.
#[async_trait]
pub trait TermSupply: Send + Sync {
    /// Load every term of `kind` with its stored search patterns, ordered
    /// by term id.
    async fn load_terms(&self, kind: EntityKind) -> Result<Vec<TermRecord>>;
}

/// Source of the article list and document-level key terms.
#[async_trait]
pub trait DocumentSupply: Send + Sync {
    /// Article keys to scan, in a stable order.
    async fn list_documents(&self) -> Result<Vec<String>>;

    /// Terms tagged as key terms of each article.
    async fn key_terms(&self) -> Result<DocumentKeyTerms>;
}

/// Receiver of per-term entropy values.
#[async_trait]
pub trait EntropySink: Send + Sync {
    /// Store entropy values. Returns the number of terms updated.
    async fn update_entropy(&self, entropies: &[NodeEntropy]) -> Result<u64>;
}

/// Receiver of a mined edge set.
#[async_trait]
pub trait EdgeSink: Send + Sync {
    /// Replace the whole `partition` with `edges`.
    ///
    /// Implementations must be all-or-nothing: on error the previous edge
    /// set stays intact.
    async fn replace_edges(&self, partition: GraphPartition, edges: &[EdgeRecord]) -> Result<u64>;
}

// =============================================================================
// CORPUS
// =============================================================================

/// Extracts the plain text of an article.
///
/// Called from blocking scan workers, hence synchronous.
pub trait TextSupply: Send + Sync {
    /// Plain text of `article`, or `Error::NotFound` when it has none.
    fn extract_text(&self, article: &str) -> Result<String>;
}

// =============================================================================
// MINING
// =============================================================================

/// Association-rule miner over a basket file.
///
/// Input holds one basket per line (space-separated term ids). Output holds
/// one rule per line: `<ante> <cons> <confidence> <jweight>`.
#[async_trait]
pub trait AssociationMiner: Send + Sync {
    /// Mine `input` and write rules to `output`.
    async fn mine(&self, input: &Path, output: &Path) -> Result<()>;

    /// Miner identifier for logs.
    fn name(&self) -> &str;
}
