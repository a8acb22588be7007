//! In-memory collaborators for pipeline tests.
//!
//! Every collaborator trait has a double here so the full pipeline runs
//! without PostgreSQL, a corpus tree or the apriori binary.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;

use inpho_core::{
    AssociationMiner, DocumentKeyTerms, DocumentSupply, EdgeRecord, EdgeSink, EntityKind,
    EntropySink, Error, GraphPartition, NodeEntropy, Result, TermRecord, TermSupply, TextSupply,
};

/// Fixed vocabulary, filtered by kind like the database supply.
#[derive(Debug, Clone, Default)]
pub struct MockTermSupply {
    records: Vec<TermRecord>,
}

impl MockTermSupply {
    pub fn new(records: Vec<TermRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl TermSupply for MockTermSupply {
    async fn load_terms(&self, kind: EntityKind) -> Result<Vec<TermRecord>> {
        let mut terms: Vec<TermRecord> = self
            .records
            .iter()
            .filter(|r| kind.includes(r.entity_type))
            .cloned()
            .collect();
        terms.sort_by_key(|r| r.id);
        Ok(terms)
    }
}

/// Fixed article list and key terms.
#[derive(Debug, Clone, Default)]
pub struct MockDocumentSupply {
    documents: Vec<String>,
    key_terms: DocumentKeyTerms,
}

impl MockDocumentSupply {
    pub fn new<S: Into<String>>(documents: impl IntoIterator<Item = S>) -> Self {
        Self {
            documents: documents.into_iter().map(Into::into).collect(),
            key_terms: DocumentKeyTerms::new(),
        }
    }

    pub fn with_key_term(mut self, document: &str, term_id: i32) -> Self {
        self.key_terms.insert(document, term_id);
        self
    }
}

#[async_trait]
impl DocumentSupply for MockDocumentSupply {
    async fn list_documents(&self) -> Result<Vec<String>> {
        Ok(self.documents.clone())
    }

    async fn key_terms(&self) -> Result<DocumentKeyTerms> {
        Ok(self.key_terms.clone())
    }
}

/// Article texts held in memory.
#[derive(Debug, Clone, Default)]
pub struct MockTextSupply {
    texts: HashMap<String, String>,
}

impl MockTextSupply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_article(mut self, article: &str, text: &str) -> Self {
        self.texts.insert(article.to_string(), text.to_string());
        self
    }
}

impl TextSupply for MockTextSupply {
    fn extract_text(&self, article: &str) -> Result<String> {
        self.texts
            .get(article)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("article {}", article)))
    }
}

/// Edge sink recording the last replacement per partition.
#[derive(Debug, Default)]
pub struct MockEdgeSink {
    partitions: Mutex<HashMap<GraphPartition, Vec<EdgeRecord>>>,
    fail: bool,
}

impl MockEdgeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every replacement, keeping its previous state.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Seed a partition, as if a previous run had published it.
    pub async fn seed(&self, partition: GraphPartition, edges: Vec<EdgeRecord>) {
        self.partitions.lock().await.insert(partition, edges);
    }

    pub async fn edges(&self, partition: GraphPartition) -> Option<Vec<EdgeRecord>> {
        self.partitions.lock().await.get(&partition).cloned()
    }
}

#[async_trait]
impl EdgeSink for MockEdgeSink {
    async fn replace_edges(&self, partition: GraphPartition, edges: &[EdgeRecord]) -> Result<u64> {
        if self.fail {
            return Err(Error::Publish(format!("{}: sink unavailable", partition)));
        }
        for edge in edges {
            edge.final_weight()?;
        }
        self.partitions
            .lock()
            .await
            .insert(partition, edges.to_vec());
        Ok(edges.len() as u64)
    }
}

/// Entropy sink recording every stored value.
#[derive(Debug, Default)]
pub struct MockEntropySink {
    stored: Mutex<Vec<NodeEntropy>>,
    fail: bool,
}

impl MockEntropySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn stored(&self) -> Vec<NodeEntropy> {
        self.stored.lock().await.clone()
    }
}

#[async_trait]
impl EntropySink for MockEntropySink {
    async fn update_entropy(&self, entropies: &[NodeEntropy]) -> Result<u64> {
        if self.fail {
            return Err(Error::Internal("entropy store unavailable".to_string()));
        }
        self.stored.lock().await.extend_from_slice(entropies);
        Ok(entropies.len() as u64)
    }
}

/// Miner that writes canned output, or fails.
#[derive(Debug, Clone)]
pub struct MockMiner {
    output: Option<String>,
    silent: bool,
}

impl MockMiner {
    /// Writes `output` verbatim as the rules file.
    pub fn with_output(output: &str) -> Self {
        Self {
            output: Some(output.to_string()),
            silent: false,
        }
    }

    /// Fails like a miner exiting non-zero.
    pub fn failing() -> Self {
        Self {
            output: None,
            silent: false,
        }
    }

    /// Succeeds without writing a rules file.
    pub fn silent() -> Self {
        Self {
            output: None,
            silent: true,
        }
    }
}

#[async_trait]
impl AssociationMiner for MockMiner {
    async fn mine(&self, _input: &Path, output: &Path) -> Result<()> {
        match &self.output {
            Some(text) => {
                tokio::fs::write(output, text).await?;
                Ok(())
            }
            None if self.silent => Ok(()),
            None => Err(Error::Miner("mock miner exited with status 1".to_string())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
