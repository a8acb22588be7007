//! Data model shared by every mining phase.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::defaults::{
    ENTITY_TYPE_IDEA, ENTITY_TYPE_JOURNAL, ENTITY_TYPE_NODE, ENTITY_TYPE_THINKER,
};
use crate::error::{Error, Result};

/// Stable term identifier, the join key to the external entity store.
pub type TermId = i32;

/// Ordered `(antecedent, consequent)` pair.
pub type EdgeKey = (TermId, TermId);

// =============================================================================
// ENTITIES
// =============================================================================

/// Entity type stored alongside each term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Idea,
    /// Taxonomy node; structural, never mined.
    Node,
    Thinker,
    /// Bibliographic journal; never mined.
    Journal,
    /// Any other entity code.
    Other(i16),
}

impl EntityType {
    /// Decode a database type code.
    pub fn from_code(code: i16) -> Self {
        match code {
            ENTITY_TYPE_IDEA => Self::Idea,
            ENTITY_TYPE_NODE => Self::Node,
            ENTITY_TYPE_THINKER => Self::Thinker,
            ENTITY_TYPE_JOURNAL => Self::Journal,
            other => Self::Other(other),
        }
    }

    /// Database type code.
    pub fn code(&self) -> i16 {
        match self {
            Self::Idea => ENTITY_TYPE_IDEA,
            Self::Node => ENTITY_TYPE_NODE,
            Self::Thinker => ENTITY_TYPE_THINKER,
            Self::Journal => ENTITY_TYPE_JOURNAL,
            Self::Other(code) => *code,
        }
    }

    /// Whether terms of this type take part in association mining.
    pub fn is_mineable(&self) -> bool {
        !matches!(self, Self::Node | Self::Journal)
    }
}

/// Which vocabulary a mining run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Idea,
    Thinker,
    /// Every mineable entity (ideas and thinkers together).
    #[default]
    All,
}

impl EntityKind {
    /// Type code to restrict term loading to, if any.
    pub fn type_filter(&self) -> Option<i16> {
        match self {
            Self::Idea => Some(ENTITY_TYPE_IDEA),
            Self::Thinker => Some(ENTITY_TYPE_THINKER),
            Self::All => None,
        }
    }

    /// Edge partition the run replaces.
    pub fn partition(&self) -> GraphPartition {
        match self {
            Self::Idea => GraphPartition::IdeaIdea,
            Self::Thinker => GraphPartition::ThinkerThinker,
            Self::All => GraphPartition::IdeaThinker,
        }
    }

    /// Whether a term of the given type belongs to this kind.
    pub fn includes(&self, entity_type: EntityType) -> bool {
        if !entity_type.is_mineable() {
            return false;
        }
        match self.type_filter() {
            Some(code) => entity_type.code() == code,
            None => true,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idea => write!(f, "idea"),
            Self::Thinker => write!(f, "thinker"),
            Self::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idea" | "ideas" => Ok(Self::Idea),
            "thinker" | "thinkers" => Ok(Self::Thinker),
            "all" => Ok(Self::All),
            _ => Err(format!("Invalid entity kind: {}", s)),
        }
    }
}

/// Entity-type partition of the edge store. A mining run replaces exactly
/// one partition, never individual edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphPartition {
    IdeaIdea,
    ThinkerThinker,
    IdeaThinker,
}

impl GraphPartition {
    /// Backing table name.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::IdeaIdea => "idea_graph_edges",
            Self::ThinkerThinker => "thinker_graph_edges",
            Self::IdeaThinker => "idea_thinker_graph_edges",
        }
    }

    /// The entity kind whose run replaces this partition.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::IdeaIdea => EntityKind::Idea,
            Self::ThinkerThinker => EntityKind::Thinker,
            Self::IdeaThinker => EntityKind::All,
        }
    }
}

impl std::fmt::Display for GraphPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

// =============================================================================
// TERMS AND DOCUMENTS
// =============================================================================

/// A term as supplied by the entity store, before pattern compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub id: TermId,
    pub label: String,
    pub entity_type: EntityType,
    /// Stored search patterns. The label is always an implicit pattern and
    /// is not repeated here.
    #[serde(default)]
    pub search_patterns: Vec<String>,
}

impl TermRecord {
    pub fn new(id: TermId, label: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            id,
            label: label.into(),
            entity_type,
            search_patterns: Vec::new(),
        }
    }

    /// Add a stored search pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.search_patterns.push(pattern.into());
        self
    }
}

/// One article handed to the scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Article key (`sep_dir`).
    pub id: String,
    pub raw_text: String,
    /// Document-level forced associations (e.g. subject tags).
    pub key_terms: BTreeSet<TermId>,
}

/// Key terms of every document, keyed by article.
///
/// A term is a key term of an article when its entity record points at
/// that article.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentKeyTerms {
    by_document: HashMap<String, BTreeSet<TermId>>,
}

impl DocumentKeyTerms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `term_id` as a key term of `document`.
    pub fn insert(&mut self, document: impl Into<String>, term_id: TermId) {
        self.by_document
            .entry(document.into())
            .or_default()
            .insert(term_id);
    }

    /// Key terms of a document (empty when it has none).
    pub fn get(&self, document: &str) -> impl Iterator<Item = TermId> + '_ {
        self.by_document
            .get(document)
            .into_iter()
            .flat_map(|terms| terms.iter().copied())
    }

    pub fn contains(&self, document: &str, term_id: TermId) -> bool {
        self.by_document
            .get(document)
            .is_some_and(|terms| terms.contains(&term_id))
    }

    pub fn is_empty(&self) -> bool {
        self.by_document.is_empty()
    }

    /// Number of documents with at least one key term.
    pub fn len(&self) -> usize {
        self.by_document.len()
    }
}

impl FromIterator<(String, TermId)> for DocumentKeyTerms {
    fn from_iter<I: IntoIterator<Item = (String, TermId)>>(iter: I) -> Self {
        let mut key_terms = Self::new();
        for (document, term_id) in iter {
            key_terms.insert(document, term_id);
        }
        key_terms
    }
}

// =============================================================================
// MINING OUTPUT
// =============================================================================

/// Association rule statistics reported by the miner for one ordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    /// P(cons | ante), in `[0, 1]`.
    pub confidence: f64,
    /// Support-like association strength (J-measure).
    pub jweight: f64,
}

/// Miner output keyed by `(ante, cons)`; ordered for reproducible output.
pub type RuleSet = BTreeMap<EdgeKey, RuleStats>;

/// One directed, weighted edge of the co-occurrence graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub ante_id: TermId,
    pub cons_id: TermId,
    pub confidence: f64,
    pub jweight: f64,
    /// Sentence baskets containing both terms.
    pub cooccurrences: u64,
    /// Documents tagged with `ante` that mention `cons`.
    pub occurs_in: u64,
    /// Entropy-scaled weight, filled once by edge weighting.
    pub weight: Option<f64>,
}

impl EdgeRecord {
    pub fn key(&self) -> EdgeKey {
        (self.ante_id, self.cons_id)
    }

    /// The final weight, or an error for an edge that was never weighted.
    pub fn final_weight(&self) -> Result<f64> {
        self.weight.ok_or_else(|| {
            Error::InvalidInput(format!(
                "Edge {} -> {} has not been weighted",
                self.ante_id, self.cons_id
            ))
        })
    }
}

/// Shannon entropy of one term's outgoing confidence distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeEntropy {
    pub term_id: TermId,
    pub entropy: f64,
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Phases of one mining run, in order. Phases never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Idle,
    Scanning,
    Filtering,
    Mining,
    Assembling,
    Weighting,
    Publishing,
    Done,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Filtering => "filtering",
            Self::Mining => "mining",
            Self::Assembling => "assembling",
            Self::Weighting => "weighting",
            Self::Publishing => "publishing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}
