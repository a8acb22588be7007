//! Document- and sentence-level occurrence scanning.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;

use inpho_core::{SentenceTokenizer, TermId};

use crate::terms::TermRegistry;

/// Optional per-sentence post-processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Drop a term whose label is a substring of another matched term's
    /// label in the same sentence.
    pub remove_overlap: bool,
    /// Collapse repeated terms and sort the basket by term id.
    pub remove_duplicates: bool,
}

/// Terms occurring anywhere in `text`, in registry order.
///
/// A term is included when any of its patterns matches; its remaining
/// patterns are not tried.
pub fn document_occurrences(registry: &mut TermRegistry, text: &str) -> Vec<TermId> {
    let ids: Vec<TermId> = registry.ids().collect();
    ids.into_iter()
        .filter(|&id| registry.probe(id, text))
        .collect()
}

/// Terms co-occurring in each sentence of `text`.
///
/// Only the terms in `present` (normally the document occurrences) are
/// searched. Sentences without any term are left out.
pub fn sentence_occurrences(
    registry: &mut TermRegistry,
    text: &str,
    present: &[TermId],
    tokenizer: &dyn SentenceTokenizer,
    options: ScanOptions,
) -> Vec<Vec<TermId>> {
    let sentences = tokenizer.sentences(text);
    trace!(
        subsystem = "corpus",
        component = "scanner",
        sentence_count = sentences.len(),
        term_count = present.len(),
        "Scanning sentences"
    );

    let mut occurrences = Vec::new();
    for sentence in sentences {
        let mut found: Vec<TermId> = present
            .iter()
            .copied()
            .filter(|&id| registry.probe(id, sentence))
            .collect();

        if options.remove_duplicates {
            found.sort_unstable();
            found.dedup();
        }

        if options.remove_overlap {
            remove_overlap(registry, &mut found);
        }

        if !found.is_empty() {
            occurrences.push(found);
        }
    }
    occurrences
}

/// Resolve label overlap within one sentence.
///
/// Any term whose label occurs inside the label of another, distinct
/// matched term is removed. Containment is plain, case-sensitive substring
/// search, so two distinct terms with the same label remove each other.
pub fn remove_overlap(registry: &TermRegistry, found: &mut Vec<TermId>) {
    let labelled: Vec<(TermId, &str)> = found
        .iter()
        .filter_map(|&id| registry.get(id).map(|t| (id, t.label.as_str())))
        .collect();

    let mut to_remove = HashSet::new();
    for &(inside_id, inside_label) in &labelled {
        for &(term_id, term_label) in &labelled {
            if term_id != inside_id && inside_label.contains(term_label) {
                to_remove.insert(term_id);
            }
        }
    }

    if !to_remove.is_empty() {
        found.retain(|id| !to_remove.contains(id));
    }
}

/// Occurrences of one article.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleOccurrences {
    pub article: String,
    /// Terms found anywhere in the article, in registry order.
    pub document_terms: Vec<TermId>,
    /// One basket per sentence with at least one term.
    pub sentences: Vec<Vec<TermId>>,
}

impl ArticleOccurrences {
    /// An article that contributed nothing (e.g. its text was missing).
    pub fn empty(article: impl Into<String>) -> Self {
        Self {
            article: article.into(),
            ..Self::default()
        }
    }
}

/// Scans articles with a fixed tokenizer and options.
#[derive(Clone)]
pub struct OccurrenceScanner {
    tokenizer: Arc<dyn SentenceTokenizer>,
    options: ScanOptions,
}

impl OccurrenceScanner {
    pub fn new(tokenizer: Arc<dyn SentenceTokenizer>, options: ScanOptions) -> Self {
        Self { tokenizer, options }
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    /// Document terms first, then sentence baskets restricted to them.
    pub fn scan(&self, registry: &mut TermRegistry, article: &str, text: &str) -> ArticleOccurrences {
        let document_terms = document_occurrences(registry, text);
        let sentences = if document_terms.is_empty() {
            Vec::new()
        } else {
            sentence_occurrences(
                registry,
                text,
                &document_terms,
                self.tokenizer.as_ref(),
                self.options,
            )
        };

        trace!(
            subsystem = "corpus",
            component = "scanner",
            article,
            term_count = document_terms.len(),
            basket_count = sentences.len(),
            "Article scanned"
        );

        ArticleOccurrences {
            article: article.to_string(),
            document_terms,
            sentences,
        }
    }
}

impl std::fmt::Debug for OccurrenceScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OccurrenceScanner")
            .field("tokenizer", &self.tokenizer.name())
            .field("options", &self.options)
            .finish()
    }
}
