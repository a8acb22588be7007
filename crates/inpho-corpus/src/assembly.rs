//! Graph assembly: joins miner rules with basket and document counts.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::debug;

use inpho_core::{DocumentKeyTerms, EdgeKey, EdgeRecord, RuleSet, TermId};

/// Number of baskets containing each unordered pair of terms.
#[derive(Debug, Clone, Default)]
pub struct CooccurrenceCounts {
    pairs: HashMap<EdgeKey, u64>,
}

impl CooccurrenceCounts {
    /// Count pairs over sentence baskets. Repeated items within a basket
    /// count once and a term never pairs with itself.
    pub fn from_baskets(baskets: &[Vec<TermId>]) -> Self {
        let mut pairs = HashMap::new();
        for basket in baskets {
            let items: Vec<TermId> = basket
                .iter()
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for (i, &a) in items.iter().enumerate() {
                for &b in &items[i + 1..] {
                    *pairs.entry((a, b)).or_default() += 1;
                }
            }
        }
        Self { pairs }
    }

    /// Baskets containing both `a` and `b`, in either order.
    pub fn get(&self, a: TermId, b: TermId) -> u64 {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.pairs.get(&key).copied().unwrap_or(0)
    }

    /// Number of distinct pairs seen.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Which documents mention which terms, from the scan summaries.
///
/// With key terms, `occurs_in(ante, cons)` counts documents that have
/// `ante` as a key term and mention `cons`. Without them it counts
/// documents mentioning both terms.
#[derive(Debug, Clone, Default)]
pub struct DocumentOccurrenceIndex {
    mentions: HashMap<TermId, HashSet<usize>>,
    keyed: Option<HashMap<TermId, HashSet<usize>>>,
}

impl DocumentOccurrenceIndex {
    pub fn from_summaries(
        summaries: &[(String, Vec<TermId>)],
        key_terms: Option<&DocumentKeyTerms>,
    ) -> Self {
        // Repeated summaries of one article count as one document.
        let mut documents: HashMap<&str, usize> = HashMap::new();
        for (article, _) in summaries {
            let next = documents.len();
            documents.entry(article.as_str()).or_insert(next);
        }

        let mut mentions: HashMap<TermId, HashSet<usize>> = HashMap::new();
        for (article, terms) in summaries {
            let doc = documents[article.as_str()];
            for &term in terms {
                mentions.entry(term).or_default().insert(doc);
            }
        }

        let keyed = key_terms.filter(|k| !k.is_empty()).map(|key_terms| {
            let mut keyed: HashMap<TermId, HashSet<usize>> = HashMap::new();
            for (&article, &doc) in &documents {
                for key in key_terms.get(article) {
                    keyed.entry(key).or_default().insert(doc);
                }
            }
            keyed
        });

        Self { mentions, keyed }
    }

    /// Number of summarized documents mentioning `term`.
    pub fn document_frequency(&self, term: TermId) -> usize {
        self.mentions.get(&term).map_or(0, HashSet::len)
    }

    pub fn occurs_in(&self, ante: TermId, cons: TermId) -> u64 {
        let anchor = match &self.keyed {
            Some(keyed) => keyed.get(&ante),
            None => self.mentions.get(&ante),
        };
        let (Some(anchor), Some(mentions)) = (anchor, self.mentions.get(&cons)) else {
            return 0;
        };
        let (small, large) = if anchor.len() <= mentions.len() {
            (anchor, mentions)
        } else {
            (mentions, anchor)
        };
        small.iter().filter(|doc| large.contains(*doc)).count() as u64
    }
}

/// One edge per miner rule, carrying both co-occurrence counts.
///
/// Rule direction is kept as the miner reported it. Weights are left
/// unset for edge weighting.
pub fn build_edges(
    counts: &CooccurrenceCounts,
    rules: &RuleSet,
    index: &DocumentOccurrenceIndex,
) -> BTreeMap<EdgeKey, EdgeRecord> {
    let edges: BTreeMap<EdgeKey, EdgeRecord> = rules
        .iter()
        .map(|(&(ante, cons), stats)| {
            let edge = EdgeRecord {
                ante_id: ante,
                cons_id: cons,
                confidence: stats.confidence,
                jweight: stats.jweight,
                cooccurrences: counts.get(ante, cons),
                occurs_in: index.occurs_in(ante, cons),
                weight: None,
            };
            ((ante, cons), edge)
        })
        .collect();

    debug!(
        subsystem = "corpus",
        component = "assembler",
        op = "assemble",
        edge_count = edges.len(),
        pair_count = counts.len(),
        "Edges assembled"
    );
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use inpho_core::RuleStats;

    fn summaries(entries: Vec<(&str, Vec<TermId>)>) -> Vec<(String, Vec<TermId>)> {
        entries
            .into_iter()
            .map(|(a, t)| (a.to_string(), t))
            .collect()
    }

    #[test]
    fn test_cooccurrence_counts_are_symmetric() {
        let counts = CooccurrenceCounts::from_baskets(&[vec![1, 2, 3], vec![3, 2], vec![2, 2]]);
        assert_eq!(counts.get(2, 3), 2);
        assert_eq!(counts.get(3, 2), 2);
        assert_eq!(counts.get(1, 3), 1);
        assert_eq!(counts.get(2, 2), 0);
        assert_eq!(counts.get(4, 1), 0);
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_occurs_in_without_key_terms() {
        let index = DocumentOccurrenceIndex::from_summaries(
            &summaries(vec![("a", vec![1, 2, 3]), ("b", vec![2, 3]), ("c", vec![1])]),
            None,
        );
        assert_eq!(index.occurs_in(2, 3), 2);
        assert_eq!(index.occurs_in(1, 2), 1);
        assert_eq!(index.occurs_in(1, 9), 0);
        assert_eq!(index.document_frequency(1), 2);
    }

    #[test]
    fn test_occurs_in_with_key_terms_is_directional() {
        let key_terms: DocumentKeyTerms = vec![("a".to_string(), 1), ("b".to_string(), 1)]
            .into_iter()
            .collect();
        let index = DocumentOccurrenceIndex::from_summaries(
            &summaries(vec![("a", vec![2, 3]), ("b", vec![3]), ("c", vec![1, 3])]),
            Some(&key_terms),
        );
        // 1 is a key term of a and b; 3 is mentioned in both.
        assert_eq!(index.occurs_in(1, 3), 2);
        assert_eq!(index.occurs_in(1, 2), 1);
        // 3 is nobody's key term.
        assert_eq!(index.occurs_in(3, 1), 0);
    }

    #[test]
    fn test_repeated_article_summary_counts_once() {
        let key_terms: DocumentKeyTerms = vec![("a".to_string(), 1)].into_iter().collect();
        let entries = vec![("a", vec![1, 2]), ("b", vec![1, 2]), ("a", vec![2, 3])];

        let index = DocumentOccurrenceIndex::from_summaries(&summaries(entries.clone()), None);
        assert_eq!(index.occurs_in(1, 2), 2);
        assert_eq!(index.occurs_in(2, 3), 1);
        assert_eq!(index.document_frequency(2), 2);

        let keyed = DocumentOccurrenceIndex::from_summaries(&summaries(entries), Some(&key_terms));
        assert_eq!(keyed.occurs_in(1, 2), 1);
        assert_eq!(keyed.occurs_in(1, 3), 1);
    }

    #[test]
    fn test_empty_key_terms_fall_back_to_mentions() {
        let key_terms = DocumentKeyTerms::new();
        let index = DocumentOccurrenceIndex::from_summaries(
            &summaries(vec![("a", vec![1, 2])]),
            Some(&key_terms),
        );
        assert_eq!(index.occurs_in(1, 2), 1);
    }

    #[test]
    fn test_build_edges_joins_counts() {
        let baskets = vec![vec![1, 2, 3], vec![2, 3]];
        let counts = CooccurrenceCounts::from_baskets(&baskets);
        let index = DocumentOccurrenceIndex::from_summaries(
            &summaries(vec![("a", vec![1, 2, 3]), ("b", vec![2, 3])]),
            None,
        );
        let mut rules = RuleSet::new();
        rules.insert(
            (3, 2),
            RuleStats {
                confidence: 1.0,
                jweight: 0.0,
            },
        );
        rules.insert(
            (1, 3),
            RuleStats {
                confidence: 1.0,
                jweight: 0.35,
            },
        );

        let edges = build_edges(&counts, &rules, &index);
        assert_eq!(edges.len(), 2);

        let edge = &edges[&(3, 2)];
        assert_eq!(edge.ante_id, 3);
        assert_eq!(edge.cons_id, 2);
        assert_eq!(edge.cooccurrences, 2);
        assert_eq!(edge.occurs_in, 2);
        assert!(edge.weight.is_none());

        assert_eq!(edges[&(1, 3)].cooccurrences, 1);
        assert_eq!(edges[&(1, 3)].jweight, 0.35);
    }

    #[test]
    fn test_build_edges_only_for_rules() {
        let counts = CooccurrenceCounts::from_baskets(&[vec![1, 2]]);
        let index = DocumentOccurrenceIndex::default();
        let edges = build_edges(&counts, &RuleSet::new(), &index);
        assert!(edges.is_empty());
    }
}
