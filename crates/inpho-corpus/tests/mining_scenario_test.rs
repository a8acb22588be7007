//! End-to-end mining over a two-article corpus, without the orchestrator.
//!
//! Scans both articles, writes and filters baskets through real files,
//! mines pairwise rules in process and weights the assembled edges.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use inpho_core::{EntityType, RuleBasedSentenceTokenizer, TermRecord};
use inpho_corpus::{
    build_edges, edge_weight, node_entropy, parse_rules, read_and_filter, read_summaries,
    write_baskets, write_document_summary, CooccurrenceCounts, DocumentOccurrenceIndex,
    OccurrenceScanner, PairwiseMiner, ScanOptions, TermRegistry,
};

fn registry() -> TermRegistry {
    TermRegistry::from_records(vec![
        TermRecord::new(1, "Locke", EntityType::Thinker),
        TermRecord::new(2, "Hume", EntityType::Thinker),
        TermRecord::new(3, "empiricism", EntityType::Idea),
    ])
}

fn scanner() -> OccurrenceScanner {
    OccurrenceScanner::new(
        Arc::new(RuleBasedSentenceTokenizer::new()),
        ScanOptions {
            remove_overlap: false,
            remove_duplicates: true,
        },
    )
}

#[test]
fn test_two_document_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let occurrence_path = dir.path().join("occurrences.txt");
    let summary_path = dir.path().join("occurrences-summary.txt");

    let corpus = [
        ("a", "Locke influenced Hume on empiricism."),
        ("b", "Hume's empiricism."),
    ];

    let scanner = scanner();
    let mut occurrence_lines = Vec::new();
    let mut summary_lines = Vec::new();
    for (article, text) in corpus {
        let mut reg = registry();
        let scanned = scanner.scan(&mut reg, article, text);
        occurrence_lines.extend(write_baskets(article, &scanned.sentences, &[]));
        summary_lines.push(write_document_summary(article, &scanned.document_terms));
    }
    assert_eq!(occurrence_lines, vec!["a 1 2 3", "b 2 3"]);

    std::fs::write(&occurrence_path, occurrence_lines.join("\n") + "\n").unwrap();
    std::fs::write(&summary_path, summary_lines.join("\n") + "\n").unwrap();

    let allowed: HashSet<_> = registry().ids().collect();
    let baskets = read_and_filter(&occurrence_path, &allowed, None).unwrap();
    assert_eq!(baskets, vec![vec![1, 2, 3], vec![2, 3]]);

    let mut miner_output = Vec::new();
    let mined = PairwiseMiner::default().mine_baskets(&baskets);
    PairwiseMiner::write_rules(&mined, &mut miner_output).unwrap();
    let rules = parse_rules(Cursor::new(miner_output)).unwrap();

    // Every basket with empiricism also has Hume.
    assert_eq!(rules[&(3, 2)].confidence, 1.0);

    let counts = CooccurrenceCounts::from_baskets(&baskets);
    assert_eq!(counts.get(2, 3), 2);

    let summaries = read_summaries(&summary_path).unwrap();
    let index = DocumentOccurrenceIndex::from_summaries(&summaries, None);
    let edges = build_edges(&counts, &rules, &index);
    assert_eq!(edges[&(3, 2)].cooccurrences, 2);
    assert_eq!(edges[&(3, 2)].occurs_in, 2);

    let edges: Vec<_> = edges.into_values().collect();
    let entropies = node_entropy(&edges);
    let weighted = edge_weight(edges, &entropies).unwrap();
    assert!(weighted
        .iter()
        .all(|e| e.weight.is_some_and(f64::is_finite)));
}

#[test]
fn test_empty_rule_set_cannot_be_weighted() {
    let rules = parse_rules(Cursor::new("")).unwrap();
    let index = DocumentOccurrenceIndex::default();
    let edges = build_edges(&CooccurrenceCounts::default(), &rules, &index);
    let edges: Vec<_> = edges.into_values().collect();

    let entropies = node_entropy(&edges);
    assert!(edge_weight(edges, &entropies).is_err());
}
