//! Pipeline over a corpus directory tree with file-backed outputs.
//!
//! Uses the filesystem text supply, the in-process miner and the sql-file
//! sink; only the entity store is replaced by fixed in-test supplies.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use inpho_core::{
    DocumentKeyTerms, DocumentSupply, EntityKind, EntityType, EntropySink, GraphPartition,
    NodeEntropy, Result, RuleBasedSentenceTokenizer, TermRecord, TermSupply,
};
use inpho_jobs::{
    read_edge_file, BuiltinMiner, FileEdgeSink, FilesystemTextSupply, MinerKind, MiningPipeline,
    PipelineConfig, PipelineContext, RunOptions,
};

struct Vocabulary;

#[async_trait]
impl TermSupply for Vocabulary {
    async fn load_terms(&self, kind: EntityKind) -> Result<Vec<TermRecord>> {
        let all = vec![
            TermRecord::new(10, "mind", EntityType::Idea),
            TermRecord::new(11, "philosophy of mind", EntityType::Idea),
            TermRecord::new(12, "consciousness", EntityType::Idea)
                .with_pattern("conscious experience"),
            TermRecord::new(13, "René Descartes", EntityType::Thinker).with_pattern("Descartes"),
        ];
        Ok(all
            .into_iter()
            .filter(|t| kind.includes(t.entity_type))
            .collect())
    }
}

struct Articles;

#[async_trait]
impl DocumentSupply for Articles {
    async fn list_documents(&self) -> Result<Vec<String>> {
        Ok(vec![
            "descartes".to_string(),
            "consciousness".to_string(),
            "missing".to_string(),
        ])
    }

    async fn key_terms(&self) -> Result<DocumentKeyTerms> {
        Ok([("descartes".to_string(), 13)].into_iter().collect())
    }
}

struct NoEntropy;

#[async_trait]
impl EntropySink for NoEntropy {
    async fn update_entropy(&self, _entropies: &[NodeEntropy]) -> Result<u64> {
        Ok(0)
    }
}

fn write_article(root: &Path, key: &str, text: &str) {
    std::fs::create_dir_all(root.join(key)).unwrap();
    std::fs::write(root.join(key).join("index.txt"), text).unwrap();
}

fn pipeline(corpus: &Path, data: &Path) -> MiningPipeline {
    let config = PipelineConfig::new(corpus)
        .with_data_path(data)
        .with_miner(MinerKind::Builtin)
        .with_scan_workers(2);
    let ctx = PipelineContext {
        terms: Arc::new(Vocabulary),
        documents: Arc::new(Articles),
        text: Arc::new(FilesystemTextSupply::from_config(&config)),
        tokenizer: Arc::new(RuleBasedSentenceTokenizer::new()),
        miner: Arc::new(BuiltinMiner::default()),
        edges: Arc::new(FileEdgeSink::new(data.join("published"))),
        entropy: Arc::new(NoEntropy),
    };
    MiningPipeline::new(config, ctx)
}

fn corpus(root: &Path) {
    write_article(
        root,
        "descartes",
        "Descartes wrote on the philosophy of mind. His philosophy of mind \
         shaped debates on consciousness. Mind and consciousness were distinct for him.",
    );
    write_article(
        root,
        "consciousness",
        "Conscious experience is studied in the philosophy of mind. \
         Consciousness puzzles the mind sciences.",
    );
}

#[tokio::test]
async fn test_overlap_removal_changes_baskets() {
    let corpus_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    corpus(corpus_dir.path());
    let pipeline = pipeline(corpus_dir.path(), data_dir.path());

    pipeline.scan(true).await.unwrap();
    let resolved = std::fs::read_to_string(pipeline.config().occurrence_path()).unwrap();

    pipeline.scan(false).await.unwrap();
    let raw = std::fs::read_to_string(pipeline.config().occurrence_path()).unwrap();

    // "philosophy of mind" also matches "mind"; overlap removal keeps only
    // the longer label.
    assert!(raw.lines().any(|l| l == "descartes 10 11 13"));
    assert!(!resolved.lines().any(|l| l.contains(" 10 11")));
    assert!(resolved.lines().any(|l| l == "descartes 11 13"));
}

#[tokio::test]
async fn test_end_to_end_writes_and_publishes_edge_files() {
    let corpus_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    corpus(corpus_dir.path());
    let pipeline = pipeline(corpus_dir.path(), data_dir.path());

    let options = RunOptions {
        kind: EntityKind::All,
        rescan: true,
        update_db: true,
        update_entropy: false,
        remove_overlap: false,
    };
    let report = pipeline.run(&options).await.unwrap();

    let scan = report.scan.unwrap();
    assert_eq!(scan.article_count, 3);
    assert_eq!(scan.skipped_count, 1);
    assert!(report.edge_count > 0);

    let data = data_dir.path();
    assert!(data.join("graph-all.txt").exists());
    assert!(data.join("edge-all.txt").exists());

    let written = read_edge_file(&report.sql_path).unwrap();
    assert_eq!(written.len(), report.edge_count);
    assert!(written.iter().all(|e| e.ante_id != e.cons_id));

    let published = FileEdgeSink::new(data.join("published")).path_for(GraphPartition::IdeaThinker);
    assert_eq!(read_edge_file(&published).unwrap(), written);

    // Descartes is a key term of his own article, so it joins every
    // basket there and co-occurs with both mind terms.
    assert!(written.iter().any(|e| e.key() == (13, 11) || e.key() == (11, 13)));
}
