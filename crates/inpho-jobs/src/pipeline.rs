//! Mining pipeline orchestration.
//!
//! One run moves through `Scanning -> Filtering -> Mining -> Assembling ->
//! Weighting -> Publishing` strictly in order. Only this module decides
//! whether a run aborts: per-article failures are absorbed by the scan
//! pool, while miner, rule, weighting and publish errors end the run before
//! anything later is touched.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use inpho_core::{
    AssociationMiner, Document, DocumentSupply, EdgeRecord, EdgeSink, EntityKind, EntropySink,
    Error, EventBus, PipelineEvent, PipelinePhase, Result, SentenceTokenizer, TermId, TermSupply,
    TextSupply,
};
use inpho_corpus::{
    build_edges, edge_weight, format_basket, node_entropy, read_and_filter, read_rules,
    read_summaries, to_node_entropies, write_baskets, CooccurrenceCounts, DocumentOccurrenceIndex,
    OccurrenceScanner, ScanOptions, TermRegistry,
};

use crate::config::PipelineConfig;
use crate::files::write_lines_atomic;
use crate::miner::clear_output;
use crate::scan::{ScanOutcome, ScanPool};
use crate::sink::{read_edge_file, FileEdgeSink};

/// Collaborators of a pipeline, constructed once and shared by every run.
#[derive(Clone)]
pub struct PipelineContext {
    pub terms: Arc<dyn TermSupply>,
    pub documents: Arc<dyn DocumentSupply>,
    pub text: Arc<dyn TextSupply>,
    pub tokenizer: Arc<dyn SentenceTokenizer>,
    pub miner: Arc<dyn AssociationMiner>,
    pub edges: Arc<dyn EdgeSink>,
    pub entropy: Arc<dyn EntropySink>,
}

/// Options of one mining run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub kind: EntityKind,
    /// Rescan the corpus even when occurrence files exist.
    pub rescan: bool,
    /// Replace the database partition with the new edges.
    pub update_db: bool,
    /// Store node entropy on the terms (best effort).
    pub update_entropy: bool,
    /// Resolve overlapping labels within a sentence.
    pub remove_overlap: bool,
}

/// Scan statistics of a run that rescanned the corpus.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub article_count: usize,
    pub skipped_count: usize,
    pub basket_count: usize,
}

impl From<&ScanOutcome> for ScanSummary {
    fn from(outcome: &ScanOutcome) -> Self {
        Self {
            article_count: outcome.articles.len(),
            skipped_count: outcome.skipped.len(),
            basket_count: outcome.basket_count(),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct MiningReport {
    pub run_id: Uuid,
    pub kind: EntityKind,
    /// Present when the run scanned the corpus.
    pub scan: Option<ScanSummary>,
    /// Baskets left after filtering to the run's terms.
    pub basket_count: usize,
    pub rule_count: usize,
    pub edge_count: usize,
    pub sql_path: PathBuf,
    pub published: bool,
    /// Terms whose entropy was stored, when requested and successful.
    pub entropy_updated: Option<u64>,
    pub duration_ms: u64,
}

/// The mining pipeline.
pub struct MiningPipeline {
    config: PipelineConfig,
    ctx: PipelineContext,
    events: EventBus,
}

impl MiningPipeline {
    pub fn new(config: PipelineConfig, ctx: PipelineContext) -> Self {
        Self {
            config,
            ctx,
            events: EventBus::default(),
        }
    }

    /// Use an existing event bus.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every phase for `options.kind`.
    pub async fn run(&self, options: &RunOptions) -> Result<MiningReport> {
        let run_id = Uuid::now_v7();
        let span = info_span!("mining_run", run_id = %run_id, kind = %options.kind);
        let mut phase = PipelinePhase::Idle;

        let result = self
            .run_phases(run_id, options, &mut phase)
            .instrument(span.clone())
            .await;

        if let Err(e) = &result {
            span.in_scope(|| {
                error!(
                    subsystem = "jobs",
                    component = "pipeline",
                    phase = %phase,
                    error = %e,
                    "Mining run failed"
                )
            });
            self.events.emit(PipelineEvent::RunFailed {
                run_id,
                phase,
                error: e.to_string(),
            });
        }
        result
    }

    async fn run_phases(
        &self,
        run_id: Uuid,
        options: &RunOptions,
        phase: &mut PipelinePhase,
    ) -> Result<MiningReport> {
        let start = Instant::now();
        let kind = options.kind;
        self.events.emit(PipelineEvent::RunStarted { run_id, kind });
        info!(
            subsystem = "jobs",
            component = "pipeline",
            rescan = options.rescan,
            update_db = options.update_db,
            update_entropy = options.update_entropy,
            miner = self.ctx.miner.name(),
            "Mining run started"
        );

        let occurrence_path = self.config.occurrence_path();
        let summary_path = self.config.summary_path();

        // SCANNING covers every mineable term so later runs can filter to
        // any kind without rescanning.
        let scan = if options.rescan || !occurrence_path.exists() || !summary_path.exists() {
            let started = self.enter(run_id, phase, PipelinePhase::Scanning);
            let registry = self.load_registry(EntityKind::All).await?;
            let outcome = self
                .scan_corpus(run_id, &registry, options.remove_overlap)
                .await?;
            self.complete(run_id, *phase, started);
            Some(ScanSummary::from(&outcome))
        } else {
            info!(
                subsystem = "jobs",
                component = "pipeline",
                path = %occurrence_path.display(),
                "Reusing previous occurrence files"
            );
            None
        };

        // FILTERING
        let started = self.enter(run_id, phase, PipelinePhase::Filtering);
        let allowed: HashSet<TermId> = self.load_registry(kind).await?.ids().collect();
        let key_terms = self.ctx.documents.key_terms().await?;
        let graph_path = self.config.graph_path(kind);
        let baskets = blocking({
            let occurrence_path = occurrence_path.clone();
            let graph_path = graph_path.clone();
            let key_terms = key_terms.clone();
            move || {
                let baskets = read_and_filter(&occurrence_path, &allowed, Some(&key_terms))?;
                write_lines_atomic(&graph_path, baskets.iter().map(|b| format_basket(b)))?;
                Ok(baskets)
            }
        })
        .await?;
        info!(
            subsystem = "jobs",
            component = "pipeline",
            basket_count = baskets.len(),
            "Baskets filtered"
        );
        self.complete(run_id, *phase, started);

        // MINING
        let started = self.enter(run_id, phase, PipelinePhase::Mining);
        let edge_path = self.config.edge_path(kind);
        clear_output(&edge_path).await?;
        self.ctx.miner.mine(&graph_path, &edge_path).await?;
        if !edge_path.exists() {
            return Err(Error::Miner(format!(
                "{} wrote no rules to {}",
                self.ctx.miner.name(),
                edge_path.display()
            )));
        }
        let rules = blocking({
            let edge_path = edge_path.clone();
            move || read_rules(&edge_path)
        })
        .await?;
        let rule_count = rules.len();
        self.complete(run_id, *phase, started);

        // ASSEMBLING
        let started = self.enter(run_id, phase, PipelinePhase::Assembling);
        let summaries = blocking(move || read_summaries(&summary_path)).await?;
        let counts = CooccurrenceCounts::from_baskets(&baskets);
        let index = DocumentOccurrenceIndex::from_summaries(&summaries, Some(&key_terms));
        let edges: Vec<EdgeRecord> = build_edges(&counts, &rules, &index).into_values().collect();
        debug!(
            subsystem = "jobs",
            component = "pipeline",
            edge_count = edges.len(),
            pair_count = counts.len(),
            "Edges assembled"
        );
        self.complete(run_id, *phase, started);

        // WEIGHTING
        let started = self.enter(run_id, phase, PipelinePhase::Weighting);
        let entropies = node_entropy(&edges);
        let edges = edge_weight(edges, &entropies)?;
        self.complete(run_id, *phase, started);

        // PUBLISHING
        let started = self.enter(run_id, phase, PipelinePhase::Publishing);
        let partition = kind.partition();
        let file_sink = FileEdgeSink::new(&self.config.data_path);
        file_sink.replace_edges(partition, &edges).await?;
        if options.update_db {
            self.ctx.edges.replace_edges(partition, &edges).await?;
        }
        let entropy_updated = if options.update_entropy {
            match self
                .ctx
                .entropy
                .update_entropy(&to_node_entropies(&entropies))
                .await
            {
                Ok(updated) => Some(updated),
                Err(e) => {
                    warn!(
                        subsystem = "jobs",
                        component = "pipeline",
                        error = %e,
                        "Node entropy not stored"
                    );
                    None
                }
            }
        } else {
            None
        };
        self.complete(run_id, *phase, started);

        *phase = PipelinePhase::Done;
        let duration_ms = start.elapsed().as_millis() as u64;
        self.events.emit(PipelineEvent::RunCompleted {
            run_id,
            edge_count: edges.len(),
            duration_ms,
        });
        info!(
            subsystem = "jobs",
            component = "pipeline",
            rule_count,
            edge_count = edges.len(),
            published = options.update_db,
            duration_ms,
            "Mining run completed"
        );

        Ok(MiningReport {
            run_id,
            kind,
            scan,
            basket_count: baskets.len(),
            rule_count,
            edge_count: edges.len(),
            sql_path: file_sink.path_for(partition),
            published: options.update_db,
            entropy_updated,
            duration_ms,
        })
    }

    /// Scan the corpus and rewrite the occurrence files, without mining.
    pub async fn scan(&self, remove_overlap: bool) -> Result<ScanOutcome> {
        let run_id = Uuid::now_v7();
        let span = info_span!("scan_run", run_id = %run_id);
        async {
            let registry = self.load_registry(EntityKind::All).await?;
            self.scan_corpus(run_id, &registry, remove_overlap).await
        }
        .instrument(span)
        .await
    }

    /// Basket lines of a single article, key terms included.
    pub async fn scan_article(
        &self,
        article: &str,
        kind: EntityKind,
        remove_overlap: bool,
    ) -> Result<Vec<String>> {
        let mut registry = self.load_registry(kind).await?;
        let key_terms = self.ctx.documents.key_terms().await?;

        let text = self.ctx.text.clone();
        let key = article.to_string();
        let raw_text = blocking(move || text.extract_text(&key)).await?;
        let document = Document {
            id: article.to_string(),
            raw_text,
            key_terms: key_terms
                .get(article)
                .filter(|id| registry.contains(*id))
                .collect(),
        };

        let scanner = self.scanner(remove_overlap);
        let occurrences = scanner.scan(&mut registry, &document.id, &document.raw_text);
        let keys: Vec<TermId> = document.key_terms.iter().copied().collect();
        Ok(write_baskets(&document.id, &occurrences.sentences, &keys))
    }

    /// Publish a previously written sql file for `kind` without mining.
    pub async fn load(&self, kind: EntityKind) -> Result<u64> {
        let path = self.config.sql_path(kind);
        let edges = blocking({
            let path = path.clone();
            move || read_edge_file(&path)
        })
        .await?;

        let loaded = self.ctx.edges.replace_edges(kind.partition(), &edges).await?;
        info!(
            subsystem = "jobs",
            component = "pipeline",
            kind = %kind,
            path = %path.display(),
            edge_count = loaded,
            "Edge file loaded"
        );
        Ok(loaded)
    }

    async fn load_registry(&self, kind: EntityKind) -> Result<TermRegistry> {
        let records = self.ctx.terms.load_terms(kind).await?;
        let registry = TermRegistry::from_records(records);
        debug!(
            subsystem = "jobs",
            component = "pipeline",
            kind = %kind,
            term_count = registry.len(),
            "Term registry loaded"
        );
        Ok(registry)
    }

    fn scanner(&self, remove_overlap: bool) -> OccurrenceScanner {
        OccurrenceScanner::new(
            self.ctx.tokenizer.clone(),
            ScanOptions {
                remove_overlap,
                remove_duplicates: true,
            },
        )
    }

    async fn scan_corpus(
        &self,
        run_id: Uuid,
        registry: &TermRegistry,
        remove_overlap: bool,
    ) -> Result<ScanOutcome> {
        let articles = self.ctx.documents.list_documents().await?;
        let pool = ScanPool::new(
            self.scanner(remove_overlap),
            self.ctx.text.clone(),
            self.config.scan_workers,
        )
        .with_events(self.events.clone(), run_id);
        let outcome = pool.scan(registry, articles).await?;

        let occurrence_lines = outcome.occurrence_lines();
        let summary_lines = outcome.summary_lines();
        let occurrence_path = self.config.occurrence_path();
        let summary_path = self.config.summary_path();
        blocking(move || {
            write_lines_atomic(&occurrence_path, occurrence_lines)?;
            write_lines_atomic(&summary_path, summary_lines)?;
            Ok(())
        })
        .await?;
        Ok(outcome)
    }

    fn enter(&self, run_id: Uuid, phase: &mut PipelinePhase, next: PipelinePhase) -> Instant {
        *phase = next;
        self.events
            .emit(PipelineEvent::PhaseStarted { run_id, phase: next });
        info!(subsystem = "jobs", component = "pipeline", phase = %next, "Phase started");
        Instant::now()
    }

    fn complete(&self, run_id: Uuid, phase: PipelinePhase, started: Instant) {
        let duration_ms = started.elapsed().as_millis() as u64;
        self.events.emit(PipelineEvent::PhaseCompleted {
            run_id,
            phase,
            duration_ms,
        });
        debug!(
            subsystem = "jobs",
            component = "pipeline",
            phase = %phase,
            duration_ms,
            "Phase completed"
        );
    }
}

/// Run synchronous file work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("Blocking task failed: {}", e)))?
}
