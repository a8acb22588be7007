//! Parallel article scanning.
//!
//! A fixed pool of blocking workers pulls article keys from a shared queue.
//! Each worker owns a private copy of the term registry, so a pattern
//! dropped by one worker never affects another. Results are collected at a
//! join barrier and ordered by queue position before anything is written.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{info, warn, Span};
use uuid::Uuid;

use inpho_core::{Error, EventBus, PipelineEvent, Result, TextSupply};
use inpho_corpus::{
    write_baskets, write_document_summary, ArticleOccurrences, OccurrenceScanner, TermRegistry,
};

type ArticleQueue = Arc<Mutex<VecDeque<(usize, String)>>>;

/// Result of scanning a set of articles.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// One entry per requested article, in request order.
    pub articles: Vec<ArticleOccurrences>,
    /// Articles whose text could not be read.
    pub skipped: Vec<String>,
}

impl ScanOutcome {
    /// Occurrence file lines: one per sentence basket.
    pub fn occurrence_lines(&self) -> Vec<String> {
        self.articles
            .iter()
            .flat_map(|a| write_baskets(&a.article, &a.sentences, &[]))
            .collect()
    }

    /// Summary file lines: one per article with at least one term.
    pub fn summary_lines(&self) -> Vec<String> {
        self.articles
            .iter()
            .filter(|a| !a.document_terms.is_empty())
            .map(|a| write_document_summary(&a.article, &a.document_terms))
            .collect()
    }

    pub fn basket_count(&self) -> usize {
        self.articles.iter().map(|a| a.sentences.len()).sum()
    }
}

/// Worker pool scanning articles against a registry snapshot.
pub struct ScanPool {
    scanner: OccurrenceScanner,
    text: Arc<dyn TextSupply>,
    workers: usize,
    events: Option<(EventBus, Uuid)>,
}

impl ScanPool {
    pub fn new(scanner: OccurrenceScanner, text: Arc<dyn TextSupply>, workers: usize) -> Self {
        Self {
            scanner,
            text,
            workers: workers.max(1),
            events: None,
        }
    }

    /// Emit an `ArticleScanned` event per article for `run_id`.
    pub fn with_events(mut self, bus: EventBus, run_id: Uuid) -> Self {
        self.events = Some((bus, run_id));
        self
    }

    /// Scan `articles`. Missing or unreadable articles contribute nothing
    /// and are reported in [`ScanOutcome::skipped`].
    pub async fn scan(&self, registry: &TermRegistry, articles: Vec<String>) -> Result<ScanOutcome> {
        let start = Instant::now();
        let total = articles.len();
        if total == 0 {
            return Ok(ScanOutcome::default());
        }

        let queue: ArticleQueue = Arc::new(Mutex::new(articles.into_iter().enumerate().collect()));
        let worker_count = self.workers.min(total);

        info!(
            subsystem = "jobs",
            component = "scan",
            article_count = total,
            worker_count,
            term_count = registry.len(),
            "Scanning articles"
        );

        let mut set = JoinSet::new();
        for _ in 0..worker_count {
            let queue = queue.clone();
            let registry = registry.clone();
            let scanner = self.scanner.clone();
            let text = self.text.clone();
            let events = self.events.clone();
            let span = Span::current();
            set.spawn_blocking(move || {
                let _entered = span.enter();
                scan_worker(queue, registry, &scanner, text.as_ref(), events.as_ref())
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = set.join_next().await {
            let part =
                joined.map_err(|e| Error::Internal(format!("Scan worker failed: {}", e)))?;
            results.extend(part);
        }
        results.sort_by_key(|(index, _, _)| *index);

        let mut outcome = ScanOutcome::default();
        for (_, occurrences, skipped) in results {
            if skipped {
                outcome.skipped.push(occurrences.article.clone());
            }
            outcome.articles.push(occurrences);
        }

        info!(
            subsystem = "jobs",
            component = "scan",
            article_count = total,
            skipped = outcome.skipped.len(),
            basket_count = outcome.basket_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Articles scanned"
        );
        Ok(outcome)
    }
}

fn next_article(queue: &ArticleQueue) -> Option<(usize, String)> {
    // A poisoned queue means another worker panicked; the join reports it.
    queue.lock().ok()?.pop_front()
}

fn scan_worker(
    queue: ArticleQueue,
    mut registry: TermRegistry,
    scanner: &OccurrenceScanner,
    text: &dyn TextSupply,
    events: Option<&(EventBus, Uuid)>,
) -> Vec<(usize, ArticleOccurrences, bool)> {
    let mut out = Vec::new();
    while let Some((index, article)) = next_article(&queue) {
        let (occurrences, skipped) = match text.extract_text(&article) {
            Ok(body) => (scanner.scan(&mut registry, &article, &body), false),
            Err(e) => {
                warn!(
                    subsystem = "jobs",
                    component = "scan",
                    article = %article,
                    error = %e,
                    "Skipping article"
                );
                (ArticleOccurrences::empty(article.as_str()), true)
            }
        };

        if let Some((bus, run_id)) = events {
            bus.emit(PipelineEvent::ArticleScanned {
                run_id: *run_id,
                article: article.clone(),
                sentence_count: occurrences.sentences.len(),
                skipped,
            });
        }
        out.push((index, occurrences, skipped));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTextSupply;
    use inpho_core::{EntityType, RuleBasedSentenceTokenizer, TermRecord};
    use inpho_corpus::ScanOptions;

    fn registry() -> TermRegistry {
        TermRegistry::from_records(vec![
            TermRecord::new(1, "Locke", EntityType::Thinker),
            TermRecord::new(2, "Hume", EntityType::Thinker),
            TermRecord::new(3, "empiricism", EntityType::Idea),
        ])
    }

    fn pool(text: MockTextSupply, workers: usize) -> ScanPool {
        let scanner = OccurrenceScanner::new(
            Arc::new(RuleBasedSentenceTokenizer::new()),
            ScanOptions {
                remove_overlap: false,
                remove_duplicates: true,
            },
        );
        ScanPool::new(scanner, Arc::new(text), workers)
    }

    fn corpus() -> MockTextSupply {
        MockTextSupply::new()
            .with_article("a", "Locke influenced Hume on empiricism.")
            .with_article("b", "Hume's empiricism.")
            .with_article("c", "Nothing relevant here.")
    }

    #[tokio::test]
    async fn test_scan_orders_results_by_request() {
        let articles: Vec<String> = ["c", "b", "a"].iter().map(|s| s.to_string()).collect();
        let outcome = pool(corpus(), 3).scan(&registry(), articles).await.unwrap();

        let keys: Vec<&str> = outcome.articles.iter().map(|a| a.article.as_str()).collect();
        assert_eq!(keys, vec!["c", "b", "a"]);
        assert_eq!(outcome.occurrence_lines(), vec!["b 2 3", "a 1 2 3"]);
        assert_eq!(outcome.summary_lines(), vec!["b 2 3", "a 1 2 3"]);
        assert!(outcome.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_scan_is_independent_of_worker_count() {
        let articles: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let single = pool(corpus(), 1)
            .scan(&registry(), articles.clone())
            .await
            .unwrap();
        let many = pool(corpus(), 8).scan(&registry(), articles).await.unwrap();
        assert_eq!(single.articles, many.articles);
    }

    #[tokio::test]
    async fn test_missing_article_is_skipped() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let run_id = Uuid::now_v7();

        let articles = vec!["a".to_string(), "missing".to_string()];
        let outcome = pool(corpus(), 2)
            .with_events(bus, run_id)
            .scan(&registry(), articles)
            .await
            .unwrap();

        assert_eq!(outcome.skipped, vec!["missing".to_string()]);
        assert_eq!(outcome.articles[1], ArticleOccurrences::empty("missing"));
        assert_eq!(outcome.occurrence_lines(), vec!["a 1 2 3"]);

        let mut skipped_events = 0;
        let mut scanned_events = 0;
        while let Ok(envelope) = rx.try_recv() {
            if let PipelineEvent::ArticleScanned { skipped, .. } = envelope.payload {
                scanned_events += 1;
                if skipped {
                    skipped_events += 1;
                }
            }
        }
        assert_eq!(scanned_events, 2);
        assert_eq!(skipped_events, 1);
    }

    #[tokio::test]
    async fn test_scan_without_articles() {
        let outcome = pool(corpus(), 4).scan(&registry(), Vec::new()).await.unwrap();
        assert!(outcome.articles.is_empty());
        assert_eq!(outcome.basket_count(), 0);
    }
}
