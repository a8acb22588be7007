//! Basket file format.
//!
//! The occurrence file holds one line per sentence basket,
//! `<article> <term_id> <term_id> ...`. The summary file holds one line per
//! article in the same format, listing every term found in the article.
//! Filtering re-reads the occurrence file against a term subset and writes
//! the miner input: bare term ids, one basket per line.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use inpho_core::{DocumentKeyTerms, Error, Result, TermId};

/// Format a basket as space-separated term ids.
pub fn format_basket(terms: &[TermId]) -> String {
    terms
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn article_line(article: &str, terms: &[TermId]) -> String {
    if terms.is_empty() {
        article.to_string()
    } else {
        format!("{} {}", article, format_basket(terms))
    }
}

/// One occurrence line per sentence basket.
///
/// `key_terms` are appended to every line, skipping those the sentence
/// already contains.
pub fn write_baskets(article: &str, sentences: &[Vec<TermId>], key_terms: &[TermId]) -> Vec<String> {
    sentences
        .iter()
        .map(|basket| {
            let mut terms = basket.clone();
            for &key in key_terms {
                if !terms.contains(&key) {
                    terms.push(key);
                }
            }
            article_line(article, &terms)
        })
        .collect()
}

/// The summary line of one article.
pub fn write_document_summary(article: &str, document_terms: &[TermId]) -> String {
    article_line(article, document_terms)
}

/// Split an article line into its key and term ids.
///
/// Returns `None` for blank lines. Tokens that are not term ids are
/// ignored, since no allowed term can match them.
pub fn parse_article_line(line: &str) -> Option<(&str, Vec<TermId>)> {
    let mut tokens = line.split_whitespace();
    let article = tokens.next()?;
    let terms = tokens.filter_map(|t| t.parse().ok()).collect();
    Some((article, terms))
}

/// Filter occurrence lines down to `allowed` terms.
///
/// When `key_terms` is given, each non-empty filtered line also receives
/// its article's allowed key terms that were not on the raw line. Lines
/// left with fewer than two terms carry no co-occurrence and are dropped.
pub fn filter_baskets<R: BufRead>(
    reader: R,
    allowed: &HashSet<TermId>,
    key_terms: Option<&DocumentKeyTerms>,
) -> Result<Vec<Vec<TermId>>> {
    let mut baskets = Vec::new();
    let mut dropped = 0usize;

    for line in reader.lines() {
        let line = line?;
        let Some((article, raw)) = parse_article_line(&line) else {
            continue;
        };

        let mut basket: Vec<TermId> = raw.iter().copied().filter(|id| allowed.contains(id)).collect();

        if !basket.is_empty() {
            if let Some(key_terms) = key_terms {
                for key in key_terms.get(article) {
                    if !raw.contains(&key) && allowed.contains(&key) && !basket.contains(&key) {
                        basket.push(key);
                    }
                }
            }
        }

        if basket.len() > 1 {
            baskets.push(basket);
        } else {
            dropped += 1;
        }
    }

    debug!(
        subsystem = "corpus",
        component = "baskets",
        op = "filter",
        basket_count = baskets.len(),
        dropped,
        "Occurrence lines filtered"
    );
    Ok(baskets)
}

/// [`filter_baskets`] over an occurrence file.
pub fn read_and_filter(
    path: &Path,
    allowed: &HashSet<TermId>,
    key_terms: Option<&DocumentKeyTerms>,
) -> Result<Vec<Vec<TermId>>> {
    let file = File::open(path)
        .map_err(|e| Error::NotFound(format!("Occurrence file {}: {}", path.display(), e)))?;
    filter_baskets(BufReader::new(file), allowed, key_terms)
}

/// Parse miner input: one basket of term ids per line.
pub fn parse_item_baskets<R: BufRead>(reader: R) -> Result<Vec<Vec<TermId>>> {
    let mut baskets = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let basket = line
            .split_whitespace()
            .map(|t| t.parse::<TermId>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                Error::InvalidInput(format!("Basket line {}: {:?}: {}", n + 1, line, e))
            })?;
        baskets.push(basket);
    }
    Ok(baskets)
}

/// [`parse_item_baskets`] over a file.
pub fn read_item_baskets(path: &Path) -> Result<Vec<Vec<TermId>>> {
    let file = File::open(path)
        .map_err(|e| Error::NotFound(format!("Basket file {}: {}", path.display(), e)))?;
    parse_item_baskets(BufReader::new(file))
}

/// Parse the summary file into `(article, terms)` pairs.
pub fn parse_summaries<R: BufRead>(reader: R) -> Result<Vec<(String, Vec<TermId>)>> {
    let mut summaries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some((article, terms)) = parse_article_line(&line) {
            summaries.push((article.to_string(), terms));
        }
    }
    Ok(summaries)
}

/// [`parse_summaries`] over a file.
pub fn read_summaries(path: &Path) -> Result<Vec<(String, Vec<TermId>)>> {
    let file = File::open(path)
        .map_err(|e| Error::NotFound(format!("Summary file {}: {}", path.display(), e)))?;
    parse_summaries(BufReader::new(file))
}
