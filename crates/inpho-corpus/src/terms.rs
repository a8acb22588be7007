//! Term registry and search-pattern handling.
//!
//! Every term carries an ordered list of search patterns. The label itself
//! is always the first pattern, anchored on word boundaries. Stored
//! patterns that combine alternatives or conjunctions are expanded into
//! separate patterns, so one broken part never disables the whole term.
//!
//! Patterns compile lazily on first use. A pattern that fails to compile is
//! removed from its term through [`Term::attempt_patterns`], which reports
//! the surviving pattern list instead of mutating the term in place.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use inpho_core::defaults::PATTERN_SIZE_LIMIT;
use inpho_core::{TermId, TermRecord};

/// Markers joining parts that must all match.
const AND_MARKERS: &[&str] = &["<and>", "<i>", "&cap"];

/// Markers joining alternative parts.
const OR_MARKERS: &[&str] = &["<or>", "<u>", "&cup"];

/// Compiled form of a pattern: every regex must match.
#[derive(Debug, Clone)]
struct Matcher {
    parts: Vec<Regex>,
}

impl Matcher {
    fn is_match(&self, text: &str) -> bool {
        self.parts.iter().all(|re| re.is_match(text))
    }
}

/// One search pattern of a term.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    source: String,
    parts: Vec<String>,
    compiled: OnceLock<Result<Matcher, String>>,
}

impl SearchPattern {
    /// A single-regex pattern.
    pub fn regex(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            parts: vec![source.clone()],
            source,
            compiled: OnceLock::new(),
        }
    }

    /// Literal label pattern, word-bounded where the label starts or ends
    /// with a word character.
    pub fn label(label: &str) -> Self {
        let trimmed = label.trim();
        let mut source = regex::escape(trimmed);
        if trimmed.chars().next().is_some_and(is_word_char) {
            source.insert_str(0, r"\b");
        }
        if trimmed.chars().last().is_some_and(is_word_char) {
            source.push_str(r"\b");
        }
        Self::regex(source)
    }

    fn conjunction(source: String, parts: Vec<String>) -> Self {
        Self {
            source,
            parts,
            compiled: OnceLock::new(),
        }
    }

    /// Text the pattern was built from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of regexes that must all match.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    fn matcher(&self) -> &Result<Matcher, String> {
        self.compiled.get_or_init(|| {
            let parts = self
                .parts
                .iter()
                .map(|part| {
                    RegexBuilder::new(part)
                        .case_insensitive(true)
                        .size_limit(PATTERN_SIZE_LIMIT)
                        .build()
                        .map_err(|e| e.to_string())
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Matcher { parts })
        })
    }

    /// Case-insensitive search. `Err` carries the compile failure.
    pub fn search(&self, text: &str) -> Result<bool, String> {
        match self.matcher() {
            Ok(matcher) => Ok(matcher.is_match(text)),
            Err(e) => Err(e.clone()),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Expand a stored pattern into the patterns it stands for.
///
/// Alternatives (`<or>`, `<u>`, `&cup`, top-level `|`) become separate
/// patterns; conjunctions (`<and>`, `<i>`, `&cap`) become one pattern whose
/// parts must all match. Nested groups distribute, so
/// `(a<i>b)<u>c` yields the patterns `a AND b` and `c`.
pub fn expand_pattern(raw: &str) -> Vec<SearchPattern> {
    expand(raw)
        .into_iter()
        .filter(|parts| !parts.is_empty())
        .map(|parts| {
            if parts.len() == 1 {
                SearchPattern::regex(parts.into_iter().next().unwrap_or_default())
            } else {
                let source = parts.join(" <and> ");
                SearchPattern::conjunction(source, parts)
            }
        })
        .collect()
}

/// Disjunctive normal form: a list of alternatives, each a list of parts.
fn expand(raw: &str) -> Vec<Vec<String>> {
    let text = strip_outer_parens(raw.trim());
    if text.is_empty() {
        return Vec::new();
    }

    let alternatives = split_top_level(text, OR_MARKERS, true);
    if alternatives.len() > 1 {
        return alternatives.iter().flat_map(|alt| expand(alt)).collect();
    }

    let conjuncts = split_top_level(text, AND_MARKERS, false);
    if conjuncts.len() > 1 {
        let mut product: Vec<Vec<String>> = vec![Vec::new()];
        for conjunct in &conjuncts {
            let options = expand(conjunct);
            if options.is_empty() {
                continue;
            }
            product = product
                .iter()
                .flat_map(|prefix| {
                    options.iter().map(move |option| {
                        let mut combined = prefix.clone();
                        combined.extend(option.iter().cloned());
                        combined
                    })
                })
                .collect();
        }
        return product;
    }

    vec![vec![text.to_string()]]
}

/// Remove parentheses wrapping the whole text (but not `(?...)` groups).
fn strip_outer_parens(mut text: &str) -> &str {
    while text.starts_with('(') && !text.starts_with("(?") && text.ends_with(')') {
        let inner = &text[1..text.len() - 1];
        // The opening paren must close at the very end.
        if !balanced(inner) {
            break;
        }
        text = inner.trim();
    }
    text
}

fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    let mut escaped = false;
    let mut in_class = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Split on `markers` (and `|` when `split_pipe`) outside groups, classes
/// and escapes. Pieces are trimmed; empty pieces are dropped.
fn split_top_level<'a>(text: &'a str, markers: &[&str], split_pipe: bool) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut escaped = false;
    let mut in_class = false;
    let mut start = 0;
    let mut skip_until = 0;

    for (i, c) in text.char_indices() {
        if i < skip_until {
            continue;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => depth -= 1,
            _ if depth == 0 && !in_class => {
                if split_pipe && c == '|' {
                    pieces.push(&text[start..i]);
                    start = i + 1;
                } else if let Some(marker) = markers.iter().find(|m| text[i..].starts_with(**m)) {
                    pieces.push(&text[start..i]);
                    start = i + marker.len();
                    skip_until = start;
                }
            }
            _ => {}
        }
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// A pattern that failed while being attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternFailure {
    pub source: String,
    pub error: String,
}

/// Outcome of [`Term::attempt_patterns`].
#[derive(Debug, Clone)]
pub struct PatternAttempt {
    /// Whether any pattern matched.
    pub matched: bool,
    /// Patterns that failed during this attempt.
    pub failures: Vec<PatternFailure>,
    /// The term's pattern list with failures removed; `None` when nothing
    /// failed and the list is unchanged.
    pub surviving: Option<Vec<SearchPattern>>,
}

/// A mineable vocabulary entry.
#[derive(Debug, Clone)]
pub struct Term {
    pub id: TermId,
    pub label: String,
    patterns: Vec<SearchPattern>,
}

impl Term {
    /// Build a term from its label and stored patterns.
    pub fn new(id: TermId, label: impl Into<String>, stored: &[String]) -> Self {
        let label = label.into();
        let mut patterns = vec![SearchPattern::label(&label)];
        for raw in stored {
            for pattern in expand_pattern(raw) {
                if !patterns.iter().any(|p| p.source() == pattern.source()) {
                    patterns.push(pattern);
                }
            }
        }
        Self {
            id,
            label,
            patterns,
        }
    }

    pub fn patterns(&self) -> &[SearchPattern] {
        &self.patterns
    }

    /// Search `text` with each pattern in order, stopping at the first hit.
    ///
    /// Patterns that fail are reported and left out of `surviving`; the
    /// caller decides whether to apply the new list.
    pub fn attempt_patterns(&self, text: &str) -> PatternAttempt {
        let mut failures = Vec::new();
        let mut failed_at = Vec::new();
        let mut matched = false;

        for (i, pattern) in self.patterns.iter().enumerate() {
            match pattern.search(text) {
                Ok(true) => {
                    matched = true;
                    break;
                }
                Ok(false) => {}
                Err(error) => {
                    failures.push(PatternFailure {
                        source: pattern.source().to_string(),
                        error,
                    });
                    failed_at.push(i);
                }
            }
        }

        let surviving = (!failed_at.is_empty()).then(|| {
            self.patterns
                .iter()
                .enumerate()
                .filter(|(i, _)| !failed_at.contains(i))
                .map(|(_, p)| p.clone())
                .collect()
        });

        PatternAttempt {
            matched,
            failures,
            surviving,
        }
    }

    /// Install a new pattern list (normally `PatternAttempt::surviving`).
    pub fn replace_patterns(&mut self, patterns: Vec<SearchPattern>) {
        self.patterns = patterns;
    }
}

/// Ordered collection of the terms scanned in one run.
///
/// Each scan worker owns its own clone; pattern removals in one clone are
/// never visible to another.
#[derive(Debug, Clone, Default)]
pub struct TermRegistry {
    terms: Vec<Term>,
    index: HashMap<TermId, usize>,
}

impl TermRegistry {
    /// Build a registry from entity-store records, skipping non-mineable
    /// entity types and duplicate ids. Order follows the records.
    pub fn from_records(records: impl IntoIterator<Item = TermRecord>) -> Self {
        let mut registry = Self::default();
        let mut skipped = 0usize;
        for record in records {
            if !record.entity_type.is_mineable() || registry.index.contains_key(&record.id) {
                skipped += 1;
                continue;
            }
            registry.push(Term::new(record.id, record.label, &record.search_patterns));
        }
        debug!(
            subsystem = "corpus",
            component = "registry",
            term_count = registry.len(),
            skipped,
            "Term registry built"
        );
        registry
    }

    /// Append a term. A term with an existing id replaces the old one.
    pub fn push(&mut self, term: Term) {
        match self.index.get(&term.id) {
            Some(&i) => self.terms[i] = term,
            None => {
                self.index.insert(term.id, self.terms.len());
                self.terms.push(term);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, id: TermId) -> Option<&Term> {
        self.index.get(&id).map(|&i| &self.terms[i])
    }

    pub fn contains(&self, id: TermId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter()
    }

    /// Term ids in registry order.
    pub fn ids(&self) -> impl Iterator<Item = TermId> + '_ {
        self.terms.iter().map(|t| t.id)
    }

    /// Whether the term matches `text`, applying any pattern removals.
    ///
    /// Unknown ids never match.
    pub fn probe(&mut self, id: TermId, text: &str) -> bool {
        let Some(&i) = self.index.get(&id) else {
            return false;
        };
        let term = &mut self.terms[i];
        let attempt = term.attempt_patterns(text);
        for failure in &attempt.failures {
            warn!(
                subsystem = "corpus",
                component = "registry",
                term_id = term.id,
                label = %term.label,
                pattern = %failure.source,
                error = %failure.error,
                "Search pattern failed; dropping it"
            );
        }
        if let Some(surviving) = attempt.surviving {
            term.replace_patterns(surviving);
        }
        attempt.matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inpho_core::EntityType;

    fn sources(patterns: &[SearchPattern]) -> Vec<&str> {
        patterns.iter().map(|p| p.source()).collect()
    }

    #[test]
    fn test_label_pattern_is_word_bounded() {
        let pattern = SearchPattern::label("free will");
        assert_eq!(pattern.source(), r"\bfree will\b");
        assert_eq!(pattern.search("On Free Will."), Ok(true));
        assert_eq!(pattern.search("freewill"), Ok(false));
        assert_eq!(pattern.search("carefree willingness"), Ok(false));
    }

    #[test]
    fn test_label_pattern_escapes_metacharacters() {
        let pattern = SearchPattern::label("C++ (language)");
        assert_eq!(pattern.search("written in c++ (language) today"), Ok(true));
        assert_eq!(pattern.search("written in c language"), Ok(false));
    }

    #[test]
    fn test_expand_top_level_pipe() {
        let patterns = expand_pattern("(empiricism|empiricist)");
        assert_eq!(sources(&patterns), vec!["empiricism", "empiricist"]);
    }

    #[test]
    fn test_expand_keeps_grouped_pipe() {
        let patterns = expand_pattern("empiric(ism|ist)s?");
        assert_eq!(sources(&patterns), vec!["empiric(ism|ist)s?"]);
    }

    #[test]
    fn test_expand_or_markers() {
        let patterns = expand_pattern("mind<or>soul &cup spirit");
        assert_eq!(sources(&patterns), vec!["mind", "soul", "spirit"]);
    }

    #[test]
    fn test_expand_and_marker_is_conjunction() {
        let patterns = expand_pattern("philosophy <and> mind");
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].part_count(), 2);
        assert_eq!(patterns[0].search("the mind in philosophy"), Ok(true));
        assert_eq!(patterns[0].search("philosophy of language"), Ok(false));
    }

    #[test]
    fn test_expand_distributes_nested_groups() {
        let patterns = expand_pattern("(causation<i>hume)<u>(causation<i>kant)");
        assert_eq!(patterns.len(), 2);
        assert!(patterns.iter().all(|p| p.part_count() == 2));

        let patterns = expand_pattern("ethics<i>(virtue<u>duty)");
        assert_eq!(
            sources(&patterns),
            vec!["ethics <and> virtue", "ethics <and> duty"]
        );
    }

    #[test]
    fn test_expand_empty_pattern() {
        assert!(expand_pattern("   ").is_empty());
        assert!(expand_pattern("()").is_empty());
    }

    #[test]
    fn test_term_label_is_first_pattern() {
        let term = Term::new(1, "mind", &["mental|psyche".to_string()]);
        assert_eq!(
            sources(term.patterns()),
            vec![r"\bmind\b", "mental", "psyche"]
        );
    }

    #[test]
    fn test_attempt_patterns_stops_at_first_hit() {
        let term = Term::new(1, "mind", &["(unclosed".to_string()]);
        let attempt = term.attempt_patterns("philosophy of mind");
        assert!(attempt.matched);
        assert!(attempt.failures.is_empty());
        assert!(attempt.surviving.is_none());
    }

    #[test]
    fn test_attempt_patterns_reports_surviving_list() {
        let term = Term::new(1, "mind", &["(unclosed".to_string(), "psyche".to_string()]);
        let attempt = term.attempt_patterns("the psyche");
        assert!(attempt.matched);
        assert_eq!(attempt.failures.len(), 1);
        assert_eq!(attempt.failures[0].source, "(unclosed");

        let surviving = attempt.surviving.unwrap();
        assert_eq!(sources(&surviving), vec![r"\bmind\b", "psyche"]);
        // The term itself is untouched until the caller applies the list.
        assert_eq!(term.patterns().len(), 3);
    }

    #[test]
    fn test_removing_pattern_changes_result() {
        let mut term = Term::new(1, "mind", &["psyche".to_string()]);
        assert!(term.attempt_patterns("the psyche").matched);

        let label_only = term.patterns()[..1].to_vec();
        term.replace_patterns(label_only);
        assert!(!term.attempt_patterns("the psyche").matched);
    }

    #[test]
    fn test_registry_skips_structural_types() {
        let registry = TermRegistry::from_records(vec![
            TermRecord::new(1, "mind", EntityType::Idea),
            TermRecord::new(2, "metaphysics", EntityType::Node),
            TermRecord::new(3, "Hume", EntityType::Thinker),
            TermRecord::new(4, "Mind", EntityType::Journal),
        ]);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_registry_probe_drops_failed_pattern() {
        let mut registry = TermRegistry::from_records(vec![TermRecord::new(
            1,
            "mind",
            EntityType::Idea,
        )
        .with_pattern("(unclosed")]);

        assert!(!registry.probe(1, "nothing relevant"));
        assert_eq!(registry.get(1).unwrap().patterns().len(), 1);
        assert!(registry.probe(1, "Mind matters"));
        assert!(!registry.probe(99, "mind"));
    }

    #[test]
    fn test_registry_clones_are_independent() {
        let original = TermRegistry::from_records(vec![TermRecord::new(
            1,
            "mind",
            EntityType::Idea,
        )
        .with_pattern("(unclosed")]);
        let mut worker = original.clone();

        worker.probe(1, "nothing");
        assert_eq!(worker.get(1).unwrap().patterns().len(), 1);
        assert_eq!(original.get(1).unwrap().patterns().len(), 2);
    }
}
