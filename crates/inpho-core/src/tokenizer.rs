//! Sentence segmentation for occurrence scanning.
//!
//! Sentence baskets are the unit of co-occurrence, so the tokenizer is a
//! pluggable dependency of the scanner. The default implementation is a
//! rule-based English splitter; any tokenizer with comparable behavior on
//! abbreviations and decimals is acceptable.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Splits raw text into sentences.
pub trait SentenceTokenizer: Send + Sync {
    /// Split `text` into trimmed, non-empty sentences, in document order.
    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str>;

    /// Identifier of this tokenizer.
    fn name(&self) -> &str;
}

/// Abbreviations that end in a period without ending the sentence.
/// Compared lowercase, without the trailing period.
static ABBREVIATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "e.g", "i.e", "cf", "viz", "etc", "al", "vs", "mr", "mrs", "ms", "dr", "st", "prof",
        "rev", "fr", "jr", "sr", "vol", "vols", "ch", "chap", "sec", "pp", "p", "ed", "eds",
        "trans", "repr", "no", "fig", "ca", "c", "esp", "op", "cit", "ibid", "n.b",
    ]
    .into_iter()
    .collect()
});

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}')
}

/// Rule-based English sentence splitter.
///
/// A sentence ends at `.`, `!` or `?` (plus any closing quotes or
/// brackets) followed by whitespace, and at blank lines. Nothing ends
/// where the next word starts lowercase, and a lone period does not end a
/// sentence after a known abbreviation or a single-letter initial.
/// Decimals never split because the period is not followed by whitespace.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedSentenceTokenizer;

impl RuleBasedSentenceTokenizer {
    pub fn new() -> Self {
        Self
    }

    /// The word immediately before byte offset `pos`, letters and inner
    /// periods only (`"e.g"` for `"e.g."`).
    fn word_before(text: &str, pos: usize) -> &str {
        let head = &text[..pos];
        let start = head
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_alphabetic() || *c == '.')
            .last()
            .map(|(i, _)| i)
            .unwrap_or(pos);
        head[start..].trim_start_matches('.')
    }

    /// Whether the period at `pos` closes an abbreviation or an initial.
    fn is_abbreviation(text: &str, pos: usize) -> bool {
        let word = Self::word_before(text, pos);
        if ABBREVIATIONS.contains(word.to_lowercase().as_str()) {
            return true;
        }
        let mut letters = word.chars();
        matches!((letters.next(), letters.next()), (Some(first), None) if first.is_uppercase())
    }
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, piece: &'a str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        out.push(trimmed);
    }
}

impl SentenceTokenizer for RuleBasedSentenceTokenizer {
    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut out = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            let (pos, c) = chars[i];

            if c == '\n' {
                let mut j = i + 1;
                while j < chars.len() && chars[j].1 != '\n' && chars[j].1.is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && chars[j].1 == '\n' {
                    push_trimmed(&mut out, &text[start..pos]);
                    start = chars[j].0 + 1;
                    i = j + 1;
                    continue;
                }
            }

            if is_terminator(c) {
                let mut j = i + 1;
                while j < chars.len() && (is_terminator(chars[j].1) || is_closing(chars[j].1)) {
                    j += 1;
                }
                let end = chars.get(j).map(|(p, _)| *p).unwrap_or(text.len());
                let at_break = chars.get(j).map_or(true, |(_, next)| next.is_whitespace());
                let lone_period = c == '.' && !chars[i + 1..j].iter().any(|(_, t)| is_terminator(*t));

                let continues_lowercase = text[end..]
                    .trim_start()
                    .chars()
                    .next()
                    .is_some_and(|next| next.is_lowercase());

                let ends = at_break
                    && !continues_lowercase
                    && !(lone_period && Self::is_abbreviation(text, pos));
                if ends {
                    push_trimmed(&mut out, &text[start..end]);
                    start = end;
                }
                i = j;
                continue;
            }

            i += 1;
        }

        push_trimmed(&mut out, &text[start..]);
        out
    }

    fn name(&self) -> &str {
        "rule-based-en"
    }
}
