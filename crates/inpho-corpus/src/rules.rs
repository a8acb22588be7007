//! Association rules: miner output parsing and the in-process pairwise
//! rule engine.
//!
//! Rule lines are `<ante> <cons> <confidence> <jweight>`. Any other shape
//! means the miner was invoked wrongly, so parsing is strict.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::debug;

use inpho_core::defaults::{MIN_CONFIDENCE, MIN_SUPPORT, MIN_UNION_SUPPORT};
use inpho_core::{Error, Result, RuleSet, RuleStats, TermId};

/// Tolerance for confidences printed slightly above 1.
const CONFIDENCE_EPSILON: f64 = 1e-9;

/// Parse miner output.
///
/// Blank lines are skipped. Every other line must have exactly four
/// fields, distinct term ids, a finite confidence in `[0, 1]` and a finite
/// jweight; anything else is `Error::MalformedRules`. A repeated pair
/// keeps its last line.
pub fn parse_rules<R: BufRead>(reader: R) -> Result<RuleSet> {
    let mut rules = RuleSet::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let malformed = || Error::MalformedRules {
            line: n + 1,
            content: line.clone(),
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [ante, cons, confidence, jweight] = fields.as_slice() else {
            return Err(malformed());
        };

        let ante: TermId = ante.parse().map_err(|_| malformed())?;
        let cons: TermId = cons.parse().map_err(|_| malformed())?;
        let confidence: f64 = confidence.parse().map_err(|_| malformed())?;
        let jweight: f64 = jweight.parse().map_err(|_| malformed())?;

        if ante == cons
            || !confidence.is_finite()
            || !jweight.is_finite()
            || !(0.0..=1.0 + CONFIDENCE_EPSILON).contains(&confidence)
        {
            return Err(malformed());
        }

        rules.insert(
            (ante, cons),
            RuleStats {
                confidence: confidence.min(1.0),
                jweight,
            },
        );
    }

    debug!(
        subsystem = "corpus",
        component = "rules",
        op = "parse",
        rule_count = rules.len(),
        "Miner output parsed"
    );
    Ok(rules)
}

/// [`parse_rules`] over the miner's output file.
pub fn read_rules(path: &Path) -> Result<RuleSet> {
    let file = File::open(path)
        .map_err(|e| Error::Miner(format!("Miner output {} unreadable: {}", path.display(), e)))?;
    parse_rules(BufReader::new(file))
}

/// J-measure of the rule `A -> B`.
///
/// `confidence` is P(B|A); `p_a` and `p_b` are the marginal basket
/// frequencies of A and B. The `confidence == 1` and `confidence == 0`
/// limits drop the term that would be `0 * ln 0`.
pub fn j_measure(confidence: f64, p_a: f64, p_b: f64) -> f64 {
    if confidence > 0.0 && confidence < 1.0 {
        p_a * (confidence * (confidence / p_b).ln()
            + (1.0 - confidence) * ((1.0 - confidence) / (1.0 - p_b)).ln())
    } else if confidence == 1.0 {
        p_a * confidence * (confidence / p_b).ln()
    } else if confidence == 0.0 {
        (1.0 - confidence) * ((1.0 - confidence) / (1.0 - p_b)).ln()
    } else {
        0.0
    }
}

/// One directed rule produced by [`PairwiseMiner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinedRule {
    pub ante: TermId,
    pub cons: TermId,
    pub stats: RuleStats,
}

/// In-process miner of pairwise association rules.
///
/// Produces the same rules and scores as the external apriori binary
/// restricted to two-item sets: for every pair seen together in more than
/// one basket, both directions are emitted with their confidence and
/// J-measure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairwiseMiner {
    /// Minimum relative support of the pair.
    pub min_support: f64,
    /// Minimum confidence of a rule.
    pub min_confidence: f64,
}

impl Default for PairwiseMiner {
    fn default() -> Self {
        Self {
            min_support: MIN_SUPPORT,
            min_confidence: MIN_CONFIDENCE,
        }
    }
}

impl PairwiseMiner {
    pub fn new(min_support: f64, min_confidence: f64) -> Self {
        Self {
            min_support,
            min_confidence,
        }
    }

    /// Mine rules from baskets. Output is sorted by `(ante, cons)`.
    pub fn mine_baskets(&self, baskets: &[Vec<TermId>]) -> Vec<MinedRule> {
        let total = baskets.len() as f64;
        let mut item_support: HashMap<TermId, u64> = HashMap::new();
        let mut pair_support: BTreeMap<(TermId, TermId), u64> = BTreeMap::new();

        for basket in baskets {
            let items: BTreeSet<TermId> = basket.iter().copied().collect();
            for &item in &items {
                *item_support.entry(item).or_default() += 1;
            }
            let items: Vec<TermId> = items.into_iter().collect();
            for (i, &a) in items.iter().enumerate() {
                for &b in &items[i + 1..] {
                    *pair_support.entry((a, b)).or_default() += 1;
                }
            }
        }

        let min_union = self.min_support * total;
        let mut rules = Vec::new();
        for (&(a, b), &union) in &pair_support {
            if union <= MIN_UNION_SUPPORT || (union as f64) < min_union {
                continue;
            }
            for (ante, cons) in [(a, b), (b, a)] {
                let supp_ante = item_support.get(&ante).copied().unwrap_or(0) as f64;
                let supp_cons = item_support.get(&cons).copied().unwrap_or(0) as f64;
                if (union as f64) <= supp_ante * self.min_confidence {
                    continue;
                }
                let confidence = union as f64 / supp_ante;
                let jweight = j_measure(confidence, supp_ante / total, supp_cons / total);
                rules.push(MinedRule {
                    ante,
                    cons,
                    stats: RuleStats {
                        confidence,
                        jweight,
                    },
                });
            }
        }

        rules.sort_by_key(|r| (r.ante, r.cons));
        debug!(
            subsystem = "corpus",
            component = "miner",
            basket_count = baskets.len(),
            pair_count = pair_support.len(),
            rule_count = rules.len(),
            "Pairwise rules mined"
        );
        rules
    }

    /// Write rules in the miner output format.
    pub fn write_rules<W: Write>(rules: &[MinedRule], mut writer: W) -> Result<()> {
        for rule in rules {
            writeln!(
                writer,
                "{} {} {} {}",
                rule.ante, rule.cons, rule.stats.confidence, rule.stats.jweight
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}
