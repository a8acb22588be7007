//! Node entropy and entropy-scaled edge weights.
//!
//! A term's entropy is the Shannon entropy (bits) of its normalized
//! outgoing confidences. Edge weights scale the jweight by the entropy
//! drop from antecedent to consequent, relative to the run's maximum
//! entropy: general-to-specific edges come out positive, specific-to-
//! general edges negative.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use inpho_core::{EdgeRecord, Error, NodeEntropy, Result, TermId};

/// Entropy of every antecedent term in `edges`.
///
/// Terms with a single outgoing edge, or whose confidences do not form a
/// usable distribution, get 0.
pub fn node_entropy(edges: &[EdgeRecord]) -> BTreeMap<TermId, f64> {
    let mut outgoing: BTreeMap<TermId, Vec<f64>> = BTreeMap::new();
    for edge in edges {
        outgoing.entry(edge.ante_id).or_default().push(edge.confidence);
    }

    outgoing
        .into_iter()
        .map(|(term, confidences)| (term, shannon_entropy(&confidences)))
        .collect()
}

fn shannon_entropy(weights: &[f64]) -> f64 {
    if weights.len() < 2 {
        return 0.0;
    }
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return 0.0;
    }
    let h: f64 = weights
        .iter()
        .map(|w| w / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.log2())
        .sum();
    h.max(0.0)
}

/// Fill `weight` on every edge.
///
/// `weight = jweight * (H(ante) - H(cons)) / max_entropy`. A term absent
/// from `entropies` counts as entropy 0. When every entropy is 0 all
/// weights are 0. An empty `entropies` map is an error: there is nothing
/// to normalize against.
pub fn edge_weight(
    mut edges: Vec<EdgeRecord>,
    entropies: &BTreeMap<TermId, f64>,
) -> Result<Vec<EdgeRecord>> {
    if entropies.is_empty() {
        return Err(Error::EmptyEntropy {
            edge_count: edges.len(),
        });
    }

    let max_entropy = entropies.values().copied().fold(0.0_f64, f64::max);
    if max_entropy <= 0.0 {
        warn!(
            subsystem = "corpus",
            component = "weights",
            edge_count = edges.len(),
            term_count = entropies.len(),
            "All node entropies are zero; edge weights set to 0"
        );
        for edge in &mut edges {
            edge.weight = Some(0.0);
        }
        return Ok(edges);
    }

    let entropy = |term: TermId| entropies.get(&term).copied().unwrap_or(0.0);
    for edge in &mut edges {
        let diff = entropy(edge.ante_id) - entropy(edge.cons_id);
        edge.weight = Some(edge.jweight * (diff / max_entropy));
    }

    debug!(
        subsystem = "corpus",
        component = "weights",
        op = "weight",
        edge_count = edges.len(),
        max_entropy,
        "Edge weights computed"
    );
    Ok(edges)
}

/// Entropy map as a list for the entropy sink.
pub fn to_node_entropies(entropies: &BTreeMap<TermId, f64>) -> Vec<NodeEntropy> {
    entropies
        .iter()
        .map(|(&term_id, &entropy)| NodeEntropy { term_id, entropy })
        .collect()
}
