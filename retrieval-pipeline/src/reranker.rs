use std::{cmp::Ordering, collections::HashSet};

use tracing::debug;

use crate::ScoredChunk;

/// Promotes candidates whose stored section headings lexically overlap the
/// query. The boost is additive and bounded by `boost_weight`, so relative
/// order among unmatched candidates is untouched, and matching is exact by
/// design: the adjustment stays predictable and explainable.
pub fn rerank(
    query: &str,
    mut candidates: Vec<ScoredChunk>,
    boost_weight: f32,
) -> Vec<ScoredChunk> {
    let weight = boost_weight.max(0.0);
    let query_lower = query.to_lowercase();
    let query_tokens: HashSet<String> = tokenize(&query_lower).collect();

    for candidate in &mut candidates {
        let boost = heading_boost(&query_lower, &query_tokens, &candidate.section_headings, weight);
        candidate.score += boost;
    }

    // Stable sort: candidates with equal adjusted scores keep their
    // original relative order.
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    debug!(candidates = candidates.len(), "section-aware rerank finished");

    candidates
}

/// `matched headings / total headings * weight`; candidates without heading
/// metadata get no boost rather than an error.
fn heading_boost(
    query_lower: &str,
    query_tokens: &HashSet<String>,
    headings: &[String],
    weight: f32,
) -> f32 {
    if headings.is_empty() {
        return 0.0;
    }

    let matches = headings
        .iter()
        .filter(|heading| heading_matches(query_lower, query_tokens, heading))
        .count();

    (matches as f32 / headings.len() as f32) * weight
}

fn heading_matches(query_lower: &str, query_tokens: &HashSet<String>, heading: &str) -> bool {
    let heading_lower = heading.to_lowercase();
    if heading_lower.trim().is_empty() {
        return false;
    }

    // Whole-phrase containment first, token-set containment as fallback
    if query_lower.contains(heading_lower.trim()) {
        return true;
    }

    let mut heading_tokens = tokenize(&heading_lower).peekable();
    if heading_tokens.peek().is_none() {
        return false;
    }
    heading_tokens.all(|token| query_tokens.contains(&token))
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
}
