//! The five analyzers (spec §4.5-§4.9, design note "classes acting as
//! namespaces for a single method"): each is a plain function
//! `(&ParsedDocument, &SemanticHtml5Index, &CollectedData, ...) -> Section`,
//! replacing the `LightAuditor`/`Auditor` trait-object pattern
//! (`service/auditor/light.rs`, `service/auditor/mod.rs`) with free functions
//! — there is exactly one audit mode now, not a `AuditMode` enum switching
//! between light/deep analyzer sets.
//!
//! This module also collects the small text-analysis helpers shared by more
//! than one analyzer (tokenizing, Jaccard similarity) so C6, C7, and C9 do
//! not each reimplement them.

pub mod accessibility;
pub mod discoverability;
pub mod llm_formatting;
pub mod readability;
pub mod structured_data;

use std::collections::HashSet;

/// Lowercased alphabetic tokens of length ≥ 3 (spec §4.6 Meta Tags
/// consistency check).
pub fn normalize_tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() >= 3 && w.chars().all(|c| c.is_alphabetic()))
        .collect()
}

/// Jaccard similarity between the normalized token sets of `a` and `b`.
/// Two empty sets are considered dissimilar (0.0) rather than identical,
/// since there is nothing to compare.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let ta = normalize_tokens(a);
    let tb = normalize_tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// `round()` matching the spec's "round to nearest int" phrasing everywhere
/// a fractional score is produced (half-away-from-zero, never needed here
/// since all inputs are non-negative).
pub fn round_score(value: f64) -> i64 {
    value.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jaccard_identical_sentences_is_one() {
        assert_eq!(jaccard("hello world today", "today hello world"), 1.0);
    }

    #[test]
    fn jaccard_disjoint_sentences_is_zero() {
        assert_eq!(jaccard("alpha beta gamma", "delta epsilon zeta"), 0.0);
    }

    #[test]
    fn normalize_tokens_drops_short_and_numeric_words() {
        let tokens = normalize_tokens("A 12 big Cat sat on a2 mat");
        assert!(tokens.contains("big"));
        assert!(tokens.contains("cat"));
        assert!(!tokens.contains("12"));
        assert!(!tokens.contains("a2"));
    }
}
