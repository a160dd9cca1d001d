//! Score Aggregator (C11, spec §4.11): combines section scores into a
//! single 0-100 GEO score under fixed weights, rescaling for missing
//! sections and applying multiplicative global penalties.

use crate::report::{AeoScore, GlobalPenalty, Section, SectionContribution};
use std::collections::BTreeMap;

/// Fixed section weights (spec §4.11), summing to 100.
pub const SECTION_WEIGHTS: &[(&str, u8)] = &[
    ("discoverability", 20),
    ("structuredData", 25),
    ("llmFormatting", 25),
    ("accessibility", 15),
    ("readability", 15),
];

/// Aggregate the surviving `sections` (keyed by section id) plus any
/// `global_penalties` into a final [`AeoScore`].
///
/// Missing sections (an analyzer that failed outright and was dropped
/// entirely rather than replaced by an error section) are excluded from the
/// weighted sum and the remaining weights are rescaled proportionally.
pub fn aggregate(sections: &BTreeMap<String, Section>, global_penalties: &[GlobalPenalty]) -> AeoScore {
    let present_weight_total: u32 = SECTION_WEIGHTS
        .iter()
        .filter(|(id, _)| sections.contains_key(*id))
        .map(|(_, w)| *w as u32)
        .sum();

    let mut breakdown = BTreeMap::new();
    let mut base_f64 = 0.0;

    for (id, weight) in SECTION_WEIGHTS {
        let Some(section) = sections.get(*id) else {
            continue;
        };
        let normalized = if section.max_score == 0 {
            1.0
        } else {
            section.total_score as f64 / section.max_score as f64
        };
        // Rescale this section's weight proportionally to the weight that's
        // actually present, so the weighted sum still totals 100.
        let rescaled_weight = if present_weight_total == 0 {
            0.0
        } else {
            *weight as f64 * 100.0 / present_weight_total as f64
        };
        let contribution = (normalized * rescaled_weight).round() as i64;
        base_f64 += normalized * rescaled_weight;

        breakdown.insert(
            id.to_string(),
            SectionContribution {
                score: section.total_score,
                weight: *weight,
                contribution,
            },
        );
    }

    let base = base_f64.round() as i64;

    let retained_factor: f64 = global_penalties
        .iter()
        .map(|p| 1.0 - p.penalty_factor.clamp(0.0, 1.0))
        .product();
    let final_score = ((base as f64) * retained_factor).round().clamp(0.0, 100.0) as i64;

    let completeness = describe_completeness(sections, present_weight_total);

    AeoScore {
        total_score: final_score,
        max_score: 100,
        breakdown,
        completeness,
    }
}

fn describe_completeness(sections: &BTreeMap<String, Section>, present_weight_total: u32) -> String {
    let present: Vec<&str> = SECTION_WEIGHTS
        .iter()
        .filter(|(id, _)| sections.contains_key(*id))
        .map(|(id, _)| *id)
        .collect();
    let missing: Vec<&str> = SECTION_WEIGHTS
        .iter()
        .filter(|(id, _)| !sections.contains_key(*id))
        .map(|(id, _)| *id)
        .collect();

    if missing.is_empty() {
        format!("All {} sections contributed to the final score.", present.len())
    } else {
        format!(
            "{} of {} sections contributed ({}); weights rescaled from {}% to 100%. Missing: {}.",
            present.len(),
            SECTION_WEIGHTS.len(),
            present.join(", "),
            present_weight_total,
            missing.join(", "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Drawer, MetricCard};

    fn section(id: &str, weight: u8, score: i64, max: i64) -> Section {
        let card = MetricCard::new("c", "C", max).score(score).build();
        let drawer = Drawer::new("d", "D", "desc", vec![card]);
        Section::new(id, id, weight, vec![drawer])
    }

    #[test]
    fn full_sections_sum_weights_to_100() {
        let mut sections = BTreeMap::new();
        for (id, weight) in SECTION_WEIGHTS {
            sections.insert(id.to_string(), section(id, *weight, 100, 100));
        }
        let score = aggregate(&sections, &[]);
        assert_eq!(score.total_score, 100);
    }

    #[test]
    fn missing_section_rescales_weights() {
        let mut sections = BTreeMap::new();
        sections.insert("discoverability".to_string(), section("discoverability", 20, 100, 100));
        sections.insert("structuredData".to_string(), section("structuredData", 25, 100, 100));
        sections.insert("llmFormatting".to_string(), section("llmFormatting", 25, 100, 100));
        sections.insert("accessibility".to_string(), section("accessibility", 15, 100, 100));
        // readability missing
        let score = aggregate(&sections, &[]);
        assert_eq!(score.total_score, 100);
        assert!(score.completeness.contains("readability"));
    }

    #[test]
    fn penalty_never_increases_score() {
        let mut sections = BTreeMap::new();
        for (id, weight) in SECTION_WEIGHTS {
            sections.insert(id.to_string(), section(id, *weight, 80, 100));
        }
        let base = aggregate(&sections, &[]).total_score;
        let penalty = GlobalPenalty {
            kind: "robots_txt_blocking".to_string(),
            description: "blocked".to_string(),
            penalty_factor: 0.7,
            details: vec![],
            solutions: vec![],
        };
        let penalized = aggregate(&sections, std::slice::from_ref(&penalty)).total_score;
        assert!(penalized <= base);
        assert_eq!(penalized, (base as f64 * 0.3).round() as i64);
    }

    #[test]
    fn zero_penalty_factor_leaves_score_unchanged() {
        let mut sections = BTreeMap::new();
        for (id, weight) in SECTION_WEIGHTS {
            sections.insert(id.to_string(), section(id, *weight, 80, 100));
        }
        let base = aggregate(&sections, &[]).total_score;
        let penalty = GlobalPenalty {
            kind: "none".to_string(),
            description: "".to_string(),
            penalty_factor: 0.0,
            details: vec![],
            solutions: vec![],
        };
        let penalized = aggregate(&sections, std::slice::from_ref(&penalty)).total_score;
        assert_eq!(base, penalized);
    }
}
