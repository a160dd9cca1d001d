//! The uniform `Section -> Drawer -> Card` report shape (spec §3, §4.10).
//!
//! This is the closed, typed contract every analyzer's raw result is
//! reshaped into. It replaces the untyped
//! `rawData: any`/`{score}|{totalScore}` duality (see `domain::models`,
//! where `AnalysisResults`/`LighthouseData` mix loosely-typed JSON blobs
//! with ad-hoc numeric fields) with a closed set of typed structs plus one
//! opaque `raw_data: serde_json::Value` diagnostics slot per card that is
//! never read for scoring.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status derived purely from `score / max_score` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Excellent,
    Good,
    Warning,
    Error,
}

impl Status {
    /// `maxScore == 0 ⇒ excellent` (spec §8 item 3); otherwise the fixed
    /// thresholds `≥0.9`, `≥0.7`, `≥0.5`, else.
    pub fn from_score(score: i64, max_score: i64) -> Self {
        if max_score == 0 {
            return Status::Excellent;
        }
        let ratio = score as f64 / max_score as f64;
        if ratio >= 0.9 {
            Status::Excellent
        } else if ratio >= 0.7 {
            Status::Good
        } else if ratio >= 0.5 {
            Status::Warning
        } else {
            Status::Error
        }
    }
}

/// One actionable finding attached to a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub problem: String,
    pub solution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// 0..=10.
    pub impact: u8,
}

impl Recommendation {
    pub fn new(problem: impl Into<String>, solution: impl Into<String>, impact: u8) -> Self {
        Self {
            problem: problem.into(),
            solution: solution.into(),
            explanation: None,
            impact: impact.min(10),
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

/// Leaf scoring unit (spec §3 `MetricCard`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricCard {
    pub id: String,
    pub name: String,
    pub explanation: String,
    pub score: i64,
    pub max_score: i64,
    pub status: Status,
    pub recommendations: Vec<Recommendation>,
    pub success_message: String,
    pub raw_data: Value,
}

impl MetricCard {
    pub fn new(id: impl Into<String>, name: impl Into<String>, max_score: i64) -> MetricCardBuilder {
        MetricCardBuilder {
            id: id.into(),
            name: name.into(),
            explanation: String::new(),
            score: 0,
            max_score,
            recommendations: Vec::new(),
            success_message: String::new(),
            raw_data: Value::Null,
        }
    }
}

/// Small builder so call sites read as a sequence of decisions rather than
/// positional struct literals — every card in the analyzers module is built
/// this way.
pub struct MetricCardBuilder {
    id: String,
    name: String,
    explanation: String,
    score: i64,
    max_score: i64,
    recommendations: Vec<Recommendation>,
    success_message: String,
    raw_data: Value,
}

impl MetricCardBuilder {
    pub fn explanation(mut self, text: impl Into<String>) -> Self {
        self.explanation = text.into();
        self
    }

    pub fn score(mut self, score: i64) -> Self {
        self.score = score.clamp(0, self.max_score);
        self
    }

    pub fn recommendation(mut self, rec: Recommendation) -> Self {
        self.recommendations.push(rec);
        self
    }

    pub fn recommendations(mut self, recs: impl IntoIterator<Item = Recommendation>) -> Self {
        self.recommendations.extend(recs);
        self
    }

    pub fn success_message(mut self, text: impl Into<String>) -> Self {
        self.success_message = text.into();
        self
    }

    pub fn raw_data(mut self, value: Value) -> Self {
        self.raw_data = value;
        self
    }

    /// Lets call sites decide on a default `success_message` after
    /// accumulating recommendations, without consuming the builder.
    pub fn recommendations_is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }

    pub fn build(self) -> MetricCard {
        let status = Status::from_score(self.score, self.max_score);
        MetricCard {
            id: self.id,
            name: self.name,
            explanation: self.explanation,
            score: self.score,
            max_score: self.max_score,
            status,
            recommendations: self.recommendations,
            success_message: self.success_message,
            raw_data: self.raw_data,
        }
    }
}

/// Grouping of cards (spec §3 `Drawer`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drawer {
    pub id: String,
    pub name: String,
    pub description: String,
    pub total_score: i64,
    pub max_score: i64,
    pub status: Status,
    pub cards: Vec<MetricCard>,
}

impl Drawer {
    /// Builds totals from card scores — never invents a score (spec §4.10).
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>, cards: Vec<MetricCard>) -> Self {
        let total_score: i64 = cards.iter().map(|c| c.score).sum();
        let max_score: i64 = cards.iter().map(|c| c.max_score).sum();
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            total_score,
            max_score,
            status: Status::from_score(total_score, max_score),
            cards,
        }
    }
}

/// One analyzer's full output (spec §3 `Section`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub weight_percentage: u8,
    pub total_score: i64,
    pub max_score: i64,
    pub status: Status,
    pub drawers: Vec<Drawer>,
}

impl Section {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        weight_percentage: u8,
        drawers: Vec<Drawer>,
    ) -> Self {
        let total_score: i64 = drawers.iter().map(|d| d.total_score).sum();
        let max_score: i64 = drawers.iter().map(|d| d.max_score).sum();
        Self {
            id: id.into(),
            name: name.into(),
            weight_percentage,
            total_score,
            max_score,
            status: Status::from_score(total_score, max_score),
            drawers,
        }
    }

    /// An `error` section substituted when an analyzer fails outright
    /// (spec §4.12 partial-failure semantics).
    pub fn error(id: impl Into<String>, name: impl Into<String>, weight_percentage: u8, max_score: i64, message: impl Into<String>) -> Self {
        let card = MetricCard::new("analyzer-error", "Analyzer failed", max_score)
            .explanation("This analyzer could not complete and contributed no score.")
            .recommendation(Recommendation::new(
                message.into(),
                "Re-run the audit; if the failure persists, check the analyzer logs.",
                10,
            ))
            .build();
        let drawer = Drawer::new("error", "Error", "Analyzer failure", vec![card]);
        Self::new(id, name, weight_percentage, vec![drawer])
    }
}

/// A multiplicative penalty applied across sections (spec §3
/// `GlobalPenalty`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalPenalty {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub penalty_factor: f64,
    pub details: Vec<String>,
    pub solutions: Vec<String>,
}

/// Per-section contribution to the final score (spec §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionContribution {
    pub score: i64,
    pub weight: u8,
    pub contribution: i64,
}

/// The final weighted GEO score (spec §3 `AEOScore`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AeoScore {
    pub total_score: i64,
    pub max_score: i64,
    pub breakdown: std::collections::BTreeMap<String, SectionContribution>,
    pub completeness: String,
}
