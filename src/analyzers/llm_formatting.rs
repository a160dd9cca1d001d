//! Analyzer — LLM Formatting (C7, spec §4.7): heading hierarchy, data
//! grouping (semantic vs. simulated lists/tables), main/region semantics,
//! and CTA context clarity.
//!
//! Grounded on `service/auditor/light.rs`'s link-text and
//! crawlable-anchor checks (`check_link_text`, `check_crawlable_anchors`),
//! generalized from "non-empty link text" into the accessible-name
//! blacklist this spec requires, plus the heading/region checks the
//! single-pass SEO auditor never performed.

use crate::analyzers::round_score;
use crate::html::{ParsedDocument, SemanticHtml5Index};
use crate::report::{Drawer, MetricCard, Recommendation, Section};
use regex::Regex;
use scraper::Selector;
use std::sync::OnceLock;

const CTA_BLACKLIST: &[&str] = &["click here", "here", "more", "read more", "link", "this", "learn more"];

pub fn analyze(doc: &ParsedDocument, index: &SemanticHtml5Index) -> Section {
    let hierarchy = Drawer::new(
        "content-hierarchy",
        "Content Hierarchy",
        "Heading structure and data-grouping semantics an LLM can parse reliably.",
        vec![heading_structure(index), data_grouping(doc)],
    );

    let roles = Drawer::new(
        "layout-structural-roles",
        "Layout & Structural Roles",
        "Use of HTML5 sectioning elements to convey page structure.",
        vec![main_content_definition(index), semantic_region_tagging(doc, index)],
    );

    let cta = Drawer::new(
        "cta-context-clarity",
        "CTA Context Clarity",
        "Whether links and buttons have accessible, self-describing names.",
        vec![cta_context_clarity(doc)],
    );

    Section::new("llmFormatting", "LLM Formatting", 25, vec![hierarchy, roles, cta])
}

fn heading_structure(index: &SemanticHtml5Index) -> MetricCard {
    let h1_count = index.headings.iter().filter(|h| h.level == 1).count();

    let (uniqueness_score, mut recommendations) = match h1_count {
        1 => (15, Vec::new()),
        0 => (
            0,
            vec![Recommendation::new(
                "The page has no <h1>.",
                "Add exactly one <h1> describing the page's main topic.",
                7,
            )],
        ),
        n => (
            0,
            vec![Recommendation::new(
                format!("The page has {n} <h1> elements; exactly one is expected."),
                "Keep exactly one <h1> per page and demote the others to <h2> or lower.",
                6,
            )],
        ),
    };

    let mut sequentiality_score: i64 = 20;
    let mut offending = Vec::new();
    for pair in index.headings.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if curr.level > prev.level + 1 {
            sequentiality_score = (sequentiality_score - 5).max(0);
            offending.push(format!("h{}\u{a0}\"{}\" follows h{}\u{a0}\"{}\"", curr.level, curr.text, prev.level, prev.text));
        }
    }
    if !offending.is_empty() {
        recommendations.push(
            Recommendation::new(
                format!("Heading levels skip unexpectedly: {}.", offending.join("; ")),
                "Do not skip heading levels; each heading should be at most one level deeper than its predecessor.",
                5,
            ),
        );
    }

    let score = uniqueness_score + sequentiality_score;
    let mut card = MetricCard::new("heading-structure", "Heading Structure", 35)
        .explanation("Exactly one <h1> and sequential heading levels help LLMs build a reliable outline.")
        .score(score)
        .recommendations(recommendations)
        .raw_data(serde_json::json!({ "h1Count": h1_count }));
    if card.recommendations_is_empty() {
        card = card.success_message("Headings are unique and sequential.");
    }
    card.build()
}

static SIMULATED_LIST_BULLET: OnceLock<Regex> = OnceLock::new();
static SIMULATED_LIST_NUMBERED: OnceLock<Regex> = OnceLock::new();

fn bullet_re() -> &'static Regex {
    SIMULATED_LIST_BULLET.get_or_init(|| Regex::new(r"^\s*[•\-*+]\s+\w{2,}").unwrap())
}
fn numbered_re() -> &'static Regex {
    SIMULATED_LIST_NUMBERED.get_or_init(|| Regex::new(r"^\s*\d+[.)]\s+\w{2,}").unwrap())
}

fn is_simulated_list_block(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().filter(|l| l.trim().len() > 10).collect();
    if lines.len() < 2 {
        return false;
    }
    let matching = lines
        .iter()
        .filter(|l| bullet_re().is_match(l) || numbered_re().is_match(l))
        .count();
    matching as f64 / lines.len() as f64 >= 0.5
}

static SPACE_RUN: OnceLock<Regex> = OnceLock::new();

fn space_run_re() -> &'static Regex {
    SPACE_RUN.get_or_init(|| Regex::new(r" {4,}").unwrap())
}

fn is_simulated_table_block(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return false;
    }
    let matching = lines
        .iter()
        .filter(|l| {
            let pipe_cols = l.matches('|').count();
            let tab_cols = l.split('\t').filter(|s| !s.is_empty()).count();
            let space_cols = space_run_re().split(l).filter(|s| !s.trim().is_empty()).count();
            pipe_cols >= 2 || tab_cols >= 3 || space_cols >= 2
        })
        .count();
    matching >= 2
}

fn data_grouping(doc: &ParsedDocument) -> MetricCard {
    static SEMANTIC: OnceLock<Selector> = OnceLock::new();
    static PROSE: OnceLock<Selector> = OnceLock::new();
    let semantic_sel = SEMANTIC.get_or_init(|| Selector::parse("ul, ol, table").unwrap());
    let prose_sel = PROSE.get_or_init(|| Selector::parse("p, div").unwrap());

    let semantic_count = doc.document().select(semantic_sel).count();

    let mut score: i64 = 15;
    let mut recommendations = Vec::new();
    let mut simulated_count = 0;

    for el in doc.document().select(prose_sel) {
        let text: String = el.text().collect();
        let (kind, matched) = if is_simulated_list_block(&text) {
            ("list", true)
        } else if is_simulated_table_block(&text) {
            ("table", true)
        } else {
            ("", false)
        };
        if matched {
            simulated_count += 1;
            score = (score - 3).max(0);
            let sample: String = text.lines().take(3).collect::<Vec<_>>().join(" / ");
            let confidence = 0.8;
            recommendations.push(
                Recommendation::new(
                    format!("Text appears to simulate a {kind} using plain characters instead of semantic markup. Sample: \"{sample}\""),
                    format!("Use a real <{}> element instead of manually formatted text.", if kind == "list" { "ul>/<ol" } else { "table" }),
                    round_score(confidence * 6.0) as u8,
                ),
            );
        }
    }

    let mut card = MetricCard::new("data-grouping", "Data Grouping", 15)
        .explanation("Semantic lists and tables are far more reliable for LLMs to parse than visually-formatted prose.")
        .score(score)
        .recommendations(recommendations)
        .raw_data(serde_json::json!({ "semanticCount": semantic_count, "simulatedCount": simulated_count }));
    if card.recommendations_is_empty() {
        card = card.success_message("Grouped data uses semantic lists and tables.");
    }
    card.build()
}

fn main_content_definition(index: &SemanticHtml5Index) -> MetricCard {
    let mut score = 0;
    let mut recommendations = Vec::new();

    match index.main.len() {
        1 => score += 10,
        0 => recommendations.push(Recommendation::new(
            "The page has no <main> element.",
            "Wrap the page's primary content in exactly one <main> element.",
            6,
        )),
        n => recommendations.push(Recommendation::new(
            format!("The page has {n} <main> elements; exactly one is expected."),
            "Keep exactly one <main> element per page.",
            5,
        )),
    }

    if let Some(first_main) = index.main.first() {
        if !first_main.nested_in_excluded_ancestor {
            score += 10;
        } else {
            recommendations.push(Recommendation::new(
                "The <main> element is nested inside an <article>, <aside>, <footer>, <header>, or <nav>.",
                "Move <main> so it is not nested inside another landmark element.",
                4,
            ));
        }
    }

    let mut card = MetricCard::new("main-content-definition", "Main Content Definition", 20)
        .explanation("A single, unnested <main> element clearly marks the page's primary content.")
        .score(score)
        .recommendations(recommendations);
    if card.recommendations_is_empty() {
        card = card.success_message("Main content is clearly and uniquely defined.");
    }
    card.build()
}

/// Whole-word match against `patterns` (spec §4.7 D2 "precise ... whole-word"):
/// tokenizes on non-alphanumeric boundaries rather than substring-matching,
/// so e.g. "navigator" does not match the pattern "nav".
fn matches_whole_word(haystack: &str, patterns: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    let tokens: Vec<&str> = haystack.split(|c: char| !c.is_alphanumeric()).filter(|s| !s.is_empty()).collect();
    patterns.iter().any(|p| tokens.contains(p))
}

fn semantic_region_tagging(doc: &ParsedDocument, index: &SemanticHtml5Index) -> MetricCard {
    static DIV: OnceLock<Selector> = OnceLock::new();
    static ANCHOR: OnceLock<Selector> = OnceLock::new();
    let div_sel = DIV.get_or_init(|| Selector::parse("div").unwrap());
    let anchor_sel = ANCHOR.get_or_init(|| Selector::parse("a[href]").unwrap());

    let nav_patterns = ["nav", "navigation", "main-menu", "nav-menu", "primary-nav"];
    let sidebar_patterns = ["sidebar", "aside", "side-content"];

    let mut score: i64 = 10;
    let mut recommendations = Vec::new();

    for el in doc.document().select(div_sel) {
        let in_nav = el.ancestors().any(|n| n.value().as_element().map(|e| e.name() == "nav").unwrap_or(false));
        if in_nav {
            continue;
        }
        let id = el.value().attr("id").unwrap_or("");
        let class = el.value().attr("class").unwrap_or("");
        let haystack = format!("{id} {class}");

        if matches_whole_word(&haystack, &nav_patterns) {
            let link_count = el.select(anchor_sel).count();
            if link_count >= 2 {
                score = (score - 3).max(0);
                recommendations.push(Recommendation::new(
                    format!("A <div id=\"{id}\" class=\"{class}\"> looks like navigation but is not a <nav> element."),
                    "Use a <nav> element for navigational groups of links.",
                    3,
                ));
                continue;
            }
        }

        let in_aside = el.ancestors().any(|n| n.value().as_element().map(|e| e.name() == "aside").unwrap_or(false));
        if !in_aside && matches_whole_word(&haystack, &sidebar_patterns) {
            let text: String = el.text().collect();
            if text.trim().len() > 20 {
                score = (score - 2).max(0);
                recommendations.push(Recommendation::new(
                    format!("A <div id=\"{id}\" class=\"{class}\"> looks like a sidebar but is not an <aside> element."),
                    "Use an <aside> element for tangential/sidebar content.",
                    2,
                ));
            }
        }
    }

    if index.nav.len() > 1 && index.nav.iter().any(|n| !n.has_aria_label) {
        score = (score - 5).max(0);
        recommendations.push(Recommendation::new(
            "Multiple <nav> elements exist but at least one lacks an aria-label/aria-labelledby.",
            "Give every <nav> element a distinguishing aria-label.",
            3,
        ));
    }

    let mut card = MetricCard::new("semantic-region-tagging", "Semantic Region Tagging", 10)
        .explanation("Structural regions should use the semantic element that matches their role, not lookalike <div>s.")
        .score(score)
        .recommendations(recommendations);
    if card.recommendations_is_empty() {
        card = card.success_message("Structural regions use the correct semantic elements.");
    }
    card.build()
}

fn cta_context_clarity(doc: &ParsedDocument) -> MetricCard {
    static ANCHOR: OnceLock<Selector> = OnceLock::new();
    static BUTTON: OnceLock<Selector> = OnceLock::new();
    let anchor_sel = ANCHOR.get_or_init(|| Selector::parse("a[href]").unwrap());
    let button_sel = BUTTON.get_or_init(|| Selector::parse("button").unwrap());

    let mut total = 0;
    let mut clear = 0;
    let mut offenders = Vec::new();

    for el in doc.document().select(anchor_sel).chain(doc.document().select(button_sel)) {
        total += 1;
        let name = crate::html::accessible_name(&el).unwrap_or_default();
        let is_clear = name.chars().count() >= 4 && !CTA_BLACKLIST.contains(&name.to_lowercase().as_str());
        if is_clear {
            clear += 1;
        } else if offenders.len() < 5 {
            offenders.push(name);
        }
    }

    let score = if total == 0 { 20 } else { round_score(20.0 * clear as f64 / total as f64) };
    let mut card = MetricCard::new("cta-context-clarity", "CTA Context Clarity", 20)
        .explanation("Links and buttons should have self-describing accessible names, not generic phrases like \"click here\".")
        .score(score)
        .raw_data(serde_json::json!({ "total": total, "clear": clear }));

    if !offenders.is_empty() {
        card = card.recommendation(Recommendation::new(
            format!("Some links/buttons have unclear accessible names, e.g. {:?}.", offenders),
            "Rewrite link and button text to describe the destination or action, not \"click here\"/\"read more\".",
            4,
        ));
    } else {
        card = card.success_message("All links and buttons have clear, self-describing names.");
    }
    card.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::build_semantic_index;

    #[test]
    fn single_sequential_h1_scores_full_heading_structure() {
        let doc = ParsedDocument::parse("<html><body><h1>Title</h1><h2>Sub</h2></body></html>");
        let index = build_semantic_index(&doc);
        let section = analyze(&doc, &index);
        let heading_card = &section.drawers[0].cards[0];
        assert_eq!(heading_card.score, 35);
    }

    #[test]
    fn missing_h1_loses_uniqueness_points() {
        let doc = ParsedDocument::parse("<html><body><h2>Sub</h2></body></html>");
        let index = build_semantic_index(&doc);
        let section = analyze(&doc, &index);
        let heading_card = &section.drawers[0].cards[0];
        assert_eq!(heading_card.score, 20);
    }

    #[test]
    fn cta_blacklist_names_are_not_clear() {
        let doc = ParsedDocument::parse(
            r#"<html><body><a href="/a">Click here</a><a href="/b">View pricing plans</a></body></html>"#,
        );
        let index = build_semantic_index(&doc);
        let section = analyze(&doc, &index);
        let cta_card = &section.drawers[2].cards[0];
        assert_eq!(cta_card.score, 10);
    }

    #[test]
    fn simulated_bullet_list_in_paragraph_is_penalized() {
        let doc = ParsedDocument::parse(
            "<html><body><p>- First item here\n- Second item here\n- Third item here</p></body></html>",
        );
        let index = build_semantic_index(&doc);
        let section = analyze(&doc, &index);
        let data_grouping_card = &section.drawers[0].cards[1];
        assert_eq!(data_grouping_card.score, 12);
    }
}
