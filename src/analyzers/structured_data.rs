//! Analyzer — Structured Data (C6, spec §4.6): JSON-LD schema detection and
//! validation, meta tag quality/consistency, and Open Graph coverage.
//!
//! Grounded on `service/auditor/light.rs`'s meta/canonical
//! checks (title length thresholds, canonical presence) generalized here
//! with the schema-graph reasoning this spec additionally requires; JSON-LD
//! extraction follows the same `OnceLock<Selector>` caching idiom used
//! throughout `html/mod.rs`.

use crate::analyzers::{jaccard, round_score};
use crate::html::{BasicMetadata, ParsedDocument};
use crate::report::{Drawer, MetricCard, Recommendation, Section};
use scraper::Selector;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// One successfully-parsed JSON-LD block and the `@type`(s) it declares.
struct JsonLdBlock {
    value: Value,
    types: Vec<String>,
}

fn ld_json_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("script[type='application/ld+json']").unwrap())
}

/// Parse every `<script type="application/ld+json">` block, returning the
/// successfully-parsed blocks and a count of malformed ones.
fn extract_json_ld(doc: &ParsedDocument) -> (Vec<JsonLdBlock>, usize) {
    let mut blocks = Vec::new();
    let mut malformed = 0;
    for el in doc.document().select(ld_json_selector()) {
        let text: String = el.text().collect();
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => {
                let types = collect_types(&value);
                blocks.push(JsonLdBlock { value, types });
            }
            Err(_) => malformed += 1,
        }
    }
    (blocks, malformed)
}

fn collect_types(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => {
            if let Some(graph) = map.get("@graph").and_then(|g| g.as_array()) {
                return graph.iter().flat_map(collect_types).collect();
            }
            match map.get("@type") {
                Some(Value::String(s)) => vec![s.clone()],
                Some(Value::Array(arr)) => arr
                    .iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect(),
                _ => Vec::new(),
            }
        }
        Value::Array(items) => items.iter().flat_map(collect_types).collect(),
        _ => Vec::new(),
    }
}

fn required_fields(type_name: &str) -> &'static [&'static str] {
    match type_name {
        "Article" | "BlogPosting" | "NewsArticle" => &["headline", "author"],
        "Product" => &["name", "description"],
        "LocalBusiness" => &["name", "address"],
        "Organization" => &["name"],
        "WebSite" => &["name", "url"],
        "Service" => &["name"],
        "Recipe" => &["name", "recipeIngredient", "recipeInstructions"],
        "Event" => &["name", "startDate", "location"],
        "FAQPage" => &["mainEntity"],
        "BreadcrumbList" => &["itemListElement"],
        "Person" => &["name"],
        _ => &[],
    }
}

/// Weight each enrichment schema contributes toward the 20-point cap; the
/// spec names the six schema types but leaves per-type weights to the
/// implementation ("see fixed weight table").
fn enrichment_weight(type_name: &str) -> i64 {
    match type_name {
        "FAQPage" => 6,
        "Recipe" => 6,
        "Review" => 4,
        "AggregateRating" => 4,
        "Event" => 4,
        "Person" => 3,
        _ => 0,
    }
}

const MAIN_ENTITY_TYPES: &[&str] = &[
    "Article",
    "BlogPosting",
    "NewsArticle",
    "Product",
    "LocalBusiness",
    "Service",
];
const ENRICHMENT_TYPES: &[&str] = &["FAQPage", "Review", "AggregateRating", "Recipe", "Event", "Person"];

pub fn analyze(doc: &ParsedDocument, metadata: &BasicMetadata) -> Section {
    let (blocks, malformed) = extract_json_ld(doc);
    let all_types: Vec<&str> = blocks.iter().flat_map(|b| b.types.iter().map(|s| s.as_str())).collect();

    let json_ld_drawer = Drawer::new(
        "json-ld",
        "JSON-LD Structured Data",
        "Schema.org structured data describing the page's entities.",
        vec![
            identity_and_structure(&all_types, malformed),
            main_entity(&blocks, &all_types),
            enrichment_schemas(&all_types),
            graph_connectivity(&blocks),
        ],
    );

    let meta_tags_drawer = meta_tags(metadata, doc);
    let og_drawer = open_graph(doc);

    Section::new(
        "structuredData",
        "Structured Data",
        25,
        vec![json_ld_drawer, meta_tags_drawer, og_drawer],
    )
}

fn identity_and_structure(all_types: &[&str], malformed: usize) -> MetricCard {
    let mut score = 0;
    let has_org = all_types.contains(&"Organization");
    let has_website = all_types.contains(&"WebSite");
    let has_breadcrumb = all_types.contains(&"BreadcrumbList");

    if has_org {
        score += 10;
    }
    if has_website {
        score += 10;
    }
    if has_breadcrumb {
        score += 10;
    }

    let mut card = MetricCard::new("identity-structure", "Identity & Structure", 30)
        .explanation("Foundational schemas that establish the site's identity and navigational structure.")
        .score(score)
        .raw_data(serde_json::json!({ "malformedBlocks": malformed }));

    if !has_org {
        card = card.recommendation(Recommendation::new(
            "No Organization schema was found.",
            "Add an Organization JSON-LD block describing the publisher.",
            4,
        ));
    }
    if !has_website {
        card = card.recommendation(Recommendation::new(
            "No WebSite schema was found.",
            "Add a WebSite JSON-LD block with the site name and URL.",
            3,
        ));
    }
    if !has_breadcrumb {
        card = card.recommendation(Recommendation::new(
            "No BreadcrumbList schema was found.",
            "Add a BreadcrumbList JSON-LD block reflecting the page's position in the site hierarchy.",
            2,
        ));
    }
    if malformed > 0 {
        card = card.recommendation(Recommendation::new(
            format!("{malformed} JSON-LD block(s) failed to parse as valid JSON."),
            "Validate JSON-LD blocks with a schema linter before publishing.",
            5,
        ));
    }
    if card.recommendations_is_empty() {
        card = card.success_message("Foundational identity and structure schemas are present.");
    }
    card.build()
}

fn main_entity(blocks: &[JsonLdBlock], all_types: &[&str]) -> MetricCard {
    let card = MetricCard::new("main-entity", "Main Entity", 50)
        .explanation("The page's primary entity, described with enough required fields to be citable.");

    let Some(entity_type) = MAIN_ENTITY_TYPES.iter().find(|t| all_types.contains(t)) else {
        return card
            .score(0)
            .recommendation(Recommendation::new(
                "No primary entity schema (Article, Product, LocalBusiness, etc.) was found.",
                "Add a JSON-LD block for the page's main entity type.",
                8,
            ))
            .build();
    };

    let block = blocks.iter().find(|b| b.types.iter().any(|t| t == entity_type));
    let required = required_fields(entity_type);
    if required.is_empty() || block.is_none() {
        return card
            .score(25)
            .raw_data(serde_json::json!({ "entityType": entity_type }))
            .recommendation(Recommendation::new(
                format!("A {entity_type} schema was found but could not be fully validated."),
                "Ensure the required fields for this schema type are present.",
                4,
            ))
            .build();
    }
    let block = block.unwrap();

    let present = required
        .iter()
        .filter(|field| field_present(&block.value, field))
        .count();
    let ratio = present as f64 / required.len() as f64;
    let score = round_score(50.0 * ratio);

    let mut card = card.score(score).raw_data(serde_json::json!({ "entityType": entity_type }));
    if present < required.len() {
        let missing: Vec<&str> = required
            .iter()
            .filter(|field| !field_present(&block.value, field))
            .copied()
            .collect();
        card = card.recommendation(Recommendation::new(
            format!("The {entity_type} schema is missing required field(s): {}.", missing.join(", ")),
            "Add the missing required fields to the main entity's JSON-LD block.",
            6,
        ));
    } else {
        card = card.success_message(format!("The {entity_type} schema includes all required fields."));
    }
    card.build()
}

fn field_present(value: &Value, field: &str) -> bool {
    match value {
        Value::Object(map) => map
            .get(field)
            .map(|v| !v.is_null() && v != &Value::String(String::new()))
            .unwrap_or(false),
        _ => false,
    }
}

fn enrichment_schemas(all_types: &[&str]) -> MetricCard {
    let mut raw_score = 0;
    let mut found = Vec::new();
    for type_name in ENRICHMENT_TYPES {
        if all_types.contains(type_name) {
            raw_score += enrichment_weight(type_name);
            found.push(*type_name);
        }
    }
    let score = raw_score.min(20);

    let mut card = MetricCard::new("enrichment-schemas", "Enrichment Schemas", 20)
        .explanation("Additional schemas (FAQPage, Review, Recipe, Event, Person, etc.) that enrich citability.")
        .score(score)
        .raw_data(serde_json::json!({ "found": found }));

    if found.is_empty() {
        card = card.recommendation(Recommendation::new(
            "No enrichment schemas (FAQPage, Review, Recipe, Event, Person) were found.",
            "Add enrichment schemas relevant to the page's content.",
            2,
        ));
    } else {
        card = card.success_message(format!("Enrichment schemas present: {}.", found.join(", ")));
    }
    card.build()
}

fn graph_connectivity(blocks: &[JsonLdBlock]) -> MetricCard {
    let connected = blocks.iter().any(|b| {
        matches!(&b.value, Value::Object(map) if {
            map.contains_key("sameAs")
                || map.get("author").map(|v| !v.is_null()).unwrap_or(false)
                || map.get("publisher").map(|v| !v.is_null()).unwrap_or(false)
                || map.get("@id").map(|v| !v.is_null()).unwrap_or(false)
        })
    }) && blocks.len() > 1;

    let card = MetricCard::new("graph-connectivity", "Graph Connectivity", 10)
        .explanation("Whether structured data blocks reference each other, forming a connected knowledge graph.");

    if connected {
        card.score(10)
            .success_message("Structured data blocks reference each other via @id, sameAs, author, or publisher.")
            .build()
    } else {
        card.score(0)
            .recommendation(Recommendation::new(
                "Structured data blocks do not appear to reference each other.",
                "Link related schemas together with @id references, sameAs, author, or publisher.",
                2,
            ))
            .build()
    }
}

fn meta_tags(metadata: &BasicMetadata, doc: &ParsedDocument) -> Drawer {
    let og = extract_og_tags(doc);

    let mut score = 0;
    let mut recommendations = Vec::new();

    match &metadata.title {
        Some(title) if (50..=60).contains(&title.chars().count()) => score += 10,
        Some(title) if (30..=70).contains(&title.chars().count()) => score += 6,
        Some(title) => {
            recommendations.push(Recommendation::new(
                format!("Title length ({} chars) is outside the recommended range.", title.chars().count()),
                "Aim for a title between 50 and 60 characters.",
                4,
            ));
        }
        None => {
            recommendations.push(Recommendation::new(
                "No <title> tag was found.",
                "Add a descriptive <title> tag.",
                8,
            ));
        }
    }

    match &metadata.meta_description {
        Some(desc) if (140..=160).contains(&desc.chars().count()) => score += 10,
        Some(desc) if (120..=170).contains(&desc.chars().count()) => score += 6,
        Some(desc) => {
            recommendations.push(Recommendation::new(
                format!("Meta description length ({} chars) is outside the recommended range.", desc.chars().count()),
                "Aim for a meta description between 140 and 160 characters.",
                4,
            ));
        }
        None => {
            recommendations.push(Recommendation::new(
                "No meta description was found.",
                "Add a meta description summarizing the page.",
                6,
            ));
        }
    }

    let title_similarity = match (&metadata.title, og.get("og:title")) {
        (Some(title), Some(og_title)) => jaccard(title, og_title),
        _ => 0.0,
    };
    let desc_similarity = match (&metadata.meta_description, og.get("og:description")) {
        (Some(desc), Some(og_desc)) => jaccard(desc, og_desc),
        _ => 0.0,
    };
    if title_similarity >= 0.5 && desc_similarity >= 0.5 {
        score += 5;
    } else {
        recommendations.push(Recommendation::new(
            "Title/description do not closely match their Open Graph counterparts.",
            "Keep og:title and og:description consistent with <title> and the meta description.",
            2,
        ));
    }

    if metadata.meta_viewport.is_some() {
        score += 4;
    } else {
        recommendations.push(Recommendation::new(
            "No viewport meta tag was found.",
            "Add <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">.",
            3,
        ));
    }
    if metadata.meta_charset.is_some() {
        score += 3;
    } else {
        recommendations.push(Recommendation::new(
            "No charset meta tag was found.",
            "Add <meta charset=\"utf-8\">.",
            2,
        ));
    }
    if metadata.meta_robots.is_some() {
        score += 3;
    } else {
        recommendations.push(Recommendation::new(
            "No robots meta tag was found.",
            "Add a meta robots tag, even if it is index,follow.",
            1,
        ));
    }

    let mut card = MetricCard::new("meta-tags", "Meta Tags", 35)
        .explanation("Title, description, technical meta tags, and their consistency with Open Graph.")
        .score(score)
        .recommendations(recommendations);
    if card.recommendations_is_empty() {
        card = card.success_message("Meta tags are complete, well-sized, and consistent.");
    }

    Drawer::new("meta-tags", "Meta Tags", "Core page metadata.", vec![card.build()])
}

fn extract_og_tags(doc: &ParsedDocument) -> HashMap<String, String> {
    static SEL: OnceLock<Selector> = OnceLock::new();
    let selector = SEL.get_or_init(|| Selector::parse("meta[property^='og:' i]").unwrap());
    doc.document()
        .select(selector)
        .filter_map(|el| {
            let property = el.value().attr("property")?.to_lowercase();
            let content = el.value().attr("content")?.to_string();
            Some((property, content))
        })
        .collect()
}

fn open_graph(doc: &ParsedDocument) -> Drawer {
    let og = extract_og_tags(doc);

    let basic_tags = ["og:title", "og:type", "og:url", "og:description"];
    let present = basic_tags.iter().filter(|t| og.contains_key(**t)).count();
    let basic_score = round_score(15.0 * present as f64 / basic_tags.len() as f64);

    let image_present = og
        .get("og:image")
        .map(|v| v.starts_with("http://") || v.starts_with("https://"))
        .unwrap_or(false);
    let image_score = if image_present { 10 } else { 0 };

    let score = basic_score + image_score;
    let mut card = MetricCard::new("open-graph", "Social Meta / Open Graph", 25)
        .explanation("Open Graph tags controlling how the page appears when shared or cited.")
        .score(score);

    if present < basic_tags.len() {
        let missing: Vec<&str> = basic_tags.iter().filter(|t| !og.contains_key(**t)).copied().collect();
        card = card.recommendation(Recommendation::new(
            format!("Missing Open Graph tag(s): {}.", missing.join(", ")),
            "Add the missing og: meta tags.",
            3,
        ));
    }
    if !image_present {
        card = card.recommendation(Recommendation::new(
            "No absolute-URL og:image tag was found.",
            "Add an og:image meta tag with an absolute image URL.",
            3,
        ));
    }
    if card.recommendations_is_empty() {
        card = card.success_message("Open Graph tags are complete.");
    }

    Drawer::new("open-graph", "Social Meta / Open Graph", "Sharing metadata.", vec![card.build()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::extract_basic_metadata;

    #[test]
    fn detects_organization_and_website_schemas() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type": "Organization", "name": "Acme"}</script>
            <script type="application/ld+json">{"@type": "WebSite", "name": "Acme", "url": "https://example.test/"}</script>
        </head><body></body></html>"#;
        let doc = ParsedDocument::parse(html);
        let metadata = extract_basic_metadata(&doc);
        let section = analyze(&doc, &metadata);
        let json_ld = &section.drawers[0];
        assert_eq!(json_ld.cards[0].score, 20);
    }

    #[test]
    fn malformed_json_ld_is_counted_not_fatal() {
        let html = r#"<html><head><script type="application/ld+json">{not valid json</script></head><body></body></html>"#;
        let doc = ParsedDocument::parse(html);
        let metadata = extract_basic_metadata(&doc);
        let section = analyze(&doc, &metadata);
        assert_eq!(section.drawers[0].cards[0].raw_data["malformedBlocks"], 1);
    }

    #[test]
    fn article_with_all_required_fields_scores_full_main_entity() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type": "Article", "headline": "Title", "author": "Jane"}</script>
        </head><body></body></html>"#;
        let doc = ParsedDocument::parse(html);
        let metadata = extract_basic_metadata(&doc);
        let section = analyze(&doc, &metadata);
        let main_entity = &section.drawers[0].cards[1];
        assert_eq!(main_entity.score, 50);
    }
}
