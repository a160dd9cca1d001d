//! Analyzer — Accessibility (C8, spec §4.8): static content availability,
//! image alt coverage, the C4 performance probe result, image optimization,
//! and navigational accessibility.
//!
//! Grounded on `service/auditor/light.rs`'s image-alt and
//! word-count style checks, extended with the Core Web Vitals consumption
//! this spec requires (Lighthouse scores are read in
//! `service/lighthouse.rs`; here that becomes the C4 [`ProbeResult`]).

use crate::analyzers::round_score;
use crate::html::{ParsedDocument, SemanticHtml5Index};
use crate::probe::ProbeResult;
use crate::report::{Drawer, MetricCard, Recommendation, Section};
use scraper::Selector;
use std::sync::OnceLock;

pub fn analyze(doc: &ParsedDocument, index: &SemanticHtml5Index, probe: &ProbeResult) -> Section {
    let content = Drawer::new(
        "content-accessibility",
        "Content Accessibility",
        "Whether there is enough static, readable content for crawlers without JavaScript.",
        vec![static_content_availability(doc), image_accessibility(doc)],
    );

    let technical = Drawer::new(
        "technical-accessibility-performance",
        "Technical Accessibility & Performance",
        "Core Web Vitals and image delivery efficiency.",
        vec![performance_and_vitals(probe), image_optimization(doc)],
    );

    let navigation = Drawer::new(
        "navigational-accessibility",
        "Navigational Accessibility",
        "Whether the page exposes crawlable, well-labeled navigation.",
        vec![navigational_accessibility(doc, index)],
    );

    Section::new("accessibility", "Accessibility", 15, vec![content, technical, navigation])
}

fn static_content_availability(doc: &ParsedDocument) -> MetricCard {
    let body_text = doc.body_text();
    let word_count = body_text.split_whitespace().count();
    let ratio = if doc.raw_len() == 0 {
        0.0
    } else {
        body_text.len() as f64 / doc.raw_len() as f64 * 100.0
    };

    let mut score = 0;
    let mut recommendations = Vec::new();

    if word_count >= 300 {
        score += 10;
    } else {
        recommendations.push(Recommendation::new(
            format!("The page has only {word_count} words of body text."),
            "Add substantive, crawlable body text (aim for 300+ words).",
            6,
        ));
    }

    if ratio >= 15.0 {
        score += 10;
    } else {
        recommendations.push(Recommendation::new(
            format!("Text-to-HTML ratio is {ratio:.1}%, below the 15% target."),
            "Reduce markup bloat or add more visible text content relative to HTML size.",
            4,
        ));
    }

    let mut card = MetricCard::new("static-content-availability", "Static Content Availability", 20)
        .explanation("Crawlers that do not execute JavaScript rely entirely on the static HTML's text.")
        .score(score)
        .recommendations(recommendations)
        .raw_data(serde_json::json!({ "wordCount": word_count, "textToHtmlRatio": ratio }));
    if card.recommendations_is_empty() {
        card = card.success_message("The page has ample static text content.");
    }
    card.build()
}

fn image_accessibility(doc: &ParsedDocument) -> MetricCard {
    static IMG: OnceLock<Selector> = OnceLock::new();
    let img_sel = IMG.get_or_init(|| Selector::parse("img").unwrap());

    let images: Vec<_> = doc.document().select(img_sel).collect();
    if images.is_empty() {
        return MetricCard::new("image-accessibility", "Image Accessibility", 20)
            .explanation("Coverage of non-empty alt text across all <img> elements.")
            .score(20)
            .success_message("The page has no images requiring alt text.")
            .build();
    }

    let with_alt = images
        .iter()
        .filter(|img| img.value().attr("alt").map(|a| !a.trim().is_empty()).unwrap_or(false))
        .count();
    let coverage = with_alt as f64 / images.len() as f64;
    let score = round_score(20.0 * coverage);

    let mut card = MetricCard::new("image-accessibility", "Image Accessibility", 20)
        .explanation("Coverage of non-empty alt text across all <img> elements.")
        .score(score)
        .raw_data(serde_json::json!({ "total": images.len(), "withAlt": with_alt }));

    if with_alt < images.len() {
        card = card.recommendation(Recommendation::new(
            format!("{} of {} images are missing alt text.", images.len() - with_alt, images.len()),
            "Add descriptive alt text to every meaningful image.",
            5,
        ));
    } else {
        card = card.success_message("All images have alt text.");
    }
    card.build()
}

fn performance_and_vitals(probe: &ProbeResult) -> MetricCard {
    let score = round_score(probe.performance_score / 100.0 * 25.0);
    let mut card = MetricCard::new("performance-core-web-vitals", "Performance Score & Core Web Vitals", 25)
        .explanation("Real-world loading performance, as measured by an external Core Web Vitals probe.")
        .score(score)
        .raw_data(serde_json::json!({
            "performanceScore": probe.performance_score,
            "lcpMs": probe.core_web_vitals.lcp_ms,
            "inpMs": probe.core_web_vitals.inp_ms,
            "cls": probe.core_web_vitals.cls,
            "successful": probe.successful,
        }));

    if !probe.successful {
        card = card.recommendation(Recommendation::new(
            "The external performance probe could not be reached; this score is a synthesized fallback.",
            "Run a Core Web Vitals tool (e.g. PageSpeed Insights) manually to get a reliable reading.",
            3,
        ));
    }
    if probe.performance_score < 75.0 {
        card = card.recommendation(Recommendation::new(
            format!("Overall performance score is {:.0}, below the 75 target.", probe.performance_score),
            "Reduce render-blocking resources and optimize the critical rendering path.",
            5,
        ));
    }
    if probe.core_web_vitals.lcp_ms > 2500.0 {
        card = card.recommendation(Recommendation::new(
            format!("Largest Contentful Paint is {:.0}ms, above the 2500ms target.", probe.core_web_vitals.lcp_ms),
            "Optimize the largest above-the-fold image or text block's load time.",
            5,
        ));
    }
    if probe.core_web_vitals.inp_ms > 200.0 {
        card = card.recommendation(Recommendation::new(
            format!("Interaction to Next Paint is {:.0}ms, above the 200ms target.", probe.core_web_vitals.inp_ms),
            "Reduce main-thread work triggered by user interactions.",
            4,
        ));
    }
    if probe.core_web_vitals.cls > 0.1 {
        card = card.recommendation(Recommendation::new(
            format!("Cumulative Layout Shift is {:.2}, above the 0.1 target.", probe.core_web_vitals.cls),
            "Reserve space for images/ads/fonts to avoid layout shifts.",
            4,
        ));
    }
    if card.recommendations_is_empty() {
        card = card.success_message("Performance and Core Web Vitals are within healthy ranges.");
    }
    card.build()
}

fn image_optimization(doc: &ParsedDocument) -> MetricCard {
    static IMG: OnceLock<Selector> = OnceLock::new();
    let img_sel = IMG.get_or_init(|| Selector::parse("img").unwrap());

    let images: Vec<_> = doc.document().select(img_sel).collect();
    if images.is_empty() {
        return MetricCard::new("image-optimization", "Image Optimization", 10)
            .explanation("Modern image formats and lazy loading reduce bandwidth and speed up rendering.")
            .score(10)
            .success_message("The page has no images to optimize.")
            .build();
    }

    let modern_count = images
        .iter()
        .filter(|img| {
            img.value()
                .attr("src")
                .map(|src| {
                    let lower = src.to_lowercase();
                    lower.ends_with(".webp") || lower.ends_with(".avif")
                })
                .unwrap_or(false)
        })
        .count();
    let lazy_count = images
        .iter()
        .filter(|img| img.value().attr("loading").map(|l| l.eq_ignore_ascii_case("lazy")).unwrap_or(false))
        .count();

    let modern_ratio = modern_count as f64 / images.len() as f64;
    let lazy_ratio = lazy_count as f64 / images.len() as f64;
    let score = round_score(5.0 * modern_ratio) + round_score(5.0 * lazy_ratio);

    let mut card = MetricCard::new("image-optimization", "Image Optimization", 10)
        .explanation("Modern image formats and lazy loading reduce bandwidth and speed up rendering.")
        .score(score)
        .raw_data(serde_json::json!({ "modernRatio": modern_ratio, "lazyRatio": lazy_ratio }));

    if modern_ratio < 0.3 {
        card = card.recommendation(Recommendation::new(
            "Few images use modern formats (WebP/AVIF).",
            "Convert images to WebP or AVIF where possible.",
            3,
        ));
    }
    if lazy_ratio < 0.5 {
        card = card.recommendation(Recommendation::new(
            "Few below-the-fold images use loading=\"lazy\".",
            "Add loading=\"lazy\" to offscreen images.",
            2,
        ));
    }
    if card.recommendations_is_empty() {
        card = card.success_message("Images are well-optimized for format and loading strategy.");
    }
    card.build()
}

fn navigational_accessibility(doc: &ParsedDocument, index: &SemanticHtml5Index) -> MetricCard {
    static NAV_ANCHOR: OnceLock<Selector> = OnceLock::new();
    static BREADCRUMB: OnceLock<Selector> = OnceLock::new();
    let nav_anchor_sel = NAV_ANCHOR.get_or_init(|| Selector::parse("nav a[href]").unwrap());
    let breadcrumb_sel = BREADCRUMB.get_or_init(|| {
        Selector::parse("[aria-label*='breadcrumb' i], .breadcrumb, #breadcrumb, [class*='breadcrumb' i], [id*='breadcrumb' i]")
            .unwrap()
    });

    let mut score: i64 = 25;
    let mut recommendations = Vec::new();

    if index.nav.is_empty() {
        score -= 15;
        recommendations.push(Recommendation::new(
            "The page has no <nav> element.",
            "Add a <nav> element wrapping the site's primary navigation links.",
            8,
        ));
    } else if doc.document().select(nav_anchor_sel).next().is_none() {
        score -= 10;
        recommendations.push(Recommendation::new(
            "No <nav> element contains any static links.",
            "Ensure primary navigation links are present as static <a href> elements inside <nav>.",
            5,
        ));
    }

    if doc.document().select(breadcrumb_sel).next().is_none() {
        recommendations.push(Recommendation::new(
            "No breadcrumb navigation was detected.",
            "Add a breadcrumb trail to help crawlers and users understand page hierarchy.",
            1,
        ));
    }

    if index.nav.len() > 1 && index.nav.iter().any(|n| !n.has_aria_label) {
        recommendations.push(Recommendation::new(
            "Multiple <nav> elements exist but at least one lacks an aria-label.",
            "Give every <nav> element a distinguishing aria-label.",
            1,
        ));
    }

    let mut card = MetricCard::new("navigational-accessibility", "Navigational Accessibility", 25)
        .explanation("Crawlable, well-labeled navigation helps LLMs understand and traverse the site.")
        .score(score)
        .recommendations(recommendations);
    if card.recommendations_is_empty() {
        card = card.success_message("Navigation is present, crawlable, and well-labeled.");
    }
    card.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::build_semantic_index;
    use crate::probe::CoreWebVitals;

    fn healthy_probe() -> ProbeResult {
        ProbeResult {
            performance_score: 90.0,
            core_web_vitals: CoreWebVitals { lcp_ms: 1800.0, inp_ms: 100.0, cls: 0.02 },
            successful: true,
            retry_count: 0,
        }
    }

    #[test]
    fn missing_nav_loses_fifteen_points() {
        let doc = ParsedDocument::parse("<html><body><p>no nav here</p></body></html>");
        let index = build_semantic_index(&doc);
        let section = analyze(&doc, &index, &healthy_probe());
        let nav_card = &section.drawers[2].cards[0];
        assert_eq!(nav_card.score, 10);
    }

    #[test]
    fn short_content_and_missing_alt_score_zero() {
        // Padding with near-empty <div>s keeps the visible word count low
        // while inflating the raw document length, so the text-to-HTML
        // ratio check fails alongside the word-count check.
        let padding = "<div class=\"layout-grid\"></div>".repeat(20);
        let words = "word ".repeat(10);
        let doc = ParsedDocument::parse(&format!(
            "<html><body>{padding}<p>{words}</p><img src=\"a.jpg\"></body></html>"
        ));
        let index = build_semantic_index(&doc);
        let section = analyze(&doc, &index, &healthy_probe());
        let content = &section.drawers[0];
        assert_eq!(content.cards[0].score, 0);
        assert_eq!(content.cards[1].score, 0);
    }

    #[test]
    fn probe_fallback_surfaces_manual_check_recommendation() {
        let doc = ParsedDocument::parse("<html><body><p>text</p></body></html>");
        let index = build_semantic_index(&doc);
        let fallback = ProbeResult {
            performance_score: 55.0,
            core_web_vitals: CoreWebVitals::default(),
            successful: false,
            retry_count: 2,
        };
        let section = analyze(&doc, &index, &fallback);
        let perf_card = &section.drawers[1].cards[0];
        assert!(!perf_card.recommendations.is_empty());
    }
}
