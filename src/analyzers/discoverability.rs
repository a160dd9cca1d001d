//! Analyzer — Discoverability (C5, spec §4.5): HTTPS/HTTP-status foundation,
//! AI-bot robots.txt access, sitemap quality, and llms.txt detection. The
//! only analyzer that emits a [`GlobalPenalty`] (`robots_txt_blocking`).
//!
//! Grounded on `service/auditor/light.rs`'s checks for
//! crawlability (`check_crawlable_anchors`, canonical/hreflang) generalized
//! from a single-site SEO pass into the AI-bot-access and sitemap-quality
//! checks this spec requires instead.

use crate::analyzers::round_score;
use crate::config::AuditConfig;
use crate::fetch::CollectedData;
use crate::report::{Drawer, GlobalPenalty, MetricCard, Recommendation, Section};
use crate::robots;
use crate::sitemap;
use url::Url;

pub struct DiscoverabilityOutput {
    pub section: Section,
    pub penalties: Vec<GlobalPenalty>,
}

pub fn analyze(url: &Url, collected: &CollectedData, config: &AuditConfig) -> DiscoverabilityOutput {
    let technical = technical_foundation(url, collected);
    let (ai_access, penalties) = ai_bots_access(collected, config);
    let sitemap_quality = sitemap_quality(collected);
    let ai_access_card = ai_access;

    let d2 = Drawer::new(
        "ai-access",
        "AI Access",
        "Whether AI crawlers and search engines can discover and read the site.",
        vec![ai_access_card, sitemap_quality],
    );
    let d3 = llm_instructions(collected);

    let section = Section::new(
        "discoverability",
        "Discoverability",
        20,
        vec![technical, d2, d3],
    );

    DiscoverabilityOutput { section, penalties }
}

fn technical_foundation(url: &Url, collected: &CollectedData) -> Drawer {
    let https_card = if url.scheme() == "https" {
        MetricCard::new("https-protocol", "HTTPS Protocol", 25)
            .explanation("Pages served over HTTPS are trusted and indexed more readily by LLM crawlers.")
            .score(25)
            .success_message("The page is served over HTTPS.")
            .build()
    } else {
        MetricCard::new("https-protocol", "HTTPS Protocol", 25)
            .explanation("Pages served over HTTPS are trusted and indexed more readily by LLM crawlers.")
            .score(0)
            .recommendation(Recommendation::new(
                "The page is served over plain HTTP.",
                "Obtain a TLS certificate and redirect all HTTP traffic to HTTPS.",
                9,
            ))
            .build()
    };

    let status = collected.html.status_code;
    let status_card = if (200..300).contains(&status) {
        MetricCard::new("http-status", "HTTP Status", 25)
            .explanation("A successful HTTP status confirms the page is reachable by crawlers.")
            .score(25)
            .success_message("The page returns a successful HTTP status.")
            .build()
    } else if (300..400).contains(&status) {
        MetricCard::new("http-status", "HTTP Status", 25)
            .explanation("A successful HTTP status confirms the page is reachable by crawlers.")
            .score(15)
            .recommendation(Recommendation::new(
                format!("The page responded with a redirect status ({status})."),
                "Serve the canonical URL directly with a 200 status where possible.",
                4,
            ))
            .build()
    } else {
        MetricCard::new("http-status", "HTTP Status", 25)
            .explanation("A successful HTTP status confirms the page is reachable by crawlers.")
            .score(0)
            .recommendation(Recommendation::new(
                format!("The page could not be retrieved successfully (status {status})."),
                "Fix the underlying error so crawlers receive a 2xx response.",
                10,
            ))
            .build()
    };

    Drawer::new(
        "technical-foundation",
        "Technical Foundation",
        "Baseline reachability signals every crawler checks first.",
        vec![https_card, status_card],
    )
}

fn ai_bots_access(collected: &CollectedData, config: &AuditConfig) -> (MetricCard, Vec<GlobalPenalty>) {
    let rules = collected
        .robots_txt
        .body
        .as_deref()
        .map(robots::parse)
        .unwrap_or_default();

    let total = config.ai_bots.len();
    let blocked: Vec<&String> = config
        .ai_bots
        .iter()
        .filter(|bot| rules.blocks_root(bot))
        .collect();
    let allowed = total - blocked.len();

    let score = round_score(25.0 * allowed as f64 / total.max(1) as f64);
    let mut card = MetricCard::new("ai-bots-access", "AI Bots Access", 25)
        .explanation("Whether the canonical list of AI crawlers are permitted to access the site via robots.txt.")
        .score(score);

    if blocked.is_empty() {
        card = card.success_message("All recognized AI crawlers are allowed to access the site.");
    } else {
        let names = blocked.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
        card = card.recommendation(Recommendation::new(
            format!("robots.txt blocks {} of {} recognized AI crawlers ({names}).", blocked.len(), total),
            "Allow AI crawler user agents in robots.txt if the content should be citable by LLMs.",
            8,
        ));
    }

    if !rules.has_sitemap_directive() {
        card = card.recommendation(Recommendation::new(
            "robots.txt does not declare a Sitemap: directive.",
            "Add a `Sitemap:` line to robots.txt pointing at the sitemap URL.",
            2,
        ));
    }

    let blocked_ratio = blocked.len() as f64 / total.max(1) as f64;
    let penalty_factor = if blocked.len() == total {
        0.7
    } else if blocked_ratio > 0.5 {
        0.4
    } else {
        0.0
    };

    let penalties = if penalty_factor > 0.0 {
        vec![GlobalPenalty {
            kind: "robots_txt_blocking".to_string(),
            description: "robots.txt blocks a majority of recognized AI crawlers from accessing the site.".to_string(),
            penalty_factor,
            details: blocked.iter().map(|s| s.to_string()).collect(),
            solutions: vec!["Allow AI crawler user agents in robots.txt.".to_string()],
        }]
    } else {
        Vec::new()
    };

    (card.build(), penalties)
}

fn sitemap_quality(collected: &CollectedData) -> MetricCard {
    let card = MetricCard::new("sitemap-quality", "Sitemap Quality", 25)
        .explanation("Whether a sitemap is present and carries freshness signals.");

    if !collected.sitemap.success {
        return card
            .score(0)
            .recommendation(Recommendation::new(
                "No sitemap.xml could be retrieved.",
                "Publish a sitemap.xml listing the site's canonical URLs.",
                6,
            ))
            .build();
    }

    let body = collected.sitemap.body.as_deref().unwrap_or_default();
    let summary = sitemap::parse(body);

    if !summary.well_formed {
        return card
            .score(15)
            .recommendation(Recommendation::new(
                "The sitemap was found but is not well-formed XML.",
                "Validate the sitemap against the sitemaps.org XML schema.",
                4,
            ))
            .raw_data(serde_json::json!({ "urlCount": summary.urls.len() }))
            .build();
    }

    let mut score = 15;
    if summary.has_lastmod {
        score += 10;
    } else {
        return card
            .score(score)
            .recommendation(Recommendation::new(
                "The sitemap has no <lastmod> tags.",
                "Add <lastmod> dates so crawlers can prioritize freshly updated pages.",
                3,
            ))
            .raw_data(serde_json::json!({ "urlCount": summary.urls.len() }))
            .build();
    }

    card.score(score)
        .success_message("The sitemap is well-formed and includes freshness metadata.")
        .raw_data(serde_json::json!({ "urlCount": summary.urls.len() }))
        .build()
}

fn llm_instructions(collected: &CollectedData) -> Drawer {
    let found = collected.llms_txt.success;
    let card = MetricCard::new("llm-instructions", "LLM Instructions File", 0)
        .explanation("Informational: whether an llms.txt or llms-full.txt file was found. Never affects the score.")
        .score(0);

    let card = if found {
        card.success_message("An llms.txt (or llms-full.txt) file was found.")
    } else {
        card.recommendation(Recommendation::new(
            "No llms.txt or llms-full.txt file was found.",
            "Publish an llms.txt file summarizing the site for LLM consumers.",
            1,
        ))
    };

    Drawer::new(
        "llm-instructions",
        "LLM Instructions",
        "Presence of an llms.txt instructions file (informational only).",
        vec![card.build()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchResult;

    fn fetch_ok(body: &str) -> FetchResult {
        FetchResult {
            success: true,
            body: Some(body.to_string()),
            status_code: 200,
            content_length: body.len(),
            response_time_ms: 1,
            error: None,
            error_message: None,
        }
    }

    fn fetch_fail() -> FetchResult {
        FetchResult {
            success: false,
            body: None,
            status_code: 0,
            content_length: 0,
            response_time_ms: 1,
            error: None,
            error_message: None,
        }
    }

    fn collected_with(robots_body: &str, sitemap_body: &str, llms_ok: bool) -> CollectedData {
        CollectedData {
            url: Url::parse("https://example.test/").unwrap(),
            html: fetch_ok("<html></html>"),
            robots_txt: fetch_ok(robots_body),
            sitemap: fetch_ok(sitemap_body),
            llms_txt: if llms_ok { fetch_ok("summary") } else { fetch_fail() },
        }
    }

    #[test]
    fn all_bots_allowed_emits_no_penalty() {
        let collected = collected_with(
            "User-agent: *\nAllow: /\nSitemap: https://example.test/sitemap.xml\n",
            "<urlset><url><loc>https://example.test/</loc><lastmod>2024-01-01</lastmod></url></urlset>",
            true,
        );
        let config = AuditConfig::default();
        let url = Url::parse("https://example.test/").unwrap();
        let output = analyze(&url, &collected, &config);
        assert!(output.penalties.is_empty());
        assert!(output.section.total_score >= 95);
    }

    #[test]
    fn all_bots_blocked_emits_severe_penalty() {
        let mut robots = "User-agent: *\nAllow: /\n".to_string();
        for bot in crate::config::DEFAULT_AI_BOTS {
            robots.push_str(&format!("User-agent: {bot}\nDisallow: /\n"));
        }
        let collected = collected_with(&robots, "", false);
        let config = AuditConfig::default();
        let url = Url::parse("https://example.test/").unwrap();
        let output = analyze(&url, &collected, &config);
        assert_eq!(output.penalties.len(), 1);
        assert_eq!(output.penalties[0].penalty_factor, 0.7);
    }

    #[test]
    fn four_of_seven_blocked_emits_majority_penalty() {
        let mut robots = "User-agent: *\nAllow: /\n".to_string();
        for bot in &crate::config::DEFAULT_AI_BOTS[0..4] {
            robots.push_str(&format!("User-agent: {bot}\nDisallow: /\n"));
        }
        let collected = collected_with(&robots, "", false);
        let config = AuditConfig::default();
        let url = Url::parse("https://example.test/").unwrap();
        let output = analyze(&url, &collected, &config);
        assert_eq!(output.penalties.len(), 1);
        assert_eq!(output.penalties[0].penalty_factor, 0.4);
    }

    #[test]
    fn http_scheme_scores_zero_for_https_card() {
        let collected = collected_with("", "", false);
        let config = AuditConfig::default();
        let url = Url::parse("http://example.test/").unwrap();
        let output = analyze(&url, &collected, &config);
        let technical = &output.section.drawers[0];
        assert_eq!(technical.cards[0].score, 0);
    }
}
