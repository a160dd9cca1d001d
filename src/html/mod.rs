//! HTML Parser & Shared Semantic Index (spec §4.3): HTML is parsed once per
//! audit into an immutable [`ParsedDocument`]; a [`SemanticHtml5Index`] is
//! computed in a single traversal and shared read-only by every analyzer
//! that needs structural facts, removing the historical pattern
//! of each analyzer re-selecting the same tags (compare
//! `extractor/page_extractor.rs`'s per-call `OnceLock<Selector>` helpers,
//! which this module centralizes and extends with ancestor tracking).

use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// An immutable, parsed HTML document. Cheap to share by reference across
/// concurrently-running analyzers — `scraper::Html` has no interior
/// mutability.
pub struct ParsedDocument {
    html: Html,
    raw_len: usize,
}

impl ParsedDocument {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
            raw_len: body.len(),
        }
    }

    pub fn document(&self) -> &Html {
        &self.html
    }

    pub fn raw_len(&self) -> usize {
        self.raw_len
    }

    pub fn select<'a>(&'a self, selector: &'a Selector) -> scraper::html::Select<'a, 'a> {
        self.html.select(selector)
    }

    /// Visible text of `<body>` (script/style content is never selected
    /// into `.text()` by `scraper`, so no manual stripping is needed).
    pub fn body_text(&self) -> String {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("body").unwrap());
        self.html
            .select(selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default()
    }
}

/// `<title>`, meta description/charset/viewport/robots, and canonical link
/// (spec §4.3).
#[derive(Debug, Clone, Default)]
pub struct BasicMetadata {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_charset: Option<String>,
    pub meta_viewport: Option<String>,
    pub canonical: Option<String>,
    pub meta_robots: Option<String>,
}

pub fn extract_basic_metadata(doc: &ParsedDocument) -> BasicMetadata {
    static TITLE: OnceLock<Selector> = OnceLock::new();
    static DESC: OnceLock<Selector> = OnceLock::new();
    static CHARSET: OnceLock<Selector> = OnceLock::new();
    static VIEWPORT: OnceLock<Selector> = OnceLock::new();
    static CANONICAL: OnceLock<Selector> = OnceLock::new();
    static ROBOTS: OnceLock<Selector> = OnceLock::new();

    let title_sel = TITLE.get_or_init(|| Selector::parse("title").unwrap());
    let desc_sel = DESC.get_or_init(|| Selector::parse("meta[name='description' i]").unwrap());
    let charset_sel = CHARSET.get_or_init(|| Selector::parse("meta[charset]").unwrap());
    let viewport_sel = VIEWPORT.get_or_init(|| Selector::parse("meta[name='viewport' i]").unwrap());
    let canonical_sel =
        CANONICAL.get_or_init(|| Selector::parse("link[rel='canonical' i]").unwrap());
    let robots_sel = ROBOTS.get_or_init(|| Selector::parse("meta[name='robots' i]").unwrap());

    let html = doc.document();
    BasicMetadata {
        title: html
            .select(title_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty()),
        meta_description: html
            .select(desc_sel)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        meta_charset: html
            .select(charset_sel)
            .next()
            .and_then(|el| el.value().attr("charset"))
            .map(|s| s.to_string()),
        meta_viewport: html
            .select(viewport_sel)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.to_string()),
        canonical: html
            .select(canonical_sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(|s| s.to_string()),
        meta_robots: html
            .select(robots_sel)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.to_lowercase()),
    }
}

#[derive(Debug, Clone)]
pub struct HeadingEntry {
    pub level: u8,
    pub text: String,
    pub position: usize,
}

#[derive(Debug, Clone)]
pub struct MainEntry {
    pub position: usize,
    /// True if this `<main>` is nested inside an `<article>`, `<aside>`,
    /// `<footer>`, `<header>`, or `<nav>` ancestor (spec §4.7 D2).
    pub nested_in_excluded_ancestor: bool,
}

#[derive(Debug, Clone)]
pub struct NavEntry {
    pub position: usize,
    pub has_aria_label: bool,
}

/// Precomputed counts/positions for the HTML5 sectioning elements and
/// headings, in DOM order (spec §3, §4.3).
#[derive(Debug, Clone, Default)]
pub struct SemanticHtml5Index {
    pub headings: Vec<HeadingEntry>,
    pub main: Vec<MainEntry>,
    pub nav: Vec<NavEntry>,
    pub aside_count: usize,
    pub header_count: usize,
    pub footer_count: usize,
    pub article_count: usize,
    pub section_count: usize,
}

const EXCLUDED_MAIN_ANCESTORS: &[&str] = &["article", "aside", "footer", "header", "nav"];

fn has_ancestor_named(el: ElementRef, names: &[&str]) -> bool {
    el.ancestors().any(|node| {
        node.value()
            .as_element()
            .map(|e| names.contains(&e.name()))
            .unwrap_or(false)
    })
}

fn has_aria_label(el: &ElementRef) -> bool {
    let v = el.value();
    v.attr("aria-label").is_some() || v.attr("aria-labelledby").is_some()
}

pub fn build_semantic_index(doc: &ParsedDocument) -> SemanticHtml5Index {
    static HEADINGS: OnceLock<Selector> = OnceLock::new();
    static MAIN: OnceLock<Selector> = OnceLock::new();
    static NAV: OnceLock<Selector> = OnceLock::new();
    static ASIDE: OnceLock<Selector> = OnceLock::new();
    static HEADER: OnceLock<Selector> = OnceLock::new();
    static FOOTER: OnceLock<Selector> = OnceLock::new();
    static ARTICLE: OnceLock<Selector> = OnceLock::new();
    static SECTION: OnceLock<Selector> = OnceLock::new();

    let headings_sel =
        HEADINGS.get_or_init(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
    let main_sel = MAIN.get_or_init(|| Selector::parse("main").unwrap());
    let nav_sel = NAV.get_or_init(|| Selector::parse("nav").unwrap());
    let aside_sel = ASIDE.get_or_init(|| Selector::parse("aside").unwrap());
    let header_sel = HEADER.get_or_init(|| Selector::parse("header").unwrap());
    let footer_sel = FOOTER.get_or_init(|| Selector::parse("footer").unwrap());
    let article_sel = ARTICLE.get_or_init(|| Selector::parse("article").unwrap());
    let section_sel = SECTION.get_or_init(|| Selector::parse("section").unwrap());

    let html = doc.document();

    let headings = html
        .select(headings_sel)
        .enumerate()
        .filter_map(|(idx, el)| {
            let level = el.value().name().trim_start_matches('h').parse::<u8>().ok()?;
            let text = el.text().collect::<String>().trim().to_string();
            Some(HeadingEntry {
                level,
                text,
                position: idx,
            })
        })
        .collect();

    let main = html
        .select(main_sel)
        .enumerate()
        .map(|(idx, el)| MainEntry {
            position: idx,
            nested_in_excluded_ancestor: has_ancestor_named(el, EXCLUDED_MAIN_ANCESTORS),
        })
        .collect();

    let nav = html
        .select(nav_sel)
        .enumerate()
        .map(|(idx, el)| NavEntry {
            position: idx,
            has_aria_label: has_aria_label(&el),
        })
        .collect();

    SemanticHtml5Index {
        headings,
        main,
        nav,
        aside_count: html.select(aside_sel).count(),
        header_count: html.select(header_sel).count(),
        footer_count: html.select(footer_sel).count(),
        article_count: html.select(article_sel).count(),
        section_count: html.select(section_sel).count(),
    }
}

/// Accessible name of a link/button: visible text, else `aria-label`/
/// `title`, else the `alt` of a contained image. Grounded on
/// `extractor/page_extractor.rs::extract_links` fallback chain, generalized
/// to any element (used by both link-text and CTA-clarity checks).
pub fn accessible_name(el: &ElementRef) -> Option<String> {
    let text = el.text().collect::<String>().trim().to_string();
    if !text.is_empty() {
        return Some(text);
    }
    if let Some(attr) = el.value().attr("aria-label").or_else(|| el.value().attr("title")) {
        let attr = attr.trim();
        if !attr.is_empty() {
            return Some(attr.to_string());
        }
    }
    static IMG: OnceLock<Selector> = OnceLock::new();
    let img_sel = IMG.get_or_init(|| Selector::parse("img").unwrap());
    for img in el.select(img_sel) {
        if let Some(alt) = img.value().attr("alt") {
            let alt = alt.trim();
            if !alt.is_empty() {
                return Some(alt.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_basic_metadata() {
        let doc = ParsedDocument::parse(
            r#"<html><head><title> My Page </title>
            <meta name="description" content="desc">
            <meta charset="utf-8">
            <meta name="viewport" content="width=device-width">
            <link rel="canonical" href="https://example.test/">
            <meta name="robots" content="INDEX,FOLLOW">
            </head><body></body></html>"#,
        );
        let meta = extract_basic_metadata(&doc);
        assert_eq!(meta.title.as_deref(), Some("My Page"));
        assert_eq!(meta.meta_description.as_deref(), Some("desc"));
        assert_eq!(meta.meta_charset.as_deref(), Some("utf-8"));
        assert_eq!(meta.canonical.as_deref(), Some("https://example.test/"));
        assert_eq!(meta.meta_robots.as_deref(), Some("index,follow"));
    }

    #[test]
    fn builds_heading_order_and_main_nesting() {
        let doc = ParsedDocument::parse(
            r#"<html><body>
                <article><main>nested</main></article>
                <h1>One</h1><h3>Skipped</h3>
            </body></html>"#,
        );
        let index = build_semantic_index(&doc);
        assert_eq!(index.headings.len(), 2);
        assert_eq!(index.headings[0].level, 1);
        assert_eq!(index.headings[1].level, 3);
        assert_eq!(index.main.len(), 1);
        assert!(index.main[0].nested_in_excluded_ancestor);
    }

    #[test]
    fn detects_nav_aria_label() {
        let doc = ParsedDocument::parse(
            r#"<html><body><nav aria-label="Primary"></nav><nav></nav></body></html>"#,
        );
        let index = build_semantic_index(&doc);
        assert_eq!(index.nav.len(), 2);
        assert!(index.nav[0].has_aria_label);
        assert!(!index.nav[1].has_aria_label);
    }

    #[test]
    fn accessible_name_falls_back_to_image_alt() {
        let doc = ParsedDocument::parse(
            r#"<html><body><a href="/x"><img src="i.png" alt="Icon label"></a></body></html>"#,
        );
        static A: OnceLock<Selector> = OnceLock::new();
        let sel = A.get_or_init(|| Selector::parse("a").unwrap());
        let el = doc.document().select(sel).next().unwrap();
        assert_eq!(accessible_name(&el).as_deref(), Some("Icon label"));
    }
}
