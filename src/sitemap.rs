//! Sitemap XML parsing (spec §4.5 D2, §6): interested only in `<loc>` and
//! `<lastmod>` tags. Malformed XML never aborts the audit — it degrades the
//! Sitemap Quality card instead. Grounded directly on
//! `extractor/sitemap.rs` quick-xml event walk (sitemap index files are
//! walked the same way, since `<loc>`/`<lastmod>` appear at either nesting
//! level).

use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapSummary {
    pub urls: Vec<String>,
    pub has_lastmod: bool,
    pub well_formed: bool,
}

/// Parse sitemap XML, tolerating malformed input by returning whatever was
/// read before the parse error and marking `well_formed = false`.
pub fn parse(text: &str) -> SitemapSummary {
    let mut reader = Reader::from_str(text);
    let mut buf = Vec::new();
    let mut urls = Vec::new();
    let mut has_lastmod = false;
    let mut in_tag: Option<&'static str> = None;
    let mut well_formed = true;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"loc" => in_tag = Some("loc"),
                b"lastmod" => in_tag = Some("lastmod"),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some(tag) = in_tag {
                    match e.decode() {
                        Ok(text) => {
                            let text = text.trim();
                            if tag == "loc" && !text.is_empty() {
                                urls.push(text.to_string());
                            } else if tag == "lastmod" && !text.is_empty() {
                                has_lastmod = true;
                            }
                        }
                        Err(_) => well_formed = false,
                    }
                }
            }
            Ok(Event::End(_)) => in_tag = None,
            Ok(Event::Eof) => break,
            Err(_) => {
                well_formed = false;
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    SitemapSummary {
        urls,
        has_lastmod,
        well_formed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_loc_and_lastmod() {
        let xml = r#"<urlset><url><loc>https://example.test/</loc><lastmod>2024-01-01</lastmod></url></urlset>"#;
        let summary = parse(xml);
        assert_eq!(summary.urls, vec!["https://example.test/"]);
        assert!(summary.has_lastmod);
        assert!(summary.well_formed);
    }

    #[test]
    fn missing_lastmod_is_detected() {
        let xml = r#"<urlset><url><loc>https://example.test/</loc></url></urlset>"#;
        let summary = parse(xml);
        assert!(!summary.has_lastmod);
    }

    #[test]
    fn sitemap_index_urls_are_collected() {
        let xml = r#"<sitemapindex>
            <sitemap><loc>https://example.test/a.xml</loc></sitemap>
            <sitemap><loc>https://example.test/b.xml</loc></sitemap>
        </sitemapindex>"#;
        let summary = parse(xml);
        assert_eq!(summary.urls.len(), 2);
    }

    #[test]
    fn malformed_xml_degrades_gracefully() {
        let broken = "<urlset><url><loc>https://example.test/</loc></url></wrongtag>";
        let summary = parse(broken);
        assert!(!summary.well_formed);
        // whatever was read before the mismatch is still returned
        assert_eq!(summary.urls, vec!["https://example.test/"]);
    }

    #[test]
    fn empty_input_yields_empty_summary() {
        let summary = parse("");
        assert!(summary.urls.is_empty());
        assert!(!summary.has_lastmod);
    }
}
