//! robots.txt interpretation (spec §6, §4.5 D2): a small hand-rolled
//! line-oriented parser in the same spirit as
//! `extractor/sitemap.rs` event walk, rather than pulling in a dedicated
//! robots-parsing crate.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    Allow,
    Disallow,
}

#[derive(Debug, Clone)]
struct Rule {
    kind: RuleKind,
    path: String,
}

/// Parsed robots.txt: per-user-agent rule groups plus any declared
/// `Sitemap:` directives, in file order.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    groups: HashMap<String, Vec<Rule>>,
    pub sitemaps: Vec<String>,
}

/// Parse robots.txt text. Lines are case-normalized on keys; `#` starts a
/// comment; `User-agent:` groups rules until the next `User-agent:` or EOF;
/// `Allow:`/`Disallow:` accumulate into the group(s) currently open (a
/// `User-agent:` line started a fresh group, but consecutive `User-agent:`
/// lines with no intervening rule share the same rule set, per the
/// standard robots.txt grouping convention).
pub fn parse(text: &str) -> RobotsRules {
    let mut groups: HashMap<String, Vec<Rule>> = HashMap::new();
    let mut sitemaps = Vec::new();
    let mut current_agents: Vec<String> = Vec::new();
    let mut awaiting_rules = false;

    for raw_line in text.lines() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if !awaiting_rules {
                    current_agents.clear();
                }
                current_agents.push(value.to_ascii_lowercase());
                groups.entry(value.to_ascii_lowercase()).or_default();
                awaiting_rules = true;
            }
            "allow" | "disallow" => {
                awaiting_rules = false;
                let kind = if key == "allow" {
                    RuleKind::Allow
                } else {
                    RuleKind::Disallow
                };
                if value.is_empty() && kind == RuleKind::Disallow {
                    continue;
                }
                for agent in &current_agents {
                    groups.entry(agent.clone()).or_default().push(Rule {
                        kind,
                        path: value.to_string(),
                    });
                }
            }
            "sitemap" => {
                if !value.is_empty() {
                    sitemaps.push(value.to_string());
                }
            }
            _ => {}
        }
    }

    RobotsRules { groups, sitemaps }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

impl RobotsRules {
    /// Longest-matching-prefix rule lookup for `path` within a bot's own
    /// group, falling back to the wildcard `*` group in its absence. An
    /// empty robots.txt (no groups at all) allows everything.
    pub fn is_allowed(&self, bot: &str, path: &str) -> bool {
        if self.groups.is_empty() {
            return true;
        }
        let bot_key = bot.to_ascii_lowercase();
        let rules = self
            .groups
            .get(&bot_key)
            .or_else(|| self.groups.get("*"));

        let Some(rules) = rules else {
            return true;
        };

        let mut best: Option<(&Rule, usize)> = None;
        for rule in rules {
            if path.starts_with(rule.path.as_str()) || rule.path.is_empty() {
                let len = rule.path.len();
                if best.map(|(_, best_len)| len > best_len).unwrap_or(true) {
                    best = Some((rule, len));
                }
            }
        }

        match best {
            Some((rule, _)) => rule.kind == RuleKind::Allow,
            None => true,
        }
    }

    /// Whether `bot` is blocked from the site root — the check the
    /// Discoverability analyzer's AI Bots Access card uses (spec §4.5).
    pub fn blocks_root(&self, bot: &str) -> bool {
        !self.is_allowed(bot, "/")
    }

    pub fn has_sitemap_directive(&self) -> bool {
        !self.sitemaps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_robots_allows_everything() {
        let rules = parse("");
        assert!(rules.is_allowed("GPTBot", "/"));
    }

    #[test]
    fn wildcard_disallow_all_blocks_unlisted_bot() {
        let rules = parse("User-agent: *\nDisallow: /\n");
        assert!(!rules.is_allowed("GPTBot", "/"));
    }

    #[test]
    fn specific_bot_group_overrides_wildcard() {
        let text = "User-agent: *\nAllow: /\n\nUser-agent: GPTBot\nDisallow: /\n";
        let rules = parse(text);
        assert!(!rules.is_allowed("GPTBot", "/"));
        assert!(rules.is_allowed("PerplexityBot", "/"));
    }

    #[test]
    fn more_specific_allow_overrides_root_disallow() {
        let text = "User-agent: *\nDisallow: /\nAllow: /public/\n";
        let rules = parse(text);
        assert!(rules.is_allowed("GPTBot", "/public/page"));
        assert!(!rules.is_allowed("GPTBot", "/private/page"));
    }

    #[test]
    fn extracts_sitemap_directive() {
        let text = "User-agent: *\nAllow: /\nSitemap: https://example.com/sitemap.xml\n";
        let rules = parse(text);
        assert_eq!(rules.sitemaps, vec!["https://example.com/sitemap.xml"]);
        assert!(rules.has_sitemap_directive());
    }

    #[test]
    fn grouped_user_agents_share_rules() {
        let text = "User-agent: GPTBot\nUser-agent: CCBot\nDisallow: /\n";
        let rules = parse(text);
        assert!(!rules.is_allowed("GPTBot", "/"));
        assert!(!rules.is_allowed("CCBot", "/"));
    }

    #[test]
    fn comments_are_ignored() {
        let text = "# comment\nUser-agent: *\nDisallow: /admin # inline comment\n";
        let rules = parse(text);
        assert!(!rules.is_allowed("GPTBot", "/admin"));
        assert!(rules.is_allowed("GPTBot", "/"));
    }
}
