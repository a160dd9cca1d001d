//! Pipeline configuration: the recognized options from spec §6, collected
//! into one struct instead of per-service settings rows
//! (`domain::models::JobSettings`) since this crate has no database layer
//! backing a settings table.

use std::time::Duration;

/// Canonical list of AI crawler bots the Discoverability analyzer checks
/// robots.txt access for (spec §4.5 D2).
pub const DEFAULT_AI_BOTS: &[&str] = &[
    "GPTBot",
    "Google-Extended",
    "ChatGPT-User",
    "anthropic-ai",
    "Claude-Web",
    "PerplexityBot",
    "CCBot",
];

/// Configuration accepted by [`crate::orchestrator::run_audit`].
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Per-artifact fetch deadline. Default 10s.
    pub fetch_timeout: Duration,
    /// Per-artifact body size cap in bytes. Default 10 MiB.
    pub fetch_max_bytes: usize,
    /// User-Agent sent on every outbound request.
    pub fetch_user_agent: String,
    /// Maximum redirect hops followed per fetch. Default 5.
    pub fetch_max_redirects: usize,
    /// External performance probe deadline. Default 20s.
    pub probe_timeout: Duration,
    /// Maximum retries for the external performance probe. Default 2.
    pub probe_max_retries: u32,
    /// Whole-audit deadline; any analyzer still running past this is
    /// cancelled and its section marked `error`. Default 90s.
    pub global_deadline: Duration,
    /// Canonical AI bot list used for robots.txt access scoring and the
    /// `robots_txt_blocking` global penalty.
    pub ai_bots: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            fetch_max_bytes: 10 * 1024 * 1024,
            fetch_user_agent: "GeoAuditBot/1.0 (+https://example.invalid/geo-audit)".to_string(),
            fetch_max_redirects: 5,
            probe_timeout: Duration::from_secs(20),
            probe_max_retries: 2,
            global_deadline: Duration::from_secs(90),
            ai_bots: DEFAULT_AI_BOTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
