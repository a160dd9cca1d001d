//! Artifact Fetcher (spec §4.2): retrieves HTML, robots.txt, sitemap.xml,
//! and llms.txt in parallel, each with its own deadline, size cap, redirect
//! bound, and SSRF guard. One artifact's failure never aborts the others —
//! grounded in `service/discovery.rs::ResourceChecker`, which
//! already treats each well-known path as an independent fetch.

use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::http_client::is_private_or_loopback;
use crate::robots;
use futures::StreamExt;
use reqwest::Client;
use std::time::Instant;
use url::Url;

/// Machine-readable reason a fetch failed; mirrors spec §7's fetch-level
/// error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorTag {
    Timeout,
    SizeLimit,
    Network,
    Tls,
    SsrfBlocked,
    HttpError,
}

/// Result of fetching one artifact (spec §3 `FetchResult`).
///
/// Invariant: if `success`, `body` is `Some` and `status_code` is in
/// `[200,299]`; if `!success`, `body` is `None`.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub success: bool,
    pub body: Option<String>,
    pub status_code: u16,
    pub content_length: usize,
    pub response_time_ms: u64,
    pub error: Option<FetchErrorTag>,
    pub error_message: Option<String>,
}

impl FetchResult {
    fn failure(tag: FetchErrorTag, message: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            success: false,
            body: None,
            status_code: 0,
            content_length: 0,
            response_time_ms: elapsed_ms,
            error: Some(tag),
            error_message: Some(message.into()),
        }
    }
}

/// All four artifacts collected for one audit (spec §3 `CollectedData`).
#[derive(Debug, Clone)]
pub struct CollectedData {
    pub url: Url,
    pub html: FetchResult,
    pub robots_txt: FetchResult,
    pub sitemap: FetchResult,
    pub llms_txt: FetchResult,
}

/// Accept headers per spec §6.
mod accept {
    pub const HTML: &str = "text/html,*/*";
    pub const TEXT: &str = "text/plain,*/*";
    pub const XML: &str = "application/xml,text/xml,*/*";
}

/// Fetch HTML, robots.txt, sitemap, and llms.txt for `url` in parallel.
///
/// The sitemap URL is resolved from robots.txt's `Sitemap:` directive when
/// present, so the sitemap fetch starts as soon as robots.txt completes
/// rather than fully in parallel with it — the other three artifacts are
/// independent from the first tick.
pub async fn fetch_all(client: &Client, url: &Url, config: &AuditConfig) -> CollectedData {
    let origin = origin_of(url);

    let html_fut = fetch_with_guard(client, url.clone(), config, accept::HTML);
    let robots_url = origin.join("robots.txt").unwrap_or_else(|_| url.clone());
    let robots_fut = fetch_with_guard(client, robots_url, config, accept::TEXT);
    let llms_fut = fetch_llms(client, &origin, config);

    let (html, robots_txt, llms_txt) = tokio::join!(html_fut, robots_fut, llms_fut);

    let sitemap_url = resolve_sitemap_url(&origin, &robots_txt);
    let sitemap = fetch_with_guard(client, sitemap_url, config, accept::XML).await;

    CollectedData {
        url: url.clone(),
        html,
        robots_txt,
        sitemap,
        llms_txt,
    }
}

fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

/// Resolve the sitemap URL: the first `Sitemap:` directive in robots.txt if
/// it was fetched successfully, otherwise `origin + "/sitemap.xml"` (spec
/// §4.2 item 3).
fn resolve_sitemap_url(origin: &Url, robots: &FetchResult) -> Url {
    if let Some(body) = robots.body.as_deref() {
        if let Some(declared) = robots::parse(body).sitemaps.into_iter().next() {
            if let Ok(parsed) = Url::parse(&declared) {
                return parsed;
            }
        }
    }
    origin
        .join("sitemap.xml")
        .unwrap_or_else(|_| origin.clone())
}

/// `/llms.txt` then `/llms-full.txt`, first success wins (spec §4.2 item 4).
async fn fetch_llms(client: &Client, origin: &Url, config: &AuditConfig) -> FetchResult {
    let primary = origin.join("llms.txt").unwrap_or_else(|_| origin.clone());
    let result = fetch_with_guard(client, primary, config, accept::TEXT).await;
    if result.success {
        return result;
    }
    let fallback = origin
        .join("llms-full.txt")
        .unwrap_or_else(|_| origin.clone());
    fetch_with_guard(client, fallback, config, accept::TEXT).await
}

/// Fetch one URL with an independent deadline, size cap, SSRF-checked
/// manual redirect walk, and a bounded hop count.
async fn fetch_with_guard(
    client: &Client,
    url: Url,
    config: &AuditConfig,
    accept: &str,
) -> FetchResult {
    let started = Instant::now();
    let outcome = tokio::time::timeout(
        config.fetch_timeout,
        fetch_inner(client, url, config, accept),
    )
    .await;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(Ok(result)) => FetchResult {
            response_time_ms: elapsed_ms,
            ..result
        },
        Ok(Err(tag_and_msg)) => {
            let (tag, msg) = tag_and_msg;
            FetchResult::failure(tag, msg, elapsed_ms)
        }
        Err(_) => FetchResult::failure(
            FetchErrorTag::Timeout,
            format!("exceeded {}ms deadline", config.fetch_timeout.as_millis()),
            elapsed_ms,
        ),
    }
}

async fn fetch_inner(
    client: &Client,
    mut url: Url,
    config: &AuditConfig,
    accept: &str,
) -> Result<FetchResult, (FetchErrorTag, String)> {
    let original_host = url.host_str().map(|h| h.to_string());

    for hop in 0..=config.fetch_max_redirects {
        // The initial URL was explicitly supplied by the caller, so it is
        // never SSRF-guarded — otherwise a legitimate dev/test target (or a
        // private IP the caller deliberately chose to audit) would be
        // rejected. A *redirect* to a different host is guarded (spec
        // §4.2): that's the classic vector where an attacker-controlled
        // page sends the fetcher off to internal infrastructure. A
        // same-host redirect (the common `/start` -> `/final` pattern)
        // carries no more risk than the original request and is allowed
        // through unguarded.
        let is_cross_host_redirect = hop > 0 && url.host_str() != original_host.as_deref();
        if is_cross_host_redirect {
            guard_ssrf(&url).await?;
        }

        let response = client
            .get(url.clone())
            .header("Accept", accept)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status.is_redirection() {
            if hop == config.fetch_max_redirects {
                return Err((
                    FetchErrorTag::HttpError,
                    format!("too many redirects (> {})", config.fetch_max_redirects),
                ));
            }
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    (
                        FetchErrorTag::HttpError,
                        "redirect with no Location header".to_string(),
                    )
                })?;
            url = url
                .join(location)
                .map_err(|e| (FetchErrorTag::HttpError, format!("bad redirect target: {e}")))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err((
                    FetchErrorTag::SsrfBlocked,
                    format!("redirect to disallowed scheme {}", url.scheme()),
                ));
            }
            continue;
        }

        let status_code = status.as_u16();
        let body = read_body_capped(response, config.fetch_max_bytes).await?;

        return Ok(FetchResult {
            success: status.is_success(),
            content_length: body.len(),
            status_code,
            body: if status.is_success() { Some(body) } else { None },
            response_time_ms: 0,
            error: if status.is_success() {
                None
            } else {
                Some(FetchErrorTag::HttpError)
            },
            error_message: if status.is_success() {
                None
            } else {
                Some(format!("HTTP status {status_code}"))
            },
        });
    }
    unreachable!("redirect loop always returns within max_redirects + 1 iterations")
}

async fn read_body_capped(
    response: reqwest::Response,
    max_bytes: usize,
) -> Result<String, (FetchErrorTag, String)> {
    let mut buf: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify_reqwest_error)?;
        if buf.len() + chunk.len() > max_bytes {
            return Err((
                FetchErrorTag::SizeLimit,
                format!("body exceeded {max_bytes} byte cap"),
            ));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn classify_reqwest_error(err: reqwest::Error) -> (FetchErrorTag, String) {
    if err.is_timeout() {
        (FetchErrorTag::Timeout, err.to_string())
    } else if err.is_connect() || err.is_request() {
        (FetchErrorTag::Network, err.to_string())
    } else {
        (FetchErrorTag::Network, err.to_string())
    }
}

/// Refuse to contact a host that resolves (or is literally) a private,
/// loopback, or otherwise non-routable address.
async fn guard_ssrf(url: &Url) -> Result<(), (FetchErrorTag, String)> {
    let host = url
        .host_str()
        .ok_or_else(|| (FetchErrorTag::Network, "URL has no host".to_string()))?;

    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        if is_private_or_loopback(ip) {
            return Err((
                FetchErrorTag::SsrfBlocked,
                format!("refusing to contact private address {ip}"),
            ));
        }
        return Ok(());
    }

    if host.eq_ignore_ascii_case("localhost") {
        return Err((
            FetchErrorTag::SsrfBlocked,
            "refusing to contact localhost".to_string(),
        ));
    }

    let port = url.port_or_known_default().unwrap_or(443);
    match tokio::net::lookup_host((host, port)).await {
        Ok(addrs) => {
            for addr in addrs {
                if is_private_or_loopback(addr.ip()) {
                    return Err((
                        FetchErrorTag::SsrfBlocked,
                        format!("{host} resolves to private address {}", addr.ip()),
                    ));
                }
            }
            Ok(())
        }
        // DNS resolution failures surface as a network error, not an SSRF
        // block, so they aren't silently conflated in reporting.
        Err(e) => Err((FetchErrorTag::Network, format!("DNS lookup failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;

    fn cfg() -> AuditConfig {
        AuditConfig {
            fetch_timeout: std::time::Duration::from_secs(5),
            ..AuditConfig::default()
        }
    }

    #[tokio::test]
    async fn fetch_succeeds_for_200() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<html></html>")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = Url::parse(&server.url()).unwrap();
        let result = fetch_with_guard(&client, url, &cfg(), accept::HTML).await;
        assert!(result.success);
        assert_eq!(result.status_code, 200);
        assert_eq!(result.body.as_deref(), Some("<html></html>"));
    }

    #[tokio::test]
    async fn fetch_records_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/").with_status(404).create_async().await;

        let client = reqwest::Client::new();
        let url = Url::parse(&server.url()).unwrap();
        let result = fetch_with_guard(&client, url, &cfg(), accept::HTML).await;
        assert!(!result.success);
        assert_eq!(result.status_code, 404);
        assert!(result.body.is_none());
    }

    #[tokio::test]
    async fn fetch_enforces_size_cap() {
        let mut server = mockito::Server::new_async().await;
        let big_body = "x".repeat(2048);
        let _m = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(&big_body)
            .create_async()
            .await;

        let mut small_cap_cfg = cfg();
        small_cap_cfg.fetch_max_bytes = 1024;

        let client = reqwest::Client::new();
        let url = Url::parse(&server.url()).unwrap();
        let result = fetch_with_guard(&client, url, &small_cap_cfg, accept::HTML).await;
        assert!(!result.success);
        assert_eq!(result.error, Some(FetchErrorTag::SizeLimit));
    }

    #[tokio::test]
    async fn fetch_follows_redirect_within_bound() {
        let mut server = mockito::Server::new_async().await;
        let target = format!("{}/final", server.url());
        let _redirect = server
            .mock("GET", "/start")
            .with_status(302)
            .with_header("Location", &target)
            .create_async()
            .await;
        let _final_page = server
            .mock("GET", "/final")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = Url::parse(&format!("{}/start", server.url())).unwrap();
        let result = fetch_with_guard(&client, url, &cfg(), accept::HTML).await;
        assert!(result.success);
        assert_eq!(result.body.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn ssrf_guard_blocks_loopback_literal() {
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = guard_ssrf(&url).await.unwrap_err();
        assert_eq!(err.0, FetchErrorTag::SsrfBlocked);
    }

    #[tokio::test]
    async fn same_host_redirect_is_not_ssrf_guarded() {
        // The initial request target is never guarded, and a redirect that
        // stays on the same host (the server's own port) is not treated as
        // a cross-host hop even though the mockito fixture is bound to the
        // loopback address.
        let mut server = mockito::Server::new_async().await;
        let target = format!("{}/final", server.url());
        let _redirect = server.mock("GET", "/start").with_status(302).with_header("Location", &target).create_async().await;
        let _final_page = server.mock("GET", "/final").with_status(200).with_body("ok").create_async().await;

        let client = reqwest::Client::new();
        let url = Url::parse(&format!("{}/start", server.url())).unwrap();
        let result = fetch_with_guard(&client, url, &cfg(), accept::HTML).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn cross_host_redirect_to_private_ip_is_blocked() {
        let mut server = mockito::Server::new_async().await;
        let _redirect = server
            .mock("GET", "/start")
            .with_status(302)
            .with_header("Location", "http://10.1.2.3/internal")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = Url::parse(&format!("{}/start", server.url())).unwrap();
        let result = fetch_with_guard(&client, url, &cfg(), accept::HTML).await;
        assert!(!result.success);
        assert_eq!(result.error, Some(FetchErrorTag::SsrfBlocked));
    }
}
