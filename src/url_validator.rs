//! URL Validator (spec §4.1): normalizes user input to a canonical absolute
//! URL, accepting only `http`/`https` with an explicit host.

use crate::error::{AuditError, Result};
use url::Url;

const MAX_URL_LEN: usize = 2048;

/// Parse and normalize a user-supplied URL string.
///
/// Trims whitespace, prefixes `https://` when no scheme is present, then
/// parses with the `url` crate. Rejects anything longer than 2048 chars,
/// any scheme other than `http`/`https`, and any URL without a host.
pub fn validate(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AuditError::Validation("empty URL".to_string()));
    }
    if trimmed.len() > MAX_URL_LEN {
        return Err(AuditError::Validation(format!(
            "URL exceeds {MAX_URL_LEN} characters"
        )));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| AuditError::Validation(format!("could not parse URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AuditError::Validation(format!(
                "unsupported scheme: {other}"
            )))
        }
    }

    if parsed.host_str().is_none() {
        return Err(AuditError::Validation("URL is missing a host".to_string()));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_host_and_adds_https() {
        let url = validate("example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn accepts_explicit_http() {
        let url = validate("http://example.com/path").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn trims_whitespace() {
        let url = validate("  example.com  ").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let err = validate("ftp://example.com").unwrap_err();
        assert!(matches!(err, AuditError::Validation(_)));
    }

    #[test]
    fn rejects_missing_host() {
        let err = validate("https:///just/a/path").unwrap_err();
        assert!(matches!(err, AuditError::Validation(_)));
    }

    #[test]
    fn rejects_overlong_url() {
        let long = format!("example.com/{}", "a".repeat(3000));
        let err = validate(&long).unwrap_err();
        assert!(matches!(err, AuditError::Validation(_)));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(validate("").is_err());
        assert!(validate("   ").is_err());
    }
}
