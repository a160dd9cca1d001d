//! Error types for the audit pipeline.
//!
//! This module provides the structured error kinds that cross an internal
//! boundary (`AuditError`) plus `anyhow::Error` for glue code. Only
//! `ValidationError` aborts an audit; every other kind is recorded on a
//! `FetchResult`/card/section and the audit continues (see the propagation
//! policy in the pipeline orchestrator).

use thiserror::Error;

/// Domain-specific errors for audit pipeline operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Bad input URL: surfaced to the caller, audit aborted.
    #[error("invalid URL: {0}")]
    Validation(String),

    /// An artifact fetch exceeded its deadline.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// An artifact fetch exceeded its body size cap.
    #[error("body exceeded {0} byte limit")]
    SizeLimit(usize),

    /// Low-level connection/DNS/transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// TLS handshake/certificate failure.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A redirect pointed at a private/loopback address (SSRF guard tripped).
    #[error("redirect to disallowed address: {0}")]
    SsrfBlocked(String),

    /// Too many redirect hops.
    #[error("exceeded {0} redirect hops")]
    TooManyRedirects(usize),

    /// Malformed HTML/XML/JSON-LD: analyzer records a recommendation and
    /// continues with partial data.
    #[error("parse error: {0}")]
    Parse(String),

    /// The external performance probe failed after retries.
    #[error("performance probe unavailable: {0}")]
    ProbeUnavailable(String),

    /// An analyzer panicked/returned an unrecoverable internal error; the
    /// orchestrator substitutes an error section with score 0.
    #[error("analyzer failure ({0}): {1}")]
    AnalyzerFailure(&'static str, String),
}

/// Result type alias using `AuditError`.
pub type Result<T> = std::result::Result<T, AuditError>;

impl AuditError {
    pub fn analyzer(section: &'static str, msg: impl Into<String>) -> Self {
        Self::AnalyzerFailure(section, msg.into())
    }
}
