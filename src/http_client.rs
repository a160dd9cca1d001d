//! HTTP client factory (spec §4.2, §6): a single, self-identifying client
//! shared by the fetcher and the performance probe. Unlike a
//! `service/http.rs`, which builds a browser-impersonating client to evade
//! bot detection, the auditor must identify itself truthfully (spec §4.2:
//! "a user-agent identifying the auditor is sent on every request") so it
//! uses plain `reqwest` with an explicit UA instead of stealth emulation.

use crate::config::AuditConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use std::net::IpAddr;
use std::time::Duration;

/// Build the shared HTTP client used for all outbound fetches.
///
/// Redirects are handled manually by the fetcher (see `fetch::resolve_redirects`)
/// rather than through reqwest's built-in policy, so that each hop can be
/// checked against the SSRF guard before being followed.
pub fn build_client(config: &AuditConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.fetch_timeout)
        .connect_timeout(Duration::from_secs(5))
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(config.fetch_user_agent.clone())
        .build()
        .context("failed to build HTTP client")
}

/// True if `addr` is a loopback, private, link-local, or otherwise
/// non-routable address that an SSRF guard should refuse to follow a
/// redirect to.
pub fn is_private_or_loopback(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_unicast_link_local()
                || is_unique_local(&v6)
        }
    }
}

/// `fc00::/7` unique local addresses; stabilized `is_unique_local` lives
/// behind a nightly flag as of this crate's MSRV, so checked by hand.
fn is_unique_local(v6: &std::net::Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xfe00) == 0xfc00
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn flags_private_v4_ranges() {
        assert!(is_private_or_loopback(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))));
        assert!(is_private_or_loopback(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(is_private_or_loopback(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))));
        assert!(is_private_or_loopback(IpAddr::V4(Ipv4Addr::new(169, 254, 1, 1))));
        assert!(!is_private_or_loopback(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))));
    }

    #[test]
    fn flags_loopback_v6() {
        assert!(is_private_or_loopback(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(!is_private_or_loopback(IpAddr::V6(Ipv6Addr::new(
            0x2606, 0x2800, 0x220, 1, 0x248, 0x1893, 0x25c8, 0x1946
        ))));
    }
}
