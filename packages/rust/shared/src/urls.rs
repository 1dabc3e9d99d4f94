//! URL canonicalization shared by validation and discovery.

use std::net::IpAddr;

use url::Url;

use crate::error::{LeadscopeError, Result};

/// Canonicalize a user-supplied URL.
///
/// Trims whitespace, defaults the scheme to `https`, lower-cases the host
/// (via `url`), drops the fragment and any trailing path slash. Returns
/// `Ok(None)` for an absent/blank value.
pub fn normalize_input_url(raw: &str) -> Result<Option<Url>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| LeadscopeError::validation(format!("invalid URL {trimmed:?}: {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(LeadscopeError::validation(format!(
            "unsupported URL scheme {:?} in {trimmed:?}",
            url.scheme()
        )));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(LeadscopeError::validation(format!("URL has no host: {trimmed:?}")));
    }

    url.set_fragment(None);
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Ok(Some(url))
}

/// Key used to deduplicate discovered URLs (no fragment, no trailing slash).
pub fn dedup_key(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let mut s = normalized.to_string();
    // Remove trailing slash for consistency (except root path)
    if s.ends_with('/') && s.matches('/').count() > 3 {
        s.pop();
    }
    s
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
///
/// Used by the built-in fetchers before any request leaves the process.
pub fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// [`is_ssrf_target`], except that loopback hosts pass when `allow_loopback`
/// is set. Checked on the initial URL and on every redirect hop.
pub fn is_blocked_target(url: &Url, allow_loopback: bool) -> bool {
    if allow_loopback && is_loopback_host(url) && matches!(url.scheme(), "http" | "https") {
        return false;
    }
    is_ssrf_target(url)
}

fn is_loopback_host(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Ipv4(v4)) => v4.is_loopback(),
        Some(url::Host::Ipv6(v6)) => v6.is_loopback(),
        Some(url::Host::Domain(host)) => host == "localhost",
        None => false,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 (unique local)
                || (first & 0xfe00) == 0xfc00
                // fe80::/10 (link-local)
                || (first & 0xffc0) == 0xfe80
        }
    }
}
