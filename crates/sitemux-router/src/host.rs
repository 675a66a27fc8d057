//! Host header normalization

use tracing::trace;

/// Normalize a host header value into a lookup key
///
/// Strips surrounding whitespace, a `:port` suffix and one trailing dot, then
/// lowercases. Bracketed IPv6 literals lose their brackets. Returns `None`
/// for values that leave nothing to look up (empty, `:8080`, `[]`).
///
/// ```
/// use sitemux_router::normalize_host;
///
/// assert_eq!(normalize_host("Servelec.CL:8000").as_deref(), Some("servelec.cl"));
/// assert_eq!(normalize_host("[::1]:8080").as_deref(), Some("::1"));
/// assert_eq!(normalize_host("  "), None);
/// ```
pub fn normalize_host(raw: &str) -> Option<String> {
    let host = raw.trim();

    let host = if let Some(rest) = host.strip_prefix('[') {
        // [v6]:port or [v6]
        rest.split(']').next().unwrap_or_default()
    } else if host.matches(':').count() == 1 {
        // name:port
        host.split(':').next().unwrap_or(host)
    } else {
        host
    };

    let host = host.strip_suffix('.').unwrap_or(host);

    if host.is_empty() {
        trace!("Host {:?} normalized to nothing", raw);
        return None;
    }

    Some(host.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_host() {
        assert_eq!(normalize_host("servelec.cl").as_deref(), Some("servelec.cl"));
    }

    #[test]
    fn test_normalize_strips_port() {
        assert_eq!(
            normalize_host("servelec.cl:8080").as_deref(),
            Some("servelec.cl")
        );
        assert_eq!(normalize_host("localhost:8000").as_deref(), Some("localhost"));
    }

    #[test]
    fn test_normalize_lowercases() {
        assert_eq!(
            normalize_host("WWW.Servelec.CL").as_deref(),
            Some("www.servelec.cl")
        );
    }

    #[test]
    fn test_normalize_trailing_dot_and_whitespace() {
        assert_eq!(
            normalize_host(" servelec.cl.:443 ").as_deref(),
            Some("servelec.cl")
        );
    }

    #[test]
    fn test_normalize_ipv6() {
        assert_eq!(normalize_host("[::1]:8080").as_deref(), Some("::1"));
        assert_eq!(normalize_host("[2001:DB8::1]").as_deref(), Some("2001:db8::1"));
    }

    #[test]
    fn test_normalize_empty_values() {
        assert_eq!(normalize_host(""), None);
        assert_eq!(normalize_host("   "), None);
        assert_eq!(normalize_host(":8080"), None);
        assert_eq!(normalize_host("[]:80"), None);
        assert_eq!(normalize_host("."), None);
    }
}
