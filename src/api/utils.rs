//! Request helpers shared by handlers and the abuse filter.

use axum::http::HeaderMap;
use regex::Regex;

/// Bucket used when no proxy header identifies the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort client identifier for rate limiting.
///
/// First non-empty of `x-forwarded-for` (first hop), `x-real-ip`,
/// `cf-connecting-ip`. Clients without any of these share one bucket.
#[must_use]
pub fn client_identifier(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    header("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| header("x-real-ip"))
        .or_else(|| header("cf-connecting-ip"))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

/// Resource id embedded in a `returnUrl` such as `/proposal/<id>/contract`.
#[must_use]
pub fn resource_from_return_url(return_url: Option<&str>) -> Option<String> {
    let return_url = return_url?;
    Regex::new(r"/proposal/([^/?#]+)")
        .ok()?
        .captures(return_url)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

/// Only same-site paths are echoed back as redirect targets.
#[must_use]
pub fn is_site_relative(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.contains('\\')
}

/// Where the browser goes after a successful password check.
#[must_use]
pub fn redirect_target(return_url: Option<&str>, resource_id: &str) -> String {
    match return_url {
        Some(url) if is_site_relative(url) => url.to_string(),
        _ => format!("/proposal/{resource_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn forwarded_for_first_hop_wins() {
        let headers = headers(&[
            ("x-forwarded-for", " 203.0.113.5 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.1"),
        ]);
        assert_eq!(client_identifier(&headers), "203.0.113.5");
    }

    #[test]
    fn falls_back_through_proxy_headers() {
        assert_eq!(
            client_identifier(&headers(&[("x-forwarded-for", " "), ("x-real-ip", "198.51.100.1")])),
            "198.51.100.1"
        );
        assert_eq!(
            client_identifier(&headers(&[("cf-connecting-ip", "192.0.2.44")])),
            "192.0.2.44"
        );
        assert_eq!(client_identifier(&HeaderMap::new()), UNKNOWN_CLIENT);
    }

    #[test]
    fn resource_from_return_url_extracts_segment() {
        assert_eq!(
            resource_from_return_url(Some("/proposal/adb")),
            Some("adb".to_string())
        );
        assert_eq!(
            resource_from_return_url(Some("/proposal/acme/contract?x=1")),
            Some("acme".to_string())
        );
        assert_eq!(
            resource_from_return_url(Some("/proposal/acme?tab=pricing")),
            Some("acme".to_string())
        );
        assert_eq!(resource_from_return_url(Some("/proposal/")), None);
        assert_eq!(resource_from_return_url(Some("/other")), None);
        assert_eq!(resource_from_return_url(None), None);
    }

    #[test]
    fn redirect_target_rejects_offsite_urls() {
        assert_eq!(redirect_target(Some("/proposal/adb/contract"), "adb"), "/proposal/adb/contract");
        assert_eq!(redirect_target(None, "adb"), "/proposal/adb");
        assert_eq!(redirect_target(Some("https://evil.example/"), "adb"), "/proposal/adb");
        assert_eq!(redirect_target(Some("//evil.example/"), "adb"), "/proposal/adb");
        assert_eq!(redirect_target(Some("/\\evil.example/"), "adb"), "/proposal/adb");
        assert_eq!(redirect_target(Some(""), "adb"), "/proposal/adb");
    }
}
