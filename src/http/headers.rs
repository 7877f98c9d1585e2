//! Header helpers for forwarding, logging and reporting.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request};

use crate::config::HeaderList;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_REPORT_TOKEN: &str = "x-report-token";

/// Connection-scoped headers that are never forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Host the request was addressed to: the `Host` header, else the URI authority.
pub fn request_authority(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.as_str().to_string()))
}

/// Value of the named cookie across all `Cookie` headers.
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

/// `name=value` pairs for the visible headers, in configured order.
pub fn visible_headers(headers: &HeaderMap, visible: &HeaderList) -> Vec<(String, String)> {
    let mut shown = Vec::new();
    for name in visible.distinct() {
        for value in headers.get_all(name) {
            shown.push((
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            ));
        }
    }
    shown
}

/// Visible headers rendered as a single log field.
pub fn format_visible(headers: &HeaderMap, visible: &HeaderList) -> String {
    visible_headers(headers, visible)
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Copy of the listed headers, all values preserved.
pub fn replicate_headers(source: &HeaderMap, list: &HeaderList) -> HeaderMap {
    let mut replicated = HeaderMap::new();
    for name in list.distinct() {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            tracing::warn!(header = %name, "Skipping invalid header name in HEADER_TO_REPLICATE");
            continue;
        };
        for value in source.get_all(&name) {
            replicated.append(name.clone(), value.clone());
        }
    }
    replicated
}

/// Remove the fixed hop-by-hop set and every header the `Connection`
/// header names.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.append(name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_session_cookie() {
        let map = headers(&[
            ("cookie", "theme=dark; ci_session=abc123"),
            ("cookie", "other=1"),
        ]);
        assert_eq!(session_cookie(&map, "ci_session").as_deref(), Some("abc123"));
        assert_eq!(session_cookie(&map, "other").as_deref(), Some("1"));
        assert_eq!(session_cookie(&map, "missing"), None);
        assert_eq!(session_cookie(&HeaderMap::new(), "ci_session"), None);
    }

    #[test]
    fn test_session_cookie_quoted_and_empty() {
        let map = headers(&[("cookie", "ci_session=\"q1\"; blank=")]);
        assert_eq!(session_cookie(&map, "ci_session").as_deref(), Some("q1"));
        assert_eq!(session_cookie(&map, "blank").as_deref(), Some(""));
    }

    #[test]
    fn test_visible_headers_filter() {
        let map = headers(&[
            ("host", "localhost"),
            ("authorization", "Bearer secret"),
            ("x-request-id", "r-1"),
        ]);
        let visible = HeaderList::parse("x-request-id,host");
        assert_eq!(
            visible_headers(&map, &visible),
            vec![
                ("x-request-id".to_string(), "r-1".to_string()),
                ("host".to_string(), "localhost".to_string()),
            ]
        );
        assert!(!format_visible(&map, &visible).contains("secret"));
    }

    #[test]
    fn test_replicate_headers() {
        let map = headers(&[
            ("authorization", "Bearer t"),
            ("x-tenant", "a"),
            ("x-tenant", "b"),
            ("cookie", "ci_session=s"),
        ]);
        let replicated = replicate_headers(&map, &HeaderList::parse("x-tenant,authorization,absent"));

        assert_eq!(replicated.get_all("x-tenant").iter().count(), 2);

        // A name listed twice is still copied once per inbound value.
        let twice = replicate_headers(&map, &HeaderList::parse("x-tenant,X-Tenant"));
        assert_eq!(twice.get_all("x-tenant").iter().count(), 2);
        assert_eq!(replicated.get("authorization").unwrap(), "Bearer t");
        assert!(replicated.get("cookie").is_none());
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut map = headers(&[
            ("connection", "keep-alive"),
            ("transfer-encoding", "chunked"),
            ("content-type", "text/plain"),
        ]);
        strip_hop_by_hop(&mut map);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("content-type"));
    }

    #[test]
    fn test_strip_connection_listed_headers() {
        let mut map = headers(&[
            ("connection", "close, X-Hop-Secret"),
            ("connection", "x-other-hop"),
            ("x-hop-secret", "s"),
            ("x-other-hop", "o"),
            ("x-end-to-end", "kept"),
        ]);
        strip_hop_by_hop(&mut map);
        assert!(map.get("x-hop-secret").is_none());
        assert!(map.get("x-other-hop").is_none());
        assert!(map.get("connection").is_none());
        assert_eq!(map.get("x-end-to-end").unwrap(), "kept");
    }

    #[test]
    fn test_request_authority() {
        let req = Request::builder()
            .uri("http://fallback.test/a")
            .header("host", "localhost:8080")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_authority(&req).as_deref(), Some("localhost:8080"));

        let req = Request::builder()
            .uri("http://fallback.test/a")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_authority(&req).as_deref(), Some("fallback.test"));
    }
}
