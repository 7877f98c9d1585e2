//! Upstream client and URI construction.

use axum::body::Body;
use axum::http::uri::InvalidUri;
use axum::http::Uri;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

/// Client shared by the forwarding and reporting paths.
pub type HttpClient = Client<HttpConnector, Body>;

pub fn build_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Join a configured upstream base (`http://upstream:9000`, possibly with a
/// path prefix) and the request's path and query.
pub fn upstream_uri(base: &str, path_and_query: &str) -> Result<Uri, InvalidUri> {
    let path_and_query = if path_and_query.starts_with('/') {
        path_and_query.to_string()
    } else {
        format!("/{path_and_query}")
    };
    format!("{}{}", base.trim_end_matches('/'), path_and_query).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_uri() {
        let uri = upstream_uri("http://upstream:9000", "/teste.txt?x=1").unwrap();
        assert_eq!(uri.to_string(), "http://upstream:9000/teste.txt?x=1");

        let uri = upstream_uri("http://upstream:9000/base/", "/a").unwrap();
        assert_eq!(uri.path(), "/base/a");

        let uri = upstream_uri("http://upstream", "a").unwrap();
        assert_eq!(uri.path(), "/a");
    }

    #[test]
    fn test_upstream_uri_rejects_garbage() {
        assert!(upstream_uri("http://bad host", "/a").is_err());
    }
}
