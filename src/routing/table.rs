//! Route lookup index.
//!
//! # Responsibilities
//! - Index every `(mode, upstream, host, path)` declared by the route list
//! - Resolve `(host, path)` to all matching `(mode, upstream)` pairs
//! - Remember which route entry declared each combination
//!
//! # Design Decisions
//! - Flat composite-key maps instead of nested map-of-maps
//! - Immutable after construction (thread-safe without locks)
//! - O(1) lookup per `(host, path)`; results keep route declaration order
//! - Host matching is case-insensitive, path matching is exact

use std::collections::HashMap;

use crate::config::{ProxyMode, RouteEntry};

/// Composite key of one indexed rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    mode: ProxyMode,
    upstream: String,
    host: String,
    path: String,
}

/// One `(mode, upstream)` pair returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub mode: ProxyMode,
    pub upstream: String,
}

/// Immutable route index built from the configured route list.
#[derive(Debug, Default)]
pub struct RouteTable {
    /// Rule -> index of the route entry that first declared it.
    rules: HashMap<RuleKey, usize>,
    /// (host, path) -> matches in declaration order.
    targets: HashMap<(String, String), Vec<RouteMatch>>,
}

impl RouteTable {
    /// Build the index. Re-declaring a rule is a no-op.
    pub fn build(routes: &[RouteEntry]) -> Self {
        let mut table = Self::default();

        for (origin, entry) in routes.iter().enumerate() {
            let host = entry.host.to_ascii_lowercase();
            for path in &entry.path {
                let key = RuleKey {
                    mode: entry.mode,
                    upstream: entry.proxy_to.clone(),
                    host: host.clone(),
                    path: path.clone(),
                };
                if table.rules.contains_key(&key) {
                    continue;
                }
                table.rules.insert(key, origin);
                table
                    .targets
                    .entry((host.clone(), path.clone()))
                    .or_default()
                    .push(RouteMatch {
                        mode: entry.mode,
                        upstream: entry.proxy_to.clone(),
                    });
            }
        }

        tracing::debug!(rules = table.rules.len(), routes = routes.len(), "Route table built");
        table
    }

    /// All `(mode, upstream)` pairs declared for exactly this host and path.
    /// An empty slice means no proxying is configured.
    pub fn resolve(&self, host: &str, path: &str) -> &[RouteMatch] {
        self.targets
            .get(&(host.to_ascii_lowercase(), path.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, mode: ProxyMode, upstream: &str, host: &str, path: &str) -> bool {
        self.origin(mode, upstream, host, path).is_some()
    }

    /// Index of the route entry that declared this rule.
    pub fn origin(&self, mode: ProxyMode, upstream: &str, host: &str, path: &str) -> Option<usize> {
        let key = RuleKey {
            mode,
            upstream: upstream.to_string(),
            host: host.to_ascii_lowercase(),
            path: path.to_string(),
        };
        self.rules.get(&key).copied()
    }

    /// Number of distinct rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(host: &str, paths: &[&str], mode: ProxyMode, proxy_to: &str) -> RouteEntry {
        RouteEntry {
            host: host.to_string(),
            path: paths.iter().map(|p| p.to_string()).collect(),
            mode,
            proxy_to: proxy_to.to_string(),
        }
    }

    #[test]
    fn test_single_async_route() {
        let table = RouteTable::build(&[entry(
            "localhost",
            &["/a"],
            ProxyMode::AsynchronousReport,
            "http://report:9",
        )]);

        assert_eq!(
            table.resolve("localhost", "/a"),
            &[RouteMatch {
                mode: ProxyMode::AsynchronousReport,
                upstream: "http://report:9".to_string(),
            }]
        );
        assert!(table.resolve("localhost", "/b").is_empty());
        assert!(table.resolve("otherhost", "/a").is_empty());
    }

    #[test]
    fn test_multiple_matches_keep_declaration_order() {
        let table = RouteTable::build(&[
            entry("example.com", &["/x", "/y"], ProxyMode::Normal, "http://primary:80"),
            entry("example.com", &["/y"], ProxyMode::AsynchronousReport, "http://audit:80"),
            entry("other.com", &["/y"], ProxyMode::Normal, "http://elsewhere:80"),
        ]);

        let matches = table.resolve("example.com", "/y");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].mode, ProxyMode::Normal);
        assert_eq!(matches[0].upstream, "http://primary:80");
        assert_eq!(matches[1].mode, ProxyMode::AsynchronousReport);
        assert_eq!(matches[1].upstream, "http://audit:80");

        assert_eq!(table.resolve("example.com", "/x").len(), 1);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_duplicates_are_idempotent() {
        let table = RouteTable::build(&[
            entry("localhost", &["/a", "/a"], ProxyMode::Normal, "http://u:1"),
            entry("localhost", &["/a"], ProxyMode::Normal, "http://u:1"),
        ]);

        assert_eq!(table.resolve("localhost", "/a").len(), 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.origin(ProxyMode::Normal, "http://u:1", "localhost", "/a"), Some(0));
    }

    #[test]
    fn test_same_path_different_modes_on_one_upstream() {
        let table = RouteTable::build(&[
            entry("localhost", &["/a"], ProxyMode::Normal, "http://u:1"),
            entry("localhost", &["/a"], ProxyMode::AsynchronousReport, "http://u:1"),
        ]);

        assert!(table.contains(ProxyMode::Normal, "http://u:1", "localhost", "/a"));
        assert!(table.contains(ProxyMode::AsynchronousReport, "http://u:1", "localhost", "/a"));
        assert_eq!(table.resolve("localhost", "/a").len(), 2);
    }

    #[test]
    fn test_host_case_insensitive_path_exact() {
        let table = RouteTable::build(&[entry("Example.COM", &["/Api"], ProxyMode::Normal, "http://u:1")]);

        assert_eq!(table.resolve("example.com", "/Api").len(), 1);
        assert!(table.resolve("example.com", "/api").is_empty());
        assert!(table.resolve("example.com", "/Api/").is_empty());
        assert!(!table.contains(ProxyMode::AsynchronousReport, "http://u:1", "example.com", "/Api"));
    }

    #[test]
    fn test_resolve_returns_exactly_declared_pairs() {
        let routes = vec![
            entry("a.test", &["/1", "/2"], ProxyMode::Normal, "http://n:1"),
            entry("a.test", &["/2", "/3"], ProxyMode::AsynchronousReport, "http://r:1"),
            entry("b.test", &["/1"], ProxyMode::AsynchronousReport, "http://n:1"),
        ];
        let table = RouteTable::build(&routes);

        for host in ["a.test", "b.test", "c.test"] {
            for path in ["/1", "/2", "/3", "/4"] {
                let expected: Vec<RouteMatch> = routes
                    .iter()
                    .filter(|r| r.host == host && r.path.iter().any(|p| p == path))
                    .map(|r| RouteMatch { mode: r.mode, upstream: r.proxy_to.clone() })
                    .collect();
                assert_eq!(table.resolve(host, path), expected.as_slice(), "{host}{path}");
            }
        }
    }

    #[test]
    fn test_empty_table() {
        let table = RouteTable::build(&[]);
        assert!(table.is_empty());
        assert!(table.resolve("localhost", "/").is_empty());
    }
}
