//! Turning route matches into a forwarding decision.

use crate::config::ProxyMode;
use crate::routing::table::{RouteMatch, RouteTable};

/// Where one request goes: a primary upstream and zero or more report targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    /// Upstream that serves the client response.
    pub primary: String,
    /// Distinct upstreams that receive the asynchronous report.
    pub reports: Vec<String>,
}

impl DispatchPlan {
    /// Primary is the first `Normal` match, or the first match when none is
    /// `Normal`. Report targets are the distinct `AsynchronousReport`
    /// upstreams in match order, the primary included when it is one of them.
    /// Returns `None` for an empty match list.
    pub fn from_matches(matches: &[RouteMatch]) -> Option<Self> {
        let primary = matches
            .iter()
            .find(|m| m.mode == ProxyMode::Normal)
            .or_else(|| matches.first())?
            .upstream
            .clone();

        let mut reports: Vec<String> = Vec::new();
        for m in matches.iter().filter(|m| m.mode == ProxyMode::AsynchronousReport) {
            if !reports.contains(&m.upstream) {
                reports.push(m.upstream.clone());
            }
        }

        Some(Self { primary, reports })
    }

    pub fn wants_report(&self) -> bool {
        !self.reports.is_empty()
    }
}

/// Resolve a request authority and path.
///
/// The authority is tried as given (it may carry a port, as in
/// `localhost:8080`). If nothing matches, the bare hostname is tried.
pub fn resolve_request<'a>(table: &'a RouteTable, authority: &str, path: &str) -> &'a [RouteMatch] {
    let matches = table.resolve(authority, path);
    if !matches.is_empty() {
        return matches;
    }
    match strip_port(authority) {
        Some(host) => table.resolve(host, path),
        None => matches,
    }
}

fn strip_port(authority: &str) -> Option<&str> {
    // Bracketed IPv6 literal: "[::1]:8080"
    if let Some(rest) = authority.strip_prefix('[') {
        let end = rest.find(']')?;
        return rest[end + 1..]
            .starts_with(':')
            .then(|| &authority[..end + 2]);
    }
    let (host, port) = authority.rsplit_once(':')?;
    (!port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())).then_some(host)
}
