//! Identity tokens for dedup markers.
//!
//! A token is `base64(md5(path + session + path + stamp))` with every
//! character outside `[A-Za-z0-9]` removed, so it is always a safe file name.
//!
//! The stamp is nanoseconds since the Unix epoch by default. Two calls for the
//! same request therefore produce different tokens; callers compute the token
//! once and thread it through. With a window configured, the stamp is the
//! window index instead, and requests for the same path and session inside
//! one window share a token.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine};
use md5::{Digest, Md5};

use crate::dedup::error::DedupError;

/// Filesystem-safe request identity. Only `[A-Za-z0-9]` characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityToken(String);

impl IdentityToken {
    /// Fixed token for tests. Panics outside the token charset.
    #[cfg(test)]
    pub(crate) fn literal(raw: &str) -> Self {
        assert!(!raw.is_empty() && raw.chars().all(|c| c.is_ascii_alphanumeric()));
        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdentityToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes identity tokens.
#[derive(Debug, Clone)]
pub struct IdentityHasher {
    cookie_name: String,
    window: Option<Duration>,
}

impl IdentityHasher {
    /// `cookie_name` is only used in error reports.
    pub fn new(cookie_name: impl Into<String>, window: Option<Duration>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            window: window.filter(|w| !w.is_zero()),
        }
    }

    /// Token for `path` and `session` at the current time.
    pub fn compute_token(&self, path: &str, session: Option<&str>) -> Result<IdentityToken, DedupError> {
        let stamp = self.current_stamp();
        self.compute_token_at(path, session, stamp)
    }

    /// Token for an explicit stamp. Deterministic.
    pub fn compute_token_at(
        &self,
        path: &str,
        session: Option<&str>,
        stamp: u128,
    ) -> Result<IdentityToken, DedupError> {
        let session = session
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DedupError::MissingIdentityInput {
                cookie: self.cookie_name.clone(),
            })?;

        let mut hasher = Md5::new();
        hasher.update(path.as_bytes());
        hasher.update(session.as_bytes());
        hasher.update(path.as_bytes());
        hasher.update(stamp.to_string().as_bytes());
        let encoded = STANDARD.encode(hasher.finalize());

        // The last base64 character of a 16-byte digest carries two bits and
        // is always one of A, Q, g or w, so the token is never empty.
        Ok(IdentityToken(
            encoded.chars().filter(char::is_ascii_alphanumeric).collect(),
        ))
    }

    fn current_stamp(&self) -> u128 {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        match self.window {
            Some(window) => (elapsed.as_secs() / window.as_secs().max(1)) as u128,
            None => elapsed.as_nanos(),
        }
    }
}
