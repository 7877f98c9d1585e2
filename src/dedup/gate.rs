//! Report gate: decides whether a request may trigger a report, once.
//!
//! # Request Flow
//! ```text
//! check(path, session)        → token, skip if already marked
//! [forward to primary upstream]
//! claim(token, response body) → capture, then mark (atomic)
//!     Created       → caller dispatches the report
//!     AlreadyMarked → someone else reports, skip
//! [report delivered or failed]
//! release(token)              → delete capture, unmark
//! ```

use std::sync::Arc;

use crate::config::DedupConfig;
use crate::dedup::capture::CaptureSink;
use crate::dedup::error::DedupError;
use crate::dedup::identity::{IdentityHasher, IdentityToken};
use crate::dedup::marker::{FileMarkerStore, MarkOutcome, MarkerStore};
use crate::dedup::storage::StorageDir;

/// Outcome of the pre-forward check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// No report is recorded for this token yet.
    Fresh(IdentityToken),
    /// A report for this token is already in flight.
    Duplicate(IdentityToken),
}

/// Outcome of claiming a token after the response was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// This caller owns the report.
    Owned(IdentityToken),
    /// Another request marked the token first.
    Lost(IdentityToken),
}

/// Identity hasher, marker store and capture sink behind one interface.
#[derive(Debug, Clone)]
pub struct ReportGate {
    hasher: IdentityHasher,
    markers: Arc<dyn MarkerStore>,
    captures: CaptureSink,
}

impl ReportGate {
    pub fn new(hasher: IdentityHasher, markers: Arc<dyn MarkerStore>, captures: CaptureSink) -> Self {
        Self {
            hasher,
            markers,
            captures,
        }
    }

    /// File-backed gate rooted at the configured directory.
    pub fn from_config(config: &DedupConfig) -> Result<Self, DedupError> {
        let storage = StorageDir::new(&config.directory);
        storage.ensure()?;
        Ok(Self::new(
            IdentityHasher::new(&config.session_cookie, config.window),
            Arc::new(FileMarkerStore::new(storage.clone())),
            CaptureSink::new(storage),
        ))
    }

    pub fn check(&self, path: &str, session: Option<&str>) -> Result<Admission, DedupError> {
        let token = self.hasher.compute_token(path, session)?;
        if self.markers.is_marked(&token)? {
            Ok(Admission::Duplicate(token))
        } else {
            Ok(Admission::Fresh(token))
        }
    }

    /// Capture `body` and mark the token.
    ///
    /// A losing claim leaves the capture in place; it belongs to the winner.
    /// A failed mark removes the capture it just wrote.
    pub fn claim(&self, token: IdentityToken, body: &[u8]) -> Result<Claim, DedupError> {
        self.captures.capture(&token, body)?;
        match self.markers.mark(&token) {
            Ok(MarkOutcome::Created) => Ok(Claim::Owned(token)),
            Ok(MarkOutcome::AlreadyMarked) => Ok(Claim::Lost(token)),
            Err(e) => {
                if let Err(cleanup) = self.captures.delete(&token) {
                    tracing::warn!(token = %token, error = %cleanup, "Failed to remove orphaned capture");
                }
                Err(e)
            }
        }
    }

    /// Captured body for an owned token.
    pub fn captured(&self, token: &IdentityToken) -> Result<Vec<u8>, DedupError> {
        self.captures.retrieve(token)
    }

    /// End of a report cycle. Missing files are not an error here.
    pub fn release(&self, token: &IdentityToken) -> Result<(), DedupError> {
        let capture = self.captures.delete(token);
        let marker = self.markers.unmark(token);
        for result in [capture, marker] {
            match result {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn markers(&self) -> &Arc<dyn MarkerStore> {
        &self.markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::marker::MemoryMarkerStore;
    use std::time::Duration;

    fn gate(dir: &std::path::Path, window: Option<Duration>) -> ReportGate {
        ReportGate::from_config(&DedupConfig {
            session_cookie: "ci_session".into(),
            directory: dir.to_path_buf(),
            window,
        })
        .unwrap()
    }

    #[test]
    fn test_full_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), None);

        let token = match gate.check("/a", Some("sess")).unwrap() {
            Admission::Fresh(token) => token,
            other => panic!("expected fresh, got {other:?}"),
        };
        let owned = match gate.claim(token.clone(), b"payload").unwrap() {
            Claim::Owned(t) => t,
            other => panic!("expected owned, got {other:?}"),
        };
        assert_eq!(owned, token);
        assert_eq!(gate.captured(&token).unwrap(), b"payload");
        assert!(gate.markers().is_marked(&token).unwrap());

        gate.release(&token).unwrap();
        assert!(!gate.markers().is_marked(&token).unwrap());
        assert!(gate.captured(&token).unwrap_err().is_not_found());

        // Releasing twice is harmless.
        gate.release(&token).unwrap();
    }

    #[test]
    fn test_second_request_in_window_is_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), Some(Duration::from_secs(3600)));

        let Admission::Fresh(token) = gate.check("/a", Some("sess")).unwrap() else {
            panic!("first request must be fresh");
        };
        assert!(matches!(gate.claim(token.clone(), b"x").unwrap(), Claim::Owned(_)));

        match gate.check("/a", Some("sess")).unwrap() {
            Admission::Duplicate(t) => assert_eq!(t, token),
            // Window rolled over between the two calls.
            Admission::Fresh(_) => {}
        }
    }

    #[test]
    fn test_concurrent_claims_single_owner() {
        let dir = tempfile::tempdir().unwrap();
        let gate = ReportGate::new(
            IdentityHasher::new("ci_session", None),
            Arc::new(MemoryMarkerStore::new()),
            CaptureSink::new(StorageDir::new(dir.path())),
        );
        let token = IdentityToken::literal("sametoken");

        let first = gate.claim(token.clone(), b"one").unwrap();
        let second = gate.claim(token.clone(), b"two").unwrap();
        assert_eq!(first, Claim::Owned(token.clone()));
        assert_eq!(second, Claim::Lost(token));
    }

    #[test]
    fn test_missing_session_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), None);
        assert!(matches!(
            gate.check("/a", None),
            Err(DedupError::MissingIdentityInput { .. })
        ));
    }

    #[derive(Debug)]
    struct BrokenMarkers;

    impl MarkerStore for BrokenMarkers {
        fn mark(&self, token: &IdentityToken) -> Result<MarkOutcome, DedupError> {
            Err(DedupError::storage(
                format!("/unwritable/{token}.flag"),
                std::io::Error::other("disk full"),
            ))
        }

        fn is_marked(&self, _token: &IdentityToken) -> Result<bool, DedupError> {
            Ok(false)
        }

        fn unmark(&self, token: &IdentityToken) -> Result<(), DedupError> {
            Err(DedupError::NotFound {
                token: token.to_string(),
            })
        }
    }

    #[test]
    fn test_failed_mark_removes_capture() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageDir::new(dir.path());
        let gate = ReportGate::new(
            IdentityHasher::new("ci_session", None),
            Arc::new(BrokenMarkers),
            CaptureSink::new(storage.clone()),
        );
        let Admission::Fresh(token) = gate.check("/a", Some("sess")).unwrap() else {
            panic!("nothing is marked");
        };

        assert!(matches!(
            gate.claim(token.clone(), b"payload"),
            Err(DedupError::StorageUnavailable { .. })
        ));
        assert!(!storage.capture_path(&token).exists());
        assert!(gate.captured(&token).unwrap_err().is_not_found());
    }
}
