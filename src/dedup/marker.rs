//! Dedup marker stores.
//!
//! # Responsibilities
//! - Record that a report has been dispatched for a token
//! - Answer "already reported?" for a token
//! - Remove the record when the report cycle completes
//!
//! # Design Decisions
//! - `mark` is an atomic create-if-absent; it is the only serialization point
//! - A marker carries no payload, existence is the whole state
//! - Absence on `is_marked` is `false`, never an error

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;

use dashmap::DashSet;

use crate::dedup::error::DedupError;
use crate::dedup::identity::IdentityToken;
use crate::dedup::storage::StorageDir;

/// Result of a successful `mark`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// This call created the marker.
    Created,
    /// The marker already existed; someone else owns the report.
    AlreadyMarked,
}

/// Existence-only flags keyed by identity token.
pub trait MarkerStore: Send + Sync + std::fmt::Debug {
    /// Create the marker if absent. Idempotent.
    fn mark(&self, token: &IdentityToken) -> Result<MarkOutcome, DedupError>;

    fn is_marked(&self, token: &IdentityToken) -> Result<bool, DedupError>;

    /// Remove the marker. `NotFound` if it does not exist.
    fn unmark(&self, token: &IdentityToken) -> Result<(), DedupError>;
}

/// Markers as empty `<token>.flag` files.
#[derive(Debug, Clone)]
pub struct FileMarkerStore {
    storage: StorageDir,
}

impl FileMarkerStore {
    pub fn new(storage: StorageDir) -> Self {
        Self { storage }
    }
}

impl MarkerStore for FileMarkerStore {
    fn mark(&self, token: &IdentityToken) -> Result<MarkOutcome, DedupError> {
        let path = self.storage.marker_path(token);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(MarkOutcome::Created),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(MarkOutcome::AlreadyMarked),
            Err(e) => Err(DedupError::storage(path, e)),
        }
    }

    fn is_marked(&self, token: &IdentityToken) -> Result<bool, DedupError> {
        let path = self.storage.marker_path(token);
        match fs::metadata(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DedupError::storage(path, e)),
        }
    }

    fn unmark(&self, token: &IdentityToken) -> Result<(), DedupError> {
        let path = self.storage.marker_path(token);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DedupError::NotFound {
                token: token.to_string(),
            }),
            Err(e) => Err(DedupError::storage(path, e)),
        }
    }
}

/// Markers in a concurrent in-process set.
#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    marked: DashSet<IdentityToken>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.marked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marked.is_empty()
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn mark(&self, token: &IdentityToken) -> Result<MarkOutcome, DedupError> {
        if self.marked.insert(token.clone()) {
            Ok(MarkOutcome::Created)
        } else {
            Ok(MarkOutcome::AlreadyMarked)
        }
    }

    fn is_marked(&self, token: &IdentityToken) -> Result<bool, DedupError> {
        Ok(self.marked.contains(token))
    }

    fn unmark(&self, token: &IdentityToken) -> Result<(), DedupError> {
        self.marked
            .remove(token)
            .map(|_| ())
            .ok_or_else(|| DedupError::NotFound {
                token: token.to_string(),
            })
    }
}
