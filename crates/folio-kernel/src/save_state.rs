//! Save tracking: revisions, the in-flight save, and the visible status.
//!
//! ```text
//!        edit            begin_save         ok, clean
//!  Idle ──────► Dirty ─────────────► Saving ──────────► Saved
//!                 ▲                    │  │                │
//!                 │        ok, dirty   │  │ failed         │ edit
//!                 └────────────────────┘  ▼                ▼
//!                 ◄──────────────────── Error            Dirty
//!                      begin_save (retry)
//! ```
//!
//! The dirty flag is `revision != saved_revision`; it is never cleared by a
//! failed save. Edits made while a save is in flight bump `revision` but keep
//! the status at `Saving` until that save settles.

use serde::{Deserialize, Serialize};

/// User-visible save status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    /// Nothing edited since load.
    #[default]
    Idle,
    /// Unsaved changes, no save running.
    Dirty,
    /// A save is in flight.
    Saving,
    /// Everything persisted.
    Saved,
    /// Last save failed; changes are still unsaved.
    Error,
}

impl SaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Dirty => "dirty",
            SaveStatus::Saving => "saving",
            SaveStatus::Saved => "saved",
            SaveStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Revision bookkeeping behind [`SaveStatus`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveTracker {
    revision: u64,
    saved_revision: u64,
    in_flight: Option<u64>,
    status: SaveStatus,
    last_error: Option<String>,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current document revision (bumped on every applied change).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Revision most recently persisted.
    pub fn saved_revision(&self) -> u64 {
        self.saved_revision
    }

    /// Revision being saved right now, if any.
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Record an applied change.
    pub fn mark_edited(&mut self) -> u64 {
        self.revision += 1;
        if self.in_flight.is_none() {
            self.status = SaveStatus::Dirty;
        }
        self.revision
    }

    /// Claim the save slot for the current revision.
    ///
    /// `None` when already saving or there is nothing to save.
    pub fn begin_save(&mut self) -> Option<u64> {
        if self.in_flight.is_some() || !self.is_dirty() {
            return None;
        }
        self.in_flight = Some(self.revision);
        self.status = SaveStatus::Saving;
        Some(self.revision)
    }

    /// Settle the in-flight save of `revision`.
    ///
    /// Returns whether the document is still dirty, i.e. a follow-up save
    /// is owed.
    pub fn finish_save(&mut self, revision: u64, result: Result<(), String>) -> bool {
        if self.in_flight == Some(revision) {
            self.in_flight = None;
        }
        match result {
            Ok(()) => {
                self.saved_revision = self.saved_revision.max(revision);
                self.last_error = None;
                self.status = if self.is_dirty() {
                    SaveStatus::Dirty
                } else {
                    SaveStatus::Saved
                };
            }
            Err(error) => {
                self.last_error = Some(error);
                self.status = SaveStatus::Error;
            }
        }
        self.is_dirty()
    }
}
