//! `DocumentState`: the document plus its history and save bookkeeping.
//!
//! Every change flows through [`DocumentState::apply`], [`DocumentState::undo`]
//! or [`DocumentState::redo`]. A command is run against a private copy of the
//! document and only swapped in when it succeeds, so a refused command leaves
//! the state exactly as it was.

use std::sync::Arc;

use folio_engine::Outcome;
use folio_types::{Block, Document, ValidationError};

use crate::command::Command;
use crate::history::{DEFAULT_HISTORY_DEPTH, EditHistory};
use crate::save_state::SaveTracker;

#[derive(Clone, Debug)]
pub struct DocumentState {
    document: Arc<Document>,
    history: EditHistory,
    save: SaveTracker,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new(Document::default())
    }
}

impl DocumentState {
    pub fn new(document: Document) -> Self {
        Self::with_history_depth(document, DEFAULT_HISTORY_DEPTH)
    }

    pub fn with_history_depth(document: Document, depth: usize) -> Self {
        Self {
            document: Arc::new(document),
            history: EditHistory::new(depth),
            save: SaveTracker::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current document snapshot.
    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn blocks(&self) -> &[Block] {
        &self.document.blocks
    }

    pub fn title(&self) -> &str {
        &self.document.title
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn save_tracker(&self) -> &SaveTracker {
        &self.save
    }

    pub fn save_tracker_mut(&mut self) -> &mut SaveTracker {
        &mut self.save
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Apply a command in place.
    ///
    /// `Applied` records the pre-edit snapshot, clears redo and marks the
    /// document dirty. `NoOp` and errors leave everything untouched.
    pub fn apply(&mut self, command: &Command) -> Result<Outcome, ValidationError> {
        let mut next = Document::clone(&self.document);
        let outcome = command.execute(&mut next)?;
        if outcome.is_applied() {
            let before = std::mem::replace(&mut self.document, Arc::new(next));
            self.history.record(before);
            self.save.mark_edited();
        }
        Ok(outcome)
    }

    /// Restore the previous snapshot. `NoOp` when there is nothing to undo.
    pub fn undo(&mut self) -> Outcome {
        match self.history.undo(Arc::clone(&self.document)) {
            Some(previous) => {
                self.document = previous;
                self.save.mark_edited();
                Outcome::Applied
            }
            None => Outcome::NoOp,
        }
    }

    /// Re-apply the most recently undone snapshot. `NoOp` unless the last
    /// transitions were undos.
    pub fn redo(&mut self) -> Outcome {
        match self.history.redo(Arc::clone(&self.document)) {
            Some(next) => {
                self.document = next;
                self.save.mark_edited();
                Outcome::Applied
            }
            None => Outcome::NoOp,
        }
    }
}

/// Pure form of [`DocumentState::apply`]: returns the successor state.
pub fn apply(command: &Command, state: &DocumentState) -> Result<DocumentState, ValidationError> {
    let mut next = state.clone();
    let _ = next.apply(command)?;
    Ok(next)
}
