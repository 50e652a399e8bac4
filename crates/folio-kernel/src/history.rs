//! Bounded undo/redo stacks of whole-document snapshots.
//!
//! Snapshots are `Arc<Document>`, so recording one is a pointer copy; the
//! document itself is only cloned when a command mutates it.

use std::collections::VecDeque;
use std::sync::Arc;

use folio_types::Document;

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Undo and redo stacks.
///
/// Exceeding `depth` silently drops the oldest undo entry.
#[derive(Clone, Debug)]
pub struct EditHistory {
    undo: VecDeque<Arc<Document>>,
    redo: Vec<Arc<Document>>,
    depth: usize,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl EditHistory {
    pub fn new(depth: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(depth.min(64)),
            redo: Vec::new(),
            depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Record the pre-mutation snapshot of a new edit. Clears redo.
    pub fn record(&mut self, before: Arc<Document>) {
        self.push_undo(before);
        self.redo.clear();
    }

    fn push_undo(&mut self, snapshot: Arc<Document>) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.depth {
            self.undo.pop_front();
        }
    }

    /// Step back: returns the snapshot to restore and stashes `current` for redo.
    pub fn undo(&mut self, current: Arc<Document>) -> Option<Arc<Document>> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: Arc<Document>) -> Option<Arc<Document>> {
        let next = self.redo.pop()?;
        self.push_undo(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Forget everything, e.g. after loading a different document.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str) -> Arc<Document> {
        Arc::new(Document::new(title))
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut history = EditHistory::new(10);
        history.record(doc("v0"));

        let restored = history.undo(doc("v1")).unwrap();
        assert_eq!(restored.title, "v0");
        assert!(history.can_redo());

        let again = history.redo(restored).unwrap();
        assert_eq!(again.title, "v1");
        assert_eq!(history.undo_len(), 1);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_stacks_return_none() {
        let mut history = EditHistory::default();
        assert!(history.undo(doc("x")).is_none());
        assert!(history.redo(doc("x")).is_none());
        assert_eq!(history.depth(), DEFAULT_HISTORY_DEPTH);
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = EditHistory::new(10);
        history.record(doc("v0"));
        let _ = history.undo(doc("v1"));
        history.record(doc("v0"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_depth_evicts_oldest() {
        let mut history = EditHistory::new(3);
        for i in 0..5 {
            history.record(doc(&format!("v{i}")));
        }
        assert_eq!(history.undo_len(), 3);

        let mut current = doc("v5");
        let mut seen = Vec::new();
        while let Some(prev) = history.undo(current) {
            seen.push(prev.title.clone());
            current = prev;
        }
        assert_eq!(seen, ["v4", "v3", "v2"]);
    }

    #[test]
    fn test_zero_depth_disables_undo() {
        let mut history = EditHistory::new(0);
        history.record(doc("v0"));
        assert!(!history.can_undo());
    }
}
