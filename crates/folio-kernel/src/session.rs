//! `EditorSession`: the explicit owner of one open document.
//!
//! Edits are synchronous and run to completion under a mutex; the only
//! background work is the [`Autosaver`]. After every change the session
//! recomputes the [`Evaluation`] (visibility, pricing, completion gate) and
//! announces the new revision on a broadcast channel.
//!
//! ```text
//!  apply / undo / redo ──► DocumentState ──► Evaluation (cached context)
//!          │
//!          ├──► SessionEvent::Changed ──► subscribers
//!          └──► notify ──► Autosaver ──(quiet period)──► save_pending ──► DocumentPersistence
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};
use tokio_util::sync::CancellationToken;

use folio_engine::{ContextCache, Evaluation, Outcome, SubmissionError};
use folio_types::{Document, ValidationError};

use crate::autosave::Autosaver;
use crate::command::{Command, HistoryStep, Step};
use crate::config::SessionConfig;
use crate::persistence::{DocumentPersistence, PersistenceError};
use crate::save_state::SaveStatus;
use crate::state::DocumentState;

/// Broadcast channel capacity. Slow subscribers see `Lagged`, never block edits.
const EVENT_CAPACITY: usize = 256;

/// Events broadcast when the session changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The document changed (edit, undo or redo).
    Changed { revision: u64 },
    /// A save of `revision` started.
    SaveStarted { revision: u64 },
    /// `revision` is persisted.
    Saved { revision: u64 },
    /// Saving `revision` failed; the document stays dirty.
    SaveFailed { revision: u64, error: String },
}

/// Mutable session state, always locked together.
struct Core {
    state: DocumentState,
    cache: ContextCache,
    evaluation: Arc<Evaluation>,
}

impl Core {
    fn new(state: DocumentState) -> Self {
        let mut cache = ContextCache::new();
        let evaluation = Arc::new(Evaluation::cached(state.blocks(), &mut cache));
        Self {
            state,
            cache,
            evaluation,
        }
    }

    fn refresh(&mut self) {
        self.evaluation = Arc::new(Evaluation::cached(self.state.blocks(), &mut self.cache));
    }
}

/// State shared between the session handle and its autosaver.
pub(crate) struct SessionShared {
    core: Mutex<Core>,
    events: broadcast::Sender<SessionEvent>,
    persistence: Arc<dyn DocumentPersistence>,
    pub(crate) config: SessionConfig,
    /// Serializes saves: at most one in flight.
    save_lock: tokio::sync::Mutex<()>,
    /// Woken on every applied change.
    pub(crate) edited: Notify,
    pub(crate) cancel: CancellationToken,
}

impl SessionShared {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn changed(&self, revision: u64) {
        self.emit(SessionEvent::Changed { revision });
        self.edited.notify_one();
    }

    /// Save until the document is clean or a save fails.
    ///
    /// Edits that land while a save is in flight are picked up by one
    /// follow-up save of the latest snapshot. Returns the last revision
    /// persisted, or `None` when there was nothing to save.
    pub(crate) async fn save_pending(&self) -> Result<Option<u64>, PersistenceError> {
        let _guard = self.save_lock.lock().await;
        let mut persisted = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(PersistenceError::Cancelled);
            }

            let (revision, snapshot) = {
                let mut core = self.core.lock();
                match core.state.save_tracker_mut().begin_save() {
                    Some(revision) => (revision, Arc::clone(core.state.document())),
                    None => return Ok(persisted),
                }
            };
            self.emit(SessionEvent::SaveStarted { revision });

            let timeout = self.config.autosave.save_timeout();
            let result = tokio::select! {
                _ = self.cancel.cancelled() => Err(PersistenceError::Cancelled),
                outcome = tokio::time::timeout(timeout, self.persistence.save(&snapshot)) => {
                    outcome.unwrap_or(Err(PersistenceError::Timeout(timeout)))
                }
            };

            let still_dirty = {
                let mut core = self.core.lock();
                let settled = result.as_ref().map(|_| ()).map_err(|e| e.to_string());
                core.state.save_tracker_mut().finish_save(revision, settled)
            };

            match result {
                Ok(()) => {
                    tracing::info!(
                        revision,
                        target = %self.persistence.describe(),
                        "saved document"
                    );
                    self.emit(SessionEvent::Saved { revision });
                    persisted = Some(revision);
                    if !still_dirty {
                        return Ok(persisted);
                    }
                    tracing::debug!(revision, "edits arrived during save, saving again");
                }
                Err(e) => {
                    tracing::warn!(revision, error = %e, "save failed");
                    self.emit(SessionEvent::SaveFailed {
                        revision,
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }
    }
}

/// One open document with history, evaluation and autosave.
pub struct EditorSession {
    shared: Arc<SessionShared>,
    autosaver: Option<Autosaver>,
}

impl EditorSession {
    /// Open a session over `document`.
    ///
    /// Autosave starts when enabled in `config` and a Tokio runtime is
    /// available; otherwise only [`save_now`](Self::save_now) persists.
    pub fn new(
        document: Document,
        persistence: Arc<dyn DocumentPersistence>,
        config: SessionConfig,
    ) -> Self {
        let state = DocumentState::with_history_depth(document, config.history_depth);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let autosave_enabled = config.autosave.enabled;

        let shared = Arc::new(SessionShared {
            core: Mutex::new(Core::new(state)),
            events,
            persistence,
            config,
            save_lock: tokio::sync::Mutex::new(()),
            edited: Notify::new(),
            cancel: CancellationToken::new(),
        });

        let autosaver = if autosave_enabled {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => Some(Autosaver::spawn(&handle, Arc::clone(&shared))),
                Err(_) => {
                    tracing::warn!("no Tokio runtime, autosave disabled");
                    None
                }
            }
        } else {
            None
        };

        Self { shared, autosaver }
    }

    /// Load the document from `persistence` and open a session over it.
    pub async fn open(
        persistence: Arc<dyn DocumentPersistence>,
        config: SessionConfig,
    ) -> Result<Self, PersistenceError> {
        let document = persistence.load().await?;
        tracing::info!(
            source = %persistence.describe(),
            blocks = document.blocks.len(),
            "opened document"
        );
        Ok(Self::new(document, persistence, config))
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Apply one command. A refused command changes nothing.
    pub fn apply(&self, command: &Command) -> Result<Outcome, ValidationError> {
        let result = {
            let mut core = self.shared.core.lock();
            let result = core.state.apply(command);
            if matches!(result, Ok(Outcome::Applied)) {
                core.refresh();
            }
            result.map(|outcome| (outcome, core.state.save_tracker().revision()))
        };

        match result {
            Ok((Outcome::Applied, revision)) => {
                tracing::debug!(op = command.name(), revision, "applied command");
                self.shared.changed(revision);
                Ok(Outcome::Applied)
            }
            Ok((Outcome::NoOp, _)) => {
                tracing::warn!(op = command.name(), "command had no effect");
                Ok(Outcome::NoOp)
            }
            Err(e) => {
                tracing::warn!(op = command.name(), error = %e, "command refused");
                Err(e)
            }
        }
    }

    pub fn undo(&self) -> Outcome {
        self.navigate(HistoryStep::Undo)
    }

    pub fn redo(&self) -> Outcome {
        self.navigate(HistoryStep::Redo)
    }

    fn navigate(&self, step: HistoryStep) -> Outcome {
        let (outcome, revision) = {
            let mut core = self.shared.core.lock();
            let outcome = match step {
                HistoryStep::Undo => core.state.undo(),
                HistoryStep::Redo => core.state.redo(),
            };
            if outcome.is_applied() {
                core.refresh();
            }
            (outcome, core.state.save_tracker().revision())
        };
        if outcome.is_applied() {
            tracing::debug!(?step, revision, "history step");
            self.shared.changed(revision);
        }
        outcome
    }

    /// Run one script step.
    pub fn run_step(&self, step: &Step) -> Result<Outcome, ValidationError> {
        match step {
            Step::History(history) => Ok(self.navigate(*history)),
            Step::Edit(command) => self.apply(command),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current document snapshot.
    pub fn document(&self) -> Arc<Document> {
        Arc::clone(self.shared.core.lock().state.document())
    }

    /// Evaluation of the current document.
    pub fn evaluation(&self) -> Arc<Evaluation> {
        Arc::clone(&self.shared.core.lock().evaluation)
    }

    /// Read the full state under the lock.
    pub fn with_state<R>(&self, f: impl FnOnce(&DocumentState) -> R) -> R {
        f(&self.shared.core.lock().state)
    }

    pub fn save_status(&self) -> SaveStatus {
        self.with_state(|s| s.save_tracker().status())
    }

    pub fn is_dirty(&self) -> bool {
        self.with_state(|s| s.save_tracker().is_dirty())
    }

    pub fn revision(&self) -> u64 {
        self.with_state(|s| s.save_tracker().revision())
    }

    pub fn can_undo(&self) -> bool {
        self.with_state(DocumentState::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.with_state(DocumentState::can_redo)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Completion gate for the current document.
    pub fn submit(&self) -> Result<(), SubmissionError> {
        self.evaluation().submission.clone().into_result()
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Save now, waiting for any autosave already in flight.
    pub async fn save_now(&self) -> Result<(), PersistenceError> {
        self.shared.save_pending().await.map(|_| ())
    }

    /// Stop autosave and abort any save in flight. Unsaved changes stay
    /// unsaved; call [`save_now`](Self::save_now) first to keep them.
    pub async fn close(mut self) {
        self.shared.cancel.cancel();
        if let Some(autosaver) = self.autosaver.take() {
            autosaver.join().await;
        }
        if self.is_dirty() {
            tracing::warn!(revision = self.revision(), "closed with unsaved changes");
        }
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}
