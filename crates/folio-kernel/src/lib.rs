//! Editing session for folio documents.
//!
//! [`folio_engine`] answers questions about a block list; this crate owns
//! the *changing* document: commands, undo/redo, save bookkeeping and the
//! background autosave that pushes snapshots to a [`DocumentPersistence`].
//!
//! # Key Types
//!
//! |-----------------------|------------------------------------------------|
//! | Type                  | Purpose                                        |
//! |-----------------------|------------------------------------------------|
//! | [`Command`]           | One edit, serializable as `{"op": ...}`        |
//! | [`DocumentState`]     | Document + [`EditHistory`] + [`SaveTracker`]   |
//! | [`EditorSession`]     | Locked state, events, evaluation, autosave     |
//! | [`DocumentPersistence`]| Async load/save seam                          |
//! | [`SessionConfig`]     | History depth and autosave timing (RON)        |
//! |-----------------------|------------------------------------------------|

pub mod autosave;
pub mod command;
pub mod config;
pub mod history;
pub mod persistence;
pub mod save_state;
pub mod session;
pub mod state;

pub use autosave::Autosaver;
pub use command::{Command, HistoryStep, Step, parse_script};
pub use config::{AutosaveConfig, ConfigError, SessionConfig};
pub use history::{DEFAULT_HISTORY_DEPTH, EditHistory};
pub use persistence::{
    DocumentPersistence, JsonFilePersistence, MemoryPersistence, PersistenceError,
};
pub use save_state::{SaveStatus, SaveTracker};
pub use session::{EditorSession, SessionEvent};
pub use state::{DocumentState, apply};
