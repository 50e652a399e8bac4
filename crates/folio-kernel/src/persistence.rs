//! Persistence seam: where documents are loaded from and saved to.
//!
//! The session never touches storage directly; it hands whole document
//! snapshots to a [`DocumentPersistence`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use folio_types::Document;

/// Why a load or save failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no document stored")]
    NotFound,

    #[error("save timed out after {0:?}")]
    Timeout(Duration),

    #[error("save cancelled")]
    Cancelled,

    #[error("backend error: {0}")]
    Backend(String),
}

/// Load and save one document.
#[async_trait]
pub trait DocumentPersistence: Send + Sync {
    async fn load(&self) -> Result<Document, PersistenceError>;

    async fn save(&self, document: &Document) -> Result<(), PersistenceError>;

    /// Human-readable target, for logs.
    fn describe(&self) -> String;
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-memory store with failure injection and save counting.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    stored: Mutex<Option<Document>>,
    delay: Option<Duration>,
    fail_next: AtomicUsize,
    attempts: AtomicUsize,
    saves: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `document` already stored.
    pub fn with_document(document: Document) -> Self {
        Self {
            stored: Mutex::new(Some(document)),
            ..Self::default()
        }
    }

    /// Make every save take `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next `count` saves with a backend error.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Save calls so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Highest number of saves observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Most recently stored document.
    pub fn stored(&self) -> Option<Document> {
        self.stored.lock().clone()
    }
}

/// Counts a running save; released on drop so aborted saves are counted out too.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
    count: usize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Self { counter, count }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentPersistence for MemoryPersistence {
    async fn load(&self) -> Result<Document, PersistenceError> {
        self.stored.lock().clone().ok_or(PersistenceError::NotFound)
    }

    async fn save(&self, document: &Document) -> Result<(), PersistenceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let running = InFlight::enter(&self.in_flight);
        self.max_in_flight.fetch_max(running.count, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        drop(running);

        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PersistenceError::Backend("injected failure".into()));
        }

        *self.stored.lock() = Some(document.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

// ============================================================================
// JSON file backend
// ============================================================================

/// One pretty-printed JSON file per document.
///
/// Saves write a sibling temp file and rename it over the target, so a crash
/// mid-write never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "document.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl DocumentPersistence for JsonFilePersistence {
    async fn load(&self) -> Result<Document, PersistenceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Document::from_json(&content)?)
    }

    async fn save(&self, document: &Document) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(document)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "wrote document");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
