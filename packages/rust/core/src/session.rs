//! In-memory session store.
//!
//! Each session sits behind its own async mutex. Operations on one session
//! id run one at a time; different sessions never contend.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use reportsmith_shared::{FileType, GeneratedContent, Template};

use crate::context::SourceFiles;

/// Session used when the caller does not name one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Shared handle to one session.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// One stored upload: its sanitized name, where it was written, and the
/// type detected from its extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub filename: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub file_type: FileType,
}

/// Working state of one report: sources, template, and the latest output.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    /// Stored uploads in upload order. Re-uploads append again.
    pub files: Vec<UploadedFile>,
    /// Latest extraction per filename.
    pub extracted: SourceFiles,
    pub template: Template,
    pub generated: Option<GeneratedContent>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session with the default template.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            files: Vec::new(),
            extracted: SourceFiles::new(),
            template: Template::default_report(),
            generated: None,
            created_at: Utc::now(),
        }
    }
}

struct Entry {
    session: SessionHandle,
    last_used: Instant,
}

/// Owns every live session, keyed by id.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a session, marking it as used.
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        let mut map = self.map();
        let entry = map.get_mut(id)?;
        entry.last_used = Instant::now();
        Some(entry.session.clone())
    }

    /// Look up a session, creating it with the default template if absent.
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        let mut map = self.map();
        let entry = map.entry(id.to_string()).or_insert_with(|| {
            debug!(session = id, "session created");
            Entry {
                session: Arc::new(tokio::sync::Mutex::new(Session::new(id))),
                last_used: Instant::now(),
            }
        });
        entry.last_used = Instant::now();
        entry.session.clone()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.map().contains_key(id)
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.map().remove(id).is_some()
    }

    /// All session ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.map().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Remove sessions unused for longer than `ttl`. Sessions with an
    /// operation in flight are kept. Returns how many were removed.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, entry| {
            entry.last_used.elapsed() <= ttl || Arc::strong_count(&entry.session) > 1
        });
        let evicted = before - map.len();
        if evicted > 0 {
            info!(evicted, remaining = map.len(), "idle sessions evicted");
        }
        evicted
    }
}
