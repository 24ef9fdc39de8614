//! Advisory record of outstanding requests, keyed by request URL.
//!
//! Used only to decide when every request has settled. It neither
//! deduplicates nor cancels: a second request to the same URL overwrites
//! the first handle, and the first completion for a URL clears the entry.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

pub type RequestHandle = Uuid;

#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: Mutex<HashMap<String, RequestHandle>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new request for `url`, replacing any previous handle.
    pub fn register(&self, url: &str) -> RequestHandle {
        let handle = Uuid::new_v4();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(url.to_string(), handle);
        handle
    }

    /// Remove `url`. Returns `true` when this removal emptied the registry.
    pub fn complete(&self, url: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(url).is_some() && entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(url)
    }

    pub fn handle_for(&self, url: &str) -> Option<RequestHandle> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(url).copied()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
