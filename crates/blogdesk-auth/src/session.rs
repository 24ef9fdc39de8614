use std::sync::RwLock;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Client-held authentication state. Persisted as `{"token": "..."}`.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
}

impl Session {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// The token, treating an empty string as absent.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Shared access to the one session of a running client.
///
/// Readers are the request dispatcher and the navigation guard. Only the
/// login/logout flow and the 401 classification path write through it.
/// Implementations must make a write and its persistence appear as one
/// step to concurrent readers.
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;

    fn set_token(&self, token: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;

    fn has_token(&self) -> bool {
        self.token().is_some()
    }
}

/// Session store without persistence.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            session: RwLock::new(Session::with_token(token)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Option<String> {
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());
        session.token().map(str::to_string)
    }

    fn set_token(&self, token: &str) -> Result<()> {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        *session = Session::with_token(token);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        *session = Session::default();
        Ok(())
    }
}
