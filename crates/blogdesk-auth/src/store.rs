use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};

use crate::session::{Session, SessionStore};

const SESSION_FILE: &str = "session.json";

/// Session store persisted as JSON under a config directory.
///
/// The file is read once at construction; every mutation rewrites it while
/// the in-memory lock is still held. The in-memory session is updated even
/// when the write fails, so a cleared token is never sent again.
#[derive(Debug)]
pub struct FileSessionStore {
    store_path: PathBuf,
    session: RwLock<Session>,
}

impl FileSessionStore {
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME").map_err(|_| anyhow!("HOME is not set"))?;
        let config_dir = Path::new(&home).join(".config").join("blogdesk");
        Self::from_config_dir(config_dir)
    }

    pub fn from_config_dir(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let store_path = config_dir.into().join(SESSION_FILE);
        let session = load_session(&store_path)?;
        Ok(Self {
            store_path,
            session: RwLock::new(session),
        })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn replace(&self, next: Session) -> Result<()> {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        *session = next;
        save_session(&self.store_path, &session)
    }
}

fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Ok(Session::default());
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("ignoring unreadable session file {}: {e}", path.display());
            return Ok(Session::default());
        }
    };

    match serde_json::from_str::<Session>(&content) {
        Ok(session) => Ok(session),
        Err(e) => {
            tracing::warn!("ignoring unreadable session file {}: {e}", path.display());
            Ok(Session::default())
        }
    }
}

fn save_session(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let payload = serde_json::to_string_pretty(session).context("serialize session")?;
    fs::write(path, payload).with_context(|| format!("failed to write {}", path.display()))?;

    Ok(())
}

impl SessionStore for FileSessionStore {
    fn token(&self) -> Option<String> {
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());
        session.token().map(str::to_string)
    }

    fn set_token(&self, token: &str) -> Result<()> {
        self.replace(Session::with_token(token))?;
        tracing::info!("session token stored");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.replace(Session::default())?;
        tracing::info!("session token cleared");
        Ok(())
    }
}
