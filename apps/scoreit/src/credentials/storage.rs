use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::models::session::StoredSession;

/// One physical storage scope holding at most one session record.
///
/// Writes never fail from the caller's point of view: implementations log
/// storage errors and carry on, so a failed write reads back as "no session".
pub trait ScopeStorage: Send + Sync {
    fn load(&self) -> Option<StoredSession>;
    fn save(&self, session: &StoredSession);
    fn clear(&self);
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryStorage: ephemeral scope
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<StoredSession>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScopeStorage for MemoryStorage {
    fn load(&self) -> Option<StoredSession> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn save(&self, session: &StoredSession) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
    }

    fn clear(&self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FileStorage: durable scope
// ────────────────────────────────────────────────────────────────────────────

/// JSON file on disk. Saves go through a temp file in the same directory and
/// an atomic rename, so a reader never sees a half-written record.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomically(&self, session: &StoredSession) -> std::io::Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        // NamedTempFile is created with 0600 permissions; the rename keeps them.
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, session)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl ScopeStorage for FileStorage {
    fn load(&self) -> Option<StoredSession> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read session file {}: {e}", self.path.display());
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(
                    "Ignoring unreadable session file {}: {e}",
                    self.path.display()
                );
                None
            }
        }
    }

    fn save(&self, session: &StoredSession) {
        match self.write_atomically(session) {
            Ok(()) => debug!("Session saved to {}", self.path.display()),
            Err(e) => warn!("Could not write session file {}: {e}", self.path.display()),
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Session file {} removed", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove session file {}: {e}", self.path.display()),
        }
    }
}
