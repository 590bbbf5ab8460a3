//! Store persisted as a single RON file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock, RwLockWriteGuard};

use skyward_multiplayer::LeaderboardEntry;

use crate::error::StoreError;
use crate::table::UserTable;
use crate::{ScoreStore, UserId};

/// [`ScoreStore`] that loads a RON file at startup and rewrites it after
/// every mutation.
///
/// The table lock is released before the file is written, so readers never
/// wait on disk. Each mutation takes a revision number; a write whose
/// revision is older than the one already on disk is skipped.
#[derive(Debug)]
pub struct RonFileStore {
    path: PathBuf,
    table: RwLock<UserTable>,
    revision: AtomicU64,
    written: Mutex<u64>,
}

impl RonFileStore {
    /// Opens `path`, starting from an empty table if the file does not
    /// exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(StoreError::ReadError)?;
            let table: UserTable = ron::from_str(&contents).map_err(StoreError::ParseError)?;
            tracing::info!(
                "Loaded {} users from {}",
                table.users.len(),
                path.display()
            );
            table
        } else {
            tracing::info!("Starting new store at {}", path.display());
            UserTable::default()
        };
        Ok(Self {
            path,
            table: RwLock::new(table),
            revision: AtomicU64::new(0),
            written: Mutex::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes `table`, releases it, then replaces the file.
    fn persist(&self, table: RwLockWriteGuard<'_, UserTable>) -> Result<(), StoreError> {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let pretty = ron::ser::PrettyConfig::new().depth_limit(3);
        let serialized =
            ron::ser::to_string_pretty(&*table, pretty).map_err(StoreError::SerializeError)?;
        drop(table);

        let mut written = self.written.lock().map_err(|_| StoreError::Poisoned)?;
        if *written > revision {
            return Ok(());
        }
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(StoreError::WriteError)?;
        }

        // Atomic replace.
        let tmp = self.path.with_extension("ron.tmp");
        std::fs::write(&tmp, serialized).map_err(StoreError::WriteError)?;
        std::fs::rename(&tmp, &self.path).map_err(StoreError::WriteError)?;
        *written = revision;
        Ok(())
    }
}

impl ScoreStore for RonFileStore {
    fn get_user(&self, name: &str) -> Result<Option<UserId>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.get_user(name))
    }

    fn add_user(&self, name: &str, password: &str) -> Result<Option<UserId>, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        let id = table.add_user(name, password);
        if id.is_some() {
            self.persist(table)?;
        }
        Ok(id)
    }

    fn verify_password(&self, name: &str, password: &str) -> Result<Option<UserId>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.verify_password(name, password))
    }

    fn update_score(&self, id: UserId, score: u32) -> Result<(), StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        if table.update_score(id, score)? {
            self.persist(table)?;
        }
        Ok(())
    }

    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.leaderboard(limit))
    }
}
