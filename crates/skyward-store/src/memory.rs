//! Volatile store; everything is lost when the process exits.

use std::sync::RwLock;

use skyward_multiplayer::LeaderboardEntry;

use crate::error::StoreError;
use crate::table::UserTable;
use crate::{ScoreStore, UserId};

/// [`ScoreStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<UserTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryStore {
    fn get_user(&self, name: &str) -> Result<Option<UserId>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.get_user(name))
    }

    fn add_user(&self, name: &str, password: &str) -> Result<Option<UserId>, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        Ok(table.add_user(name, password))
    }

    fn verify_password(&self, name: &str, password: &str) -> Result<Option<UserId>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.verify_password(name, password))
    }

    fn update_score(&self, id: UserId, score: u32) -> Result<(), StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        table.update_score(id, score)?;
        Ok(())
    }

    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.leaderboard(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_across_threads() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || store.add_user(&format!("user{i}"), "pw").unwrap())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_some());
        }
        assert_eq!(store.leaderboard(10).unwrap().len(), 4);
    }
}
