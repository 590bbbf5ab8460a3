//! The in-memory user table shared by both store implementations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use skyward_multiplayer::LeaderboardEntry;

use crate::UserId;
use crate::error::StoreError;

/// SHA-256 hex digest of a password, salted with the user name.
pub fn hash_password(name: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub password_hash: String,
    pub best_score: u32,
}

/// Every registered user, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserTable {
    pub next_id: UserId,
    pub users: BTreeMap<String, UserRecord>,
}

impl Default for UserTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            users: BTreeMap::new(),
        }
    }
}

impl UserTable {
    pub fn get_user(&self, name: &str) -> Option<UserId> {
        self.users.get(name).map(|u| u.id)
    }

    pub fn add_user(&mut self, name: &str, password: &str) -> Option<UserId> {
        if self.users.contains_key(name) {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.users.insert(
            name.to_string(),
            UserRecord {
                id,
                password_hash: hash_password(name, password),
                best_score: 0,
            },
        );
        Some(id)
    }

    pub fn verify_password(&self, name: &str, password: &str) -> Option<UserId> {
        self.users
            .get(name)
            .filter(|u| u.password_hash == hash_password(name, password))
            .map(|u| u.id)
    }

    /// Returns `true` if the stored best score changed.
    pub fn update_score(&mut self, id: UserId, score: u32) -> Result<bool, StoreError> {
        let record = self
            .users
            .values_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::UnknownUser(id))?;
        if score > record.best_score {
            record.best_score = score;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let mut rows: Vec<LeaderboardEntry> = self
            .users
            .iter()
            .map(|(name, u)| LeaderboardEntry::new(name.clone(), u.best_score))
            .collect();
        rows.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        rows.truncate(limit);
        rows
    }
}
