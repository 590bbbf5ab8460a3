//! User registry and best-score persistence.
//!
//! The authority talks to storage only through [`ScoreStore`]. Two
//! implementations ship: [`MemoryStore`] for tests and throwaway servers,
//! and [`RonFileStore`], which rewrites a RON file after every change.

mod error;
mod file;
mod memory;
mod table;

pub use error::StoreError;
pub use file::RonFileStore;
pub use memory::MemoryStore;
pub use table::{UserRecord, UserTable, hash_password};

use skyward_multiplayer::LeaderboardEntry;

/// Stable numeric identity of a registered user.
pub type UserId = u64;

/// Persistence surface used by the authority.
///
/// Methods take `&self`; implementations synchronize internally so one
/// store can be shared between the receive and simulation loops.
pub trait ScoreStore: Send + Sync {
    /// Id of `name`, if registered.
    fn get_user(&self, name: &str) -> Result<Option<UserId>, StoreError>;

    /// Registers `name`. Returns `None` if the name is already taken.
    fn add_user(&self, name: &str, password: &str) -> Result<Option<UserId>, StoreError>;

    /// Id of `name` if `password` matches its stored digest.
    fn verify_password(&self, name: &str, password: &str) -> Result<Option<UserId>, StoreError>;

    /// Raises the best score of `id` to `score` if higher. Never lowers it.
    fn update_score(&self, id: UserId, score: u32) -> Result<(), StoreError>;

    /// Up to `limit` users ordered by best score, highest first, ties by name.
    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

/// How a login attempt resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The name was new and has been registered.
    Registered(UserId),
    /// The name exists and the password matched.
    Authenticated(UserId),
    /// The name exists and the password did not match.
    InvalidPassword,
}

/// Register-or-authenticate: unknown names are registered on the spot.
pub fn login_or_register(
    store: &dyn ScoreStore,
    name: &str,
    password: &str,
) -> Result<LoginOutcome, StoreError> {
    if store.get_user(name)?.is_none()
        && let Some(id) = store.add_user(name, password)?
    {
        tracing::info!("Registered new user {name}");
        return Ok(LoginOutcome::Registered(id));
    }
    Ok(match store.verify_password(name, password)? {
        Some(id) => LoginOutcome::Authenticated(id),
        None => LoginOutcome::InvalidPassword,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_registers_then_authenticates() {
        let store = MemoryStore::new();
        let first = login_or_register(&store, "ann", "pw").unwrap();
        let LoginOutcome::Registered(id) = first else {
            panic!("expected registration, got {first:?}");
        };
        assert_eq!(
            login_or_register(&store, "ann", "pw").unwrap(),
            LoginOutcome::Authenticated(id)
        );
    }

    #[test]
    fn test_login_wrong_password() {
        let store = MemoryStore::new();
        login_or_register(&store, "ann", "pw").unwrap();
        assert_eq!(
            login_or_register(&store, "ann", "nope").unwrap(),
            LoginOutcome::InvalidPassword
        );
    }
}
