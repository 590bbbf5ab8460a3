//! Logged-in sessions keyed by username.
//!
//! The receive loop writes the table on login and disconnect; the
//! simulation loop reads it once per tick to address snapshots.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use skyward_store::UserId;
use tokio::sync::RwLock;

/// One logged-in client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// Address the login came from. Only this address may act for the user.
    pub addr: SocketAddr,
    pub user_id: UserId,
}

/// Shared session table. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct SessionTable {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `username` to `session`, returning the session it replaced.
    pub async fn insert(&self, username: &str, session: Session) -> Option<Session> {
        self.inner
            .write()
            .await
            .insert(username.to_string(), session)
    }

    /// The session of `username` if `from` is its logged-in address.
    pub async fn authorized(&self, username: &str, from: SocketAddr) -> Option<Session> {
        self.inner
            .read()
            .await
            .get(username)
            .copied()
            .filter(|s| s.addr == from)
    }

    /// Removes `username` if `from` is its logged-in address.
    pub async fn remove_from(&self, username: &str, from: SocketAddr) -> Option<Session> {
        let mut map = self.inner.write().await;
        if map.get(username).is_some_and(|s| s.addr == from) {
            map.remove(username)
        } else {
            None
        }
    }

    /// Every address snapshots should go to.
    pub async fn addresses(&self) -> Vec<SocketAddr> {
        self.inner.read().await.values().map(|s| s.addr).collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[tokio::test]
    async fn test_only_login_address_is_authorized() {
        let table = SessionTable::new();
        let session = Session {
            addr: addr(4000),
            user_id: 1,
        };
        assert!(table.insert("ann", session).await.is_none());

        assert_eq!(table.authorized("ann", addr(4000)).await, Some(session));
        assert!(table.authorized("ann", addr(4001)).await.is_none());
        assert!(table.authorized("bob", addr(4000)).await.is_none());
    }

    #[tokio::test]
    async fn test_relogin_rebinds_address() {
        let table = SessionTable::new();
        let first = Session {
            addr: addr(4000),
            user_id: 1,
        };
        let second = Session {
            addr: addr(4002),
            ..first
        };
        table.insert("ann", first).await;
        assert_eq!(table.insert("ann", second).await, Some(first));
        assert_eq!(table.addresses().await, vec![addr(4002)]);
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_requires_matching_address() {
        let table = SessionTable::new();
        table
            .insert(
                "ann",
                Session {
                    addr: addr(4000),
                    user_id: 1,
                },
            )
            .await;

        assert!(table.remove_from("ann", addr(4999)).await.is_none());
        assert!(!table.is_empty().await);
        assert!(table.remove_from("ann", addr(4000)).await.is_some());
        assert!(table.is_empty().await);
    }
}
