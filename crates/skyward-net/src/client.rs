//! Client side of the protocol: login handshake, outgoing inputs, and the
//! latest-snapshot slot fed by a background receive task.
//!
//! The slot is a [`watch`] channel: the receive task overwrites it with
//! every decoded snapshot and the fixed-step loop takes whatever is newest
//! at each tick boundary.

use std::net::SocketAddr;
use std::time::Duration;

use skyward_multiplayer::Snapshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::NetError;
use crate::messages::{Input, Login, LoginSuccess, Message, UserRef};
use crate::udp::Endpoint;

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAccepted {
    pub username: String,
    /// Authority simulation rate in Hz.
    pub tick_rate: u32,
}

/// Handle to one authority.
#[derive(Clone)]
pub struct ServerLink {
    endpoint: Endpoint,
    server: SocketAddr,
    username: String,
}

impl ServerLink {
    pub fn new(endpoint: Endpoint, server: SocketAddr) -> Self {
        Self {
            endpoint,
            server,
            username: String::new(),
        }
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Sends a login and waits up to `wait` for the answer.
    ///
    /// Unrelated datagrams arriving in the meantime are discarded.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        wait: Duration,
    ) -> Result<LoginAccepted, NetError> {
        let request = Message::Login(Login {
            username: username.to_string(),
            password: password.to_string(),
        });
        let mut inbox = self.endpoint.receiver();
        self.endpoint.send(&request, self.server).await?;

        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(NetError::LoginTimeout(wait));
            }
            let Some(datagram) = inbox.recv(remaining).await? else {
                return Err(NetError::LoginTimeout(wait));
            };
            match datagram.message {
                Ok(Message::LoginSuccess(LoginSuccess {
                    username: name,
                    tick_rate,
                })) if name == username => {
                    self.username = name.clone();
                    tracing::info!("Logged in as {name} (tick rate {tick_rate} Hz)");
                    return Ok(LoginAccepted {
                        username: name,
                        tick_rate,
                    });
                }
                Ok(Message::LoginFailed(refusal)) => {
                    return Err(NetError::LoginFailed(refusal.message));
                }
                other => tracing::debug!("Ignoring datagram during login: {other:?}"),
            }
        }
    }

    /// Sends one sequenced input.
    pub async fn send_input(&self, seq: u64, flap: bool) -> Result<(), NetError> {
        let msg = Message::Input(Input {
            username: self.username.clone(),
            flap,
            seq,
        });
        self.endpoint.send(&msg, self.server).await
    }

    /// Asks the authority to revive the local actor.
    pub async fn send_respawn(&self) -> Result<(), NetError> {
        let msg = Message::Respawn(self.user_ref());
        self.endpoint.send(&msg, self.server).await
    }

    /// Tells the authority the client is leaving.
    pub async fn send_disconnect(&self) -> Result<(), NetError> {
        let msg = Message::Disconnect(self.user_ref());
        self.endpoint.send(&msg, self.server).await
    }

    fn user_ref(&self) -> UserRef {
        UserRef {
            username: self.username.clone(),
        }
    }

    /// Spawns the receive task that keeps the latest-snapshot slot fresh.
    ///
    /// Snapshots older than the newest one already delivered are dropped.
    /// The task exits when `shutdown` turns `true` or the slot has no
    /// readers left.
    pub fn spawn_snapshot_feed(
        &self,
        mut shutdown: watch::Receiver<bool>,
        recv_wait: Duration,
    ) -> (JoinHandle<()>, watch::Receiver<Option<Snapshot>>) {
        let (tx, rx) = watch::channel(None);
        let mut inbox = self.endpoint.receiver();

        let handle = tokio::spawn(async move {
            let mut newest_tick = None;
            while !*shutdown.borrow_and_update() && !tx.is_closed() {
                let datagram = tokio::select! {
                    result = inbox.recv(recv_wait) => result,
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                };
                let datagram = match datagram {
                    Ok(Some(d)) => d,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::debug!("Receive failed: {e}");
                        continue;
                    }
                };
                match datagram.message {
                    Ok(Message::State(state)) => {
                        if newest_tick.is_some_and(|t| state.tick < t) {
                            tracing::debug!(tick = state.tick, "Dropping out-of-order snapshot");
                            continue;
                        }
                        newest_tick = Some(state.tick);
                        tx.send_replace(Some(state.into_snapshot()));
                    }
                    Ok(Message::Rejected(refusal)) => {
                        tracing::warn!("Server rejected a message: {}", refusal.message);
                    }
                    Ok(other) => tracing::debug!("Ignoring {} message", other.kind()),
                    Err(e) => tracing::debug!("Discarding datagram: {e}"),
                }
            }
            tracing::debug!("Snapshot feed stopped");
        });

        (handle, rx)
    }
}
