//! The authority runtime.
//!
//! [`GameServer::run_with_endpoint`] drives three concurrent loops:
//!
//! * the simulation loop (current task) steps the world at the tick rate
//!   and broadcasts one encoded `state` datagram to every session;
//! * the receive loop answers logins and rejections and forwards
//!   [`ServerEvent`]s over an mpsc channel drained once per tick;
//! * the discovery loop broadcasts the game port.
//!
//! All three observe the same `watch` shutdown signal.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use skyward_config::Config;
use skyward_net::messages::{Input, Login, LoginSuccess, UserRef};
use skyward_net::{Announcer, CodecError, Datagram, Endpoint, Message, StateMessage, encode};
use skyward_store::{LoginOutcome, ScoreStore, login_or_register};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::ServerError;
use crate::events::{EventReceiver, EventSender, ServerEvent, event_channel};
use crate::session::{Session, SessionTable};
use crate::world::{AuthorityWorld, write_scores};

/// Bounded wait of one receive in the receive loop.
pub const RECV_WAIT: Duration = Duration::from_millis(100);

/// UDP authority serving one world.
pub struct GameServer {
    config: Config,
    store: Arc<dyn ScoreStore>,
    /// Logged-in sessions (public for test inspection).
    pub sessions: SessionTable,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl GameServer {
    pub fn new(config: Config, store: Arc<dyn ScoreStore>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            store,
            sessions: SessionTable::new(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Binds the configured game port and runs until [`GameServer::shutdown`].
    pub async fn run(&self) -> Result<(), ServerError> {
        let server = &self.config.server;
        let ip: IpAddr = server
            .bind_address
            .parse()
            .map_err(|_| ServerError::InvalidBindAddress(server.bind_address.clone()))?;
        let addr = SocketAddr::new(ip, server.game_port);

        let endpoint = Endpoint::bind(addr)
            .await?
            .with_max_datagram(self.config.network.max_datagram);
        tracing::info!("Server listening on {addr}");

        let announcer = Announcer::bind(server.game_port, server.discovery_port)?;
        self.run_with_endpoint(endpoint, Some(announcer)).await
    }

    /// Runs the loops on a pre-bound endpoint (useful for tests).
    ///
    /// Without an announcer no discovery broadcasts are sent.
    pub async fn run_with_endpoint(
        &self,
        endpoint: Endpoint,
        announcer: Option<Announcer>,
    ) -> Result<(), ServerError> {
        let (events_tx, events_rx) = event_channel();

        let handler = RequestHandler {
            endpoint: endpoint.clone(),
            store: Arc::clone(&self.store),
            sessions: self.sessions.clone(),
            events: events_tx,
            tick_rate: self.config.world.tick_rate,
        };
        let receiver = tokio::spawn(handler.run(self.shutdown_rx.clone()));

        let discovery = announcer.map(|announcer| {
            tokio::spawn(discovery_loop(
                announcer,
                self.config.server.discovery_interval(),
                self.shutdown_rx.clone(),
            ))
        });

        self.simulation_loop(&endpoint, events_rx).await;

        if let Err(e) = receiver.await {
            tracing::warn!("Receive loop ended abnormally: {e}");
        }
        if let Some(handle) = discovery
            && let Err(e) = handle.await
        {
            tracing::warn!("Discovery loop ended abnormally: {e}");
        }
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Signal every loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    async fn simulation_loop(&self, endpoint: &Endpoint, mut events: EventReceiver) {
        let mut world = AuthorityWorld::new(&self.config, Arc::clone(&self.store));
        let tick_len = Duration::from_secs_f64(self.config.world.dt());
        let decimals = self.config.network.wire_decimals;
        let mut shutdown = self.shutdown_rx.clone();
        tracing::info!(
            tick_rate = self.config.world.tick_rate,
            "Simulation started"
        );

        while !*shutdown.borrow_and_update() {
            let started = Instant::now();

            while let Ok(event) = events.try_recv() {
                world.apply(event);
            }
            let (report, snapshot) = world.step();
            self.flush_scores(&mut world);

            let state = Message::State(StateMessage::from_snapshot(&snapshot, decimals));
            match encode(&state) {
                Ok(bytes) => {
                    for addr in self.sessions.addresses().await {
                        if let Err(e) = endpoint.send_raw(&bytes, addr).await {
                            tracing::warn!("Failed to send state to {addr}: {e}");
                        }
                    }
                }
                Err(e) => tracing::warn!(tick = report.tick, "Failed to encode state: {e}"),
            }

            let elapsed = started.elapsed();
            if elapsed >= tick_len {
                tracing::warn!(
                    tick = report.tick,
                    "Tick overran: {elapsed:?} > {tick_len:?}"
                );
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(tick_len - elapsed) => {}
                _ = shutdown.changed() => {}
            }
        }
        world.retire_all();
        let writes = world.take_score_writes();
        let store = Arc::clone(&self.store);
        let written = tokio::task::spawn_blocking(move || write_scores(store.as_ref(), &writes));
        if let Err(e) = written.await {
            tracing::warn!("Final score write failed: {e}");
        }
        tracing::info!(tick = world.tick(), "Simulation stopped");
    }

    /// Hands queued scores to the blocking pool.
    fn flush_scores(&self, world: &mut AuthorityWorld) {
        let writes = world.take_score_writes();
        if writes.is_empty() {
            return;
        }
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || write_scores(store.as_ref(), &writes));
    }
}

/// Receive-side state: decodes datagrams, validates sessions, and
/// forwards events to the simulation loop.
struct RequestHandler {
    endpoint: Endpoint,
    store: Arc<dyn ScoreStore>,
    sessions: SessionTable,
    events: EventSender,
    tick_rate: u32,
}

impl RequestHandler {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut inbox = self.endpoint.receiver();
        while !*shutdown.borrow_and_update() {
            let received = tokio::select! {
                result = inbox.recv(RECV_WAIT) => result,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };
            match received {
                Ok(Some(datagram)) => self.handle(datagram).await,
                Ok(None) => {}
                Err(e) => tracing::debug!("Receive failed: {e}"),
            }
        }
        tracing::debug!("Receive loop stopped");
    }

    async fn handle(&self, datagram: Datagram) {
        let from = datagram.from;
        let reply = match datagram.message {
            Ok(Message::Login(login)) => Some(self.login(login, from).await),
            Ok(Message::Input(Input {
                username,
                flap,
                seq,
            })) => {
                self.forward(from, ServerEvent::Input {
                    username,
                    seq,
                    flap,
                })
                .await
            }
            Ok(Message::Respawn(UserRef { username })) => {
                self.forward(from, ServerEvent::Respawn { username }).await
            }
            Ok(Message::Disconnect(UserRef { username })) => {
                if self.sessions.remove_from(&username, from).await.is_some() {
                    tracing::info!("{username} disconnected");
                    self.send_event(ServerEvent::Left { username });
                    None
                } else {
                    Some(Message::rejected("Not logged in"))
                }
            }
            Ok(other) => Some(Message::rejected(format!(
                "Unexpected message type: {}",
                other.kind()
            ))),
            Err(CodecError::UnknownType(kind)) => {
                Some(Message::rejected(format!("Unknown message type: {kind}")))
            }
            Err(e) => {
                tracing::debug!("Discarding datagram from {from}: {e}");
                None
            }
        };

        if let Some(reply) = reply
            && let Err(e) = self.endpoint.send(&reply, from).await
        {
            tracing::warn!("Failed to reply to {from}: {e}");
        }
    }

    async fn login(&self, login: Login, from: SocketAddr) -> Message {
        if login.username.is_empty() {
            return Message::login_failed("Username required");
        }
        let store = Arc::clone(&self.store);
        let (username, password) = (login.username.clone(), login.password.clone());
        // Registration may rewrite the store file.
        let outcome = tokio::task::spawn_blocking(move || {
            login_or_register(store.as_ref(), &username, &password)
        })
        .await;
        let user_id = match outcome {
            Ok(Ok(LoginOutcome::Registered(id))) => {
                tracing::info!("Registered new user {}", login.username);
                id
            }
            Ok(Ok(LoginOutcome::Authenticated(id))) => id,
            Ok(Ok(LoginOutcome::InvalidPassword)) => {
                tracing::info!("Wrong password for {} from {from}", login.username);
                return Message::login_failed("Invalid password");
            }
            Ok(Err(e)) => {
                tracing::warn!("Login lookup for {} failed: {e}", login.username);
                return Message::login_failed("Login unavailable");
            }
            Err(e) => {
                tracing::warn!("Login task for {} failed: {e}", login.username);
                return Message::login_failed("Login unavailable");
            }
        };

        self.sessions
            .insert(&login.username, Session { addr: from, user_id })
            .await;
        self.send_event(ServerEvent::Joined {
            username: login.username.clone(),
            user_id,
        });
        tracing::info!("{} logged in from {from}", login.username);

        Message::LoginSuccess(LoginSuccess {
            username: login.username,
            tick_rate: self.tick_rate,
        })
    }

    /// Forwards `event` if `from` owns the session it names.
    async fn forward(&self, from: SocketAddr, event: ServerEvent) -> Option<Message> {
        if self.sessions.authorized(event.username(), from).await.is_none() {
            tracing::debug!("Refusing {event:?} from {from}");
            return Some(Message::rejected("Not logged in"));
        }
        self.send_event(event);
        None
    }

    fn send_event(&self, event: ServerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Simulation loop gone, dropping event");
        }
    }
}

async fn discovery_loop(
    announcer: Announcer,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    while !*shutdown.borrow_and_update() {
        if let Err(e) = announcer.announce().await {
            tracing::warn!("Discovery broadcast failed: {e}");
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("Discovery loop stopped");
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
