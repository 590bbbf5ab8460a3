//! Events forwarded from the receive loop to the simulation loop.

use skyward_store::UserId;
use tokio::sync::mpsc;

/// One validated client request, applied at the next tick boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A login succeeded; the actor (re)enters the world freshly spawned.
    Joined { username: String, user_id: UserId },
    /// A sequenced input from a logged-in session.
    Input {
        username: String,
        seq: u64,
        flap: bool,
    },
    /// Explicit respawn request.
    Respawn { username: String },
    /// The session ended; the actor leaves the world.
    Left { username: String },
}

impl ServerEvent {
    /// The user the event concerns.
    pub fn username(&self) -> &str {
        match self {
            Self::Joined { username, .. }
            | Self::Input { username, .. }
            | Self::Respawn { username }
            | Self::Left { username } => username,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Creates the receive-to-simulation event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
