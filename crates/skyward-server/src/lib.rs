//! Authority runtime: sessions, the event channel, and the three server
//! loops around the authoritative world.

pub mod error;
pub mod events;
pub mod server;
pub mod session;
pub mod world;

pub use error::ServerError;
pub use events::{EventReceiver, EventSender, ServerEvent, event_channel};
pub use server::{GameServer, RECV_WAIT};
pub use session::{Session, SessionTable};
pub use world::{AuthorityWorld, ScoreWrite, write_scores};
