//! Headless client runtime: connection setup, the fixed-step prediction
//! loop, and pluggable input sources.

pub mod connect;
pub mod error;
pub mod game;
pub mod game_loop;
pub mod input;

pub use connect::{connect, resolve_server};
pub use error::ClientError;
pub use game::ClientGame;
pub use game_loop::GameLoop;
pub use input::{Autopilot, InputSource, Scripted};
