//! Deterministic fixed-timestep kinematics for Skyward actors.
//!
//! Every actor moves on a single vertical axis at a fixed horizontal
//! column. One call to [`step`] integrates gravity and an optional flap
//! impulse, normalizes the result to [`PHYSICS_DECIMALS`] places, and tests
//! the new position against the world bounds and the obstacle list.
//!
//! The server and the client both advance actors through [`ActorBody`], so
//! identical inputs produce identical rounded states on both sides.

mod body;
mod params;
mod step;

pub use body::ActorBody;
pub use params::WorldParams;
pub use step::{Obstacle, PHYSICS_DECIMALS, StepOutcome, round_to, round4, step};
