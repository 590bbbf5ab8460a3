//! High-level multiplayer: the server-authoritative world, client-side
//! prediction, input sequencing, and reconciliation.

pub mod authority;
pub mod client_world;
pub mod prediction;
pub mod reconciliation;
pub mod sequencer;
pub mod snapshot;

pub use authority::{
    Actor, ActorId, ActorInput, ActorTable, AuthoritativeSimulator, InputCollector, InputError,
    RespawnPolicy, TickReport,
};
pub use client_world::ClientWorld;
pub use prediction::{LocalActor, PendingBuffer, PendingInput, PredictiveSimulator};
pub use reconciliation::{
    ReconcileConfig, ReconcileOutcome, Reconciliation, ReconciliationEngine,
};
pub use sequencer::InputSequencer;
pub use snapshot::{ActorView, LeaderboardEntry, Snapshot};
