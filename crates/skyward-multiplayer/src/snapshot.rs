//! Per-tick authoritative world snapshots.
//!
//! A [`Snapshot`] is produced by the authority once per tick and consumed
//! by every client. It carries the public view of each actor, the full
//! obstacle list and the current leaderboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skyward_physics::Obstacle;

/// Public per-actor state broadcast each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorView {
    pub y: f64,
    pub v: f64,
    pub alive: bool,
    pub score: u32,
    /// Highest input sequence number the authority has accepted.
    pub last_acked_seq: u64,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
}

impl LeaderboardEntry {
    pub fn new(name: impl Into<String>, score: u32) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Complete authoritative world state at one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Authority tick this snapshot was taken after.
    pub tick: u64,
    /// Actor id to public state.
    pub actors: BTreeMap<String, ActorView>,
    /// Obstacles in spawn (left-to-right) order.
    pub obstacles: Vec<Obstacle>,
    /// Best scores, highest first.
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl Snapshot {
    /// Looks up the view of a single actor.
    pub fn actor(&self, id: &str) -> Option<&ActorView> {
        self.actors.get(id)
    }
}
