//! The client's view of everything it does not predict.

use std::collections::BTreeMap;

use skyward_physics::Obstacle;

use crate::snapshot::{ActorView, LeaderboardEntry, Snapshot};

/// Remote actors, obstacles and leaderboard, replaced wholesale from each
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct ClientWorld {
    pub tick: u64,
    pub remotes: BTreeMap<String, ActorView>,
    pub obstacles: Vec<Obstacle>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl ClientWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the world from `snapshot` and returns the entry for
    /// `local_id`, which is not kept among the remotes.
    pub fn apply(&mut self, snapshot: Snapshot, local_id: &str) -> Option<ActorView> {
        let Snapshot {
            tick,
            mut actors,
            obstacles,
            leaderboard,
        } = snapshot;
        let local = actors.remove(local_id);
        self.tick = tick;
        self.remotes = actors;
        self.obstacles = obstacles;
        self.leaderboard = leaderboard;
        local
    }
}
