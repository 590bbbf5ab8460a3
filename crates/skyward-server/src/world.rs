//! Authority-side world state owned by the simulation loop.
//!
//! Glues the simulator, the actor table, the input collector, and the
//! score store together. Everything here is synchronous and never blocks on
//! disk: scores to persist are queued as [`ScoreWrite`]s that the simulation
//! loop hands to a blocking task via [`write_scores`].

use std::collections::HashMap;
use std::sync::Arc;

use skyward_config::Config;
use skyward_multiplayer::{
    Actor, ActorId, ActorTable, AuthoritativeSimulator, InputCollector, Snapshot, TickReport,
};
use skyward_store::{ScoreStore, UserId};

use crate::events::ServerEvent;

/// A final score waiting to be written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWrite {
    pub user_id: UserId,
    pub score: u32,
}

/// Writes queued scores, logging failures. May block on file I/O.
pub fn write_scores(store: &dyn ScoreStore, writes: &[ScoreWrite]) {
    for write in writes {
        if let Err(e) = store.update_score(write.user_id, write.score) {
            tracing::warn!("Failed to store score for user {}: {e}", write.user_id);
        }
    }
}

pub struct AuthorityWorld {
    sim: AuthoritativeSimulator,
    actors: ActorTable,
    collector: InputCollector,
    user_ids: HashMap<ActorId, UserId>,
    store: Arc<dyn ScoreStore>,
    leaderboard_size: usize,
    score_writes: Vec<ScoreWrite>,
}

impl AuthorityWorld {
    pub fn new(config: &Config, store: Arc<dyn ScoreStore>) -> Self {
        let policy = config.server.respawn_policy;
        let sim = match config.server.seed {
            Some(seed) => AuthoritativeSimulator::with_seed(config.world, policy, seed),
            None => AuthoritativeSimulator::new(config.world, policy),
        };
        Self {
            sim,
            actors: ActorTable::new(),
            collector: InputCollector::new(),
            user_ids: HashMap::new(),
            store,
            leaderboard_size: config.server.leaderboard_size,
            score_writes: Vec::new(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.sim.tick()
    }

    pub fn actors(&self) -> &ActorTable {
        &self.actors
    }

    /// Applies one event from the receive loop.
    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Joined { username, user_id } => {
                if let Some(score) = self.actors.get(&username).map(|a| a.score) {
                    self.queue_score(user_id, score);
                }
                self.collector.forget(&username);
                self.actors
                    .insert(username.clone(), Actor::spawned(self.sim.params()));
                self.user_ids.insert(username, user_id);
            }
            ServerEvent::Input {
                username,
                seq,
                flap,
            } => {
                if let Err(e) = self.collector.record(&mut self.actors, &username, seq, flap) {
                    tracing::debug!("Input refused: {e}");
                }
            }
            ServerEvent::Respawn { username } => {
                if let Err(e) = self.collector.request_respawn(&self.actors, &username) {
                    tracing::debug!("Respawn refused: {e}");
                }
            }
            ServerEvent::Left { username } => {
                self.collector.forget(&username);
                if let Some(actor) = self.actors.remove(&username)
                    && let Some(user_id) = self.user_ids.remove(&username)
                {
                    self.queue_score(user_id, actor.score);
                }
            }
        }
    }

    /// Steps the simulation once and builds the snapshot to broadcast.
    ///
    /// Scores of actors that died this tick are queued; the leaderboard
    /// reflects them once [`write_scores`] has run.
    pub fn step(&mut self) -> (TickReport, Snapshot) {
        let inputs = self.collector.take();
        let report = self.sim.step(&mut self.actors, &inputs);

        for id in &report.deaths {
            if let (Some(actor), Some(&user_id)) = (self.actors.get(id), self.user_ids.get(id)) {
                tracing::debug!(tick = report.tick, "{id} died with score {}", actor.score);
                self.score_writes.push(ScoreWrite {
                    user_id,
                    score: actor.score,
                });
            }
        }

        let leaderboard = self
            .store
            .leaderboard(self.leaderboard_size)
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to read leaderboard: {e}");
                Vec::new()
            });
        let snapshot = self.sim.snapshot(&self.actors, leaderboard);
        (report, snapshot)
    }

    /// Drains the scores queued since the last call.
    pub fn take_score_writes(&mut self) -> Vec<ScoreWrite> {
        std::mem::take(&mut self.score_writes)
    }

    /// Queues the scores of every live actor, for shutdown.
    pub fn retire_all(&mut self) {
        for (id, actor) in self.actors.iter() {
            if let Some(&user_id) = self.user_ids.get(id) {
                self.score_writes.push(ScoreWrite {
                    user_id,
                    score: actor.score,
                });
            }
        }
    }

    fn queue_score(&mut self, user_id: UserId, score: u32) {
        self.score_writes.push(ScoreWrite { user_id, score });
    }
}
