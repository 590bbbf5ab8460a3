//! Server-authoritative world simulation, actor records, and input intake.
//!
//! The server owns the canonical obstacle field and every actor's physical
//! state. Clients only submit inputs; the [`InputCollector`] folds them into
//! one pending slot per actor and [`AuthoritativeSimulator::step`] consumes
//! those slots once per tick.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use skyward_physics::{ActorBody, Obstacle, WorldParams, round4};

use crate::snapshot::{ActorView, LeaderboardEntry, Snapshot};

/// Actors are identified by their login name.
pub type ActorId = String;

/// All actors currently in the world, iterated in id order.
pub type ActorTable = BTreeMap<ActorId, Actor>;

// ---------------------------------------------------------------------------
// RespawnPolicy
// ---------------------------------------------------------------------------

/// How a dead actor asks to come back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RespawnPolicy {
    /// A flap from a dead actor is a respawn request. Explicit respawn
    /// messages are honoured too.
    #[default]
    FlapWhileDead,
    /// Only explicit respawn messages revive an actor.
    ExplicitOnly,
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Server-side canonical record for one logged-in participant.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub body: ActorBody,
    /// Points earned since the last (re)spawn.
    pub score: u32,
    /// Highest input sequence number accepted from this actor.
    pub last_acked_seq: u64,
}

impl Actor {
    /// A fresh actor at spawn height with no score and nothing acknowledged.
    pub fn spawned(params: &WorldParams) -> Self {
        Self {
            body: ActorBody::spawned(params),
            score: 0,
            last_acked_seq: 0,
        }
    }

    /// Records `seq` as received. Returns `true` if it is newer than every
    /// sequence seen so far; the acknowledged value never decreases.
    pub fn acknowledge(&mut self, seq: u64) -> bool {
        if seq > self.last_acked_seq {
            self.last_acked_seq = seq;
            true
        } else {
            false
        }
    }

    /// Public view of this actor for a snapshot.
    pub fn view(&self) -> ActorView {
        ActorView {
            y: self.body.y,
            v: self.body.v,
            alive: self.body.alive,
            score: self.score,
            last_acked_seq: self.last_acked_seq,
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The input applied to one actor for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActorInput {
    pub flap: bool,
    /// Explicit respawn request.
    pub respawn: bool,
}

/// Reasons the collector refuses an input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// No actor with this id is in the world.
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),

    /// The sequence number is not newer than the last accepted one.
    #[error("stale input {seq} for {id}: already acknowledged {acked}")]
    Stale {
        /// Actor id.
        id: ActorId,
        /// Rejected sequence number.
        seq: u64,
        /// Current acknowledged sequence.
        acked: u64,
    },
}

/// Single-slot-per-actor input intake between two ticks.
///
/// The freshest input received before the tick boundary wins. Slots are
/// drained by [`InputCollector::take`] and consumed by one simulator step.
#[derive(Debug, Default)]
pub struct InputCollector {
    slots: BTreeMap<ActorId, ActorInput>,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a sequenced flap input for `id`, acknowledging `seq`.
    ///
    /// Inputs older than the last acknowledged sequence are refused and do
    /// not touch the pending slot.
    pub fn record(
        &mut self,
        actors: &mut ActorTable,
        id: &str,
        seq: u64,
        flap: bool,
    ) -> Result<(), InputError> {
        let actor = actors
            .get_mut(id)
            .ok_or_else(|| InputError::UnknownActor(id.to_string()))?;
        if !actor.acknowledge(seq) {
            return Err(InputError::Stale {
                id: id.to_string(),
                seq,
                acked: actor.last_acked_seq,
            });
        }
        self.slots.entry(id.to_string()).or_default().flap = flap;
        Ok(())
    }

    /// Marks an explicit respawn request for `id`.
    pub fn request_respawn(&mut self, actors: &ActorTable, id: &str) -> Result<(), InputError> {
        if !actors.contains_key(id) {
            return Err(InputError::UnknownActor(id.to_string()));
        }
        self.slots.entry(id.to_string()).or_default().respawn = true;
        Ok(())
    }

    /// Drops whatever is pending for `id`.
    pub fn forget(&mut self, id: &str) {
        self.slots.remove(id);
    }

    /// Removes and returns every pending slot.
    pub fn take(&mut self) -> BTreeMap<ActorId, ActorInput> {
        std::mem::take(&mut self.slots)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ---------------------------------------------------------------------------
// AuthoritativeSimulator
// ---------------------------------------------------------------------------

/// What happened to actors during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number after the step.
    pub tick: u64,
    /// Actors that died this tick.
    pub deaths: Vec<ActorId>,
    /// Actors that were revived this tick.
    pub respawns: Vec<ActorId>,
    /// Whether a new obstacle entered the world.
    pub spawned_obstacle: bool,
}

/// Owns the canonical obstacle field and tick counter and advances every
/// actor once per tick.
pub struct AuthoritativeSimulator {
    params: WorldParams,
    tick: u64,
    obstacles: Vec<Obstacle>,
    spawn_countdown: u32,
    rng: StdRng,
    respawn_policy: RespawnPolicy,
}

impl AuthoritativeSimulator {
    /// Creates a simulator whose obstacle gaps come from OS entropy.
    pub fn new(params: WorldParams, respawn_policy: RespawnPolicy) -> Self {
        Self::with_rng(params, respawn_policy, StdRng::from_os_rng())
    }

    /// Creates a simulator with a reproducible obstacle sequence.
    pub fn with_seed(params: WorldParams, respawn_policy: RespawnPolicy, seed: u64) -> Self {
        Self::with_rng(params, respawn_policy, StdRng::seed_from_u64(seed))
    }

    fn with_rng(params: WorldParams, respawn_policy: RespawnPolicy, rng: StdRng) -> Self {
        Self {
            params,
            tick: 0,
            obstacles: Vec::new(),
            spawn_countdown: 0,
            rng,
            respawn_policy,
        }
    }

    /// Returns the current tick number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    /// Obstacles in left-to-right order.
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Advances the world by exactly one tick.
    ///
    /// Obstacles scroll first (at most one spawns), then every actor is
    /// revived, frozen, or stepped against the moved obstacles, then every
    /// actor still alive scores one point per obstacle that crossed its
    /// column this tick.
    pub fn step(
        &mut self,
        actors: &mut ActorTable,
        inputs: &BTreeMap<ActorId, ActorInput>,
    ) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        let crossings = self.advance_obstacles();
        report.spawned_obstacle = self.advance_spawn_timer();

        for (id, actor) in actors.iter_mut() {
            let input = inputs.get(id).copied().unwrap_or_default();
            if !actor.body.alive {
                if self.wants_respawn(input) {
                    actor.body.respawn(&self.params);
                    actor.score = 0;
                    report.respawns.push(id.clone());
                }
                continue;
            }
            if actor.body.advance(input.flap, &self.obstacles, &self.params) {
                report.deaths.push(id.clone());
            }
        }

        if crossings > 0 {
            for actor in actors.values_mut().filter(|a| a.body.alive) {
                actor.score += crossings;
            }
        }

        report
    }

    /// Builds the snapshot for the current tick.
    pub fn snapshot(&self, actors: &ActorTable, leaderboard: Vec<LeaderboardEntry>) -> Snapshot {
        Snapshot {
            tick: self.tick,
            actors: actors.iter().map(|(id, a)| (id.clone(), a.view())).collect(),
            obstacles: self.obstacles.clone(),
            leaderboard,
        }
    }

    fn wants_respawn(&self, input: ActorInput) -> bool {
        input.respawn || (self.respawn_policy == RespawnPolicy::FlapWhileDead && input.flap)
    }

    /// Scrolls every obstacle, drops those fully off the left edge, and
    /// returns how many crossed the actor column.
    fn advance_obstacles(&mut self) -> u32 {
        let dx = self.params.obstacle_speed * self.params.dt();
        let actor_x = self.params.actor_x;
        let mut crossings = 0;
        for obstacle in &mut self.obstacles {
            let before = obstacle.x;
            obstacle.x = round4(before - dx);
            if before >= actor_x && obstacle.x < actor_x {
                crossings += 1;
            }
        }
        let width = self.params.obstacle_width;
        self.obstacles.retain(|o| o.x + width > 0.0);
        crossings
    }

    fn advance_spawn_timer(&mut self) -> bool {
        self.spawn_countdown += 1;
        if self.spawn_countdown < self.params.spawn_interval_ticks {
            return false;
        }
        self.spawn_countdown = 0;
        // Integer centres inside [gap/2, H - gap/2].
        let low = self.params.min_gap_center().ceil() as i64;
        let high = (self.params.max_gap_center().floor() as i64).max(low);
        let gap_y = self.rng.random_range(low..=high) as f64;
        self.obstacles
            .push(Obstacle::new(self.params.world_width, gap_y));
        tracing::debug!(tick = self.tick, gap_y, "spawned obstacle");
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
