//! Client-side prediction: immediate local application of the player's own
//! inputs.
//!
//! The client advances its own actor through the same
//! [`ActorBody::advance`] the authority uses, without waiting for
//! confirmation. Every applied input stays in the [`PendingBuffer`] until a
//! snapshot acknowledges it, so reconciliation can replay the unconfirmed
//! tail after a correction.

use std::collections::VecDeque;

use skyward_physics::{ActorBody, Obstacle, WorldParams};

use crate::snapshot::ActorView;

// ---------------------------------------------------------------------------
// PendingInput
// ---------------------------------------------------------------------------

/// One sequenced local input awaiting acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingInput {
    pub seq: u64,
    pub flap: bool,
}

// ---------------------------------------------------------------------------
// PendingBuffer
// ---------------------------------------------------------------------------

/// Unacknowledged inputs in ascending sequence order.
#[derive(Debug, Default)]
pub struct PendingBuffer {
    entries: VecDeque<PendingInput>,
}

impl PendingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an input. Sequences must be pushed in ascending order.
    pub fn push(&mut self, input: PendingInput) {
        debug_assert!(self.entries.back().is_none_or(|last| last.seq < input.seq));
        self.entries.push_back(input);
    }

    /// Discards every entry with `seq <= acked`. Returns how many were removed.
    pub fn purge_acknowledged(&mut self, acked: u64) -> usize {
        let before = self.entries.len();
        while self.entries.front().is_some_and(|e| e.seq <= acked) {
            self.entries.pop_front();
        }
        before - self.entries.len()
    }

    /// Empties the buffer. Returns how many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    /// If more than `high_water` entries are held, keeps only the newest
    /// `low_water` (never more than `high_water`). Returns how many were
    /// dropped.
    pub fn enforce_bound(&mut self, high_water: usize, low_water: usize) -> usize {
        if self.entries.len() <= high_water {
            return 0;
        }
        let keep = low_water.min(high_water);
        let excess = self.entries.len().saturating_sub(keep);
        self.entries.drain(..excess);
        excess
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingInput> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// PredictiveSimulator
// ---------------------------------------------------------------------------

/// The client's local copy of its own actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalActor {
    pub body: ActorBody,
    pub score: u32,
}

/// Advances the local actor only. Obstacles and every other actor always
/// come from the latest snapshot; nothing here spawns or scores.
pub struct PredictiveSimulator {
    params: WorldParams,
    local: Option<LocalActor>,
}

impl PredictiveSimulator {
    pub fn new(params: WorldParams) -> Self {
        Self {
            params,
            local: None,
        }
    }

    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    /// The local actor, if it has been touched yet.
    pub fn local(&self) -> Option<&LocalActor> {
        self.local.as_ref()
    }

    /// The local actor, created at spawn height on first access.
    pub fn local_mut(&mut self) -> &mut LocalActor {
        let params = self.params;
        self.local.get_or_insert_with(|| LocalActor {
            body: ActorBody::spawned(&params),
            score: 0,
        })
    }

    /// Applies one local input. Returns `true` if the actor died this tick.
    pub fn predict(&mut self, flap: bool, obstacles: &[Obstacle]) -> bool {
        let params = self.params;
        self.local_mut().body.advance(flap, obstacles, &params)
    }

    /// Re-applies every pending input in sequence order. Returns how many
    /// inputs were replayed.
    pub fn replay(&mut self, pending: &PendingBuffer, obstacles: &[Obstacle]) -> usize {
        let mut replayed = 0;
        for input in pending.iter() {
            self.predict(input.flap, obstacles);
            replayed += 1;
        }
        replayed
    }

    /// Overwrites the local actor with an authoritative view.
    pub fn reset_to(&mut self, view: &ActorView) {
        self.local = Some(LocalActor {
            body: ActorBody {
                y: view.y,
                v: view.v,
                alive: view.alive,
            },
            score: view.score,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
