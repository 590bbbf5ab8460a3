//! Server reconciliation: corrects the local prediction when an
//! authoritative snapshot disagrees with it.
//!
//! On each new snapshot the client purges acknowledged inputs, adopts the
//! authoritative state where it has diverged past the configured
//! tolerances, and replays the unacknowledged tail on top of the adopted
//! baseline.

use serde::{Deserialize, Serialize};
use skyward_physics::{ActorBody, Obstacle};

use crate::prediction::{PendingBuffer, PredictiveSimulator};
use crate::snapshot::ActorView;

// ---------------------------------------------------------------------------
// ReconcileConfig
// ---------------------------------------------------------------------------

/// Tolerances and buffer limits for reconciliation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Position difference above which the local actor is re-baselined.
    pub position_threshold: f64,
    /// Velocity difference above which the local actor is re-baselined.
    pub velocity_threshold: f64,
    /// Pending-buffer length that triggers truncation.
    pub high_water: usize,
    /// Pending-buffer length kept after truncation.
    pub low_water: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            position_threshold: 1.5,
            velocity_threshold: 0.5,
            high_water: 200,
            low_water: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation result
// ---------------------------------------------------------------------------

/// What reconciliation did to the local actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The snapshot has no entry for the local actor.
    Missing,
    /// The local actor was dead and the authority revived it.
    Respawned,
    /// The prediction diverged and was re-baselined.
    Corrected,
    /// The prediction was within tolerance.
    Confirmed,
    /// Both sides agree the actor is dead.
    Dead,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub outcome: ReconcileOutcome,
    /// Inputs removed because the authority acknowledged them.
    pub purged: usize,
    /// Inputs re-applied after a correction.
    pub replayed: usize,
    /// Inputs dropped by the respawn clear or the overflow bound.
    pub dropped: usize,
}

impl Reconciliation {
    fn untouched(outcome: ReconcileOutcome) -> Self {
        Self {
            outcome,
            purged: 0,
            replayed: 0,
            dropped: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// ReconciliationEngine
// ---------------------------------------------------------------------------

/// Applies authoritative snapshots to the local prediction.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    config: ReconcileConfig,
}

impl ReconciliationEngine {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Returns `true` if the local state is outside tolerance of `auth`.
    pub fn diverged(&self, local: &ActorBody, auth: &ActorView) -> bool {
        (local.y - auth.y).abs() > self.config.position_threshold
            || (local.v - auth.v).abs() > self.config.velocity_threshold
    }

    /// Reconciles the predictor against the snapshot's entry for the local
    /// actor.
    ///
    /// 1. Purge pending inputs the authority has acknowledged.
    /// 2. On a respawn edge adopt the authoritative state and drop every
    ///    pending input.
    /// 3. While alive, adopt position and velocity if they diverged; always
    ///    adopt liveness and score.
    /// 4. Replay the remaining inputs on top of an adopted baseline. A
    ///    prediction within tolerance already contains them.
    /// 5. Enforce the pending-buffer bound.
    pub fn reconcile(
        &self,
        predictor: &mut PredictiveSimulator,
        pending: &mut PendingBuffer,
        auth: Option<&ActorView>,
        obstacles: &[Obstacle],
    ) -> Reconciliation {
        let Some(auth) = auth else {
            return Reconciliation::untouched(ReconcileOutcome::Missing);
        };

        let purged = pending.purge_acknowledged(auth.last_acked_seq);
        let mut dropped = 0;

        let local = predictor.local_mut();
        let outcome = if !local.body.alive && auth.alive {
            dropped += pending.clear();
            predictor.reset_to(auth);
            ReconcileOutcome::Respawned
        } else if local.body.alive {
            let diverged = self.diverged(&local.body, auth);
            if diverged {
                local.body.y = auth.y;
                local.body.v = auth.v;
            }
            local.body.alive = auth.alive;
            local.score = auth.score;
            if diverged {
                ReconcileOutcome::Corrected
            } else {
                ReconcileOutcome::Confirmed
            }
        } else {
            local.score = auth.score;
            ReconcileOutcome::Dead
        };

        let replayed = if outcome == ReconcileOutcome::Corrected {
            predictor.replay(pending, obstacles)
        } else {
            0
        };

        dropped += pending.enforce_bound(self.config.high_water, self.config.low_water);
        if dropped > 0 {
            tracing::debug!(dropped, remaining = pending.len(), "pending inputs dropped");
        }

        Reconciliation {
            outcome,
            purged,
            replayed,
            dropped,
        }
    }
}

#[cfg(test)]
#[path = "reconciliation_tests.rs"]
mod tests;
