//! Mutable per-actor physical state driven by [`step`](crate::step).

use serde::{Deserialize, Serialize};

use crate::params::WorldParams;
use crate::step::{Obstacle, step};

/// Vertical position, velocity and liveness of one actor.
///
/// Held by value inside the authority's actor records and inside the
/// client's predictor, so both advance through the same code path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorBody {
    pub y: f64,
    pub v: f64,
    pub alive: bool,
}

impl ActorBody {
    /// A living body at rest at the configured spawn height.
    pub fn spawned(params: &WorldParams) -> Self {
        Self {
            y: params.spawn_y,
            v: 0.0,
            alive: true,
        }
    }

    /// Advances the body by one tick. Returns `true` if it died this tick.
    ///
    /// Dead bodies are frozen and never integrated. On death the velocity
    /// is zeroed and the final position is kept.
    pub fn advance(&mut self, flap: bool, obstacles: &[Obstacle], params: &WorldParams) -> bool {
        if !self.alive {
            return false;
        }
        let out = step(self.y, self.v, flap, obstacles, params);
        self.y = out.y;
        if out.died {
            self.v = 0.0;
            self.alive = false;
        } else {
            self.v = out.v;
        }
        out.died
    }

    /// Puts the body back at spawn height, alive and at rest.
    pub fn respawn(&mut self, params: &WorldParams) {
        *self = Self::spawned(params);
    }
}
