//! The per-actor physics step and its rounding contract.

use serde::{Deserialize, Serialize};

use crate::params::WorldParams;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Decimal places `y` and `v` are normalized to after every step.
///
/// Both the authority and the predicting client round here, which keeps
/// accumulated float drift from separating them over long sessions.
pub const PHYSICS_DECIMALS: i32 = 4;

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Rounds `value` to `decimals` places, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Rounds `value` to [`PHYSICS_DECIMALS`] places.
pub fn round4(value: f64) -> f64 {
    round_to(value, PHYSICS_DECIMALS)
}

// ---------------------------------------------------------------------------
// Obstacle
// ---------------------------------------------------------------------------

/// A vertical barrier with a single opening, scrolling leftward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Left edge.
    pub x: f64,
    /// Center of the opening.
    pub gap_y: f64,
}

impl Obstacle {
    pub fn new(x: f64, gap_y: f64) -> Self {
        Self { x, gap_y }
    }

    /// Whether the obstacle's padded horizontal span covers the actor column.
    pub fn spans_actor(&self, params: &WorldParams) -> bool {
        let left = self.x - params.actor_radius;
        let right = self.x + params.obstacle_width + params.actor_radius;
        left <= params.actor_x && params.actor_x <= right
    }

    /// Whether `y` lies strictly inside the opening.
    pub fn gap_contains(&self, y: f64, params: &WorldParams) -> bool {
        let half = params.obstacle_gap / 2.0;
        self.gap_y - half < y && y < self.gap_y + half
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// Result of advancing one actor by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub y: f64,
    pub v: f64,
    pub died: bool,
}

fn out_of_bounds(y: f64, params: &WorldParams) -> bool {
    y <= 0.0 || y >= params.world_height
}

/// Advances a living actor by one fixed timestep.
///
/// An actor that already sits on or beyond a world edge dies without being
/// integrated. Otherwise the flap impulse replaces the velocity, gravity is
/// applied with the fall clamp, position is integrated, both values are
/// rounded, and the new position is tested against the bounds and every
/// obstacle whose padded span covers the actor column.
///
/// Pure and total: identical arguments always give identical results.
pub fn step(y: f64, v: f64, flap: bool, obstacles: &[Obstacle], params: &WorldParams) -> StepOutcome {
    if out_of_bounds(y, params) {
        return StepOutcome { y, v, died: true };
    }

    let dt = params.dt();
    let mut v = if flap { params.jump_impulse } else { v };
    v = (v + params.gravity * dt).min(params.max_fall_velocity);
    let y = round4(y + v * dt);
    let v = round4(v);

    let died = out_of_bounds(y, params)
        || obstacles
            .iter()
            .any(|o| o.spans_actor(params) && !o.gap_contains(y, params));

    StepOutcome { y, v, died }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
