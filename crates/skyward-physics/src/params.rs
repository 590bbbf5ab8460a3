//! World constants shared by the authority and every predicting client.

use serde::{Deserialize, Serialize};

/// Immutable world configuration.
///
/// Passed by value into both simulators at construction. Units are world
/// pixels and seconds; `y` grows downward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldParams {
    /// Horizontal extent of the playfield.
    pub world_width: f64,
    /// Vertical extent of the playfield. Touching either edge is fatal.
    pub world_height: f64,
    /// Fixed horizontal column every actor occupies.
    pub actor_x: f64,
    /// Collision radius of an actor.
    pub actor_radius: f64,
    /// Height an actor spawns and respawns at.
    pub spawn_y: f64,
    /// Horizontal thickness of an obstacle.
    pub obstacle_width: f64,
    /// Vertical size of the opening in an obstacle.
    pub obstacle_gap: f64,
    /// Leftward obstacle speed in units per second.
    pub obstacle_speed: f64,
    /// Ticks between two obstacle spawns.
    pub spawn_interval_ticks: u32,
    /// Downward acceleration in units per second squared.
    pub gravity: f64,
    /// Velocity assigned on a flap (negative is upward).
    pub jump_impulse: f64,
    /// Terminal falling velocity.
    pub max_fall_velocity: f64,
    /// Simulation rate in Hz.
    pub tick_rate: u32,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            world_width: 480.0,
            world_height: 800.0,
            actor_x: 100.0,
            actor_radius: 20.0,
            spawn_y: 400.0,
            obstacle_width: 80.0,
            obstacle_gap: 200.0,
            obstacle_speed: 250.0,
            spawn_interval_ticks: 90,
            gravity: 1800.0,
            jump_impulse: -600.0,
            max_fall_velocity: 1000.0,
            tick_rate: 30,
        }
    }
}

impl WorldParams {
    /// Fixed timestep in seconds.
    pub fn dt(&self) -> f64 {
        1.0 / f64::from(self.tick_rate)
    }

    /// Lowest legal gap center for a freshly spawned obstacle.
    pub fn min_gap_center(&self) -> f64 {
        self.obstacle_gap / 2.0
    }

    /// Highest legal gap center for a freshly spawned obstacle.
    pub fn max_gap_center(&self) -> f64 {
        self.world_height - self.obstacle_gap / 2.0
    }
}
