//! Where flap decisions come from.

use skyward_multiplayer::LocalActor;
use skyward_physics::{Obstacle, WorldParams};

/// Produces one flap decision per fixed step.
pub trait InputSource {
    /// `local` is the predicted actor (if spawned yet); `obstacles` come
    /// from the latest snapshot.
    fn sample(
        &mut self,
        local: Option<&LocalActor>,
        obstacles: &[Obstacle],
        params: &WorldParams,
    ) -> bool;
}

/// A bot that hovers around the centre of the next gap.
///
/// Flaps when the actor is falling and sits below the target by more than a
/// fifth of the gap. A dead actor always flaps, which doubles as a respawn
/// request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Autopilot;

impl Autopilot {
    /// Gap centre of the first obstacle the actor has not fully passed,
    /// or mid-screen when none is coming.
    pub fn target(obstacles: &[Obstacle], params: &WorldParams) -> f64 {
        obstacles
            .iter()
            .find(|o| o.x + params.obstacle_width + params.actor_radius >= params.actor_x)
            .map(|o| o.gap_y)
            .unwrap_or(params.world_height / 2.0)
    }
}

impl InputSource for Autopilot {
    fn sample(
        &mut self,
        local: Option<&LocalActor>,
        obstacles: &[Obstacle],
        params: &WorldParams,
    ) -> bool {
        let Some(local) = local else {
            return false;
        };
        if !local.body.alive {
            return true;
        }
        let margin = params.obstacle_gap / 5.0;
        local.body.v >= 0.0 && local.body.y > Self::target(obstacles, params) + margin
    }
}

/// Plays back a fixed flap pattern, repeating it forever.
#[derive(Debug, Clone)]
pub struct Scripted {
    pattern: Vec<bool>,
    cursor: usize,
}

impl Scripted {
    pub fn new(pattern: Vec<bool>) -> Self {
        Self { pattern, cursor: 0 }
    }
}

impl InputSource for Scripted {
    fn sample(&mut self, _: Option<&LocalActor>, _: &[Obstacle], _: &WorldParams) -> bool {
        if self.pattern.is_empty() {
            return false;
        }
        let flap = self.pattern[self.cursor % self.pattern.len()];
        self.cursor += 1;
        flap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyward_physics::ActorBody;

    fn actor(y: f64, v: f64, alive: bool) -> LocalActor {
        LocalActor {
            body: ActorBody { y, v, alive },
            score: 0,
        }
    }

    #[test]
    fn test_autopilot_targets_next_gap() {
        let params = WorldParams::default();
        let passed = Obstacle::new(-10.0, 150.0);
        let next = Obstacle::new(200.0, 300.0);
        assert_eq!(Autopilot::target(&[passed, next], &params), 300.0);
        assert_eq!(Autopilot::target(&[], &params), 400.0);
    }

    #[test]
    fn test_autopilot_flaps_when_falling_below_target() {
        let params = WorldParams::default();
        let mut pilot = Autopilot;
        assert!(pilot.sample(Some(&actor(460.0, 30.0, true)), &[], &params));
        // Rising, or close enough to the target.
        assert!(!pilot.sample(Some(&actor(460.0, -200.0, true)), &[], &params));
        assert!(!pilot.sample(Some(&actor(420.0, 30.0, true)), &[], &params));
    }

    #[test]
    fn test_autopilot_flaps_when_dead() {
        let params = WorldParams::default();
        let mut pilot = Autopilot;
        assert!(pilot.sample(Some(&actor(0.0, 0.0, false)), &[], &params));
        assert!(!pilot.sample(None, &[], &params));
    }

    #[test]
    fn test_scripted_repeats_pattern() {
        let params = WorldParams::default();
        let mut script = Scripted::new(vec![true, false, false]);
        let flaps: Vec<bool> = (0..6).map(|_| script.sample(None, &[], &params)).collect();
        assert_eq!(flaps, vec![true, false, false, true, false, false]);
        assert!(!Scripted::new(Vec::new()).sample(None, &[], &params));
    }
}
