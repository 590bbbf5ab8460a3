//! The client's fixed-step loop: reconcile, sample, send, predict.

use std::time::Duration;

use skyward_multiplayer::{
    ClientWorld, InputSequencer, PendingBuffer, PredictiveSimulator, ReconcileConfig,
    Reconciliation, ReconciliationEngine, Snapshot,
};
use skyward_net::ServerLink;
use skyward_physics::WorldParams;
use tokio::sync::watch;

use crate::game_loop::GameLoop;
use crate::input::InputSource;

/// Fixed steps between repeated respawn requests while the actor stays dead.
pub const RESPAWN_RETRY_TICKS: u64 = 15;

/// Everything one logged-in client simulates.
pub struct ClientGame<I> {
    link: ServerLink,
    snapshots: watch::Receiver<Option<Snapshot>>,
    predictor: PredictiveSimulator,
    pending: PendingBuffer,
    sequencer: InputSequencer,
    engine: ReconciliationEngine,
    world: ClientWorld,
    input: I,
    ticks: u64,
    last_respawn_request: Option<u64>,
}

impl<I: InputSource> ClientGame<I> {
    /// `snapshots` is the latest-snapshot slot filled by
    /// [`ServerLink::spawn_snapshot_feed`].
    pub fn new(
        link: ServerLink,
        snapshots: watch::Receiver<Option<Snapshot>>,
        params: WorldParams,
        reconcile: ReconcileConfig,
        input: I,
    ) -> Self {
        Self {
            link,
            snapshots,
            predictor: PredictiveSimulator::new(params),
            pending: PendingBuffer::new(),
            sequencer: InputSequencer::new(),
            engine: ReconciliationEngine::new(reconcile),
            world: ClientWorld::new(),
            input,
            ticks: 0,
            last_respawn_request: None,
        }
    }

    pub fn predictor(&self) -> &PredictiveSimulator {
        &self.predictor
    }

    pub fn pending(&self) -> &PendingBuffer {
        &self.pending
    }

    pub fn world(&self) -> &ClientWorld {
        &self.world
    }

    pub fn sequencer(&self) -> &InputSequencer {
        &self.sequencer
    }

    /// Fixed steps run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs one fixed step.
    ///
    /// A snapshot that arrived since the previous step is reconciled
    /// first; then one input is sampled, sequenced, sent, and predicted.
    /// While the actor is dead a flap also sends a respawn request, repeated
    /// every [`RESPAWN_RETRY_TICKS`] until a snapshot shows it alive.
    /// Send failures are logged, never fatal.
    pub async fn step(&mut self) -> Option<Reconciliation> {
        let reconciled = self.take_snapshot().map(|snapshot| self.reconcile(snapshot));

        let params = *self.predictor.params();
        let flap = self
            .input
            .sample(self.predictor.local(), &self.world.obstacles, &params);
        let input = self.sequencer.issue(flap, &mut self.pending);
        if let Err(e) = self.link.send_input(input.seq, input.flap).await {
            tracing::warn!(seq = input.seq, "Failed to send input: {e}");
        }

        let dead = self.predictor.local().is_some_and(|l| !l.body.alive);
        let retry_due = self
            .last_respawn_request
            .is_none_or(|at| self.ticks >= at + RESPAWN_RETRY_TICKS);
        if dead && flap && retry_due {
            if let Err(e) = self.link.send_respawn().await {
                tracing::warn!("Failed to send respawn: {e}");
            }
            self.last_respawn_request = Some(self.ticks);
        }
        if self.predictor.predict(flap, &self.world.obstacles) {
            tracing::debug!(seq = input.seq, "Predicted death");
        }
        self.ticks += 1;
        reconciled
    }

    /// Runs frames at `render_fps` until `max_ticks` steps have run or
    /// `shutdown` turns `true`.
    pub async fn run(
        &mut self,
        render_fps: u32,
        max_frame: Duration,
        max_ticks: Option<u64>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut game_loop = GameLoop::new(self.predictor.params().dt(), max_frame);
        let mut frames =
            tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(render_fps.max(1))));
        frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = frames.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            for _ in 0..game_loop.frame() {
                self.step().await;
                if max_ticks.is_some_and(|max| self.ticks >= max) {
                    tracing::info!(
                        ticks = self.ticks,
                        frames = game_loop.frame_count(),
                        "Tick limit reached"
                    );
                    return;
                }
            }
        }
        tracing::info!(
            ticks = self.ticks,
            frames = game_loop.frame_count(),
            steps = game_loop.update_count(),
            "Client loop stopped"
        );
    }

    fn take_snapshot(&mut self) -> Option<Snapshot> {
        // A closed slot means the feed stopped; keep predicting.
        if !self.snapshots.has_changed().unwrap_or(false) {
            return None;
        }
        self.snapshots.borrow_and_update().clone()
    }

    fn reconcile(&mut self, snapshot: Snapshot) -> Reconciliation {
        let authority = self.world.apply(snapshot, self.link.username());
        let result = self.engine.reconcile(
            &mut self.predictor,
            &mut self.pending,
            authority.as_ref(),
            &self.world.obstacles,
        );
        if self.predictor.local().is_some_and(|l| l.body.alive) {
            self.last_respawn_request = None;
        }
        tracing::debug!(
            tick = self.world.tick,
            outcome = ?result.outcome,
            purged = result.purged,
            replayed = result.replayed,
            dropped = result.dropped,
            pending = self.pending.len(),
            "Reconciled"
        );
        result
    }
}

#[cfg(test)]
#[path = "game_tests.rs"]
mod tests;
