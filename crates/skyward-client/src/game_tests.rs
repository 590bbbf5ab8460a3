use std::net::SocketAddr;
use std::sync::Arc;

use super::*;
use crate::input::{Autopilot, Scripted};
use skyward_multiplayer::{ActorView, ReconcileOutcome};
use skyward_net::messages::LoginSuccess;
use skyward_net::{Endpoint, Message};
use skyward_physics::ActorBody;

const WAIT: Duration = Duration::from_secs(2);

async fn loopback() -> Endpoint {
    Endpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap()
}

/// Helper: a link logged in as `ann` against a bare endpoint standing in
/// for the authority.
async fn logged_in_link() -> (ServerLink, Endpoint) {
    let server = loopback().await;
    let mut link = ServerLink::new(loopback().await, server.local_addr().unwrap());

    let responder = server.clone();
    let answer = tokio::spawn(async move {
        let d = responder.receiver().recv(WAIT).await.unwrap().unwrap();
        let reply = Message::LoginSuccess(LoginSuccess {
            username: "ann".into(),
            tick_rate: 30,
        });
        responder.send(&reply, d.from).await.unwrap();
    });
    link.login("ann", "pw", WAIT).await.unwrap();
    answer.await.unwrap();
    (link, server)
}

fn view(body: ActorBody, last_acked_seq: u64) -> ActorView {
    ActorView {
        y: body.y,
        v: body.v,
        alive: body.alive,
        score: 0,
        last_acked_seq,
    }
}

fn snapshot_with(tick: u64, ann: ActorView) -> Snapshot {
    let mut snapshot = Snapshot {
        tick,
        ..Default::default()
    };
    snapshot.actors.insert("ann".into(), ann);
    snapshot
}

#[tokio::test]
async fn test_steps_send_sequenced_inputs() {
    let (link, server) = logged_in_link().await;
    let (_tx, rx) = watch::channel(None);
    let mut game = ClientGame::new(
        link,
        rx,
        WorldParams::default(),
        ReconcileConfig::default(),
        Scripted::new(vec![false, true]),
    );

    for _ in 0..3 {
        assert!(game.step().await.is_none());
    }
    assert_eq!(game.ticks(), 3);
    assert_eq!(game.pending().len(), 3);

    let mut received = Vec::new();
    for _ in 0..3 {
        let d = server.receiver().recv(WAIT).await.unwrap().unwrap();
        let Ok(Message::Input(input)) = d.message else {
            panic!("expected input");
        };
        received.push((input.seq, input.flap));
    }
    assert_eq!(received, vec![(1, false), (2, true), (3, false)]);
}

#[tokio::test]
async fn test_late_snapshot_is_replayed_to_prediction() {
    let (link, _server) = logged_in_link().await;
    let (tx, rx) = watch::channel(None);
    let params = WorldParams::default();
    let mut game = ClientGame::new(
        link,
        rx,
        params,
        ReconcileConfig::default(),
        Scripted::new(vec![false]),
    );
    for _ in 0..3 {
        game.step().await;
    }
    let predicted = game.predictor().local().unwrap().body;

    // The authority has seen two of the three inputs.
    let mut body = ActorBody::spawned(&params);
    body.advance(false, &[], &params);
    body.advance(false, &[], &params);
    tx.send_replace(Some(snapshot_with(2, view(body, 2))));

    let result = game.step().await.unwrap();
    assert_eq!(result.outcome, ReconcileOutcome::Corrected);
    assert_eq!(result.purged, 2);
    assert_eq!(result.replayed, 1);
    assert_eq!(game.world().tick, 2);

    // Reconciled state plus the fourth predicted step.
    let mut expected = predicted;
    expected.advance(false, &[], &params);
    assert_eq!(game.predictor().local().unwrap().body, expected);
}

#[tokio::test]
async fn test_dead_actor_requests_respawn_once() {
    let (link, server) = logged_in_link().await;
    let (tx, rx) = watch::channel(None);
    let params = WorldParams::default();
    let mut game = ClientGame::new(
        link,
        rx,
        params,
        ReconcileConfig::default(),
        Scripted::new(vec![true]),
    );
    let dead = ActorBody {
        y: 790.0,
        v: 0.0,
        alive: false,
    };
    tx.send_replace(Some(snapshot_with(5, view(dead, 0))));

    game.step().await;
    game.step().await;
    assert!(!game.predictor().local().unwrap().body.alive);

    let mut inbox = server.receiver();
    let mut respawns = 0;
    while let Some(d) = inbox.recv(Duration::from_millis(100)).await.unwrap() {
        if let Ok(Message::Respawn(_)) = d.message {
            respawns += 1;
        }
    }
    assert_eq!(respawns, 1);
}

#[tokio::test]
async fn test_respawn_request_repeats_while_still_dead() {
    let (link, server) = logged_in_link().await;
    let (tx, rx) = watch::channel(None);
    let mut game = ClientGame::new(
        link,
        rx,
        WorldParams::default(),
        ReconcileConfig::default(),
        Scripted::new(vec![true]),
    );
    let dead = ActorBody {
        y: 790.0,
        v: 0.0,
        alive: false,
    };

    // The authority keeps reporting the actor dead, as if requests were lost.
    for tick in 0..60 {
        tx.send_replace(Some(snapshot_with(tick + 1, view(dead, tick))));
        game.step().await;
    }

    let mut inbox = server.receiver();
    let mut respawns = 0;
    while let Some(d) = inbox.recv(Duration::from_millis(100)).await.unwrap() {
        if let Ok(Message::Respawn(_)) = d.message {
            respawns += 1;
        }
    }
    assert_eq!(respawns, 60 / RESPAWN_RETRY_TICKS);
}

#[tokio::test]
async fn test_client_tracks_real_authority() {
    use skyward_server::GameServer;
    use skyward_store::{MemoryStore, ScoreStore};

    let mut config = skyward_config::Config::default();
    config.server.seed = Some(3);
    let store: Arc<dyn ScoreStore> = Arc::new(MemoryStore::new());
    let server = Arc::new(GameServer::new(config.clone(), store));
    let endpoint = loopback().await;
    let server_addr: SocketAddr = endpoint.local_addr().unwrap();
    let srv = Arc::clone(&server);
    let server_task = tokio::spawn(async move { srv.run_with_endpoint(endpoint, None).await });

    let mut link = ServerLink::new(loopback().await, server_addr);
    link.login("ann", "pw", WAIT).await.unwrap();
    let (stop_tx, stop_rx) = watch::channel(false);
    let (feed, slot) = link.spawn_snapshot_feed(stop_rx.clone(), Duration::from_millis(20));

    let mut game = ClientGame::new(
        link,
        slot,
        config.world,
        config.client.reconcile,
        Autopilot,
    );
    game.run(60, Duration::from_millis(250), Some(45), stop_rx)
        .await;

    assert_eq!(game.ticks(), 45);
    assert!(game.world().tick > 0, "no snapshot reached the client");
    assert!(game.pending().len() < 45, "nothing was acknowledged");
    assert_eq!(game.sequencer().last_issued(), 45);

    stop_tx.send(true).unwrap();
    server.shutdown();
    tokio::time::timeout(WAIT, feed).await.unwrap().unwrap();
    tokio::time::timeout(WAIT, server_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
