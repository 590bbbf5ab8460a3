use super::*;
use skyward_net::messages::Refusal;
use skyward_net::{DiscoveryListener, ServerLink};
use skyward_store::MemoryStore;

const WAIT: Duration = Duration::from_secs(2);

async fn loopback() -> Endpoint {
    Endpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap()
}

/// Helper: start a server on an ephemeral port and return its address.
async fn start_test_server(
    announcer: Option<Announcer>,
) -> (SocketAddr, Arc<GameServer>, tokio::task::JoinHandle<()>) {
    let mut config = Config::default();
    config.server.seed = Some(11);
    let store: Arc<dyn ScoreStore> = Arc::new(MemoryStore::new());
    let server = Arc::new(GameServer::new(config, store));

    let endpoint = loopback().await;
    let addr = endpoint.local_addr().unwrap();
    let srv = Arc::clone(&server);
    let handle = tokio::spawn(async move {
        srv.run_with_endpoint(endpoint, announcer).await.unwrap();
    });
    (addr, server, handle)
}

/// Receives until a message other than `state` arrives.
async fn next_reply(endpoint: &Endpoint) -> Message {
    loop {
        let datagram = endpoint.receiver().recv(WAIT).await.unwrap().expect("no reply");
        match datagram.message.unwrap() {
            Message::State(_) => continue,
            other => return other,
        }
    }
}

async fn next_state(endpoint: &Endpoint) -> StateMessage {
    loop {
        let datagram = endpoint.receiver().recv(WAIT).await.unwrap().expect("no state");
        if let Ok(Message::State(state)) = datagram.message {
            return state;
        }
    }
}

fn login(name: &str, password: &str) -> Message {
    Message::Login(Login {
        username: name.into(),
        password: password.into(),
    })
}

#[tokio::test]
async fn test_login_registers_new_user() {
    let (addr, server, _) = start_test_server(None).await;
    let mut link = ServerLink::new(loopback().await, addr);

    let accepted = link.login("ann", "pw", WAIT).await.unwrap();
    assert_eq!(accepted.tick_rate, 30);
    assert_eq!(server.sessions.len().await, 1);
    server.shutdown();
}

#[tokio::test]
async fn test_wrong_password_fails_login() {
    let (addr, server, _) = start_test_server(None).await;
    let mut first = ServerLink::new(loopback().await, addr);
    first.login("ann", "pw", WAIT).await.unwrap();

    let mut second = ServerLink::new(loopback().await, addr);
    let err = second.login("ann", "nope", WAIT).await.unwrap_err();
    assert!(matches!(err, skyward_net::NetError::LoginFailed(m) if m == "Invalid password"));
    server.shutdown();
}

#[tokio::test]
async fn test_empty_username_fails_login() {
    let (addr, server, _) = start_test_server(None).await;
    let client = loopback().await;
    client.send(&login("", "pw"), addr).await.unwrap();
    assert!(matches!(next_reply(&client).await, Message::LoginFailed(_)));
    server.shutdown();
}

#[tokio::test]
async fn test_input_from_unknown_address_is_rejected() {
    let (addr, server, _) = start_test_server(None).await;
    let mut link = ServerLink::new(loopback().await, addr);
    link.login("ann", "pw", WAIT).await.unwrap();

    let intruder = loopback().await;
    let input = Message::Input(Input {
        username: "ann".into(),
        flap: true,
        seq: 1,
    });
    intruder.send(&input, addr).await.unwrap();
    assert_eq!(
        next_reply(&intruder).await,
        Message::Rejected(Refusal {
            message: "Not logged in".into()
        })
    );
    server.shutdown();
}

#[tokio::test]
async fn test_unknown_and_client_only_types_are_rejected() {
    let (addr, server, _) = start_test_server(None).await;
    let client = loopback().await;

    client
        .send_raw(br#"{"type":"teleport","x":1}"#, addr)
        .await
        .unwrap();
    let Message::Rejected(refusal) = next_reply(&client).await else {
        panic!("expected rejection");
    };
    assert_eq!(refusal.message, "Unknown message type: teleport");

    client
        .send(&Message::login_failed("spoofed"), addr)
        .await
        .unwrap();
    let Message::Rejected(refusal) = next_reply(&client).await else {
        panic!("expected rejection");
    };
    assert_eq!(refusal.message, "Unexpected message type: login_failed");
    server.shutdown();
}

#[tokio::test]
async fn test_garbage_is_dropped_silently() {
    let (addr, server, _) = start_test_server(None).await;
    let client = loopback().await;
    client.send_raw(b"\x00\x01garbage", addr).await.unwrap();
    let reply = client.receiver().recv(Duration::from_millis(200)).await.unwrap();
    assert!(reply.is_none());
    server.shutdown();
}

#[tokio::test]
async fn test_state_acknowledges_inputs() {
    let (addr, server, _) = start_test_server(None).await;
    let client = loopback().await;
    let mut link = ServerLink::new(client.clone(), addr);
    link.login("ann", "pw", WAIT).await.unwrap();

    let state = next_state(&client).await;
    assert!(state.players.contains_key("ann"));

    for seq in 1..=3 {
        link.send_input(seq, false).await.unwrap();
    }
    let acked = tokio::time::timeout(WAIT, async {
        loop {
            let snapshot = next_state(&client).await.into_snapshot();
            let seq = snapshot.actor("ann").map(|a| a.last_acked_seq).unwrap_or(0);
            if seq == 3 {
                return seq;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(acked, 3);
    server.shutdown();
}

#[tokio::test]
async fn test_disconnect_removes_session() {
    let (addr, server, _) = start_test_server(None).await;
    let client = loopback().await;
    let mut link = ServerLink::new(client.clone(), addr);
    link.login("ann", "pw", WAIT).await.unwrap();
    assert_eq!(server.sessions.len().await, 1);

    link.send_disconnect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(server.sessions.is_empty().await);

    // A second disconnect no longer names a session.
    link.send_disconnect().await.unwrap();
    assert!(matches!(next_reply(&client).await, Message::Rejected(_)));
    server.shutdown();
}

#[tokio::test]
async fn test_discovery_is_announced() {
    let listener = DiscoveryListener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let target = listener.local_addr().unwrap();
    let game = loopback().await;
    let game_port = game.local_addr().unwrap().port();
    let announcer = Announcer::with_endpoint(loopback().await, game_port, target).unwrap();

    let (_, server, _) = start_test_server(Some(announcer)).await;
    let found = listener.wait_for_server(WAIT).await.unwrap();
    assert_eq!(found.port(), game_port);
    server.shutdown();
}

#[tokio::test]
async fn test_shutdown_stops_all_loops() {
    let (_, server, handle) = start_test_server(None).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    server.shutdown();
    tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_file_store_is_written_off_the_loops() {
    use skyward_store::RonFileStore;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scores.ron");
    let store: Arc<dyn ScoreStore> = Arc::new(RonFileStore::open(&path).unwrap());
    let server = Arc::new(GameServer::new(Config::default(), store));
    let endpoint = loopback().await;
    let addr = endpoint.local_addr().unwrap();
    let srv = Arc::clone(&server);
    let handle = tokio::spawn(async move { srv.run_with_endpoint(endpoint, None).await });

    let client = loopback().await;
    client.send(&login("ann", "pw"), addr).await.unwrap();
    assert!(matches!(next_reply(&client).await, Message::LoginSuccess(_)));
    // Ticks keep coming while the registration is on disk.
    assert!(next_state(&client).await.players.contains_key("ann"));

    server.shutdown();
    tokio::time::timeout(WAIT, handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let reopened = RonFileStore::open(&path).unwrap();
    assert!(reopened.get_user("ann").unwrap().is_some());
    assert_eq!(reopened.leaderboard(10).unwrap()[0].name, "ann");
}
