//! Network message types and JSON serialization.
//!
//! Every datagram carries exactly one JSON object whose `type` field names
//! the message. Use [`encode`] and [`decode`] for the wire conversion.
//!
//! The `state` message decodes leniently: a player or pipe entry that does
//! not have the expected shape is kept as [`Entry::Malformed`] and skipped
//! when the snapshot is rebuilt, so one bad entry never costs the whole
//! datagram.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skyward_multiplayer::{ActorView, LeaderboardEntry, Snapshot};
use skyward_physics::{Obstacle, round_to};

/// Default number of decimals floats are rounded to on the wire.
pub const DEFAULT_WIRE_DECIMALS: i32 = 2;

// ---------------------------------------------------------------------------
// Top-level enum
// ---------------------------------------------------------------------------

/// Top-level network message, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    // --- Discovery ---
    /// Periodic LAN announcement of the game port.
    Discovery(Discovery),

    // --- Auth ---
    /// Client asks to log in, registering the name if it is new.
    Login(Login),
    /// Authority accepted the login.
    LoginSuccess(LoginSuccess),
    /// Authority refused the login.
    LoginFailed(Refusal),
    /// Authority refused a protocol message.
    Rejected(Refusal),

    // --- Gameplay ---
    /// One sequenced local input.
    Input(Input),
    /// Authoritative world snapshot.
    State(StateMessage),
    /// Explicit respawn request.
    Respawn(UserRef),
    /// Client is leaving.
    Disconnect(UserRef),
}

impl Message {
    /// Every `type` tag this protocol understands.
    pub const KNOWN_TYPES: [&'static str; 9] = [
        "discovery",
        "login",
        "login_success",
        "login_failed",
        "rejected",
        "input",
        "state",
        "respawn",
        "disconnect",
    ];

    /// The wire tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Discovery(_) => "discovery",
            Self::Login(_) => "login",
            Self::LoginSuccess(_) => "login_success",
            Self::LoginFailed(_) => "login_failed",
            Self::Rejected(_) => "rejected",
            Self::Input(_) => "input",
            Self::State(_) => "state",
            Self::Respawn(_) => "respawn",
            Self::Disconnect(_) => "disconnect",
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(Refusal {
            message: message.into(),
        })
    }

    pub fn login_failed(message: impl Into<String>) -> Self {
        Self::LoginFailed(Refusal {
            message: message.into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// Discovery announcement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Discovery {
    /// Game port the authority listens on.
    pub port: u16,
}

/// Login request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Login {
    pub username: String,
    pub password: String,
}

/// Login acceptance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginSuccess {
    pub username: String,
    /// Authority simulation rate in Hz.
    pub tick_rate: u32,
}

/// Human-readable refusal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Refusal {
    pub message: String,
}

/// Sequenced input from a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Input {
    pub username: String,
    pub flap: bool,
    pub seq: u64,
}

/// Message that only names its sender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRef {
    pub username: String,
}

/// Either a well-formed value or the raw JSON that failed to parse as one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Entry<T> {
    Valid(T),
    Malformed(serde_json::Value),
}

impl<T> Entry<T> {
    pub fn valid(self) -> Option<T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Malformed(_) => None,
        }
    }
}

/// Wire form of one actor in a snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub y: f64,
    pub v: f64,
    pub alive: bool,
    pub score: u32,
    pub last_seq: u64,
}

/// Wire form of one obstacle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipeState {
    pub x: f64,
    pub gap_y: f64,
}

/// Authoritative snapshot as sent on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateMessage {
    pub tick: u64,
    pub players: BTreeMap<String, Entry<PlayerState>>,
    pub pipes: Vec<Entry<PipeState>>,
    /// `[name, score]` pairs, best first.
    #[serde(default)]
    pub leaderboard: Vec<Entry<(String, u32)>>,
}

impl StateMessage {
    /// Builds the wire form of `snapshot`, rounding floats to `decimals`.
    pub fn from_snapshot(snapshot: &Snapshot, decimals: i32) -> Self {
        let players = snapshot
            .actors
            .iter()
            .map(|(id, a)| {
                let state = PlayerState {
                    y: round_to(a.y, decimals),
                    v: round_to(a.v, decimals),
                    alive: a.alive,
                    score: a.score,
                    last_seq: a.last_acked_seq,
                };
                (id.clone(), Entry::Valid(state))
            })
            .collect();
        let pipes = snapshot
            .obstacles
            .iter()
            .map(|o| {
                Entry::Valid(PipeState {
                    x: round_to(o.x, decimals),
                    gap_y: round_to(o.gap_y, decimals),
                })
            })
            .collect();
        let leaderboard = snapshot
            .leaderboard
            .iter()
            .map(|e| Entry::Valid((e.name.clone(), e.score)))
            .collect();
        Self {
            tick: snapshot.tick,
            players,
            pipes,
            leaderboard,
        }
    }

    /// Number of entries that failed to parse.
    pub fn malformed_entries(&self) -> usize {
        let players = self
            .players
            .values()
            .filter(|e| matches!(e, Entry::Malformed(_)))
            .count();
        let pipes = self
            .pipes
            .iter()
            .filter(|e| matches!(e, Entry::Malformed(_)))
            .count();
        let rows = self
            .leaderboard
            .iter()
            .filter(|e| matches!(e, Entry::Malformed(_)))
            .count();
        players + pipes + rows
    }

    /// Rebuilds a snapshot, skipping malformed entries.
    pub fn into_snapshot(self) -> Snapshot {
        let skipped = self.malformed_entries();
        if skipped > 0 {
            tracing::debug!(tick = self.tick, skipped, "skipping malformed snapshot entries");
        }
        let actors = self
            .players
            .into_iter()
            .filter_map(|(id, entry)| {
                entry.valid().map(|p| {
                    let view = ActorView {
                        y: p.y,
                        v: p.v,
                        alive: p.alive,
                        score: p.score,
                        last_acked_seq: p.last_seq,
                    };
                    (id, view)
                })
            })
            .collect();
        let obstacles = self
            .pipes
            .into_iter()
            .filter_map(Entry::valid)
            .map(|p| Obstacle::new(p.x, p.gap_y))
            .collect();
        let leaderboard = self
            .leaderboard
            .into_iter()
            .filter_map(Entry::valid)
            .map(|(name, score)| LeaderboardEntry { name, score })
            .collect();
        Snapshot {
            tick: self.tick,
            actors,
            obstacles,
            leaderboard,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from encoding or decoding a datagram.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Not JSON, not an object, or fields of the wrong shape.
    #[error("malformed datagram: {0}")]
    Malformed(#[source] serde_json::Error),

    /// A JSON object without a string `type` field.
    #[error("datagram has no type tag")]
    MissingType,

    /// A well-formed message of a type this protocol does not know.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// Serialization failed.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

/// Serializes a [`Message`] into one datagram payload.
pub fn encode(msg: &Message) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(msg).map_err(CodecError::Encode)
}

/// Parses one datagram payload.
///
/// Unknown `type` tags are reported separately from malformed payloads so
/// the authority can answer the former and silently drop the latter.
pub fn decode(data: &[u8]) -> Result<Message, CodecError> {
    let value: serde_json::Value = serde_json::from_slice(data).map_err(CodecError::Malformed)?;
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(CodecError::MissingType)?;
    if !Message::KNOWN_TYPES.contains(&kind) {
        return Err(CodecError::UnknownType(kind.to_string()));
    }
    serde_json::from_value(value).map_err(CodecError::Malformed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot {
            tick: 9,
            actors: BTreeMap::from([(
                "ann".to_string(),
                ActorView {
                    y: 402.123456,
                    v: 60.0049,
                    alive: true,
                    score: 3,
                    last_acked_seq: 17,
                },
            )]),
            obstacles: vec![Obstacle::new(291.6667, 350.0)],
            leaderboard: vec![LeaderboardEntry::new("bob", 12)],
        }
    }

    #[test]
    fn test_input_wire_shape() {
        let msg = Message::Input(Input {
            username: "ann".into(),
            flap: true,
            seq: 5,
        });
        let value: serde_json::Value = serde_json::from_slice(&encode(&msg).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "input", "username": "ann", "flap": true, "seq": 5})
        );
    }

    #[test]
    fn test_login_success_uses_camel_case() {
        let msg = Message::LoginSuccess(LoginSuccess {
            username: "ann".into(),
            tick_rate: 30,
        });
        let text = String::from_utf8(encode(&msg).unwrap()).unwrap();
        assert!(text.contains(r#""type":"login_success""#));
        assert!(text.contains(r#""tickRate":30"#));
    }

    #[test]
    fn test_state_is_rounded_for_the_wire() {
        let msg = StateMessage::from_snapshot(&snapshot(), DEFAULT_WIRE_DECIMALS);
        let value = serde_json::to_value(Message::State(msg)).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["players"]["ann"]["y"], 402.12);
        assert_eq!(value["players"]["ann"]["v"], 60.0);
        assert_eq!(value["players"]["ann"]["lastSeq"], 17);
        assert_eq!(value["pipes"][0]["x"], 291.67);
        assert_eq!(value["pipes"][0]["gapY"], 350.0);
        assert_eq!(value["leaderboard"][0], json!(["bob", 12]));
    }

    #[test]
    fn test_decode_state_into_snapshot() {
        let raw = json!({
            "type": "state",
            "tick": 4,
            "players": {"ann": {"y": 400.0, "v": 0.0, "alive": true, "score": 1, "lastSeq": 3}},
            "pipes": [{"x": 480.0, "gapY": 300.0}],
            "leaderboard": [["ann", 8]]
        });
        let Message::State(state) = decode(raw.to_string().as_bytes()).unwrap() else {
            panic!("expected state");
        };
        let snap = state.into_snapshot();
        assert_eq!(snap.tick, 4);
        assert_eq!(snap.actors["ann"].last_acked_seq, 3);
        assert_eq!(snap.obstacles, vec![Obstacle::new(480.0, 300.0)]);
        assert_eq!(snap.leaderboard, vec![LeaderboardEntry::new("ann", 8)]);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let raw = json!({
            "type": "state",
            "tick": 4,
            "players": {
                "ann": {"y": 400.0, "v": 0.0, "alive": true, "score": 1, "lastSeq": 3},
                "bad": {"y": "high"}
            },
            "pipes": [{"x": 480.0, "gapY": 300.0}, {"x": null}, 7],
        });
        let Message::State(state) = decode(raw.to_string().as_bytes()).unwrap() else {
            panic!("expected state");
        };
        assert_eq!(state.malformed_entries(), 3);
        let snap = state.into_snapshot();
        assert_eq!(snap.actors.len(), 1);
        assert_eq!(snap.obstacles.len(), 1);
        assert!(snap.leaderboard.is_empty());
    }

    #[test]
    fn test_malformed_leaderboard_rows_are_skipped() {
        let raw = json!({
            "type": "state",
            "tick": 9,
            "players": {},
            "pipes": [],
            "leaderboard": [["ann", 8], ["bob", -1], {"name": "cat"}, ["dan", 3, 4], ["eve", 2]]
        });
        let Message::State(state) = decode(raw.to_string().as_bytes()).unwrap() else {
            panic!("expected state");
        };
        assert_eq!(state.malformed_entries(), 3);
        let snap = state.into_snapshot();
        assert_eq!(snap.tick, 9);
        assert_eq!(
            snap.leaderboard,
            vec![LeaderboardEntry::new("ann", 8), LeaderboardEntry::new("eve", 2)]
        );
    }

    #[test]
    fn test_unknown_type_is_distinguished() {
        let result = decode(br#"{"type": "teleport", "username": "ann"}"#);
        assert!(matches!(result, Err(CodecError::UnknownType(t)) if t == "teleport"));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(decode(b"\xff\x00"), Err(CodecError::Malformed(_))));
        assert!(matches!(decode(b"[1, 2]"), Err(CodecError::MissingType)));
        assert!(matches!(
            decode(br#"{"type": "input", "username": "ann"}"#),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn test_kind_matches_tag() {
        let msg = Message::Disconnect(UserRef {
            username: "ann".into(),
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], msg.kind());
        assert!(Message::KNOWN_TYPES.contains(&msg.kind()));
    }
}
