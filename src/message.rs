use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transport::PeerId;

/// Per-player metadata carried in lobby snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub name: String,
    pub is_host: bool,
}

impl PlayerInfo {
    pub fn new(name: impl Into<String>, is_host: bool) -> Self {
        Self {
            name: name.into(),
            is_host,
        }
    }
}

/// Control messages interpreted by the coordinator itself. Everything else
/// on the wire is opaque gameplay traffic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    #[serde(rename_all = "camelCase")]
    PlayerInfo {
        player_id: PeerId,
        player_name: String,
        is_host: bool,
    },
    LobbyState {
        players: Vec<(PeerId, PlayerInfo)>,
    },
    GameStart {
        players: Vec<(PeerId, PlayerInfo)>,
    },
}

impl ControlMessage {
    pub fn into_value(self) -> Value {
        // Control variants only contain plain strings and bools, so
        // serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Classification verdict for one inbound payload.
#[derive(Debug)]
pub enum Routed {
    /// A recognized control message, decoded and ready to act on.
    Control(ControlMessage),
    /// A payload with an unrecognized `type`: forwarded verbatim to the
    /// consuming layer.
    Gameplay(Value),
}

const CONTROL_TYPES: &[&str] = &["PLAYER_INFO", "LOBBY_STATE", "GAME_START"];

/// Splits an inbound payload into control vs. gameplay traffic.
///
/// Returns `None` for payloads that must be dropped: no string `type`
/// discriminator, or a control `type` whose body fails to decode. Callers
/// log the drop; a misbehaving peer never crashes the session.
pub fn classify(payload: Value) -> Option<Routed> {
    let tag = payload.get("type")?.as_str()?;

    if CONTROL_TYPES.contains(&tag) {
        let control = serde_json::from_value(payload).ok()?;
        return Some(Routed::Control(control));
    }

    Some(Routed::Gameplay(payload))
}
