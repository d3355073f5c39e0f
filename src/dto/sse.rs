use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::machine::GameEvent;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// Optional SSE event name; `None` sends a default `message` event.
    pub event: Option<String>,
    /// Serialized data field.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

/// Wire form of a game state transition, discriminated on `event`.
///
/// Payloads carry only what subscribers need to re-fetch the authoritative
/// state; they are never the source of truth themselves.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEventPayload {
    /// A player took a seat.
    PlayerJoined {
        /// Player who joined.
        player_id: Uuid,
    },
    /// A player gave up their seat.
    PlayerLeft {
        /// Player who left.
        player_id: Uuid,
    },
    /// Round 0 started.
    RoundStarted,
    /// Every seated player has answered.
    RoundComplete {
        /// Player whose submit completed the round.
        last_player_id: Uuid,
    },
    /// The game moved on to the next round.
    RoundAdvanced,
    /// The game reached its terminal state.
    GameFinished,
}

impl From<&GameEvent> for GameEventPayload {
    fn from(event: &GameEvent) -> Self {
        match event {
            GameEvent::PlayerJoined { player_id } => GameEventPayload::PlayerJoined {
                player_id: *player_id,
            },
            GameEvent::PlayerLeft { player_id } => GameEventPayload::PlayerLeft {
                player_id: *player_id,
            },
            GameEvent::RoundStarted => GameEventPayload::RoundStarted,
            GameEvent::RoundComplete { last_player_id } => GameEventPayload::RoundComplete {
                last_player_id: *last_player_id,
            },
            GameEvent::RoundAdvanced => GameEventPayload::RoundAdvanced,
            GameEvent::GameFinished => GameEventPayload::GameFinished,
        }
    }
}
