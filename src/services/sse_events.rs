use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::sse::{GameEventPayload, ServerEvent},
    state::{SharedState, machine::GameEvent},
};

/// Publish the events of a committed transition to the game's subscribers.
///
/// Called only after the mutations are persisted: a rejected or lost write
/// must never leak a notification. Serialization failures are logged and the
/// event skipped; delivery failures are the registry's business.
pub fn publish_game_events(state: &SharedState, game_id: Uuid, events: &[GameEvent]) {
    for event in events {
        let payload = GameEventPayload::from(event);
        match ServerEvent::json(None::<String>, &payload) {
            Ok(server_event) => state.events().publish(game_id, server_event),
            Err(err) => {
                warn!(%game_id, error = %err, "failed to serialize game event payload");
            }
        }
    }
}
