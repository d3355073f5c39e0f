use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    state::{SharedState, SubscriberHandle, game::GameSnapshot},
};

/// Subscribe the player to a game's event stream and wrap it into an SSE
/// response.
///
/// Only seated players may subscribe. Reconnecting replaces the player's
/// previous sink in the registry, so the stale connection's stream runs dry
/// and tears itself down.
pub async fn open_game_stream(
    state: SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(entity) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };
    let snapshot = GameSnapshot::from(entity);
    if !snapshot.is_member(player_id) {
        return Err(ServiceError::Unauthorized(
            "only seated players may subscribe to a game stream".into(),
        ));
    }

    let (handle, receiver) = state.events().subscribe(game_id, player_id);
    info!(%game_id, %player_id, "new game SSE connection");
    Ok(to_sse_stream(state, handle, receiver))
}

/// Convert a registry subscription into an SSE response, forwarding events
/// and deterministically unsubscribing once the client disconnects.
fn to_sse_stream(
    state: SharedState,
    handle: SubscriberHandle,
    mut receiver: mpsc::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from the registry sink and pushes into the
    // response channel until either side goes away
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                received = receiver.recv() => {
                    match received {
                        Some(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        // Sink replaced by a reconnect, or the game is gone.
                        None => break,
                    }
                }
            }
        }

        // Own the state inside the task so the registry entry is removed
        // even if the request context has long been dropped. A stale handle
        // after a reconnect is a no-op here.
        state.events().unsubscribe(&handle);
        info!(
            game_id = %handle.game_id(),
            player_id = %handle.player_id(),
            "game SSE stream disconnected"
        );
    });

    // response stream reads from mpsc; when the client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
