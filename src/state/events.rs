use std::collections::HashMap;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Per-player delivery sink for one connection.
#[derive(Debug)]
struct Sink {
    /// Identifies the connection that registered the sink, so a stale
    /// handle can never tear down a newer connection of the same player.
    connection: Uuid,
    tx: mpsc::Sender<ServerEvent>,
}

/// Token returned by [`EventHub::subscribe`]; identifies exactly one
/// registered connection.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    game_id: Uuid,
    player_id: Uuid,
    connection: Uuid,
}

impl SubscriberHandle {
    /// Game the subscription belongs to.
    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Player the subscription belongs to.
    pub fn player_id(&self) -> Uuid {
        self.player_id
    }
}

/// Per-game fan-out registry for realtime game events.
///
/// Sinks are keyed by player id: a reconnect replaces the previous sink for
/// that player (latest connection wins) and the stale connection's receiver
/// simply runs dry. Delivery is fire-and-forget; nothing here blocks the
/// mutation path, and a subscriber that connects after an event missed it
/// permanently — events are re-sync hints, not the system of record.
#[derive(Debug)]
pub struct EventHub {
    channels: DashMap<Uuid, HashMap<Uuid, Sink>>,
    capacity: usize,
}

impl EventHub {
    /// Build a hub whose per-subscriber buffers hold `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Register a delivery sink for `(game, player)`, replacing any sink a
    /// previous connection of the same player registered.
    pub fn subscribe(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> (SubscriberHandle, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let connection = Uuid::new_v4();

        self.channels
            .entry(game_id)
            .or_default()
            .insert(player_id, Sink { connection, tx });

        (
            SubscriberHandle {
                game_id,
                player_id,
                connection,
            },
            rx,
        )
    }

    /// Remove the sink the handle registered. Idempotent, and a no-op when
    /// the player has since reconnected with a newer sink.
    pub fn unsubscribe(&self, handle: &SubscriberHandle) {
        if let Some(mut sinks) = self.channels.get_mut(&handle.game_id) {
            let registered_here = sinks
                .get(&handle.player_id)
                .is_some_and(|sink| sink.connection == handle.connection);
            if registered_here {
                sinks.remove(&handle.player_id);
            }
        }

        self.channels
            .remove_if(&handle.game_id, |_, sinks| sinks.is_empty());
    }

    /// Deliver an event to every currently registered sink of the game.
    ///
    /// One delivery attempt per sink: a full buffer drops the event for that
    /// subscriber with a warning, a closed sink is removed on the spot. A
    /// slow or dead subscriber never fails the publish for the others.
    pub fn publish(&self, game_id: Uuid, event: ServerEvent) {
        let mut stale: Vec<(Uuid, Uuid)> = Vec::new();

        {
            let Some(sinks) = self.channels.get(&game_id) else {
                debug!(%game_id, "publish without subscribers");
                return;
            };

            for (player_id, sink) in sinks.iter() {
                match sink.tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(%game_id, %player_id, "subscriber buffer full; dropping event");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        stale.push((*player_id, sink.connection));
                    }
                }
            }
        }

        if !stale.is_empty() {
            if let Some(mut sinks) = self.channels.get_mut(&game_id) {
                for (player_id, connection) in stale {
                    let unchanged = sinks
                        .get(&player_id)
                        .is_some_and(|sink| sink.connection == connection);
                    if unchanged {
                        debug!(%game_id, %player_id, "removing closed subscriber sink");
                        sinks.remove(&player_id);
                    }
                }
            }
            self.channels.remove_if(&game_id, |_, sinks| sinks.is_empty());
        }
    }

    /// Drop every sink of a game (the game was deleted).
    pub fn drop_game(&self, game_id: Uuid) {
        self.channels.remove(&game_id);
    }

    /// Number of live sinks registered for a game.
    pub fn subscriber_count(&self, game_id: Uuid) -> usize {
        self.channels
            .get(&game_id)
            .map(|sinks| sinks.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(data: &str) -> ServerEvent {
        ServerEvent {
            event: None,
            data: data.to_string(),
        }
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let hub = EventHub::new(4);
        let game = Uuid::new_v4();
        let (_handle_a, mut rx_a) = hub.subscribe(game, Uuid::new_v4());
        let (_handle_b, mut rx_b) = hub.subscribe(game, Uuid::new_v4());

        hub.publish(game, event("ping"));

        assert_eq!(rx_a.recv().await.unwrap().data, "ping");
        assert_eq!(rx_b.recv().await.unwrap().data, "ping");
    }

    #[tokio::test]
    async fn reconnect_replaces_the_previous_sink() {
        let hub = EventHub::new(4);
        let game = Uuid::new_v4();
        let player = Uuid::new_v4();

        let (stale_handle, mut stale_rx) = hub.subscribe(game, player);
        let (_fresh_handle, mut fresh_rx) = hub.subscribe(game, player);
        assert_eq!(hub.subscriber_count(game), 1);

        // The stale connection's receiver runs dry instead of seeing events.
        assert!(stale_rx.recv().await.is_none());

        hub.publish(game, event("ping"));
        assert_eq!(fresh_rx.recv().await.unwrap().data, "ping");

        // The stale handle must not tear down the fresh sink.
        hub.unsubscribe(&stale_handle);
        assert_eq!(hub.subscriber_count(game), 1);
        hub.publish(game, event("pong"));
        assert_eq!(fresh_rx.recv().await.unwrap().data, "pong");
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let hub = EventHub::new(4);
        let game = Uuid::new_v4();
        let (handle, _rx) = hub.subscribe(game, Uuid::new_v4());

        hub.unsubscribe(&handle);
        assert_eq!(hub.subscriber_count(game), 0);
        // Second call finds nothing and stays silent.
        hub.unsubscribe(&handle);
        assert_eq!(hub.subscriber_count(game), 0);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let hub = EventHub::new(4);
        hub.publish(Uuid::new_v4(), event("ping"));
    }

    #[tokio::test]
    async fn closed_sinks_are_pruned_on_publish() {
        let hub = EventHub::new(4);
        let game = Uuid::new_v4();
        let (_handle, rx) = hub.subscribe(game, Uuid::new_v4());
        drop(rx);

        hub.publish(game, event("ping"));
        assert_eq!(hub.subscriber_count(game), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_drops_events_not_the_publish() {
        let hub = EventHub::new(1);
        let game = Uuid::new_v4();
        let (_slow_handle, mut slow_rx) = hub.subscribe(game, Uuid::new_v4());
        let (_fast_handle, mut fast_rx) = hub.subscribe(game, Uuid::new_v4());

        hub.publish(game, event("first"));
        // The slow subscriber's buffer is now full; the second publish must
        // still reach the healthy one.
        hub.publish(game, event("second"));

        assert_eq!(fast_rx.recv().await.unwrap().data, "first");
        assert_eq!(fast_rx.recv().await.unwrap().data, "second");
        assert_eq!(slow_rx.recv().await.unwrap().data, "first");
        assert!(slow_rx.try_recv().is_err());
        assert_eq!(hub.subscriber_count(game), 2);
    }
}
