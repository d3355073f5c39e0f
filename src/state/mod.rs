pub mod events;
pub mod game;
pub mod machine;
pub mod similarity;
pub mod turns;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dao::{game_store::GameStore, question_bank::QuestionBank};
use crate::error::ServiceError;

pub use self::events::{EventHub, SubscriberHandle};

/// Cheaply clonable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state owning the broadcast registry, the storage
/// handle, and the per-game serialization gates.
pub struct AppState {
    config: AppConfig,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    question_bank: Arc<dyn QuestionBank>,
    events: EventHub,
    gates: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, question_bank: Arc<dyn QuestionBank>) -> SharedState {
        let events = EventHub::new(config.subscriber_capacity());
        Arc::new(Self {
            config,
            game_store: RwLock::new(None),
            question_bank,
            events,
            gates: DashMap::new(),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the game store or fail with the degraded-mode error.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        let mut guard = self.game_store.write().await;
        *guard = Some(store);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        let mut guard = self.game_store.write().await;
        guard.take();
    }

    /// Whether the backend currently runs without a storage backend.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.game_store.read().await;
        guard.is_none()
    }

    /// Question pool consulted when rounds start or advance.
    pub fn question_bank(&self) -> &Arc<dyn QuestionBank> {
        &self.question_bank
    }

    /// Broadcast registry fanning game events out to subscribed connections.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Mutual-exclusion gate serializing read-decide-write cycles for one
    /// game (or, during creation, for one host). Guards taken from the
    /// returned mutex outlive removal of the map entry.
    pub fn gate(&self, key: Uuid) -> Arc<Mutex<()>> {
        self.gates
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the gate of a game that no longer exists.
    pub fn drop_gate(&self, key: Uuid) {
        self.gates.remove(&key);
    }
}
