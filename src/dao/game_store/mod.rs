pub mod memory;

use crate::dao::models::{GameEntity, GameMutation};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Result of a versioned transition write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// All mutations were applied and the game version advanced.
    Applied,
    /// The expected version no longer matches; the caller lost a race and
    /// must re-read before retrying.
    Conflict,
    /// The game no longer exists.
    Missing,
}

/// Abstraction over the persistence layer for game aggregates.
///
/// `apply_transition` is the single write path for existing games: it applies
/// a batch of mutations atomically if and only if the game's version still
/// matches `expected_version`, so a read-decide-write cycle never clobbers a
/// concurrent update it did not observe.
pub trait GameStore: Send + Sync {
    /// Persist a freshly created game aggregate.
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch one game aggregate by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Fetch the not-yet-finished game hosted by the given player, if any.
    fn find_open_game_for_host(
        &self,
        host_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// List every game the player holds a seat in, newest first.
    fn list_games_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Apply a mutation batch against the expected version.
    fn apply_transition(
        &self,
        id: Uuid,
        expected_version: u64,
        mutations: Vec<GameMutation>,
    ) -> BoxFuture<'static, StorageResult<TransitionOutcome>>;
    /// Cheap connectivity probe used by the health endpoint.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
