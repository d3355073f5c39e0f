use std::sync::RwLock;
use std::time::SystemTime;

use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::dao::game_store::{GameStore, TransitionOutcome};
use crate::dao::models::{AnswerEntity, GameEntity, GameMutation, SeatEntity};
use crate::dao::storage::StorageResult;

/// In-process [`GameStore`] backend.
///
/// Games are held in an insertion-ordered map so listing by recency needs no
/// separate index. Every write takes the map lock, which makes a mutation
/// batch atomic with respect to concurrent readers and writers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: RwLock<IndexMap<Uuid, GameEntity>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_mutation(game: &mut GameEntity, mutation: GameMutation) {
        match mutation {
            GameMutation::AddSeat { player_id, index } => {
                game.seats.push(SeatEntity {
                    player_id,
                    index,
                    points: 0.0,
                });
            }
            GameMutation::RemoveSeat { player_id } => {
                game.seats.retain(|seat| seat.player_id != player_id);
            }
            GameMutation::SetRound { turn, question_id } => {
                game.turn = Some(turn);
                game.active_question_id = Some(question_id);
            }
            GameMutation::UpsertAnswer {
                player_id,
                turn,
                value,
            } => {
                let now = SystemTime::now();
                match game
                    .answers
                    .iter_mut()
                    .find(|answer| answer.player_id == player_id && answer.turn == turn)
                {
                    Some(existing) => {
                        existing.value = value;
                        existing.submitted_at = now;
                    }
                    None => game.answers.push(AnswerEntity {
                        player_id,
                        turn,
                        value,
                        submitted_at: now,
                    }),
                }
            }
            GameMutation::RemoveAnswer { player_id, turn } => {
                game.answers
                    .retain(|answer| !(answer.player_id == player_id && answer.turn == turn));
            }
            GameMutation::AwardPoints { player_id, points } => {
                if let Some(seat) = game
                    .seats
                    .iter_mut()
                    .find(|seat| seat.player_id == player_id)
                {
                    seat.points += points;
                }
            }
            GameMutation::MarkFinished => {
                game.finished = true;
            }
            // Handled by the caller at the map level.
            GameMutation::DeleteGame => {}
        }
    }
}

impl GameStore for MemoryStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let mut games = self.games.write().expect("games lock poisoned");
        games.insert(game.id, game);
        futures::future::ready(Ok(())).boxed()
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let games = self.games.read().expect("games lock poisoned");
        futures::future::ready(Ok(games.get(&id).cloned())).boxed()
    }

    fn find_open_game_for_host(
        &self,
        host_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let games = self.games.read().expect("games lock poisoned");
        let found = games
            .values()
            .find(|game| game.host_id == host_id && !game.finished)
            .cloned();
        futures::future::ready(Ok(found)).boxed()
    }

    fn list_games_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let games = self.games.read().expect("games lock poisoned");
        // Insertion order is creation order, so newest-first is a reverse scan.
        let listed: Vec<GameEntity> = games
            .values()
            .rev()
            .filter(|game| game.seats.iter().any(|seat| seat.player_id == player_id))
            .cloned()
            .collect();
        futures::future::ready(Ok(listed)).boxed()
    }

    fn apply_transition(
        &self,
        id: Uuid,
        expected_version: u64,
        mutations: Vec<GameMutation>,
    ) -> BoxFuture<'static, StorageResult<TransitionOutcome>> {
        let mut games = self.games.write().expect("games lock poisoned");

        let outcome = match games.get_mut(&id) {
            None => TransitionOutcome::Missing,
            Some(game) if game.version != expected_version => TransitionOutcome::Conflict,
            Some(game) => {
                let delete = mutations
                    .iter()
                    .any(|mutation| matches!(mutation, GameMutation::DeleteGame));
                for mutation in mutations {
                    Self::apply_mutation(game, mutation);
                }
                game.version += 1;
                if delete {
                    games.shift_remove(&id);
                }
                TransitionOutcome::Applied
            }
        };

        futures::future::ready(Ok(outcome)).boxed()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        futures::future::ready(Ok(())).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Uuid {
        Uuid::new_v4()
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let store = MemoryStore::new();
        let game = GameEntity::new(host(), 2.0);
        let id = game.id;

        store.insert_game(game.clone()).await.unwrap();
        let found = store.find_game(id).await.unwrap().unwrap();
        assert_eq!(found, game);
    }

    #[tokio::test]
    async fn apply_transition_checks_version() {
        let store = MemoryStore::new();
        let game = GameEntity::new(host(), 2.0);
        let id = game.id;
        store.insert_game(game).await.unwrap();

        let outcome = store
            .apply_transition(
                id,
                0,
                vec![GameMutation::SetRound {
                    turn: 0,
                    question_id: 7,
                }],
            )
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);

        // Re-using the stale version must be rejected.
        let outcome = store
            .apply_transition(id, 0, vec![GameMutation::MarkFinished])
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Conflict);

        let game = store.find_game(id).await.unwrap().unwrap();
        assert_eq!(game.version, 1);
        assert_eq!(game.turn, Some(0));
        assert!(!game.finished);
    }

    #[tokio::test]
    async fn delete_game_removes_the_aggregate() {
        let store = MemoryStore::new();
        let game = GameEntity::new(host(), 2.0);
        let id = game.id;
        store.insert_game(game).await.unwrap();

        let outcome = store
            .apply_transition(id, 0, vec![GameMutation::DeleteGame])
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);
        assert!(store.find_game(id).await.unwrap().is_none());

        let outcome = store
            .apply_transition(id, 1, vec![GameMutation::MarkFinished])
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Missing);
    }

    #[tokio::test]
    async fn upsert_answer_replaces_in_place() {
        let store = MemoryStore::new();
        let game = GameEntity::new(host(), 2.0);
        let id = game.id;
        let player = game.host_id;
        store.insert_game(game).await.unwrap();

        for value in [0.2, 0.9] {
            store
                .apply_transition(
                    id,
                    store.find_game(id).await.unwrap().unwrap().version,
                    vec![GameMutation::UpsertAnswer {
                        player_id: player,
                        turn: 0,
                        value,
                    }],
                )
                .await
                .unwrap();
        }

        let game = store.find_game(id).await.unwrap().unwrap();
        assert_eq!(game.answers.len(), 1);
        assert_eq!(game.answers[0].value, 0.9);
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_membership_scoped() {
        let store = MemoryStore::new();
        let player = host();
        let first = GameEntity::new(player, 2.0);
        let second = GameEntity::new(player, 2.0);
        let unrelated = GameEntity::new(host(), 2.0);
        let (first_id, second_id) = (first.id, second.id);

        store.insert_game(first).await.unwrap();
        store.insert_game(unrelated).await.unwrap();
        store.insert_game(second).await.unwrap();

        let listed = store.list_games_for_player(player).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|game| game.id).collect();
        assert_eq!(ids, vec![second_id, first_id]);
    }
}
