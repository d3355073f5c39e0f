use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::TransitionOutcome,
        models::{GameEntity, QuestionId},
    },
    dto::game::{GameListItem, GameSummary, QuestionSummary},
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        game::GameSnapshot,
        machine::{self, GameAction, ScoringParams, Transition},
    },
};

/// Create a game hosted by the given player.
///
/// Idempotent per host: if the player already hosts a not-yet-finished game,
/// that game is returned instead of creating a second one. The host-keyed
/// gate closes the window where two concurrent creates could both observe
/// "no open game".
pub async fn create_game(state: &SharedState, host_id: Uuid) -> Result<GameSummary, ServiceError> {
    let store = state.require_game_store().await?;
    let gate = state.gate(host_id);
    let _guard = gate.lock().await;

    if let Some(existing) = store.find_open_game_for_host(host_id).await? {
        let snapshot = GameSnapshot::from(existing);
        return Ok(viewer_summary(state, &snapshot, host_id));
    }

    let entity = GameEntity::new(host_id, state.config().default_hotness());
    store.insert_game(entity.clone()).await?;
    info!(game_id = %entity.id, %host_id, "game created");

    let snapshot = GameSnapshot::from(entity);
    Ok(viewer_summary(state, &snapshot, host_id))
}

/// List the caller's games, newest first.
pub async fn list_games(
    state: &SharedState,
    player_id: Uuid,
) -> Result<Vec<GameListItem>, ServiceError> {
    let store = state.require_game_store().await?;
    let games = store.list_games_for_player(player_id).await?;
    Ok(games
        .into_iter()
        .map(|game| GameListItem::from(&GameSnapshot::from(game)))
        .collect())
}

/// Fetch the authoritative game state as seen by the given viewer.
pub async fn fetch_game(
    state: &SharedState,
    game_id: Uuid,
    viewer: Uuid,
) -> Result<GameSummary, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(entity) = store.find_game(game_id).await? else {
        return Err(not_found(game_id));
    };
    let snapshot = GameSnapshot::from(entity);
    Ok(viewer_summary(state, &snapshot, viewer))
}

/// Seat the player in the game.
pub async fn join_game(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<GameSummary, ServiceError> {
    run_action(state, game_id, |_| Ok(GameAction::Join { player_id })).await?;
    fetch_game(state, game_id, player_id).await
}

/// Remove the player from the game, with phase-dependent consequences: a
/// lobby frees the seat (or deletes an abandoned game), a started game ends.
pub async fn leave_game(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<(), ServiceError> {
    run_action(state, game_id, |_| Ok(GameAction::Leave { player_id })).await?;
    Ok(())
}

/// Start round 0 with a freshly picked question.
pub async fn start_round(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<GameSummary, ServiceError> {
    run_action(state, game_id, |_| {
        Ok(GameAction::Start {
            player_id,
            question_id: pick_question(state)?,
        })
    })
    .await?;
    fetch_game(state, game_id, player_id).await
}

/// Submit (or replace) the player's answer for the current round.
pub async fn submit_answer(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
    value: f64,
) -> Result<GameSummary, ServiceError> {
    // Malformed values are rejected before they ever reach the state
    // machine; HTTP callers are filtered earlier by DTO validation, this
    // covers every other caller.
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ServiceError::InvalidInput(
            "answer value must be a finite number within [0, 1]".into(),
        ));
    }

    run_action(state, game_id, |_| Ok(GameAction::Submit { player_id, value })).await?;
    fetch_game(state, game_id, player_id).await
}

/// Withdraw the player's answer for the current round.
pub async fn withdraw_answer(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<GameSummary, ServiceError> {
    run_action(state, game_id, |_| Ok(GameAction::Unsubmit { player_id })).await?;
    fetch_game(state, game_id, player_id).await
}

/// Advance to the next round with a freshly picked question.
pub async fn advance_round(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<GameSummary, ServiceError> {
    run_action(state, game_id, |_| {
        Ok(GameAction::Advance {
            player_id,
            question_id: pick_question(state)?,
        })
    })
    .await?;
    fetch_game(state, game_id, player_id).await
}

/// End a started game explicitly; reserved for the host.
pub async fn finish_game(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<GameSummary, ServiceError> {
    run_action(state, game_id, |_| Ok(GameAction::Finish { player_id })).await?;
    fetch_game(state, game_id, player_id).await
}

/// Run one action through the read-decide-write cycle.
///
/// The per-game gate serializes the whole cycle, so two concurrent submits
/// can never both observe "not yet complete" and both emit the completion
/// event. The versioned write underneath is belt and braces: should the
/// aggregate still change between read and write, the cycle re-reads once
/// and re-decides against the fresh state. Events are published only after
/// the write committed.
async fn run_action<F>(
    state: &SharedState,
    game_id: Uuid,
    build_action: F,
) -> Result<Transition, ServiceError>
where
    F: Fn(&GameSnapshot) -> Result<GameAction, ServiceError>,
{
    let store = state.require_game_store().await?;
    let gate = state.gate(game_id);
    let _guard = gate.lock().await;

    let scoring = ScoringParams {
        exponent: state.config().similarity_exponent(),
    };

    let mut retried = false;
    loop {
        let Some(entity) = store.find_game(game_id).await? else {
            return Err(not_found(game_id));
        };
        let snapshot = GameSnapshot::from(entity);
        let action = build_action(&snapshot)?;
        let transition = machine::decide(&snapshot, action, &scoring)?;

        match store
            .apply_transition(game_id, snapshot.version, transition.mutations.clone())
            .await?
        {
            TransitionOutcome::Applied => {
                if transition.deletes_game() {
                    state.events().drop_game(game_id);
                    state.drop_gate(game_id);
                }
                sse_events::publish_game_events(state, game_id, &transition.events);
                return Ok(transition);
            }
            TransitionOutcome::Conflict if !retried => {
                retried = true;
                warn!(%game_id, "transition write lost a race; retrying once");
            }
            TransitionOutcome::Conflict => {
                return Err(ServiceError::InvalidState(
                    "game changed concurrently; please retry".into(),
                ));
            }
            TransitionOutcome::Missing => return Err(not_found(game_id)),
        }
    }
}

fn pick_question(state: &SharedState) -> Result<QuestionId, ServiceError> {
    state
        .question_bank()
        .pick_question()
        .map(|question| question.id)
        .ok_or_else(|| ServiceError::InvalidState("question pool is empty".into()))
}

fn viewer_summary(state: &SharedState, snapshot: &GameSnapshot, viewer: Uuid) -> GameSummary {
    let question = snapshot
        .active_question_id
        .and_then(|id| state.question_bank().question(id))
        .map(QuestionSummary::from);
    GameSummary::for_viewer(
        snapshot,
        viewer,
        question,
        state.config().similarity_exponent(),
    )
}

fn not_found(game_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("game `{game_id}` not found"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::AppConfig;
    use crate::dao::game_store::memory::MemoryStore;
    use crate::dao::models::{QuestionEntity, QuestionRules};
    use crate::dao::question_bank::FileQuestionBank;
    use crate::dto::phase::GamePhaseDto;
    use crate::state::AppState;
    use crate::state::machine::GuardViolation;

    use super::*;

    fn question(id: QuestionId) -> QuestionEntity {
        QuestionEntity {
            id,
            prompt: format!("question {id}"),
            answer_a: "A".into(),
            answer_b: "B".into(),
            hotness: None,
            knowledge: None,
            rules: QuestionRules::default(),
            follow_up_question_id: None,
            follow_up_condition: None,
        }
    }

    async fn test_state() -> SharedState {
        let bank = FileQuestionBank::from_questions([question(1), question(2)]);
        let state = AppState::new(AppConfig::default(), Arc::new(bank));
        state
            .install_game_store(Arc::new(MemoryStore::new()))
            .await;
        state
    }

    #[tokio::test]
    async fn create_game_is_idempotent_per_host() {
        let state = test_state().await;
        let host = Uuid::new_v4();

        let first = create_game(&state, host).await.unwrap();
        let second = create_game(&state, host).await.unwrap();
        assert_eq!(first.id, second.id);

        // A different host gets their own game.
        let other = create_game(&state, Uuid::new_v4()).await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn full_round_awards_similarity_points() {
        let state = test_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let game = create_game(&state, host).await.unwrap();
        join_game(&state, game.id, guest).await.unwrap();

        let started = start_round(&state, game.id, host).await.unwrap();
        assert_eq!(started.phase, GamePhaseDto::RoundActive);
        assert_eq!(started.turn, Some(0));
        // Turn 0 of two seats: the host is the monarch.
        assert_eq!(started.monarch_id, Some(host));
        assert!(started.active_question.is_some());

        let mid = submit_answer(&state, game.id, host, 0.5).await.unwrap();
        assert_eq!(mid.phase, GamePhaseDto::RoundActive);
        assert!(mid.round_result.is_none());
        assert_eq!(mid.your_answer, Some(0.5));

        let done = submit_answer(&state, game.id, guest, 0.3).await.unwrap();
        assert_eq!(done.phase, GamePhaseDto::RoundComplete);

        let result = done.round_result.unwrap();
        let expected = 0.8f64.powf(1.5);
        assert_eq!(result.monarch_id, host);
        assert_eq!(result.monarch_value, 0.5);
        assert!((result.overall - expected).abs() < 1e-9);
        assert_eq!(result.guesses.len(), 1);

        for seat in done.players {
            assert!((seat.points - expected).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn answers_stay_hidden_from_others_until_completion() {
        let state = test_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let game = create_game(&state, host).await.unwrap();
        join_game(&state, game.id, guest).await.unwrap();
        start_round(&state, game.id, host).await.unwrap();
        submit_answer(&state, game.id, host, 0.5).await.unwrap();

        let seen_by_guest = fetch_game(&state, game.id, guest).await.unwrap();
        assert_eq!(seen_by_guest.your_answer, None);
        assert!(seen_by_guest.round_result.is_none());
        let host_seat = seen_by_guest
            .players
            .iter()
            .find(|seat| seat.player_id == host)
            .unwrap();
        assert!(host_seat.has_answered);
    }

    #[tokio::test]
    async fn leaving_a_started_game_finishes_it_and_freezes_actions() {
        let state = test_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let game = create_game(&state, host).await.unwrap();
        join_game(&state, game.id, guest).await.unwrap();
        start_round(&state, game.id, host).await.unwrap();

        leave_game(&state, game.id, guest).await.unwrap();
        let after = fetch_game(&state, game.id, host).await.unwrap();
        assert!(after.finished);
        assert_eq!(after.phase, GamePhaseDto::Finished);

        let err = submit_answer(&state, game.id, host, 0.5).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(GuardViolation::GameFinished)
        ));
    }

    #[tokio::test]
    async fn abandoning_the_lobby_deletes_the_game() {
        let state = test_state().await;
        let host = Uuid::new_v4();

        let game = create_game(&state, host).await.unwrap();
        leave_game(&state, game.id, host).await.unwrap();

        let err = fetch_game(&state, game.id, host).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn mid_round_join_raises_the_completion_bar() {
        let state = test_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let latecomer = Uuid::new_v4();

        let game = create_game(&state, host).await.unwrap();
        join_game(&state, game.id, guest).await.unwrap();
        start_round(&state, game.id, host).await.unwrap();
        submit_answer(&state, game.id, host, 0.5).await.unwrap();

        join_game(&state, game.id, latecomer).await.unwrap();

        let mid = submit_answer(&state, game.id, guest, 0.4).await.unwrap();
        assert_eq!(mid.phase, GamePhaseDto::RoundActive);

        let done = submit_answer(&state, game.id, latecomer, 0.6)
            .await
            .unwrap();
        assert_eq!(done.phase, GamePhaseDto::RoundComplete);
    }

    #[tokio::test]
    async fn advancing_rotates_the_monarch_and_resets_answers() {
        let state = test_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let game = create_game(&state, host).await.unwrap();
        join_game(&state, game.id, guest).await.unwrap();
        start_round(&state, game.id, host).await.unwrap();
        submit_answer(&state, game.id, host, 0.5).await.unwrap();
        submit_answer(&state, game.id, guest, 0.3).await.unwrap();

        let next = advance_round(&state, game.id, host).await.unwrap();
        assert_eq!(next.turn, Some(1));
        assert_eq!(next.phase, GamePhaseDto::RoundActive);
        assert_eq!(next.monarch_id, Some(guest));
        assert!(next.round_result.is_none());
        assert!(next.players.iter().all(|seat| !seat.has_answered));

        let err = advance_round(&state, game.id, host).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(GuardViolation::RoundNotComplete)
        ));
    }

    #[tokio::test]
    async fn withdrawing_reopens_nothing_after_completion() {
        let state = test_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let game = create_game(&state, host).await.unwrap();
        join_game(&state, game.id, guest).await.unwrap();
        start_round(&state, game.id, host).await.unwrap();
        submit_answer(&state, game.id, host, 0.5).await.unwrap();

        // Withdrawing before completion is fine.
        let reopened = withdraw_answer(&state, game.id, host).await.unwrap();
        assert!(
            reopened
                .players
                .iter()
                .all(|seat| !seat.has_answered)
        );

        submit_answer(&state, game.id, host, 0.5).await.unwrap();
        submit_answer(&state, game.id, guest, 0.3).await.unwrap();

        let err = withdraw_answer(&state, game.id, guest).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(GuardViolation::RoundAlreadyComplete)
        ));
    }

    #[tokio::test]
    async fn malformed_values_never_reach_the_state_machine() {
        let state = test_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let game = create_game(&state, host).await.unwrap();
        join_game(&state, game.id, guest).await.unwrap();
        start_round(&state, game.id, host).await.unwrap();

        for bad in [f64::NAN, f64::INFINITY, -0.5, 1.5] {
            let err = submit_answer(&state, game.id, host, bad).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn finish_is_reserved_for_the_host() {
        let state = test_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let game = create_game(&state, host).await.unwrap();
        join_game(&state, game.id, guest).await.unwrap();
        start_round(&state, game.id, host).await.unwrap();

        let err = finish_game(&state, game.id, guest).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(GuardViolation::NotHost)
        ));

        let done = finish_game(&state, game.id, host).await.unwrap();
        assert!(done.finished);
    }

    #[tokio::test]
    async fn racing_final_submits_publish_exactly_one_completion_event() {
        let state = test_state().await;
        let host = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let game = create_game(&state, host).await.unwrap();
        join_game(&state, game.id, first).await.unwrap();
        join_game(&state, game.id, second).await.unwrap();
        start_round(&state, game.id, host).await.unwrap();
        submit_answer(&state, game.id, host, 0.5).await.unwrap();

        // Listen as the host while the two remaining answers race in.
        let (_handle, mut receiver) = state.events().subscribe(game.id, host);

        let state_a = state.clone();
        let state_b = state.clone();
        let game_id = game.id;
        let task_a =
            tokio::spawn(async move { submit_answer(&state_a, game_id, first, 0.2).await });
        let task_b =
            tokio::spawn(async move { submit_answer(&state_b, game_id, second, 0.9).await });
        task_a.await.unwrap().unwrap();
        task_b.await.unwrap().unwrap();

        let mut completions = 0;
        while let Ok(event) = receiver.try_recv() {
            if event.data.contains("roundComplete") {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);

        let done = fetch_game(&state, game.id, host).await.unwrap();
        assert_eq!(done.phase, GamePhaseDto::RoundComplete);
    }
}
