use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{GameListItem, GameSummary, SubmitAnswerRequest},
    error::AppError,
    routes::auth::PlayerIdentity,
    services::game_service,
    state::SharedState,
};

/// Routes handling the game lifecycle and round actions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game).get(list_games))
        .route("/games/{id}", get(fetch_game))
        .route("/games/{id}/join", post(join_game))
        .route("/games/{id}/leave", post(leave_game))
        .route("/games/{id}/start", post(start_round))
        .route(
            "/games/{id}/answer",
            put(submit_answer).delete(withdraw_answer),
        )
        .route("/games/{id}/advance", post(advance_round))
        .route("/games/{id}/finish", post(finish_game))
}

/// Create a game hosted by the caller, or return the one they already host.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    responses(
        (status = 200, description = "Game created or already hosted", body = GameSummary),
        (status = 401, description = "Missing or malformed player identity")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    PlayerIdentity(player_id): PlayerIdentity,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::create_game(&state, player_id).await?;
    Ok(Json(summary))
}

/// List the caller's games, newest first.
#[utoipa::path(
    get,
    path = "/games",
    tag = "game",
    responses((status = 200, description = "Games the caller is seated in", body = [GameListItem]))
)]
pub async fn list_games(
    State(state): State<SharedState>,
    PlayerIdentity(player_id): PlayerIdentity,
) -> Result<Json<Vec<GameListItem>>, AppError> {
    let games = game_service::list_games(&state, player_id).await?;
    Ok(Json(games))
}

/// Fetch the authoritative state of one game as seen by the caller.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Current game state", body = GameSummary),
        (status = 404, description = "Game not found")
    )
)]
pub async fn fetch_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    PlayerIdentity(player_id): PlayerIdentity,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::fetch_game(&state, id, player_id).await?;
    Ok(Json(summary))
}

/// Take a seat in the game.
#[utoipa::path(
    post,
    path = "/games/{id}/join",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Joined", body = GameSummary),
        (status = 409, description = "Joining is not possible in the current state")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    PlayerIdentity(player_id): PlayerIdentity,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::join_game(&state, id, player_id).await?;
    Ok(Json(summary))
}

/// Give up the seat; ends the game when it has already started.
#[utoipa::path(
    post,
    path = "/games/{id}/leave",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 204, description = "Left the game"),
        (status = 409, description = "Leaving is not possible in the current state")
    )
)]
pub async fn leave_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    PlayerIdentity(player_id): PlayerIdentity,
) -> Result<StatusCode, AppError> {
    game_service::leave_game(&state, id, player_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start round 0.
#[utoipa::path(
    post,
    path = "/games/{id}/start",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Round 0 started", body = GameSummary),
        (status = 409, description = "Game already started or not enough players")
    )
)]
pub async fn start_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    PlayerIdentity(player_id): PlayerIdentity,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::start_round(&state, id, player_id).await?;
    Ok(Json(summary))
}

/// Submit (or replace) the caller's answer for the current round.
#[utoipa::path(
    put,
    path = "/games/{id}/answer",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = GameSummary),
        (status = 400, description = "Answer value malformed"),
        (status = 409, description = "No round is accepting answers")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    PlayerIdentity(player_id): PlayerIdentity,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::submit_answer(&state, id, player_id, payload.value).await?;
    Ok(Json(summary))
}

/// Withdraw the caller's answer for the current round.
#[utoipa::path(
    delete,
    path = "/games/{id}/answer",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Answer withdrawn", body = GameSummary),
        (status = 409, description = "The round has already completed")
    )
)]
pub async fn withdraw_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    PlayerIdentity(player_id): PlayerIdentity,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::withdraw_answer(&state, id, player_id).await?;
    Ok(Json(summary))
}

/// Move on to the next round.
#[utoipa::path(
    post,
    path = "/games/{id}/advance",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Next round started", body = GameSummary),
        (status = 409, description = "The round is not complete")
    )
)]
pub async fn advance_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    PlayerIdentity(player_id): PlayerIdentity,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::advance_round(&state, id, player_id).await?;
    Ok(Json(summary))
}

/// End the game; reserved for the host.
#[utoipa::path(
    post,
    path = "/games/{id}/finish",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game finished", body = GameSummary),
        (status = 409, description = "Caller is not the host or the game has not started")
    )
)]
pub async fn finish_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    PlayerIdentity(player_id): PlayerIdentity,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::finish_game(&state, id, player_id).await?;
    Ok(Json(summary))
}
