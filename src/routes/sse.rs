use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use uuid::Uuid;

use crate::{
    error::AppError, routes::auth::PlayerIdentity, services::sse_service, state::SharedState,
};

#[utoipa::path(
    get,
    path = "/games/{id}/events",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game event stream", content_type = "text/event-stream", body = String),
        (status = 401, description = "Caller holds no seat in the game")
    )
)]
/// Stream realtime game events to a seated player.
pub async fn game_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    PlayerIdentity(player_id): PlayerIdentity,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let stream = sse_service::open_game_stream(state, id, player_id).await?;
    Ok(stream)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/games/{id}/events", get(game_stream))
}
