use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Hotseat Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::list_games,
        crate::routes::game::fetch_game,
        crate::routes::game::join_game,
        crate::routes::game::leave_game,
        crate::routes::game::start_round,
        crate::routes::game::submit_answer,
        crate::routes::game::withdraw_answer,
        crate::routes::game::advance_round,
        crate::routes::game::finish_game,
        crate::routes::sse::game_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::SubmitAnswerRequest,
            crate::dto::game::GameSummary,
            crate::dto::game::GameListItem,
            crate::dto::game::SeatSummary,
            crate::dto::game::QuestionSummary,
            crate::dto::game::GuessSummary,
            crate::dto::game::RoundResultSummary,
            crate::dto::phase::GamePhaseDto,
            crate::dto::sse::GameEventPayload,
            crate::dao::models::QuestionRules,
            crate::dao::models::OptionFlag,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game lifecycle and round actions"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
