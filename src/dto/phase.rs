use serde::Serialize;
use utoipa::ToSchema;

use crate::state::machine::GamePhase;

/// Lifecycle phase of a game as exposed to REST/SSE clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GamePhaseDto {
    /// Players gathering, no round started.
    Lobby,
    /// A round is running and accepting answers.
    RoundActive,
    /// Everyone answered; waiting for the next round.
    RoundComplete,
    /// The game is over.
    Finished,
}

impl From<GamePhase> for GamePhaseDto {
    fn from(phase: GamePhase) -> Self {
        match phase {
            GamePhase::Lobby => GamePhaseDto::Lobby,
            GamePhase::RoundActive => GamePhaseDto::RoundActive,
            GamePhase::RoundComplete => GamePhaseDto::RoundComplete,
            GamePhase::Finished => GamePhaseDto::Finished,
        }
    }
}
