use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{QuestionEntity, QuestionId, QuestionRules},
    dto::{format_system_time, phase::GamePhaseDto, validation::validate_answer_value},
    state::game::{GameSnapshot, Seat},
    state::{similarity, turns},
};

/// Payload carrying a player's answer for the current round.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// Position on the `[0, 1]` answer scale.
    pub value: f64,
}

impl Validate for SubmitAnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(err) = validate_answer_value(self.value) {
            errors.add("value", err);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Public projection of a seat exposed to REST/SSE clients.
///
/// Answer values of other players stay hidden until the round completes;
/// only the submission flag is visible mid-round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeatSummary {
    /// Player occupying the seat.
    pub player_id: Uuid,
    /// Join order of the seat.
    pub index: u32,
    /// Accumulated points.
    pub points: f64,
    /// Whether the player has answered the current round.
    pub has_answered: bool,
}

/// Projection of the question asked this round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionSummary {
    /// Stable identifier of the question.
    pub id: QuestionId,
    /// Prompt shown to all players.
    pub prompt: String,
    /// Label anchoring the low end of the answer scale.
    pub answer_a: String,
    /// Label anchoring the high end of the answer scale.
    pub answer_b: String,
    /// Optional spice weight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotness: Option<f64>,
    /// Optional knowledge-category tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge: Option<String>,
    /// Option-scoped special rules.
    pub rules: QuestionRules,
}

impl From<QuestionEntity> for QuestionSummary {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            prompt: question.prompt,
            answer_a: question.answer_a,
            answer_b: question.answer_b,
            hotness: question.hotness,
            knowledge: question.knowledge,
            rules: question.rules,
        }
    }
}

/// One scored guess of a settled round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GuessSummary {
    /// Guessing player.
    pub player_id: Uuid,
    /// Value the player guessed.
    pub value: f64,
    /// Similarity score the guess earned.
    pub score: f64,
}

/// Revealed values and scores of a completed round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundResultSummary {
    /// Monarch of the settled round.
    pub monarch_id: Uuid,
    /// Value the monarch chose.
    pub monarch_value: f64,
    /// Mean similarity over all guesses.
    pub overall: f64,
    /// Mean of the raw guess values.
    pub average_guess: f64,
    /// Every guess with its score.
    pub guesses: Vec<GuessSummary>,
}

/// Authoritative game state returned to a specific viewer.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSummary {
    /// Primary key of the game.
    pub id: Uuid,
    /// Hosting player.
    pub host_id: Uuid,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Spice weight of the game.
    pub hotness: f64,
    /// Current turn index, absent in the lobby.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<u32>,
    /// Whether the game is over.
    pub finished: bool,
    /// Derived lifecycle phase.
    pub phase: GamePhaseDto,
    /// Question asked this round, if one is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_question: Option<QuestionSummary>,
    /// Seats in join order.
    pub players: Vec<SeatSummary>,
    /// Monarch of the current round, if one is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monarch_id: Option<Uuid>,
    /// The viewer's own answer for the current round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_answer: Option<f64>,
    /// Revealed values and scores once the round is complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_result: Option<RoundResultSummary>,
}

/// Entry of the caller's game list.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameListItem {
    /// Primary key of the game.
    pub id: Uuid,
    /// Hosting player.
    pub host_id: Uuid,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Whether the game is over.
    pub finished: bool,
    /// Current turn index, absent in the lobby.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<u32>,
    /// Number of seated players.
    pub player_count: usize,
}

impl From<&GameSnapshot> for GameListItem {
    fn from(game: &GameSnapshot) -> Self {
        Self {
            id: game.id,
            host_id: game.host_id,
            created_at: format_system_time(game.created_at),
            finished: game.finished,
            turn: game.turn,
            player_count: game.seats.len(),
        }
    }
}

impl SeatSummary {
    /// Project a seat together with its answered-this-round flag.
    pub fn from_seat(seat: &Seat, has_answered: bool) -> Self {
        Self {
            player_id: seat.player_id,
            index: seat.index,
            points: seat.points,
            has_answered,
        }
    }
}

impl GameSummary {
    /// Assemble the snapshot a specific viewer is allowed to see.
    pub fn for_viewer(
        game: &GameSnapshot,
        viewer: Uuid,
        active_question: Option<QuestionSummary>,
        exponent: f64,
    ) -> Self {
        let active = turns::active_answers(game);
        let players = game
            .seats
            .iter()
            .map(|seat| {
                let has_answered = active.iter().any(|answer| answer.player_id == seat.player_id);
                SeatSummary::from_seat(seat, has_answered)
            })
            .collect();

        Self {
            id: game.id,
            host_id: game.host_id,
            created_at: format_system_time(game.created_at),
            hotness: game.hotness,
            turn: game.turn,
            finished: game.finished,
            phase: game.phase().into(),
            active_question,
            players,
            monarch_id: turns::monarch_of(game).map(|seat| seat.player_id),
            your_answer: game.answer_of(viewer).map(|answer| answer.value),
            round_result: round_result(game, exponent),
        }
    }
}

/// Reveal values and scores only once the round has settled.
fn round_result(game: &GameSnapshot, exponent: f64) -> Option<RoundResultSummary> {
    if !turns::is_round_complete(game) {
        return None;
    }

    let split = turns::partition(game);
    let monarch_answer = split.monarch?;
    let guesses: Vec<f64> = split.others.iter().map(|answer| answer.value).collect();
    let scores = similarity::similarities(monarch_answer.value, &guesses, exponent)?;

    Some(RoundResultSummary {
        monarch_id: monarch_answer.player_id,
        monarch_value: monarch_answer.value,
        overall: scores.overall,
        average_guess: scores.average_guess,
        guesses: split
            .others
            .iter()
            .zip(&scores.per_guess)
            .map(|(answer, score)| GuessSummary {
                player_id: answer.player_id,
                value: answer.value,
                score: *score,
            })
            .collect(),
    })
}
