use std::time::SystemTime;

use uuid::Uuid;

use crate::dao::models::{AnswerEntity, GameEntity, QuestionId, SeatEntity};
use crate::state::machine::GamePhase;
use crate::state::turns;

/// Seat a player holds in a game, with its immutable join index.
#[derive(Debug, Clone, PartialEq)]
pub struct Seat {
    /// Player occupying the seat.
    pub player_id: Uuid,
    /// Join order; never reassigned, gaps are fine after leaves.
    pub index: u32,
    /// Accumulated points.
    pub points: f64,
}

/// One submitted answer row.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRow {
    /// Answering player.
    pub player_id: Uuid,
    /// Turn the answer belongs to.
    pub turn: u32,
    /// Chosen value on the `[0, 1]` answer scale.
    pub value: f64,
    /// Last time the value was written.
    pub submitted_at: SystemTime,
}

/// Read-only view of one game used by the state machine and aggregator.
///
/// Seats are kept sorted by join index so positional lookups (monarch
/// rotation) are deterministic regardless of storage order.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    /// Primary key of the game.
    pub id: Uuid,
    /// Hosting player, seated at index 0.
    pub host_id: Uuid,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Spice weight of the game.
    pub hotness: f64,
    /// Current turn; `None` while in the lobby.
    pub turn: Option<u32>,
    /// Question asked this turn; set together with `turn`.
    pub active_question_id: Option<QuestionId>,
    /// Terminal flag.
    pub finished: bool,
    /// Storage version the snapshot was read at.
    pub version: u64,
    /// Seats in join order.
    pub seats: Vec<Seat>,
    /// Every answer row of the game, all turns included.
    pub answers: Vec<AnswerRow>,
}

impl GameSnapshot {
    /// Derive the lifecycle phase from the persisted fields.
    ///
    /// Completion is recomputed from the answer rows on every call; it is
    /// never cached because the membership denominator can change mid-round.
    pub fn phase(&self) -> GamePhase {
        debug_assert_eq!(
            self.turn.is_some(),
            self.active_question_id.is_some(),
            "turn and active question must be set together"
        );

        if self.finished {
            GamePhase::Finished
        } else if self.turn.is_none() {
            GamePhase::Lobby
        } else if turns::is_round_complete(self) {
            GamePhase::RoundComplete
        } else {
            GamePhase::RoundActive
        }
    }

    /// Whether the player holds a seat.
    pub fn is_member(&self, player_id: Uuid) -> bool {
        self.seats.iter().any(|seat| seat.player_id == player_id)
    }

    /// The player's seat, if any.
    pub fn seat(&self, player_id: Uuid) -> Option<&Seat> {
        self.seats.iter().find(|seat| seat.player_id == player_id)
    }

    /// Join index for the next player to be seated. One past the highest
    /// index ever assigned, so indices stay unique even after leaves left
    /// gaps in the sequence.
    pub fn next_seat_index(&self) -> u32 {
        self.seats
            .iter()
            .map(|seat| seat.index + 1)
            .max()
            .unwrap_or(0)
    }

    /// The player's answer for the current turn, if a round is running.
    pub fn answer_of(&self, player_id: Uuid) -> Option<&AnswerRow> {
        let turn = self.turn?;
        self.answers
            .iter()
            .find(|answer| answer.player_id == player_id && answer.turn == turn)
    }
}

impl From<SeatEntity> for Seat {
    fn from(value: SeatEntity) -> Self {
        Self {
            player_id: value.player_id,
            index: value.index,
            points: value.points,
        }
    }
}

impl From<AnswerEntity> for AnswerRow {
    fn from(value: AnswerEntity) -> Self {
        Self {
            player_id: value.player_id,
            turn: value.turn,
            value: value.value,
            submitted_at: value.submitted_at,
        }
    }
}

impl From<GameEntity> for GameSnapshot {
    fn from(value: GameEntity) -> Self {
        let mut seats: Vec<Seat> = value.seats.into_iter().map(Into::into).collect();
        seats.sort_by_key(|seat| seat.index);

        Self {
            id: value.id,
            host_id: value.host_id,
            created_at: value.created_at,
            hotness: value.hotness,
            turn: value.turn,
            active_question_id: value.active_question_id,
            finished: value.finished,
            version: value.version,
            seats,
            answers: value.answers.into_iter().map(Into::into).collect(),
        }
    }
}
