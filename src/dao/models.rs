use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Identifier of a question in the loaded question pool.
pub type QuestionId = u32;

/// Seat occupied by a player inside a game, keyed by (game, player).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatEntity {
    /// Identity of the player occupying the seat.
    pub player_id: Uuid,
    /// Join order, assigned once on join and never reused within a game.
    pub index: u32,
    /// Points accumulated across completed rounds.
    pub points: f64,
}

/// Answer submitted by a player for one turn of a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerEntity {
    /// Identity of the answering player.
    pub player_id: Uuid,
    /// Turn index the answer belongs to.
    pub turn: u32,
    /// Position chosen on the continuous answer scale, within `[0, 1]`.
    pub value: f64,
    /// Moment the value was last written.
    pub submitted_at: SystemTime,
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Player that created the game; always seated at index 0.
    pub host_id: Uuid,
    /// Creation timestamp for auditing/ordering.
    pub created_at: SystemTime,
    /// Tunable spice weight carried by the game.
    pub hotness: f64,
    /// Current turn index; `None` while the game sits in the lobby.
    pub turn: Option<u32>,
    /// Question asked for the current turn; set together with `turn`.
    pub active_question_id: Option<QuestionId>,
    /// Terminal flag; a finished game accepts no further actions.
    pub finished: bool,
    /// Write version, incremented by every applied transition.
    pub version: u64,
    /// Seats in join order.
    pub seats: Vec<SeatEntity>,
    /// All answers submitted over the lifetime of the game.
    pub answers: Vec<AnswerEntity>,
}

impl GameEntity {
    /// Build a fresh lobby-state game with the host seated at index 0.
    pub fn new(host_id: Uuid, hotness: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            host_id,
            created_at: SystemTime::now(),
            hotness,
            turn: None,
            active_question_id: None,
            finished: false,
            version: 0,
            seats: vec![SeatEntity {
                player_id: host_id,
                index: 0,
                points: 0.0,
            }],
            answers: Vec::new(),
        }
    }
}

/// Single write against a game aggregate, applied atomically in batches by
/// [`GameStore::apply_transition`](crate::dao::game_store::GameStore::apply_transition).
#[derive(Debug, Clone, PartialEq)]
pub enum GameMutation {
    /// Seat a new player at the given join index.
    AddSeat {
        /// Player taking the seat.
        player_id: Uuid,
        /// Join index assigned to the seat.
        index: u32,
    },
    /// Remove a player's seat.
    RemoveSeat {
        /// Player giving up the seat.
        player_id: Uuid,
    },
    /// Enter a round: set the turn index and the question asked for it.
    SetRound {
        /// New turn index.
        turn: u32,
        /// Question selected for the turn.
        question_id: QuestionId,
    },
    /// Insert or replace the answer for (player, turn).
    UpsertAnswer {
        /// Answering player.
        player_id: Uuid,
        /// Turn the answer belongs to.
        turn: u32,
        /// Chosen value on the answer scale.
        value: f64,
    },
    /// Delete the answer for (player, turn) if present.
    RemoveAnswer {
        /// Withdrawing player.
        player_id: Uuid,
        /// Turn the withdrawal targets.
        turn: u32,
    },
    /// Add points to a player's running total.
    AwardPoints {
        /// Rewarded player.
        player_id: Uuid,
        /// Score delta to add.
        points: f64,
    },
    /// Flip the terminal flag.
    MarkFinished,
    /// Remove the game entirely (lobby abandoned by its last member).
    DeleteGame,
}

/// Restriction of a question rule to one or both of the answer options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum OptionFlag {
    /// Rule applies when option A is chosen.
    A,
    /// Rule applies when option B is chosen.
    B,
    /// Rule applies to either option.
    #[serde(rename = "A,B")]
    Both,
}

/// Special rules a question can attach to its answer options.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct QuestionRules {
    /// Choosing the flagged option wipes the chooser's points.
    #[serde(default)]
    pub loses_all_points: Option<OptionFlag>,
    /// Choosing the flagged option eliminates the chooser.
    #[serde(default)]
    pub beheading: Option<OptionFlag>,
    /// Choosing the flagged option grants a flat bonus point.
    #[serde(default)]
    pub plus_one_point: Option<OptionFlag>,
    /// Choosing the flagged option shields the chooser next round.
    #[serde(default)]
    pub invincibility: Option<OptionFlag>,
    /// Choosing the flagged option benches the chooser for a round.
    #[serde(default)]
    pub jail: Option<OptionFlag>,
    /// Monarch choosing the flagged option wipes everyone else's points.
    #[serde(default)]
    pub genocide_route: Option<OptionFlag>,
    /// Coin-flip between invincibility and elimination.
    #[serde(default)]
    pub invincibility_or_beheading: Option<OptionFlag>,
}

/// Question row as stored in the question pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionEntity {
    /// Stable identifier of the question.
    pub id: QuestionId,
    /// Prompt shown to all players.
    pub prompt: String,
    /// Label anchoring the low end of the answer scale.
    pub answer_a: String,
    /// Label anchoring the high end of the answer scale.
    pub answer_b: String,
    /// Optional spice weight for selection policies.
    pub hotness: Option<f64>,
    /// Optional knowledge-category tag.
    pub knowledge: Option<String>,
    /// Option-scoped special rules.
    pub rules: QuestionRules,
    /// Optional follow-up question chained after this one. Cycles are
    /// tolerated data, never followed automatically.
    pub follow_up_question_id: Option<QuestionId>,
    /// Option the monarch must pick for the follow-up to trigger.
    pub follow_up_condition: Option<OptionFlag>,
}
