use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{GameMutation, QuestionId};
use crate::state::game::{AnswerRow, GameSnapshot};
use crate::state::{similarity, turns};

/// Lifecycle phase of a game session, derived from persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Game created, no round started yet; players gather.
    Lobby,
    /// A round is running and accepting answers.
    RoundActive,
    /// Everyone answered; scores are on the table, awaiting advance.
    RoundComplete,
    /// Terminal; every further action fails closed.
    Finished,
}

/// Player-initiated actions the session state machine can process.
#[derive(Debug, Clone, PartialEq)]
pub enum GameAction {
    /// Take a seat in the game.
    Join {
        /// Joining player.
        player_id: Uuid,
    },
    /// Give up the seat, with phase-dependent consequences.
    Leave {
        /// Leaving player.
        player_id: Uuid,
    },
    /// Kick off round 0 with the given question.
    Start {
        /// Acting player; must be seated.
        player_id: Uuid,
        /// Question selected for the first round.
        question_id: QuestionId,
    },
    /// Submit (or replace) the answer for the current round.
    Submit {
        /// Answering player.
        player_id: Uuid,
        /// Value on the `[0, 1]` answer scale.
        value: f64,
    },
    /// Withdraw the answer for the current round.
    Unsubmit {
        /// Withdrawing player.
        player_id: Uuid,
    },
    /// Move on to the next round with the given question.
    Advance {
        /// Acting player; must be seated.
        player_id: Uuid,
        /// Question selected for the next round.
        question_id: QuestionId,
    },
    /// End the game explicitly.
    Finish {
        /// Acting player; must be the host.
        player_id: Uuid,
    },
}

/// State-transition notification handed to the broadcast registry.
///
/// Events carry only what subscribers need to know to re-fetch; they are
/// hints to re-sync, never the source of truth. The wire encoding lives in
/// [`crate::dto::sse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// A player took a seat.
    PlayerJoined {
        /// Player who joined.
        player_id: Uuid,
    },
    /// A player gave up their seat.
    PlayerLeft {
        /// Player who left.
        player_id: Uuid,
    },
    /// Round 0 started.
    RoundStarted,
    /// Every seated player has answered the current round.
    RoundComplete {
        /// Player whose submit completed the round.
        last_player_id: Uuid,
    },
    /// The game moved on to the next round.
    RoundAdvanced,
    /// The game reached its terminal state.
    GameFinished,
}

/// A rejected action: the state machine guard for it was not satisfied.
///
/// Guard violations are expected control flow, reported to the caller with
/// no state change and no error logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardViolation {
    /// The game is terminal and accepts nothing further.
    #[error("game is finished")]
    GameFinished,
    /// The player already holds a seat.
    #[error("player `{player_id}` already holds a seat")]
    AlreadyJoined {
        /// Offending player.
        player_id: Uuid,
    },
    /// The acting player holds no seat.
    #[error("player `{player_id}` holds no seat in this game")]
    NotAMember {
        /// Offending player.
        player_id: Uuid,
    },
    /// Joining is closed while a completed round awaits advancement.
    #[error("the completed round must be advanced before new players can join")]
    JoinClosed,
    /// The game already left the lobby.
    #[error("the game has already started")]
    AlreadyStarted,
    /// A game needs at least two players before round 0.
    #[error("at least two seated players are required to start (got {count})")]
    NotEnoughPlayers {
        /// Seats currently filled.
        count: usize,
    },
    /// No round is currently accepting answers.
    #[error("no round is accepting answers")]
    NotAcceptingAnswers,
    /// The round has settled; answers are frozen for scoring.
    #[error("the round is already complete")]
    RoundAlreadyComplete,
    /// Advancement requires every player to have answered.
    #[error("the round is not complete yet")]
    RoundNotComplete,
    /// The action requires a started game.
    #[error("the game has not started")]
    NotStarted,
    /// Ending the game is reserved for its host.
    #[error("only the host may end the game")]
    NotHost,
}

/// Outcome of a successfully guarded action: the writes to persist and the
/// events to broadcast once those writes commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Mutations to apply atomically against the game aggregate.
    pub mutations: Vec<GameMutation>,
    /// Events to publish after the mutations are persisted.
    pub events: Vec<GameEvent>,
    /// Phase the game ends up in once the mutations apply.
    pub next_phase: GamePhase,
}

impl Transition {
    /// Whether this transition removes the game entirely.
    pub fn deletes_game(&self) -> bool {
        self.mutations
            .iter()
            .any(|mutation| matches!(mutation, GameMutation::DeleteGame))
    }
}

/// Tunables feeding the scoring performed on round completion.
#[derive(Debug, Clone, Copy)]
pub struct ScoringParams {
    /// Exponent of the similarity falloff.
    pub exponent: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            exponent: similarity::DEFAULT_EXPONENT,
        }
    }
}

/// Validate an action against the snapshot and compute its transition.
///
/// Pure: nothing is persisted or published here. Callers must apply the
/// returned mutations under the game's serialization boundary and publish
/// the events only after the write succeeds, so a rejected or lost write
/// never leaks a notification.
pub fn decide(
    game: &GameSnapshot,
    action: GameAction,
    scoring: &ScoringParams,
) -> Result<Transition, GuardViolation> {
    if game.finished {
        return Err(GuardViolation::GameFinished);
    }

    match action {
        GameAction::Join { player_id } => decide_join(game, player_id),
        GameAction::Leave { player_id } => decide_leave(game, player_id),
        GameAction::Start {
            player_id,
            question_id,
        } => decide_start(game, player_id, question_id),
        GameAction::Submit { player_id, value } => decide_submit(game, player_id, value, scoring),
        GameAction::Unsubmit { player_id } => decide_unsubmit(game, player_id),
        GameAction::Advance {
            player_id,
            question_id,
        } => decide_advance(game, player_id, question_id),
        GameAction::Finish { player_id } => decide_finish(game, player_id),
    }
}

fn decide_join(game: &GameSnapshot, player_id: Uuid) -> Result<Transition, GuardViolation> {
    if game.is_member(player_id) {
        return Err(GuardViolation::AlreadyJoined { player_id });
    }

    let phase = game.phase();
    if !matches!(phase, GamePhase::Lobby | GamePhase::RoundActive) {
        return Err(GuardViolation::JoinClosed);
    }

    Ok(Transition {
        mutations: vec![GameMutation::AddSeat {
            player_id,
            index: game.next_seat_index(),
        }],
        events: vec![GameEvent::PlayerJoined { player_id }],
        next_phase: phase,
    })
}

fn decide_leave(game: &GameSnapshot, player_id: Uuid) -> Result<Transition, GuardViolation> {
    if !game.is_member(player_id) {
        return Err(GuardViolation::NotAMember { player_id });
    }

    match game.phase() {
        // Abandoning an empty lobby removes the game instead of leaving an
        // unjoinable husk behind.
        GamePhase::Lobby if game.seats.len() <= 1 => Ok(Transition {
            mutations: vec![GameMutation::DeleteGame],
            events: vec![GameEvent::PlayerLeft { player_id }],
            next_phase: GamePhase::Lobby,
        }),
        GamePhase::Lobby => Ok(Transition {
            mutations: vec![GameMutation::RemoveSeat { player_id }],
            events: vec![GameEvent::PlayerLeft { player_id }],
            next_phase: GamePhase::Lobby,
        }),
        // No substitution support: a started game ends when anyone walks out.
        // Seats and answers stay behind so the final scoreboard survives.
        GamePhase::RoundActive | GamePhase::RoundComplete => Ok(Transition {
            mutations: vec![GameMutation::MarkFinished],
            events: vec![
                GameEvent::PlayerLeft { player_id },
                GameEvent::GameFinished,
            ],
            next_phase: GamePhase::Finished,
        }),
        GamePhase::Finished => Err(GuardViolation::GameFinished),
    }
}

fn decide_start(
    game: &GameSnapshot,
    player_id: Uuid,
    question_id: QuestionId,
) -> Result<Transition, GuardViolation> {
    if !game.is_member(player_id) {
        return Err(GuardViolation::NotAMember { player_id });
    }
    if game.turn.is_some() {
        return Err(GuardViolation::AlreadyStarted);
    }
    if game.seats.len() < 2 {
        return Err(GuardViolation::NotEnoughPlayers {
            count: game.seats.len(),
        });
    }

    Ok(Transition {
        mutations: vec![GameMutation::SetRound {
            turn: 0,
            question_id,
        }],
        events: vec![GameEvent::RoundStarted],
        next_phase: GamePhase::RoundActive,
    })
}

fn decide_submit(
    game: &GameSnapshot,
    player_id: Uuid,
    value: f64,
    scoring: &ScoringParams,
) -> Result<Transition, GuardViolation> {
    if !game.is_member(player_id) {
        return Err(GuardViolation::NotAMember { player_id });
    }
    let Some(turn) = game.turn else {
        return Err(GuardViolation::NotAcceptingAnswers);
    };
    if turns::is_round_complete(game) {
        return Err(GuardViolation::RoundAlreadyComplete);
    }
    debug_assert!(
        value.is_finite(),
        "non-finite values must be rejected at the boundary"
    );

    let mut mutations = vec![GameMutation::UpsertAnswer {
        player_id,
        turn,
        value,
    }];
    let mut events = Vec::new();
    let mut next_phase = GamePhase::RoundActive;

    // Re-evaluate the completion predicate against the post-write answer set.
    let mut projected = game.clone();
    match projected
        .answers
        .iter_mut()
        .find(|answer| answer.player_id == player_id && answer.turn == turn)
    {
        Some(existing) => existing.value = value,
        None => projected.answers.push(AnswerRow {
            player_id,
            turn,
            value,
            submitted_at: std::time::SystemTime::now(),
        }),
    }

    if turns::is_round_complete(&projected) {
        mutations.extend(score_round(&projected, scoring));
        events.push(GameEvent::RoundComplete {
            last_player_id: player_id,
        });
        next_phase = GamePhase::RoundComplete;
    }

    Ok(Transition {
        mutations,
        events,
        next_phase,
    })
}

/// Point awards for a just-completed round: each guesser earns their
/// similarity to the monarch's value, the monarch earns the overall mean.
fn score_round(game: &GameSnapshot, scoring: &ScoringParams) -> Vec<GameMutation> {
    let split = turns::partition(game);
    let Some(monarch_answer) = split.monarch else {
        debug_assert!(false, "round completed without a monarch answer");
        return Vec::new();
    };

    let guesses: Vec<f64> = split.others.iter().map(|answer| answer.value).collect();
    let Some(scores) = similarity::similarities(monarch_answer.value, &guesses, scoring.exponent)
    else {
        debug_assert!(false, "round completed without any guessers");
        return Vec::new();
    };

    let mut awards: Vec<GameMutation> = split
        .others
        .iter()
        .zip(&scores.per_guess)
        .map(|(answer, score)| GameMutation::AwardPoints {
            player_id: answer.player_id,
            points: *score,
        })
        .collect();
    awards.push(GameMutation::AwardPoints {
        player_id: monarch_answer.player_id,
        points: scores.overall,
    });
    awards
}

fn decide_unsubmit(game: &GameSnapshot, player_id: Uuid) -> Result<Transition, GuardViolation> {
    if !game.is_member(player_id) {
        return Err(GuardViolation::NotAMember { player_id });
    }
    let Some(turn) = game.turn else {
        return Err(GuardViolation::NotAcceptingAnswers);
    };
    // Once everyone answered the answers are frozen; withdrawing now would
    // race the scoring already handed out.
    if turns::is_round_complete(game) {
        return Err(GuardViolation::RoundAlreadyComplete);
    }

    Ok(Transition {
        mutations: vec![GameMutation::RemoveAnswer { player_id, turn }],
        events: Vec::new(),
        next_phase: GamePhase::RoundActive,
    })
}

fn decide_advance(
    game: &GameSnapshot,
    player_id: Uuid,
    question_id: QuestionId,
) -> Result<Transition, GuardViolation> {
    if !game.is_member(player_id) {
        return Err(GuardViolation::NotAMember { player_id });
    }
    let Some(turn) = game.turn else {
        return Err(GuardViolation::NotStarted);
    };
    if !turns::is_round_complete(game) {
        return Err(GuardViolation::RoundNotComplete);
    }

    Ok(Transition {
        mutations: vec![GameMutation::SetRound {
            turn: turn + 1,
            question_id,
        }],
        events: vec![GameEvent::RoundAdvanced],
        next_phase: GamePhase::RoundActive,
    })
}

fn decide_finish(game: &GameSnapshot, player_id: Uuid) -> Result<Transition, GuardViolation> {
    if player_id != game.host_id {
        return Err(GuardViolation::NotHost);
    }
    if game.turn.is_none() {
        return Err(GuardViolation::NotStarted);
    }

    Ok(Transition {
        mutations: vec![GameMutation::MarkFinished],
        events: vec![GameEvent::GameFinished],
        next_phase: GamePhase::Finished,
    })
}
