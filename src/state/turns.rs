//! Pure turn/answer aggregation over a game snapshot.
//!
//! The monarch role rotates over the seats in join order: turn `t` belongs to
//! the seat at position `t mod seat_count`. Both the rotation and the
//! round-completion denominator read the *live* seat list, so a join or leave
//! mid-round shifts them immediately.

use crate::state::game::{AnswerRow, GameSnapshot, Seat};

/// Active answers split into the monarch's and everyone else's.
#[derive(Debug)]
pub struct PartitionedAnswers<'a> {
    /// The monarch's answer for the current turn, if submitted.
    pub monarch: Option<&'a AnswerRow>,
    /// All other players' answers for the current turn.
    pub others: Vec<&'a AnswerRow>,
}

/// Seat holding the monarch role for the current turn.
///
/// `None` when the game has no seats or no running round.
pub fn monarch_of(game: &GameSnapshot) -> Option<&Seat> {
    let turn = game.turn?;
    if game.seats.is_empty() {
        return None;
    }
    game.seats.get(turn as usize % game.seats.len())
}

/// Answers submitted for the current turn.
pub fn active_answers(game: &GameSnapshot) -> Vec<&AnswerRow> {
    match game.turn {
        Some(turn) => game
            .answers
            .iter()
            .filter(|answer| answer.turn == turn)
            .collect(),
        None => Vec::new(),
    }
}

/// Split the active answers by whether the answering player is the monarch.
pub fn partition(game: &GameSnapshot) -> PartitionedAnswers<'_> {
    let monarch_id = monarch_of(game).map(|seat| seat.player_id);
    let mut split = PartitionedAnswers {
        monarch: None,
        others: Vec::new(),
    };

    for answer in active_answers(game) {
        if Some(answer.player_id) == monarch_id {
            split.monarch = Some(answer);
        } else {
            split.others.push(answer);
        }
    }

    split
}

/// Whether every seated player has answered the current turn.
///
/// The denominator is the live seat count, so a player joining mid-round
/// raises the bar and the round cannot complete until they answer too. The
/// predicate only ever compares counts; answers from players who have since
/// left still count toward completion.
pub fn is_round_complete(game: &GameSnapshot) -> bool {
    if game.turn.is_none() {
        return false;
    }

    let split = partition(game);
    split.others.len() + usize::from(split.monarch.is_some()) >= game.seats.len()
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use uuid::Uuid;

    use super::*;

    fn snapshot(players: usize, turn: Option<u32>) -> GameSnapshot {
        let seats: Vec<Seat> = (0..players)
            .map(|index| Seat {
                player_id: Uuid::new_v4(),
                index: index as u32,
                points: 0.0,
            })
            .collect();

        GameSnapshot {
            id: Uuid::new_v4(),
            host_id: seats.first().map(|seat| seat.player_id).unwrap_or_default(),
            created_at: SystemTime::now(),
            hotness: 2.0,
            turn,
            active_question_id: turn.map(|_| 1),
            finished: false,
            version: 0,
            seats,
            answers: Vec::new(),
        }
    }

    fn answer(player_id: Uuid, turn: u32, value: f64) -> AnswerRow {
        AnswerRow {
            player_id,
            turn,
            value,
            submitted_at: SystemTime::now(),
        }
    }

    #[test]
    fn monarch_rotation_visits_every_seat_once_per_cycle() {
        let mut game = snapshot(4, Some(0));
        let expected: Vec<Uuid> = game.seats.iter().map(|seat| seat.player_id).collect();

        let mut visited = Vec::new();
        for turn in 0..4 {
            game.turn = Some(turn);
            visited.push(monarch_of(&game).unwrap().player_id);
        }
        assert_eq!(visited, expected);

        // The cycle wraps.
        game.turn = Some(4);
        assert_eq!(monarch_of(&game).unwrap().player_id, expected[0]);
    }

    #[test]
    fn monarch_is_none_without_a_round_or_seats() {
        let game = snapshot(3, None);
        assert!(monarch_of(&game).is_none());

        let mut empty = snapshot(0, Some(2));
        empty.seats.clear();
        assert!(monarch_of(&empty).is_none());
    }

    #[test]
    fn active_answers_ignore_previous_turns() {
        let mut game = snapshot(2, Some(1));
        let [a, b] = [game.seats[0].player_id, game.seats[1].player_id];
        game.answers = vec![answer(a, 0, 0.1), answer(b, 1, 0.4), answer(a, 1, 0.6)];

        let active = active_answers(&game);
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|row| row.turn == 1));
    }

    #[test]
    fn partition_separates_the_monarch() {
        let mut game = snapshot(3, Some(1));
        // Turn 1 of 3 seats: the monarch sits at index 1.
        let monarch = game.seats[1].player_id;
        let guesser = game.seats[0].player_id;
        game.answers = vec![answer(monarch, 1, 0.5), answer(guesser, 1, 0.2)];

        let split = partition(&game);
        assert_eq!(split.monarch.unwrap().player_id, monarch);
        assert_eq!(split.others.len(), 1);
        assert_eq!(split.others[0].player_id, guesser);
    }

    #[test]
    fn round_completes_exactly_when_everyone_answered() {
        let mut game = snapshot(3, Some(0));
        assert!(!is_round_complete(&game));

        let ids: Vec<Uuid> = game.seats.iter().map(|seat| seat.player_id).collect();
        game.answers.push(answer(ids[0], 0, 0.5));
        game.answers.push(answer(ids[1], 0, 0.3));
        assert!(!is_round_complete(&game));

        game.answers.push(answer(ids[2], 0, 0.9));
        assert!(is_round_complete(&game));
    }

    #[test]
    fn late_joiner_raises_the_denominator() {
        let mut game = snapshot(2, Some(0));
        let ids: Vec<Uuid> = game.seats.iter().map(|seat| seat.player_id).collect();
        game.answers.push(answer(ids[0], 0, 0.5));
        game.answers.push(answer(ids[1], 0, 0.3));
        assert!(is_round_complete(&game));

        game.seats.push(Seat {
            player_id: Uuid::new_v4(),
            index: 2,
            points: 0.0,
        });
        assert!(!is_round_complete(&game));
    }

    #[test]
    fn completion_is_sticky_when_an_answered_player_leaves() {
        let mut game = snapshot(3, Some(0));
        let ids: Vec<Uuid> = game.seats.iter().map(|seat| seat.player_id).collect();
        for id in &ids {
            game.answers.push(answer(*id, 0, 0.5));
        }
        assert!(is_round_complete(&game));

        // Their answer row outlives the seat, so the round stays complete.
        game.seats.retain(|seat| seat.player_id != ids[2]);
        assert!(is_round_complete(&game));
    }

    #[test]
    fn lobby_is_never_complete() {
        let game = snapshot(2, None);
        assert!(!is_round_complete(&game));
    }
}
