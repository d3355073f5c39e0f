//! Scoring engine: similarity between the monarch's answer and a guess.
//!
//! Pure math, no side effects. The exponent sharpens the falloff for distant
//! guesses relative to linear distance; callers take it from configuration.

/// Exponent applied to the linear closeness of a guess.
pub const DEFAULT_EXPONENT: f64 = 1.5;

/// Scores computed once a round has all its answers.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundScores {
    /// Arithmetic mean of the per-guess scores.
    pub overall: f64,
    /// One score per guess, in the order the guesses were given.
    pub per_guess: Vec<f64>,
    /// Arithmetic mean of the raw guess values.
    pub average_guess: f64,
}

/// Similarity of a single guess to the monarch's value.
///
/// Both inputs live on the `[0, 1]` answer scale. An exact match scores 1,
/// the maximum possible distance scores 0, and the score never increases as
/// the distance grows.
pub fn similarity(monarch_value: f64, other_value: f64, exponent: f64) -> f64 {
    (1.0 - (monarch_value - other_value).abs()).powf(exponent)
}

/// Score every guess against the monarch's value.
///
/// Returns `None` for an empty guess list; a round with nobody but the
/// monarch has no defined mean and callers must prevent it from existing.
pub fn similarities(monarch_value: f64, guesses: &[f64], exponent: f64) -> Option<RoundScores> {
    if guesses.is_empty() {
        return None;
    }

    let per_guess: Vec<f64> = guesses
        .iter()
        .map(|guess| similarity(monarch_value, *guess, exponent))
        .collect();
    let count = per_guess.len() as f64;

    Some(RoundScores {
        overall: per_guess.iter().sum::<f64>() / count,
        per_guess,
        average_guess: guesses.iter().sum::<f64>() / count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn exact_match_scores_one() {
        for value in [0.0, 0.25, 0.5, 1.0] {
            assert!((similarity(value, value, DEFAULT_EXPONENT) - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn maximum_distance_scores_zero() {
        assert!(similarity(0.0, 1.0, DEFAULT_EXPONENT).abs() < EPSILON);
        assert!(similarity(1.0, 0.0, DEFAULT_EXPONENT).abs() < EPSILON);
    }

    #[test]
    fn score_never_increases_with_distance() {
        let monarch = 0.3;
        let mut previous = f64::INFINITY;
        for step in 0..=100 {
            let guess = monarch + 0.007 * step as f64;
            let score = similarity(monarch, guess.min(1.0), DEFAULT_EXPONENT);
            assert!(score <= previous + EPSILON);
            previous = score;
        }
    }

    #[test]
    fn known_reference_value() {
        // |0.5 - 0.3| = 0.2 -> 0.8^1.5
        let score = similarity(0.5, 0.3, DEFAULT_EXPONENT);
        assert!((score - 0.8f64.powf(1.5)).abs() < EPSILON);
        assert!((score - 0.715).abs() < 1e-3);
    }

    #[test]
    fn overall_is_the_mean_of_per_guess_scores() {
        let scores = similarities(0.5, &[0.5, 0.3, 0.7], DEFAULT_EXPONENT).unwrap();
        assert_eq!(scores.per_guess.len(), 3);

        let mean = scores.per_guess.iter().sum::<f64>() / 3.0;
        assert!((scores.overall - mean).abs() < EPSILON);
        assert!((scores.average_guess - 0.5).abs() < EPSILON);
    }

    #[test]
    fn no_guesses_yields_none() {
        assert!(similarities(0.5, &[], DEFAULT_EXPONENT).is_none());
    }
}
