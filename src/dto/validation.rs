//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that an answer value is a finite number inside `[0, 1]`.
///
/// Non-finite and out-of-range values are malformed input and must be
/// rejected here, before they ever reach the state machine.
pub fn validate_answer_value(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        let mut err = ValidationError::new("answer_value_finite");
        err.message = Some("Answer value must be a finite number".into());
        return Err(err);
    }

    if !(0.0..=1.0).contains(&value) {
        let mut err = ValidationError::new("answer_value_range");
        err.message = Some(format!("Answer value must be within [0, 1] (got {value})").into());
        return Err(err);
    }

    Ok(())
}
