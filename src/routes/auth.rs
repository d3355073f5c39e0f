//! Player identity extraction.
//!
//! Authentication itself happens upstream: the fronting proxy validates the
//! session and injects the player's id into a trusted header. This extractor
//! only reads that result; it never sees credentials.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the authenticated player id.
pub const PLAYER_ID_HEADER: &str = "x-player-id";

/// Already-authenticated identity of the acting player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerIdentity(pub Uuid);

impl<S> FromRequestParts<S> for PlayerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(PLAYER_ID_HEADER) else {
            return Err(AppError::Unauthorized(format!(
                "missing `{PLAYER_ID_HEADER}` header"
            )));
        };

        let value = raw.to_str().map_err(|_| {
            AppError::Unauthorized(format!("`{PLAYER_ID_HEADER}` header is not valid UTF-8"))
        })?;

        let player_id = Uuid::parse_str(value).map_err(|_| {
            AppError::Unauthorized(format!("`{PLAYER_ID_HEADER}` header is not a valid UUID"))
        })?;

        Ok(PlayerIdentity(player_id))
    }
}
