use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

pub const ACTING_USER_HEADER: &str = "x-user-id";

/// The user on whose behalf the request is made, from `X-User-Id`.
#[derive(Debug, Clone, Default)]
pub struct ActingUser(pub Option<String>);

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(ACTING_USER_HEADER) else {
            return Ok(Self(None));
        };
        let user_id = value
            .to_str()
            .map_err(|_| AppError::BadRequest("X-User-Id must be valid text".to_string()))?
            .trim();
        if user_id.is_empty() {
            Ok(Self(None))
        } else {
            Ok(Self(Some(user_id.to_string())))
        }
    }
}
