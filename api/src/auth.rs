use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the caller's user id, set by the upstream auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity for user-scoped handlers.
///
/// Authentication itself happens in front of this service; handlers only need
/// to know whose rows they are touching.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = user_id_from_headers(&parts.headers)?;
        Ok(Self { user_id })
    }
}

fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let header_val = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized {
            message: format!("{USER_ID_HEADER} header is required"),
            docs_hint: Some(
                "Requests must pass through the auth gateway, which sets x-user-id.".to_string(),
            ),
        })?;

    let user_id_str = header_val.to_str().map_err(|_| AppError::Unauthorized {
        message: format!("{USER_ID_HEADER} must be a valid UTF-8 string"),
        docs_hint: None,
    })?;

    Uuid::parse_str(user_id_str.trim()).map_err(|_| AppError::Unauthorized {
        message: format!("{USER_ID_HEADER} must be a valid UUID"),
        docs_hint: Some(
            "Use a UUID, e.g. 'a1b2c3d4-e5f6-7890-abcd-ef1234567890'".to_string(),
        ),
    })
}
