//! `AppJson<T>`: a JSON body extractor whose rejections are structured `AppError`s
//! instead of axum's plain-text 4xx responses.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

pub fn map_json_rejection(rejection: JsonRejection) -> AppError {
    let body_text = rejection.body_text();
    let field = field_from_serde_message(&body_text).unwrap_or_else(|| "body".to_string());

    AppError::Validation {
        message: format!("Invalid request body: {body_text}"),
        field: Some(field),
        received: None,
        docs_hint: Some(
            "Check the request body against the schema at /api-doc/openapi.json.".to_string(),
        ),
    }
}

/// Pull the field name out of serde's "missing field `x`" / "unknown field `x`" messages.
fn field_from_serde_message(msg: &str) -> Option<String> {
    ["missing field `", "unknown field `"]
        .iter()
        .find_map(|marker| {
            let after = &msg[msg.find(marker)? + marker.len()..];
            let end = after.find('`')?;
            Some(after[..end].to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_missing_field_name() {
        let msg = "Failed to deserialize the JSON body: missing field `content` at line 1 column 2";
        assert_eq!(field_from_serde_message(msg), Some("content".to_string()));
    }

    #[test]
    fn extracts_unknown_field_name() {
        let msg = "unknown field `mood`, expected one of `title`, `content`";
        assert_eq!(field_from_serde_message(msg), Some("mood".to_string()));
    }

    #[test]
    fn returns_none_for_generic_error() {
        let msg = "invalid type: integer `3`, expected a string";
        assert_eq!(field_from_serde_message(msg), None);
    }
}
