use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use moodlog_core::error::ApiError;
use moodlog_core::insight::{MoodInsightRequest, MoodInsightResponse};
use moodlog_core::prompt::MAX_MEMORY_ITEMS;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::pipeline::narrate_mood_insight;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/insights/mood", post(mood_insight))
}

fn validate_insight_request(req: &MoodInsightRequest) -> Result<(), AppError> {
    if req.total_moods < 0 {
        return Err(AppError::Validation {
            message: "total_moods must not be negative".to_string(),
            field: Some("total_moods".to_string()),
            received: Some(json!(req.total_moods)),
            docs_hint: None,
        });
    }
    if let Some((mood, count)) = req.mood_summary.iter().find(|(_, count)| **count < 0) {
        return Err(AppError::Validation {
            message: format!("mood_summary count for '{mood}' must not be negative"),
            field: Some("mood_summary".to_string()),
            received: Some(json!(count)),
            docs_hint: None,
        });
    }
    Ok(())
}

/// Narrative insight over a period of mood tracking
///
/// Always answers with prose. When the text-generation service fails, a fixed
/// supportive narrative is returned with `source = "fallback"`. Unless
/// `disable_memory` is true, recent entry insights are used as context.
#[utoipa::path(
    post,
    path = "/v1/insights/mood",
    request_body = MoodInsightRequest,
    responses(
        (status = 200, description = "Narrative insight", body = MoodInsightResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing caller identity", body = ApiError)
    ),
    params(
        ("x-user-id" = String, Header, description = "Caller's user id, set by the auth gateway")
    ),
    tag = "insights"
)]
pub async fn mood_insight(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    AppJson(req): AppJson<MoodInsightRequest>,
) -> Result<Json<MoodInsightResponse>, AppError> {
    validate_insight_request(&req)?;

    let memory = if req.uses_memory() {
        // Memory is context, not a requirement: storage trouble only drops it.
        match state.memory.recent(auth.user_id, MAX_MEMORY_ITEMS).await {
            Ok(insights) => insights,
            Err(err) => {
                tracing::warn!(user_id = %auth.user_id, error = ?err, "Skipping insight memory");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let response = narrate_mood_insight(state.generator.as_ref(), &req, &memory).await;

    tracing::info!(
        user_id = %auth.user_id,
        memory_items = memory.len(),
        source = response.source.as_str(),
        "Mood insight generated"
    );

    Ok(Json(response))
}
