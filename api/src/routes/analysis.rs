use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use moodlog_core::analysis::AnalysisOutcome;
use moodlog_core::error::ApiError;
use moodlog_core::journal::JournalEntryDraft;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::pipeline::analyze_entry;
use crate::routes::journal::validate_draft;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/analysis/preview", post(preview_analysis))
}

/// Analyze a draft without storing it
///
/// Runs the same pipeline as entry submission. Like submission, it always
/// answers with an analysis; `source = "fallback"` marks a service failure.
#[utoipa::path(
    post,
    path = "/v1/analysis/preview",
    request_body = JournalEntryDraft,
    responses(
        (status = 200, description = "Analysis of the draft", body = AnalysisOutcome),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing caller identity", body = ApiError)
    ),
    params(
        ("x-user-id" = String, Header, description = "Caller's user id, set by the auth gateway")
    ),
    tag = "analysis"
)]
pub async fn preview_analysis(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    AppJson(req): AppJson<JournalEntryDraft>,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let draft = validate_draft(req)?;
    let outcome = analyze_entry(state.generator.as_ref(), &draft).await;

    tracing::debug!(
        user_id = %auth.user_id,
        analysis_source = outcome.source.as_str(),
        "Analysis preview computed"
    );

    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::generation::testing::StubGenerator;
    use crate::routes::test_support::{response_json, test_state};
    use moodlog_core::analysis::DEFAULT_INSIGHT;

    fn preview_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/analysis/preview")
            .header("content-type", "application/json")
            .header("x-user-id", Uuid::now_v7().to_string())
            .body(Body::from(body.to_string()))
            .expect("request should build")
    }

    #[tokio::test]
    async fn preview_recovers_embedded_analysis() {
        let generator = Arc::new(StubGenerator::replying(
            "Sure! {\"emotions\":{\"joy\":80},\"energy_level\":70,\"insights\":\"Great day.\"} Hope that helps.",
        ));
        let app = router().with_state(test_state(generator.clone()));

        let response = app
            .oneshot(preview_request(
                r#"{"content": "Got the job offer!", "selectedTags": ["Excited"]}"#,
            ))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["emotions"]["joy"], 80.0);
        assert_eq!(body["energy_level"], 70);
        assert_eq!(body["insights"], "Great day.");
        assert_eq!(body["source"], "model");

        let prompts = generator.recorded_prompts();
        assert!(prompts[0].contains("Title: Untitled"));
        assert!(prompts[0].contains("Selected moods: excited"));
    }

    #[tokio::test]
    async fn preview_degrades_to_fallback_when_service_fails() {
        let app = router().with_state(test_state(Arc::new(StubGenerator::failing())));

        let response = app
            .oneshot(preview_request(r#"{"content": "Rough night."}"#))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["emotions"]["reflective"], 100.0);
        assert_eq!(body["energy_level"], 50);
        assert_eq!(body["insights"], DEFAULT_INSIGHT);
        assert_eq!(body["source"], "fallback");
    }
}
