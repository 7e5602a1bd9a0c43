use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use moodlog_core::analysis::{
    AnalysisCandidate, AnalysisOutcome, AnalysisResult, AnalysisSource, normalize,
};
use moodlog_core::error::ApiError;
use moodlog_core::journal::{
    JournalEntry, JournalEntryDraft, MAX_CONTENT_CHARS, MAX_TAG_CHARS, MAX_TAGS, MAX_TITLE_CHARS,
    PaginatedResponse, normalize_tags,
};
use moodlog_core::stats::{MoodSample, MoodStats, summarize};

use crate::auth::AuthenticatedUser;
use crate::db::begin_user_scope;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::pipeline::analyze_entry;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_STATS_DAYS: i64 = 30;
const MAX_STATS_DAYS: i64 = 365;

const ENTRY_COLUMNS: &str = "id, user_id, title, content, selected_tags, emotions, \
     energy_level, insights, analysis_source, created_at";

pub fn write_router() -> Router<AppState> {
    Router::new().route("/v1/journal", post(create_journal_entry))
}

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/v1/journal", get(list_journal_entries))
        .route("/v1/journal/stats", get(journal_stats))
        .route(
            "/v1/journal/{entry_id}",
            get(get_journal_entry).delete(delete_journal_entry),
        )
}

/// Trim and bound a submitted draft. Returns the cleaned draft that is analyzed and stored.
pub(crate) fn validate_draft(draft: JournalEntryDraft) -> Result<JournalEntryDraft, AppError> {
    let content = draft.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation {
            message: "content must not be empty".to_string(),
            field: Some("content".to_string()),
            received: Some(Value::String(draft.content.clone())),
            docs_hint: Some("Write at least a few words about how you feel.".to_string()),
        });
    }
    let content_chars = content.chars().count();
    if content_chars > MAX_CONTENT_CHARS {
        return Err(AppError::Validation {
            message: format!("content must be <= {MAX_CONTENT_CHARS} characters"),
            field: Some("content".to_string()),
            received: Some(json!(content_chars)),
            docs_hint: Some("Split very long reflections into several entries.".to_string()),
        });
    }

    let title = draft
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty());
    if let Some(title) = title {
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(AppError::validation(
                "title",
                format!("title must be <= {MAX_TITLE_CHARS} characters"),
            ));
        }
    }

    let selected_tags = normalize_tags(&draft.selected_tags);
    if selected_tags.len() > MAX_TAGS {
        return Err(AppError::Validation {
            message: format!("at most {MAX_TAGS} mood tags are allowed"),
            field: Some("selected_tags".to_string()),
            received: Some(json!(selected_tags.len())),
            docs_hint: None,
        });
    }
    if let Some(tag) = selected_tags
        .iter()
        .find(|tag| tag.chars().count() > MAX_TAG_CHARS)
    {
        return Err(AppError::Validation {
            message: format!("mood tags must be <= {MAX_TAG_CHARS} characters"),
            field: Some("selected_tags".to_string()),
            received: Some(Value::String(tag.clone())),
            docs_hint: None,
        });
    }

    Ok(JournalEntryDraft {
        title: title.map(str::to_string),
        content: content.to_string(),
        selected_tags,
    })
}

/// Submit a journal entry
///
/// The entry is analyzed by the text-generation service before it is stored.
/// Analysis never blocks submission: when the service fails, the entry is
/// stored with the fallback analysis and `analysis.source = "fallback"`.
#[utoipa::path(
    post,
    path = "/v1/journal",
    request_body = JournalEntryDraft,
    responses(
        (status = 201, description = "Entry stored with its analysis", body = JournalEntry),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing caller identity", body = ApiError)
    ),
    params(
        ("x-user-id" = String, Header, description = "Caller's user id, set by the auth gateway")
    ),
    tag = "journal"
)]
pub async fn create_journal_entry(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    AppJson(req): AppJson<JournalEntryDraft>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = auth.user_id;
    let draft = validate_draft(req)?;
    let analysis = analyze_entry(state.generator.as_ref(), &draft).await;

    let entry_id = Uuid::now_v7();
    let mut tx = begin_user_scope(&state.db, user_id).await?;

    let row = sqlx::query_as::<_, JournalEntryRow>(&format!(
        r#"
        INSERT INTO journal_entries (
            id, user_id, title, content, selected_tags,
            emotions, energy_level, insights, analysis_source
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {ENTRY_COLUMNS}
        "#
    ))
    .bind(entry_id)
    .bind(user_id)
    .bind(&draft.title)
    .bind(&draft.content)
    .bind(json!(draft.selected_tags))
    .bind(json!(analysis.result.emotions))
    .bind(i32::from(analysis.result.energy_level))
    .bind(&analysis.result.insights)
    .bind(analysis.source.as_str())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        entry_id = %entry_id,
        analysis_source = analysis.source.as_str(),
        "Journal entry created"
    );

    Ok((StatusCode::CREATED, Json(row.into_entry())))
}

/// Query parameters for listing journal entries
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListJournalParams {
    /// Only entries created at or after this timestamp
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Only entries created before this timestamp
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of entries to return (default 20, max 100)
    #[serde(default)]
    pub limit: Option<i64>,
    /// Cursor from a previous response's next_cursor
    #[serde(default)]
    pub cursor: Option<String>,
}

/// List the caller's journal entries, newest first
#[utoipa::path(
    get,
    path = "/v1/journal",
    params(
        ListJournalParams,
        ("x-user-id" = String, Header, description = "Caller's user id, set by the auth gateway")
    ),
    responses(
        (status = 200, description = "Paginated list of entries", body = PaginatedResponse<JournalEntry>),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing caller identity", body = ApiError)
    ),
    tag = "journal"
)]
pub async fn list_journal_entries(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Query(params): Query<ListJournalParams>,
) -> Result<Json<PaginatedResponse<JournalEntry>>, AppError> {
    let user_id = auth.user_id;
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    // Fetch one extra to determine has_more
    let fetch_limit = limit + 1;

    let cursor = params.cursor.as_deref().map(decode_cursor).transpose()?;

    let mut tx = begin_user_scope(&state.db, user_id).await?;

    let rows = sqlx::query_as::<_, JournalEntryRow>(&format!(
        r#"
        SELECT {ENTRY_COLUMNS}
        FROM journal_entries
        WHERE user_id = $1
          AND ($2::timestamptz IS NULL OR (created_at, id) < ($2, $3))
          AND ($4::timestamptz IS NULL OR created_at >= $4)
          AND ($5::timestamptz IS NULL OR created_at < $5)
        ORDER BY created_at DESC, id DESC
        LIMIT $6
        "#
    ))
    .bind(user_id)
    .bind(cursor.as_ref().map(|c| c.created_at))
    .bind(cursor.as_ref().map(|c| c.id))
    .bind(params.since)
    .bind(params.until)
    .bind(fetch_limit)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    let has_more = rows.len() as i64 > limit;
    let entries: Vec<JournalEntry> = rows
        .into_iter()
        .take(limit as usize)
        .map(JournalEntryRow::into_entry)
        .collect();

    let next_cursor = if has_more {
        entries
            .last()
            .map(|entry| encode_cursor(&entry.created_at, &entry.id))
    } else {
        None
    };

    Ok(Json(PaginatedResponse {
        data: entries,
        next_cursor,
        has_more,
    }))
}

/// Fetch one of the caller's journal entries
#[utoipa::path(
    get,
    path = "/v1/journal/{entry_id}",
    params(
        ("entry_id" = Uuid, Path, description = "Journal entry id"),
        ("x-user-id" = String, Header, description = "Caller's user id, set by the auth gateway")
    ),
    responses(
        (status = 200, description = "Journal entry", body = JournalEntry),
        (status = 401, description = "Missing caller identity", body = ApiError),
        (status = 404, description = "Entry not found", body = ApiError)
    ),
    tag = "journal"
)]
pub async fn get_journal_entry(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<JournalEntry>, AppError> {
    let user_id = auth.user_id;
    let mut tx = begin_user_scope(&state.db, user_id).await?;

    let row = sqlx::query_as::<_, JournalEntryRow>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = $1 AND user_id = $2"
    ))
    .bind(entry_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    tx.commit().await?;

    match row {
        Some(row) => Ok(Json(row.into_entry())),
        None => Err(AppError::NotFound {
            resource: format!("journal entry {entry_id}"),
        }),
    }
}

/// Delete one of the caller's journal entries
#[utoipa::path(
    delete,
    path = "/v1/journal/{entry_id}",
    params(
        ("entry_id" = Uuid, Path, description = "Journal entry id"),
        ("x-user-id" = String, Header, description = "Caller's user id, set by the auth gateway")
    ),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 401, description = "Missing caller identity", body = ApiError),
        (status = 404, description = "Entry not found", body = ApiError)
    ),
    tag = "journal"
)]
pub async fn delete_journal_entry(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user_id = auth.user_id;
    let mut tx = begin_user_scope(&state.db, user_id).await?;

    let deleted = sqlx::query("DELETE FROM journal_entries WHERE id = $1 AND user_id = $2")
        .bind(entry_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    if deleted == 0 {
        return Err(AppError::NotFound {
            resource: format!("journal entry {entry_id}"),
        });
    }

    tracing::info!(user_id = %user_id, entry_id = %entry_id, "Journal entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct JournalStatsParams {
    /// Window size in days, counting back from now (default 30, max 365)
    #[serde(default)]
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JournalStatsResponse {
    pub days: i64,
    pub since: DateTime<Utc>,
    #[serde(flatten)]
    pub stats: MoodStats,
}

/// Mood statistics over the caller's recent entries
#[utoipa::path(
    get,
    path = "/v1/journal/stats",
    params(
        JournalStatsParams,
        ("x-user-id" = String, Header, description = "Caller's user id, set by the auth gateway")
    ),
    responses(
        (status = 200, description = "Mood statistics", body = JournalStatsResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing caller identity", body = ApiError)
    ),
    tag = "journal"
)]
pub async fn journal_stats(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Query(params): Query<JournalStatsParams>,
) -> Result<Json<JournalStatsResponse>, AppError> {
    let user_id = auth.user_id;
    let days = validate_stats_days(params.days)?;
    let since = Utc::now() - Duration::days(days);

    let mut tx = begin_user_scope(&state.db, user_id).await?;

    let rows = sqlx::query_as::<_, MoodSampleRow>(
        r#"
        SELECT selected_tags, emotions, energy_level, insights
        FROM journal_entries
        WHERE user_id = $1
          AND created_at >= $2
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    let samples: Vec<MoodSample> = rows.into_iter().map(MoodSampleRow::into_sample).collect();

    Ok(Json(JournalStatsResponse {
        days,
        since,
        stats: summarize(&samples),
    }))
}

fn validate_stats_days(raw: Option<i64>) -> Result<i64, AppError> {
    let days = raw.unwrap_or(DEFAULT_STATS_DAYS);
    if !(1..=MAX_STATS_DAYS).contains(&days) {
        return Err(AppError::Validation {
            message: format!("days must be between 1 and {MAX_STATS_DAYS}"),
            field: Some("days".to_string()),
            received: Some(json!(days)),
            docs_hint: None,
        });
    }
    Ok(days)
}

/// Most recent model-written insights for the caller, newest first.
pub(crate) async fn recent_insights(
    pool: &sqlx::PgPool,
    user_id: Uuid,
    limit: usize,
) -> Result<Vec<String>, AppError> {
    let mut tx = begin_user_scope(pool, user_id).await?;

    let insights = sqlx::query_scalar::<_, String>(
        r#"
        SELECT insights
        FROM journal_entries
        WHERE user_id = $1
          AND analysis_source = 'model'
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit as i64)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(insights)
}

/// Cursor is base64("created_at\0id"), opaque to the client
fn encode_cursor(created_at: &DateTime<Utc>, id: &Uuid) -> String {
    use base64::Engine;
    let raw = format!("{}\0{}", created_at.to_rfc3339(), id);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

#[derive(Debug, PartialEq)]
struct CursorData {
    created_at: DateTime<Utc>,
    id: Uuid,
}

fn invalid_cursor(cursor: &str) -> AppError {
    AppError::Validation {
        message: "Invalid cursor".to_string(),
        field: Some("cursor".to_string()),
        received: Some(Value::String(cursor.to_string())),
        docs_hint: Some("Use the next_cursor value from a previous response".to_string()),
    }
}

fn decode_cursor(cursor: &str) -> Result<CursorData, AppError> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| invalid_cursor(cursor))?;
    let decoded = String::from_utf8(bytes).map_err(|_| invalid_cursor(cursor))?;

    let (timestamp, id) = decoded
        .split_once('\0')
        .ok_or_else(|| invalid_cursor(cursor))?;

    let created_at = DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| invalid_cursor(cursor))?;
    let id = Uuid::parse_str(id).map_err(|_| invalid_cursor(cursor))?;

    Ok(CursorData { created_at, id })
}

fn parse_tag_array(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Read stored analysis columns back through the normalizer so a damaged row
/// still yields a valid result.
fn stored_analysis(emotions: Value, energy_level: i32, insights: String) -> AnalysisResult {
    normalize(&AnalysisCandidate {
        emotions,
        energy_level: Value::from(energy_level),
        insights: Value::String(insights),
    })
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct JournalEntryRow {
    id: Uuid,
    user_id: Uuid,
    title: Option<String>,
    content: String,
    selected_tags: Value,
    emotions: Value,
    energy_level: i32,
    insights: String,
    analysis_source: String,
    created_at: DateTime<Utc>,
}

impl JournalEntryRow {
    fn into_entry(self) -> JournalEntry {
        JournalEntry {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            selected_tags: parse_tag_array(&self.selected_tags),
            analysis: AnalysisOutcome {
                result: stored_analysis(self.emotions, self.energy_level, self.insights),
                source: AnalysisSource::from_stored(&self.analysis_source),
            },
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MoodSampleRow {
    selected_tags: Value,
    emotions: Value,
    energy_level: i32,
    insights: String,
}

impl MoodSampleRow {
    fn into_sample(self) -> MoodSample {
        MoodSample {
            selected_tags: parse_tag_array(&self.selected_tags),
            analysis: stored_analysis(self.emotions, self.energy_level, self.insights),
        }
    }
}
