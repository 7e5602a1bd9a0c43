use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analysis::AnalysisOutcome;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_CONTENT_CHARS: usize = 20_000;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_CHARS: usize = 40;

/// A journal entry as submitted by the writer, before analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct JournalEntryDraft {
    /// Optional title; prompts use "Untitled" when absent
    #[serde(default)]
    pub title: Option<String>,
    /// Entry body. Required and non-blank.
    pub content: String,
    /// Discrete mood tags picked by the writer (e.g. "happy", "tired")
    #[serde(default, alias = "selectedTags")]
    pub selected_tags: Vec<String>,
}

/// A stored journal entry with its mood analysis.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JournalEntry {
    /// Entry ID (UUIDv7, time-sortable)
    pub id: Uuid,
    /// Owner of this entry
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    pub selected_tags: Vec<String>,
    /// Analysis computed at submission time. Never updated afterwards.
    pub analysis: AnalysisOutcome,
    pub created_at: DateTime<Utc>,
}

/// Cursor-based pagination
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    /// Cursor for the next page. None if this is the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Whether there are more results after this page
    pub has_more: bool,
}

/// Trim, lowercase and de-duplicate tags, dropping blanks. Order of first appearance is kept.
pub fn normalize_tags(values: &[String]) -> Vec<String> {
    let mut out = Vec::<String>::new();
    for raw in values {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            continue;
        }
        if out.iter().any(|item| item == &normalized) {
            continue;
        }
        out.push(normalized);
    }
    out
}
