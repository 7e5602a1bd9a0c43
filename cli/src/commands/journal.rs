use clap::Subcommand;
use serde_json::json;

use crate::util::{api_request, exit_error, read_text};

#[derive(Subcommand)]
pub enum JournalCommands {
    /// Write a journal entry; the server analyzes it before storing
    Create {
        /// Entry title
        #[arg(long)]
        title: Option<String>,
        /// Entry text
        #[arg(long, required_unless_present = "content_file")]
        content: Option<String>,
        /// Read entry text from file (use '-' for stdin)
        #[arg(long, short = 'f', conflicts_with = "content")]
        content_file: Option<String>,
        /// Mood tag chosen by the writer (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List entries, newest first
    List {
        /// Maximum number of entries to return
        #[arg(long)]
        limit: Option<u32>,
        /// Pagination cursor from previous response
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Show one entry
    Get {
        /// Entry ID
        id: String,
    },
    /// Delete one entry
    Delete {
        /// Entry ID
        id: String,
    },
    /// Mood statistics over recent entries
    Stats {
        /// Window size in days (1-365)
        #[arg(long)]
        days: Option<u32>,
    },
}

pub async fn run(api_url: &str, user_id: &str, command: JournalCommands) -> i32 {
    match command {
        JournalCommands::Create {
            title,
            content,
            content_file,
            tags,
        } => {
            let content = match (content, content_file) {
                (Some(c), _) => c,
                (None, Some(path)) => match read_text(&path) {
                    Ok(text) => text,
                    Err(e) => exit_error(&e, None),
                },
                (None, None) => exit_error(
                    "Entry content is required",
                    Some("Use --content or --content-file"),
                ),
            };
            let body = draft_body(title.as_deref(), &content, &tags);
            api_request(
                api_url,
                reqwest::Method::POST,
                "/v1/journal",
                Some(user_id),
                Some(body),
                &[],
            )
            .await
        }
        JournalCommands::List { limit, cursor } => {
            let mut query = Vec::new();
            if let Some(l) = limit {
                query.push(("limit".to_string(), l.to_string()));
            }
            if let Some(c) = cursor {
                query.push(("cursor".to_string(), c));
            }
            api_request(
                api_url,
                reqwest::Method::GET,
                "/v1/journal",
                Some(user_id),
                None,
                &query,
            )
            .await
        }
        JournalCommands::Get { id } => {
            api_request(
                api_url,
                reqwest::Method::GET,
                &format!("/v1/journal/{id}"),
                Some(user_id),
                None,
                &[],
            )
            .await
        }
        JournalCommands::Delete { id } => {
            api_request(
                api_url,
                reqwest::Method::DELETE,
                &format!("/v1/journal/{id}"),
                Some(user_id),
                None,
                &[],
            )
            .await
        }
        JournalCommands::Stats { days } => {
            api_request(
                api_url,
                reqwest::Method::GET,
                "/v1/journal/stats",
                Some(user_id),
                None,
                &stats_query(days),
            )
            .await
        }
    }
}

pub(crate) fn draft_body(title: Option<&str>, content: &str, tags: &[String]) -> serde_json::Value {
    let mut body = json!({
        "content": content,
        "selected_tags": tags,
    });
    if let Some(t) = title {
        body["title"] = json!(t);
    }
    body
}

pub(crate) fn stats_query(days: Option<u32>) -> Vec<(String, String)> {
    days.map(|d| vec![("days".to_string(), d.to_string())])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_body_omits_missing_title() {
        let body = draft_body(None, "Slept well.", &["rested".to_string()]);
        assert_eq!(body, json!({"content": "Slept well.", "selected_tags": ["rested"]}));
    }

    #[test]
    fn draft_body_carries_title() {
        let body = draft_body(Some("Sunday"), "Long walk.", &[]);
        assert_eq!(body["title"], "Sunday");
        assert_eq!(body["selected_tags"], json!([]));
    }

    #[test]
    fn stats_query_only_sends_days_when_given() {
        assert!(stats_query(None).is_empty());
        assert_eq!(stats_query(Some(7)), vec![("days".to_string(), "7".to_string())]);
    }
}
