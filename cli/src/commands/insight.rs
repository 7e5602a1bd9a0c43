use std::collections::BTreeMap;

use clap::Args;
use serde_json::json;

use moodlog_core::insight::MoodInsightRequest;
use moodlog_core::stats::MoodStats;

use crate::commands::journal::stats_query;
use crate::util::{api_request, exit_code_for_status, exit_error, fetch_json, pretty};

#[derive(Args)]
pub struct InsightArgs {
    /// Mood count as mood=count (repeatable)
    #[arg(long = "mood", value_parser = parse_mood_count, conflicts_with = "from_stats")]
    moods: Vec<(String, i64)>,
    /// Most frequent mood; derived from the counts when omitted
    #[arg(long, conflicts_with = "from_stats")]
    dominant: Option<String>,
    /// Period label used in the prompt (e.g. "week")
    #[arg(long)]
    period: Option<String>,
    /// Build the request from the server's mood statistics for the last N days
    #[arg(long, value_name = "DAYS")]
    from_stats: Option<u32>,
    /// Do not include recent journal insights as context
    #[arg(long)]
    no_memory: bool,
}

pub async fn run(api_url: &str, user_id: &str, args: InsightArgs) -> i32 {
    let mut request = match args.from_stats {
        Some(days) => match load_stats(api_url, user_id, days).await {
            Ok(stats) => stats.to_insight_request(args.period.clone()),
            Err(code) => return code,
        },
        None => request_from_counts(args.moods, args.dominant, args.period.clone()),
    };
    if args.no_memory {
        request.disable_memory = Some(true);
    }

    let body = match serde_json::to_value(&request) {
        Ok(v) => v,
        Err(e) => exit_error(&format!("Failed to encode insight request: {e}"), None),
    };

    api_request(
        api_url,
        reqwest::Method::POST,
        "/v1/insights/mood",
        Some(user_id),
        Some(body),
        &[],
    )
    .await
}

async fn load_stats(api_url: &str, user_id: &str, days: u32) -> Result<MoodStats, i32> {
    let (status, body) = fetch_json(
        api_url,
        reqwest::Method::GET,
        "/v1/journal/stats",
        Some(user_id),
        None,
        &stats_query(Some(days)),
    )
    .await
    .map_err(|e| {
        let err = json!({
            "error": "connection_error",
            "message": e,
            "docs_hint": "Is the API server running? Check MOODLOG_API_URL."
        });
        eprintln!("{}", pretty(&err));
        3
    })?;

    let code = exit_code_for_status(status);
    if code != 0 {
        eprintln!("{}", pretty(&body));
        return Err(code);
    }

    serde_json::from_value(body).map_err(|e| {
        eprintln!(
            "{}",
            pretty(&json!({"error": "cli_error", "message": format!("Unexpected stats response: {e}")}))
        );
        2
    })
}

fn request_from_counts(
    moods: Vec<(String, i64)>,
    dominant: Option<String>,
    period: Option<String>,
) -> MoodInsightRequest {
    let mut mood_summary = BTreeMap::new();
    for (mood, count) in moods {
        *mood_summary.entry(mood).or_insert(0) += count;
    }
    let total_moods = mood_summary.values().sum();
    let dominant_mood = dominant.or_else(|| {
        mood_summary
            .iter()
            .fold(None::<(&String, i64)>, |best, (mood, count)| match best {
                Some((_, best_count)) if *count <= best_count => best,
                _ => Some((mood, *count)),
            })
            .map(|(mood, _)| mood.clone())
    });

    MoodInsightRequest {
        mood_summary,
        total_moods,
        dominant_mood,
        period,
        disable_memory: None,
    }
}

fn parse_mood_count(raw: &str) -> Result<(String, i64), String> {
    let (mood, count) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected mood=count, got '{raw}'"))?;
    let mood = mood.trim().to_lowercase();
    if mood.is_empty() {
        return Err("mood name must not be empty".to_string());
    }
    let count: i64 = count
        .trim()
        .parse()
        .map_err(|_| format!("count for '{mood}' must be a whole number"))?;
    if count < 0 {
        return Err(format!("count for '{mood}' must not be negative"));
    }
    Ok((mood, count))
}
