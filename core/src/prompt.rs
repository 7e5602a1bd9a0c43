//! Prompt templates for the text-generation service.
//!
//! The analysis prompt's inline JSON example is what [`crate::extract`] expects
//! back on the happy path; keep the two in sync.

use crate::insight::MoodInsightRequest;
use crate::journal::JournalEntryDraft;

pub const UNTITLED: &str = "Untitled";
pub const NO_TAGS: &str = "None";
pub const MAX_MEMORY_ITEMS: usize = 5;
const MAX_MEMORY_CHARS: usize = 280;

pub fn build_analysis_prompt(entry: &JournalEntryDraft) -> String {
    let title = entry
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(UNTITLED);
    let tags = if entry.selected_tags.is_empty() {
        NO_TAGS.to_string()
    } else {
        entry.selected_tags.join(", ")
    };

    format!(
        r#"Analyze the following journal entry and respond with ONLY a JSON object in exactly this format:
{{
  "emotions": {{"joy": 40, "calm": 35, "anxiety": 25}},
  "energy_level": 65,
  "insights": "One or two supportive sentences about the writer's emotional state."
}}

Rules:
- "emotions" maps emotion names to percentages that add up to 100
- "energy_level" is an integer from 0 (exhausted) to 100 (highly energized)
- "insights" is warm, specific to the entry, and never judgmental

Journal entry:
Title: {title}
Content: {content}
Selected moods: {tags}

Respond with the JSON object only. Do not add explanations, markdown, or code fences."#,
        content = entry.content.trim(),
    )
}

/// Build the narrative prompt. `memory` holds recent entry insights, newest first.
pub fn build_mood_insight_prompt(req: &MoodInsightRequest, memory: &[String]) -> String {
    let period = req
        .period
        .as_deref()
        .map(str::trim)
        .filter(|period| !period.is_empty())
        .unwrap_or("recent days");
    let summary = if req.mood_summary.is_empty() {
        "No moods recorded".to_string()
    } else {
        req.mood_summary
            .iter()
            .map(|(mood, count)| format!("{mood}: {count}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let dominant = req
        .dominant_mood
        .as_deref()
        .map(str::trim)
        .filter(|mood| !mood.is_empty())
        .unwrap_or("unknown");

    let mut prompt = format!(
        "You are a supportive wellbeing companion. Write a short, warm insight (2-3 sentences) \
about this person's mood patterns over the {period}.\n\n\
Mood summary: {summary}\n\
Total moods logged: {total}\n\
Most frequent mood: {dominant}\n",
        total = req.total_moods,
    );

    if !memory.is_empty() {
        prompt.push_str("\nRecent reflections from their journal:\n");
        for item in memory.iter().take(MAX_MEMORY_ITEMS) {
            let clipped: String = item.trim().chars().take(MAX_MEMORY_CHARS).collect();
            prompt.push_str("- ");
            prompt.push_str(&clipped);
            prompt.push('\n');
        }
    }

    prompt.push_str("\nRespond in plain text only. Do not use lists, headings, or JSON.");
    prompt
}
