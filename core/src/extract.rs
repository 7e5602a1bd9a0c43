//! Recovery of a structured analysis from free-form model output.
//!
//! Text-generation services do not reliably honor "respond with JSON only", so
//! extraction falls through progressively looser strategies and always ends with
//! *some* candidate. Validation is left to [`crate::analysis::normalize`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::analysis::{AnalysisCandidate, DEFAULT_ENERGY_LEVEL, DEFAULT_INSIGHT};

static ENERGY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\benergy[\s_-]*level["']?\s*[:=]?\s*(\d+)\b"#).expect("valid energy regex")
});

// Tried strictly in this order; the first non-blank capture wins.
static INSIGHT_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r#"(?i)\binsights?["']?\s*[:=-]\s*["“]([^"”]*)["”]"#)
            .expect("valid quoted insight regex"),
        Regex::new(r#"(?im)\binsights?["']?(?:\s*[:=-]\s*|\s+)([^"“\s][^\n]*?(?:[.!?]|$))"#)
            .expect("valid sentence insight regex"),
        Regex::new(r#"(?i)\banalysis["']?\s*[:=-]\s*["“]([^"”]*)["”]"#)
            .expect("valid quoted analysis regex"),
        Regex::new(r#"(?im)\banalysis["']?(?:\s*[:=-]\s*|\s+)([^"“\s][^\n]*?(?:[.!?]|$))"#)
            .expect("valid sentence analysis regex"),
    ]
});

/// Which strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// The whole response parsed as JSON
    Direct,
    /// A `{...}` span inside the response parsed as JSON
    Embedded,
    /// Fields were scraped from prose
    Heuristic,
    /// There was no text to work with
    Empty,
}

impl ExtractionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Embedded => "embedded",
            Self::Heuristic => "heuristic",
            Self::Empty => "empty",
        }
    }
}

/// Best-effort candidate for `raw`. Never fails.
pub fn extract(raw: &str) -> AnalysisCandidate {
    extract_with_strategy(raw).0
}

/// Like [`extract`], also reporting which strategy succeeded.
pub fn extract_with_strategy(raw: &str) -> (AnalysisCandidate, ExtractionStrategy) {
    if raw.trim().is_empty() {
        return (AnalysisCandidate::fallback(), ExtractionStrategy::Empty);
    }

    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return (AnalysisCandidate::from_value(value), ExtractionStrategy::Direct);
    }

    if let Some(value) = embedded_object(raw) {
        return (AnalysisCandidate::from_value(value), ExtractionStrategy::Embedded);
    }

    (scrape_fields(raw), ExtractionStrategy::Heuristic)
}

/// Parse the span from the first `{` to the last `}`.
fn embedded_object(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

fn scrape_fields(raw: &str) -> AnalysisCandidate {
    let energy_level = scrape_energy_level(raw).unwrap_or(i64::from(DEFAULT_ENERGY_LEVEL));
    let insights = scrape_insight(raw).unwrap_or_else(|| DEFAULT_INSIGHT.to_string());

    AnalysisCandidate {
        emotions: Value::Object(Map::new()),
        energy_level: Value::from(energy_level),
        insights: Value::String(insights),
    }
}

fn scrape_energy_level(raw: &str) -> Option<i64> {
    ENERGY_RE
        .captures(raw)?
        .get(1)?
        .as_str()
        .parse::<i64>()
        .ok()
}

fn scrape_insight(raw: &str) -> Option<String> {
    INSIGHT_PATTERNS.iter().find_map(|pattern| {
        let captured = pattern.captures(raw)?.get(1)?.as_str().trim();
        (!captured.is_empty()).then(|| captured.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisResult, normalize};
    use serde_json::json;

    #[test]
    fn well_formed_document_is_returned_unchanged() {
        let raw = r#"{"emotions":{"joy":55,"calm":45},"energy_level":68,"insights":"Steady and hopeful."}"#;
        let (candidate, strategy) = extract_with_strategy(raw);
        assert_eq!(strategy, ExtractionStrategy::Direct);
        assert_eq!(candidate.emotions, json!({"joy": 55, "calm": 45}));
        assert_eq!(candidate.energy_level, json!(68));
        assert_eq!(candidate.insights, json!("Steady and hopeful."));
    }

    #[test]
    fn direct_parse_keeps_wrong_types_for_the_normalizer() {
        let candidate = extract(r#"{"emotions":[],"energy_level":"high"}"#);
        assert_eq!(candidate.emotions, json!([]));
        assert_eq!(candidate.energy_level, json!("high"));
        assert_eq!(candidate.insights, Value::Null);
    }

    #[test]
    fn non_object_json_yields_an_empty_candidate() {
        let (candidate, strategy) = extract_with_strategy(r#""energy level: 35""#);
        assert_eq!(strategy, ExtractionStrategy::Direct);
        assert_eq!(candidate, AnalysisCandidate::default());
    }

    #[test]
    fn embedded_object_is_recovered_from_commentary() {
        let raw = "Sure! {\"emotions\":{\"joy\":80},\"energy_level\":70,\"insights\":\"Great day.\"} Hope that helps.";
        let (candidate, strategy) = extract_with_strategy(raw);
        assert_eq!(strategy, ExtractionStrategy::Embedded);
        assert_eq!(candidate.emotions, json!({"joy": 80}));
        assert_eq!(candidate.energy_level, json!(70));
        assert_eq!(candidate.insights, json!("Great day."));
    }

    #[test]
    fn fenced_code_block_is_recovered() {
        let raw = "```json\n{\n  \"emotions\": {\"tired\": 70, \"content\": 30},\n  \"energy_level\": 25,\n  \"insights\": \"Rest is earned.\"\n}\n```";
        let (candidate, strategy) = extract_with_strategy(raw);
        assert_eq!(strategy, ExtractionStrategy::Embedded);
        assert_eq!(candidate.energy_level, json!(25));
    }

    #[test]
    fn embedded_span_is_greedy_to_the_last_brace() {
        // First `{` to last `}` covers both objects, which is not valid JSON.
        let raw = r#"Option A {"energy_level": 10} or option B {"energy_level": 90}"#;
        let (candidate, strategy) = extract_with_strategy(raw);
        assert_eq!(strategy, ExtractionStrategy::Heuristic);
        assert_eq!(candidate.energy_level, json!(10));
    }

    #[test]
    fn prose_fields_are_scraped() {
        let raw = "Here is what I found. Energy level: 35\ninsights: \"Keep going.\"";
        let (candidate, strategy) = extract_with_strategy(raw);
        assert_eq!(strategy, ExtractionStrategy::Heuristic);
        assert_eq!(candidate.energy_level, json!(35));
        assert_eq!(candidate.insights, json!("Keep going."));
        assert_eq!(candidate.emotions, json!({}));
    }

    #[test]
    fn broken_json_still_yields_scraped_fields() {
        let raw = r#"{"emotions": {"joy": 80,, "energy_level": 42, "insights": "Nice momentum."}"#;
        let candidate = extract(raw);
        assert_eq!(candidate.energy_level, json!(42));
        assert_eq!(candidate.insights, json!("Nice momentum."));
    }

    #[test]
    fn unquoted_insight_takes_the_first_sentence() {
        let candidate = extract("Insight: you handled a hard day well. Tomorrow may be lighter.");
        assert_eq!(candidate.insights, json!("you handled a hard day well."));
    }

    #[test]
    fn unquoted_insight_may_follow_plain_whitespace() {
        let candidate = extract("insight you are doing fine. More later.");
        assert_eq!(candidate.insights, json!("you are doing fine."));
    }

    #[test]
    fn insight_patterns_keep_their_precedence() {
        // A quoted insight beats an earlier unquoted one.
        let quoted_wins = extract("insight: first sentence here.\ninsights: \"Quoted wins.\"");
        assert_eq!(quoted_wins.insights, json!("Quoted wins."));

        // Any insight match beats an analysis match, wherever it appears.
        let insight_wins = extract("Analysis: \"From analysis.\"\nInsight: from insight.");
        assert_eq!(insight_wins.insights, json!("from insight."));

        let analysis_used = extract("Analysis: a calm and focused entry");
        assert_eq!(analysis_used.insights, json!("a calm and focused entry"));
    }

    #[test]
    fn missing_prose_fields_use_defaults() {
        let candidate = extract("I could not analyze this entry, sorry.");
        assert_eq!(candidate.energy_level, json!(50));
        assert_eq!(candidate.insights, json!(DEFAULT_INSIGHT));
        assert_eq!(candidate.emotions, json!({}));
    }

    #[test]
    fn oversized_energy_number_falls_back_to_default() {
        let candidate = extract("energy level: 99999999999999999999999");
        assert_eq!(candidate.energy_level, json!(50));
    }

    #[test]
    fn energy_digits_must_end_at_a_word_boundary() {
        let candidate = extract("energy level: 1e3");
        assert_eq!(candidate.energy_level, json!(50));

        let candidate = extract("energy level: 42, mostly steady");
        assert_eq!(candidate.energy_level, json!(42));
    }

    #[test]
    fn empty_input_is_the_fallback() {
        for raw in ["", "   \n\t"] {
            let (candidate, strategy) = extract_with_strategy(raw);
            assert_eq!(strategy, ExtractionStrategy::Empty);
            assert_eq!(normalize(&candidate), AnalysisResult::fallback());
        }
    }

    #[test]
    fn noise_normalizes_to_the_exact_fallback() {
        for raw in ["\u{0}\u{1}\u{fffd}\u{7f}", "}{", "lorem ipsum", "{{{{", "null", "[1,2,3]"] {
            assert_eq!(normalize(&extract(raw)), AnalysisResult::fallback(), "input: {raw:?}");
        }
    }

    #[test]
    fn extraction_then_normalization_is_total() {
        let inputs = [
            "",
            "{}",
            "energy level: 500",
            "insights: \"   \"",
            r#"{"emotions":{},"energy_level":-3,"insights":""}"#,
            "Sure! {\"emotions\":{\"joy\":80}} trailing",
            "analysis - ",
            "\u{202e}\u{0}",
        ];
        for raw in inputs {
            let result = normalize(&extract(raw));
            assert!(!result.emotions.is_empty(), "input: {raw:?}");
            assert!(result.energy_level <= 100, "input: {raw:?}");
            assert!(!result.insights.is_empty(), "input: {raw:?}");
            assert_eq!(result.insights, result.insights.trim(), "input: {raw:?}");
        }
    }
}
