use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::analysis::AnalysisSource;

/// Narrative returned when the text-generation service cannot produce one.
pub const DEFAULT_MOOD_INSIGHT: &str = "Your mood patterns show you are taking meaningful steps \
toward self-awareness. Keep journaling to uncover more about your emotional journey.";

/// Request for a narrative insight over a period of mood tracking.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MoodInsightRequest {
    /// Mood label -> number of times it was recorded
    #[serde(default, alias = "moodSummary")]
    pub mood_summary: BTreeMap<String, i64>,
    /// Total number of moods recorded in the period
    #[serde(default, alias = "totalMoods")]
    pub total_moods: i64,
    /// Most frequently recorded mood
    #[serde(default, alias = "dominantMood")]
    pub dominant_mood: Option<String>,
    /// Human-readable period, e.g. "week" or "last 30 days"
    #[serde(default)]
    pub period: Option<String>,
    /// Skip recent journal insights as prompt context
    #[serde(default, alias = "disableMemory")]
    pub disable_memory: Option<bool>,
}

impl MoodInsightRequest {
    pub fn uses_memory(&self) -> bool {
        !self.disable_memory.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MoodInsightResponse {
    pub insight: String,
    pub source: AnalysisSource,
}

impl MoodInsightResponse {
    pub fn fallback() -> Self {
        Self {
            insight: DEFAULT_MOOD_INSIGHT.to_string(),
            source: AnalysisSource::Fallback,
        }
    }

    /// Treat model output as opaque prose. Blank output degrades to the fallback.
    pub fn from_model_output(raw: &str) -> Self {
        let insight = raw.trim();
        if insight.is_empty() {
            return Self::fallback();
        }
        Self {
            insight: insight.to_string(),
            source: AnalysisSource::Model,
        }
    }
}
