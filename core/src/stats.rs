use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::analysis::AnalysisResult;
use crate::insight::MoodInsightRequest;

/// The parts of a journal entry that mood statistics read.
#[derive(Debug, Clone)]
pub struct MoodSample {
    pub analysis: AnalysisResult,
    pub selected_tags: Vec<String>,
}

/// Aggregated mood statistics over a set of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MoodStats {
    pub total_entries: i64,
    /// Mean energy level, one decimal. None when there are no entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_energy: Option<f64>,
    /// Emotion -> summed weight across entries
    pub emotion_totals: BTreeMap<String, f64>,
    /// Emotion -> number of entries where it was the strongest emotion
    pub mood_summary: BTreeMap<String, i64>,
    /// Selected tag -> number of entries carrying it
    pub tag_counts: BTreeMap<String, i64>,
    /// Emotion with the highest summed weight
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_mood: Option<String>,
}

impl MoodStats {
    /// Chain statistics into a narrative insight request.
    pub fn to_insight_request(&self, period: Option<String>) -> MoodInsightRequest {
        MoodInsightRequest {
            mood_summary: self.mood_summary.clone(),
            total_moods: self.total_entries,
            dominant_mood: self.dominant_mood.clone(),
            period,
            disable_memory: None,
        }
    }
}

pub fn summarize(samples: &[MoodSample]) -> MoodStats {
    let mut emotion_totals = BTreeMap::<String, f64>::new();
    let mut mood_summary = BTreeMap::<String, i64>::new();
    let mut tag_counts = BTreeMap::<String, i64>::new();
    let mut energy_sum = 0.0;

    for sample in samples {
        energy_sum += f64::from(sample.analysis.energy_level);
        for (emotion, weight) in &sample.analysis.emotions {
            *emotion_totals.entry(emotion.clone()).or_default() += weight;
        }
        if let Some(strongest) = sample.analysis.strongest_emotion() {
            *mood_summary.entry(strongest.to_string()).or_default() += 1;
        }
        for tag in &sample.selected_tags {
            *tag_counts.entry(tag.clone()).or_default() += 1;
        }
    }

    let average_energy = if samples.is_empty() {
        None
    } else {
        Some(round_to_one(energy_sum / samples.len() as f64))
    };

    // BTreeMap order makes the first maximum the alphabetically smallest label.
    let dominant_mood = emotion_totals
        .iter()
        .fold(None::<(&String, f64)>, |best, (emotion, total)| match best {
            Some((_, best_total)) if *total <= best_total => best,
            _ => Some((emotion, *total)),
        })
        .map(|(emotion, _)| emotion.clone());

    MoodStats {
        total_entries: samples.len() as i64,
        average_energy,
        emotion_totals,
        mood_summary,
        tag_counts,
        dominant_mood,
    }
}

fn round_to_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
