//! Prompt -> generate -> extract -> normalize, with the fallback substituted
//! whenever the generator fails. Nothing here returns an error.

use moodlog_core::analysis::{AnalysisOutcome, AnalysisSource, normalize};
use moodlog_core::extract::{ExtractionStrategy, extract_with_strategy};
use moodlog_core::insight::{MoodInsightRequest, MoodInsightResponse};
use moodlog_core::journal::JournalEntryDraft;
use moodlog_core::prompt::{build_analysis_prompt, build_mood_insight_prompt};

use crate::generation::TextGenerator;

pub async fn analyze_entry(generator: &dyn TextGenerator, entry: &JournalEntryDraft) -> AnalysisOutcome {
    let prompt = build_analysis_prompt(entry);

    let raw = match generator.generate(&prompt).await {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(
                generator = generator.name(),
                error = %err,
                "Entry analysis unavailable, using fallback"
            );
            return AnalysisOutcome::fallback();
        }
    };

    let (candidate, strategy) = extract_with_strategy(&raw);
    let result = normalize(&candidate);
    let source = match strategy {
        ExtractionStrategy::Empty => AnalysisSource::Fallback,
        _ => AnalysisSource::Model,
    };

    tracing::debug!(
        generator = generator.name(),
        strategy = strategy.as_str(),
        response_chars = raw.chars().count(),
        emotions = result.emotions.len(),
        energy_level = result.energy_level,
        "Entry analysis extracted"
    );

    AnalysisOutcome { result, source }
}

/// Narrative insight over mood statistics. `memory` holds recent entry insights.
pub async fn narrate_mood_insight(
    generator: &dyn TextGenerator,
    req: &MoodInsightRequest,
    memory: &[String],
) -> MoodInsightResponse {
    let prompt = build_mood_insight_prompt(req, memory);

    match generator.generate(&prompt).await {
        Ok(raw) => MoodInsightResponse::from_model_output(&raw),
        Err(err) => {
            tracing::warn!(
                generator = generator.name(),
                error = %err,
                "Mood insight unavailable, using fallback"
            );
            MoodInsightResponse::fallback()
        }
    }
}
