use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

pub const DEFAULT_EMOTION: &str = "reflective";
pub const DEFAULT_EMOTION_WEIGHT: f64 = 100.0;
pub const DEFAULT_ENERGY_LEVEL: u8 = 50;
pub const MAX_ENERGY_LEVEL: u8 = 100;

/// Supportive message used whenever no usable insight could be recovered.
pub const DEFAULT_INSIGHT: &str = "Thank you for taking a moment to reflect today. \
Writing down how you feel is a meaningful step toward understanding yourself.";

/// Untrusted analysis as recovered from model output.
///
/// Fields keep whatever JSON the model produced (`null` when absent); nothing is
/// validated until [`normalize`] runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisCandidate {
    pub emotions: Value,
    pub energy_level: Value,
    pub insights: Value,
}

impl AnalysisCandidate {
    /// Lift a parsed JSON document into a candidate. Non-object documents carry no fields.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut fields) => {
                let snake = fields.remove("energy_level").filter(|v| !v.is_null());
                let camel = fields.remove("energyLevel").filter(|v| !v.is_null());
                let energy_level = snake.or(camel).unwrap_or(Value::Null);
                Self {
                    emotions: fields.remove("emotions").unwrap_or(Value::Null),
                    energy_level,
                    insights: fields.remove("insights").unwrap_or(Value::Null),
                }
            }
            _ => Self::default(),
        }
    }

    /// The fixed fallback record, in candidate form.
    pub fn fallback() -> Self {
        AnalysisResult::fallback().into_candidate()
    }
}

/// Validated mood analysis attached to a journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    /// Emotion label -> weight. Never empty. Weights are reported as produced.
    pub emotions: BTreeMap<String, f64>,
    /// Energy on a 0-100 scale
    pub energy_level: u8,
    /// Short supportive observation. Never blank.
    pub insights: String,
}

impl AnalysisResult {
    pub fn fallback() -> Self {
        Self {
            emotions: default_emotions(),
            energy_level: DEFAULT_ENERGY_LEVEL,
            insights: DEFAULT_INSIGHT.to_string(),
        }
    }

    /// Re-express this result as an untrusted candidate (e.g. a stored row read back).
    pub fn into_candidate(self) -> AnalysisCandidate {
        let emotions: Map<String, Value> = self
            .emotions
            .into_iter()
            .map(|(label, weight)| (label, Value::from(weight)))
            .collect();
        AnalysisCandidate {
            emotions: Value::Object(emotions),
            energy_level: Value::from(self.energy_level),
            insights: Value::String(self.insights),
        }
    }

    /// Emotion with the highest weight; ties go to the alphabetically first label.
    pub fn strongest_emotion(&self) -> Option<&str> {
        self.emotions
            .iter()
            .fold(None::<(&String, f64)>, |best, (label, weight)| match best {
                Some((_, best_weight)) if *weight <= best_weight => best,
                _ => Some((label, *weight)),
            })
            .map(|(label, _)| label.as_str())
    }
}

/// Where an entry's analysis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    /// Extracted from a text-generation response (possibly repaired)
    Model,
    /// The generator was unavailable; the fixed fallback was used
    Fallback,
}

impl AnalysisSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Fallback => "fallback",
        }
    }

    /// Parse a stored value. Unknown values read as `Fallback`.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "model" => Self::Model,
            _ => Self::Fallback,
        }
    }
}

/// Analysis plus its provenance, as produced by one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisOutcome {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub source: AnalysisSource,
}

impl AnalysisOutcome {
    pub fn fallback() -> Self {
        Self {
            result: AnalysisResult::fallback(),
            source: AnalysisSource::Fallback,
        }
    }
}

fn default_emotions() -> BTreeMap<String, f64> {
    BTreeMap::from([(DEFAULT_EMOTION.to_string(), DEFAULT_EMOTION_WEIGHT)])
}

/// Validate a candidate field by field, substituting defaults for anything unusable.
///
/// Total and pure: every input yields a result, and one invalid field never
/// discards the others.
pub fn normalize(candidate: &AnalysisCandidate) -> AnalysisResult {
    AnalysisResult {
        emotions: normalize_emotions(&candidate.emotions).unwrap_or_else(default_emotions),
        energy_level: normalize_energy_level(&candidate.energy_level)
            .unwrap_or(DEFAULT_ENERGY_LEVEL),
        insights: normalize_insights(&candidate.insights)
            .unwrap_or_else(|| DEFAULT_INSIGHT.to_string()),
    }
}

fn normalize_emotions(value: &Value) -> Option<BTreeMap<String, f64>> {
    // Non-numeric weights have no representation in the result map.
    let weights: BTreeMap<String, f64> = value
        .as_object()?
        .iter()
        .filter_map(|(label, weight)| weight.as_f64().map(|w| (label.clone(), w)))
        .collect();
    (!weights.is_empty()).then_some(weights)
}

fn normalize_energy_level(value: &Value) -> Option<u8> {
    let level = value.as_f64()?;
    if !(0.0..=f64::from(MAX_ENERGY_LEVEL)).contains(&level) {
        return None;
    }
    Some(level.round() as u8)
}

fn normalize_insights(value: &Value) -> Option<String> {
    let trimmed = value.as_str()?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(value: Value) -> AnalysisCandidate {
        AnalysisCandidate::from_value(value)
    }

    #[test]
    fn valid_candidate_passes_through() {
        let result = normalize(&candidate(json!({
            "emotions": {"joy": 60, "calm": 40},
            "energy_level": 72,
            "insights": "You sound settled."
        })));
        assert_eq!(result.emotions.get("joy"), Some(&60.0));
        assert_eq!(result.emotions.get("calm"), Some(&40.0));
        assert_eq!(result.energy_level, 72);
        assert_eq!(result.insights, "You sound settled.");
    }

    #[test]
    fn out_of_range_energy_defaults_without_touching_other_fields() {
        let result = normalize(&candidate(json!({
            "emotions": {"anxious": 90},
            "energy_level": 150,
            "insights": "Big week ahead."
        })));
        assert_eq!(result.energy_level, DEFAULT_ENERGY_LEVEL);
        assert_eq!(result.emotions.get("anxious"), Some(&90.0));
        assert_eq!(result.insights, "Big week ahead.");
    }

    #[test]
    fn energy_bounds_are_inclusive() {
        assert_eq!(normalize(&candidate(json!({"energy_level": 0}))).energy_level, 0);
        assert_eq!(normalize(&candidate(json!({"energy_level": 100}))).energy_level, 100);
        assert_eq!(normalize(&candidate(json!({"energy_level": -1}))).energy_level, 50);
        assert_eq!(normalize(&candidate(json!({"energy_level": 100.5}))).energy_level, 50);
    }

    #[test]
    fn fractional_energy_is_rounded() {
        assert_eq!(normalize(&candidate(json!({"energy_level": 64.6}))).energy_level, 65);
    }

    #[test]
    fn numeric_string_energy_is_rejected() {
        let result = normalize(&candidate(json!({"energy_level": "70"})));
        assert_eq!(result.energy_level, DEFAULT_ENERGY_LEVEL);
    }

    #[test]
    fn camel_case_energy_key_is_recognized() {
        let result = normalize(&candidate(json!({"energyLevel": 33})));
        assert_eq!(result.energy_level, 33);
    }

    #[test]
    fn null_snake_case_energy_defers_to_camel_case() {
        let result = normalize(&candidate(json!({
            "emotions": {"joy": 80},
            "energy_level": null,
            "energyLevel": 70,
            "insights": "y"
        })));
        assert_eq!(result.energy_level, 70);

        let both = AnalysisCandidate::from_value(json!({"energy_level": 20, "energyLevel": 70}));
        assert_eq!(both.energy_level, json!(20));
    }

    #[test]
    fn empty_or_non_object_emotions_use_default() {
        for emotions in [json!({}), json!([]), json!("happy"), Value::Null] {
            let result = normalize(&candidate(json!({ "emotions": emotions })));
            assert_eq!(result.emotions, default_emotions());
        }
    }

    #[test]
    fn non_numeric_weights_are_dropped() {
        let result = normalize(&candidate(json!({
            "emotions": {"joy": "lots", "hope": 20}
        })));
        assert_eq!(result.emotions.len(), 1);
        assert_eq!(result.emotions.get("hope"), Some(&20.0));

        let all_bad = normalize(&candidate(json!({"emotions": {"joy": "lots"}})));
        assert_eq!(all_bad.emotions, default_emotions());
    }

    #[test]
    fn weights_are_not_range_checked() {
        let result = normalize(&candidate(json!({"emotions": {"joy": 250, "sad": -10}})));
        assert_eq!(result.emotions.get("joy"), Some(&250.0));
        assert_eq!(result.emotions.get("sad"), Some(&-10.0));
    }

    #[test]
    fn insights_are_trimmed_or_defaulted() {
        let trimmed = normalize(&candidate(json!({"insights": "  Rest well.\n"})));
        assert_eq!(trimmed.insights, "Rest well.");

        for insights in [json!("   "), json!(42), json!(["a"]), Value::Null] {
            let result = normalize(&candidate(json!({ "insights": insights })));
            assert_eq!(result.insights, DEFAULT_INSIGHT);
        }
    }

    #[test]
    fn empty_candidate_normalizes_to_fallback() {
        assert_eq!(normalize(&AnalysisCandidate::default()), AnalysisResult::fallback());
        assert_eq!(normalize(&AnalysisCandidate::fallback()), AnalysisResult::fallback());
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            json!({"emotions": {"joy": 80}, "energy_level": 64.6, "insights": " ok "}),
            json!({"energy_level": 150}),
            json!(null),
            json!({"emotions": {"calm": 12.5, "tired": "x"}, "insights": ""}),
        ];
        for input in inputs {
            let once = normalize(&candidate(input));
            let twice = normalize(&once.clone().into_candidate());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn strongest_emotion_prefers_weight_then_name() {
        let mut result = AnalysisResult::fallback();
        result.emotions = BTreeMap::from([
            ("calm".to_string(), 40.0),
            ("joy".to_string(), 40.0),
            ("sad".to_string(), 20.0),
        ]);
        assert_eq!(result.strongest_emotion(), Some("calm"));
    }

    #[test]
    fn source_round_trips_through_storage_text() {
        assert_eq!(AnalysisSource::from_stored(AnalysisSource::Model.as_str()), AnalysisSource::Model);
        assert_eq!(AnalysisSource::from_stored("fallback"), AnalysisSource::Fallback);
        assert_eq!(AnalysisSource::from_stored("garbage"), AnalysisSource::Fallback);
    }
}
