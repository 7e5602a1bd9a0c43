//! Offline extraction: runs the same extract and normalize steps the server
//! applies to model output, without a network call.

use clap::Args;
use serde_json::json;

use moodlog_core::analysis::normalize;
use moodlog_core::extract::extract_with_strategy;

use crate::util::{exit_error, pretty, read_text};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Raw model output to analyze
    #[arg(long, required_unless_present = "file")]
    text: Option<String>,
    /// Read raw model output from file (use '-' for stdin)
    #[arg(long, short = 'f', conflicts_with = "text")]
    file: Option<String>,
}

pub fn run(args: AnalyzeArgs) -> i32 {
    let raw = match (args.text, args.file) {
        (Some(t), _) => t,
        (None, Some(path)) => read_text(&path).unwrap_or_else(|e| exit_error(&e, None)),
        (None, None) => exit_error("Nothing to analyze", Some("Use --text or --file")),
    };

    println!("{}", pretty(&analyze(&raw)));
    0
}

fn analyze(raw: &str) -> serde_json::Value {
    let (candidate, strategy) = extract_with_strategy(raw);
    let result = normalize(&candidate);
    tracing::debug!(strategy = strategy.as_str(), "Extracted analysis");
    json!({
        "strategy": strategy.as_str(),
        "analysis": result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_json_is_recovered() {
        let output = analyze(
            "Sure! {\"emotions\":{\"joy\":0.8},\"energy_level\":64,\"insights\":\"Keep going.\"} Hope that helps.",
        );
        assert_eq!(output["strategy"], "embedded");
        assert_eq!(output["analysis"]["energy_level"], 64);
        assert_eq!(output["analysis"]["insights"], "Keep going.");
    }

    #[test]
    fn empty_input_yields_the_default_analysis() {
        let output = analyze("   ");
        assert_eq!(output["strategy"], "empty");
        assert_eq!(output["analysis"]["energy_level"], 50);
        assert_eq!(output["analysis"]["emotions"]["reflective"], 100.0);
    }
}
