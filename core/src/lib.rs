//! Domain core for Moodlog: turning free-form model output into a validated
//! mood analysis, plus the journal types shared by the API and CLI.

pub mod analysis;
pub mod error;
pub mod extract;
pub mod insight;
pub mod journal;
pub mod prompt;
pub mod stats;
