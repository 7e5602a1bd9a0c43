pub mod analyze;
pub mod health;
pub mod insight;
pub mod journal;
pub mod preview;
