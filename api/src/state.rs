use std::sync::Arc;

use sqlx::PgPool;

use crate::generation::TextGenerator;
use crate::memory::InsightMemory;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Built once at start-up and shared by every request.
    pub generator: Arc<dyn TextGenerator>,
    pub memory: Arc<dyn InsightMemory>,
}
