//! Source of recent journal insights used as context for mood narratives.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::journal::recent_insights;

#[async_trait]
pub trait InsightMemory: Send + Sync {
    /// Up to `limit` model-written insights for `user_id`, newest first.
    async fn recent(&self, user_id: Uuid, limit: usize) -> Result<Vec<String>, AppError>;
}

/// Reads insights stored with entries in Postgres.
pub struct PgInsightMemory {
    pool: PgPool,
}

impl PgInsightMemory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InsightMemory for PgInsightMemory {
    async fn recent(&self, user_id: Uuid, limit: usize) -> Result<Vec<String>, AppError> {
        recent_insights(&self.pool, user_id, limit).await
    }
}
