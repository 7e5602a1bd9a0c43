use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::AppError;

/// Begin a transaction whose row-level-security context is pinned to `user_id`.
///
/// Queries must still filter by `user_id`; the RLS policy is the second fence.
pub async fn begin_user_scope(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT set_config('moodlog.current_user_id', $1, true)")
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}
