//! Read/write access to the copy_trades queue. The table is owned by the
//! observer process; this engine reads pending rows and writes back the
//! terminal state on the same row by id.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::CopyTrade;

/// Fetch trades still eligible for execution, oldest first.
pub async fn get_pending_trades(pool: &PgPool, retry_limit: i32) -> anyhow::Result<Vec<CopyTrade>> {
    let trades = sqlx::query_as::<_, CopyTrade>(
        r#"
        SELECT * FROM copy_trades
        WHERE processed = false AND attempts < $1
        ORDER BY observed_at ASC
        "#,
    )
    .bind(retry_limit)
    .fetch_all(pool)
    .await?;

    Ok(trades)
}

/// Record the terminal state of a trade. Once processed is true the row is
/// never picked up by `get_pending_trades` again.
pub async fn mark_processed(pool: &PgPool, id: Uuid, attempts: i32) -> anyhow::Result<()> {
    sqlx::query("UPDATE copy_trades SET processed = true, attempts = $2 WHERE id = $1")
        .bind(id)
        .bind(attempts)
        .execute(pool)
        .await?;

    Ok(())
}
