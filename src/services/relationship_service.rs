use crate::error::AppError;
use sqlx::{Pool, Postgres};

/// Read-only view over the externally-owned `follows` table.
pub struct RelationshipService;

impl RelationshipService {
    /// Check if `follower_id` follows `following_id`.
    pub async fn is_following(
        db: &Pool<Postgres>,
        follower_id: i64,
        following_id: i64,
    ) -> Result<bool, AppError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2 LIMIT 1",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(db)
        .await
        .map_err(|e| AppError::Database(format!("is_following check failed: {}", e)))?;

        Ok(row.is_some())
    }

    /// Check if two users follow each other.
    ///
    /// Two independent point lookups, not a single atomic read. An edge
    /// created concurrently with the check may be observed
    /// inconsistently; at worst one message is rejected and the client
    /// retries.
    pub async fn are_mutuals(db: &Pool<Postgres>, a: i64, b: i64) -> Result<bool, AppError> {
        Ok(Self::is_following(db, a, b).await? && Self::is_following(db, b, a).await?)
    }
}
