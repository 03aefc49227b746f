use crate::error::AppError;
use crate::models::message::Message;
use sqlx::{Pool, Postgres};

pub struct MessageService;

impl MessageService {
    /// Insert a message; the database assigns `id` and `timestamp`.
    pub async fn create(
        db: &Pool<Postgres>,
        sender_id: i64,
        receiver_id: i64,
        body: &str,
    ) -> Result<Message, AppError> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (sender_id, receiver_id, message)
            VALUES ($1, $2, $3)
            RETURNING id, sender_id, receiver_id, message, timestamp, is_read
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(body)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::Database(format!("insert message failed: {}", e)))
    }

    /// Messages between two users in either direction, ascending by
    /// persist timestamp, ties broken by id. When the cap applies it
    /// keeps the newest rows; a fresh send is always visible.
    pub async fn history_between(
        db: &Pool<Postgres>,
        a: i64,
        b: i64,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, message, timestamp, is_read
            FROM (
                SELECT id, sender_id, receiver_id, message, timestamp, is_read
                FROM messages
                WHERE (sender_id = $1 AND receiver_id = $2)
                   OR (sender_id = $2 AND receiver_id = $1)
                ORDER BY timestamp DESC, id DESC
                LIMIT $3
            ) recent
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(limit)
        .fetch_all(db)
        .await
        .map_err(|e| AppError::Database(format!("history query failed: {}", e)))
    }

    /// Mark a message as read. Only the receiver may do this; repeated
    /// calls are idempotent no-ops.
    pub async fn mark_read(
        db: &Pool<Postgres>,
        message_id: i64,
        requester_id: i64,
    ) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE messages SET is_read = TRUE WHERE id = $1 AND receiver_id = $2")
                .bind(message_id)
                .bind(requester_id)
                .execute(db)
                .await
                .map_err(|e| AppError::Database(format!("mark_read failed: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }
}
