use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Message row matching the `messages` table.
///
/// Immutable after insert except for the `is_read` transition, which
/// only the receiver may trigger. `id` and `timestamp` are assigned by
/// the database at persist time and order history.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}
