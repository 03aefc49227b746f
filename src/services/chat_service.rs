use crate::error::AppError;
use crate::models::message::Message;
use crate::services::message_service::MessageService;
use crate::services::relationship_service::RelationshipService;
use crate::websocket::message_types::DeliveryFrame;
use crate::websocket::ConnectionRegistry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Postgres};

/// Returned to the sender after a successful send.
#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    pub message_id: i64,
    pub timestamp: DateTime<Utc>,
}

pub struct ChatService;

impl ChatService {
    /// Send a message: authorize, persist, then push best-effort.
    ///
    /// Persistence strictly precedes the delivery attempt, so a pushed
    /// message is always already retrievable via history. A failed push
    /// never fails the send.
    pub async fn send(
        db: &Pool<Postgres>,
        registry: &ConnectionRegistry,
        sender_id: i64,
        receiver_id: i64,
        body: &str,
    ) -> Result<SendReceipt, AppError> {
        if sender_id == receiver_id {
            return Err(AppError::SelfMessage);
        }
        if body.trim().is_empty() {
            return Err(AppError::BadRequest("message must not be empty".into()));
        }
        if !RelationshipService::are_mutuals(db, sender_id, receiver_id).await? {
            return Err(AppError::Forbidden);
        }

        let message = MessageService::create(db, sender_id, receiver_id, body).await?;

        Self::push_delivery(registry, &message);

        Ok(SendReceipt {
            message_id: message.id,
            timestamp: message.timestamp,
        })
    }

    /// Best-effort live delivery to the receiver's channel. A missing
    /// or broken channel is fine; the message is durable and shows up
    /// in history.
    fn push_delivery(registry: &ConnectionRegistry, message: &Message) {
        let frame = DeliveryFrame {
            sender_id: message.sender_id,
            message: message.message.clone(),
            timestamp: message.timestamp.to_rfc3339(),
        };

        match serde_json::to_string(&frame) {
            Ok(payload) => {
                if !registry.push(message.receiver_id, payload) {
                    tracing::debug!(
                        receiver_id = message.receiver_id,
                        message_id = message.id,
                        "receiver not connected, skipping live delivery"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, message_id = message.id, "failed to serialize delivery frame");
            }
        }
    }

    /// Ordered history with another user. Mutuality is re-checked on
    /// every call rather than cached from an earlier authorization.
    pub async fn history(
        db: &Pool<Postgres>,
        requester_id: i64,
        other_id: i64,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        if !RelationshipService::are_mutuals(db, requester_id, other_id).await? {
            return Err(AppError::Forbidden);
        }
        MessageService::history_between(db, requester_id, other_id, limit).await
    }

    /// Mark a received message as read, with the requester as the
    /// authorization principal.
    pub async fn mark_read(
        db: &Pool<Postgres>,
        message_id: i64,
        requester_id: i64,
    ) -> Result<(), AppError> {
        MessageService::mark_read(db, message_id, requester_id).await
    }
}
