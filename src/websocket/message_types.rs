use serde::{Deserialize, Serialize};

/// Inbound WebSocket frame from client to server.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    pub receiver_id: i64,
    pub message: String,
}

/// Live delivery pushed to the receiver's channel.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryFrame {
    pub sender_id: i64,
    pub message: String,
    /// RFC 3339 persist timestamp.
    pub timestamp: String,
}

/// Send confirmation returned on the sender's own channel.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmationFrame {
    pub message: String,
    pub data: ConfirmationData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmationData {
    pub id: i64,
    pub timestamp: String,
}

impl ConfirmationFrame {
    pub fn sent(id: i64, timestamp: String) -> Self {
        Self {
            message: "sent".to_string(),
            data: ConfirmationData { id, timestamp },
        }
    }
}

/// Inline error frame. Logical errors never close the channel.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
}

impl ErrorFrame {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            error: reason.into(),
        }
    }
}
