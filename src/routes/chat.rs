use crate::error::AppError;
use crate::middleware::auth::AuthenticatedUser;
use crate::services::chat_service::ChatService;
use crate::state::AppState;
use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: i64,
    pub message: String,
}

/// Send a direct message.
/// POST /chat/send
#[post("/send")]
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let receipt = ChatService::send(
        &state.db,
        &state.registry,
        user.id,
        body.receiver_id,
        &body.message,
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "sent",
        "messageId": receipt.message_id,
    })))
}

/// Ordered message history with another user.
/// GET /chat/history/{other_id}
#[get("/history/{other_id}")]
pub async fn get_history(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let other_id = path.into_inner();
    let messages =
        ChatService::history(&state.db, user.id, other_id, state.config.history_limit).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "messages": messages })))
}

/// Mark a received message as read.
/// POST /chat/mark_read/{message_id}
#[post("/mark_read/{message_id}")]
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let message_id = path.into_inner();
    ChatService::mark_read(&state.db, message_id, user.id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "message marked as read" })))
}
