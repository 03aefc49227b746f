use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("you cannot send a message to yourself")]
    SelfMessage,

    #[error("unauthorized")]
    Unauthorized,

    #[error("you can only message users who follow you back")]
    Forbidden,

    #[error("message not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl AppError {
    /// Returns HTTP status code
    pub fn status(&self) -> u16 {
        match self {
            AppError::BadRequest(_) | AppError::SelfMessage => 400,
            AppError::Unauthorized => 401,
            AppError::Forbidden => 403,
            AppError::NotFound => 404,
            AppError::Config(_) | AppError::StartServer(_) | AppError::Database(_) => 500,
        }
    }

    /// Message safe to return to clients. Storage failures are reported
    /// without the underlying driver detail.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) => "message could not be stored".to_string(),
            AppError::Config(_) | AppError::StartServer(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(ResponseError::status_code(self))
            .json(serde_json::json!({ "error": self.public_message() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_outcomes_map_to_client_statuses() {
        assert_eq!(AppError::SelfMessage.status(), 400);
        assert_eq!(AppError::BadRequest("empty".into()).status(), 400);
        assert_eq!(AppError::Unauthorized.status(), 401);
        assert_eq!(AppError::Forbidden.status(), 403);
        assert_eq!(AppError::NotFound.status(), 404);
    }

    #[test]
    fn storage_failures_are_server_errors_without_detail() {
        let err = AppError::Database("connection refused on 10.0.0.5".into());
        assert_eq!(err.status(), 500);
        assert!(!err.public_message().contains("10.0.0.5"));
    }
}
