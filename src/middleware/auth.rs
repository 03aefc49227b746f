//! Bearer-token authentication shared by the REST and WebSocket
//! surfaces. The identity service issues HS256 access tokens whose
//! `sub` claim carries the user id.

use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, Error, FromRequest, HttpRequest};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id as a decimal string.
    pub sub: String,
    /// Expiration time (unix timestamp).
    pub exp: i64,
}

/// Validate token signature and expiry, returning the claims.
pub fn verify_jwt(secret: &str, token: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

/// Resolve the numeric user id out of validated claims.
pub fn user_id_from_claims(claims: &Claims) -> Result<i64, AppError> {
    claims.sub.parse::<i64>().map_err(|_| AppError::Unauthorized)
}

pub(crate) fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Authenticated caller resolved from the request's bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub id: i64,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let result = (|| {
            let state = req
                .app_data::<web::Data<AppState>>()
                .ok_or_else(|| AppError::StartServer("app state missing".into()))?;
            let token = bearer_token(req).ok_or(AppError::Unauthorized)?;
            let claims = verify_jwt(&state.config.jwt_secret, &token)?;
            let id = user_id_from_claims(&claims)?;
            Ok::<_, AppError>(AuthenticatedUser { id })
        })();

        ready(result.map_err(Error::from))
    }
}
