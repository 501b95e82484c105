//! Request identity: a verified account or an anonymous device

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

/// Header carrying the anonymous device id
pub const DEVICE_ID_HEADER: &str = "x-device-id";

/// JWT claims for account authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountClaims {
    /// Account ID
    pub sub: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Who is calling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(String),
    Anonymous(String),
}

impl Identity {
    pub fn account_id(&self) -> Option<&str> {
        match self {
            Identity::Authenticated(id) => Some(id),
            Identity::Anonymous(_) => None,
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        match self {
            Identity::Anonymous(id) => Some(id),
            Identity::Authenticated(_) => None,
        }
    }
}

const JWT_EXPIRY_HOURS: i64 = 24;

/// Create a JWT token for an account
pub fn create_token(account_id: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = AccountClaims {
        sub: account_id.to_string(),
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Resolve the caller from request headers
///
/// A bearer token must verify; without one the device header (if any) is used.
pub fn resolve(headers: &HeaderMap, secret: &str) -> Result<Option<Identity>, AppError> {
    if let Some(auth_header) = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::invalid_token("Invalid Authorization format"))?;

        let token_data = jsonwebtoken::decode::<AccountClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!("JWT validation failed: {e}");
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::new(ErrorCode::TokenExpired),
                _ => AppError::invalid_token("Invalid token"),
            }
        })?;

        return Ok(Some(Identity::Authenticated(token_data.claims.sub)));
    }

    Ok(headers
        .get(DEVICE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Identity::Anonymous(s.to_string())))
}

/// Middleware inserting `Option<Identity>` into request extensions
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve(request.headers(), &state.jwt_secret) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
