//! Auth gateway: HS256 tokens carrying `{id, role, exp}`.
//!
//! [`Authenticated`] pulls the caller out of `Authorization: Bearer <token>`, falling back to a
//! `?token=` query parameter for WebSocket clients that cannot set headers.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::http::header::AUTHORIZATION;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use konsul_core::{AuthUser, KonsulError, Result, Role};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: String,
    role: Role,
    exp: i64,
}

#[derive(Clone)]
pub struct AuthGateway {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl AuthGateway {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn issue(&self, user: &AuthUser, ttl: Duration) -> Result<String> {
        let claims = Claims {
            id: user.id.clone(),
            role: user.role,
            exp: (Utc::now() + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| KonsulError::Unknown(format!("failed to sign token: {}", e)))
    }

    /// Fails with `Unauthorized` for a bad signature, an expired token or unknown claims.
    pub fn verify(&self, token: &str) -> Result<AuthUser> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "token rejected");
            KonsulError::Unauthorized("invalid token".into())
        })?;
        Ok(AuthUser::new(data.claims.id, data.claims.role))
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token)
    })
}

/// Extractor for the authenticated caller.
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::Unauthorized("missing token".into()))?;
        let user = state.auth.verify(token.trim())?;
        Ok(Authenticated(user))
    }
}
