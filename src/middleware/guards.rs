use std::sync::Arc;

use axum::{extract::FromRequestParts, http::header};
use uuid::Uuid;

use crate::{
    auth::{Caller, jwt::decode_token},
    error::AppError,
    state::AppState,
};

// Auth guard: verify the bearer token and resolve the caller.
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(caller) = parts.extensions.get::<Caller>().cloned() {
            return Ok(caller);
        }

        let auth = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        let token = auth
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("Missing/invalid Authorization header"))?;

        let claims = decode_token(&state.jwt, token, state.token_leeway_secs).map_err(|err| {
            tracing::debug!(error = %err, "bearer token rejected");
            AppError::unauthorized("Invalid or expired token")
        })?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

        let caller = Caller {
            user_id,
            email: claims.email,
        };
        parts.extensions.insert(caller.clone());
        Ok(caller)
    }
}
