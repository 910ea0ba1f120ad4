use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;

use nook_types::api::Claims;

use crate::error::AppError;
use crate::state::AppState;

/// Extract and validate the JWT from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("invalid or expired token".into()))?;

    record_activity(&state, &token_data.claims);
    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// Private Access Guard for the private surface. Runs after `require_auth`.
pub async fn require_unlocked(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = req
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    state.private.ensure_unlocked(user_id)?;
    Ok(next.run(req).await)
}

/// Throttled, fire-and-forget `last_active_at` update. Failures never reach
/// the request.
fn record_activity(state: &AppState, claims: &Claims) {
    let user_id = claims.sub;
    let now = Utc::now();
    if !state.activity.should_touch(user_id, now) {
        return;
    }
    let state = state.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = state.db.touch_last_active(user_id, now) {
            warn!(%user_id, "Failed to update last_active_at: {:#}", e);
        }
    });
}
