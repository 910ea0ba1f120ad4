//! Passwordless sign-in with emailed one-time codes.
//!
//! Mail delivery is not wired up: issued codes are written to the log.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use axum::{Json, extract::State};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use nook_db::{Database, UserRow};
use nook_types::api::{Claims, RequestCodeRequest, VerifyCodeRequest, VerifyCodeResponse};

use crate::error::{ApiResult, AppError, Success, done};
use crate::extract::JsonBody;
use crate::state::{AppState, AppStateInner, blocking};

/// Wrong guesses allowed before a pending code is thrown away.
pub const MAX_CODE_ATTEMPTS: u32 = 5;

struct PendingCode {
    code: String,
    expires_at: DateTime<Utc>,
    attempts: u32,
}

/// Outstanding verification codes keyed by normalized email.
pub struct CodeStore {
    ttl: Duration,
    pending: Mutex<HashMap<String, PendingCode>>,
}

impl CodeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, PendingCode>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Generates a fresh 6-digit code for `email`, replacing any earlier one.
    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> String {
        let code = rand::rng().random_range(100_000..1_000_000u32).to_string();
        let mut pending = self.pending();
        pending.retain(|_, p| now <= p.expires_at);
        pending.insert(
            email.to_string(),
            PendingCode {
                code: code.clone(),
                expires_at: now + self.ttl,
                attempts: 0,
            },
        );
        code
    }

    /// Consumes the code on a match. Expired codes are dropped; a code that
    /// keeps being guessed wrong is dropped after [`MAX_CODE_ATTEMPTS`].
    pub fn redeem(&self, email: &str, code: &str, now: DateTime<Utc>) -> ApiResult<()> {
        let mut pending = self.pending();
        let Some(entry) = pending.get_mut(email) else {
            return Err(AppError::Unauthorized("code not found or expired".into()));
        };

        if now > entry.expires_at {
            pending.remove(email);
            return Err(AppError::Unauthorized("code expired".into()));
        }

        if entry.code != code {
            entry.attempts += 1;
            if entry.attempts >= MAX_CODE_ATTEMPTS {
                pending.remove(email);
                warn!(%email, "Verification code discarded after too many attempts");
            }
            return Err(AppError::Unauthorized("code incorrect".into()));
        }

        pending.remove(email);
        Ok(())
    }

    /// The outstanding code for `email`, for tooling that stands in for mail
    /// delivery.
    pub fn pending_code(&self, email: &str) -> Option<String> {
        self.pending().get(email).map(|p| p.code.clone())
    }

    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut pending = self.pending();
        let before = pending.len();
        pending.retain(|_, p| now <= p.expires_at);
        before - pending.len()
    }
}

pub fn normalize_email(raw: &str) -> ApiResult<String> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::validation("invalid email address")),
    }
}

pub fn create_token(secret: &str, ttl: Duration, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Finds or creates the account and makes sure it has its starter folders.
fn sign_in(db: &Database, email: &str) -> ApiResult<UserRow> {
    let now = Utc::now();
    let user = match db.get_user_by_email(email)? {
        Some(user) => user,
        None => {
            let id = Uuid::new_v4();
            db.create_user(id, email, now)?;
            info!(user_id = %id, %email, "Created account");
            db.get_user_by_id(id)?
                .ok_or_else(|| anyhow::anyhow!("user {id} vanished after insert"))?
        }
    };

    if db.count_folders(user.id)? == 0 {
        db.seed_default_folders(user.id)?;
    }
    db.touch_last_active(user.id, now)?;
    Ok(user)
}

pub fn verify_code(state: &AppStateInner, email: &str, code: &str) -> ApiResult<String> {
    let email = normalize_email(email)?;
    if let Err(e) = state.codes.redeem(&email, code.trim(), Utc::now()) {
        warn!(%email, "Rejected verification code");
        return Err(e);
    }
    let user = sign_in(&state.db, &email)?;
    Ok(create_token(&state.jwt_secret, state.token_ttl, user.id, &user.email)?)
}

// -- Handlers --

pub async fn request_code(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RequestCodeRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let email = normalize_email(&req.email)?;
    let code = state.codes.issue(&email, Utc::now());
    info!(%email, %code, "Verification code issued");
    Ok(done())
}

pub async fn verify(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<VerifyCodeRequest>,
) -> ApiResult<Success<VerifyCodeResponse>> {
    let access_token = blocking(&state, move |s| verify_code(s, &req.email, &req.code)).await?;
    Ok(Success(VerifyCodeResponse { access_token }))
}
