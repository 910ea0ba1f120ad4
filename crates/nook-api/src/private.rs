//! The PIN state machine for the private partition: setup, unlock, change,
//! lock and status.
//!
//! A user starts with no PIN. `setup` stores the first hash exactly once and
//! counts as an unlock; rotation only goes through `change_pin`, which always
//! drops the current unlock session. This module is the only writer of the
//! unlock session registry.

use axum::{Extension, Json, extract::State};
use tracing::{info, warn};
use uuid::Uuid;

use nook_db::Database;
use nook_types::api::{ChangePinRequest, Claims, PrivateStatus, SetupPinRequest, UnlockRequest};

use crate::error::{ApiResult, AppError, Success, done};
use crate::extract::JsonBody;
use crate::pin::{PinHasher, validate_new_pin};
use crate::sessions::PrivateAccess;
use crate::state::{AppState, blocking};

/// Per-user persistence of the private PIN hash.
pub trait CredentialStore: Send + Sync {
    fn pin_hash(&self, user_id: Uuid) -> anyhow::Result<Option<String>>;

    /// Stores the first hash. `Ok(false)` when one is already set.
    fn set_initial_pin_hash(&self, user_id: Uuid, hash: &str) -> anyhow::Result<bool>;

    /// Replaces an existing hash. `Ok(false)` when none is set.
    fn replace_pin_hash(&self, user_id: Uuid, hash: &str) -> anyhow::Result<bool>;
}

impl CredentialStore for Database {
    fn pin_hash(&self, user_id: Uuid) -> anyhow::Result<Option<String>> {
        self.private_pin_hash(user_id)
    }

    fn set_initial_pin_hash(&self, user_id: Uuid, hash: &str) -> anyhow::Result<bool> {
        self.init_private_pin_hash(user_id, hash)
    }

    fn replace_pin_hash(&self, user_id: Uuid, hash: &str) -> anyhow::Result<bool> {
        self.replace_private_pin_hash(user_id, hash)
    }
}

pub struct PinProtocol<'a> {
    creds: &'a dyn CredentialStore,
    hasher: &'a PinHasher,
    access: &'a PrivateAccess,
}

impl<'a> PinProtocol<'a> {
    pub fn new(creds: &'a dyn CredentialStore, hasher: &'a PinHasher, access: &'a PrivateAccess) -> Self {
        Self { creds, hasher, access }
    }

    pub fn status(&self, user_id: Uuid) -> ApiResult<PrivateStatus> {
        let has_password = self.creds.pin_hash(user_id)?.is_some();
        let expires_at = self.access.expires_at(user_id);
        Ok(PrivateStatus {
            has_password,
            unlocked: expires_at.is_some(),
            expires_at,
        })
    }

    pub fn setup(&self, user_id: Uuid, pin: &str, confirm: &str) -> ApiResult<PrivateStatus> {
        validate_new_pin(pin, confirm)?;
        if self.creds.pin_hash(user_id)?.is_some() {
            return Err(AppError::conflict("pin already set"));
        }

        let hash = self.hasher.hash(pin)?;
        // The conditional write settles a race between two first-time setups.
        if !self.creds.set_initial_pin_hash(user_id, &hash)? {
            return Err(AppError::conflict("pin already set"));
        }

        let expires_at = self.access.grant(user_id);
        info!(%user_id, "Private pin configured");
        Ok(PrivateStatus {
            has_password: true,
            unlocked: true,
            expires_at: Some(expires_at),
        })
    }

    pub fn unlock(&self, user_id: Uuid, pin: &str) -> ApiResult<PrivateStatus> {
        let hash = self
            .creds
            .pin_hash(user_id)?
            .ok_or_else(|| AppError::conflict("pin not set"))?;

        if !self.hasher.verify(pin, &hash)? {
            warn!(%user_id, "Rejected private unlock: wrong pin");
            return Err(AppError::validation("pin incorrect"));
        }

        let expires_at = self.access.grant(user_id);
        info!(%user_id, %expires_at, "Private partition unlocked");
        Ok(PrivateStatus {
            has_password: true,
            unlocked: true,
            expires_at: Some(expires_at),
        })
    }

    pub fn change_pin(
        &self,
        user_id: Uuid,
        old_pin: &str,
        new_pin: &str,
        confirm_new_pin: &str,
    ) -> ApiResult<()> {
        let hash = self
            .creds
            .pin_hash(user_id)?
            .ok_or_else(|| AppError::conflict("pin not set"))?;

        if !self.hasher.verify(old_pin, &hash)? {
            warn!(%user_id, "Rejected pin change: wrong old pin");
            return Err(AppError::validation("old pin incorrect"));
        }
        validate_new_pin(new_pin, confirm_new_pin)?;

        let new_hash = self.hasher.hash(new_pin)?;
        if !self.creds.replace_pin_hash(user_id, &new_hash)? {
            return Err(AppError::conflict("pin not set"));
        }

        self.access.revoke(user_id);
        info!(%user_id, "Private pin changed; session revoked");
        Ok(())
    }

    pub fn lock(&self, user_id: Uuid) {
        self.access.revoke(user_id);
        info!(%user_id, "Private partition locked");
    }
}

// -- Handlers --

pub async fn get_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Success<PrivateStatus>> {
    let status = blocking(&state, move |s| s.pin_protocol().status(claims.sub)).await?;
    Ok(Success(status))
}

pub async fn setup(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<SetupPinRequest>,
) -> ApiResult<Success<PrivateStatus>> {
    let status = blocking(&state, move |s| {
        s.pin_protocol().setup(claims.sub, &req.pin, &req.confirm)
    })
    .await?;
    Ok(Success(status))
}

pub async fn unlock(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<UnlockRequest>,
) -> ApiResult<Success<PrivateStatus>> {
    let status = blocking(&state, move |s| s.pin_protocol().unlock(claims.sub, &req.pin)).await?;
    Ok(Success(status))
}

pub async fn lock(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Json<serde_json::Value> {
    state.pin_protocol().lock(claims.sub);
    done()
}

pub async fn change_pin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<ChangePinRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    blocking(&state, move |s| {
        s.pin_protocol()
            .change_pin(claims.sub, &req.old_pin, &req.new_pin, &req.confirm_new_pin)
    })
    .await?;
    Ok(done())
}
