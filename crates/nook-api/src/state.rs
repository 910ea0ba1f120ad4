use std::sync::Arc;

use anyhow::anyhow;
use chrono::Duration;
use tracing::error;

use nook_db::Database;

use crate::activity::ActivityThrottle;
use crate::auth::CodeStore;
use crate::config::Config;
use crate::error::{ApiResult, AppError};
use crate::pin::PinHasher;
use crate::private::PinProtocol;
use crate::sessions::{MemoryUnlockStore, PrivateAccess};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub pins: PinHasher,
    pub private: PrivateAccess,
    pub codes: CodeStore,
    pub activity: ActivityThrottle,
}

impl AppStateInner {
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt_secret.clone(),
            token_ttl: config.token_ttl,
            pins: PinHasher::default(),
            private: PrivateAccess::new(Arc::new(MemoryUnlockStore::new()), config.unlock_ttl),
            codes: CodeStore::new(config.code_ttl),
            activity: ActivityThrottle::new(config.activity_throttle),
        }
    }

    /// Swaps the PIN hasher, e.g. for one with cheaper Argon2 costs.
    pub fn with_hasher(mut self, pins: PinHasher) -> Self {
        self.pins = pins;
        self
    }

    pub fn pin_protocol(&self) -> PinProtocol<'_> {
        PinProtocol::new(&self.db, &self.pins, &self.private)
    }
}

/// Runs DB or hashing work off the async runtime.
pub(crate) async fn blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&AppStateInner) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(anyhow!("blocking task failed"))
        })?
}
