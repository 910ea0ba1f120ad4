use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::state::{AppState, AppStateInner};

/// Background task that drops expired unlock sessions, verification codes and
/// stale activity throttle entries.
///
/// Expiry is already enforced on every read; this only keeps the in-memory
/// maps from growing.
pub async fn run_sweep_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;
        sweep_expired(&state);
    }
}

/// Entries removed by one sweep.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Swept {
    pub sessions: usize,
    pub codes: usize,
    pub throttled: usize,
}

pub fn sweep_expired(state: &AppStateInner) -> Swept {
    let now = Utc::now();
    let swept = Swept {
        sessions: state.private.purge_expired(),
        codes: state.codes.purge_expired(now),
        throttled: state.activity.purge(now),
    };
    if swept != Swept::default() {
        debug!(
            "Sweep: dropped {} unlock sessions, {} codes, {} activity entries",
            swept.sessions, swept.codes, swept.throttled
        );
    }
    swept
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use nook_db::Database;
    use uuid::Uuid;

    use super::*;
    use crate::config::Config;

    #[test]
    fn sweep_removes_expired_entries() {
        let config = Config {
            unlock_ttl: Duration::zero(),
            ..Config::default()
        };
        let state = AppStateInner::new(Database::open_in_memory().unwrap(), &config);
        state.private.grant(Uuid::new_v4());
        state.codes.issue("fresh@example.com", Utc::now());
        state.codes.issue("late@example.com", Utc::now() - Duration::hours(1));
        state.activity.should_touch(Uuid::new_v4(), Utc::now() - Duration::hours(1));
        state.activity.should_touch(Uuid::new_v4(), Utc::now());

        let swept = sweep_expired(&state);
        assert_eq!(swept.codes, 1);
        assert_eq!(swept.throttled, 1);
        assert!(state.codes.pending_code("fresh@example.com").is_some());
        assert_eq!(sweep_expired(&state), Swept::default());
    }
}
