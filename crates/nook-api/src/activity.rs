use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Rate-limits `last_active_at` writes to one per user per interval.
pub struct ActivityThrottle {
    interval: Duration,
    last_write: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl ActivityThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_write: Mutex::new(HashMap::new()),
        }
    }

    /// True when a write is due; the attempt is recorded immediately so
    /// concurrent requests do not all write.
    pub fn should_touch(&self, user_id: Uuid, now: DateTime<Utc>) -> bool {
        let mut last_write = self.last_write.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match last_write.get(&user_id) {
            Some(&at) if now - at < self.interval => false,
            _ => {
                last_write.insert(user_id, now);
                true
            }
        }
    }

    /// Forgets users whose last write is at least one interval old; their next
    /// request writes again either way.
    pub fn purge(&self, now: DateTime<Utc>) -> usize {
        let mut last_write = self.last_write.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = last_write.len();
        last_write.retain(|_, at| now - *at < self.interval);
        before - last_write.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_write_per_window() {
        let throttle = ActivityThrottle::new(Duration::minutes(5));
        let user = Uuid::new_v4();
        let t0 = Utc::now();

        assert!(throttle.should_touch(user, t0));
        assert!(!throttle.should_touch(user, t0 + Duration::minutes(4)));
        assert!(throttle.should_touch(user, t0 + Duration::minutes(5)));
        // Other users are tracked separately.
        assert!(throttle.should_touch(Uuid::new_v4(), t0));
    }

    #[test]
    fn purge_forgets_only_stale_users() {
        let throttle = ActivityThrottle::new(Duration::minutes(5));
        let t0 = Utc::now();
        let stale = Uuid::new_v4();
        let recent = Uuid::new_v4();
        throttle.should_touch(stale, t0);
        throttle.should_touch(recent, t0 + Duration::minutes(3));

        assert_eq!(throttle.purge(t0 + Duration::minutes(6)), 1);
        assert!(!throttle.should_touch(recent, t0 + Duration::minutes(6)));
        assert!(throttle.should_touch(stale, t0 + Duration::minutes(6)));
    }
}
