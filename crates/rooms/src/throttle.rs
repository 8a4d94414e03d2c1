use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use {
    dashmap::{DashMap, mapref::entry::Entry},
    serenity::all::UserId,
    tempvoice_config::RateLimitConfig,
};

const CLEANUP_EVERY_CHECKS: u64 = 256;

type ThrottleKey = (UserId, &'static str);

/// Sliding-window limiter keyed by `(user, action)`.
///
/// Every attempt is recorded, rejected ones included, so hammering a
/// button keeps the window full.
#[derive(Clone)]
pub struct ActionThrottle {
    max_actions: usize,
    window: Duration,
    hits: Arc<DashMap<ThrottleKey, VecDeque<Instant>>>,
    checks_seen: Arc<AtomicU64>,
}

impl ActionThrottle {
    #[must_use]
    pub fn new(max_actions: usize, window: Duration) -> Self {
        Self {
            max_actions,
            window,
            hits: Arc::new(DashMap::new()),
            checks_seen: Arc::new(AtomicU64::new(0)),
        }
    }

    /// `None` when throttling is disabled.
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Option<Self> {
        config.is_enabled().then(|| {
            Self::new(
                config.max_actions as usize,
                Duration::from_secs(config.window_secs),
            )
        })
    }

    /// Record an attempt; `true` if it is within the limit.
    pub fn check(&self, user_id: UserId, action: &'static str) -> bool {
        self.check_at(user_id, action, Instant::now())
    }

    fn check_at(&self, user_id: UserId, action: &'static str, now: Instant) -> bool {
        let allowed = match self.hits.entry((user_id, action)) {
            Entry::Occupied(mut occupied) => {
                let hits = occupied.get_mut();
                while hits
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.window)
                {
                    hits.pop_front();
                }
                hits.push_back(now);
                hits.len() <= self.max_actions
            },
            Entry::Vacant(vacant) => {
                vacant.insert(VecDeque::from([now]));
                self.max_actions >= 1
            },
        };

        self.cleanup_if_needed(now);
        allowed
    }

    fn cleanup_if_needed(&self, now: Instant) {
        let seen = self.checks_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if !seen.is_multiple_of(CLEANUP_EVERY_CHECKS) {
            return;
        }
        self.hits.retain(|_, hits| {
            hits.back()
                .is_some_and(|last| now.duration_since(*last) < self.window)
        });
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.hits.len()
    }
}
