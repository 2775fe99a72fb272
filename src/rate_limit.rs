//! Per-identity fixed-window quota.
//!
//! Each identity gets a counter and the instant its window opened. Windows
//! are reset lazily when the identity is checked again after the window has
//! elapsed; nothing runs on a timer except the optional sweep, which only
//! drops records that a check would have reset anyway.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Time source for the limiter.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// Rate limit entry - tracks requests per identity
#[derive(Debug, Clone, Copy)]
pub struct QuotaRecord {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

/// Outcome of a single [`RateLimiter::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub success: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Window end, epoch seconds.
    pub reset: i64,
    /// Window end as a timestamp.
    pub reset_time: DateTime<Utc>,
}

pub struct RateLimiter {
    records: DashMap<String, QuotaRecord>,
    limit: u32,
    window: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        // windows past chrono's range are clamped to a century
        let window = TimeDelta::from_std(window).unwrap_or_else(|_| TimeDelta::days(36_500));
        Self {
            records: DashMap::new(),
            limit,
            window,
            clock,
        }
    }

    /// Admit or deny one call for `identity`.
    ///
    /// The whole read-check-increment runs while holding the entry's shard
    /// lock, so concurrent checks for the same identity are serialized.
    pub fn check(&self, identity: &str) -> Decision {
        let now = self.clock.now();

        let mut entry = self
            .records
            .entry(identity.to_string())
            .or_insert(QuotaRecord {
                count: 0,
                window_start: now,
            });
        let record = entry.value_mut();

        // window elapsed..? start a fresh one before counting this call
        if now >= record.window_start + self.window {
            record.count = 0;
            record.window_start = now;
        }

        let success = record.count < self.limit;
        if success {
            record.count += 1;
        }
        let remaining = self.limit - record.count;
        let reset_time = record.window_start + self.window;

        Decision {
            success,
            limit: self.limit,
            remaining,
            reset: reset_time.timestamp(),
            reset_time,
        }
    }

    /// Drop records whose window has elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let window = self.window;
        let mut removed = 0;
        self.records.retain(|_, record| {
            let live = now < record.window_start + window;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Number of identities currently holding a record.
    pub fn tracked(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub(crate) fn record(&self, identity: &str) -> Option<QuotaRecord> {
        self.records.get(identity).map(|r| *r)
    }
}

/// Manually advanced clock for tests.
#[cfg(test)]
pub(crate) struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: std::sync::Mutex::new(now),
        })
    }

    pub(crate) fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TWELVE_HOURS: Duration = Duration::from_secs(12 * 60 * 60);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn limiter(limit: u32) -> (RateLimiter, Arc<ManualClock>) {
        let clock = ManualClock::starting_at(t0());
        let limiter = RateLimiter::with_clock(limit, TWELVE_HOURS, clock.clone());
        (limiter, clock)
    }

    #[test]
    fn admits_up_to_limit_with_decreasing_remaining() {
        let (limiter, clock) = limiter(3);

        for expected in [2, 1, 0] {
            let decision = limiter.check("x");
            assert!(decision.success);
            assert_eq!(decision.remaining, expected);
            assert_eq!(decision.limit, 3);
            clock.advance(TimeDelta::seconds(1));
        }
    }

    #[test]
    fn denial_does_not_touch_counter() {
        let (limiter, _clock) = limiter(3);
        for _ in 0..3 {
            limiter.check("x");
        }

        for _ in 0..5 {
            let decision = limiter.check("x");
            assert!(!decision.success);
            assert_eq!(decision.remaining, 0);
        }
        assert_eq!(limiter.record("x").unwrap().count, 3);
    }

    #[test]
    fn denial_reports_end_of_current_window() {
        let (limiter, clock) = limiter(3);
        for _ in 0..3 {
            limiter.check("x");
            clock.advance(TimeDelta::seconds(1));
        }

        let decision = limiter.check("x");
        let window_end = t0() + TimeDelta::hours(12);
        assert!(!decision.success);
        assert_eq!(decision.reset_time, window_end);
        assert_eq!(decision.reset, window_end.timestamp());
    }

    #[test]
    fn window_expiry_starts_fresh() {
        let (limiter, clock) = limiter(3);
        for _ in 0..4 {
            limiter.check("x");
        }

        clock.advance(TimeDelta::hours(12) + TimeDelta::seconds(1));
        let decision = limiter.check("x");
        assert!(decision.success);
        assert_eq!(decision.remaining, 2);
        assert_eq!(
            decision.reset_time,
            t0() + TimeDelta::hours(24) + TimeDelta::seconds(1)
        );
        assert_eq!(limiter.record("x").unwrap().count, 1);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let (limiter, clock) = limiter(1);
        assert!(limiter.check("x").success);
        assert!(!limiter.check("x").success);

        clock.advance(TimeDelta::hours(12));
        assert!(limiter.check("x").success);
    }

    #[test]
    fn identities_are_independent() {
        let (limiter, _clock) = limiter(3);
        for _ in 0..4 {
            limiter.check("a");
        }
        assert!(!limiter.check("a").success);

        let decision = limiter.check("b");
        assert!(decision.success);
        assert_eq!(decision.remaining, 2);
    }

    #[test]
    fn zero_limit_denies_everything() {
        let (limiter, _clock) = limiter(0);
        let decision = limiter.check("x");
        assert!(!decision.success);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn worked_example() {
        let (limiter, clock) = limiter(3);

        let remaining: Vec<u32> = (0..3)
            .map(|_| {
                let d = limiter.check("X");
                assert!(d.success);
                clock.advance(TimeDelta::seconds(1));
                d.remaining
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let denied = limiter.check("X");
        assert!(!denied.success);
        assert_eq!(denied.reset_time, t0() + TimeDelta::hours(12));

        clock.advance(TimeDelta::hours(12) - TimeDelta::seconds(3) + TimeDelta::seconds(1));
        let fresh = limiter.check("X");
        assert!(fresh.success);
        assert_eq!(fresh.remaining, 2);
    }

    #[test]
    fn concurrent_checks_never_over_admit() {
        let limiter = Arc::new(RateLimiter::new(3, TWELVE_HOURS));

        let admitted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..32)
                .map(|_| {
                    let limiter = Arc::clone(&limiter);
                    s.spawn(move || limiter.check("shared").success)
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(admitted, 3);
        assert_eq!(limiter.record("shared").unwrap().count, 3);
    }

    #[test]
    fn purge_removes_only_elapsed_records() {
        let (limiter, clock) = limiter(3);
        limiter.check("old");
        clock.advance(TimeDelta::hours(6));
        limiter.check("recent");
        clock.advance(TimeDelta::hours(6));

        assert_eq!(limiter.purge_expired(), 1);
        assert_eq!(limiter.tracked(), 1);
        assert!(limiter.record("old").is_none());
        assert!(limiter.record("recent").is_some());
    }

    #[test]
    fn purge_count_ignores_concurrent_inserts() {
        let (limiter, clock) = limiter(3);
        for i in 0..100 {
            limiter.check(&format!("stale-{i}"));
        }
        clock.advance(TimeDelta::hours(13));

        let removed = std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..1000 {
                    limiter.check(&format!("fresh-{i}"));
                }
            });
            limiter.purge_expired()
        });

        assert_eq!(removed, 100);
        assert_eq!(limiter.tracked(), 1000);
    }
}
