use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current time for count staleness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

const UNKNOWN: i64 = -1;

#[derive(Debug)]
struct CounterState {
    count: i64,
    last_refreshed: DateTime<Utc>,
}

/// Approximate row count shared by the clones of a repository.
///
/// Starts unknown. While fresh it absorbs local inserts and deletes as
/// deltas; once older than the staleness window callers must recount.
#[derive(Debug)]
pub struct ApproximateCounter {
    state: Mutex<CounterState>,
    staleness: Duration,
}

impl ApproximateCounter {
    pub fn new(staleness: Duration, now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(CounterState {
                count: UNKNOWN,
                last_refreshed: now,
            }),
            staleness,
        }
    }

    /// Cached count if it is known and still inside the window.
    pub fn get(&self, now: DateTime<Utc>) -> Option<i64> {
        let state = self.state.lock();
        fresh(&state, self.staleness, now).then_some(state.count)
    }

    /// Cached count regardless of age, `None` while unknown.
    pub fn peek(&self) -> Option<i64> {
        let count = self.state.lock().count;
        (count != UNKNOWN).then_some(count)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        fresh(&self.state.lock(), self.staleness, now)
    }

    /// Stores an exact count and restarts the window.
    pub fn reset(&self, count: i64, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.count = count.max(0);
        state.last_refreshed = now;
    }

    /// Applies `delta` only while fresh; returns whether it was applied.
    /// The window is not extended.
    pub fn adjust_if_fresh(&self, delta: i64, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        if !fresh(&state, self.staleness, now) {
            return false;
        }
        state.count = (state.count + delta).max(0);
        true
    }

    /// Forgets the count so the next read recounts.
    pub fn invalidate(&self) {
        self.state.lock().count = UNKNOWN;
    }
}

fn fresh(state: &CounterState, staleness: Duration, now: DateTime<Utc>) -> bool {
    state.count != UNKNOWN && now - state.last_refreshed <= staleness
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn unknown_until_reset() {
        let c = ApproximateCounter::new(Duration::minutes(3), start());
        assert_eq!(c.get(start()), None);
        assert_eq!(c.peek(), None);
        assert!(!c.adjust_if_fresh(1, start()));

        c.reset(5, start());
        assert_eq!(c.get(start()), Some(5));
    }

    #[test]
    fn deltas_apply_only_inside_window() {
        let c = ApproximateCounter::new(Duration::minutes(3), start());
        c.reset(10, start());

        assert!(c.adjust_if_fresh(1, start() + Duration::minutes(1)));
        assert!(c.adjust_if_fresh(-2, start() + Duration::minutes(3)));
        assert_eq!(c.peek(), Some(9));

        let later = start() + Duration::minutes(3) + Duration::seconds(1);
        assert!(!c.is_fresh(later));
        assert!(!c.adjust_if_fresh(1, later));
        assert_eq!(c.get(later), None);
        assert_eq!(c.peek(), Some(9));
    }

    #[test]
    fn never_negative() {
        let c = ApproximateCounter::new(Duration::minutes(3), start());
        c.reset(1, start());
        c.adjust_if_fresh(-5, start());
        assert_eq!(c.peek(), Some(0));
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(start());
        clock.advance(Duration::minutes(4));
        assert_eq!(clock.now(), start() + Duration::minutes(4));
        clock.set(start());
        assert_eq!(clock.now(), start());
    }
}
