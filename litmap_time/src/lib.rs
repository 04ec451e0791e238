//! A mockable time source, so checkpoint timestamps and retry back-off in
//! tests don't depend on wall-clock time.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// A point in time. Thin wrapper over `chrono::DateTime<Utc>` so call
/// sites don't depend on `chrono` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(DateTime<Utc>);

impl Time {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn from_timestamp_millis(millis: i64) -> Self {
        Self(DateTime::from_timestamp_millis(millis).expect("valid timestamp"))
    }

    pub fn date_time(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        self.0.checked_add_signed(duration).map(Self)
    }

    pub fn checked_sub(&self, duration: Duration) -> Option<Self> {
        self.0.checked_sub_signed(duration).map(Self)
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Source of the current time, injected everywhere a checkpoint timestamp
/// or retry deadline is computed so tests can control the clock.
pub trait TimeProvider: std::fmt::Debug + Send + Sync + 'static {
    fn now(&self) -> Time;
}

/// Real wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProvider;

impl SystemProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for SystemProvider {
    fn now(&self) -> Time {
        Time(Utc::now())
    }
}

/// A controllable clock for tests: starts at a fixed instant and only
/// advances when told to.
#[derive(Debug, Clone)]
pub struct MockProvider {
    now: Arc<RwLock<Time>>,
}

impl MockProvider {
    pub fn new(start: Time) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    pub fn set(&self, time: Time) {
        *self.now.write() = time;
    }

    pub fn inc(&self, duration: Duration) -> Time {
        let mut now = self.now.write();
        *now = now.checked_add(duration).expect("time overflow");
        *now
    }
}

impl TimeProvider for MockProvider {
    fn now(&self) -> Time {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_provider_only_advances_when_told() {
        let start = Time::from_timestamp_millis(0);
        let provider = MockProvider::new(start);
        assert_eq!(provider.now(), start);

        let next = provider.inc(Duration::seconds(5));
        assert_eq!(provider.now(), next);
        assert!(next > start);
    }
}
