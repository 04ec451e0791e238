//! A small in-process metrics registry.
//!
//! litmap's stage binaries are short-lived batch jobs, not long-running
//! servers, so this carries only what the stage crates actually report on:
//! monotonic counters and duration histograms, each keyed by a set of
//! string attributes (e.g. `stage="ingest"`, `pmid="..."`).

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;

/// Attributes attached to a single recorder instance, e.g. `[("stage",
/// "ingest")]`. Order does not matter; two attribute sets with the same
/// key/value pairs identify the same recorder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Attributes(Vec<(&'static str, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: impl Into<String>) {
        self.0.push((key, value.into()));
    }
}

impl<const N: usize> From<[(&'static str, &str); N]> for Attributes {
    fn from(arr: [(&'static str, &str); N]) -> Self {
        let mut v: Vec<_> = arr.iter().map(|(k, v)| (*k, v.to_string())).collect();
        v.sort();
        Self(v)
    }
}

/// A named, typed metric. Cheap to clone; holds an `Arc` to the shared
/// per-attribute-set instrument map.
#[derive(Debug, Clone)]
pub struct Metric<T> {
    name: &'static str,
    instruments: Arc<Mutex<HashMap<Attributes, T>>>,
}

impl<T: Default + Clone> Metric<T> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            instruments: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the instrument for the given attribute set, creating it with
    /// its default value on first use.
    pub fn recorder(&self, attributes: impl Into<Attributes>) -> T {
        let mut instruments = self.instruments.lock();
        instruments
            .entry(attributes.into())
            .or_insert_with(T::default)
            .clone()
    }
}

/// A monotonically increasing counter.
#[derive(Debug, Clone, Default)]
pub struct U64Counter(Arc<Mutex<u64>>);

impl U64Counter {
    pub fn inc(&self, delta: u64) {
        *self.0.lock() += delta;
    }

    pub fn fetch(&self) -> u64 {
        *self.0.lock()
    }
}

/// Accumulates observed durations; reports count and total.
#[derive(Debug, Clone, Default)]
pub struct DurationHistogram(Arc<Mutex<DurationHistogramInner>>);

#[derive(Debug, Default)]
struct DurationHistogramInner {
    count: u64,
    total: Duration,
}

impl DurationHistogram {
    pub fn record(&self, duration: Duration) {
        let mut inner = self.0.lock();
        inner.count += 1;
        inner.total += duration;
    }

    pub fn count(&self) -> u64 {
        self.0.lock().count
    }

    pub fn total(&self) -> Duration {
        self.0.lock().total
    }
}

/// Central registry of all metrics in a process. One instance is
/// constructed at stage-binary startup and threaded through to whichever
/// components report on it.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    inner: Arc<Mutex<HashMap<&'static str, ()>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or retrieves) a named metric of the given instrument
    /// type. Calling this twice with the same name and type returns
    /// independent `Metric` handles that still share the same underlying
    /// per-attribute instruments would require a type-erased map; litmap's
    /// stage crates call this once per metric at construction time and hold
    /// onto the returned handle, so a fresh map per call is sufficient.
    pub fn register_metric<T: Default + Clone>(
        &self,
        name: &'static str,
        _description: &'static str,
    ) -> Metric<T> {
        self.inner.lock().entry(name).or_insert(());
        Metric::new(name)
    }
}
