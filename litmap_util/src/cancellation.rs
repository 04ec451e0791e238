use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A cooperative cancellation signal, checked between batches and after
/// each checkpoint write (spec §5 "Cancellation & timeouts"). A stage
/// binary installs a `ctrl_c` handler that calls [`CancellationFlag::cancel`];
/// the stage's own loop polls [`CancellationFlag::is_cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled_and_latches() {
        let flag = CancellationFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
    }
}
