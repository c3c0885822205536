use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative, one-way cancellation signal shared across a job's workers.
///
/// The flag transitions from `false` to `true` exactly once and is never
/// reset, so relaxed atomics are sufficient. Adapters are expected to check
/// it at natural suspension points and bail out with a skipped result;
/// nothing is preempted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_starts_clear() {
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());

        // Cancelling again is a no-op.
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
