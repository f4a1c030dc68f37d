//! Optional time limit and cancellation token for long-running graph work.
//!
//! A full SNOMED CT release has millions of relationship rows. Builders and
//! traversals call [`Deadline::check`] periodically and bail out once the
//! deadline has passed or the token has been cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a checked operation stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// The deadline passed. Carries the configured limit in whole seconds.
    TimedOut { max_seconds: u64 },
    /// The cancellation token was set.
    Cancelled,
}

/// A deadline plus a shareable cancellation flag. Both parts are optional.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    expires: Option<(Instant, Duration)>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl Deadline {
    /// A deadline that never fires.
    pub fn none() -> Self {
        Self::default()
    }

    /// Expire `limit` from now.
    pub fn after(limit: Duration) -> Self {
        Self {
            expires: Some((Instant::now() + limit, limit)),
            cancelled: None,
        }
    }

    /// Build from an optional number of seconds, as found in configuration.
    pub fn from_secs(secs: Option<u64>) -> Self {
        secs.map(|s| Self::after(Duration::from_secs(s)))
            .unwrap_or_default()
    }

    /// Attach a cancellation flag. Setting it to `true` from any thread
    /// interrupts the next [`check`](Self::check).
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(token);
        self
    }

    /// Create and attach a fresh cancellation flag, returning it to the caller.
    pub fn cancellable(self) -> (Self, Arc<AtomicBool>) {
        let token = Arc::new(AtomicBool::new(false));
        (self.with_cancel_token(token.clone()), token)
    }

    pub fn check(&self) -> Result<(), Interrupted> {
        if let Some(flag) = &self.cancelled {
            if flag.load(Ordering::Relaxed) {
                return Err(Interrupted::Cancelled);
            }
        }
        if let Some((at, limit)) = self.expires {
            if Instant::now() >= at {
                return Err(Interrupted::TimedOut {
                    max_seconds: limit.as_secs(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_never_fires() {
        assert_eq!(Deadline::none().check(), Ok(()));
        assert_eq!(Deadline::from_secs(None).check(), Ok(()));
    }

    #[test]
    fn test_expired_deadline() {
        let deadline = Deadline::after(Duration::ZERO);
        assert_eq!(
            deadline.check(),
            Err(Interrupted::TimedOut { max_seconds: 0 })
        );
    }

    #[test]
    fn test_generous_deadline_passes() {
        assert_eq!(Deadline::from_secs(Some(3600)).check(), Ok(()));
    }

    #[test]
    fn test_cancel_token() {
        let (deadline, token) = Deadline::none().cancellable();
        assert_eq!(deadline.check(), Ok(()));
        token.store(true, Ordering::Relaxed);
        assert_eq!(deadline.check(), Err(Interrupted::Cancelled));
        // Clones share the flag.
        assert_eq!(deadline.clone().check(), Err(Interrupted::Cancelled));
    }
}
