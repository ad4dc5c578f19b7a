use std::time::Duration;

/// Outcome of a single lock-acquire attempt. `Unavailable` (store error) is
/// deliberately distinct from `Busy`: it feeds the retry budget rather than
/// the competitor-backoff path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockAttempt {
    Held,
    Busy,
    Unavailable,
}

/// Outcome of the full wait-for-lock loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockWait {
    /// We hold the refill lock and must release it when done.
    Held,
    /// Someone else refilled the cache after our loop started; re-read it
    /// instead of refilling ourselves.
    Refreshed,
    /// The store could not be reached.
    Unavailable,
}

/// Exponential backoff for competing refillers: 500ms, doubling each round,
/// capped at the refill lock TTL (past that the lock owner is presumed dead
/// and the lock expires anyway).
#[derive(Debug)]
pub(crate) struct Backoff {
    delay: Duration,
    cap: Duration,
}

impl Backoff {
    const INITIAL: Duration = Duration::from_millis(500);

    pub fn new(cap: Duration) -> Self {
        Backoff {
            delay: Self::INITIAL,
            cap,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay.min(self.cap);
        self.delay = (self.delay * 2).min(self.cap);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_the_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn cap_below_initial_wins_immediately() {
        let mut backoff = Backoff::new(Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
    }
}
