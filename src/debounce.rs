use std::time::{Duration, Instant};

/// Delay between the last keystroke and the search it triggers.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Last-write-wins scheduler: only the most recently scheduled value fires;
/// earlier schedules are silently replaced. The clock is passed in so the
/// event loop (and tests) control time.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Schedules `value`, replacing any not-yet-fired schedule.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Fires the pending value once its delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, scheduled_at)) if now.duration_since(*scheduled_at) >= self.delay => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Sequence fence for async results: a response is applied only if it is
/// newer than the last applied one, so a slow stale request can never
/// overwrite a fresher result.
#[derive(Debug, Default)]
pub struct ResponseGuard {
    issued: u64,
    applied: u64,
}

impl ResponseGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags a new outgoing request.
    pub fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Returns whether the response tagged `seq` may be applied, recording
    /// it when so.
    pub fn commit(&mut self, seq: u64) -> bool {
        if seq > self.applied {
            self.applied = seq;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_scheduled_value_fires() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule("cust", start);
        debouncer.schedule("custo", start + Duration::from_millis(100));
        debouncer.schedule("customer", start + Duration::from_millis(200));

        // 300ms after the *last* keystroke, not the first
        assert_eq!(debouncer.poll(start + Duration::from_millis(400)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(500)),
            Some("customer")
        );
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + Duration::from_millis(900)), None);
    }

    #[test]
    fn cancel_discards_pending() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule("query", start);
        debouncer.cancel();
        assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut guard = ResponseGuard::new();
        let first = guard.begin();
        let second = guard.begin();

        // the newer request resolves first
        assert!(guard.commit(second));
        // the slow earlier one must not overwrite it
        assert!(!guard.commit(first));
    }

    #[test]
    fn in_order_responses_all_commit() {
        let mut guard = ResponseGuard::new();
        let first = guard.begin();
        let second = guard.begin();
        assert!(guard.commit(first));
        assert!(guard.commit(second));
        assert!(!guard.commit(second));
    }
}
