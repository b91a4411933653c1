/// Single-shot timer, re-armed on every outbound frame that expects a reply.
/// Driven by a caller-supplied monotonic tick in milliseconds rather than a
/// real-time clock, so it stays usable in `no_std` firmware whose only time
/// source is a hardware timer or RTOS tick counter.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutController {
    timeout_ms: u64,
    deadline_ms: Option<u64>,
}

impl TimeoutController {
    pub fn new(timeout_ms: u64) -> Self {
        TimeoutController {
            timeout_ms,
            deadline_ms: None,
        }
    }

    /// (Re)arms the timer relative to `now_ms`.
    pub fn arm(&mut self, now_ms: u64) {
        self.deadline_ms = Some(now_ms + self.timeout_ms);
    }

    /// Disarms the timer, e.g. once a request completes.
    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Returns `true` and disarms the timer exactly once the deadline has
    /// passed. Safe to call every tick regardless of arm state.
    pub fn expired(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_past_deadline() {
        let mut t = TimeoutController::new(1000);
        t.arm(0);
        assert!(!t.expired(500));
        assert!(t.expired(1000));
        // Disarmed after firing; does not fire again.
        assert!(!t.expired(2000));
    }

    #[test]
    fn unarmed_timer_never_expires() {
        let mut t = TimeoutController::new(1000);
        assert!(!t.expired(1_000_000));
    }

    #[test]
    fn cancel_disarms() {
        let mut t = TimeoutController::new(1000);
        t.arm(0);
        t.cancel();
        assert!(!t.is_armed());
        assert!(!t.expired(1000));
    }

    #[test]
    fn rearming_resets_deadline() {
        let mut t = TimeoutController::new(1000);
        t.arm(0);
        t.arm(500);
        assert!(!t.expired(1000));
        assert!(t.expired(1500));
    }
}
