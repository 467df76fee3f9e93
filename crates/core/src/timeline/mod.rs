use std::time::Duration;

/// Monotonic session time, advanced explicitly by the host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
    now: Duration,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Moves the clock forward; it never runs backwards.
    pub fn advance_to(&mut self, time: Duration) {
        self.now = self.now.max(time);
    }

    pub fn advance(&mut self, delta: Duration) {
        self.now = self.now.saturating_add(delta);
    }
}

/// Identifier handed out for every armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
pub struct Timer<T> {
    pub id: TimerId,
    pub due: Duration,
    pub payload: T,
}

/// The single pending timer of a session.
///
/// Arming replaces whatever was pending, so at most one ticker or
/// completion wait exists at any time.
#[derive(Debug)]
pub struct TimerSlot<T> {
    current: Option<Timer<T>>,
    next_id: u64,
}

impl<T> Default for TimerSlot<T> {
    fn default() -> Self {
        Self {
            current: None,
            next_id: 0,
        }
    }
}

impl<T> TimerSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, due: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        if let Some(replaced) = self.current.replace(Timer { id, due, payload }) {
            tracing::trace!(timer = replaced.id.0, "replaced pending timer");
        }
        id
    }

    /// Drops the pending timer, reporting whether there was one.
    pub fn cancel(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn due_at(&self) -> Option<Duration> {
        self.current.as_ref().map(|timer| timer.due)
    }

    pub fn current_id(&self) -> Option<TimerId> {
        self.current.as_ref().map(|timer| timer.id)
    }

    pub fn is_armed(&self) -> bool {
        self.current.is_some()
    }

    /// Takes the pending timer if it is due at or before `time`.
    pub fn take_due(&mut self, time: Duration) -> Option<Timer<T>> {
        match &self.current {
            Some(timer) if timer.due <= time => self.current.take(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn clock_only_moves_forward() {
        let mut clock = SessionClock::new();
        clock.advance(ms(10));
        clock.advance_to(ms(5));
        assert_eq!(clock.now(), ms(10));
        clock.advance_to(ms(15));
        assert_eq!(clock.now(), ms(15));
    }

    #[test]
    fn arming_replaces_the_pending_timer() {
        let mut slot = TimerSlot::new();
        let first = slot.arm(ms(10), "scroll");
        let second = slot.arm(ms(20), "complete");
        assert_ne!(first, second);
        assert_eq!(slot.current_id(), Some(second));
        assert_eq!(slot.due_at(), Some(ms(20)));
    }

    #[test]
    fn take_due_respects_deadline() {
        let mut slot = TimerSlot::new();
        slot.arm(ms(10), ());
        assert!(slot.take_due(ms(9)).is_none());
        assert!(slot.take_due(ms(10)).is_some());
        assert!(!slot.is_armed());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut slot: TimerSlot<()> = TimerSlot::new();
        assert!(!slot.cancel());
        slot.arm(ms(1), ());
        assert!(slot.cancel());
        assert!(!slot.cancel());
    }
}
