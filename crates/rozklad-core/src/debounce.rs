#![forbid(unsafe_code)]

//! Latest-wins debouncing of a rapidly changing value.
//!
//! [`Debounced<T>`] holds two copies of a value: the *raw* value, updated on
//! every [`set`](Debounced::set), and the *settled* value, which only catches
//! up once the raw value has been left alone for the configured delay.
//! Consumers display the raw value and run expensive work (filtering a large
//! option set) against the settled value.
//!
//! Time is injected: every call that depends on the clock takes an
//! [`Instant`], so the behavior is deterministic under test.
//!
//! # Invariants
//!
//! 1. The settled value only ever takes values that were passed to `set`.
//! 2. Intermediate values in a burst are never settled; the last one always is.
//! 3. A zero delay settles on the next [`poll`](Debounced::poll).
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use rozklad_core::debounce::Debounced;
//!
//! let start = Instant::now();
//! let mut search = Debounced::new(String::new(), Duration::from_millis(300));
//! search.set("ma".to_string(), start);
//! search.set("mat".to_string(), start + Duration::from_millis(100));
//! assert!(search.poll(start + Duration::from_millis(350)).is_none());
//! assert_eq!(
//!     search.poll(start + Duration::from_millis(400)).map(String::as_str),
//!     Some("mat")
//! );
//! ```

use std::time::{Duration, Instant};

/// Default settle interval for search input.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A value whose changes propagate only after a quiet interval.
#[derive(Debug, Clone)]
pub struct Debounced<T> {
    raw: T,
    settled: T,
    delay: Duration,
    /// Time of the last `set` that has not settled yet.
    pending_since: Option<Instant>,
}

impl<T: Clone + PartialEq> Debounced<T> {
    /// Create with an initial value that is already settled.
    #[must_use]
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            raw: initial.clone(),
            settled: initial,
            delay,
            pending_since: None,
        }
    }

    /// The most recent value, for immediate display.
    #[must_use]
    pub fn raw(&self) -> &T {
        &self.raw
    }

    /// The value that has been stable for at least the delay.
    #[must_use]
    pub fn settled(&self) -> &T {
        &self.settled
    }

    /// Configured delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a raw change is waiting to settle.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// When the pending value will settle, if one is pending.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending_since.map(|t| t + self.delay)
    }

    /// Record a new raw value and restart the quiet interval.
    ///
    /// Setting a value equal to the settled one cancels any pending change.
    pub fn set(&mut self, value: T, now: Instant) {
        if value == self.settled {
            self.raw = value;
            self.pending_since = None;
            return;
        }
        self.raw = value;
        self.pending_since = Some(now);
    }

    /// Settle the pending value if its quiet interval has elapsed.
    ///
    /// Returns the newly settled value, or `None` if nothing changed.
    pub fn poll(&mut self, now: Instant) -> Option<&T> {
        let since = self.pending_since?;
        if now.saturating_duration_since(since) < self.delay {
            return None;
        }
        self.pending_since = None;
        self.settled = self.raw.clone();
        Some(&self.settled)
    }

    /// Settle immediately regardless of elapsed time.
    ///
    /// Returns the newly settled value, or `None` if nothing was pending.
    pub fn flush(&mut self) -> Option<&T> {
        self.pending_since.take()?;
        self.settled = self.raw.clone();
        Some(&self.settled)
    }

    /// Set both raw and settled values at once, dropping any pending change.
    pub fn reset(&mut self, value: T) {
        self.raw = value.clone();
        self.settled = value;
        self.pending_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn initial_value_is_settled() {
        let d = Debounced::new(5, ms(300));
        assert_eq!(*d.raw(), 5);
        assert_eq!(*d.settled(), 5);
        assert!(!d.is_pending());
        assert_eq!(d.deadline(), None);
    }

    #[test]
    fn raw_updates_immediately_settled_waits() {
        let t0 = Instant::now();
        let mut d = Debounced::new(0, ms(300));
        d.set(1, t0);
        assert_eq!(*d.raw(), 1);
        assert_eq!(*d.settled(), 0);
        assert!(d.poll(t0 + ms(299)).is_none());
        assert_eq!(d.poll(t0 + ms(300)), Some(&1));
        assert!(!d.is_pending());
    }

    #[test]
    fn burst_settles_only_last_value() {
        let t0 = Instant::now();
        let mut d = Debounced::new(String::new(), ms(300));
        d.set("m".into(), t0);
        d.set("ma".into(), t0 + ms(100));
        d.set("mat".into(), t0 + ms(200));
        // 300ms after the first keystroke, but only 100ms after the last.
        assert!(d.poll(t0 + ms(300)).is_none());
        assert_eq!(d.poll(t0 + ms(500)).map(String::as_str), Some("mat"));
    }

    #[test]
    fn deadline_tracks_last_set() {
        let t0 = Instant::now();
        let mut d = Debounced::new(0, ms(300));
        d.set(1, t0);
        d.set(2, t0 + ms(50));
        assert_eq!(d.deadline(), Some(t0 + ms(350)));
    }

    #[test]
    fn returning_to_settled_value_cancels_pending() {
        let t0 = Instant::now();
        let mut d = Debounced::new(0, ms(300));
        d.set(1, t0);
        d.set(0, t0 + ms(10));
        assert!(!d.is_pending());
        assert!(d.poll(t0 + ms(1000)).is_none());
        assert_eq!(*d.raw(), 0);
    }

    #[test]
    fn zero_delay_settles_on_next_poll() {
        let t0 = Instant::now();
        let mut d = Debounced::new(0, Duration::ZERO);
        d.set(3, t0);
        assert_eq!(d.poll(t0), Some(&3));
    }

    #[test]
    fn flush_settles_without_waiting() {
        let t0 = Instant::now();
        let mut d = Debounced::new(0, ms(300));
        assert!(d.flush().is_none());
        d.set(7, t0);
        assert_eq!(d.flush(), Some(&7));
        assert_eq!(*d.settled(), 7);
    }

    #[test]
    fn reset_overrides_both() {
        let t0 = Instant::now();
        let mut d = Debounced::new(0, ms(300));
        d.set(1, t0);
        d.reset(9);
        assert_eq!(*d.raw(), 9);
        assert_eq!(*d.settled(), 9);
        assert!(!d.is_pending());
    }

    #[test]
    fn poll_with_earlier_instant_does_not_settle() {
        let t0 = Instant::now() + ms(1000);
        let mut d = Debounced::new(0, ms(300));
        d.set(1, t0);
        assert!(d.poll(t0 - ms(500)).is_none());
    }
}
