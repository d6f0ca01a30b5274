//! Virtual-time timers and bounded retries
//!
//! Every deferred step of the stage is a [`Scheduler`] entry rather than a
//! closure. Entries carry the session that scheduled them; a teardown
//! cancels the whole session in one call.

use serde::{Deserialize, Serialize};

/// Generation token of one initialisation of the stage
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

/// Handle of a scheduled timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Clone, Debug)]
struct Timer<T> {
    id: TimerId,
    due_ms: f64,
    session: Option<SessionId>,
    task: T,
}

/// A timer whose due time has passed
#[derive(Clone, Debug, PartialEq)]
pub struct DueTask<T> {
    pub id: TimerId,
    pub due_ms: f64,
    pub session: Option<SessionId>,
    pub task: T,
}

/// Ordered set of pending timers
///
/// Due timers pop in due-time order; ties pop in scheduling order.
#[derive(Clone, Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    timers: Vec<Timer<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self {
            next_id: 1,
            timers: Vec::new(),
        }
    }

    /// Schedule `task` at an absolute time
    pub fn schedule_at(&mut self, due_ms: f64, session: Option<SessionId>, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due_ms,
            session,
            task,
        });
        id
    }

    /// Schedule `task` after a delay from `now_ms`
    #[inline]
    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64, session: Option<SessionId>, task: T) -> TimerId {
        self.schedule_at(now_ms + delay_ms.max(0.0), session, task)
    }

    /// Cancel one timer; returns false if it already fired or was cancelled
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    /// Cancel every timer owned by a session
    pub fn cancel_session(&mut self, session: SessionId) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| t.session != Some(session));
        before - self.timers.len()
    }

    /// Cancel every timer matching a predicate
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| !pred(&t.task));
        before - self.timers.len()
    }

    /// Check if a timer is still pending
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    /// Pop the earliest timer due at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: f64) -> Option<DueTask<T>> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by(|(_, a), (_, b)| a.due_ms.total_cmp(&b.due_ms).then(a.id.cmp(&b.id)))
            .map(|(i, _)| i)?;
        let timer = self.timers.remove(index);
        Some(DueTask {
            id: timer.id,
            due_ms: timer.due_ms,
            session: timer.session,
            task: timer.task,
        })
    }

    /// Earliest pending due time
    pub fn next_due(&self) -> Option<f64> {
        self.timers.iter().map(|t| t.due_ms).min_by(f64::total_cmp)
    }

    /// Number of pending timers
    #[inline]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Check if nothing is pending
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

/// Outcome of one readiness check under a [`BoundedRetry`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RetryStep {
    /// The condition held on attempt `attempt`
    Ready { attempt: u32 },
    /// Check again after `delay_ms`
    RetryIn { delay_ms: f64, attempt: u32 },
    /// The attempt budget is spent; proceed best-effort
    Exhausted { attempts: u32 },
}

impl RetryStep {
    /// Check if the caller should stop polling
    #[inline]
    pub fn is_final(&self) -> bool {
        !matches!(self, RetryStep::RetryIn { .. })
    }
}

/// Poll-until-ready with a fixed interval and an attempt cap
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundedRetry {
    interval_ms: f64,
    max_attempts: u32,
    attempts: u32,
}

impl BoundedRetry {
    /// Retry up to `max_attempts` checks, `interval_ms` apart
    pub fn new(interval_ms: f64, max_attempts: u32) -> Self {
        Self {
            interval_ms,
            max_attempts: max_attempts.max(1),
            attempts: 0,
        }
    }

    /// Record one check of the condition
    pub fn attempt(&mut self, ready: bool) -> RetryStep {
        self.attempts += 1;
        if ready {
            return RetryStep::Ready {
                attempt: self.attempts,
            };
        }
        if self.attempts >= self.max_attempts {
            RetryStep::Exhausted {
                attempts: self.attempts,
            }
        } else {
            RetryStep::RetryIn {
                delay_ms: self.interval_ms,
                attempt: self.attempts,
            }
        }
    }

    /// Checks made so far
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Forget previous attempts
    #[inline]
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_due_in_order() {
        let mut s = Scheduler::new();
        s.schedule(0.0, 200.0, None, "debounce");
        s.schedule(0.0, 50.0, None, "history");
        s.schedule(0.0, 50.0, None, "second");

        assert!(s.pop_due(10.0).is_none());
        assert_eq!(s.pop_due(60.0).map(|t| t.task), Some("history"));
        assert_eq!(s.pop_due(60.0).map(|t| t.task), Some("second"));
        assert!(s.pop_due(60.0).is_none());
        assert_eq!(s.next_due(), Some(200.0));
        assert_eq!(s.pop_due(500.0).map(|t| t.task), Some("debounce"));
        assert!(s.is_empty());
    }

    #[test]
    fn test_cancel_session() {
        let mut s = Scheduler::new();
        s.schedule(0.0, 10.0, Some(SessionId(1)), 1);
        s.schedule(0.0, 10.0, Some(SessionId(2)), 2);
        s.schedule(0.0, 10.0, None, 3);
        s.schedule(0.0, 20.0, Some(SessionId(1)), 4);

        assert_eq!(s.cancel_session(SessionId(1)), 2);
        let tasks: Vec<_> = std::iter::from_fn(|| s.pop_due(100.0).map(|t| t.task)).collect();
        assert_eq!(tasks, vec![2, 3]);
    }

    #[test]
    fn test_cancel_single() {
        let mut s = Scheduler::new();
        let id = s.schedule(0.0, 10.0, None, ());
        assert!(s.is_pending(id));
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.pop_due(100.0).is_none());
    }

    #[test]
    fn test_negative_delay_is_immediate() {
        let mut s = Scheduler::new();
        s.schedule(100.0, -5.0, None, ());
        assert!(s.pop_due(100.0).is_some());
    }

    #[test]
    fn test_bounded_retry_exhausts_on_last_attempt() {
        let mut retry = BoundedRetry::new(100.0, 15);
        for n in 1..15 {
            assert_eq!(
                retry.attempt(false),
                RetryStep::RetryIn {
                    delay_ms: 100.0,
                    attempt: n
                }
            );
        }
        assert_eq!(retry.attempt(false), RetryStep::Exhausted { attempts: 15 });
    }

    #[test]
    fn test_bounded_retry_always_has_a_cap() {
        let mut retry = BoundedRetry::new(100.0, 0);
        assert_eq!(retry.attempt(false), RetryStep::Exhausted { attempts: 1 });
    }

    #[test]
    fn test_bounded_retry_ready() {
        let mut retry = BoundedRetry::new(50.0, 60);
        retry.attempt(false);
        let step = retry.attempt(true);
        assert_eq!(step, RetryStep::Ready { attempt: 2 });
        assert!(step.is_final());
        retry.reset();
        assert_eq!(retry.attempts(), 0);
    }
}
