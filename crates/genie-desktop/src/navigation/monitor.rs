//! Lifecycle state machine

use log::debug;
use serde::{Deserialize, Serialize};

use super::NavigationSignal;
use crate::scheduler::{BoundedRetry, RetryStep};
use crate::surface::Readiness;

/// Where the stage is in its lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationState {
    /// Off the target page, or never started
    #[default]
    Uninitialized,
    /// On the target, waiting for signals to settle
    PendingDebounce,
    /// Checking for the page structure; carries the attempt number
    InitializingAttempt(u32),
    /// The entrance sequence owns the page
    Ready,
    /// Releasing everything the sequence created
    TearingDown,
}

/// Work the engine performs on behalf of the monitor
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MonitorAction {
    /// (Re)start the debounce timer
    ArmDebounce { delay_ms: f64 },
    /// Check readiness after `delay_ms`
    Attempt { attempt: u32, delay_ms: f64 },
    /// Drop pending debounce and attempt timers
    CancelPending,
    /// Begin a session and run the choreography
    Start { forced: bool },
    /// Tear the session down, then report back with [`NavigationMonitor::teardown_complete`]
    TearDown,
}

/// Entry/exit detector for the stage page
#[derive(Clone, Debug)]
pub struct NavigationMonitor {
    state: NavigationState,
    retry: BoundedRetry,
    debounce_ms: f64,
}

impl NavigationMonitor {
    /// Create a monitor with a debounce and a bounded readiness retry
    pub fn new(debounce_ms: f64, retry_ms: f64, max_attempts: u32) -> Self {
        Self {
            state: NavigationState::Uninitialized,
            retry: BoundedRetry::new(retry_ms, max_attempts),
            debounce_ms,
        }
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> NavigationState {
        self.state
    }

    /// Check if a session is running
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == NavigationState::Ready
    }

    fn transition(&mut self, next: NavigationState) {
        if self.state != next {
            debug!(target: "genie::nav", "{:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn begin_attempts(&mut self) -> Vec<MonitorAction> {
        self.retry.reset();
        self.transition(NavigationState::InitializingAttempt(1));
        vec![
            MonitorAction::CancelPending,
            MonitorAction::Attempt {
                attempt: 1,
                delay_ms: 0.0,
            },
        ]
    }

    /// Handle one navigation signal
    pub fn on_signal(&mut self, signal: NavigationSignal, on_target: bool, readiness: Readiness) -> Vec<MonitorAction> {
        if !on_target {
            return self.leave();
        }

        match self.state {
            NavigationState::Uninitialized | NavigationState::PendingDebounce if signal.is_immediate() => {
                self.begin_attempts()
            }
            NavigationState::Uninitialized | NavigationState::PendingDebounce => {
                if signal == NavigationSignal::DomMutation && !readiness.can_rearm() {
                    return Vec::new();
                }
                self.transition(NavigationState::PendingDebounce);
                vec![MonitorAction::ArmDebounce {
                    delay_ms: self.debounce_ms,
                }]
            }
            NavigationState::InitializingAttempt(_) | NavigationState::Ready | NavigationState::TearingDown => {
                debug!(target: "genie::nav", "{:?} absorbed in {:?}", signal, self.state);
                Vec::new()
            }
        }
    }

    /// The debounce timer fired
    pub fn on_debounce_elapsed(&mut self, on_target: bool) -> Vec<MonitorAction> {
        if self.state != NavigationState::PendingDebounce {
            return Vec::new();
        }
        if !on_target {
            self.transition(NavigationState::Uninitialized);
            return Vec::new();
        }
        self.begin_attempts()
    }

    /// A readiness check ran
    pub fn on_attempt(&mut self, attempt: u32, ready: bool, on_target: bool) -> Vec<MonitorAction> {
        if self.state != NavigationState::InitializingAttempt(attempt) {
            debug!(target: "genie::nav", "stale attempt {} in {:?}", attempt, self.state);
            return Vec::new();
        }
        if !on_target {
            self.transition(NavigationState::Uninitialized);
            return Vec::new();
        }

        match self.retry.attempt(ready) {
            RetryStep::Ready { .. } => {
                self.transition(NavigationState::Ready);
                vec![MonitorAction::Start { forced: false }]
            }
            RetryStep::RetryIn { delay_ms, attempt } => {
                self.transition(NavigationState::InitializingAttempt(attempt + 1));
                vec![MonitorAction::Attempt {
                    attempt: attempt + 1,
                    delay_ms,
                }]
            }
            RetryStep::Exhausted { .. } => {
                self.transition(NavigationState::Ready);
                vec![MonitorAction::Start { forced: true }]
            }
        }
    }

    fn leave(&mut self) -> Vec<MonitorAction> {
        match self.state {
            NavigationState::Uninitialized | NavigationState::TearingDown => Vec::new(),
            NavigationState::PendingDebounce | NavigationState::InitializingAttempt(_) => {
                self.transition(NavigationState::Uninitialized);
                vec![MonitorAction::CancelPending]
            }
            NavigationState::Ready => {
                self.transition(NavigationState::TearingDown);
                vec![MonitorAction::CancelPending, MonitorAction::TearDown]
            }
        }
    }

    /// The engine finished tearing down
    pub fn teardown_complete(&mut self) {
        if self.state == NavigationState::TearingDown {
            self.transition(NavigationState::Uninitialized);
        }
    }
}
