//! Navigation signals and the source that fans them out

use serde::{Deserialize, Serialize};

/// Where a navigation hint came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationSignal {
    /// First run of the stage script
    InitialSetup,
    /// Window `load`
    Load,
    /// Intercepted `history.pushState`
    HistoryPush,
    /// Intercepted `history.replaceState`
    HistoryReplace,
    /// Back/forward
    PopState,
    /// Periodic URL check saw a new path
    UrlPoll,
    /// The page subtree changed
    DomMutation,
    /// The tab became visible again
    VisibilityVisible,
}

impl NavigationSignal {
    /// Check if the signal comes from the history API
    #[inline]
    pub fn is_history(self) -> bool {
        matches!(
            self,
            NavigationSignal::HistoryPush | NavigationSignal::HistoryReplace | NavigationSignal::PopState
        )
    }

    /// Check if the signal should try to initialise without a debounce
    #[inline]
    pub fn is_immediate(self) -> bool {
        matches!(self, NavigationSignal::InitialSetup | NavigationSignal::Load)
    }
}

/// A signal together with the path it observed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationEvent {
    pub signal: NavigationSignal,
    pub path: String,
}

/// Observer of accepted navigation events
pub type NavigationListener = Box<dyn FnMut(&NavigationEvent)>;

/// Single entry point for every navigation hint
///
/// URL polls are deduplicated against the last polled path; every other
/// signal always passes. Accepted events are handed to each registered
/// listener and returned to the caller.
#[derive(Default)]
pub struct NavigationSource {
    listeners: Vec<NavigationListener>,
    last_polled: Option<String>,
    accepted: u64,
}

impl std::fmt::Debug for NavigationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationSource")
            .field("listeners", &self.listeners.len())
            .field("last_polled", &self.last_polled)
            .field("accepted", &self.accepted)
            .finish()
    }
}

impl NavigationSource {
    /// Create a source with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe(&mut self, listener: impl FnMut(&NavigationEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Number of events accepted so far
    #[inline]
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Offer a signal; returns the event if it should be handled
    pub fn emit(&mut self, signal: NavigationSignal, path: &str) -> Option<NavigationEvent> {
        if signal == NavigationSignal::UrlPoll {
            if self.last_polled.as_deref() == Some(path) {
                return None;
            }
            let first = self.last_polled.is_none();
            self.last_polled = Some(path.to_string());
            // The first poll only records the starting path
            if first {
                return None;
            }
        } else {
            self.last_polled = Some(path.to_string());
        }

        let event = NavigationEvent {
            signal,
            path: path.to_string(),
        };
        self.accepted += 1;
        for listener in &mut self.listeners {
            listener(&event);
        }
        Some(event)
    }
}
