//! Navigation lifecycle: noticing when the visitor enters or leaves the stage
//!
//! A client-side router gives no single reliable "page changed" event, so
//! several redundant signals are collected by a [`NavigationSource`] and
//! funnelled into one [`NavigationMonitor`]. The monitor is a pure state
//! machine; it answers every input with [`MonitorAction`]s that the engine
//! carries out.

mod monitor;
mod source;

pub use monitor::{MonitorAction, NavigationMonitor, NavigationState};
pub use source::{NavigationEvent, NavigationListener, NavigationSignal, NavigationSource};
