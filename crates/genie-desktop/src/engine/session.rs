//! Per-visit state, dropped wholesale at teardown

use crate::choreographer::{Choreographer, Directive};
use crate::config::StageConfig;
use crate::entity::EntityMap;
use crate::launch::{DeviceCapability, LaunchStrategy, strategy_for};
use crate::math::Vec2;
use crate::reveal::ActiveReveal;
use crate::scheduler::SessionId;
use crate::signal::RevealSignals;
use crate::transition::TimelineId;

/// Everything one visit of the stage owns
pub(crate) struct Session {
    pub id: SessionId,
    pub signals: RevealSignals,
    pub choreo: Choreographer,
    /// Picked once when the session starts
    pub strategy: Box<dyn LaunchStrategy>,
    /// Viewport was narrow when the session started
    pub narrow: bool,
    /// Paused content stage per entity, registered on landing
    pub content: EntityMap<Option<TimelineId>>,
    /// Directives held back until their window lands
    pub deferred: EntityMap<Vec<Directive>>,
    /// Markup captured before a text window was cleared for launch
    pub snapshots: EntityMap<Option<String>>,
    pub reveals: EntityMap<Option<ActiveReveal>>,
    /// Last position the cursor was sent to; `None` when there is no cursor
    pub cursor: Option<Vec2>,
}

impl Session {
    pub fn new(id: SessionId, config: &StageConfig, capability: DeviceCapability, narrow: bool) -> Self {
        Self {
            id,
            signals: RevealSignals::new(id),
            choreo: Choreographer::new(config),
            strategy: strategy_for(capability),
            narrow,
            content: EntityMap::default(),
            deferred: EntityMap::default(),
            snapshots: EntityMap::default(),
            reveals: EntityMap::default(),
            cursor: None,
        }
    }
}
