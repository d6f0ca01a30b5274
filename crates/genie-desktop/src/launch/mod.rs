//! Launch animations: windows flying in with a trail of ghosts
//!
//! Two interchangeable strategies implement [`LaunchStrategy`]:
//!
//! - [`VectorMorph`]: morphs vector outlines from a small seed to the final
//!   window rectangle, then swaps in the real window
//! - [`DomGhost`]: animates the real window plus cloned shells behind it,
//!   for devices where vector morphing is too slow
//!
//! The strategy is picked once per session from [`DeviceCapability`].
//! Strategies only describe the animation; the engine spawns the nodes and
//! plays the tweens.

mod ghost;
mod vector;

pub use ghost::DomGhost;
pub use vector::{OutlinePaths, VectorMorph, HALF_STROKE, SEED_SIZE, SEED_TITLE_HEIGHT, STROKE_WIDTH};

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::layout::{Position, WindowSpec};
use crate::surface::{NodeRef, NodeSpec, Prop};
use crate::transition::Tween;

/// Duration of the main copy's flight
pub const MAIN_FLIGHT_MS: f64 = 600.0;

/// What the device can animate smoothly
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceCapability {
    /// Vector morphing is fine
    #[default]
    Full,
    /// Restricted to transforms and opacity on plain elements
    SimpleAnimation,
}

impl DeviceCapability {
    /// Probe from a user agent string
    pub fn detect(user_agent: &str) -> Self {
        if ["iPad", "iPhone", "iPod"].iter().any(|m| user_agent.contains(m)) {
            DeviceCapability::SimpleAnimation
        } else {
            DeviceCapability::Full
        }
    }

    /// Check if only simple animation is available
    #[inline]
    pub fn is_simple(self) -> bool {
        matches!(self, DeviceCapability::SimpleAnimation)
    }
}

/// Check if a user agent belongs to a mobile device
pub fn is_mobile_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    ["iphone", "ipad", "ipod", "android"].iter().any(|m| ua.contains(m))
}

/// Strategy identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    VectorMorph,
    DomGhost,
}

/// Timing and look of one trailing ghost
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GhostFrame {
    /// Lag behind the timeline start
    pub delay_ms: f64,
    pub duration_ms: f64,
    pub opacity: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

/// Inputs for planning one launch
#[derive(Clone, Copy, Debug)]
pub struct LaunchContext<'a> {
    pub entity: EntityId,
    pub spec: &'a WindowSpec,
    pub start: Position,
    pub end: Position,
    /// Viewport at or below the narrow breakpoint
    pub narrow: bool,
    /// Stacking index from the window's computed style
    pub base_z_index: Option<i32>,
}

/// Nodes, initial values and tweens of one launch
#[derive(Clone, Debug, Default)]
pub struct LaunchPlan {
    /// Transient nodes to create, in paint order
    pub spawns: Vec<NodeSpec>,
    /// Values written before the timeline starts
    pub presets: Vec<(NodeRef, Vec<(Prop, f32)>)>,
    /// Stacking index to give the window, if any
    pub window_z_index: Option<i32>,
    pub tweens: Vec<Tween>,
}

/// Work to do once the launch timeline has finished
#[derive(Clone, Debug, Default)]
pub struct SettlePlan {
    /// Empty the entity's vector containers
    pub clear_outlines: bool,
    pub presets: Vec<(NodeRef, Vec<(Prop, f32)>)>,
    pub tweens: Vec<Tween>,
}

/// A way of flying a window in
pub trait LaunchStrategy {
    /// Strategy identifier
    fn kind(&self) -> StrategyKind;

    /// Ghost trail for an entity, front ghost first
    fn ghost_frames(&self, entity: EntityId, narrow: bool) -> Vec<GhostFrame>;

    /// Plan the flight
    fn plan(&self, ctx: &LaunchContext<'_>) -> LaunchPlan;

    /// Plan the hand-over once the flight has landed
    fn settle(&self, ctx: &LaunchContext<'_>) -> SettlePlan;
}

/// Pick the strategy for a device
pub fn strategy_for(capability: DeviceCapability) -> Box<dyn LaunchStrategy> {
    match capability {
        DeviceCapability::Full => Box::new(VectorMorph),
        DeviceCapability::SimpleAnimation => Box::new(DomGhost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_detect() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        assert_eq!(DeviceCapability::detect(iphone), DeviceCapability::SimpleAnimation);
        let pixel = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/120.0";
        assert_eq!(DeviceCapability::detect(pixel), DeviceCapability::Full);
        assert!(is_mobile_agent(pixel));
        assert!(!is_mobile_agent("Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0"));
    }

    #[test]
    fn test_strategy_for_capability() {
        assert_eq!(strategy_for(DeviceCapability::Full).kind(), StrategyKind::VectorMorph);
        assert_eq!(strategy_for(DeviceCapability::SimpleAnimation).kind(), StrategyKind::DomGhost);
    }

    #[test]
    fn test_ghost_trails_are_front_loaded() {
        for capability in [DeviceCapability::Full, DeviceCapability::SimpleAnimation] {
            let strategy = strategy_for(capability);
            for narrow in [false, true] {
                let frames = strategy.ghost_frames(EntityId::About, narrow);
                assert!(!frames.is_empty());
                for pair in frames.windows(2) {
                    assert!(pair[1].delay_ms > pair[0].delay_ms);
                    assert!(pair[1].duration_ms > pair[0].duration_ms);
                    assert!(pair[1].opacity <= pair[0].opacity);
                    assert!(pair[1].scale_x <= pair[0].scale_x);
                }
            }
        }
    }
}
