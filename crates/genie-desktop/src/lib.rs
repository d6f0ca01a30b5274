//! Entrance Choreography for the Genie Desktop Homepage
//!
//! This crate drives the animated entrance of a portfolio homepage styled
//! as a desktop:
//! - Responsive placement of five windows on a scaled canvas
//! - Launch animations (vector outline morph or cloned-shell ghost trail)
//! - Content reveals (pixel dissolve over images, typewriter over text)
//! - A guiding cursor that visits each window in turn
//! - Navigation lifecycle for single-page-app routers
//! - Horizontal swipe navigation between project pages
//!
//! ## Architecture
//!
//! The crate is organized into focused modules:
//!
//! - [`math`]: Core geometry types (`Vec2`, `Rect`, `Size`)
//! - [`layout`]: Layout classes, canvas scaling and window placement
//! - [`entity`]: The five stage windows and their per-class specs
//! - [`launch`]: Launch strategies and the plans they produce
//! - [`reveal`]: Pixel dissolve and typewriter state machines
//! - [`choreographer`]: Launch -> reveal -> cursor sequencing
//! - [`navigation`]: Navigation signals and the lifecycle monitor
//! - [`swipe`]: Touch swipe controller with a sliding cover
//! - [`transition`]: Tweens, timelines and the animator
//! - [`surface`]: The page abstraction the engine writes to
//!
//! ## Example
//!
//! ```rust
//! use genie_desktop::{GenieEngine, MemorySurface, NavigationSignal, Size, StageConfig};
//!
//! let surface = MemorySurface::new(Size::new(1400.0, 900.0));
//! let mut engine = GenieEngine::new(surface, StageConfig::default(), "", 7);
//! engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
//!
//! let mut now = 0.0;
//! while now < 15_000.0 {
//!     engine.tick(now);
//!     now += 16.0;
//! }
//! assert!(engine.reveal_snapshot().typing_done_contact);
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure Rust Core**: All sequencing is pure Rust, testable without a browser
//! 2. **Time Abstraction**: Every operation takes `now_ms`; nothing reads a clock
//! 3. **Session Scoping**: Timers and timelines belong to a session and die with it
//! 4. **Soft Failure**: Missing page elements skip work, they never abort the sequence

pub mod choreographer;
pub mod config;
pub mod entity;
pub mod error;
pub mod launch;
pub mod layout;
pub mod math;
pub mod navigation;
pub mod reveal;
pub mod scheduler;
pub mod signal;
pub mod surface;
pub mod swipe;
pub mod transition;

mod engine;

// WASM exports (only available with "wasm" feature)
#[cfg(feature = "wasm")]
mod wasm;
#[cfg(feature = "wasm")]
pub use wasm::*;

// Re-export core types for convenience
pub use choreographer::{ChoreoStage, Choreographer, Cue, Directive};
pub use config::{LaunchStagger, StageConfig, SwipeConfig};
pub use entity::{ContentKind, EntityId, EntityRegistry};
pub use error::{GenieError, Result};
pub use launch::{DeviceCapability, DomGhost, LaunchStrategy, VectorMorph};
pub use layout::{CanvasGeometry, LayoutClass, WindowSpec};
pub use math::{Rect, Size, Vec2};
pub use navigation::{NavigationMonitor, NavigationSignal, NavigationSource, NavigationState};
pub use reveal::{PixelDissolve, Typewriter};
pub use signal::{RevealSignals, RevealSnapshot};
pub use surface::{MemorySurface, NodeRef, Prop, Surface};
pub use swipe::{CoverSurface, MemoryCover, SwipeController, SwipeDirection, SwipePhase};

pub use engine::GenieEngine;
