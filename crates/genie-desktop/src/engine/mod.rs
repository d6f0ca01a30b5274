//! Stage engine coordinating all components
//!
//! This module is split into focused submodules:
//! - `lifecycle`: navigation signals, session start and teardown
//! - `layout`: canvas geometry, window placement and page globals
//! - `launch`: launch timelines and their hand-over
//! - `reveal`: dissolve and typewriter drivers
//! - `choreography`: carrying out choreographer directives, cursor motion
//! - `session`: per-visit state

mod choreography;
mod launch;
mod layout;
mod lifecycle;
mod reveal;
mod session;

use log::debug;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::choreographer::{ChoreoStage, Cue};
use crate::config::StageConfig;
use crate::entity::{EntityId, EntityRegistry};
use crate::launch::{is_mobile_agent, DeviceCapability};
use crate::layout::{compute_geometry, CanvasGeometry, LayoutClass};
use crate::navigation::{NavigationMonitor, NavigationSignal, NavigationSource, NavigationState};
use crate::scheduler::{Scheduler, SessionId, TimerId};
use crate::signal::RevealSnapshot;
use crate::surface::Surface;
use crate::transition::Animator;

use session::Session;

/// Deferred work, tagged with its session in the scheduler
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Task {
    /// History signal handled after the router has settled
    Navigate(NavigationSignal, String),
    Debounce,
    Attempt(u32),
    Cue(Cue),
    Launch(EntityId),
    TypeStep(EntityId),
    ImageCheck(EntityId),
    DissolveCleanup(EntityId),
}

/// Timeline start and completion events
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StageEvent {
    Landed(EntityId),
    ContentStarted(EntityId),
    CursorArrived(EntityId),
    CursorAtTaskbar,
    BounceDone,
    CursorFaded,
}

/// Stage engine
///
/// Owns the page surface and every piece of state of the entrance
/// sequence. Time is always passed in as `now_ms`; the engine never reads
/// a clock, so a test can drive it with a virtual one.
pub struct GenieEngine<S: Surface> {
    pub(crate) surface: S,
    pub(crate) config: StageConfig,
    pub(crate) registry: EntityRegistry,
    pub(crate) geometry: CanvasGeometry,
    pub(crate) capability: DeviceCapability,
    /// Mobile user agent: coarser dissolve even on wide viewports
    pub(crate) mobile_agent: bool,
    pub(crate) monitor: NavigationMonitor,
    pub(crate) source: NavigationSource,
    pub(crate) scheduler: Scheduler<Task>,
    pub(crate) animator: Animator<(SessionId, StageEvent)>,
    pub(crate) session: Option<Session>,
    pub(crate) next_session: u64,
    pub(crate) path: String,
    pub(crate) debounce: Option<TimerId>,
    pub(crate) rng: SmallRng,
}

impl<S: Surface> GenieEngine<S> {
    /// Create an engine for a page
    ///
    /// `user_agent` picks the launch strategy; `seed` feeds the dissolve's
    /// randomness.
    pub fn new(surface: S, config: StageConfig, user_agent: &str, seed: u64) -> Self {
        let viewport = surface.viewport();
        let geometry = compute_geometry(viewport.width, viewport.height);
        let class = LayoutClass::classify(viewport);
        let monitor = NavigationMonitor::new(config.debounce_ms, config.init_retry_ms, config.init_max_attempts);

        let mut engine = Self {
            surface,
            registry: EntityRegistry::new(class),
            geometry,
            capability: DeviceCapability::detect(user_agent),
            mobile_agent: is_mobile_agent(user_agent),
            monitor,
            source: NavigationSource::new(),
            scheduler: Scheduler::new(),
            animator: Animator::new(),
            session: None,
            next_session: 1,
            path: String::new(),
            debounce: None,
            rng: SmallRng::seed_from_u64(seed),
            config,
        };

        if engine.capability.is_simple() {
            engine.surface.remove_vector_stages();
        }
        engine.relayout();
        engine
    }

    #[inline]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[inline]
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[inline]
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    #[inline]
    pub fn geometry(&self) -> &CanvasGeometry {
        &self.geometry
    }

    #[inline]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    #[inline]
    pub fn capability(&self) -> DeviceCapability {
        self.capability
    }

    /// Lifecycle state
    #[inline]
    pub fn state(&self) -> NavigationState {
        self.monitor.state()
    }

    /// Path seen by the last handled navigation signal
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Navigation source, for registering listeners
    #[inline]
    pub fn navigation_source(&mut self) -> &mut NavigationSource {
        &mut self.source
    }

    /// Running session, if any
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Reveal flags of the running session (all lowered without one)
    pub fn reveal_snapshot(&self) -> RevealSnapshot {
        self.session
            .as_ref()
            .map(|s| s.signals.snapshot())
            .unwrap_or_default()
    }

    /// Progress of the running session's choreography
    pub fn choreo_stage(&self) -> ChoreoStage {
        self.session
            .as_ref()
            .map(|s| s.choreo.stage())
            .unwrap_or_default()
    }

    /// Number of live timelines
    #[inline]
    pub fn active_timelines(&self) -> usize {
        self.animator.len()
    }

    /// Number of pending timers
    #[inline]
    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    fn session_is(&self, id: SessionId) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == id)
    }

    /// Advance to `now_ms`: run due timers, then one animation frame
    pub fn tick(&mut self, now_ms: f64) {
        while let Some(due) = self.scheduler.pop_due(now_ms) {
            if let Some(owner) = due.session {
                if !self.session_is(owner) {
                    debug!(target: "genie::nav", "dropping {:?} from ended session {:?}", due.task, owner);
                    continue;
                }
            }
            self.run_task(due.due_ms, due.task);
        }

        let frame = self.animator.tick(now_ms);
        for (node, values) in &frame.updates {
            self.surface.apply(*node, values);
        }
        for node in frame.removals {
            self.surface.remove(node);
        }
        for (owner, event) in frame.events {
            if self.session_is(owner) {
                self.handle_event(now_ms, event);
            }
        }

        self.step_dissolves(now_ms);
    }

    fn run_task(&mut self, now_ms: f64, task: Task) {
        match task {
            Task::Navigate(signal, fired_at) => {
                let path = self.surface.current_path().unwrap_or(fired_at);
                self.handle_navigation(now_ms, signal, &path);
            }
            Task::Debounce => self.on_debounce(now_ms),
            Task::Attempt(attempt) => self.on_attempt(now_ms, attempt),
            Task::Cue(cue) => self.on_cue(now_ms, cue),
            Task::Launch(id) => self.launch(now_ms, id),
            Task::TypeStep(id) => self.type_step(now_ms, id),
            Task::ImageCheck(id) => self.image_check(now_ms, id),
            Task::DissolveCleanup(id) => self.dissolve_cleanup(id),
        }
    }

    fn handle_event(&mut self, now_ms: f64, event: StageEvent) {
        match event {
            StageEvent::Landed(id) => self.landed(now_ms, id),
            StageEvent::ContentStarted(id) => self.begin_reveal(now_ms, id),
            StageEvent::CursorArrived(id) => self.cursor_arrived(now_ms, id),
            StageEvent::CursorAtTaskbar => self.cursor_at_taskbar(now_ms),
            StageEvent::BounceDone => self.bounce_done(now_ms),
            StageEvent::CursorFaded => self.cursor_faded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Size;
    use crate::surface::{MemorySurface, Prop, NodeRef};

    const DESKTOP_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0";
    const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";

    fn engine() -> GenieEngine<MemorySurface> {
        GenieEngine::new(
            MemorySurface::new(Size::new(1400.0, 900.0)),
            StageConfig::default(),
            DESKTOP_UA,
            1,
        )
    }

    #[test]
    fn test_engine_init_lays_out_windows() {
        let engine = engine();
        assert_eq!(engine.state(), NavigationState::Uninitialized);
        assert!((engine.geometry().scale_factor - 1.0).abs() < 0.001);
        let hello = engine.surface().window_rect(EntityId::Hello).unwrap();
        assert!((hello.x - 490.0).abs() < 0.001);
        assert!((hello.width - 420.0).abs() < 0.001);
        assert!(engine.surface().has_vector_stages());
    }

    #[test]
    fn test_simple_devices_drop_vector_stages() {
        let engine = GenieEngine::new(
            MemorySurface::new(Size::new(390.0, 844.0)),
            StageConfig::default(),
            IPHONE_UA,
            1,
        );
        assert!(engine.capability().is_simple());
        assert!(!engine.surface().has_vector_stages());
        assert!(engine.surface().globals().unwrap().use_simple_animation);
    }

    #[test]
    fn test_initial_setup_starts_immediately() {
        let mut engine = engine();
        engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
        engine.tick(0.0);
        assert_eq!(engine.state(), NavigationState::Ready);
        assert!(engine.session_id().is_some());
        assert!(engine.surface().markers().homepage);
    }

    #[test]
    fn test_launch_hides_windows_first() {
        let mut engine = engine();
        engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
        engine.tick(0.0);
        engine.tick(16.0);
        for id in EntityId::ALL {
            assert_eq!(engine.surface().value(NodeRef::Window(id), Prop::Opacity), Some(0.0));
        }
    }

    #[test]
    fn test_stale_tasks_are_dropped() {
        let mut engine = engine();
        engine
            .scheduler
            .schedule(0.0, 10.0, Some(SessionId(42)), Task::Launch(EntityId::Hello));
        engine.tick(20.0);
        assert!(engine.surface().live_nodes().next().is_none());
        assert_eq!(engine.pending_timers(), 0);
    }
}
