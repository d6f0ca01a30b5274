//! Navigation handling, session start and teardown

use log::{debug, info, warn};

use super::session::Session;
use super::{GenieEngine, Task};
use crate::entity::{ContentKind, EntityId};
use crate::navigation::{MonitorAction, NavigationSignal};
use crate::scheduler::SessionId;
use crate::surface::Surface;

impl<S: Surface> GenieEngine<S> {
    /// Offer a navigation signal observed at `path`
    ///
    /// History signals are handled once the router has had time to settle,
    /// against whatever path the page shows by then. Everything else is
    /// handled right away.
    pub fn navigation_signal(&mut self, now_ms: f64, signal: NavigationSignal, path: &str) {
        let Some(event) = self.source.emit(signal, path) else {
            return;
        };
        if event.signal.is_history() {
            self.scheduler.schedule(
                now_ms,
                self.config.history_settle_ms,
                None,
                Task::Navigate(event.signal, event.path),
            );
        } else {
            self.handle_navigation(now_ms, event.signal, &event.path);
        }
    }

    /// The single handler every navigation signal ends up in
    pub(crate) fn handle_navigation(&mut self, now_ms: f64, signal: NavigationSignal, path: &str) {
        self.path = path.to_string();
        self.refresh_markers();

        let on_target = self.config.is_target(path);
        if !on_target {
            self.surface.restore_scrolling();
        }
        debug!(target: "genie::nav", "{:?} at {:?}", signal, path);
        let actions = self.monitor.on_signal(signal, on_target, self.surface.readiness());
        self.perform_monitor(now_ms, actions);
    }

    pub(crate) fn on_debounce(&mut self, now_ms: f64) {
        self.debounce = None;
        let on_target = self.config.is_target(&self.path);
        let actions = self.monitor.on_debounce_elapsed(on_target);
        self.perform_monitor(now_ms, actions);
    }

    pub(crate) fn on_attempt(&mut self, now_ms: f64, attempt: u32) {
        let readiness = self.surface.readiness();
        let on_target = self.config.is_target(&self.path);
        debug!(target: "genie::nav", "readiness attempt {}: {:?}", attempt, readiness);
        let actions = self.monitor.on_attempt(attempt, readiness.is_ready(), on_target);
        self.perform_monitor(now_ms, actions);
    }

    fn perform_monitor(&mut self, now_ms: f64, actions: Vec<MonitorAction>) {
        for action in actions {
            match action {
                MonitorAction::ArmDebounce { delay_ms } => {
                    if let Some(timer) = self.debounce.take() {
                        self.scheduler.cancel(timer);
                    }
                    self.debounce = Some(self.scheduler.schedule(now_ms, delay_ms, None, Task::Debounce));
                }
                MonitorAction::Attempt { attempt, delay_ms } => {
                    self.scheduler
                        .schedule(now_ms, delay_ms, None, Task::Attempt(attempt));
                }
                MonitorAction::CancelPending => {
                    self.debounce = None;
                    self.scheduler
                        .cancel_where(|t| matches!(t, Task::Debounce | Task::Attempt(_)));
                }
                MonitorAction::Start { forced } => self.start_session(now_ms, forced),
                MonitorAction::TearDown => {
                    self.teardown();
                    self.monitor.teardown_complete();
                }
            }
        }
    }

    fn start_session(&mut self, now_ms: f64, forced: bool) {
        if forced {
            warn!(
                target: "genie::nav",
                "page structure incomplete after {} attempts, starting anyway",
                self.config.init_max_attempts
            );
            if !EntityId::ALL.iter().any(|id| self.surface.has_window(*id)) {
                warn!(target: "genie::nav", "no stage windows on the page, session aborted");
                return;
            }
        }

        let id = SessionId(self.next_session);
        self.next_session += 1;
        let narrow = self.is_narrow();
        info!(target: "genie::nav", "session {:?} started", id);

        self.relayout();
        let mut session = Session::new(id, &self.config, self.capability, narrow);
        let directives = session.choreo.run(narrow);
        self.session = Some(session);
        self.publish();
        self.execute(now_ms, directives);
    }

    /// Release everything the current session created
    pub(crate) fn teardown(&mut self) {
        let Some(session) = self.session.take() else {
            self.force_reset();
            return;
        };
        info!(target: "genie::nav", "session {:?} torn down", session.id);
        let timers = self.scheduler.cancel_session(session.id);
        let timelines = self.animator.kill_session(session.id);
        debug!(target: "genie::nav", "cancelled {} timers, {} timelines", timers, timelines);

        // Put back any text that was cleared or half typed
        for id in EntityId::ALL {
            let original = session.snapshots[id].clone().or_else(|| match &session.reveals[id] {
                Some(crate::reveal::ActiveReveal::Typing(tw)) => Some(tw.original().to_string()),
                _ => None,
            });
            if let Some(markup) = original {
                self.surface.write_markup(id, &markup, false);
            }
        }
        self.force_reset();
    }

    /// Kill every animation and return the page to its pre-launch look
    pub fn force_reset(&mut self) {
        self.animator.clear();
        self.surface.remove_transients();
        self.surface.clear_outlines(None);
        for id in EntityId::ALL {
            self.surface.unmount_particles(id);
            if id.kind() == ContentKind::Image {
                self.surface.set_image_visible(id, true);
            }
            self.surface.reset_window(id);
        }
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use crate::config::StageConfig;
    use crate::engine::GenieEngine;
    use crate::math::Size;
    use crate::navigation::{NavigationSignal, NavigationState};
    use crate::surface::{MemorySurface, Readiness, Surface, SurfaceEvent};

    fn engine(surface: MemorySurface) -> GenieEngine<MemorySurface> {
        GenieEngine::new(surface, StageConfig::default(), "", 9)
    }

    #[test]
    fn test_history_signal_waits_before_handling() {
        let mut engine = engine(MemorySurface::new(Size::new(1400.0, 900.0)));
        engine.navigation_signal(0.0, NavigationSignal::HistoryPush, "/home");
        engine.tick(40.0);
        assert_eq!(engine.state(), NavigationState::Uninitialized);
        engine.tick(50.0);
        assert_eq!(engine.state(), NavigationState::PendingDebounce);
        engine.tick(249.0);
        assert_eq!(engine.state(), NavigationState::PendingDebounce);
        engine.tick(250.0);
        assert_eq!(engine.state(), NavigationState::Ready);
    }

    #[test]
    fn test_history_signal_reads_path_after_settle() {
        let mut engine = engine(MemorySurface::new(Size::new(1400.0, 900.0)));
        engine.navigation_signal(0.0, NavigationSignal::HistoryPush, "/home");
        engine.surface_mut().set_path("/project-02");
        engine.tick(50.0);
        assert_eq!(engine.path(), "/project-02");
        assert_eq!(engine.state(), NavigationState::Uninitialized);
        engine.tick(400.0);
        assert!(engine.session_id().is_none());
    }

    #[test]
    fn test_new_signals_restart_debounce() {
        let mut engine = engine(MemorySurface::new(Size::new(1400.0, 900.0)));
        engine.navigation_signal(0.0, NavigationSignal::VisibilityVisible, "/home");
        engine.tick(150.0);
        engine.navigation_signal(150.0, NavigationSignal::VisibilityVisible, "/home");
        engine.tick(300.0);
        assert_eq!(engine.state(), NavigationState::PendingDebounce);
        engine.tick(350.0);
        assert_eq!(engine.state(), NavigationState::Ready);
    }

    #[test]
    fn test_forced_start_on_broken_page_aborts_softly() {
        let mut engine = engine(MemorySurface::empty(Size::new(1400.0, 900.0)));
        engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
        for step in 0..=20 {
            engine.tick(f64::from(step) * 100.0);
        }
        assert_eq!(engine.state(), NavigationState::Ready);
        assert!(engine.session_id().is_none());
    }

    #[test]
    fn test_leaving_restores_scrolling() {
        let mut engine = engine(MemorySurface::new(Size::new(1400.0, 900.0)));
        engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
        engine.tick(0.0);
        engine.surface_mut().take_events();

        engine.navigation_signal(500.0, NavigationSignal::UrlPoll, "/project-02");
        let events = engine.surface().events();
        assert!(events.contains(&SurfaceEvent::RestoreScrolling));
        assert!(!engine.surface().markers().homepage);
        assert_eq!(engine.state(), NavigationState::Uninitialized);
        assert!(engine.session_id().is_none());
    }

    #[test]
    fn test_splash_marker() {
        let mut engine = engine(MemorySurface::new(Size::new(1400.0, 900.0)));
        engine.navigation_signal(0.0, NavigationSignal::Load, "/");
        assert!(engine.surface().markers().splash);
        assert!(!engine.surface().markers().homepage);
    }

    #[test]
    fn test_mutation_rearm_needs_anchors() {
        let mut surface = MemorySurface::new(Size::new(1400.0, 900.0));
        surface.set_readiness(Readiness::default());
        let mut engine = engine(surface);
        engine.navigation_signal(0.0, NavigationSignal::DomMutation, "/home");
        assert_eq!(engine.state(), NavigationState::Uninitialized);

        engine.surface_mut().set_readiness(Readiness {
            layout_container: true,
            icon_count: 0,
            drawing_surface: true,
        });
        engine.navigation_signal(10.0, NavigationSignal::DomMutation, "/home");
        assert_eq!(engine.state(), NavigationState::PendingDebounce);
        assert!(!engine.surface().readiness().is_ready());
    }
}
