//! Driving the dissolve and typewriter reveals

use log::{debug, info, warn};

use super::{GenieEngine, Task};
use crate::entity::{ContentKind, EntityId};
use crate::error::GenieError;
use crate::reveal::{ActiveReveal, DissolveProfile, PixelDissolve, TypeStep, Typewriter};
use crate::surface::Surface;

impl<S: Surface> GenieEngine<S> {
    /// Raise an entity's reveal signal and tell the page
    pub(crate) fn complete_reveal(&mut self, id: EntityId) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.reveals[id] = None;
        if session.signals.complete(id) {
            info!(target: "genie::reveal", "{} revealed", id);
            self.publish();
        }
    }

    /// The entity's content stage started playing
    pub(crate) fn begin_reveal(&mut self, now_ms: f64, id: EntityId) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.reveals[id].is_some() || session.signals.is_complete(id) {
            debug!(target: "genie::reveal", "{} already revealing", id);
            return;
        }
        match id.kind() {
            ContentKind::Image => self.try_dissolve(now_ms, id, 0),
            ContentKind::Text => self.start_typing(now_ms, id),
            ContentKind::Decorative => self.complete_reveal(id),
        }
    }

    /// Show the image at once, skipping the dissolve
    fn instant_reveal(&mut self, id: EntityId) {
        self.surface.unmount_particles(id);
        self.surface.set_image_visible(id, true);
        self.complete_reveal(id);
    }

    fn try_dissolve(&mut self, now_ms: f64, id: EntityId, checks: u32) {
        let sample = match self.surface.sample_image(id) {
            Ok(sample) => sample,
            Err(GenieError::ImagePending) if checks + 1 < self.config.image_max_checks => {
                if let Some(session) = self.session.as_mut() {
                    session.reveals[id] = Some(ActiveReveal::AwaitingImage { attempts: checks + 1 });
                }
                self.scheduler.schedule(
                    now_ms,
                    self.config.image_poll_ms,
                    self.session_id(),
                    Task::ImageCheck(id),
                );
                return;
            }
            Err(e) => {
                warn!(target: "genie::reveal", "{}: {}, revealing without dissolve", id, e);
                self.instant_reveal(id);
                return;
            }
        };

        let constrained = self.is_narrow() || self.mobile_agent;
        let profile = DissolveProfile::for_device(constrained);
        let dissolve = PixelDissolve::new(id, &sample, &profile, &mut self.rng);
        if let Err(e) = self.surface.mount_particles(id, dissolve.particles(), constrained) {
            warn!(target: "genie::reveal", "{}: {}, revealing without dissolve", id, e);
            self.instant_reveal(id);
            return;
        }
        debug!(
            target: "genie::reveal",
            "{} dissolving {} particles over {:.0} frames",
            id,
            dissolve.particles().len(),
            dissolve.total_frames()
        );
        if let Some(session) = self.session.as_mut() {
            session.reveals[id] = Some(ActiveReveal::Dissolving(dissolve));
        }
    }

    pub(crate) fn image_check(&mut self, now_ms: f64, id: EntityId) {
        let checks = match self.session.as_ref().and_then(|s| s.reveals[id].as_ref()) {
            Some(ActiveReveal::AwaitingImage { attempts }) => *attempts,
            _ => return,
        };
        self.try_dissolve(now_ms, id, checks);
    }

    /// Paint one frame of every running dissolve
    pub(crate) fn step_dissolves(&mut self, now_ms: f64) {
        for id in EntityId::ALL {
            let Some(session) = self.session.as_mut() else {
                return;
            };
            let Some(ActiveReveal::Dissolving(dissolve)) = session.reveals[id].as_mut() else {
                continue;
            };
            let frame = dissolve.step(&mut self.rng);
            self.surface.paint_particles(id, &frame.phases);
            if frame.finished {
                self.surface.set_image_visible(id, true);
                session.reveals[id] = Some(ActiveReveal::Settling);
                let session_id = session.id;
                self.scheduler.schedule(
                    now_ms,
                    self.config.dissolve_cleanup_ms,
                    Some(session_id),
                    Task::DissolveCleanup(id),
                );
            }
        }
    }

    pub(crate) fn dissolve_cleanup(&mut self, id: EntityId) {
        self.surface.unmount_particles(id);
        self.complete_reveal(id);
    }

    fn start_typing(&mut self, now_ms: f64, id: EntityId) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let markup = session.snapshots[id]
            .take()
            .or_else(|| self.surface.read_markup(id))
            .unwrap_or_default();
        let typewriter = Typewriter::new(id, &markup);

        if typewriter.is_blank() {
            debug!(target: "genie::reveal", "{} has nothing to type", id);
            self.surface.write_markup(id, &markup, false);
            self.complete_reveal(id);
            return;
        }
        session.reveals[id] = Some(ActiveReveal::Typing(typewriter));
        self.surface.write_markup(id, "", true);
        self.scheduler.schedule(
            now_ms,
            self.config.type_interval_ms,
            Some(session.id),
            Task::TypeStep(id),
        );
    }

    pub(crate) fn type_step(&mut self, now_ms: f64, id: EntityId) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(ActiveReveal::Typing(typewriter)) = session.reveals[id].as_mut() else {
            return;
        };
        match typewriter.step() {
            TypeStep::Partial(markup) => {
                self.surface.write_markup(id, &markup, true);
                self.scheduler.schedule(
                    now_ms,
                    self.config.type_interval_ms,
                    Some(session.id),
                    Task::TypeStep(id),
                );
            }
            TypeStep::Done(markup) => {
                self.surface.write_markup(id, &markup, false);
                self.complete_reveal(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::StageConfig;
    use crate::engine::GenieEngine;
    use crate::entity::EntityId;
    use crate::error::GenieError;
    use crate::math::Size;
    use crate::navigation::NavigationSignal;
    use crate::surface::{MemorySurface, SurfaceEvent};

    fn engine(surface: MemorySurface) -> GenieEngine<MemorySurface> {
        let mut engine = GenieEngine::new(surface, StageConfig::default(), "", 11);
        engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
        engine
    }

    fn run_until(engine: &mut GenieEngine<MemorySurface>, from: f64, to: f64) {
        let mut now = from;
        while now <= to {
            engine.tick(now);
            now += 16.0;
        }
    }

    fn mounted(engine: &GenieEngine<MemorySurface>, id: EntityId) -> bool {
        engine
            .surface()
            .events()
            .iter()
            .any(|e| matches!(e, SurfaceEvent::MountParticles { id: m, .. } if *m == id))
    }

    #[test]
    fn test_dissolve_reveals_and_cleans_up() {
        let mut engine = engine(MemorySurface::new(Size::new(1400.0, 900.0)));
        run_until(&mut engine, 0.0, 3400.0);
        assert!(!mounted(&engine, EntityId::Hello));
        assert!(!engine.surface().image_visible(EntityId::Hello));

        run_until(&mut engine, 3416.0, 4500.0);
        assert!(mounted(&engine, EntityId::Hello));
        assert!(engine.surface().painted_frames(EntityId::Hello) > 0);
        assert!(engine.surface().particles(EntityId::Hello).is_none());
        assert!(engine.surface().image_visible(EntityId::Hello));
        assert!(engine.reveal_snapshot().hello_belt_done);
    }

    #[test]
    fn test_restricted_image_reveals_instantly() {
        let mut surface = MemorySurface::new(Size::new(1400.0, 900.0));
        surface.set_image_error(EntityId::Hello, GenieError::RenderingRestricted("tainted canvas".to_string()));
        let mut engine = engine(surface);
        run_until(&mut engine, 0.0, 4000.0);
        assert!(engine.reveal_snapshot().hello_belt_done);
        assert!(engine.surface().image_visible(EntityId::Hello));
        assert!(!mounted(&engine, EntityId::Hello));
    }

    #[test]
    fn test_pending_image_is_awaited() {
        let mut surface = MemorySurface::new(Size::new(1400.0, 900.0));
        surface.set_image_pending(EntityId::Hello, 3);
        let mut engine = engine(surface);
        run_until(&mut engine, 0.0, 4500.0);
        assert!(mounted(&engine, EntityId::Hello));
        assert!(engine.surface().painted_frames(EntityId::Hello) > 0);
        assert!(engine.reveal_snapshot().hello_belt_done);
    }

    #[test]
    fn test_image_that_never_decodes() {
        let mut surface = MemorySurface::new(Size::new(1400.0, 900.0));
        surface.set_image_pending(EntityId::Hello, 1000);
        let mut engine = engine(surface);
        run_until(&mut engine, 0.0, 3600.0 + 60.0 * 50.0 + 100.0);
        assert!(engine.reveal_snapshot().hello_belt_done);
        assert!(engine.surface().image_visible(EntityId::Hello));
    }

    #[test]
    fn test_typing_restores_markup() {
        let mut engine = engine(MemorySurface::new(Size::new(1400.0, 900.0)));
        let original = engine.surface().markup(EntityId::About).unwrap().to_string();
        run_until(&mut engine, 0.0, 12_000.0);
        assert!(engine.reveal_snapshot().typing_done_about);
        assert_eq!(engine.surface().markup(EntityId::About), Some(original.as_str()));
        assert!(!engine.surface().caret(EntityId::About));
    }

    #[test]
    fn test_blank_text_completes_at_once() {
        let mut surface = MemorySurface::new(Size::new(1400.0, 900.0));
        surface.set_markup(EntityId::About, "  ");
        let mut engine = engine(surface);
        run_until(&mut engine, 0.0, 12_000.0);
        assert!(engine.reveal_snapshot().typing_done_about);
        assert!(engine.reveal_snapshot().typing_done_contact);
    }
}
