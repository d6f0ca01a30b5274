//! Carrying out choreographer directives: timers, idle float and cursor motion

use std::collections::VecDeque;

use log::{debug, warn};

use super::{GenieEngine, StageEvent, Task};
use crate::choreographer::{
    cursor_rest, cursor_width, taskbar_target, Choreographer, Cue, Directive, BOUNCE_HEIGHT,
};
use crate::entity::EntityId;
use crate::math::Vec2;
use crate::surface::{NodeRef, NodeSpec, Prop, Surface};
use crate::transition::{Easing, Repeat, Timeline, Tween};

impl<S: Surface> GenieEngine<S> {
    /// Run directives, including any follow-ups they produce
    pub(crate) fn execute(&mut self, now_ms: f64, directives: Vec<Directive>) {
        let mut queue: VecDeque<Directive> = directives.into();
        while let Some(directive) = queue.pop_front() {
            queue.extend(self.perform(now_ms, directive));
        }
    }

    fn perform(&mut self, now_ms: f64, directive: Directive) -> Vec<Directive> {
        let Some(session) = self.session.as_ref() else {
            return Vec::new();
        };
        let (session_id, narrow) = (session.id, session.narrow);

        if let Some(id) = directive.needs_landed() {
            if self.in_flight(id) {
                debug!(target: "genie::choreo", "{:?} held until {} lands", directive, id);
                if let Some(session) = self.session.as_mut() {
                    session.deferred[id].push(directive);
                }
                return Vec::new();
            }
        }

        match directive {
            Directive::HideAll => {
                for id in EntityId::ALL {
                    self.surface.apply(NodeRef::Window(id), &[(Prop::Opacity, 0.0)]);
                }
                Vec::new()
            }
            Directive::Launch { id, delay_ms } => {
                self.scheduler
                    .schedule(now_ms, delay_ms, Some(session_id), Task::Launch(id));
                Vec::new()
            }
            Directive::Schedule { delay_ms, cue } => {
                self.scheduler
                    .schedule(now_ms, delay_ms, Some(session_id), Task::Cue(cue));
                Vec::new()
            }
            Directive::SpawnCursor { over } => {
                self.spawn_cursor(over, narrow);
                Vec::new()
            }
            Directive::StartReveal(id) => {
                self.start_reveal(now_ms, id);
                Vec::new()
            }
            Directive::StartFloat => {
                self.start_float(now_ms);
                Vec::new()
            }
            Directive::MoveCursor { to, duration_ms } => {
                let target = self
                    .surface
                    .window_screen_rect(to)
                    .map(|rect| cursor_rest(rect, narrow));
                match target {
                    Some(target) if self.has_cursor() => {
                        self.glide_cursor(now_ms, target, duration_ms, Easing::Power2Out, StageEvent::CursorArrived(to));
                        Vec::new()
                    }
                    // Nothing to move: go straight on with the reveal
                    _ => self.session_choreo(|c| c.on_cursor_arrived(to)),
                }
            }
            Directive::MoveCursorToTaskbar { duration_ms } => {
                if !self.has_cursor() {
                    return self.session_choreo(|c| c.on_cursor_at_taskbar());
                }
                let target = taskbar_target(self.surface.viewport(), narrow);
                self.glide_cursor(now_ms, target, duration_ms, Easing::Power2InOut, StageEvent::CursorAtTaskbar);
                Vec::new()
            }
            Directive::BounceCursor { duration_ms } => {
                let Some(at) = self.session.as_ref().and_then(|s| s.cursor) else {
                    return self.session_choreo(|c| c.on_bounce_done());
                };
                let bounce = Tween::new(NodeRef::Cursor, duration_ms, Easing::Power1InOut)
                    .prop(Prop::Y, at.y, at.y - BOUNCE_HEIGHT)
                    .repeat(Repeat::Times(2))
                    .yoyo();
                let timeline = Timeline::new(session_id)
                    .push(bounce)
                    .on_complete((session_id, StageEvent::BounceDone));
                self.animator.play_new(timeline, now_ms);
                Vec::new()
            }
            Directive::FadeCursor { duration_ms } => {
                if !self.has_cursor() {
                    self.cursor_faded();
                    return Vec::new();
                }
                let fade = Tween::new(NodeRef::Cursor, duration_ms, Easing::SineOut)
                    .prop(Prop::Opacity, 1.0, 0.0)
                    .remove_on_complete();
                let timeline = Timeline::new(session_id)
                    .push(fade)
                    .on_complete((session_id, StageEvent::CursorFaded));
                self.animator.play_new(timeline, now_ms);
                Vec::new()
            }
        }
    }

    fn session_choreo<F>(&mut self, f: F) -> Vec<Directive>
    where
        F: FnOnce(&mut Choreographer) -> Vec<Directive>,
    {
        self.session.as_mut().map(|s| f(&mut s.choreo)).unwrap_or_default()
    }

    /// Check if a window is on the page but has not landed yet
    fn in_flight(&self, id: EntityId) -> bool {
        self.surface.has_window(id) && self.session.as_ref().is_some_and(|s| s.content[id].is_none())
    }

    #[inline]
    fn has_cursor(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.cursor.is_some())
    }

    fn spawn_cursor(&mut self, over: EntityId, narrow: bool) {
        let Some(rect) = self.surface.window_screen_rect(over) else {
            warn!(target: "genie::choreo", "{} not on screen, no cursor", over.selector());
            return;
        };
        let at = cursor_rest(rect, narrow);
        let spawned = self.surface.spawn(&NodeSpec::Cursor {
            width: cursor_width(narrow),
        });
        let cursor = match spawned {
            Ok(node) => {
                self.surface.apply(
                    node,
                    &[
                        (Prop::X, at.x),
                        (Prop::Y, at.y),
                        (Prop::Opacity, 1.0),
                        (Prop::ScaleX, 1.0),
                        (Prop::ScaleY, 1.0),
                    ],
                );
                Some(at)
            }
            Err(e) => {
                warn!(target: "genie::choreo", "cursor: {}", e);
                None
            }
        };
        if let Some(session) = self.session.as_mut() {
            session.cursor = cursor;
        }
    }

    fn glide_cursor(&mut self, now_ms: f64, to: Vec2, duration_ms: f64, easing: Easing, event: StageEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(from) = session.cursor.replace(to) else {
            return;
        };
        let glide = Tween::new(NodeRef::Cursor, duration_ms, easing)
            .prop(Prop::X, from.x, to.x)
            .prop(Prop::Y, from.y, to.y);
        let timeline = Timeline::new(session.id)
            .push(glide)
            .on_complete((session.id, event));
        self.animator.play_new(timeline, now_ms);
    }

    /// Play the content stage, or reveal directly when it never registered
    fn start_reveal(&mut self, now_ms: f64, id: EntityId) {
        if !self.surface.has_window(id) {
            debug!(target: "genie::choreo", "{} missing, counted as revealed", id);
            self.complete_reveal(id);
            return;
        }
        let content = self.session.as_ref().and_then(|s| s.content[id]);
        match content {
            Some(timeline) if self.animator.play(timeline, now_ms) => {}
            _ => self.begin_reveal(now_ms, id),
        }
    }

    fn start_float(&mut self, now_ms: f64) {
        let Some(session_id) = self.session_id() else {
            return;
        };
        for id in EntityId::ALL {
            if !self.surface.has_window(id) {
                continue;
            }
            let spec = self.registry.spec(id);
            let float = Tween::new(
                NodeRef::Window(id),
                f64::from(spec.float_duration) * 1000.0,
                Easing::SineInOut,
            )
            .prop(Prop::OffsetY, 0.0, spec.float_amplitude)
            .repeat(Repeat::Forever)
            .yoyo();
            self.animator.play_new(Timeline::new(session_id).push(float), now_ms);
        }
    }

    pub(crate) fn on_cue(&mut self, now_ms: f64, cue: Cue) {
        let content_ready = self.content_ready();
        let directives = match self.session.as_mut() {
            Some(session) => session.choreo.on_cue(cue, content_ready, &session.signals),
            None => return,
        };
        self.execute(now_ms, directives);
    }

    pub(crate) fn cursor_arrived(&mut self, now_ms: f64, id: EntityId) {
        let directives = self.session_choreo(|c| c.on_cursor_arrived(id));
        self.execute(now_ms, directives);
    }

    pub(crate) fn cursor_at_taskbar(&mut self, now_ms: f64) {
        let directives = self.session_choreo(|c| c.on_cursor_at_taskbar());
        self.execute(now_ms, directives);
    }

    pub(crate) fn bounce_done(&mut self, now_ms: f64) {
        let directives = self.session_choreo(|c| c.on_bounce_done());
        self.execute(now_ms, directives);
    }

    pub(crate) fn cursor_faded(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.cursor = None;
            session.choreo.on_cursor_removed();
        }
    }
}
