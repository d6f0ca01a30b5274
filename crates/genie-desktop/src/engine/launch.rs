//! Launch timelines and their hand-over to the content stage

use log::{debug, info, warn};

use super::{GenieEngine, StageEvent};
use crate::entity::{ContentKind, EntityId};
use crate::launch::{LaunchContext, LaunchStrategy};
use crate::reveal::content_duration_ms;
use crate::surface::Surface;
use crate::transition::Timeline;

impl<S: Surface> GenieEngine<S> {
    fn launch_context(&self, id: EntityId, narrow: bool) -> LaunchContext<'_> {
        LaunchContext {
            entity: id,
            spec: self.registry.spec(id),
            start: self.registry.start_position(id),
            end: self.registry.final_position(id),
            narrow,
            base_z_index: self.surface.window_z_index(id),
        }
    }

    /// Fly one window in
    pub(crate) fn launch(&mut self, now_ms: f64, id: EntityId) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if !self.surface.has_window(id) {
            warn!(target: "genie::launch", "{} missing, launch skipped", id.selector());
            return;
        }
        let (session_id, narrow) = (session.id, session.narrow);

        // Content is re-revealed after landing; hide it for the flight
        match id.kind() {
            ContentKind::Text => {
                let markup = self.surface.read_markup(id);
                if let Some(markup) = &markup {
                    self.surface.write_markup(id, "", false);
                    debug!(target: "genie::launch", "{} content captured ({} bytes)", id, markup.len());
                }
                if let Some(session) = self.session.as_mut() {
                    session.snapshots[id] = markup;
                }
            }
            ContentKind::Image => self.surface.set_image_visible(id, false),
            ContentKind::Decorative => {}
        }

        let plan = {
            let Some(session) = self.session.as_ref() else {
                return;
            };
            let ctx = self.launch_context(id, narrow);
            session.strategy.plan(&ctx)
        };

        if let Some(z) = plan.window_z_index {
            self.surface.set_window_z_index(id, z);
        }
        for spec in &plan.spawns {
            if let Err(e) = self.surface.spawn(spec) {
                warn!(target: "genie::launch", "{}: {}", id, e);
            }
        }
        for (node, values) in &plan.presets {
            self.surface.apply(*node, values);
        }

        let timeline = plan
            .tweens
            .into_iter()
            .fold(Timeline::new(session_id), Timeline::push)
            .on_complete((session_id, StageEvent::Landed(id)));
        self.animator.play_new(timeline, now_ms);
        info!(target: "genie::launch", "{} launched", id);
    }

    /// The flight finished: swap in the real window and park the content stage
    pub(crate) fn landed(&mut self, now_ms: f64, id: EntityId) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let session_id = session.id;
        let settle = session.strategy.settle(&self.launch_context(id, session.narrow));

        if settle.clear_outlines {
            self.surface.clear_outlines(Some(id));
        }
        for (node, values) in &settle.presets {
            self.surface.apply(*node, values);
        }
        if !settle.tweens.is_empty() {
            let shadow = settle
                .tweens
                .into_iter()
                .fold(Timeline::new(session_id), Timeline::push);
            self.animator.play_new(shadow, now_ms);
        }

        let content = Timeline::new(session_id)
            .duration(content_duration_ms(id))
            .on_start((session_id, StageEvent::ContentStarted(id)));
        let timeline = self.animator.add_paused(content);
        let deferred = match self.session.as_mut() {
            Some(session) => {
                session.content[id] = Some(timeline);
                std::mem::take(&mut session.deferred[id])
            }
            None => return,
        };
        debug!(target: "genie::launch", "{} landed, content stage registered", id);
        self.execute(now_ms, deferred);
    }

    /// Check if every revealing window has registered its content stage
    pub(crate) fn content_ready(&self) -> bool {
        self.session.as_ref().is_some_and(|s| {
            EntityId::REVEAL_ORDER
                .iter()
                .all(|id| s.content[*id].is_some())
        })
    }
}
