//! Timelines: groups of tweens sharing one clock

use super::{Tween, TweenSample};
use crate::scheduler::SessionId;
use crate::surface::{NodeRef, Prop};

/// A set of tweens played together, with optional start and completion events
///
/// `E` is the caller's event type; the animator hands events back when the
/// timeline starts or finishes instead of invoking callbacks.
#[derive(Clone, Debug)]
pub struct Timeline<E> {
    session: SessionId,
    delay_ms: f64,
    min_duration_ms: f64,
    tweens: Vec<Tween>,
    finished: Vec<bool>,
    on_start: Option<E>,
    on_complete: Option<E>,
    started: bool,
}

/// Output of advancing a timeline
#[derive(Clone, Debug)]
pub(crate) struct TimelineStep<E> {
    pub updates: Vec<(NodeRef, Vec<(Prop, f32)>)>,
    pub removals: Vec<NodeRef>,
    pub events: Vec<E>,
    pub complete: bool,
}

impl<E: Clone> Timeline<E> {
    /// Create an empty timeline owned by a session
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            delay_ms: 0.0,
            min_duration_ms: 0.0,
            tweens: Vec::new(),
            finished: Vec::new(),
            on_start: None,
            on_complete: None,
            started: false,
        }
    }

    /// Delay before the first tween may start
    pub fn delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms.max(0.0);
        self
    }

    /// Minimum length, for timelines that only carry events
    pub fn duration(mut self, duration_ms: f64) -> Self {
        self.min_duration_ms = duration_ms.max(0.0);
        self
    }

    /// Append a tween
    pub fn push(mut self, tween: Tween) -> Self {
        self.tweens.push(tween);
        self.finished.push(false);
        self
    }

    /// Event emitted the first time the timeline clock passes its delay
    pub fn on_start(mut self, event: E) -> Self {
        self.on_start = Some(event);
        self
    }

    /// Event emitted once every finite tween has ended
    pub fn on_complete(mut self, event: E) -> Self {
        self.on_complete = Some(event);
        self
    }

    /// Owning session
    #[inline]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Tweens in insertion order
    #[inline]
    pub fn tweens(&self) -> &[Tween] {
        &self.tweens
    }

    /// Total length after the delay, `None` if any tween loops forever
    pub fn duration_ms(&self) -> Option<f64> {
        self.tweens
            .iter()
            .try_fold(self.min_duration_ms, |acc, t| t.end_ms().map(|end| acc.max(end)))
    }

    /// Advance to `elapsed_ms` measured from the moment the timeline was played
    pub(crate) fn advance(&mut self, elapsed_ms: f64) -> TimelineStep<E> {
        let mut step = TimelineStep {
            updates: Vec::new(),
            removals: Vec::new(),
            events: Vec::new(),
            complete: false,
        };

        let local = elapsed_ms - self.delay_ms;
        if local < 0.0 {
            return step;
        }

        if !self.started {
            self.started = true;
            if let Some(event) = self.on_start.clone() {
                step.events.push(event);
            }
        }

        for (tween, finished) in self.tweens.iter().zip(self.finished.iter_mut()) {
            if *finished {
                continue;
            }
            match tween.sample(local) {
                TweenSample::Pending => {}
                TweenSample::Active(t) => step.updates.push((tween.node, tween.values(t))),
                TweenSample::Done(t) => {
                    *finished = true;
                    step.updates.push((tween.node, tween.values(t)));
                    if tween.remove_on_complete {
                        step.removals.push(tween.node);
                    }
                }
            }
        }

        if let Some(total) = self.duration_ms() {
            if local >= total && self.finished.iter().all(|f| *f) {
                step.complete = true;
                if let Some(event) = self.on_complete.clone() {
                    step.events.push(event);
                }
            }
        }

        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::transition::{Easing, Repeat};

    #[derive(Clone, Debug, PartialEq)]
    enum Ev {
        Start,
        Done,
    }

    #[test]
    fn test_timeline_delay_and_events() {
        let mut tl = Timeline::new(SessionId(1))
            .delay(100.0)
            .push(Tween::new(NodeRef::Cursor, 200.0, Easing::Linear).prop(Prop::Opacity, 0.0, 1.0))
            .on_start(Ev::Start)
            .on_complete(Ev::Done);

        let step = tl.advance(50.0);
        assert!(step.updates.is_empty());
        assert!(step.events.is_empty());

        let step = tl.advance(150.0);
        assert_eq!(step.events, vec![Ev::Start]);
        assert_eq!(step.updates.len(), 1);
        assert!(!step.complete);

        let step = tl.advance(300.0);
        assert!(step.complete);
        assert_eq!(step.events, vec![Ev::Done]);
        assert!((step.updates[0].1[0].1 - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_timeline_removes_nodes_on_tween_end() {
        let ghost = NodeRef::Ghost { entity: EntityId::About, index: 0 };
        let mut tl: Timeline<Ev> = Timeline::new(SessionId(1)).push(
            Tween::new(ghost, 300.0, Easing::SineOut)
                .prop(Prop::Opacity, 0.9, 0.0)
                .remove_on_complete(),
        );
        assert!(tl.advance(100.0).removals.is_empty());
        let step = tl.advance(400.0);
        assert_eq!(step.removals, vec![ghost]);
        // Finished tweens are not sampled again
        assert!(tl.advance(500.0).updates.is_empty());
    }

    #[test]
    fn test_event_only_timeline() {
        let mut tl = Timeline::new(SessionId(2)).duration(960.0).on_complete(Ev::Done);
        assert_eq!(tl.duration_ms(), Some(960.0));
        assert!(!tl.advance(500.0).complete);
        assert!(tl.advance(960.0).complete);
    }

    #[test]
    fn test_forever_timeline_never_completes() {
        let mut tl = Timeline::new(SessionId(3))
            .push(
                Tween::new(NodeRef::Window(EntityId::Decor1), 5000.0, Easing::SineInOut)
                    .prop(Prop::OffsetY, 0.0, 33.0)
                    .repeat(Repeat::Forever)
                    .yoyo(),
            )
            .on_complete(Ev::Done);
        assert_eq!(tl.duration_ms(), None);
        assert!(!tl.advance(1.0e9).complete);
    }
}
