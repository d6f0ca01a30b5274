//! Animator: owns every live timeline and advances them on each frame

use super::timeline::Timeline;
use crate::scheduler::SessionId;
use crate::surface::{NodeRef, Prop};

/// Handle of a timeline inside the animator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimelineId(u64);

#[derive(Clone, Copy, Debug)]
enum PlayState {
    Playing { start_ms: f64 },
    Paused { elapsed_ms: f64 },
}

#[derive(Clone, Debug)]
struct Entry<E> {
    id: TimelineId,
    timeline: Timeline<E>,
    state: PlayState,
}

/// Everything that changed during one animator tick
#[derive(Clone, Debug)]
pub struct AnimationFrame<E> {
    /// Property writes, in timeline order
    pub updates: Vec<(NodeRef, Vec<(Prop, f32)>)>,
    /// Nodes whose tweens asked for removal
    pub removals: Vec<NodeRef>,
    /// Start and completion events
    pub events: Vec<E>,
}

impl<E> Default for AnimationFrame<E> {
    fn default() -> Self {
        Self {
            updates: Vec::new(),
            removals: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// Live timeline registry
#[derive(Clone, Debug)]
pub struct Animator<E> {
    next_id: u64,
    entries: Vec<Entry<E>>,
}

impl<E: Clone> Default for Animator<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> Animator<E> {
    /// Create an empty animator
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, timeline: Timeline<E>, state: PlayState) -> TimelineId {
        let id = TimelineId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, timeline, state });
        id
    }

    /// Add a timeline that starts playing at `now_ms`
    pub fn play_new(&mut self, timeline: Timeline<E>, now_ms: f64) -> TimelineId {
        self.insert(timeline, PlayState::Playing { start_ms: now_ms })
    }

    /// Add a timeline that waits for [`Animator::play`]
    pub fn add_paused(&mut self, timeline: Timeline<E>) -> TimelineId {
        self.insert(timeline, PlayState::Paused { elapsed_ms: 0.0 })
    }

    /// Resume a paused timeline; returns false if it no longer exists
    pub fn play(&mut self, id: TimelineId, now_ms: f64) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                if let PlayState::Paused { elapsed_ms } = entry.state {
                    entry.state = PlayState::Playing {
                        start_ms: now_ms - elapsed_ms,
                    };
                }
                true
            }
            None => false,
        }
    }

    /// Freeze a playing timeline at its current position
    pub fn pause(&mut self, id: TimelineId, now_ms: f64) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            if let PlayState::Playing { start_ms } = entry.state {
                entry.state = PlayState::Paused {
                    elapsed_ms: now_ms - start_ms,
                };
            }
        }
    }

    /// Check if a timeline is still registered
    pub fn contains(&self, id: TimelineId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Check if a timeline is registered and paused
    pub fn is_paused(&self, id: TimelineId) -> bool {
        self.entries
            .iter()
            .any(|e| e.id == id && matches!(e.state, PlayState::Paused { .. }))
    }

    /// Drop a timeline without emitting its events
    pub fn kill(&mut self, id: TimelineId) {
        self.entries.retain(|e| e.id != id);
    }

    /// Drop every timeline owned by a session
    pub fn kill_session(&mut self, session: SessionId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.timeline.session() != session);
        before - self.entries.len()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of registered timelines
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no timeline is registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advance every playing timeline to `now_ms`
    ///
    /// Completed timelines are dropped after their final values and
    /// completion event are emitted.
    pub fn tick(&mut self, now_ms: f64) -> AnimationFrame<E> {
        let mut frame = AnimationFrame::default();
        let mut completed = Vec::new();

        for entry in &mut self.entries {
            let PlayState::Playing { start_ms } = entry.state else {
                continue;
            };
            let step = entry.timeline.advance(now_ms - start_ms);
            frame.updates.extend(step.updates);
            frame.removals.extend(step.removals);
            frame.events.extend(step.events);
            if step.complete {
                completed.push(entry.id);
            }
        }

        if !completed.is_empty() {
            self.entries.retain(|e| !completed.contains(&e.id));
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::{Easing, Tween};

    fn fade(session: u64, on_complete: &'static str) -> Timeline<&'static str> {
        Timeline::new(SessionId(session))
            .push(Tween::new(NodeRef::Cursor, 300.0, Easing::Linear).prop(Prop::Opacity, 1.0, 0.0))
            .on_complete(on_complete)
    }

    #[test]
    fn test_animator_completes_and_drops() {
        let mut animator = Animator::new();
        animator.play_new(fade(1, "faded"), 1000.0);

        let frame = animator.tick(1150.0);
        assert_eq!(frame.updates.len(), 1);
        assert!(frame.events.is_empty());

        let frame = animator.tick(1300.0);
        assert_eq!(frame.events, vec!["faded"]);
        assert!(animator.is_empty());
    }

    #[test]
    fn test_animator_pause_resume() {
        let mut animator = Animator::new();
        let id = animator.add_paused(fade(1, "faded"));
        assert!(animator.is_paused(id));
        assert!(animator.tick(5000.0).updates.is_empty());

        assert!(animator.play(id, 5000.0));
        animator.tick(5100.0);
        animator.pause(id, 5100.0);
        assert!(animator.tick(9000.0).updates.is_empty());

        animator.play(id, 9000.0);
        let frame = animator.tick(9200.0);
        assert_eq!(frame.events, vec!["faded"]);
        assert!(!animator.contains(id));
    }

    #[test]
    fn test_animator_kill_session() {
        let mut animator = Animator::new();
        animator.play_new(fade(1, "a"), 0.0);
        animator.play_new(fade(2, "b"), 0.0);
        animator.play_new(fade(1, "c"), 0.0);

        assert_eq!(animator.kill_session(SessionId(1)), 2);
        let frame = animator.tick(1000.0);
        assert_eq!(frame.events, vec!["b"]);
    }

    #[test]
    fn test_play_missing_timeline() {
        let mut animator: Animator<&'static str> = Animator::new();
        let id = animator.play_new(fade(1, "x"), 0.0);
        animator.kill(id);
        assert!(!animator.play(id, 10.0));
    }
}
