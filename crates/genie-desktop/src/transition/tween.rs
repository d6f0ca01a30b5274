//! Property tweens
//!
//! A tween drives a handful of numeric properties of one surface node from
//! explicit start values to end values. Start values are always given up
//! front; the surface is never read back.

use super::Easing;
use crate::surface::{NodeRef, Prop};

/// One animated property
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropTween {
    pub prop: Prop,
    pub from: f32,
    pub to: f32,
}

impl PropTween {
    /// Value at eased progress `t`
    #[inline]
    pub fn value(&self, t: f32) -> f32 {
        self.from + (self.to - self.from) * t
    }
}

/// Repetition policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    /// Play `n` extra times after the first pass
    Times(u32),
    /// Loop until killed
    Forever,
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat::Times(0)
    }
}

/// Tween of one node, positioned on its timeline by `offset_ms`
#[derive(Clone, Debug, PartialEq)]
pub struct Tween {
    pub node: NodeRef,
    pub offset_ms: f64,
    pub duration_ms: f64,
    pub easing: Easing,
    pub props: Vec<PropTween>,
    pub repeat: Repeat,
    pub yoyo: bool,
    /// Remove the node from the surface once the tween ends
    pub remove_on_complete: bool,
}

/// Sample of a tween at some instant
#[derive(Clone, Debug, PartialEq)]
pub enum TweenSample {
    /// Offset not reached yet
    Pending,
    /// Running with eased progress
    Active(f32),
    /// Finished; carries the final eased progress
    Done(f32),
}

impl Tween {
    /// Create a tween starting at offset 0
    pub fn new(node: NodeRef, duration_ms: f64, easing: Easing) -> Self {
        Self {
            node,
            offset_ms: 0.0,
            duration_ms: duration_ms.max(0.0),
            easing,
            props: Vec::new(),
            repeat: Repeat::default(),
            yoyo: false,
            remove_on_complete: false,
        }
    }

    /// Place the tween at an offset on its timeline
    pub fn at(mut self, offset_ms: f64) -> Self {
        self.offset_ms = offset_ms.max(0.0);
        self
    }

    /// Add an animated property
    pub fn prop(mut self, prop: Prop, from: f32, to: f32) -> Self {
        self.props.push(PropTween { prop, from, to });
        self
    }

    /// Set the repetition policy
    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Alternate direction on every repetition
    pub fn yoyo(mut self) -> Self {
        self.yoyo = true;
        self
    }

    /// Remove the node when the tween ends
    pub fn remove_on_complete(mut self) -> Self {
        self.remove_on_complete = true;
        self
    }

    /// Length including repetitions, `None` when looping forever
    pub fn total_ms(&self) -> Option<f64> {
        match self.repeat {
            Repeat::Times(n) => Some(self.duration_ms * f64::from(n + 1)),
            Repeat::Forever => None,
        }
    }

    /// End offset on the timeline, `None` when looping forever
    pub fn end_ms(&self) -> Option<f64> {
        self.total_ms().map(|t| self.offset_ms + t)
    }

    /// Raw progress of the final pass (a yoyo with an odd repeat count ends at the start)
    fn final_progress(&self) -> f32 {
        match self.repeat {
            Repeat::Times(n) if self.yoyo && n % 2 == 1 => 0.0,
            _ => 1.0,
        }
    }

    /// Sample at `local_ms` on the owning timeline
    pub fn sample(&self, local_ms: f64) -> TweenSample {
        let elapsed = local_ms - self.offset_ms;
        if elapsed < 0.0 {
            return TweenSample::Pending;
        }
        if let Some(total) = self.total_ms() {
            if elapsed >= total {
                return TweenSample::Done(self.easing.apply(self.final_progress()));
            }
        }
        if self.duration_ms <= 0.0 {
            return TweenSample::Done(self.easing.apply(self.final_progress()));
        }

        let pass = (elapsed / self.duration_ms).floor();
        let mut t = ((elapsed - pass * self.duration_ms) / self.duration_ms) as f32;
        if self.yoyo && (pass as u64) % 2 == 1 {
            t = 1.0 - t;
        }
        TweenSample::Active(self.easing.apply(t))
    }

    /// Property values at eased progress `t`
    pub fn values(&self, t: f32) -> Vec<(Prop, f32)> {
        self.props.iter().map(|p| (p.prop, p.value(t))).collect()
    }
}
