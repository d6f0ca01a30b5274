//! Transition and animation module
//!
//! A small tween/timeline engine driven by injected timestamps. Timelines
//! are tagged with the session that created them so a teardown can kill
//! them as a group.

mod animator;
mod easing;
mod timeline;
mod tween;

pub use animator::{AnimationFrame, Animator, TimelineId};
pub use easing::{ease_in_out, ease_out_cubic, Easing};
pub use timeline::Timeline;
pub use tween::{PropTween, Repeat, Tween, TweenSample};
