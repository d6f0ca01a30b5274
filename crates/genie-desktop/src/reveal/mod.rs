//! Content reveal engines
//!
//! - [`PixelDissolve`]: image windows, one step per rendered frame
//! - [`Typewriter`]: text windows, one step per typing interval
//!
//! Both finish by raising the entity's one-shot signal; decorative windows
//! have nothing to reveal and report completion immediately.

mod dissolve;
mod typewriter;

pub use dissolve::{
    build_particles, phase_at, DissolveFrame, DissolveProfile, ImageSample, ParticlePhase, ParticleRecord,
    PixelDissolve,
};
pub use typewriter::{flatten_markup, render_prefix, FlatText, TypeStep, Typewriter};

use crate::entity::{ContentKind, EntityId};

/// Milliseconds between typed characters
pub const TYPE_INTERVAL_MS: f64 = 35.0;

/// Delay between the final dissolve frame and removing the particle layer
pub const DISSOLVE_CLEANUP_MS: f64 = 100.0;

/// Length of the paused content timeline registered for an entity
pub fn content_duration_ms(id: EntityId) -> f64 {
    match id.kind() {
        ContentKind::Image => 2000.0,
        ContentKind::Text => 960.0 + 500.0,
        ContentKind::Decorative => 10.0,
    }
}

/// Reveal currently running for one entity
#[derive(Clone, Debug)]
pub enum ActiveReveal {
    /// Waiting for the image to decode before sampling
    AwaitingImage { attempts: u32 },
    Dissolving(PixelDissolve),
    /// Final frame painted; cleanup is scheduled
    Settling,
    Typing(Typewriter),
}
