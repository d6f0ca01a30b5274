//! Pixel dissolve: a mist belt sweeping down over an image
//!
//! The image is sampled on a coarse grid; every kept sample becomes a
//! particle with a reveal time that follows its vertical position plus some
//! jitter. Each rendered frame advances the belt by a fixed speed, so the
//! sweep length depends on the displayed image height, not on wall time.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::math::Rect;

/// Decoded image pixels plus where the image is displayed
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSample {
    pub width: u32,
    pub height: u32,
    /// RGBA, row-major, `width * height * 4` bytes
    pub pixels: Vec<u8>,
    /// Displayed box relative to the window body
    pub display: Rect,
}

/// Tuning for one device class
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DissolveProfile {
    /// Sampling step in source pixels
    pub stride: f32,
    /// Total spread of the random reveal offset
    pub jitter: f32,
    pub mist_base: f32,
    pub mist_span: f32,
    /// Height of the mist belt in display pixels
    pub belt_height: f32,
    /// Belt advance per frame in display pixels
    pub speed: f32,
    /// Mist particle size relative to the solid particle
    pub mist_size: f32,
    /// Mist blur radius in CSS pixels
    pub blur: f32,
}

impl DissolveProfile {
    /// Fine-grained profile for desktops
    pub const DESKTOP: DissolveProfile = DissolveProfile {
        stride: 1.5,
        jitter: 0.1,
        mist_base: 0.03,
        mist_span: 0.05,
        belt_height: 60.0,
        speed: 8.0,
        mist_size: 1.2,
        blur: 2.0,
    };

    /// Coarser, mistier profile for narrow or mobile devices
    pub const CONSTRAINED: DissolveProfile = DissolveProfile {
        stride: 2.5,
        jitter: 0.15,
        mist_base: 0.06,
        mist_span: 0.08,
        belt_height: 80.0,
        speed: 6.0,
        mist_size: 1.5,
        blur: 4.0,
    };

    /// Pick a profile for a device class
    pub fn for_device(constrained: bool) -> Self {
        if constrained {
            Self::CONSTRAINED
        } else {
            Self::DESKTOP
        }
    }
}

/// One sampled pixel
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ParticleRecord {
    /// Left edge relative to the window body
    pub x: f32,
    pub y: f32,
    /// Edge length of the solid particle
    pub size: f32,
    pub color: [u8; 3],
    /// Belt progress at which the particle starts to dissolve in
    pub reveal_time: f32,
    /// Length of the mist phase in belt progress units
    pub mist_duration: f32,
    /// Fixed draw that decides visibility inside the mist
    pub mist_value: f32,
}

/// How a particle is drawn on one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParticlePhase {
    Hidden,
    /// Blurred mist copy visible at `opacity` (0 means hidden)
    Mist { opacity: f32 },
    /// Solid color at `opacity`
    Solid { opacity: f32 },
}

impl ParticlePhase {
    /// Check if the particle is fully revealed
    #[inline]
    pub fn is_solid(&self) -> bool {
        matches!(self, ParticlePhase::Solid { .. })
    }
}

/// Pixels that carry no visible detail are skipped
#[inline]
fn is_blank(r: u8, g: u8, b: u8, a: u8) -> bool {
    a <= 50 || (r > 240 && g > 240 && b > 240)
}

/// Build particles from a sample
pub fn build_particles(sample: &ImageSample, profile: &DissolveProfile, rng: &mut impl Rng) -> Vec<ParticleRecord> {
    let mut particles = Vec::new();
    if sample.width == 0 || sample.height == 0 || sample.display.height <= 0.0 {
        return particles;
    }

    let width = sample.width as f32;
    let height = sample.height as f32;
    let display = sample.display;
    let size = (profile.stride / width * display.width * 1.1).max(2.0);

    let mut y = 0.0f32;
    while y < height {
        let mut x = 0.0f32;
        while x < width {
            let idx = (y.floor() as usize * sample.width as usize + x.floor() as usize) * 4;
            if let Some(&[r, g, b, a]) = sample.pixels.get(idx..idx + 4).and_then(|s| <&[u8; 4]>::try_from(s).ok()) {
                if !is_blank(r, g, b, a) {
                    let px = x / width * display.width + display.x;
                    let py = y / height * display.height + display.y;
                    let offset = (rng.random::<f32>() - 0.5) * profile.jitter;
                    particles.push(ParticleRecord {
                        x: px,
                        y: py,
                        size,
                        color: [r, g, b],
                        reveal_time: (py / display.height + offset).clamp(0.0, 1.0),
                        mist_duration: profile.mist_base + rng.random::<f32>() * profile.mist_span,
                        mist_value: rng.random::<f32>(),
                    });
                }
            }
            x += profile.stride;
        }
        y += profile.stride;
    }
    particles
}

/// Phase of one particle at belt progress `progress`
pub fn phase_at(particle: &ParticleRecord, progress: f32, rng: &mut impl Rng) -> ParticlePhase {
    let mist_end = particle.reveal_time + particle.mist_duration;
    if progress < particle.reveal_time {
        return ParticlePhase::Hidden;
    }
    if progress < mist_end {
        let mist_progress = (progress - particle.reveal_time) / particle.mist_duration;
        let density = mist_progress * mist_progress;
        let threshold = 0.9 - density * 0.8;
        let opacity = if particle.mist_value > threshold {
            0.25 + density * 0.75
        } else {
            0.0
        };
        return ParticlePhase::Mist { opacity };
    }

    // Brief flicker right after the reveal
    if progress - mist_end < 0.08 && rng.random::<f32>() < 0.06 {
        return ParticlePhase::Solid {
            opacity: 0.3 + rng.random::<f32>() * 0.4,
        };
    }
    ParticlePhase::Solid { opacity: 1.0 }
}

/// One painted frame
#[derive(Clone, Debug, PartialEq)]
pub struct DissolveFrame {
    pub progress: f32,
    pub phases: Vec<ParticlePhase>,
    /// Last frame: every particle is solid and the image can be shown
    pub finished: bool,
}

/// Running dissolve over one window's image
#[derive(Clone, Debug)]
pub struct PixelDissolve {
    entity: EntityId,
    particles: Vec<ParticleRecord>,
    frame: u32,
    total_frames: f32,
}

impl PixelDissolve {
    /// Prepare a dissolve from a sample
    pub fn new(entity: EntityId, sample: &ImageSample, profile: &DissolveProfile, rng: &mut impl Rng) -> Self {
        let particles = build_particles(sample, profile, rng);
        let total_frames = ((sample.display.height + profile.belt_height) / profile.speed).max(1.0);
        Self {
            entity,
            particles,
            frame: 0,
            total_frames,
        }
    }

    /// Entity being revealed
    #[inline]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Particle records in paint order
    #[inline]
    pub fn particles(&self) -> &[ParticleRecord] {
        &self.particles
    }

    /// Number of frames in the sweep
    #[inline]
    pub fn total_frames(&self) -> f32 {
        self.total_frames
    }

    /// Compute the next frame
    pub fn step(&mut self, rng: &mut impl Rng) -> DissolveFrame {
        let progress = self.frame as f32 / self.total_frames;
        self.frame += 1;

        if self.frame as f32 >= self.total_frames {
            return DissolveFrame {
                progress: 1.0,
                phases: vec![ParticlePhase::Solid { opacity: 1.0 }; self.particles.len()],
                finished: true,
            };
        }

        let phases = self.particles.iter().map(|p| phase_at(p, progress, rng)).collect();
        DissolveFrame {
            progress,
            phases,
            finished: false,
        }
    }
}
