//! Responsive layout: canvas geometry, window specs and positions
//!
//! The stage is drawn on a fixed design canvas (1400×770 on desktop,
//! 600×1000 in mobile portrait) which is uniformly scaled to fit the
//! viewport. All functions here are pure; the engine applies their results
//! to the surface.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityMap};
use crate::math::{Rect, Size, Vec2};

/// Canvas-space position of a window's top-left corner
pub type Position = Vec2;

/// Lower bound of the canvas scale factor
pub const MIN_SCALE: f32 = 0.25;

/// Upper bound of the canvas scale factor (the canvas never upscales)
pub const MAX_SCALE: f32 = 1.0;

/// Viewport width at or below which a device counts as narrow
pub const NARROW_BREAKPOINT: f32 = 768.0;

/// Title bar height shared by every window
pub const TITLE_BAR_HEIGHT: f32 = 28.0;

/// Vertical distance below the canvas bottom edge where launches begin
pub const LAUNCH_DROP: f32 = 50.0;

/// Layout class derived from the viewport shape
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutClass {
    #[default]
    Desktop,
    MobilePortrait,
}

impl LayoutClass {
    /// Classify a viewport: narrower than the breakpoint and taller than wide
    pub fn classify(viewport: Size) -> Self {
        if viewport.width < NARROW_BREAKPOINT && viewport.height > viewport.width {
            LayoutClass::MobilePortrait
        } else {
            LayoutClass::Desktop
        }
    }

    /// Check if this is the mobile portrait layout
    #[inline]
    pub fn is_mobile(self) -> bool {
        matches!(self, LayoutClass::MobilePortrait)
    }

    /// Base canvas dimensions
    pub fn base_size(self) -> Size {
        match self {
            LayoutClass::Desktop => Size::new(1400.0, 770.0),
            LayoutClass::MobilePortrait => Size::new(600.0, 1000.0),
        }
    }

    /// Multiplier applied to the raw fit scale
    fn class_correction(self) -> f32 {
        match self {
            LayoutClass::Desktop => 1.0,
            LayoutClass::MobilePortrait => 0.92,
        }
    }

    /// Extra zoom applied on top of the scale factor by the layout scaler
    pub fn scaler_boost(self) -> f32 {
        match self {
            LayoutClass::Desktop => 1.0,
            LayoutClass::MobilePortrait => 1.11,
        }
    }
}

/// Check if a viewport width counts as narrow
#[inline]
pub fn is_narrow(viewport_width: f32) -> bool {
    viewport_width <= NARROW_BREAKPOINT
}

/// Canvas size and the factor that maps it onto the viewport
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasGeometry {
    pub base_width: f32,
    pub base_height: f32,
    pub scale_factor: f32,
}

impl CanvasGeometry {
    /// Base canvas size
    #[inline]
    pub fn base_size(&self) -> Size {
        Size::new(self.base_width, self.base_height)
    }

    /// SVG view box covering the whole canvas
    pub fn view_box(&self) -> String {
        format!("0 0 {} {}", self.base_width, self.base_height)
    }

    /// Scale written into the scaler transform
    #[inline]
    pub fn applied_scale(&self, class: LayoutClass) -> f32 {
        self.scale_factor * class.scaler_boost()
    }
}

/// Compute the canvas geometry for a viewport
///
/// The scale factor always lands in `[MIN_SCALE, MAX_SCALE]`, including
/// for zero-sized viewports.
pub fn compute_geometry(viewport_width: f32, viewport_height: f32) -> CanvasGeometry {
    let class = LayoutClass::classify(Size::new(viewport_width, viewport_height));
    let base = class.base_size();

    let fit = (viewport_width / base.width).min(viewport_height / base.height);
    let raw = fit * class.class_correction();
    let scale_factor = if raw.is_nan() {
        MIN_SCALE
    } else {
        raw.clamp(MIN_SCALE, MAX_SCALE)
    };

    CanvasGeometry {
        base_width: base.width,
        base_height: base.height,
        scale_factor,
    }
}

/// Immutable description of one window for a layout class
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WindowSpec {
    pub id: EntityId,
    pub width: f32,
    pub height: f32,
    pub rotation_degrees: f32,
    /// Idle float amplitude in canvas pixels
    pub float_amplitude: f32,
    /// Idle float half-period in seconds
    pub float_duration: f32,
    pub title_bar_height: f32,
    pub dom_selector: &'static str,
}

impl WindowSpec {
    /// Window size
    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Window rectangle with its top-left corner at `pos`
    #[inline]
    pub fn rect_at(&self, pos: Position) -> Rect {
        Rect::from_pos_size(pos, self.size())
    }
}

/// Compute all window specs for a layout class
pub fn compute_specs(class: LayoutClass) -> EntityMap<WindowSpec> {
    EntityMap::from_fn(|id| {
        // (width, height, rotation, float amplitude, float duration)
        let (width, height, rotation_degrees, float_amplitude, float_duration) = match (class, id) {
            (LayoutClass::MobilePortrait, EntityId::Hello) => (370.0, 300.0, 0.0, 20.0, 4.8),
            (LayoutClass::MobilePortrait, EntityId::About) => (290.0, 217.0, -3.0, 18.0, 4.4),
            (LayoutClass::MobilePortrait, EntityId::Contact) => (270.0, 205.0, 2.0, 16.0, 4.2),
            (LayoutClass::MobilePortrait, EntityId::Decor1) => (260.0, 185.0, 4.0, 14.0, 5.0),
            (LayoutClass::MobilePortrait, EntityId::Decor2) => (265.0, 185.0, -3.0, 12.0, 4.6),
            (LayoutClass::Desktop, EntityId::Hello) => (420.0, 300.0, 0.0, 40.0, 4.8),
            (LayoutClass::Desktop, EntityId::About) => (225.0, 180.0, -2.0, 38.0, 4.4),
            (LayoutClass::Desktop, EntityId::Contact) => (220.0, 157.0, 1.0, 35.0, 4.2),
            (LayoutClass::Desktop, EntityId::Decor1) => (200.0, 145.0, 3.0, 33.0, 5.0),
            (LayoutClass::Desktop, EntityId::Decor2) => (190.0, 140.0, -2.5, 28.0, 4.6),
        };
        WindowSpec {
            id,
            width,
            height,
            rotation_degrees,
            float_amplitude,
            float_duration,
            title_bar_height: TITLE_BAR_HEIGHT,
            dom_selector: id.selector(),
        }
    })
}

/// Resting position of a window
pub fn compute_final_position(id: EntityId, class: LayoutClass) -> Position {
    let (x, y) = match (class, id) {
        (LayoutClass::MobilePortrait, EntityId::Hello) => (115.0, 380.0),
        (LayoutClass::MobilePortrait, EntityId::About) => (260.0, 200.0),
        (LayoutClass::MobilePortrait, EntityId::Contact) => (50.0, 620.0),
        (LayoutClass::MobilePortrait, EntityId::Decor1) => (45.0, 330.0),
        (LayoutClass::MobilePortrait, EntityId::Decor2) => (255.0, 535.0),
        (LayoutClass::Desktop, EntityId::Hello) => (490.0, 250.0),
        (LayoutClass::Desktop, EntityId::About) => (640.0, 120.0),
        (LayoutClass::Desktop, EntityId::Contact) => (420.0, 380.0),
        (LayoutClass::Desktop, EntityId::Decor1) => (280.0, 200.0),
        (LayoutClass::Desktop, EntityId::Decor2) => (780.0, 340.0),
    };
    Vec2::new(x, y)
}

/// Launch point of a window: below the canvas, fanned out around the midline
pub fn start_position(id: EntityId, class: LayoutClass) -> Position {
    let base = class.base_size();
    Vec2::new(base.width / 2.0 + id.launch_offset_x(), base.height + LAUNCH_DROP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify() {
        assert_eq!(LayoutClass::classify(Size::new(1920.0, 1080.0)), LayoutClass::Desktop);
        assert_eq!(LayoutClass::classify(Size::new(390.0, 844.0)), LayoutClass::MobilePortrait);
        // Narrow landscape stays desktop
        assert_eq!(LayoutClass::classify(Size::new(700.0, 400.0)), LayoutClass::Desktop);
        // Exactly at the breakpoint is not mobile
        assert_eq!(LayoutClass::classify(Size::new(768.0, 1024.0)), LayoutClass::Desktop);
    }

    #[test]
    fn test_geometry_desktop_caps_at_one() {
        let geo = compute_geometry(2800.0, 1540.0);
        assert!((geo.base_width - 1400.0).abs() < 0.001);
        assert!((geo.base_height - 770.0).abs() < 0.001);
        assert!((geo.scale_factor - 1.0).abs() < 0.001);
        assert_eq!(geo.view_box(), "0 0 1400 770");
    }

    #[test]
    fn test_geometry_desktop_fit() {
        let geo = compute_geometry(700.0, 700.0);
        // min(700/1400, 700/770) = 0.5
        assert!((geo.scale_factor - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_geometry_mobile_correction() {
        let geo = compute_geometry(390.0, 844.0);
        assert!((geo.base_width - 600.0).abs() < 0.001);
        // min(0.65, 0.844) * 0.92
        assert!((geo.scale_factor - 0.65 * 0.92).abs() < 0.001);
        let applied = geo.applied_scale(LayoutClass::MobilePortrait);
        assert!((applied - 0.65 * 0.92 * 1.11).abs() < 0.001);
    }

    #[test]
    fn test_geometry_degenerate_viewport() {
        let geo = compute_geometry(0.0, 0.0);
        assert!((geo.scale_factor - MIN_SCALE).abs() < 0.001);
    }

    #[test]
    fn test_specs_per_class() {
        let desktop = compute_specs(LayoutClass::Desktop);
        assert!((desktop[EntityId::Hello].width - 420.0).abs() < 0.001);
        assert!((desktop[EntityId::Decor2].rotation_degrees + 2.5).abs() < 0.001);
        assert_eq!(desktop[EntityId::About].dom_selector, "#about-win");

        let mobile = compute_specs(LayoutClass::MobilePortrait);
        assert!((mobile[EntityId::About].height - 217.0).abs() < 0.001);
        for (_, spec) in mobile.iter() {
            assert!((spec.title_bar_height - TITLE_BAR_HEIGHT).abs() < 0.001);
        }
    }

    #[test]
    fn test_positions() {
        let p = compute_final_position(EntityId::Contact, LayoutClass::Desktop);
        assert!((p.x - 420.0).abs() < 0.001);
        assert!((p.y - 380.0).abs() < 0.001);

        let s = start_position(EntityId::Decor1, LayoutClass::Desktop);
        assert!((s.x - 580.0).abs() < 0.001);
        assert!((s.y - 820.0).abs() < 0.001);

        let s = start_position(EntityId::About, LayoutClass::MobilePortrait);
        assert!((s.x - 380.0).abs() < 0.001);
        assert!((s.y - 1050.0).abs() < 0.001);
    }

    proptest! {
        #[test]
        fn prop_scale_factor_clamped(w in 0.0f32..10_000.0, h in 0.0f32..10_000.0) {
            let geo = compute_geometry(w, h);
            prop_assert!(geo.scale_factor >= MIN_SCALE);
            prop_assert!(geo.scale_factor <= MAX_SCALE);
        }
    }
}
