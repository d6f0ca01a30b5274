//! Canvas geometry, window placement and page globals

use log::debug;

use super::GenieEngine;
use crate::entity::EntityId;
use crate::layout::{self, compute_geometry, LayoutClass};
use crate::surface::{PageGlobals, PageMarkers, Surface};

impl<S: Surface> GenieEngine<S> {
    /// Recompute geometry for the current viewport and apply it
    pub fn resize(&mut self) {
        self.relayout();
    }

    pub(crate) fn relayout(&mut self) {
        let viewport = self.surface.viewport();
        let class = LayoutClass::classify(viewport);
        if self.registry.refresh(class) {
            debug!(target: "genie::launch", "layout class now {:?}", class);
        }
        self.geometry = compute_geometry(viewport.width, viewport.height);
        self.surface
            .apply_canvas(&self.geometry, self.geometry.applied_scale(class));

        for id in EntityId::ALL {
            let rect = self.registry.spec(id).rect_at(self.registry.final_position(id));
            self.surface.place_window(id, rect);
        }
        self.publish();
    }

    /// Check if the viewport is at or below the narrow breakpoint
    pub(crate) fn is_narrow(&self) -> bool {
        layout::is_narrow(self.surface.viewport().width)
    }

    pub(crate) fn publish(&mut self) {
        let globals = PageGlobals {
            reveal: self.reveal_snapshot(),
            use_simple_animation: self.capability.is_simple(),
            layout_scale: self.geometry.scale_factor,
        };
        self.surface.publish(&globals);
    }

    pub(crate) fn refresh_markers(&mut self) {
        let markers = PageMarkers {
            homepage: self.config.is_target(&self.path),
            splash: self.config.is_splash(&self.path),
        };
        self.surface.set_page_markers(markers);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::StageConfig;
    use crate::engine::GenieEngine;
    use crate::entity::EntityId;
    use crate::math::Size;
    use crate::surface::MemorySurface;

    #[test]
    fn test_resize_switches_layout_class() {
        let surface = MemorySurface::new(Size::new(1400.0, 900.0));
        let mut engine = GenieEngine::new(surface, StageConfig::default(), "", 3);
        engine.surface_mut().set_viewport(Size::new(390.0, 844.0));
        engine.resize();

        assert!(engine.registry().class().is_mobile());
        let hello = engine.surface().window_rect(EntityId::Hello).unwrap();
        assert!((hello.x - 115.0).abs() < 0.001);
        assert!((hello.width - 370.0).abs() < 0.001);

        let (geometry, applied) = engine.surface().canvas().unwrap();
        assert!((geometry.base_width - 600.0).abs() < 0.001);
        assert!((applied - geometry.scale_factor * 1.11).abs() < 0.001);
        let published = engine.surface().globals().unwrap();
        assert!((published.layout_scale - geometry.scale_factor).abs() < 0.001);
    }
}
