//! Vector morph strategy and outline path geometry

use super::{GhostFrame, LaunchContext, LaunchPlan, LaunchStrategy, SettlePlan, StrategyKind, MAIN_FLIGHT_MS};
use crate::entity::EntityId;
use crate::math::Rect;
use crate::surface::{NodeRef, NodeSpec, OutlineLayer, Prop};
use crate::transition::{Easing, Tween};

/// Outline stroke width, matching the DOM window border
pub const STROKE_WIDTH: f32 = 1.0;

/// Fill inset keeping fills inside the stroke
pub const HALF_STROKE: f32 = STROKE_WIDTH / 2.0;

/// Edge length of the seed square every outline grows from
pub const SEED_SIZE: f32 = 12.0;

/// Title bar height of the seed square
pub const SEED_TITLE_HEIGHT: f32 = 4.0;

/// Vertical spacing between ghost seeds
const GHOST_SEED_SPACING: f32 = 8.0;

const MAIN_OFFSET_MS: f64 = 50.0;
const GHOST_FADE_MS: f64 = 280.0;
const GHOST_FADE_LEAD_MS: f64 = 200.0;
const SHADOW_MS: f64 = 320.0;

fn rect_path(x: f32, y: f32, w: f32, h: f32) -> String {
    format!("M{},{}H{}V{}H{}Z", x, y, x + w, y + h, x)
}

/// SVG path data for the four parts of a window outline
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlinePaths {
    /// Stroked border on the exact rectangle
    pub border: String,
    /// Title bar fill, inset by half the stroke
    pub title_fill: String,
    /// Body fill below the title bar, inset by half the stroke
    pub body_fill: String,
    /// Divider line under the title bar
    pub divider: String,
}

impl OutlinePaths {
    /// Build the paths for a rectangle and title bar height
    pub fn from_rect(rect: Rect, title_height: f32) -> Self {
        let Rect { x, y, width: w, height: h } = rect;
        let inset = HALF_STROKE;
        Self {
            border: rect_path(x, y, w, h),
            title_fill: format!(
                "M{},{}H{}V{}H{}Z",
                x + inset,
                y + inset,
                x + w - inset,
                y + title_height,
                x + inset
            ),
            body_fill: format!(
                "M{},{}H{}V{}H{}Z",
                x + inset,
                y + title_height,
                x + w - inset,
                y + h - inset,
                x + inset
            ),
            divider: format!("M{},{}H{}", x, y + title_height, x + w),
        }
    }
}

fn outline_values(rect: Rect, title_height: f32) -> Vec<(Prop, f32)> {
    vec![
        (Prop::X, rect.x),
        (Prop::Y, rect.y),
        (Prop::Width, rect.width),
        (Prop::Height, rect.height),
        (Prop::TitleHeight, title_height),
    ]
}

fn morph(node: NodeRef, from: Rect, to: Rect, title_height: f32, rotation: f32, duration_ms: f64) -> Tween {
    Tween::new(node, duration_ms, Easing::SineInOut)
        .prop(Prop::X, from.x, to.x)
        .prop(Prop::Y, from.y, to.y)
        .prop(Prop::Width, from.width, to.width)
        .prop(Prop::Height, from.height, to.height)
        .prop(Prop::TitleHeight, SEED_TITLE_HEIGHT, title_height)
        .prop(Prop::Rotation, 0.0, rotation)
}

/// Morphs vector outlines from a seed at the launch point
#[derive(Clone, Copy, Debug, Default)]
pub struct VectorMorph;

impl LaunchStrategy for VectorMorph {
    fn kind(&self) -> StrategyKind {
        StrategyKind::VectorMorph
    }

    fn ghost_frames(&self, entity: EntityId, narrow: bool) -> Vec<GhostFrame> {
        let count = if narrow {
            6
        } else if entity.is_decorative() {
            5
        } else {
            7
        };
        (0..count)
            .map(|i| GhostFrame {
                delay_ms: 80.0 + 70.0 * f64::from(i),
                duration_ms: 500.0 + 80.0 * f64::from(i),
                opacity: (0.9 - 0.1 * i as f32).max(0.3),
                scale_x: 1.0,
                scale_y: 1.0,
            })
            .collect()
    }

    fn plan(&self, ctx: &LaunchContext<'_>) -> LaunchPlan {
        let spec = ctx.spec;
        let target = spec.rect_at(ctx.end);
        let seed = Rect::new(
            ctx.start.x - SEED_SIZE / 2.0,
            ctx.start.y - SEED_SIZE / 2.0,
            SEED_SIZE,
            SEED_SIZE,
        );
        let frames = self.ghost_frames(ctx.entity, ctx.narrow);
        let mut plan = LaunchPlan::default();

        // Ghosts paint first so the main outline sits on top; the front
        // ghost paints last among them.
        for (i, _) in frames.iter().enumerate().rev() {
            plan.spawns.push(NodeSpec::Outline {
                entity: ctx.entity,
                layer: OutlineLayer::Ghost,
                index: i as u16,
            });
        }
        plan.spawns.push(NodeSpec::Outline {
            entity: ctx.entity,
            layer: OutlineLayer::Main,
            index: 0,
        });

        let main = NodeRef::Outline {
            entity: ctx.entity,
            layer: OutlineLayer::Main,
            index: 0,
        };
        let mut main_preset = outline_values(seed, SEED_TITLE_HEIGHT);
        main_preset.extend([(Prop::Rotation, 0.0), (Prop::Opacity, 1.0)]);
        plan.presets.push((NodeRef::Window(ctx.entity), vec![(Prop::Opacity, 0.0)]));
        plan.presets.push((main, main_preset));
        plan.tweens.push(
            morph(main, seed, target, spec.title_bar_height, spec.rotation_degrees, MAIN_FLIGHT_MS).at(MAIN_OFFSET_MS),
        );

        for (i, frame) in frames.iter().enumerate() {
            let node = NodeRef::Outline {
                entity: ctx.entity,
                layer: OutlineLayer::Ghost,
                index: i as u16,
            };
            let ghost_seed = seed.translate(crate::math::Vec2::new(0.0, (i + 1) as f32 * GHOST_SEED_SPACING));
            let mut preset = outline_values(ghost_seed, SEED_TITLE_HEIGHT);
            preset.extend([(Prop::Rotation, 0.0), (Prop::Opacity, frame.opacity)]);
            plan.presets.push((node, preset));

            plan.tweens.push(
                morph(node, ghost_seed, target, spec.title_bar_height, spec.rotation_degrees, frame.duration_ms)
                    .at(frame.delay_ms),
            );
            plan.tweens.push(
                Tween::new(node, GHOST_FADE_MS, Easing::SineOut)
                    .at(frame.delay_ms + frame.duration_ms - GHOST_FADE_LEAD_MS)
                    .prop(Prop::Opacity, frame.opacity, 0.0),
            );
        }
        plan
    }

    fn settle(&self, ctx: &LaunchContext<'_>) -> SettlePlan {
        let window = NodeRef::Window(ctx.entity);
        SettlePlan {
            clear_outlines: true,
            presets: vec![(
                window,
                vec![
                    (Prop::Opacity, 1.0),
                    (Prop::Rotation, ctx.spec.rotation_degrees),
                    (Prop::OffsetY, 0.0),
                    (Prop::ScaleX, 1.0),
                    (Prop::ScaleY, 1.0),
                ],
            )],
            tweens: vec![Tween::new(window, SHADOW_MS, Easing::Power2Out).prop(Prop::Shadow, 0.0, 1.0)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{self, LayoutClass};

    fn context(spec: &crate::layout::WindowSpec, narrow: bool) -> LaunchContext<'_> {
        LaunchContext {
            entity: spec.id,
            spec,
            start: layout::start_position(spec.id, LayoutClass::Desktop),
            end: layout::compute_final_position(spec.id, LayoutClass::Desktop),
            narrow,
            base_z_index: None,
        }
    }

    #[test]
    fn test_outline_paths_inset_fills() {
        let paths = OutlinePaths::from_rect(Rect::new(10.0, 20.0, 100.0, 50.0), 28.0);
        assert_eq!(paths.border, "M10,20H110V70H10Z");
        assert_eq!(paths.title_fill, "M10.5,20.5H109.5V48H10.5Z");
        assert_eq!(paths.body_fill, "M10.5,48H109.5V69.5H10.5Z");
        assert_eq!(paths.divider, "M10,48H110");
    }

    #[test]
    fn test_ghost_counts() {
        assert_eq!(VectorMorph.ghost_frames(EntityId::Hello, false).len(), 7);
        assert_eq!(VectorMorph.ghost_frames(EntityId::Decor1, false).len(), 5);
        assert_eq!(VectorMorph.ghost_frames(EntityId::Decor1, true).len(), 6);
        let frames = VectorMorph.ghost_frames(EntityId::Hello, false);
        assert!((frames[6].opacity - 0.3).abs() < 0.001);
        assert!((frames[2].delay_ms - 220.0).abs() < 0.001);
    }

    #[test]
    fn test_plan_lands_on_exact_target() {
        let specs = layout::compute_specs(LayoutClass::Desktop);
        let spec = &specs[EntityId::Hello];
        let ctx = context(spec, false);
        let plan = VectorMorph.plan(&ctx);

        // 7 ghosts plus the main outline, main last
        assert_eq!(plan.spawns.len(), 8);
        assert_eq!(
            plan.spawns.last().map(|s| s.node_ref()),
            Some(NodeRef::Outline {
                entity: EntityId::Hello,
                layer: OutlineLayer::Main,
                index: 0
            })
        );

        let target = spec.rect_at(ctx.end);
        for tween in plan.tweens.iter().filter(|t| t.props.iter().any(|p| p.prop == Prop::Width)) {
            let to = |prop: Prop| tween.props.iter().find(|p| p.prop == prop).map(|p| p.to);
            assert_eq!(to(Prop::X), Some(target.x));
            assert_eq!(to(Prop::Y), Some(target.y));
            assert_eq!(to(Prop::Width), Some(target.width));
            assert_eq!(to(Prop::Height), Some(target.height));
        }
    }

    #[test]
    fn test_ghosts_fade_before_landing() {
        let specs = layout::compute_specs(LayoutClass::Desktop);
        let ctx = context(&specs[EntityId::About], false);
        let plan = VectorMorph.plan(&ctx);
        for frame in VectorMorph.ghost_frames(EntityId::About, false) {
            let landing = frame.delay_ms + frame.duration_ms;
            let fade = plan
                .tweens
                .iter()
                .find(|t| (t.offset_ms - (landing - GHOST_FADE_LEAD_MS)).abs() < 0.001)
                .expect("fade tween");
            assert!(fade.offset_ms < landing);
            assert_eq!(fade.props[0].to, 0.0);
        }
    }

    #[test]
    fn test_settle_shows_window() {
        let specs = layout::compute_specs(LayoutClass::Desktop);
        let ctx = context(&specs[EntityId::Contact], false);
        let settle = VectorMorph.settle(&ctx);
        assert!(settle.clear_outlines);
        let (node, values) = &settle.presets[0];
        assert_eq!(*node, NodeRef::Window(EntityId::Contact));
        assert!(values.contains(&(Prop::Rotation, 1.0)));
        assert_eq!(settle.tweens[0].props[0].prop, Prop::Shadow);
    }
}
