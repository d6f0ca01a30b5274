//! DOM ghost strategy: the real window flies in with cloned shells behind it

use super::{GhostFrame, LaunchContext, LaunchPlan, LaunchStrategy, SettlePlan, StrategyKind, MAIN_FLIGHT_MS};
use crate::entity::EntityId;
use crate::surface::{NodeRef, NodeSpec, Prop};
use crate::transition::{Easing, Tween};

const GHOST_COUNT: u16 = 10;

/// Stacking index used when the window reports none
const DEFAULT_BASE_Z: i32 = 10;

/// Distance below the landing point where every flight starts
const LAUNCH_DEPTH: f32 = 1200.0;

const START_SCALE: f32 = 0.15;
const GHOST_FADE_MS: f64 = 300.0;
const GHOST_FADE_LEAD_MS: f64 = 150.0;
const SHADOW_OFFSET_MS: f64 = 500.0;
const SHADOW_MS: f64 = 200.0;

fn wide_falloff(i: u16) -> f32 {
    if i < 6 {
        0.99f32.powi(i32::from(i))
    } else {
        0.92f32.powi(i32::from(i) - 5)
    }
}

/// Flies the real window container, trailed by empty clones of its frame
#[derive(Clone, Copy, Debug, Default)]
pub struct DomGhost;

impl DomGhost {
    fn spacing(narrow: bool) -> f32 {
        if narrow {
            8.0
        } else {
            15.0
        }
    }
}

impl LaunchStrategy for DomGhost {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DomGhost
    }

    fn ghost_frames(&self, _entity: EntityId, narrow: bool) -> Vec<GhostFrame> {
        let lag = if narrow { 30.0 } else { 45.0 };
        (0..GHOST_COUNT)
            .map(|i| {
                let (scale_x, scale_y) = if narrow {
                    let s = 1.0 - 0.05 * f32::from(i);
                    (s, s)
                } else {
                    let f = wide_falloff(i);
                    (8.0 * f, 6.0 * f)
                };
                GhostFrame {
                    delay_ms: 40.0 + lag * f64::from(i),
                    duration_ms: 500.0 + 40.0 * f64::from(i),
                    opacity: (0.98 - 0.03 * f32::from(i)).max(0.5),
                    scale_x,
                    scale_y,
                }
            })
            .collect()
    }

    fn plan(&self, ctx: &LaunchContext<'_>) -> LaunchPlan {
        let spec = ctx.spec;
        let window = NodeRef::Window(ctx.entity);
        let window_z = ctx.base_z_index.unwrap_or(DEFAULT_BASE_Z) * 10;
        let rect = spec.rect_at(ctx.end);
        let drop = LAUNCH_DEPTH - ctx.end.y;
        let spacing = Self::spacing(ctx.narrow);
        let rotation = spec.rotation_degrees;

        let mut plan = LaunchPlan {
            window_z_index: Some(window_z),
            ..LaunchPlan::default()
        };
        plan.presets.push((
            window,
            vec![
                (Prop::Opacity, 0.0),
                (Prop::ScaleX, START_SCALE),
                (Prop::ScaleY, START_SCALE),
                (Prop::OffsetY, drop),
                (Prop::Rotation, 0.0),
            ],
        ));
        plan.tweens.push(
            Tween::new(window, MAIN_FLIGHT_MS, Easing::SineInOut)
                .prop(Prop::Opacity, 0.0, 1.0)
                .prop(Prop::ScaleX, START_SCALE, 1.0)
                .prop(Prop::ScaleY, START_SCALE, 1.0)
                .prop(Prop::OffsetY, drop, 0.0)
                .prop(Prop::Rotation, 0.0, rotation),
        );

        for (i, frame) in self.ghost_frames(ctx.entity, ctx.narrow).into_iter().enumerate() {
            let index = i as u16;
            let node = NodeRef::Ghost {
                entity: ctx.entity,
                index,
            };
            let start_y = drop + (i + 1) as f32 * spacing;
            plan.spawns.push(NodeSpec::Ghost {
                entity: ctx.entity,
                index,
                z_index: window_z - 1 - i32::from(index),
                rect,
            });
            plan.presets.push((
                node,
                vec![
                    (Prop::Opacity, 0.0),
                    (Prop::ScaleX, START_SCALE),
                    (Prop::ScaleY, START_SCALE),
                    (Prop::OffsetY, start_y),
                    (Prop::Rotation, 0.0),
                ],
            ));
            plan.tweens.push(
                Tween::new(node, frame.duration_ms, Easing::SineInOut)
                    .at(frame.delay_ms)
                    .prop(Prop::Opacity, 0.0, frame.opacity)
                    .prop(Prop::ScaleX, START_SCALE, frame.scale_x)
                    .prop(Prop::ScaleY, START_SCALE, frame.scale_y)
                    .prop(Prop::OffsetY, start_y, 0.0)
                    .prop(Prop::Rotation, 0.0, rotation),
            );
            plan.tweens.push(
                Tween::new(node, GHOST_FADE_MS, Easing::SineOut)
                    .at(frame.delay_ms + frame.duration_ms - GHOST_FADE_LEAD_MS)
                    .prop(Prop::Opacity, frame.opacity, 0.0)
                    .remove_on_complete(),
            );
        }

        plan.tweens.push(
            Tween::new(window, SHADOW_MS, Easing::SineOut)
                .at(SHADOW_OFFSET_MS)
                .prop(Prop::Shadow, 0.0, 1.0),
        );
        plan
    }

    fn settle(&self, _ctx: &LaunchContext<'_>) -> SettlePlan {
        SettlePlan::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{self, LayoutClass};

    fn plan_for(id: EntityId, narrow: bool, base_z: Option<i32>) -> LaunchPlan {
        let specs = layout::compute_specs(LayoutClass::Desktop);
        let ctx = LaunchContext {
            entity: id,
            spec: &specs[id],
            start: layout::start_position(id, LayoutClass::Desktop),
            end: layout::compute_final_position(id, LayoutClass::Desktop),
            narrow,
            base_z_index: base_z,
        };
        DomGhost.plan(&ctx)
    }

    #[test]
    fn test_ten_ghosts_any_entity() {
        for id in EntityId::ALL {
            assert_eq!(DomGhost.ghost_frames(id, false).len(), 10);
            assert_eq!(DomGhost.ghost_frames(id, true).len(), 10);
        }
    }

    #[test]
    fn test_wide_scale_falloff() {
        let frames = DomGhost.ghost_frames(EntityId::Hello, false);
        assert!((frames[0].scale_x - 8.0).abs() < 0.001);
        assert!((frames[0].scale_y - 6.0).abs() < 0.001);
        assert!((frames[5].scale_x - 8.0 * 0.99f32.powi(5)).abs() < 0.001);
        assert!((frames[6].scale_x - 8.0 * 0.92).abs() < 0.001);
        assert!((frames[9].opacity - 0.71).abs() < 0.001);
    }

    #[test]
    fn test_narrow_lag_and_scale() {
        let frames = DomGhost.ghost_frames(EntityId::Hello, true);
        assert!((frames[3].delay_ms - 130.0).abs() < 0.001);
        assert!((frames[4].scale_x - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_ghosts_stack_below_window() {
        let plan = plan_for(EntityId::About, false, Some(3));
        assert_eq!(plan.window_z_index, Some(30));
        let z: Vec<i32> = plan
            .spawns
            .iter()
            .filter_map(|s| match s {
                NodeSpec::Ghost { z_index, .. } => Some(*z_index),
                _ => None,
            })
            .collect();
        assert_eq!(z.first(), Some(&29));
        assert_eq!(z.last(), Some(&20));

        let fallback = plan_for(EntityId::About, false, None);
        assert_eq!(fallback.window_z_index, Some(100));
    }

    #[test]
    fn test_ghost_fades_remove_nodes() {
        let plan = plan_for(EntityId::Contact, true, None);
        let removals = plan.tweens.iter().filter(|t| t.remove_on_complete).count();
        assert_eq!(removals, 10);
        assert!(plan.tweens.iter().all(|t| !t.remove_on_complete || t.node.is_transient()));
    }

    #[test]
    fn test_window_lands_untransformed() {
        let plan = plan_for(EntityId::Hello, false, None);
        let flight = &plan.tweens[0];
        assert_eq!(flight.node, NodeRef::Window(EntityId::Hello));
        for p in &flight.props {
            match p.prop {
                Prop::Opacity | Prop::ScaleX | Prop::ScaleY => assert_eq!(p.to, 1.0),
                Prop::OffsetY => assert_eq!(p.to, 0.0),
                _ => {}
            }
        }
        assert!(DomGhost.settle(&LaunchContext {
            entity: EntityId::Hello,
            spec: &layout::compute_specs(LayoutClass::Desktop)[EntityId::Hello],
            start: Default::default(),
            end: Default::default(),
            narrow: false,
            base_z_index: None,
        })
        .presets
        .is_empty());
    }
}
