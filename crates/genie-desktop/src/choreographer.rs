//! Choreographer: the order in which windows launch, reveal and get visited
//!
//! The choreographer never touches the page. It is driven by cues (timers
//! it asked for) and arrival notifications, and answers with
//! [`Directive`]s for the engine to carry out. This keeps the whole
//! launch -> reveal -> cursor chain a plain, testable state machine.

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::StageConfig;
use crate::entity::EntityId;
use crate::math::{Rect, Size, Vec2};
use crate::scheduler::{BoundedRetry, RetryStep};
use crate::signal::RevealSignals;

/// Distance of the cursor tip from a window's right edge, past its own width
const CURSOR_INSET_X: f32 = 40.0;

/// Distance of the cursor from a window's bottom edge
const CURSOR_INSET_Y: f32 = 35.0;

/// Height of the taskbar bounce
pub const BOUNCE_HEIGHT: f32 = 20.0;

/// Cursor graphic width
pub fn cursor_width(narrow: bool) -> f32 {
    if narrow {
        20.0
    } else {
        28.0
    }
}

/// Where the cursor rests over a window, in viewport coordinates
pub fn cursor_rest(window: Rect, narrow: bool) -> Vec2 {
    Vec2::new(
        window.right() - cursor_width(narrow) - CURSOR_INSET_X,
        window.bottom() - CURSOR_INSET_Y,
    )
}

/// Where the cursor points at the taskbar
pub fn taskbar_target(viewport: Size, narrow: bool) -> Vec2 {
    let clearance = if narrow { 90.0 } else { 140.0 };
    Vec2::new(viewport.width / 2.0 - cursor_width(narrow) / 2.0, clearance)
}

/// Timer requested by the choreographer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Cue {
    /// Start the launch wave
    Begin,
    /// Check for the content stages of the revealing windows
    CheckContent,
    /// Check an entity's reveal signal
    CheckReveal(EntityId),
    /// Send the cursor to the taskbar
    Taskbar,
}

/// Instruction for the engine
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Directive {
    /// Hide every window
    HideAll,
    /// Launch a window after `delay_ms`
    Launch { id: EntityId, delay_ms: f64 },
    /// Deliver `cue` back after `delay_ms`
    Schedule { delay_ms: f64, cue: Cue },
    /// Create the cursor resting over a window
    SpawnCursor { over: EntityId },
    /// Play an entity's content stage
    StartReveal(EntityId),
    /// Start the idle float on every window
    StartFloat,
    /// Glide the cursor to a window; arrival is reported with [`Choreographer::on_cursor_arrived`]
    MoveCursor { to: EntityId, duration_ms: f64 },
    /// Glide the cursor to the taskbar
    MoveCursorToTaskbar { duration_ms: f64 },
    /// Bounce the cursor up and down at the taskbar
    BounceCursor { duration_ms: f64 },
    /// Fade the cursor out and remove it
    FadeCursor { duration_ms: f64 },
}

impl Directive {
    /// Window that must have landed before this directive can run
    pub fn needs_landed(&self) -> Option<EntityId> {
        match *self {
            Directive::SpawnCursor { over } => Some(over),
            Directive::StartReveal(id) => Some(id),
            Directive::MoveCursor { to, .. } => Some(to),
            _ => None,
        }
    }
}

/// Progress through the sequence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ChoreoStage {
    #[default]
    Idle,
    /// Waiting for the launch wave to begin
    Waiting,
    Launching,
    /// Waiting for content stages to register
    AwaitingContent,
    Revealing(EntityId),
    MovingTo(EntityId),
    Finale,
    Done,
}

/// Sequencer for one session
#[derive(Clone, Debug)]
pub struct Choreographer {
    config: StageConfig,
    stage: ChoreoStage,
    content_wait: BoundedRetry,
}

impl Choreographer {
    /// Create an idle choreographer
    pub fn new(config: &StageConfig) -> Self {
        Self {
            content_wait: BoundedRetry::new(config.content_poll_ms, config.content_max_checks),
            config: config.clone(),
            stage: ChoreoStage::Idle,
        }
    }

    #[inline]
    pub fn stage(&self) -> ChoreoStage {
        self.stage
    }

    /// Check if the sequence has finished
    #[inline]
    pub fn is_done(&self) -> bool {
        self.stage == ChoreoStage::Done
    }

    /// Start the sequence
    pub fn run(&mut self, narrow: bool) -> Vec<Directive> {
        if self.stage != ChoreoStage::Idle {
            debug!(target: "genie::choreo", "run ignored in {:?}", self.stage);
            return Vec::new();
        }
        self.stage = ChoreoStage::Waiting;
        self.content_wait.reset();
        let delay_ms = if narrow { self.config.narrow_launch_delay_ms } else { 0.0 };
        vec![Directive::Schedule {
            delay_ms,
            cue: Cue::Begin,
        }]
    }

    fn begin(&mut self) -> Vec<Directive> {
        info!(target: "genie::choreo", "launching windows");
        self.stage = ChoreoStage::Launching;
        let mut out = vec![Directive::HideAll];
        let mut launches: Vec<_> = EntityId::ALL
            .iter()
            .map(|id| (*id, self.config.launch.delay_ms(*id)))
            .collect();
        launches.sort_by(|a, b| a.1.total_cmp(&b.1));
        out.extend(launches.into_iter().map(|(id, delay_ms)| Directive::Launch { id, delay_ms }));
        out.push(Directive::Schedule {
            delay_ms: self.config.settle_delay_ms,
            cue: Cue::CheckContent,
        });
        out
    }

    fn reveal(&mut self, id: EntityId, poll_after_ms: f64) -> Vec<Directive> {
        self.stage = ChoreoStage::Revealing(id);
        vec![
            Directive::StartReveal(id),
            Directive::Schedule {
                delay_ms: poll_after_ms,
                cue: Cue::CheckReveal(id),
            },
        ]
    }

    fn move_to(&mut self, id: EntityId) -> Directive {
        self.stage = ChoreoStage::MovingTo(id);
        Directive::MoveCursor {
            to: id,
            duration_ms: self.config.cursor_move_ms,
        }
    }

    /// A requested timer fired
    ///
    /// `content_ready` tells whether every revealing window has registered
    /// its content stage.
    pub fn on_cue(&mut self, cue: Cue, content_ready: bool, signals: &RevealSignals) -> Vec<Directive> {
        match (cue, self.stage) {
            (Cue::Begin, ChoreoStage::Waiting) => self.begin(),
            (Cue::CheckContent, ChoreoStage::Launching | ChoreoStage::AwaitingContent) => {
                self.stage = ChoreoStage::AwaitingContent;
                match self.content_wait.attempt(content_ready) {
                    RetryStep::RetryIn { delay_ms, .. } => vec![Directive::Schedule {
                        delay_ms,
                        cue: Cue::CheckContent,
                    }],
                    step => {
                        if let RetryStep::Exhausted { attempts } = step {
                            warn!(target: "genie::choreo", "content stages incomplete after {} checks", attempts);
                        }
                        let mut out = vec![Directive::SpawnCursor { over: EntityId::Hello }];
                        out.extend(self.reveal(EntityId::Hello, self.config.first_reveal_delay_ms));
                        out
                    }
                }
            }
            (Cue::CheckReveal(id), ChoreoStage::Revealing(current)) if id == current => {
                if !signals.is_complete(id) {
                    return vec![Directive::Schedule {
                        delay_ms: self.config.reveal_poll_ms,
                        cue: Cue::CheckReveal(id),
                    }];
                }
                debug!(target: "genie::choreo", "{} revealed", id);
                match id {
                    EntityId::Hello => vec![Directive::StartFloat, self.move_to(EntityId::About)],
                    EntityId::About => vec![self.move_to(EntityId::Contact)],
                    _ => {
                        self.stage = ChoreoStage::Finale;
                        vec![Directive::Schedule {
                            delay_ms: self.config.taskbar_delay_ms,
                            cue: Cue::Taskbar,
                        }]
                    }
                }
            }
            (Cue::Taskbar, ChoreoStage::Finale) => vec![Directive::MoveCursorToTaskbar {
                duration_ms: self.config.taskbar_move_ms,
            }],
            (cue, stage) => {
                debug!(target: "genie::choreo", "stale cue {:?} in {:?}", cue, stage);
                Vec::new()
            }
        }
    }

    /// The cursor reached a window
    pub fn on_cursor_arrived(&mut self, id: EntityId) -> Vec<Directive> {
        if self.stage != ChoreoStage::MovingTo(id) {
            return Vec::new();
        }
        self.reveal(id, self.config.reveal_poll_ms)
    }

    /// The cursor reached the taskbar
    pub fn on_cursor_at_taskbar(&mut self) -> Vec<Directive> {
        if self.stage != ChoreoStage::Finale {
            return Vec::new();
        }
        vec![Directive::BounceCursor {
            duration_ms: self.config.bounce_ms,
        }]
    }

    /// The bounce finished
    pub fn on_bounce_done(&mut self) -> Vec<Directive> {
        if self.stage != ChoreoStage::Finale {
            return Vec::new();
        }
        vec![Directive::FadeCursor {
            duration_ms: self.config.cursor_fade_ms,
        }]
    }

    /// The cursor is gone
    pub fn on_cursor_removed(&mut self) {
        if self.stage == ChoreoStage::Finale {
            info!(target: "genie::choreo", "sequence complete");
            self.stage = ChoreoStage::Done;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SessionId;

    fn cue_of(directives: &[Directive]) -> Option<(f64, Cue)> {
        directives.iter().find_map(|d| match d {
            Directive::Schedule { delay_ms, cue } => Some((*delay_ms, *cue)),
            _ => None,
        })
    }

    #[test]
    fn test_cursor_geometry() {
        let rest = cursor_rest(Rect::new(100.0, 100.0, 400.0, 300.0), false);
        assert!((rest.x - 432.0).abs() < 0.001);
        assert!((rest.y - 365.0).abs() < 0.001);
        let bar = taskbar_target(Size::new(390.0, 844.0), true);
        assert!((bar.x - 185.0).abs() < 0.001);
        assert!((bar.y - 90.0).abs() < 0.001);
    }

    #[test]
    fn test_launch_wave_is_staggered() {
        let mut c = Choreographer::new(&StageConfig::default());
        let out = c.run(true);
        assert_eq!(cue_of(&out), Some((100.0, Cue::Begin)));
        let signals = RevealSignals::new(SessionId(1));
        let out = c.on_cue(Cue::Begin, false, &signals);
        assert_eq!(out[0], Directive::HideAll);
        let order: Vec<EntityId> = out
            .iter()
            .filter_map(|d| match d {
                Directive::Launch { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(
            order,
            vec![
                EntityId::Hello,
                EntityId::Decor1,
                EntityId::About,
                EntityId::Decor2,
                EntityId::Contact
            ]
        );
        assert_eq!(cue_of(&out), Some((3500.0, Cue::CheckContent)));
    }

    #[test]
    fn test_full_sequence() {
        let mut c = Choreographer::new(&StageConfig::default());
        let mut signals = RevealSignals::new(SessionId(1));
        c.run(false);
        c.on_cue(Cue::Begin, false, &signals);

        assert_eq!(cue_of(&c.on_cue(Cue::CheckContent, false, &signals)), Some((100.0, Cue::CheckContent)));
        let out = c.on_cue(Cue::CheckContent, true, &signals);
        assert_eq!(out[0], Directive::SpawnCursor { over: EntityId::Hello });
        assert_eq!(out[1], Directive::StartReveal(EntityId::Hello));
        assert_eq!(cue_of(&out), Some((500.0, Cue::CheckReveal(EntityId::Hello))));

        // Not done yet: keep polling
        assert_eq!(
            cue_of(&c.on_cue(Cue::CheckReveal(EntityId::Hello), true, &signals)),
            Some((100.0, Cue::CheckReveal(EntityId::Hello)))
        );
        signals.complete(EntityId::Hello);
        let out = c.on_cue(Cue::CheckReveal(EntityId::Hello), true, &signals);
        assert_eq!(out[0], Directive::StartFloat);
        assert!(matches!(out[1], Directive::MoveCursor { to: EntityId::About, .. }));

        let out = c.on_cursor_arrived(EntityId::About);
        assert_eq!(out[0], Directive::StartReveal(EntityId::About));
        signals.complete(EntityId::About);
        let out = c.on_cue(Cue::CheckReveal(EntityId::About), true, &signals);
        assert!(matches!(out[0], Directive::MoveCursor { to: EntityId::Contact, .. }));

        c.on_cursor_arrived(EntityId::Contact);
        signals.complete(EntityId::Contact);
        let out = c.on_cue(Cue::CheckReveal(EntityId::Contact), true, &signals);
        assert_eq!(cue_of(&out), Some((300.0, Cue::Taskbar)));
        assert!(matches!(
            c.on_cue(Cue::Taskbar, true, &signals)[0],
            Directive::MoveCursorToTaskbar { .. }
        ));
        assert!(matches!(c.on_cursor_at_taskbar()[0], Directive::BounceCursor { .. }));
        assert!(matches!(c.on_bounce_done()[0], Directive::FadeCursor { .. }));
        c.on_cursor_removed();
        assert!(c.is_done());
    }

    #[test]
    fn test_content_wait_is_capped() {
        let config = StageConfig::default();
        let mut c = Choreographer::new(&config);
        let signals = RevealSignals::new(SessionId(1));
        c.run(false);
        c.on_cue(Cue::Begin, false, &signals);
        let mut out = Vec::new();
        for _ in 0..config.content_max_checks {
            out = c.on_cue(Cue::CheckContent, false, &signals);
        }
        assert_eq!(out[0], Directive::SpawnCursor { over: EntityId::Hello });
    }

    #[test]
    fn test_out_of_order_events_are_ignored() {
        let mut c = Choreographer::new(&StageConfig::default());
        let signals = RevealSignals::new(SessionId(1));
        assert!(c.on_cue(Cue::CheckContent, true, &signals).is_empty());
        assert!(c.on_cursor_arrived(EntityId::Contact).is_empty());
        c.run(false);
        assert!(c.run(false).is_empty());
    }
}
