//! Swipe navigation between a fixed sequence of pages
//!
//! A full-screen cover follows the finger while dragging. A committed swipe
//! slides the cover over the page, navigates, waits until the new page has
//! content and then slides the cover away. Anything else animates the cover
//! back off-screen.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::SwipeConfig;
use crate::math::Vec2;
use crate::scheduler::{BoundedRetry, RetryStep, Scheduler};

/// Cover position while parked off-screen to the right
pub const COVER_PARKED: f32 = 100.0;

/// Cover position covering the page
pub const COVER_SHOWN: f32 = 0.0;

/// Cover position after sliding away to the left
pub const COVER_GONE: f32 = -100.0;

/// Finger travel direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwipeDirection {
    /// Finger moves left: next page
    Left,
    /// Finger moves right: previous page
    Right,
}

impl SwipeDirection {
    fn from_dx(dx: f32) -> Self {
        if dx > 0.0 {
            SwipeDirection::Right
        } else {
            SwipeDirection::Left
        }
    }
}

/// Page id for a path: the site root and `/home` are `home`
pub fn current_page(path: &str) -> String {
    match path {
        "/" | "/home" | "/home/" => "home".to_string(),
        _ => path.strip_prefix('/').unwrap_or(path).to_string(),
    }
}

/// Neighbouring page in a direction, if any
pub fn neighbor<'a>(pages: &'a [String], page: &str, direction: SwipeDirection) -> Option<&'a str> {
    let i = pages.iter().position(|p| p == page)?;
    match direction {
        SwipeDirection::Left => pages.get(i + 1),
        SwipeDirection::Right => i.checked_sub(1).and_then(|j| pages.get(j)),
    }
    .map(String::as_str)
}

/// Path a page id lives at
pub fn page_path(page: &str) -> String {
    if page == "home" {
        "/home".to_string()
    } else {
        format!("/{}", page)
    }
}

/// Cover translation for a drag: proportional to the drag progress
pub fn cover_offset(direction: SwipeDirection, progress: f32) -> f32 {
    match direction {
        SwipeDirection::Left => COVER_PARKED - progress * 100.0,
        SwipeDirection::Right => COVER_GONE + progress * 100.0,
    }
}

/// Page access needed by the swipe controller
pub trait CoverSurface {
    fn viewport_width(&self) -> f32;

    /// Current location path
    fn path(&self) -> String;

    /// Check if the page shows its main content
    fn has_content(&self) -> bool;

    /// Create the cover if it is missing; returns true if it was created
    fn ensure_cover(&mut self) -> bool;

    /// Move the cover to `percent` of the viewport width, animated when a duration is given
    fn set_cover(&mut self, percent: f32, transition_ms: Option<f64>);

    /// Go to a page, through its link when the page has one
    fn navigate(&mut self, page: &str);
}

/// Gesture phase
#[derive(Clone, Debug, PartialEq)]
pub enum SwipePhase {
    Idle,
    /// Finger down, threshold not crossed yet
    Tracking,
    Dragging { direction: SwipeDirection },
    /// Cover shown, navigating to `target`
    Committing { target: String },
    /// Cover animating back
    Cancelling,
}

#[derive(Clone, Debug, PartialEq)]
enum SwipeTask {
    Navigate(String),
    CheckContent,
    Reveal,
    Reset,
    CancelDone,
    CoverCheck,
}

/// Touch-driven page slider
#[derive(Debug)]
pub struct SwipeController<C: CoverSurface> {
    surface: C,
    config: SwipeConfig,
    phase: SwipePhase,
    start: Vec2,
    current_x: f32,
    start_path: String,
    content_wait: BoundedRetry,
    scheduler: Scheduler<SwipeTask>,
}

impl<C: CoverSurface> SwipeController<C> {
    /// Create a controller and park the cover
    pub fn new(mut surface: C, config: SwipeConfig, now_ms: f64) -> Self {
        surface.ensure_cover();
        surface.set_cover(COVER_PARKED, None);
        let mut scheduler = Scheduler::new();
        scheduler.schedule(now_ms, config.cover_check_ms, None, SwipeTask::CoverCheck);
        Self {
            content_wait: BoundedRetry::new(config.content_poll_ms, config.content_max_checks),
            surface,
            config,
            phase: SwipePhase::Idle,
            start: Vec2::ZERO,
            current_x: 0.0,
            start_path: String::new(),
            scheduler,
        }
    }

    #[inline]
    pub fn phase(&self) -> &SwipePhase {
        &self.phase
    }

    #[inline]
    pub fn surface(&self) -> &C {
        &self.surface
    }

    #[inline]
    pub fn surface_mut(&mut self) -> &mut C {
        &mut self.surface
    }

    /// Check if a navigation is in flight
    #[inline]
    pub fn is_navigating(&self) -> bool {
        matches!(self.phase, SwipePhase::Committing { .. })
    }

    fn neighbor(&self, direction: SwipeDirection) -> Option<String> {
        let page = current_page(&self.surface.path());
        neighbor(&self.config.pages, &page, direction).map(str::to_string)
    }

    fn progress(&self, dx: f32) -> f32 {
        let width = self.surface.viewport_width();
        if width > 0.0 {
            dx.abs() / width
        } else {
            0.0
        }
    }

    /// Finger down
    pub fn touch_start(&mut self, x: f32, y: f32) {
        if self.is_navigating() {
            return;
        }
        self.start = Vec2::new(x, y);
        self.current_x = x;
        self.phase = SwipePhase::Tracking;
        self.surface.ensure_cover();
    }

    /// Finger moved
    pub fn touch_move(&mut self, x: f32, y: f32) {
        if self.is_navigating() {
            return;
        }
        let dx = x - self.start.x;
        let dy = (y - self.start.y).abs();
        let direction = SwipeDirection::from_dx(dx);

        if self.phase == SwipePhase::Tracking
            && dx.abs() > self.config.drag_threshold
            && dy < self.config.max_vertical
            && self.neighbor(direction).is_some()
        {
            debug!(target: "genie::swipe", "drag {:?}", direction);
            self.phase = SwipePhase::Dragging { direction };
        }

        if let SwipePhase::Dragging { .. } = self.phase {
            self.current_x = x;
            self.phase = SwipePhase::Dragging { direction };
            let offset = cover_offset(direction, self.progress(dx));
            self.surface.ensure_cover();
            self.surface.set_cover(offset, None);
        }
    }

    /// Finger up
    pub fn touch_end(&mut self, now_ms: f64) {
        if self.is_navigating() {
            return;
        }
        let SwipePhase::Dragging { .. } = self.phase else {
            self.cancel(now_ms, COVER_PARKED);
            return;
        };

        let dx = self.current_x - self.start.x;
        let direction = SwipeDirection::from_dx(dx);
        if self.progress(dx) <= self.config.commit_ratio {
            let back = match direction {
                SwipeDirection::Left => COVER_PARKED,
                SwipeDirection::Right => COVER_GONE,
            };
            self.cancel(now_ms, back);
            return;
        }

        let Some(target) = self.neighbor(direction) else {
            self.cancel(now_ms, COVER_PARKED);
            return;
        };

        info!(target: "genie::swipe", "swipe to {}", target);
        self.start_path = self.surface.path();
        self.surface.ensure_cover();
        self.surface.set_cover(COVER_SHOWN, Some(self.config.cover_ms));
        self.scheduler.schedule(
            now_ms,
            self.config.navigate_delay_ms,
            None,
            SwipeTask::Navigate(target.clone()),
        );
        self.phase = SwipePhase::Committing { target };
    }

    fn cancel(&mut self, now_ms: f64, offset: f32) {
        self.surface.ensure_cover();
        self.surface.set_cover(offset, Some(self.config.cancel_ms));
        self.phase = SwipePhase::Cancelling;
        self.scheduler
            .cancel_where(|t| *t == SwipeTask::CancelDone);
        self.scheduler
            .schedule(now_ms, self.config.cancel_ms, None, SwipeTask::CancelDone);
    }

    /// Run every task due at `now_ms`
    pub fn tick(&mut self, now_ms: f64) {
        while let Some(due) = self.scheduler.pop_due(now_ms) {
            self.run(due.due_ms, due.task);
        }
    }

    fn run(&mut self, now_ms: f64, task: SwipeTask) {
        match task {
            SwipeTask::Navigate(target) => {
                self.surface.navigate(&target);
                self.content_wait.reset();
                self.scheduler
                    .schedule(now_ms, self.config.content_poll_ms, None, SwipeTask::CheckContent);
            }
            SwipeTask::CheckContent => {
                let ready = self.surface.path() != self.start_path && self.surface.has_content();
                match self.content_wait.attempt(ready) {
                    RetryStep::Ready { .. } => {
                        self.scheduler
                            .schedule(now_ms, self.config.reveal_delay_ms, None, SwipeTask::Reveal);
                    }
                    RetryStep::RetryIn { delay_ms, .. } => {
                        self.scheduler.schedule(now_ms, delay_ms, None, SwipeTask::CheckContent);
                    }
                    RetryStep::Exhausted { attempts } => {
                        debug!(target: "genie::swipe", "no content after {} checks, revealing anyway", attempts);
                        self.scheduler.schedule(now_ms, 0.0, None, SwipeTask::Reveal);
                    }
                }
            }
            SwipeTask::Reveal => {
                self.surface.ensure_cover();
                self.surface.set_cover(COVER_GONE, Some(self.config.reveal_slide_ms));
                self.scheduler
                    .schedule(now_ms, self.config.reset_delay_ms, None, SwipeTask::Reset);
            }
            SwipeTask::Reset => {
                self.surface.ensure_cover();
                self.surface.set_cover(COVER_PARKED, None);
                self.phase = SwipePhase::Idle;
            }
            SwipeTask::CancelDone => {
                if self.phase == SwipePhase::Cancelling {
                    self.phase = SwipePhase::Idle;
                }
            }
            SwipeTask::CoverCheck => {
                if self.surface.ensure_cover() {
                    debug!(target: "genie::swipe", "cover re-created");
                    if !self.is_navigating() {
                        self.surface.set_cover(COVER_PARKED, None);
                    }
                }
                self.scheduler
                    .schedule(now_ms, self.config.cover_check_ms, None, SwipeTask::CoverCheck);
            }
        }
    }
}

/// Cover surface backed by plain fields, for tests and headless runs
#[derive(Clone, Debug, Default)]
pub struct MemoryCover {
    pub width: f32,
    pub path: String,
    pub content: bool,
    pub cover_present: bool,
    /// Last cover position and transition
    pub cover: Option<(f32, Option<f64>)>,
    /// Pages navigated to, in order
    pub visits: Vec<String>,
}

impl MemoryCover {
    /// A page at `path` with content
    pub fn new(width: f32, path: &str) -> Self {
        Self {
            width,
            path: path.to_string(),
            content: true,
            ..Self::default()
        }
    }

    /// Cover position, if any was set
    pub fn cover_percent(&self) -> Option<f32> {
        self.cover.map(|(p, _)| p)
    }
}

impl CoverSurface for MemoryCover {
    fn viewport_width(&self) -> f32 {
        self.width
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn has_content(&self) -> bool {
        self.content
    }

    fn ensure_cover(&mut self) -> bool {
        let created = !self.cover_present;
        self.cover_present = true;
        created
    }

    fn set_cover(&mut self, percent: f32, transition_ms: Option<f64>) {
        self.cover = Some((percent, transition_ms));
    }

    fn navigate(&mut self, page: &str) {
        self.visits.push(page.to_string());
        self.path = page_path(page);
    }
}
