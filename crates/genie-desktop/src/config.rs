//! Tunable timings and paths
//!
//! Every field has a default matching the shipped page, and any subset can
//! be overridden from JSON:
//!
//! ```
//! use genie_desktop::StageConfig;
//!
//! let config = StageConfig::from_json(r#"{ "settle_delay_ms": 1000 }"#).unwrap();
//! assert_eq!(config.settle_delay_ms, 1000.0);
//! assert_eq!(config.debounce_ms, 200.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::Result;

/// Launch delay of every window, measured from the start of the launch wave
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchStagger {
    pub hello: f64,
    pub about: f64,
    pub contact: f64,
    pub decor1: f64,
    pub decor2: f64,
}

impl Default for LaunchStagger {
    fn default() -> Self {
        Self {
            hello: 0.0,
            about: 1000.0,
            contact: 2000.0,
            decor1: 600.0,
            decor2: 1600.0,
        }
    }
}

impl LaunchStagger {
    /// Delay for one window
    pub fn delay_ms(&self, id: EntityId) -> f64 {
        match id {
            EntityId::Hello => self.hello,
            EntityId::About => self.about,
            EntityId::Contact => self.contact,
            EntityId::Decor1 => self.decor1,
            EntityId::Decor2 => self.decor2,
        }
    }
}

/// Timings and paths of the entrance sequence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Quiet period after a navigation signal before initialising
    pub debounce_ms: f64,
    /// Interval between readiness checks
    pub init_retry_ms: f64,
    /// Readiness checks before a forced start
    pub init_max_attempts: u32,
    pub url_poll_ms: f64,
    /// Delay before handling a history change
    pub history_settle_ms: f64,

    /// Extra wait before launching on narrow viewports
    pub narrow_launch_delay_ms: f64,
    pub launch: LaunchStagger,
    /// Wait after the launch wave before looking for content stages
    pub settle_delay_ms: f64,
    pub content_poll_ms: f64,
    /// Content checks before going ahead with whatever exists
    pub content_max_checks: u32,
    /// Wait after starting the first reveal before polling its signal
    pub first_reveal_delay_ms: f64,
    pub reveal_poll_ms: f64,

    pub cursor_move_ms: f64,
    pub taskbar_delay_ms: f64,
    pub taskbar_move_ms: f64,
    pub bounce_ms: f64,
    pub cursor_fade_ms: f64,

    pub type_interval_ms: f64,
    pub dissolve_cleanup_ms: f64,
    pub image_poll_ms: f64,
    pub image_max_checks: u32,

    /// Paths that show the stage
    pub target_paths: Vec<String>,
    /// Paths that count as the splash page
    pub splash_paths: Vec<String>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200.0,
            init_retry_ms: 100.0,
            init_max_attempts: 15,
            url_poll_ms: 250.0,
            history_settle_ms: 50.0,
            narrow_launch_delay_ms: 100.0,
            launch: LaunchStagger::default(),
            settle_delay_ms: 3500.0,
            content_poll_ms: 100.0,
            content_max_checks: 30,
            first_reveal_delay_ms: 500.0,
            reveal_poll_ms: 100.0,
            cursor_move_ms: 500.0,
            taskbar_delay_ms: 300.0,
            taskbar_move_ms: 700.0,
            bounce_ms: 400.0,
            cursor_fade_ms: 300.0,
            type_interval_ms: crate::reveal::TYPE_INTERVAL_MS,
            dissolve_cleanup_ms: crate::reveal::DISSOLVE_CLEANUP_MS,
            image_poll_ms: 50.0,
            image_max_checks: 60,
            target_paths: vec!["/home".to_string(), "/home/".to_string()],
            splash_paths: vec!["/".to_string(), String::new()],
        }
    }
}

impl StageConfig {
    /// Parse a (possibly partial) JSON override
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check if a path shows the stage
    pub fn is_target(&self, path: &str) -> bool {
        self.target_paths.iter().any(|p| p == path)
    }

    /// Check if a path is the splash page
    pub fn is_splash(&self, path: &str) -> bool {
        self.splash_paths.iter().any(|p| p == path)
    }
}

/// Thresholds and timings of swipe navigation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwipeConfig {
    /// Horizontal travel before a drag starts
    pub drag_threshold: f32,
    /// Vertical travel that disqualifies a drag
    pub max_vertical: f32,
    /// Drag progress needed to commit
    pub commit_ratio: f32,
    pub cover_ms: f64,
    pub navigate_delay_ms: f64,
    pub content_poll_ms: f64,
    pub content_max_checks: u32,
    pub reveal_delay_ms: f64,
    pub reveal_slide_ms: f64,
    pub reset_delay_ms: f64,
    pub cancel_ms: f64,
    /// Interval of the check that re-creates a missing cover
    pub cover_check_ms: f64,
    /// Page ids in swipe order
    pub pages: Vec<String>,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 15.0,
            max_vertical: 50.0,
            commit_ratio: 0.2,
            cover_ms: 200.0,
            navigate_delay_ms: 220.0,
            content_poll_ms: 50.0,
            content_max_checks: 60,
            reveal_delay_ms: 100.0,
            reveal_slide_ms: 350.0,
            reset_delay_ms: 400.0,
            cancel_ms: 250.0,
            cover_check_ms: 200.0,
            pages: ["home", "project-01-copy", "project-02", "project-03", "project-04-2"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl SwipeConfig {
    /// Parse a (possibly partial) JSON override
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenieError;

    #[test]
    fn test_defaults() {
        let config = StageConfig::default();
        assert!(config.is_target("/home"));
        assert!(config.is_target("/home/"));
        assert!(!config.is_target("/project-02"));
        assert!(config.is_splash(""));
        assert!((config.launch.delay_ms(EntityId::Decor2) - 1600.0).abs() < 0.001);
    }

    #[test]
    fn test_partial_override() {
        let config = StageConfig::from_json(r#"{"launch": {"about": 1200}, "init_max_attempts": 5}"#).unwrap();
        assert_eq!(config.init_max_attempts, 5);
        assert!((config.launch.about - 1200.0).abs() < 0.001);
        assert!((config.launch.contact - 2000.0).abs() < 0.001);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(StageConfig::from_json("{"), Err(GenieError::Config(_))));
        assert!(matches!(SwipeConfig::from_json(r#"{"pages": 3}"#), Err(GenieError::Config(_))));
    }

    #[test]
    fn test_swipe_pages() {
        let config = SwipeConfig::default();
        assert_eq!(config.pages.first().map(String::as_str), Some("home"));
        assert_eq!(config.pages.len(), 5);
    }
}
