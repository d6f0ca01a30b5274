//! Integration tests for GenieEngine and SwipeController
//!
//! These tests drive whole page visits through the public API:
//! - The entrance sequence from first signal to the cursor leaving
//! - Re-entry, leave and return across router navigations
//! - Forced starts on pages that never finish rendering
//! - Image fallbacks inside a full run
//! - Cursor visits to windows that land late
//! - Swiping through every project page

use genie_desktop::surface::SurfaceEvent;
use genie_desktop::swipe::COVER_PARKED;
use genie_desktop::{
    ChoreoStage, EntityId, GenieEngine, GenieError, LaunchStagger, MemoryCover, MemorySurface,
    NavigationSignal, NavigationState, NodeRef, Prop, Size, StageConfig, SwipeConfig, SwipeController,
    SwipePhase,
};

const FRAME_MS: f64 = 16.0;

fn engine(surface: MemorySurface) -> GenieEngine<MemorySurface> {
    GenieEngine::new(surface, StageConfig::default(), "", 21)
}

fn desktop() -> GenieEngine<MemorySurface> {
    engine(MemorySurface::new(Size::new(1400.0, 900.0)))
}

/// Tick from `from` up to `to` at frame rate, returning the time reached
fn run(engine: &mut GenieEngine<MemorySurface>, from: f64, to: f64) -> f64 {
    let mut now = from;
    while now <= to {
        engine.tick(now);
        now += FRAME_MS;
    }
    now
}

fn transient_nodes(engine: &GenieEngine<MemorySurface>) -> usize {
    engine
        .surface()
        .live_nodes()
        .filter(|n| !matches!(n, NodeRef::Window(_)))
        .count()
}

// =============================================================================
// Entrance Sequence Tests
// =============================================================================

#[test]
fn test_entrance_reveals_in_order() {
    let mut engine = desktop();
    engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");

    let mut done_at = [None; 3];
    let mut now = 0.0;
    while now <= 15_000.0 {
        engine.tick(now);
        let snap = engine.reveal_snapshot();
        for (slot, flag) in done_at.iter_mut().zip([
            snap.hello_belt_done,
            snap.typing_done_about,
            snap.typing_done_contact,
        ]) {
            if flag && slot.is_none() {
                *slot = Some(now);
            }
        }
        now += FRAME_MS;
    }

    let [Some(hello), Some(about), Some(contact)] = done_at else {
        panic!("not every reveal finished: {:?}", done_at);
    };
    assert!(hello < about, "hello {} about {}", hello, about);
    assert!(about < contact, "about {} contact {}", about, contact);

    assert_eq!(engine.choreo_stage(), ChoreoStage::Done);
    assert!(!engine.surface().is_live(NodeRef::Cursor));
    assert_eq!(engine.surface().markup(EntityId::About), Some("<p>I make <b>things</b>.</p>"));
    assert!(!engine.surface().caret(EntityId::Contact));
    assert!(engine.surface().image_visible(EntityId::Hello));
}

#[test]
fn test_entrance_publishes_globals() {
    let mut engine = desktop();
    engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
    run(&mut engine, 0.0, 15_000.0);

    let globals = engine.surface().globals().expect("globals published");
    assert!(globals.reveal.hello_belt_done);
    assert!(globals.reveal.typing_done_contact);
    assert!(engine.surface().markers().homepage);
}

#[test]
fn test_restricted_image_does_not_stall_sequence() {
    let mut surface = MemorySurface::new(Size::new(1400.0, 900.0));
    surface.set_image_error(EntityId::Hello, GenieError::RenderingRestricted("tainted".to_string()));
    let mut engine = engine(surface);
    engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
    run(&mut engine, 0.0, 15_000.0);

    assert!(engine.reveal_snapshot().typing_done_contact);
    assert!(engine.surface().image_visible(EntityId::Hello));
    assert!(!engine
        .surface()
        .events()
        .iter()
        .any(|e| matches!(e, SurfaceEvent::MountParticles { id: EntityId::Hello, .. })));
}

#[test]
fn test_slow_image_still_dissolves() {
    let mut surface = MemorySurface::new(Size::new(1400.0, 900.0));
    surface.set_image_pending(EntityId::Hello, 3);
    let mut engine = engine(surface);
    engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
    run(&mut engine, 0.0, 15_000.0);

    assert!(engine
        .surface()
        .events()
        .iter()
        .any(|e| matches!(e, SurfaceEvent::MountParticles { id: EntityId::Hello, .. })));
    assert!(engine.reveal_snapshot().typing_done_contact);
}

#[test]
fn test_cursor_waits_for_late_window() {
    let config = StageConfig {
        launch: LaunchStagger {
            contact: 20_000.0,
            ..LaunchStagger::default()
        },
        ..StageConfig::default()
    };
    let mut engine = GenieEngine::new(MemorySurface::new(Size::new(1400.0, 900.0)), config, "", 21);
    engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");

    let cursor = |e: &GenieEngine<MemorySurface>| {
        (e.surface().value(NodeRef::Cursor, Prop::X), e.surface().value(NodeRef::Cursor, Prop::Y))
    };
    let mut seen = 0;
    let mut landed_at = None;
    let mut about_done = None;
    let mut left_about_at = None;
    let mut now = 0.0;
    while now <= 40_000.0 {
        engine.tick(now);

        let events = engine.surface().events();
        if events[seen..]
            .iter()
            .any(|e| matches!(e, SurfaceEvent::ClearOutlines(Some(EntityId::Contact))))
        {
            landed_at.get_or_insert(now);
        }
        seen = events.len();

        if engine.reveal_snapshot().typing_done_about && about_done.is_none() {
            about_done = Some((now, cursor(&engine)));
        }
        if let Some((_, rest)) = about_done {
            if left_about_at.is_none() && cursor(&engine) != rest {
                left_about_at = Some(now);
            }
        }
        now += FRAME_MS;
    }

    let landed_at = landed_at.expect("contact never landed");
    let (about_at, _) = about_done.expect("about never finished typing");
    let left_about_at = left_about_at.expect("cursor never left about");
    assert!(about_at < landed_at, "about {} landed {}", about_at, landed_at);
    assert!(left_about_at >= landed_at, "left {} landed {}", left_about_at, landed_at);
    assert!(engine.reveal_snapshot().typing_done_contact);
    assert_eq!(engine.choreo_stage(), ChoreoStage::Done);
}

// =============================================================================
// Navigation Lifecycle Tests
// =============================================================================

#[test]
fn test_reentry_keeps_running_session() {
    let mut engine = desktop();
    engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
    let now = run(&mut engine, 0.0, 1000.0);
    let session = engine.session_id().expect("session started");

    engine.navigation_signal(now, NavigationSignal::Load, "/home");
    engine.navigation_signal(now, NavigationSignal::VisibilityVisible, "/home");
    engine.navigation_signal(now, NavigationSignal::DomMutation, "/home");
    run(&mut engine, now, now + 2000.0);

    assert_eq!(engine.session_id(), Some(session));
    assert_eq!(engine.state(), NavigationState::Ready);
}

#[test]
fn test_leave_mid_typing_restores_page() {
    let mut engine = desktop();
    engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");

    let mut now = 0.0;
    while !engine.surface().caret(EntityId::About) {
        assert!(now < 15_000.0, "about never started typing");
        engine.tick(now);
        now += FRAME_MS;
    }
    assert_ne!(engine.surface().markup(EntityId::About), Some("<p>I make <b>things</b>.</p>"));

    engine.navigation_signal(now, NavigationSignal::UrlPoll, "/project-02");
    assert_eq!(engine.state(), NavigationState::Uninitialized);
    assert!(engine.session_id().is_none());
    assert_eq!(engine.surface().markup(EntityId::About), Some("<p>I make <b>things</b>.</p>"));
    assert!(!engine.surface().caret(EntityId::About));
    assert_eq!(transient_nodes(&engine), 0);
    assert_eq!(engine.active_timelines(), 0);
    assert!(engine.surface().image_visible(EntityId::Hello));

    // Nothing from the old session fires later
    let before = engine.surface().events().len();
    run(&mut engine, now, now + 5000.0);
    assert!(engine.surface().events()[before..]
        .iter()
        .all(|e| !matches!(e, SurfaceEvent::Spawn(_) | SurfaceEvent::Markup { .. })));
}

#[test]
fn test_return_starts_fresh_session() {
    let mut engine = desktop();
    engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
    let now = run(&mut engine, 0.0, 15_000.0);
    let first = engine.session_id().expect("first session");
    assert!(engine.reveal_snapshot().typing_done_contact);

    engine.navigation_signal(now, NavigationSignal::UrlPoll, "/project-01-copy");
    engine.navigation_signal(now + 100.0, NavigationSignal::UrlPoll, "/home");
    assert_eq!(engine.state(), NavigationState::PendingDebounce);

    let mut t = now + 100.0;
    while engine.session_id().is_none() {
        assert!(t < now + 5000.0, "no session after returning");
        engine.tick(t);
        t += FRAME_MS;
    }
    let second = engine.session_id().expect("second session");
    assert!(second > first);

    let snap = engine.reveal_snapshot();
    assert_eq!(snap.session, second);
    assert!(!snap.hello_belt_done);
    assert!(!snap.typing_done_about);
    assert!(!snap.typing_done_contact);

    run(&mut engine, t, t + 15_000.0);
    assert!(engine.reveal_snapshot().typing_done_contact);
    assert_eq!(engine.choreo_stage(), ChoreoStage::Done);
}

#[test]
fn test_forced_start_happens_once() {
    let mut surface = MemorySurface::new(Size::new(1400.0, 900.0));
    surface.set_readiness(Default::default());
    let mut engine = engine(surface);
    engine.navigation_signal(0.0, NavigationSignal::VisibilityVisible, "/home");

    // Debounce plus fourteen checks is not enough
    run(&mut engine, 0.0, 1500.0);
    assert!(engine.session_id().is_none());

    let mut started = None;
    let mut now = 1500.0;
    while now <= 6000.0 {
        engine.tick(now);
        if let Some(id) = engine.session_id() {
            assert_eq!(*started.get_or_insert(id), id, "session restarted");
        }
        now += FRAME_MS;
    }
    assert!(started.is_some(), "forced start never happened");
    assert_eq!(engine.state(), NavigationState::Ready);
}

#[test]
fn test_resize_during_sequence_relayouts() {
    let mut engine = desktop();
    engine.navigation_signal(0.0, NavigationSignal::InitialSetup, "/home");
    let now = run(&mut engine, 0.0, 2000.0);
    let wide = *engine.geometry();

    engine.surface_mut().set_viewport(Size::new(390.0, 844.0));
    engine.resize();
    run(&mut engine, now, 15_000.0);

    assert_ne!(*engine.geometry(), wide);
    assert!(engine.reveal_snapshot().typing_done_contact);
}

// =============================================================================
// Swipe Navigation Tests
// =============================================================================

fn swipe_left(c: &mut SwipeController<MemoryCover>, now: f64) {
    c.touch_start(350.0, 300.0);
    for x in [330.0, 300.0, 250.0, 200.0, 150.0] {
        c.touch_move(x, 305.0);
    }
    c.touch_end(now);
}

#[test]
fn test_swipe_through_every_page() {
    let config = SwipeConfig::default();
    let pages = config.pages.clone();
    let mut c = SwipeController::new(MemoryCover::new(400.0, "/home"), config, 0.0);

    let mut now = 0.0;
    for _ in 1..pages.len() {
        swipe_left(&mut c, now);
        assert!(c.is_navigating());
        for _ in 0..200 {
            now += FRAME_MS;
            c.tick(now);
        }
        assert_eq!(*c.phase(), SwipePhase::Idle);
        assert_eq!(c.surface().cover_percent(), Some(COVER_PARKED));
    }
    assert_eq!(c.surface().visits, pages[1..].to_vec());

    // The last page has nowhere left to go
    swipe_left(&mut c, now);
    assert_eq!(*c.phase(), SwipePhase::Cancelling);
    for _ in 0..50 {
        now += FRAME_MS;
        c.tick(now);
    }
    assert_eq!(*c.phase(), SwipePhase::Idle);
    assert_eq!(c.surface().visits.len(), pages.len() - 1);
}
