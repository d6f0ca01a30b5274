//! WASM exports for the genie stage
//!
//! [`GenieController`] binds the engine to the live page: it wires the
//! navigation signals (history, popstate, URL polling, DOM mutations,
//! load, visibility), resize and touch input, and drives everything from a
//! single animation-frame loop. DOM callbacks only queue inputs; the frame
//! loop drains the queue, so no callback ever re-enters the engine.

mod console;
mod cover;
mod dom;

pub use cover::DomCover;
pub use dom::DomSurface;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{info, warn, LevelFilter};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, MutationObserver, MutationObserverInit, TouchEvent, VisibilityState};

use crate::config::{StageConfig, SwipeConfig};
use crate::engine::GenieEngine;
use crate::error::GenieError;
use crate::navigation::NavigationSignal;
use crate::swipe::SwipeController;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = Date, js_name = now)]
    fn date_now() -> f64;
}

impl From<GenieError> for JsValue {
    fn from(e: GenieError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

/// Input captured by a DOM callback, handled on the next frame
#[derive(Clone, Debug)]
enum Input {
    Navigation(NavigationSignal),
    Resize,
    TouchStart(f32, f32),
    TouchMove(f32, f32),
    TouchEnd,
}

type Queue = Rc<RefCell<Vec<Input>>>;

struct Runtime {
    engine: GenieEngine<DomSurface>,
    swipe: SwipeController<DomCover>,
}

impl Runtime {
    fn handle(&mut self, now_ms: f64, input: Input) {
        match input {
            Input::Navigation(signal) => {
                let path = current_path();
                self.engine.navigation_signal(now_ms, signal, &path);
            }
            Input::Resize => self.engine.resize(),
            Input::TouchStart(x, y) => self.swipe.touch_start(x, y),
            Input::TouchMove(x, y) => self.swipe.touch_move(x, y),
            Input::TouchEnd => self.swipe.touch_end(now_ms),
        }
    }

    fn frame(&mut self, now_ms: f64, inputs: Vec<Input>) {
        for input in inputs {
            self.handle(now_ms, input);
        }
        self.engine.tick(now_ms);
        self.swipe.tick(now_ms);
    }
}

fn current_path() -> String {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_default()
}

fn backend(e: JsValue) -> GenieError {
    GenieError::Backend(format!("{:?}", e))
}

fn first_touch(event: &Event) -> Option<(f32, f32)> {
    let touch = event.dyn_ref::<TouchEvent>()?.touches().get(0)?;
    Some((touch.client_x() as f32, touch.client_y() as f32))
}

/// Genie controller for WASM - owns the engine and every page hook
#[wasm_bindgen]
pub struct GenieController {
    runtime: Rc<RefCell<Runtime>>,
    queue: Queue,
    running: Rc<Cell<bool>>,
    url_poll: Option<i32>,
    observer: Option<MutationObserver>,
    _events: Vec<Closure<dyn FnMut(Event)>>,
    _history: Vec<Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>>,
    _poll: Option<Closure<dyn FnMut()>>,
    _mutations: Option<Closure<dyn FnMut(js_sys::Array, MutationObserver)>>,
}

#[wasm_bindgen]
impl GenieController {
    /// Install the stage on the current page
    ///
    /// Both arguments are optional JSON overrides of the default timings.
    #[wasm_bindgen(constructor)]
    pub fn new(stage_json: Option<String>, swipe_json: Option<String>) -> Result<GenieController, JsValue> {
        console_error_panic_hook::set_once();
        console::init(LevelFilter::Info);

        let config = match stage_json {
            Some(json) => StageConfig::from_json(&json)?,
            None => StageConfig::default(),
        };
        let swipe_config = match swipe_json {
            Some(json) => SwipeConfig::from_json(&json)?,
            None => SwipeConfig::default(),
        };

        let window = web_sys::window().ok_or_else(|| GenieError::Backend("no window".to_string()))?;
        let user_agent = window.navigator().user_agent().unwrap_or_default();
        let seed = (js_sys::Math::random() * 9_007_199_254_740_992.0) as u64;
        let url_poll_ms = config.url_poll_ms;
        let now = date_now();

        let runtime = Runtime {
            engine: GenieEngine::new(DomSurface::new()?, config, &user_agent, seed),
            swipe: SwipeController::new(DomCover::new()?, swipe_config, now),
        };

        let mut controller = GenieController {
            runtime: Rc::new(RefCell::new(runtime)),
            queue: Rc::new(RefCell::new(vec![Input::Navigation(NavigationSignal::InitialSetup)])),
            running: Rc::new(Cell::new(true)),
            url_poll: None,
            observer: None,
            _events: Vec::new(),
            _history: Vec::new(),
            _poll: None,
            _mutations: None,
        };

        controller.install_events(&window)?;
        controller.install_history(&window)?;
        controller.install_url_poll(&window, url_poll_ms)?;
        controller.install_observer(&window)?;
        controller.start_frame_loop();
        info!(target: "genie::nav", "stage installed");
        Ok(controller)
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Lifecycle state and reveal flags as JSON
    #[wasm_bindgen]
    pub fn get_state_json(&self) -> String {
        let runtime = self.runtime.borrow();
        let engine = &runtime.engine;
        serde_json::to_string(&serde_json::json!({
            "state": format!("{:?}", engine.state()),
            "path": engine.path(),
            "choreo": engine.choreo_stage(),
            "reveal": engine.reveal_snapshot(),
            "scale": engine.geometry().scale_factor,
            "timelines": engine.active_timelines(),
            "timers": engine.pending_timers(),
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    /// Swipe gesture phase as JSON
    #[wasm_bindgen]
    pub fn get_swipe_json(&self) -> String {
        let runtime = self.runtime.borrow();
        serde_json::to_string(&serde_json::json!({
            "phase": format!("{:?}", runtime.swipe.phase()),
            "navigating": runtime.swipe.is_navigating(),
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Kill every animation and put the windows back in their hidden state
    #[wasm_bindgen]
    pub fn force_reset(&self) {
        match self.runtime.try_borrow_mut() {
            Ok(mut runtime) => runtime.engine.force_reset(),
            Err(_) => warn!(target: "genie::nav", "force_reset ignored during a frame"),
        }
    }

    /// Change the console log level ("error", "warn", "info", "debug")
    #[wasm_bindgen]
    pub fn set_log_level(&self, level: &str) {
        let filter = level.parse().unwrap_or(LevelFilter::Info);
        log::set_max_level(filter);
    }

    /// Stop the frame loop and unhook from the page
    #[wasm_bindgen]
    pub fn dispose(&mut self) {
        self.running.set(false);
        if let (Some(window), Some(id)) = (web_sys::window(), self.url_poll.take()) {
            window.clear_interval_with_handle(id);
        }
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
    }
}

impl GenieController {
    fn listen(
        &mut self,
        target: &web_sys::EventTarget,
        name: &str,
        make: impl Fn(&Event) -> Option<Input> + 'static,
    ) -> Result<(), GenieError> {
        let queue = self.queue.clone();
        let closure = Closure::wrap(Box::new(move |event: Event| {
            if let Some(input) = make(&event) {
                queue.borrow_mut().push(input);
            }
        }) as Box<dyn FnMut(Event)>);
        target
            .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
            .map_err(backend)?;
        self._events.push(closure);
        Ok(())
    }

    fn install_events(&mut self, window: &web_sys::Window) -> Result<(), GenieError> {
        let document = window.document().ok_or_else(|| GenieError::missing("document"))?;

        self.listen(window, "popstate", |_| Some(Input::Navigation(NavigationSignal::PopState)))?;
        self.listen(window, "load", |_| Some(Input::Navigation(NavigationSignal::Load)))?;
        self.listen(window, "resize", |_| Some(Input::Resize))?;

        let doc = document.clone();
        self.listen(&document, "visibilitychange", move |_| {
            (doc.visibility_state() == VisibilityState::Visible)
                .then_some(Input::Navigation(NavigationSignal::VisibilityVisible))
        })?;

        self.listen(&document, "touchstart", |e| {
            first_touch(e).map(|(x, y)| Input::TouchStart(x, y))
        })?;
        self.listen(&document, "touchmove", |e| {
            first_touch(e).map(|(x, y)| Input::TouchMove(x, y))
        })?;
        self.listen(&document, "touchend", |_| Some(Input::TouchEnd))?;
        Ok(())
    }

    /// Wrap `pushState`/`replaceState` so route changes made by the page router are seen
    fn install_history(&mut self, window: &web_sys::Window) -> Result<(), GenieError> {
        let history = window.history().map_err(backend)?;
        for (method, signal) in [
            ("pushState", NavigationSignal::HistoryPush),
            ("replaceState", NavigationSignal::HistoryReplace),
        ] {
            let original = js_sys::Reflect::get(&history, &JsValue::from_str(method))
                .map_err(backend)?
                .dyn_into::<js_sys::Function>()
                .map_err(|_| GenieError::Backend(format!("history.{} is not a function", method)))?;
            let queue = self.queue.clone();
            let target = history.clone();
            let wrapper = Closure::wrap(Box::new(move |state: JsValue, title: JsValue, url: JsValue| {
                let result = original.call3(&target, &state, &title, &url).unwrap_or(JsValue::UNDEFINED);
                queue.borrow_mut().push(Input::Navigation(signal));
                result
            }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);
            js_sys::Reflect::set(&history, &JsValue::from_str(method), wrapper.as_ref()).map_err(backend)?;
            self._history.push(wrapper);
        }
        Ok(())
    }

    fn install_url_poll(&mut self, window: &web_sys::Window, interval_ms: f64) -> Result<(), GenieError> {
        let queue = self.queue.clone();
        let poll = Closure::wrap(Box::new(move || {
            queue.borrow_mut().push(Input::Navigation(NavigationSignal::UrlPoll));
        }) as Box<dyn FnMut()>);
        let id = window
            .set_interval_with_callback_and_timeout_and_arguments_0(poll.as_ref().unchecked_ref(), interval_ms as i32)
            .map_err(backend)?;
        self.url_poll = Some(id);
        self._poll = Some(poll);
        Ok(())
    }

    fn install_observer(&mut self, window: &web_sys::Window) -> Result<(), GenieError> {
        let body = window
            .document()
            .and_then(|d| d.body())
            .ok_or_else(|| GenieError::missing("body"))?;
        let queue = self.queue.clone();
        let callback = Closure::wrap(Box::new(move |_records: js_sys::Array, _observer: MutationObserver| {
            queue.borrow_mut().push(Input::Navigation(NavigationSignal::DomMutation));
        }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(backend)?;
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        observer.observe_with_options(&body, &options).map_err(backend)?;
        self.observer = Some(observer);
        self._mutations = Some(callback);
        Ok(())
    }

    fn start_frame_loop(&self) {
        let runtime = self.runtime.clone();
        let queue = self.queue.clone();
        let running = self.running.clone();
        let slot: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
        let next = slot.clone();

        *slot.borrow_mut() = Some(Closure::wrap(Box::new(move |_ts: f64| {
            if !running.get() {
                return;
            }
            let inputs = std::mem::take(&mut *queue.borrow_mut());
            if let Ok(mut runtime) = runtime.try_borrow_mut() {
                runtime.frame(date_now(), inputs);
            } else {
                queue.borrow_mut().extend(inputs);
            }
            request_frame(&next);
        }) as Box<dyn FnMut(f64)>));
        request_frame(&slot);
    }
}

fn request_frame(slot: &Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>) {
    let (Some(window), Some(callback)) = (web_sys::window(), slot.borrow().as_ref().map(|c| c.as_ref().clone())) else {
        return;
    };
    let _ = window.request_animation_frame(callback.unchecked_ref());
}
