//! Browser cover for swipe navigation

use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

use crate::error::{GenieError, Result};
use crate::swipe::{page_path, CoverSurface, COVER_PARKED};

const COVER_ID: &str = "swipe-slide";

/// Selectors that show the page has rendered its content
const CONTENT_SELECTORS: [&str; 4] = [".page .bodycopy", "#layout-wrapper", "article", ".content"];

/// [`CoverSurface`] over a fixed full-screen element
pub struct DomCover {
    window: web_sys::Window,
    document: Document,
}

impl DomCover {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| GenieError::Backend("no window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| GenieError::Backend("no document".to_string()))?;
        Ok(Self { window, document })
    }

    fn cover(&self) -> Option<HtmlElement> {
        self.document
            .get_element_by_id(COVER_ID)?
            .dyn_into::<HtmlElement>()
            .ok()
    }
}

impl CoverSurface for DomCover {
    fn viewport_width(&self) -> f32 {
        self.window
            .inner_width()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0) as f32
    }

    fn path(&self) -> String {
        self.window.location().pathname().unwrap_or_default()
    }

    fn has_content(&self) -> bool {
        CONTENT_SELECTORS
            .iter()
            .any(|s| self.document.query_selector(s).ok().flatten().is_some())
    }

    fn ensure_cover(&mut self) -> bool {
        if self.cover().is_some() {
            return false;
        }
        let (Some(body), Ok(el)) = (self.document.body(), self.document.create_element("div")) else {
            return false;
        };
        el.set_id(COVER_ID);
        let _ = el.set_attribute(
            "style",
            &format!(
                "position:fixed;top:0;left:0;right:0;bottom:0;background:#f5f3ed;pointer-events:none;z-index:99999;transform:translateX({}%);",
                COVER_PARKED
            ),
        );
        body.append_child(&el).is_ok()
    }

    fn set_cover(&mut self, percent: f32, transition_ms: Option<f64>) {
        let Some(cover) = self.cover() else {
            return;
        };
        let style = cover.style();
        let transition = match transition_ms {
            Some(ms) => format!("transform {}s ease-out", ms / 1000.0),
            None => "none".to_string(),
        };
        let _ = style.set_property("transition", &transition);
        let _ = style.set_property("transform", &format!("translateX({}%)", percent));
    }

    fn navigate(&mut self, page: &str) {
        let selector = format!(r#"a[href="{0}"],a[href="/{0}"]"#, page);
        let link = self
            .document
            .query_selector(&selector)
            .ok()
            .flatten()
            .and_then(|a| a.dyn_into::<HtmlElement>().ok());
        match link {
            Some(a) => a.click(),
            None => {
                let _ = self.window.location().set_href(&page_path(page));
            }
        }
    }
}
