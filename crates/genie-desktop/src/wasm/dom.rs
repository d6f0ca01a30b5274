//! Browser surface: the stage's nodes as real DOM and SVG elements

use std::collections::{BTreeMap, HashMap};

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement, HtmlImageElement};

use crate::entity::{EntityId, EntityMap};
use crate::error::{GenieError, Result};
use crate::launch::OutlinePaths;
use crate::layout::CanvasGeometry;
use crate::math::{Rect, Size};
use crate::reveal::{ImageSample, ParticlePhase, ParticleRecord};
use crate::surface::{NodeRef, NodeSpec, OutlineLayer, PageGlobals, PageMarkers, Prop, Readiness, Surface};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Vector stages sized to the canvas
const STAGE_IDS: [&str; 3] = ["stage", "stage-gif", "stage-top"];

const CURSOR_SVG: &str = r##"<svg viewBox="0 0 24 30" xmlns="http://www.w3.org/2000/svg"><path d="M2 1v24l6-6 4 9 4-2-4-9h8z" fill="#fff" stroke="#000" stroke-width="2" stroke-linejoin="round"/></svg>"##;

/// Particle layer over one window's image
struct ParticleLayer {
    container: HtmlElement,
    solids: Vec<HtmlElement>,
    mists: Vec<HtmlElement>,
}

/// [`Surface`] over the live document
pub struct DomSurface {
    window: web_sys::Window,
    document: Document,
    /// Spawned transient elements
    nodes: HashMap<NodeRef, Element>,
    /// Last written values per node, so partial writes can be merged
    values: HashMap<NodeRef, BTreeMap<Prop, f32>>,
    particles: EntityMap<Option<ParticleLayer>>,
    stages_removed: bool,
}

fn px(v: f32) -> String {
    format!("{}px", v)
}

fn set_style(el: &HtmlElement, name: &str, value: &str) {
    let _ = el.style().set_property(name, value);
}

impl DomSurface {
    /// Bind to the page's window and document
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| GenieError::Backend("no window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| GenieError::Backend("no document".to_string()))?;
        Ok(Self {
            window,
            document,
            nodes: HashMap::new(),
            values: HashMap::new(),
            particles: EntityMap::default(),
            stages_removed: false,
        })
    }

    fn by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn query(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }

    fn window_el(&self, id: EntityId) -> Option<HtmlElement> {
        self.by_id(id.dom_id())?.dyn_into::<HtmlElement>().ok()
    }

    fn window_body(&self, id: EntityId) -> Option<HtmlElement> {
        self.query(&format!("{} .window-body", id.selector()))?
            .dyn_into::<HtmlElement>()
            .ok()
    }

    /// Text target: the inner body when present, else the body
    fn text_target(&self, id: EntityId) -> Option<Element> {
        self.query(&format!("{} .window-body-inner", id.selector()))
            .or_else(|| self.query(&format!("{} .window-body", id.selector())))
    }

    fn image(&self, id: EntityId) -> Option<HtmlImageElement> {
        self.query(&format!("{} .window-body img", id.selector()))?
            .dyn_into::<HtmlImageElement>()
            .ok()
    }

    fn container(&self, entity: EntityId, layer: OutlineLayer) -> Option<Element> {
        let prefix = match layer {
            OutlineLayer::Ghost => "ghosts",
            OutlineLayer::Main => "main",
        };
        self.by_id(&format!("{}-{}", prefix, entity.name()))
    }

    fn create(&self, tag: &str) -> Result<Element> {
        self.document
            .create_element(tag)
            .map_err(|e| GenieError::Backend(format!("create {}: {:?}", tag, e)))
    }

    fn create_svg(&self, tag: &str) -> Result<Element> {
        self.document
            .create_element_ns(Some(SVG_NS), tag)
            .map_err(|e| GenieError::Backend(format!("create {}: {:?}", tag, e)))
    }

    fn html(&self, tag: &str) -> Result<HtmlElement> {
        self.create(tag)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| GenieError::Backend(format!("{} is not an HTML element", tag)))
    }

    /// Outline group: body fill, title fill, border, divider
    fn build_outline(&self, layer: OutlineLayer) -> Result<Element> {
        let g = self.create_svg("g")?;
        let title_fill = match layer {
            OutlineLayer::Main => "url(#dottedTexture)",
            OutlineLayer::Ghost => "#f6f3ec",
        };
        for (fill, stroke) in [("#fff", "none"), (title_fill, "none"), ("none", "#000"), ("none", "#000")] {
            let path = self.create_svg("path")?;
            let _ = path.set_attribute("fill", fill);
            let _ = path.set_attribute("stroke", stroke);
            if stroke != "none" {
                let _ = path.set_attribute("stroke-width", &crate::launch::STROKE_WIDTH.to_string());
            }
            let _ = g.append_child(&path);
        }
        Ok(g)
    }

    fn build_ghost(&self, z_index: i32, rect: Rect) -> Result<Element> {
        let ghost = self.create("div")?;
        let _ = ghost.set_attribute("class", "window ios-ghost");
        let _ = ghost.set_attribute(
            "style",
            &format!(
                "position:absolute;width:{}px;height:{}px;left:{}px;top:{}px;opacity:0;pointer-events:none;z-index:{};",
                rect.width, rect.height, rect.x, rect.y, z_index
            ),
        );
        ghost.set_inner_html(
            r#"<div class="title-bar"><div class="title-bar-text"></div></div><div class="window-body"></div>"#,
        );
        Ok(ghost)
    }

    fn build_cursor(&self, width: f32) -> Result<Element> {
        for stale in self.query_all(".animated-cursor") {
            stale.remove();
        }
        let cursor = self.create("div")?;
        let _ = cursor.set_attribute("class", "animated-cursor");
        let _ = cursor.set_attribute(
            "style",
            &format!(
                "position:fixed;left:0;top:0;width:{}px;pointer-events:none;z-index:100000;opacity:0;",
                width
            ),
        );
        cursor.set_inner_html(CURSOR_SVG);
        Ok(cursor)
    }

    fn query_all(&self, selector: &str) -> Vec<Element> {
        let Ok(list) = self.document.query_selector_all(selector) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|n| n.dyn_into::<Element>().ok())
            .collect()
    }

    fn render(&self, node: NodeRef, element: &Element, v: &BTreeMap<Prop, f32>) {
        let get = |p: Prop, d: f32| v.get(&p).copied().unwrap_or(d);
        match node {
            NodeRef::Outline { .. } => {
                let rect = Rect::new(get(Prop::X, 0.0), get(Prop::Y, 0.0), get(Prop::Width, 0.0), get(Prop::Height, 0.0));
                let paths = OutlinePaths::from_rect(rect, get(Prop::TitleHeight, 0.0));
                let children = element.children();
                for (i, d) in [&paths.body_fill, &paths.title_fill, &paths.border, &paths.divider]
                    .into_iter()
                    .enumerate()
                {
                    if let Some(path) = children.item(i as u32) {
                        let _ = path.set_attribute("d", d);
                    }
                }
                let center = rect.center();
                let _ = element.set_attribute(
                    "transform",
                    &format!("rotate({} {} {})", get(Prop::Rotation, 0.0), center.x, center.y),
                );
                let _ = element.set_attribute("opacity", &get(Prop::Opacity, 1.0).to_string());
            }
            NodeRef::Window(_) | NodeRef::Ghost { .. } => {
                let Some(el) = element.dyn_ref::<HtmlElement>() else {
                    return;
                };
                set_style(
                    el,
                    "transform",
                    &format!(
                        "translateY({}px) scale({}, {}) rotate({}deg)",
                        get(Prop::OffsetY, 0.0),
                        get(Prop::ScaleX, 1.0),
                        get(Prop::ScaleY, 1.0),
                        get(Prop::Rotation, 0.0)
                    ),
                );
                if let Some(opacity) = v.get(&Prop::Opacity) {
                    set_style(el, "opacity", &opacity.to_string());
                }
                if let Some(shadow) = v.get(&Prop::Shadow) {
                    let offset = 4.0 * shadow;
                    let value = if *shadow > 0.0 {
                        format!("{}px {}px 0 rgba(25,25,25,1)", offset, offset)
                    } else {
                        String::new()
                    };
                    set_style(el, "box-shadow", &value);
                }
            }
            NodeRef::Cursor => {
                let Some(el) = element.dyn_ref::<HtmlElement>() else {
                    return;
                };
                set_style(
                    el,
                    "transform",
                    &format!(
                        "translate({}px, {}px) scale({}, {})",
                        get(Prop::X, 0.0),
                        get(Prop::Y, 0.0),
                        get(Prop::ScaleX, 1.0),
                        get(Prop::ScaleY, 1.0)
                    ),
                );
                set_style(el, "opacity", &get(Prop::Opacity, 1.0).to_string());
            }
        }
    }
}

impl Surface for DomSurface {
    fn viewport(&self) -> Size {
        let dim = |v: std::result::Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
        Size::new(dim(self.window.inner_width()), dim(self.window.inner_height()))
    }

    fn readiness(&self) -> Readiness {
        Readiness {
            layout_container: self.by_id("layout-wrapper").is_some(),
            icon_count: self
                .document
                .query_selector_all(".desktop-icon")
                .map(|l| l.length() as usize)
                .unwrap_or(0),
            drawing_surface: self.stages_removed || self.by_id("stage").is_some(),
        }
    }

    fn current_path(&self) -> Option<String> {
        self.window.location().pathname().ok()
    }

    fn has_window(&self, id: EntityId) -> bool {
        self.by_id(id.dom_id()).is_some()
    }

    fn window_z_index(&self, id: EntityId) -> Option<i32> {
        let el = self.by_id(id.dom_id())?;
        let style = self.window.get_computed_style(&el).ok().flatten()?;
        style.get_property_value("z-index").ok()?.trim().parse().ok()
    }

    fn window_screen_rect(&self, id: EntityId) -> Option<Rect> {
        let r = self.by_id(id.dom_id())?.get_bounding_client_rect();
        Some(Rect::new(r.left() as f32, r.top() as f32, r.width() as f32, r.height() as f32))
    }

    fn read_markup(&self, id: EntityId) -> Option<String> {
        self.text_target(id).map(|el| el.inner_html())
    }

    fn sample_image(&mut self, id: EntityId) -> Result<ImageSample> {
        let img = self
            .image(id)
            .ok_or_else(|| GenieError::missing(format!("{} img", id.selector())))?;
        if !img.complete() || img.natural_width() == 0 {
            return Err(GenieError::ImagePending);
        }
        let (width, height) = (img.natural_width(), img.natural_height());

        let canvas = self
            .create("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| GenieError::Backend("canvas".to_string()))?;
        canvas.set_width(width);
        canvas.set_height(height);
        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or_else(|| GenieError::RenderingRestricted("no 2d context".to_string()))?;
        ctx.draw_image_with_html_image_element_and_dw_and_dh(&img, 0.0, 0.0, width as f64, height as f64)
            .map_err(|e| GenieError::RenderingRestricted(format!("{:?}", e)))?;
        let data = ctx
            .get_image_data(0.0, 0.0, width as f64, height as f64)
            .map_err(|e| GenieError::RenderingRestricted(format!("{:?}", e)))?;

        Ok(ImageSample {
            width,
            height,
            pixels: data.data().0,
            display: Rect::new(
                img.offset_left() as f32,
                img.offset_top() as f32,
                img.offset_width() as f32,
                img.offset_height() as f32,
            ),
        })
    }

    fn set_page_markers(&mut self, markers: PageMarkers) {
        let Some(body) = self.document.body() else {
            return;
        };
        let classes = body.class_list();
        let _ = classes.toggle_with_force("is-genie-homepage", markers.homepage);
        let _ = classes.toggle_with_force("is-not-genie-homepage", !markers.homepage);
        let _ = classes.toggle_with_force("is-splash-page", markers.splash);
    }

    fn restore_scrolling(&mut self) {
        if let Some(body) = self.document.body() {
            let _ = body.style().remove_property("overflow");
        }
    }

    fn apply_canvas(&mut self, geometry: &CanvasGeometry, applied_scale: f32) {
        for id in STAGE_IDS {
            if let Some(stage) = self.by_id(id) {
                let _ = stage.set_attribute("viewBox", &geometry.view_box());
                let _ = stage.set_attribute(
                    "style",
                    &format!("width:{}px;height:{}px;", geometry.base_width, geometry.base_height),
                );
            }
        }
        if let Some(scaler) = self.by_id("layout-scaler").and_then(|e| e.dyn_into::<HtmlElement>().ok()) {
            set_style(&scaler, "width", &px(geometry.base_width));
            set_style(&scaler, "height", &px(geometry.base_height));
            set_style(&scaler, "transform", &format!("scale({})", applied_scale));
        }
    }

    fn remove_vector_stages(&mut self) {
        for id in STAGE_IDS {
            if let Some(stage) = self.by_id(id) {
                stage.remove();
            }
        }
        self.stages_removed = true;
    }

    fn publish(&mut self, globals: &PageGlobals) {
        let Ok(serde_json::Value::Object(map)) = serde_json::to_value(globals) else {
            return;
        };
        for (key, value) in map {
            let value = match value {
                serde_json::Value::Bool(b) => JsValue::from_bool(b),
                serde_json::Value::Number(n) => JsValue::from_f64(n.as_f64().unwrap_or(0.0)),
                _ => continue,
            };
            let _ = js_sys::Reflect::set(&self.window, &JsValue::from_str(&key), &value);
        }
    }

    fn place_window(&mut self, id: EntityId, rect: Rect) {
        let Some(el) = self.window_el(id) else {
            return;
        };
        set_style(&el, "left", &px(rect.x));
        set_style(&el, "top", &px(rect.y));
        set_style(&el, "width", &px(rect.width));
        set_style(&el, "height", &px(rect.height));
        set_style(&el, "transform-origin", "center center");
    }

    fn set_window_z_index(&mut self, id: EntityId, z_index: i32) {
        if let Some(el) = self.window_el(id) {
            set_style(&el, "z-index", &z_index.to_string());
        }
    }

    fn reset_window(&mut self, id: EntityId) {
        self.values.remove(&NodeRef::Window(id));
        if let Some(el) = self.window_el(id) {
            let style = el.style();
            let _ = style.remove_property("transform");
            let _ = style.remove_property("box-shadow");
            let _ = style.set_property("opacity", "0");
        }
    }

    fn spawn(&mut self, spec: &NodeSpec) -> Result<NodeRef> {
        let node = spec.node_ref();
        let element = match *spec {
            NodeSpec::Outline { entity, layer, .. } => {
                let parent = self
                    .container(entity, layer)
                    .ok_or_else(|| GenieError::missing(format!("{:?} container of {}", layer, entity)))?;
                let g = self.build_outline(layer)?;
                let _ = parent.append_child(&g);
                g
            }
            NodeSpec::Ghost { z_index, rect, .. } => {
                let scaler = self
                    .by_id("layout-scaler")
                    .ok_or_else(|| GenieError::missing("#layout-scaler"))?;
                let ghost = self.build_ghost(z_index, rect)?;
                let _ = scaler.append_child(&ghost);
                ghost
            }
            NodeSpec::Cursor { width } => {
                let body = self.document.body().ok_or_else(|| GenieError::missing("body"))?;
                let cursor = self.build_cursor(width)?;
                let _ = body.append_child(&cursor);
                cursor
            }
        };
        if let Some(old) = self.nodes.insert(node, element) {
            old.remove();
        }
        self.values.remove(&node);
        Ok(node)
    }

    fn apply(&mut self, node: NodeRef, values: &[(Prop, f32)]) {
        let element = match node {
            NodeRef::Window(id) => self.by_id(id.dom_id()),
            _ => self.nodes.get(&node).cloned(),
        };
        let Some(element) = element else {
            return;
        };
        let merged = self.values.entry(node).or_default();
        merged.extend(values.iter().copied());
        let merged = merged.clone();
        self.render(node, &element, &merged);
    }

    fn remove(&mut self, node: NodeRef) {
        if let Some(el) = self.nodes.remove(&node) {
            el.remove();
        }
        self.values.remove(&node);
    }

    fn clear_outlines(&mut self, entity: Option<EntityId>) {
        let entities: Vec<EntityId> = match entity {
            Some(id) => vec![id],
            None => EntityId::ALL.to_vec(),
        };
        for id in entities {
            for layer in [OutlineLayer::Ghost, OutlineLayer::Main] {
                if let Some(container) = self.container(id, layer) {
                    container.set_inner_html("");
                }
            }
            self.nodes
                .retain(|n, _| !matches!(n, NodeRef::Outline { entity, .. } if *entity == id));
        }
        self.values.retain(|n, _| !matches!(n, NodeRef::Outline { .. }) || self.nodes.contains_key(n));
    }

    fn remove_transients(&mut self) {
        for (_, el) in self.nodes.drain() {
            el.remove();
        }
        self.values.retain(|n, _| !n.is_transient());
        for stale in self.query_all(".ios-ghost, .animated-cursor") {
            stale.remove();
        }
    }

    fn write_markup(&mut self, id: EntityId, markup: &str, caret: bool) {
        let Some(target) = self.text_target(id) else {
            return;
        };
        if caret {
            target.set_inner_html(&format!(r#"{}<span class="typewriter-cursor"></span>"#, markup));
        } else {
            target.set_inner_html(markup);
        }
    }

    fn set_image_visible(&mut self, id: EntityId, visible: bool) {
        let Some(img) = self.image(id) else {
            return;
        };
        let img: &HtmlElement = img.as_ref();
        set_style(img, "opacity", if visible { "1" } else { "0" });
        set_style(img, "visibility", if visible { "visible" } else { "hidden" });
    }

    fn mount_particles(&mut self, id: EntityId, particles: &[ParticleRecord], narrow: bool) -> Result<()> {
        self.unmount_particles(id);
        let body = self
            .window_body(id)
            .ok_or_else(|| GenieError::missing(format!("{} .window-body", id.selector())))?;
        set_style(&body, "position", "relative");
        set_style(&body, "overflow", "hidden");

        let container = self.html("div")?;
        let _ = container.set_attribute(
            "style",
            "position:absolute;top:0;left:0;width:100%;height:100%;z-index:10;transform:translateZ(0);",
        );
        let profile = crate::reveal::DissolveProfile::for_device(narrow);
        let mut solids = Vec::with_capacity(particles.len());
        let mut mists = Vec::with_capacity(particles.len());
        for p in particles {
            let [r, g, b] = p.color;
            let solid = self.html("div")?;
            let _ = solid.set_attribute(
                "style",
                &format!(
                    "position:absolute;left:{}px;top:{}px;width:{}px;height:{}px;background-color:rgb({},{},{});opacity:0;z-index:9;image-rendering:pixelated;",
                    p.x, p.y, p.size, p.size, r, g, b
                ),
            );
            let mist = self.html("div")?;
            let mist_size = p.size * profile.mist_size;
            let _ = mist.set_attribute(
                "style",
                &format!(
                    "position:absolute;left:{}px;top:{}px;width:{}px;height:{}px;background-color:rgba({},{},{},0.6);opacity:0;z-index:10;filter:blur({}px);",
                    p.x, p.y, mist_size, mist_size, r, g, b, profile.blur
                ),
            );
            let _ = container.append_child(&solid);
            let _ = container.append_child(&mist);
            solids.push(solid);
            mists.push(mist);
        }
        body.append_child(&container)
            .map_err(|e| GenieError::Backend(format!("{:?}", e)))?;
        self.particles[id] = Some(ParticleLayer {
            container,
            solids,
            mists,
        });
        Ok(())
    }

    fn paint_particles(&mut self, id: EntityId, phases: &[ParticlePhase]) {
        let Some(layer) = &self.particles[id] else {
            return;
        };
        for ((solid, mist), phase) in layer.solids.iter().zip(&layer.mists).zip(phases) {
            let (s, m) = match *phase {
                ParticlePhase::Hidden => (0.0, 0.0),
                ParticlePhase::Mist { opacity } => (0.0, opacity),
                ParticlePhase::Solid { opacity } => (opacity, 0.0),
            };
            set_style(solid, "opacity", &s.to_string());
            set_style(mist, "opacity", &m.to_string());
        }
    }

    fn unmount_particles(&mut self, id: EntityId) {
        if let Some(layer) = self.particles[id].take() {
            layer.container.remove();
        }
    }
}

