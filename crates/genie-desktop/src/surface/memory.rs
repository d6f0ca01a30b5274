//! In-memory surface that records every write

use std::collections::{BTreeMap, BTreeSet};

use super::{NodeRef, NodeSpec, PageGlobals, PageMarkers, Prop, Readiness, Surface};
use crate::entity::{EntityId, EntityMap};
use crate::error::{GenieError, Result};
use crate::layout::CanvasGeometry;
use crate::math::{Rect, Size};
use crate::reveal::{ImageSample, ParticlePhase, ParticleRecord};

/// Structural write recorded by [`MemorySurface`]
///
/// Property writes are not journalled; they are folded into per-node
/// values readable through [`MemorySurface::value`].
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceEvent {
    Markers(PageMarkers),
    RestoreScrolling,
    Canvas { scale_factor: f32, applied_scale: f32 },
    RemoveVectorStages,
    Publish(PageGlobals),
    PlaceWindow(EntityId, Rect),
    WindowZ(EntityId, i32),
    ResetWindow(EntityId),
    Spawn(NodeRef),
    Remove(NodeRef),
    ClearOutlines(Option<EntityId>),
    RemoveTransients,
    Markup { id: EntityId, caret: bool },
    ImageVisible(EntityId, bool),
    MountParticles { id: EntityId, count: usize },
    UnmountParticles(EntityId),
}

#[derive(Clone, Debug, Default)]
struct WindowState {
    present: bool,
    z_index: Option<i32>,
    placed: Option<Rect>,
    markup: Option<String>,
    caret: bool,
    image: Option<ImageSample>,
    image_error: Option<GenieError>,
    /// Checks left before the image reports as decoded
    image_pending: u32,
    image_visible: bool,
    particles: Option<usize>,
    painted_frames: u32,
}

/// Page model for tests and headless runs
#[derive(Clone, Debug)]
pub struct MemorySurface {
    viewport: Size,
    readiness: Readiness,
    windows: EntityMap<WindowState>,
    values: BTreeMap<NodeRef, BTreeMap<Prop, f32>>,
    live: BTreeSet<NodeRef>,
    markers: PageMarkers,
    globals: Option<PageGlobals>,
    canvas: Option<(CanvasGeometry, f32)>,
    vector_stages: bool,
    fail_spawns: bool,
    path: Option<String>,
    events: Vec<SurfaceEvent>,
}

fn test_image() -> ImageSample {
    let (width, height) = (8u32, 8u32);
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[(x * 30) as u8, (y * 30) as u8, 90, 255]);
        }
    }
    ImageSample {
        width,
        height,
        pixels,
        display: Rect::new(0.0, 0.0, 80.0, 80.0),
    }
}

impl MemorySurface {
    /// A complete page: anchors present, every window with its content
    pub fn new(viewport: Size) -> Self {
        let mut surface = Self::empty(viewport);
        surface.readiness = Readiness {
            layout_container: true,
            icon_count: 4,
            drawing_surface: true,
        };
        for id in EntityId::ALL {
            surface.windows[id].present = true;
        }
        surface.windows[EntityId::Hello].image = Some(test_image());
        surface.windows[EntityId::About].markup = Some("<p>I make <b>things</b>.</p>".to_string());
        surface.windows[EntityId::Contact].markup = Some("<p>mail<br>me</p>".to_string());
        surface
    }

    /// A page with none of the stage structure
    pub fn empty(viewport: Size) -> Self {
        Self {
            viewport,
            readiness: Readiness::default(),
            windows: EntityMap::default(),
            values: BTreeMap::new(),
            live: BTreeSet::new(),
            markers: PageMarkers::default(),
            globals: None,
            canvas: None,
            vector_stages: true,
            fail_spawns: false,
            path: None,
            events: Vec::new(),
        }
    }

    // Setup

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Pretend the router has moved to `path`
    pub fn set_path(&mut self, path: &str) {
        self.path = Some(path.to_string());
    }

    pub fn set_readiness(&mut self, readiness: Readiness) {
        self.readiness = readiness;
    }

    /// Add or remove a window container
    pub fn set_window_present(&mut self, id: EntityId, present: bool) {
        self.windows[id].present = present;
    }

    pub fn set_base_z_index(&mut self, id: EntityId, z_index: Option<i32>) {
        self.windows[id].z_index = z_index;
    }

    pub fn set_markup(&mut self, id: EntityId, markup: &str) {
        self.windows[id].markup = Some(markup.to_string());
    }

    pub fn set_image(&mut self, id: EntityId, sample: ImageSample) {
        self.windows[id].image = Some(sample);
        self.windows[id].image_error = None;
    }

    /// Make every image sample fail with `error`
    pub fn set_image_error(&mut self, id: EntityId, error: GenieError) {
        self.windows[id].image_error = Some(error);
    }

    /// Report the image as still decoding for the next `checks` samples
    pub fn set_image_pending(&mut self, id: EntityId, checks: u32) {
        self.windows[id].image_pending = checks;
    }

    /// Make every transient spawn fail
    pub fn set_fail_spawns(&mut self, fail: bool) {
        self.fail_spawns = fail;
    }

    // Inspection

    /// Journal of structural writes
    pub fn events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    /// Drain the journal
    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Last value written to a node property
    pub fn value(&self, node: NodeRef, prop: Prop) -> Option<f32> {
        self.values.get(&node).and_then(|v| v.get(&prop)).copied()
    }

    /// Check if a transient node currently exists
    pub fn is_live(&self, node: NodeRef) -> bool {
        self.live.contains(&node)
    }

    /// Transient nodes currently on the page
    pub fn live_nodes(&self) -> impl Iterator<Item = &NodeRef> {
        self.live.iter()
    }

    pub fn markup(&self, id: EntityId) -> Option<&str> {
        self.windows[id].markup.as_deref()
    }

    /// Check if the typing caret is showing in a window
    pub fn caret(&self, id: EntityId) -> bool {
        self.windows[id].caret
    }

    pub fn image_visible(&self, id: EntityId) -> bool {
        self.windows[id].image_visible
    }

    /// Number of mounted particles, `None` when no layer exists
    pub fn particles(&self, id: EntityId) -> Option<usize> {
        self.windows[id].particles
    }

    pub fn painted_frames(&self, id: EntityId) -> u32 {
        self.windows[id].painted_frames
    }

    pub fn window_rect(&self, id: EntityId) -> Option<Rect> {
        self.windows[id].placed
    }

    pub fn markers(&self) -> PageMarkers {
        self.markers
    }

    pub fn globals(&self) -> Option<&PageGlobals> {
        self.globals.as_ref()
    }

    pub fn canvas(&self) -> Option<&(CanvasGeometry, f32)> {
        self.canvas.as_ref()
    }

    /// Check if the vector stages are still attached
    pub fn has_vector_stages(&self) -> bool {
        self.vector_stages
    }

    fn clear_node(&mut self, node: NodeRef) {
        self.live.remove(&node);
        self.values.remove(&node);
    }
}

impl Surface for MemorySurface {
    fn viewport(&self) -> Size {
        self.viewport
    }

    fn readiness(&self) -> Readiness {
        self.readiness
    }

    fn current_path(&self) -> Option<String> {
        self.path.clone()
    }

    fn has_window(&self, id: EntityId) -> bool {
        self.windows[id].present
    }

    fn window_z_index(&self, id: EntityId) -> Option<i32> {
        self.windows[id].z_index
    }

    fn window_screen_rect(&self, id: EntityId) -> Option<Rect> {
        let window = &self.windows[id];
        if !window.present {
            return None;
        }
        let scale = self.canvas.as_ref().map_or(1.0, |(_, s)| *s);
        window
            .placed
            .map(|r| Rect::new(r.x * scale, r.y * scale, r.width * scale, r.height * scale))
    }

    fn read_markup(&self, id: EntityId) -> Option<String> {
        let window = &self.windows[id];
        if window.present {
            window.markup.clone()
        } else {
            None
        }
    }

    fn sample_image(&mut self, id: EntityId) -> Result<ImageSample> {
        let window = &mut self.windows[id];
        if !window.present {
            return Err(GenieError::missing(id.selector()));
        }
        if let Some(e) = &window.image_error {
            return Err(e.clone());
        }
        if window.image_pending > 0 {
            window.image_pending -= 1;
            return Err(GenieError::ImagePending);
        }
        window
            .image
            .clone()
            .ok_or_else(|| GenieError::missing(format!("{} img", id.selector())))
    }

    fn set_page_markers(&mut self, markers: PageMarkers) {
        self.markers = markers;
        self.events.push(SurfaceEvent::Markers(markers));
    }

    fn restore_scrolling(&mut self) {
        self.events.push(SurfaceEvent::RestoreScrolling);
    }

    fn apply_canvas(&mut self, geometry: &CanvasGeometry, applied_scale: f32) {
        self.canvas = Some((*geometry, applied_scale));
        self.events.push(SurfaceEvent::Canvas {
            scale_factor: geometry.scale_factor,
            applied_scale,
        });
    }

    fn remove_vector_stages(&mut self) {
        self.vector_stages = false;
        self.events.push(SurfaceEvent::RemoveVectorStages);
    }

    fn publish(&mut self, globals: &PageGlobals) {
        self.globals = Some(*globals);
        self.events.push(SurfaceEvent::Publish(*globals));
    }

    fn place_window(&mut self, id: EntityId, rect: Rect) {
        if self.windows[id].present {
            self.windows[id].placed = Some(rect);
            self.events.push(SurfaceEvent::PlaceWindow(id, rect));
        }
    }

    fn set_window_z_index(&mut self, id: EntityId, z_index: i32) {
        self.windows[id].z_index = Some(z_index);
        self.events.push(SurfaceEvent::WindowZ(id, z_index));
    }

    fn reset_window(&mut self, id: EntityId) {
        let values = self.values.entry(NodeRef::Window(id)).or_default();
        values.clear();
        values.insert(Prop::Opacity, 0.0);
        self.events.push(SurfaceEvent::ResetWindow(id));
    }

    fn spawn(&mut self, spec: &NodeSpec) -> Result<NodeRef> {
        if self.fail_spawns {
            return Err(GenieError::Backend("spawn refused".to_string()));
        }
        let node = spec.node_ref();
        if let Some(id) = node.entity() {
            if !self.windows[id].present {
                return Err(GenieError::missing(id.selector()));
            }
        }
        self.live.insert(node);
        self.events.push(SurfaceEvent::Spawn(node));
        Ok(node)
    }

    fn apply(&mut self, node: NodeRef, values: &[(Prop, f32)]) {
        if node.is_transient() && !self.live.contains(&node) {
            return;
        }
        let entry = self.values.entry(node).or_default();
        for (prop, value) in values {
            entry.insert(*prop, *value);
        }
    }

    fn remove(&mut self, node: NodeRef) {
        if self.live.contains(&node) {
            self.clear_node(node);
            self.events.push(SurfaceEvent::Remove(node));
        }
    }

    fn clear_outlines(&mut self, entity: Option<EntityId>) {
        let doomed: Vec<NodeRef> = self
            .live
            .iter()
            .filter(|n| matches!(n, NodeRef::Outline { .. }))
            .filter(|n| entity.is_none() || n.entity() == entity)
            .copied()
            .collect();
        for node in doomed {
            self.clear_node(node);
        }
        self.events.push(SurfaceEvent::ClearOutlines(entity));
    }

    fn remove_transients(&mut self) {
        let doomed: Vec<NodeRef> = self.live.iter().copied().collect();
        for node in doomed {
            self.clear_node(node);
        }
        self.events.push(SurfaceEvent::RemoveTransients);
    }

    fn write_markup(&mut self, id: EntityId, markup: &str, caret: bool) {
        let window = &mut self.windows[id];
        window.markup = Some(markup.to_string());
        window.caret = caret;
        self.events.push(SurfaceEvent::Markup { id, caret });
    }

    fn set_image_visible(&mut self, id: EntityId, visible: bool) {
        self.windows[id].image_visible = visible;
        self.events.push(SurfaceEvent::ImageVisible(id, visible));
    }

    fn mount_particles(&mut self, id: EntityId, particles: &[ParticleRecord], _narrow: bool) -> Result<()> {
        if !self.windows[id].present {
            return Err(GenieError::missing(id.selector()));
        }
        self.windows[id].particles = Some(particles.len());
        self.windows[id].painted_frames = 0;
        self.events.push(SurfaceEvent::MountParticles {
            id,
            count: particles.len(),
        });
        Ok(())
    }

    fn paint_particles(&mut self, id: EntityId, _phases: &[ParticlePhase]) {
        if self.windows[id].particles.is_some() {
            self.windows[id].painted_frames += 1;
        }
    }

    fn unmount_particles(&mut self, id: EntityId) {
        if self.windows[id].particles.take().is_some() {
            self.events.push(SurfaceEvent::UnmountParticles(id));
        }
    }
}
