//! Surface: everything the stage reads from and writes to the page
//!
//! The engine never touches the DOM directly. A [`Surface`] answers a few
//! structural queries and accepts property writes for a closed set of
//! nodes. [`MemorySurface`] records everything for tests; the browser
//! backend lives in the `wasm` module.

mod memory;

pub use memory::{MemorySurface, SurfaceEvent};

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::Result;
use crate::layout::CanvasGeometry;
use crate::math::{Rect, Size};
use crate::reveal::{ImageSample, ParticlePhase, ParticleRecord};
use crate::signal::RevealSnapshot;

/// Animatable numeric property of a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Prop {
    /// Left edge (canvas space for outlines, viewport space for the cursor)
    X,
    /// Top edge
    Y,
    Width,
    Height,
    /// Outline title bar height
    TitleHeight,
    /// Vertical translation on top of the laid-out position
    OffsetY,
    ScaleX,
    ScaleY,
    /// Rotation in degrees around the node center
    Rotation,
    Opacity,
    /// Drop shadow strength, 0 (none) to 1 (full offset)
    Shadow,
}

/// Which vector container an outline lives in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutlineLayer {
    Ghost,
    Main,
}

/// Addressable node on the surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRef {
    /// The real window container
    Window(EntityId),
    /// Vector outline copy of a window
    Outline {
        entity: EntityId,
        layer: OutlineLayer,
        index: u16,
    },
    /// Cloned window shell used as a trailing ghost
    Ghost { entity: EntityId, index: u16 },
    /// The guiding cursor
    Cursor,
}

impl NodeRef {
    /// Entity this node belongs to
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            NodeRef::Window(id) => Some(*id),
            NodeRef::Outline { entity, .. } | NodeRef::Ghost { entity, .. } => Some(*entity),
            NodeRef::Cursor => None,
        }
    }

    /// Check if the node is created and destroyed by the stage
    #[inline]
    pub fn is_transient(&self) -> bool {
        !matches!(self, NodeRef::Window(_))
    }
}

/// Creation request for a transient node
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeSpec {
    /// Vector outline in one of the entity's containers
    Outline {
        entity: EntityId,
        layer: OutlineLayer,
        index: u16,
    },
    /// Empty window shell stacked at `z_index`
    Ghost {
        entity: EntityId,
        index: u16,
        z_index: i32,
        rect: Rect,
    },
    /// Cursor graphic of the given width
    Cursor { width: f32 },
}

impl NodeSpec {
    /// Reference the node will be addressed by once spawned
    pub fn node_ref(&self) -> NodeRef {
        match *self {
            NodeSpec::Outline { entity, layer, index } => NodeRef::Outline { entity, layer, index },
            NodeSpec::Ghost { entity, index, .. } => NodeRef::Ghost { entity, index },
            NodeSpec::Cursor { .. } => NodeRef::Cursor,
        }
    }
}

/// Structural anchors the stage waits for before starting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub layout_container: bool,
    pub icon_count: usize,
    pub drawing_surface: bool,
}

impl Readiness {
    /// Minimum number of desktop icons on a complete page
    pub const MIN_ICONS: usize = 3;

    /// Check if every anchor is present
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.layout_container && self.icon_count >= Self::MIN_ICONS && self.drawing_surface
    }

    /// Check if a DOM mutation should re-arm initialisation
    #[inline]
    pub fn can_rearm(&self) -> bool {
        self.layout_container && self.drawing_surface
    }
}

/// Body classes describing the current route
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMarkers {
    /// `is-genie-homepage` when true, `is-not-genie-homepage` otherwise
    pub homepage: bool,
    /// `is-splash-page`
    pub splash: bool,
}

/// Globals the stage publishes for other page scripts
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageGlobals {
    #[serde(flatten)]
    pub reveal: RevealSnapshot,
    #[serde(rename = "USE_SIMPLE_ANIMATION")]
    pub use_simple_animation: bool,
    #[serde(rename = "LAYOUT_SCALE")]
    pub layout_scale: f32,
}

/// Page access used by the stage engine
pub trait Surface {
    // Queries

    /// Viewport size in CSS pixels
    fn viewport(&self) -> Size;

    /// Current state of the structural anchors
    fn readiness(&self) -> Readiness;

    /// Path the page is showing right now, if it can be read
    fn current_path(&self) -> Option<String>;

    /// Check if a window container exists
    fn has_window(&self, id: EntityId) -> bool;

    /// Stacking index from the window's computed style
    fn window_z_index(&self, id: EntityId) -> Option<i32>;

    /// Window bounds in viewport coordinates
    fn window_screen_rect(&self, id: EntityId) -> Option<Rect>;

    /// Markup of the window's text target
    fn read_markup(&self, id: EntityId) -> Option<String>;

    /// Pixels and display geometry of the window's image
    ///
    /// Fails with `ImagePending` while the image is still decoding and with
    /// `RenderingRestricted` when the pixels cannot be read.
    fn sample_image(&mut self, id: EntityId) -> Result<ImageSample>;

    // Page-level writes

    /// Set the route body classes
    fn set_page_markers(&mut self, markers: PageMarkers);

    /// Give scrolling back to the page after leaving the stage
    fn restore_scrolling(&mut self);

    /// Size the vector stages and apply the scaler transform
    fn apply_canvas(&mut self, geometry: &CanvasGeometry, applied_scale: f32);

    /// Remove the vector stages on devices that cannot animate them
    fn remove_vector_stages(&mut self);

    /// Publish the page globals
    fn publish(&mut self, globals: &PageGlobals);

    // Node writes

    /// Lay out a window container at a canvas rectangle
    fn place_window(&mut self, id: EntityId, rect: Rect);

    /// Set a window container's stacking index
    fn set_window_z_index(&mut self, id: EntityId, z_index: i32);

    /// Restore a window to its hidden, untransformed state
    fn reset_window(&mut self, id: EntityId);

    /// Create a transient node
    fn spawn(&mut self, spec: &NodeSpec) -> Result<NodeRef>;

    /// Write property values to a node
    fn apply(&mut self, node: NodeRef, values: &[(Prop, f32)]);

    /// Destroy a transient node; unknown nodes are ignored
    fn remove(&mut self, node: NodeRef);

    /// Empty both vector containers of an entity, or of all entities
    fn clear_outlines(&mut self, entity: Option<EntityId>);

    /// Destroy every transient node (cursor, ghosts, outlines)
    fn remove_transients(&mut self);

    /// Replace the window's text target markup, with or without a caret
    fn write_markup(&mut self, id: EntityId, markup: &str, caret: bool);

    /// Show or hide the window's image
    fn set_image_visible(&mut self, id: EntityId, visible: bool);

    /// Create the particle layer over the window's image
    fn mount_particles(&mut self, id: EntityId, particles: &[ParticleRecord], narrow: bool) -> Result<()>;

    /// Paint one frame of particle phases, index-aligned with the mounted records
    fn paint_particles(&mut self, id: EntityId, phases: &[ParticlePhase]);

    /// Remove the particle layer
    fn unmount_particles(&mut self, id: EntityId);
}
