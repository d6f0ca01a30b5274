//! The five stage entities and their per-layout registry

use serde::{Deserialize, Serialize};

use crate::layout::{self, LayoutClass, Position, WindowSpec};

/// Identifier of a stage window
///
/// The set is closed: the homepage markup carries exactly these five
/// containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityId {
    Hello,
    About,
    Contact,
    Decor1,
    Decor2,
}

/// What a window reveals once it has landed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    /// Raster image revealed by the pixel dissolve
    Image,
    /// Rich text revealed by the typewriter
    Text,
    /// Nothing to reveal
    Decorative,
}

impl ContentKind {
    /// Check if there is content to reveal
    #[inline]
    pub fn has_reveal(self) -> bool {
        !matches!(self, ContentKind::Decorative)
    }
}

impl EntityId {
    /// All entities in registry order
    pub const ALL: [EntityId; 5] = [
        EntityId::Hello,
        EntityId::About,
        EntityId::Contact,
        EntityId::Decor1,
        EntityId::Decor2,
    ];

    /// Entities whose content is revealed, in visiting order
    pub const REVEAL_ORDER: [EntityId; 3] = [EntityId::Hello, EntityId::About, EntityId::Contact];

    /// Dense index for table storage
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            EntityId::Hello => 0,
            EntityId::About => 1,
            EntityId::Contact => 2,
            EntityId::Decor1 => 3,
            EntityId::Decor2 => 4,
        }
    }

    /// Short name used in logs and config keys
    pub fn name(self) -> &'static str {
        match self {
            EntityId::Hello => "hello",
            EntityId::About => "about",
            EntityId::Contact => "contact",
            EntityId::Decor1 => "decor1",
            EntityId::Decor2 => "decor2",
        }
    }

    /// DOM id of the window container
    pub fn dom_id(self) -> &'static str {
        match self {
            EntityId::Hello => "hello-win",
            EntityId::About => "about-win",
            EntityId::Contact => "contact-win",
            EntityId::Decor1 => "decor-win-1",
            EntityId::Decor2 => "decor-win-2",
        }
    }

    /// CSS selector of the window container
    pub fn selector(self) -> &'static str {
        match self {
            EntityId::Hello => "#hello-win",
            EntityId::About => "#about-win",
            EntityId::Contact => "#contact-win",
            EntityId::Decor1 => "#decor-win-1",
            EntityId::Decor2 => "#decor-win-2",
        }
    }

    /// Look up an entity by its DOM id
    pub fn from_dom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.dom_id() == id)
    }

    /// Content kind of the window body
    pub fn kind(self) -> ContentKind {
        match self {
            EntityId::Hello => ContentKind::Image,
            EntityId::About | EntityId::Contact => ContentKind::Text,
            EntityId::Decor1 | EntityId::Decor2 => ContentKind::Decorative,
        }
    }

    /// Check if this is a decorative window
    #[inline]
    pub fn is_decorative(self) -> bool {
        self.kind() == ContentKind::Decorative
    }

    /// Horizontal offset of the launch point from the canvas midline
    pub fn launch_offset_x(self) -> f32 {
        match self {
            EntityId::Hello => 0.0,
            EntityId::About => 80.0,
            EntityId::Contact => -80.0,
            EntityId::Decor1 => -120.0,
            EntityId::Decor2 => 120.0,
        }
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-size table keyed by [`EntityId`]
#[derive(Clone, Debug, PartialEq)]
pub struct EntityMap<T>([T; 5]);

impl<T> EntityMap<T> {
    /// Build a table by evaluating `f` for every entity
    pub fn from_fn(f: impl FnMut(EntityId) -> T) -> Self {
        Self(EntityId::ALL.map(f))
    }

    /// Borrow the entry for an entity
    #[inline]
    pub fn get(&self, id: EntityId) -> &T {
        &self.0[id.index()]
    }

    /// Mutably borrow the entry for an entity
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> &mut T {
        &mut self.0[id.index()]
    }

    /// Iterate entries in registry order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        EntityId::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Default> Default for EntityMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> std::ops::Index<EntityId> for EntityMap<T> {
    type Output = T;
    fn index(&self, id: EntityId) -> &T {
        self.get(id)
    }
}

impl<T> std::ops::IndexMut<EntityId> for EntityMap<T> {
    fn index_mut(&mut self, id: EntityId) -> &mut T {
        self.get_mut(id)
    }
}

/// Window specs and final positions for the current layout class
///
/// Recomputed only when the layout class flips; a resize inside one class
/// keeps the same table.
#[derive(Clone, Debug)]
pub struct EntityRegistry {
    class: LayoutClass,
    specs: EntityMap<WindowSpec>,
    positions: EntityMap<Position>,
}

impl EntityRegistry {
    /// Create a registry for a layout class
    pub fn new(class: LayoutClass) -> Self {
        Self {
            class,
            specs: layout::compute_specs(class),
            positions: EntityMap::from_fn(|id| layout::compute_final_position(id, class)),
        }
    }

    /// Current layout class
    #[inline]
    pub fn class(&self) -> LayoutClass {
        self.class
    }

    /// Spec of one window
    #[inline]
    pub fn spec(&self, id: EntityId) -> &WindowSpec {
        &self.specs[id]
    }

    /// Resting position of one window
    #[inline]
    pub fn final_position(&self, id: EntityId) -> Position {
        self.positions[id]
    }

    /// Launch point of one window
    #[inline]
    pub fn start_position(&self, id: EntityId) -> Position {
        layout::start_position(id, self.class)
    }

    /// Switch to a new layout class, returning true if anything changed
    pub fn refresh(&mut self, class: LayoutClass) -> bool {
        if class == self.class {
            return false;
        }
        *self = Self::new(class);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_dom_ids_round_trip() {
        for id in EntityId::ALL {
            assert_eq!(EntityId::from_dom_id(id.dom_id()), Some(id));
            assert_eq!(id.selector(), format!("#{}", id.dom_id()));
        }
        assert_eq!(EntityId::from_dom_id("nope-win"), None);
    }

    #[test]
    fn test_entity_kinds() {
        assert_eq!(EntityId::Hello.kind(), ContentKind::Image);
        assert_eq!(EntityId::About.kind(), ContentKind::Text);
        assert!(EntityId::Decor2.is_decorative());
        assert!(!ContentKind::Decorative.has_reveal());
    }

    #[test]
    fn test_entity_map_indexing() {
        let mut map: EntityMap<u32> = EntityMap::default();
        map[EntityId::Contact] = 7;
        assert_eq!(*map.get(EntityId::Contact), 7);
        assert_eq!(map.iter().filter(|(_, v)| **v == 7).count(), 1);
    }

    #[test]
    fn test_registry_refresh_only_on_class_change() {
        let mut registry = EntityRegistry::new(LayoutClass::Desktop);
        assert!(!registry.refresh(LayoutClass::Desktop));
        assert!(registry.refresh(LayoutClass::MobilePortrait));
        assert_eq!(registry.class(), LayoutClass::MobilePortrait);
        assert!((registry.spec(EntityId::Hello).width - 370.0).abs() < 0.001);
    }
}
