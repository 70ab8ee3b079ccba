use std::fmt;

use geoworld_common::{EntityKey, WorldPoint};
use geoworld_property::Property;

pub type EntityMovedFn = Box<dyn FnMut(&EntityKey, WorldPoint) + Send>;
pub type PropertyClickedFn = Box<dyn FnMut(&Property) + Send>;
pub type PlacementFn = Box<dyn FnMut(WorldPoint) + Send>;
pub type EntitySelectedFn = Box<dyn FnMut(&EntityKey) + Send>;

/// Host listeners. At most one per event; registering again replaces the previous one.
#[derive(Default)]
pub struct Callbacks {
    entity_moved: Option<EntityMovedFn>,
    property_clicked: Option<PropertyClickedFn>,
    placement_confirmed: Option<PlacementFn>,
    entity_selected: Option<EntitySelectedFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_entity_moved(&mut self, f: impl FnMut(&EntityKey, WorldPoint) + Send + 'static) {
        self.entity_moved = Some(Box::new(f));
    }

    pub fn on_property_clicked(&mut self, f: impl FnMut(&Property) + Send + 'static) {
        self.property_clicked = Some(Box::new(f));
    }

    pub fn on_placement_confirmed(&mut self, f: impl FnMut(WorldPoint) + Send + 'static) {
        self.placement_confirmed = Some(Box::new(f));
    }

    pub fn on_entity_selected(&mut self, f: impl FnMut(&EntityKey) + Send + 'static) {
        self.entity_selected = Some(Box::new(f));
    }

    pub(crate) fn entity_moved(&mut self, key: &EntityKey, position: WorldPoint) {
        if let Some(f) = self.entity_moved.as_mut() {
            f(key, position);
        }
    }

    pub(crate) fn property_clicked(&mut self, property: &Property) {
        if let Some(f) = self.property_clicked.as_mut() {
            f(property);
        }
    }

    pub(crate) fn placement_confirmed(&mut self, position: WorldPoint) {
        if let Some(f) = self.placement_confirmed.as_mut() {
            f(position);
        }
    }

    pub(crate) fn entity_selected(&mut self, key: &EntityKey) {
        if let Some(f) = self.entity_selected.as_mut() {
            f(key);
        }
    }

    pub fn attached(&self) -> usize {
        [
            self.entity_moved.is_some(),
            self.property_clicked.is_some(),
            self.placement_confirmed.is_some(),
            self.entity_selected.is_some(),
        ]
        .into_iter()
        .filter(|a| *a)
        .count()
    }

    /// Drop every listener. Returns how many were attached.
    pub fn detach_all(&mut self) -> usize {
        let count = self.attached();
        *self = Self::default();
        count
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("entity_moved", &self.entity_moved.is_some())
            .field("property_clicked", &self.property_clicked.is_some())
            .field("placement_confirmed", &self.placement_confirmed.is_some())
            .field("entity_selected", &self.entity_selected.is_some())
            .finish()
    }
}
