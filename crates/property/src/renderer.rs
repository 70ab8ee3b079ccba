use std::collections::BTreeMap;

use geoworld_common::{CoordinateMapper, PropertyId, Transform, WorldPoint};
use geoworld_kernel::{NodeHandle, Scene};
use serde::{Deserialize, Serialize};

use crate::building::{self, BuildingNodes};
use crate::marker;
use crate::record::{Property, PropertyLocation};

/// Extent of the legacy normalized grid, in world units and source spans.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyRendererConfig {
    pub world_width: f32,
    pub world_height: f32,
    pub grid_span_x: f64,
    pub grid_span_y: f64,
}

impl Default for PropertyRendererConfig {
    fn default() -> Self {
        Self {
            world_width: 6000.0,
            world_height: 6000.0,
            grid_span_x: 300.0,
            grid_span_y: 350.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub rendered: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
struct Rendered {
    property: Property,
    position: WorldPoint,
    marker: NodeHandle,
    building: BuildingNodes,
}

/// Owns one marker and one building per rendered property, all under a single group.
#[derive(Debug)]
pub struct PropertyRenderer {
    config: PropertyRendererConfig,
    mapper: CoordinateMapper,
    root: Option<NodeHandle>,
    entries: BTreeMap<PropertyId, Rendered>,
}

impl PropertyRenderer {
    pub fn new(config: PropertyRendererConfig, mapper: CoordinateMapper) -> Self {
        Self {
            config,
            mapper,
            root: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &PropertyRendererConfig {
        &self.config
    }

    /// World position of a record, or `None` when it has no usable location.
    pub fn world_position(&self, property: &Property) -> Option<WorldPoint> {
        match property.location? {
            PropertyLocation::Geo(geo) => Some(self.mapper.to_world(geo)),
            PropertyLocation::Grid { x, y } => {
                let w = self.config.world_width;
                let h = self.config.world_height;
                let wx = (x / self.config.grid_span_x) as f32 * w * 0.5 - w * 0.5;
                let wz = (y / self.config.grid_span_y) as f32 * h * 0.5 - h * 0.5;
                (wx.is_finite() && wz.is_finite()).then(|| WorldPoint::new(wx, wz))
            }
        }
    }

    /// Replace everything previously rendered with `properties`.
    /// Duplicate ids keep the last record.
    pub fn render(&mut self, scene: &mut Scene, properties: &[Property]) -> RenderReport {
        self.clear(scene);
        let root = scene.add_group(None, "properties", Transform::default());
        self.root = Some(root);

        let mut report = RenderReport::default();
        for property in properties {
            let Some(position) = self.world_position(property) else {
                tracing::debug!(id = %property.id, "property has no location, skipping");
                report.skipped += 1;
                continue;
            };
            if let Some(old) = self.entries.remove(&property.id) {
                scene.remove_subtree(old.marker);
                scene.remove_subtree(old.building.root);
                report.rendered -= 1;
            }
            let marker = marker::build(scene, Some(root), property, position);
            let building = building::build(
                scene,
                Some(root),
                &property.id,
                property.property_type,
                property.current_value,
                position,
            );
            if property.is_owned() {
                building::mark_owned(scene, building.body);
            }
            self.entries.insert(
                property.id.clone(),
                Rendered {
                    property: property.clone(),
                    position,
                    marker,
                    building,
                },
            );
            report.rendered += 1;
        }
        tracing::info!(rendered = report.rendered, skipped = report.skipped, "rendered properties");
        report
    }

    /// Dispose every marker and building.
    pub fn clear(&mut self, scene: &mut Scene) {
        self.entries.clear();
        if let Some(root) = self.root.take() {
            scene.remove_subtree(root);
        }
    }

    /// Recolour a rendered building as owned. Returns false for unknown ids.
    pub fn set_owned(&mut self, scene: &mut Scene, id: &PropertyId) -> bool {
        let Some(entry) = self.entries.get(id) else {
            return false;
        };
        building::mark_owned(scene, entry.building.body)
    }

    pub fn property(&self, id: &PropertyId) -> Option<&Property> {
        self.entries.get(id).map(|e| &e.property)
    }

    pub fn position(&self, id: &PropertyId) -> Option<WorldPoint> {
        self.entries.get(id).map(|e| e.position)
    }

    pub fn marker(&self, id: &PropertyId) -> Option<NodeHandle> {
        self.entries.get(id).map(|e| e.marker)
    }

    pub fn ids(&self) -> impl Iterator<Item = &PropertyId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
