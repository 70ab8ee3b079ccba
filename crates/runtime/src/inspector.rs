use std::fmt;
use std::time::Duration;

use geoworld_common::{EntityKey, WorldPoint};
use geoworld_kernel::ResourceStats;

/// Summary of runtime state for tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSummary {
    pub frame: u64,
    pub running: bool,
    pub players: usize,
    pub npcs: usize,
    pub selected: Option<EntityKey>,
    pub active_tiles: usize,
    pub pending_tiles: usize,
    pub properties: usize,
    pub jobs: usize,
    pub resources: ResourceStats,
    pub average_frame: Duration,
}

impl fmt::Display for RuntimeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Runtime: frame={} running={} players={} npcs={} selected={} tiles={} (+{} pending) properties={} jobs={} resources=[{}] avg_frame={:.2}ms",
            self.frame,
            self.running,
            self.players,
            self.npcs,
            self.selected.as_ref().map_or("-", |k| k.as_str()),
            self.active_tiles,
            self.pending_tiles,
            self.properties,
            self.jobs,
            self.resources,
            self.average_frame.as_secs_f64() * 1000.0,
        )
    }
}

/// One entity as seen by the inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub key: EntityKey,
    pub display_name: String,
    pub position: WorldPoint,
    pub target: WorldPoint,
    pub heading: f32,
    pub moving: bool,
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Entity [{}] '{}' pos=({:.2}, {:.2}) target=({:.2}, {:.2}) heading={:.2}{}",
            self.key,
            self.display_name,
            self.position.x,
            self.position.z,
            self.target.x,
            self.target.z,
            self.heading,
            if self.moving { " moving" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_display() {
        let summary = RuntimeSummary {
            frame: 3,
            running: true,
            players: 1,
            npcs: 2,
            selected: Some(EntityKey::from("p1")),
            active_tiles: 9,
            pending_tiles: 0,
            properties: 4,
            jobs: 0,
            resources: ResourceStats::default(),
            average_frame: Duration::from_micros(16_670),
        };
        let text = summary.to_string();
        assert!(text.starts_with("Runtime: frame=3 running=true players=1 npcs=2 selected=p1 tiles=9"));
        assert!(text.ends_with("avg_frame=16.67ms"));
    }

    #[test]
    fn entity_info_display() {
        let info = EntityInfo {
            key: EntityKey::from("n1"),
            display_name: "Vendor".into(),
            position: WorldPoint::new(1.0, 2.0),
            target: WorldPoint::new(1.0, 2.0),
            heading: 0.0,
            moving: false,
        };
        assert_eq!(
            info.to_string(),
            "Entity [n1] 'Vendor' pos=(1.00, 2.00) target=(1.00, 2.00) heading=0.00"
        );
    }
}
