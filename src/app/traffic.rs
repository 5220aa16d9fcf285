//! Übergabe des fertigen Netzes an die Wegpunkt-Erzeugung.
//!
//! Nach jedem Commit und Undo entsteht ein [`FinalizedNetwork`]: pro Strasse
//! die Fahrspur-Mittellinien in Fahrtrichtung, pro Knoten die verbundenen
//! Strassen. Was der Host daraus macht (Verkehr, Navigation), liegt ausserhalb.

use glam::Vec3;

use super::creators::lanes::lane_offsets;
use crate::core::{LaneKind, ObjectId, RoadSystem, SceneObject};

/// Abstand der Wegpunkte entlang einer Spur (Meter).
const WAYPOINT_SPACING: f32 = 5.0;

/// Eine befahrbare Spur als Wegpunkt-Folge in Fahrtrichtung.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointLane {
    pub points: Vec<Vec3>,
    /// Spur läuft in Kurvenrichtung (sonst entgegen)
    pub forward: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedRoad {
    pub id: ObjectId,
    pub lanes: Vec<WaypointLane>,
    /// Knoten oder externe Objekte an Start und Ende
    pub start: Option<ObjectId>,
    pub end: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedNode {
    pub id: ObjectId,
    pub center: Vec3,
    pub roads: Vec<ObjectId>,
}

/// Fertiges, konsistentes Netz nach einem Commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalizedNetwork {
    pub roads: Vec<FinalizedRoad>,
    pub nodes: Vec<FinalizedNode>,
}

fn road_lanes(object: &SceneObject) -> Vec<WaypointLane> {
    let Some(data) = object.as_road() else {
        return Vec::new();
    };
    let samples = ((data.length / WAYPOINT_SPACING).ceil() as usize).max(1);
    let frames = data.spline.sample_frames(samples);
    let descriptor = &object.road;

    descriptor
        .lanes
        .iter()
        .zip(lane_offsets(&descriptor.lanes))
        .filter(|(lane, _)| lane.kind == LaneKind::Drive)
        .map(|(_, (left, right))| {
            let offset = (left + right) * 0.5;
            // Rechtsverkehr: Spuren links der Mitte fahren entgegen
            let forward = descriptor.one_way || offset >= 0.0;
            let mut points: Vec<Vec3> = frames.iter().map(|f| f.position + f.right * offset).collect();
            if !forward {
                points.reverse();
            }
            WaypointLane { points, forward }
        })
        .collect()
}

impl FinalizedNetwork {
    pub fn from_system(system: &RoadSystem) -> Self {
        let roads = system
            .roads()
            .filter_map(|object| {
                let data = object.as_road()?;
                Some(FinalizedRoad {
                    id: object.id,
                    lanes: road_lanes(object),
                    start: data.start.target(),
                    end: data.end.target(),
                })
            })
            .collect();
        let nodes = system
            .nodes()
            .filter_map(|object| {
                Some(FinalizedNode {
                    id: object.id,
                    center: object.center()?,
                    roads: object.branches().iter().map(|b| b.road).collect(),
                })
            })
            .collect();
        Self { roads, nodes }
    }

    pub fn lane_count(&self) -> usize {
        self.roads.iter().map(|r| r.lanes.len()).sum()
    }
}

/// Wegpunkt-Erzeugung des Hosts.
pub trait WaypointGenerator: Send {
    fn rebuild(&mut self, network: &FinalizedNetwork);
}
