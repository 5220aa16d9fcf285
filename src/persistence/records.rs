//! Serialisierbare Datensätze der Szene-Objekte.
//!
//! Meshes, Bounding-Boxes und abgeleitete Kurven werden nicht gespeichert;
//! sie entstehen beim Laden neu. Strassentypen stehen nur als Katalog-Name drin.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::{
    Aabb, Branch, ConnectionSlot, EndpointLink, ObjectId, RampSide, RoundaboutDesign, SlotRef,
    Spline,
};

/// Aktuelle Format-Version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedRoad {
    pub id: ObjectId,
    pub road_type: String,
    #[serde(default)]
    pub elevated: bool,
    pub spline: Spline,
    pub width: f32,
    #[serde(default)]
    pub ramp_road: bool,
    #[serde(default)]
    pub start: EndpointLink,
    #[serde(default)]
    pub end: EndpointLink,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_original_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_original_spline: Option<Spline>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedIntersection {
    pub id: ObjectId,
    pub road_type: String,
    #[serde(default)]
    pub elevated: bool,
    pub center: Vec3,
    pub branches: Vec<Branch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap: Option<SlotRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedRoundabout {
    pub id: ObjectId,
    pub road_type: String,
    #[serde(default)]
    pub elevated: bool,
    pub center: Vec3,
    pub radius: f32,
    #[serde(default)]
    pub design: RoundaboutDesign,
    pub branches: Vec<Branch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedRamp {
    pub id: ObjectId,
    pub road_type: String,
    #[serde(default)]
    pub elevated: bool,
    pub center: Vec3,
    pub branches: Vec<Branch>,
    pub ramp_side: RampSide,
    pub gap_spline: Spline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedCustom {
    pub id: ObjectId,
    pub road_type: String,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    pub slots: Vec<ConnectionSlot>,
}

impl SerializedCustom {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.bounds_min, self.bounds_max)
    }
}

/// Ein Objekt-Datensatz, per `type`-Feld unterschieden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SerializedObject {
    Road(SerializedRoad),
    Intersection(SerializedIntersection),
    Roundabout(SerializedRoundabout),
    Ramp(SerializedRamp),
    Custom(SerializedCustom),
}

impl SerializedObject {
    pub fn id(&self) -> ObjectId {
        match self {
            SerializedObject::Road(r) => r.id,
            SerializedObject::Intersection(r) => r.id,
            SerializedObject::Roundabout(r) => r.id,
            SerializedObject::Ramp(r) => r.id,
            SerializedObject::Custom(r) => r.id,
        }
    }

    pub fn road_type(&self) -> &str {
        match self {
            SerializedObject::Road(r) => &r.road_type,
            SerializedObject::Intersection(r) => &r.road_type,
            SerializedObject::Roundabout(r) => &r.road_type,
            SerializedObject::Ramp(r) => &r.road_type,
            SerializedObject::Custom(r) => &r.road_type,
        }
    }
}

/// Gespeicherter Stand eines ganzen Netzes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedRoadSystem {
    pub version: u32,
    pub next_id: u64,
    pub objects: Vec<SerializedObject>,
}
