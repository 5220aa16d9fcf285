//! Szene-Objekte des Strassennetzes: Strassen, Kreuzungen, Kreisverkehre,
//! Rampen und extern integrierte Objekte.
//!
//! Die Variante eines Objekts ist ein Summentyp (`ObjectKind`), der an
//! jeder Stelle vollständig per `match` behandelt wird. Die Verbindungen eines
//! Objekts werden aus seinen Daten abgeleitet und nie separat gespeichert.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{Aabb, LodMesh, RoadDescriptor, Spline};

/// Eindeutige Objekt-Id innerhalb eines `RoadSystem`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Referenz auf einen Anschluss-Slot eines externen Objekts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub target: ObjectId,
    pub slot: usize,
}

/// Zustand eines Strassen-Endes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "link", rename_all = "snake_case")]
pub enum EndpointLink {
    /// Offenes Ende ohne Knoten
    #[default]
    Free,
    /// Endet an einer Kreuzung, einem Kreisverkehr oder einer Rampe
    Node { id: ObjectId },
    /// Eingerastet an einem Slot eines externen Objekts
    Snapped { target: ObjectId, slot: usize },
}

impl EndpointLink {
    /// Verbundenes Objekt, falls vorhanden.
    pub fn target(&self) -> Option<ObjectId> {
        match self {
            EndpointLink::Free => None,
            EndpointLink::Node { id } => Some(*id),
            EndpointLink::Snapped { target, .. } => Some(*target),
        }
    }

    pub fn node(&self) -> Option<ObjectId> {
        match self {
            EndpointLink::Node { id } => Some(*id),
            _ => None,
        }
    }
}

/// Ein Ast eines Knotens: Strasse plus Index des Knotens am Zentrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Branch {
    pub road: ObjectId,
    pub knot_index: usize,
}

impl Branch {
    pub fn new(road: ObjectId, knot_index: usize) -> Self {
        Self { road, knot_index }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadData {
    /// Mittellinie (mindestens zwei Knoten)
    pub spline: Spline,
    pub width: f32,
    pub length: f32,
    /// Zweig einer Rampe
    pub ramp_road: bool,
    pub start: EndpointLink,
    pub end: EndpointLink,
    /// Wurzel-Strasse, aus der diese Strasse durch Teilung entstanden ist
    pub split_original_id: Option<ObjectId>,
    /// Mittellinie der Wurzel-Strasse vor der ersten Teilung
    pub split_original_spline: Option<Spline>,
}

impl RoadData {
    pub fn new(spline: Spline, width: f32) -> Self {
        let length = spline.length();
        Self {
            spline,
            width,
            length,
            ramp_road: false,
            start: EndpointLink::Free,
            end: EndpointLink::Free,
            split_original_id: None,
            split_original_spline: None,
        }
    }

    /// Verbindungs-Zustand am Knoten `knot_index` (Start oder Ende).
    pub fn link_at(&self, knot_index: usize) -> EndpointLink {
        if knot_index == 0 {
            self.start
        } else {
            self.end
        }
    }

    pub fn set_link_at(&mut self, knot_index: usize, link: EndpointLink) {
        if knot_index == 0 {
            self.start = link;
        } else {
            self.end = link;
        }
    }

    /// Ersetzt die Mittellinie und aktualisiert die Länge.
    pub fn set_spline(&mut self, spline: Spline) {
        self.length = spline.length();
        self.spline = spline;
    }

    /// Index des Endknotens (0 oder letzter Knoten) für ein Ende.
    pub fn end_index(&self, at_start: bool) -> usize {
        if at_start {
            0
        } else {
            self.spline.last_index()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionData {
    pub center: Vec3,
    pub branches: Vec<Branch>,
    /// Eine kurze Verbindungskurve pro Ast, vom Zentrum zum Ast-Knoten
    pub connector_splines: Vec<Spline>,
    /// Belegter Slot eines externen Objekts
    pub snap: Option<SlotRef>,
}

impl IntersectionData {
    pub fn new(center: Vec3, branches: Vec<Branch>) -> Self {
        Self {
            center,
            branches,
            connector_splines: Vec::new(),
            snap: None,
        }
    }

    /// Ein einziger Ast: Abschluss eines Strassen-Endes.
    pub fn is_end_cap(&self) -> bool {
        self.branches.len() == 1
    }
}

/// Gestaltung eines Kreisverkehrs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundaboutDesign {
    /// Ring mit Mittelinsel
    #[default]
    Default,
    /// Wendeplatte ohne Insel
    CulDeSac,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundaboutData {
    pub center: Vec3,
    pub radius: f32,
    pub design: RoundaboutDesign,
    pub branches: Vec<Branch>,
    /// Geschlossene Ring-Kurve (Fahrbahnmitte)
    pub ring: Spline,
}

/// Seite, auf der eine Rampe die durchgehende Strasse verlässt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RampData {
    pub center: Vec3,
    /// `[Zulauf, Ablauf, Rampe]` der durchgehenden Strasse
    pub branches: Vec<Branch>,
    pub ramp_side: RampSide,
    /// Überbrückung der Lücke in der durchgehenden Strasse
    pub gap_spline: Spline,
}

/// Anschluss-Slot eines extern integrierten Objekts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSlot {
    pub position: Vec3,
    /// Richtung, in der eine angeschlossene Strasse das Objekt verlässt
    pub direction: Vec3,
    #[serde(default)]
    pub occupant: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomData {
    pub slots: Vec<ConnectionSlot>,
}

impl CustomData {
    /// Index und Slot aller freien Anschlüsse.
    pub fn free_slots(&self) -> impl Iterator<Item = (usize, &ConnectionSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.occupant.is_none())
    }
}

/// Variante eines Szene-Objekts.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Road(RoadData),
    Intersection(IntersectionData),
    Roundabout(RoundaboutData),
    Ramp(RampData),
    Custom(CustomData),
}

/// Art eines Knotens (für Overlap-Ergebnisse und Logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Intersection,
    EndCap,
    Roundabout,
    Ramp,
}

/// Ein Objekt der Szene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    /// Strassentyp, der das Querprofil bestimmt
    pub road: Arc<RoadDescriptor>,
    pub elevated: bool,
    pub bounds: Aabb,
    pub kind: ObjectKind,
    /// Detailstufen (LOD 0 = volle Auflösung)
    pub lods: Vec<LodMesh>,
}

impl SceneObject {
    pub fn new(id: ObjectId, road: Arc<RoadDescriptor>, elevated: bool, kind: ObjectKind) -> Self {
        Self {
            id,
            road,
            elevated,
            bounds: Aabb::empty(),
            kind,
            lods: Vec::new(),
        }
    }

    pub fn as_road(&self) -> Option<&RoadData> {
        match &self.kind {
            ObjectKind::Road(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_road_mut(&mut self) -> Option<&mut RoadData> {
        match &mut self.kind {
            ObjectKind::Road(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_road(&self) -> bool {
        matches!(self.kind, ObjectKind::Road(_))
    }

    /// Kreuzung, Kreisverkehr oder Rampe.
    pub fn is_node(&self) -> bool {
        self.node_kind().is_some()
    }

    pub fn node_kind(&self) -> Option<NodeKind> {
        match &self.kind {
            ObjectKind::Intersection(data) if data.is_end_cap() => Some(NodeKind::EndCap),
            ObjectKind::Intersection(_) => Some(NodeKind::Intersection),
            ObjectKind::Roundabout(_) => Some(NodeKind::Roundabout),
            ObjectKind::Ramp(_) => Some(NodeKind::Ramp),
            ObjectKind::Road(_) | ObjectKind::Custom(_) => None,
        }
    }

    /// Äste eines Knotens (leer für Strassen und externe Objekte).
    pub fn branches(&self) -> &[Branch] {
        match &self.kind {
            ObjectKind::Intersection(data) => &data.branches,
            ObjectKind::Roundabout(data) => &data.branches,
            ObjectKind::Ramp(data) => &data.branches,
            ObjectKind::Road(_) | ObjectKind::Custom(_) => &[],
        }
    }

    pub fn branches_mut(&mut self) -> Option<&mut Vec<Branch>> {
        match &mut self.kind {
            ObjectKind::Intersection(data) => Some(&mut data.branches),
            ObjectKind::Roundabout(data) => Some(&mut data.branches),
            ObjectKind::Ramp(data) => Some(&mut data.branches),
            ObjectKind::Road(_) | ObjectKind::Custom(_) => None,
        }
    }

    /// Zentrum eines Knotens.
    pub fn center(&self) -> Option<Vec3> {
        match &self.kind {
            ObjectKind::Intersection(data) => Some(data.center),
            ObjectKind::Roundabout(data) => Some(data.center),
            ObjectKind::Ramp(data) => Some(data.center),
            ObjectKind::Road(_) | ObjectKind::Custom(_) => None,
        }
    }

    /// Alle direkt verbundenen Objekte, abgeleitet aus den Objekt-Daten.
    ///
    /// Reihenfolge: Start/Ende bzw. Ast-Reihenfolge, ohne Duplikate.
    pub fn connections(&self) -> Vec<ObjectId> {
        let mut result: Vec<ObjectId> = Vec::new();
        let mut push = |id: ObjectId| {
            if !result.contains(&id) {
                result.push(id);
            }
        };
        match &self.kind {
            ObjectKind::Road(data) => {
                data.start.target().into_iter().for_each(&mut push);
                data.end.target().into_iter().for_each(&mut push);
            }
            ObjectKind::Intersection(data) => {
                data.branches.iter().for_each(|b| push(b.road));
                if let Some(snap) = data.snap {
                    push(snap.target);
                }
            }
            ObjectKind::Roundabout(data) => data.branches.iter().for_each(|b| push(b.road)),
            ObjectKind::Ramp(data) => data.branches.iter().for_each(|b| push(b.road)),
            ObjectKind::Custom(data) => data
                .slots
                .iter()
                .filter_map(|s| s.occupant)
                .for_each(&mut push),
        }
        result
    }

    /// Lesbarer Typname für Logs.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Road(_) => "Strasse",
            ObjectKind::Intersection(data) if data.is_end_cap() => "Strassen-Ende",
            ObjectKind::Intersection(_) => "Kreuzung",
            ObjectKind::Roundabout(_) => "Kreisverkehr",
            ObjectKind::Ramp(_) => "Rampe",
            ObjectKind::Custom(_) => "Externes Objekt",
        }
    }
}

/// Lese-Zugriff auf Objekte per Id.
///
/// Implementiert vom Live-`RoadSystem` und von der Arbeitsansicht einer
/// laufenden Konstruktion (Live-Zustand plus ausstehende Änderungen).
pub trait ObjectLookup {
    fn object(&self, id: ObjectId) -> Option<&SceneObject>;

    fn road(&self, id: ObjectId) -> Option<&RoadData> {
        self.object(id).and_then(SceneObject::as_road)
    }
}

impl ObjectLookup for indexmap::IndexMap<ObjectId, SceneObject> {
    fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.get(&id)
    }
}

/// Transiente Bindung eines Strassen-Endes an ein Knoten-Zentrum.
#[derive(Debug, Clone)]
pub struct KnotData {
    pub road: ObjectId,
    pub descriptor: Arc<RoadDescriptor>,
    pub width: f32,
    pub knot_index: usize,
    pub position: Vec3,
    /// Horizontale Richtung weg vom Zentrum
    pub direction: Vec3,
    pub elevated: bool,
}

impl KnotData {
    /// Liest die Endpunkt-Daten eines Asts aus der Strasse.
    pub fn from_branch(lookup: &dyn ObjectLookup, branch: Branch) -> Option<Self> {
        let object = lookup.object(branch.road)?;
        let road = object.as_road()?;
        let knot = road.spline.knot(branch.knot_index)?;
        let direction = if branch.knot_index == 0 {
            road.spline.start_direction()
        } else {
            -road.spline.end_direction()
        };
        Some(Self {
            road: branch.road,
            descriptor: Arc::clone(&object.road),
            width: road.width,
            knot_index: branch.knot_index,
            position: knot.position,
            direction: crate::shared::spline_geometry::safe_normalize(Vec3::new(
                direction.x,
                0.0,
                direction.z,
            )),
            elevated: object.elevated,
        })
    }

    /// Fährt die Strasse am Zentrum los (Knoten-Index 0)?
    pub fn starts_at_center(&self) -> bool {
        self.knot_index == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RoadCatalog;

    fn road(id: u64, start: EndpointLink, end: EndpointLink) -> SceneObject {
        let descriptor = RoadCatalog::default().get("two_lane").expect("Typ erwartet");
        let mut data = RoadData::new(
            Spline::straight(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)),
            descriptor.width(),
        );
        data.start = start;
        data.end = end;
        SceneObject::new(ObjectId(id), descriptor, false, ObjectKind::Road(data))
    }

    #[test]
    fn road_connections_come_from_endpoint_links() {
        let object = road(
            1,
            EndpointLink::Node { id: ObjectId(2) },
            EndpointLink::Snapped {
                target: ObjectId(3),
                slot: 0,
            },
        );
        assert_eq!(object.connections(), vec![ObjectId(2), ObjectId(3)]);
    }

    #[test]
    fn loop_road_lists_its_node_once() {
        let object = road(
            1,
            EndpointLink::Node { id: ObjectId(2) },
            EndpointLink::Node { id: ObjectId(2) },
        );
        assert_eq!(object.connections(), vec![ObjectId(2)]);
    }

    #[test]
    fn knot_data_points_away_from_center() {
        let mut objects = indexmap::IndexMap::new();
        let object = road(1, EndpointLink::Free, EndpointLink::Free);
        objects.insert(object.id, object);

        let start = KnotData::from_branch(&objects, Branch::new(ObjectId(1), 0))
            .expect("Knoten erwartet");
        let end = KnotData::from_branch(&objects, Branch::new(ObjectId(1), 1))
            .expect("Knoten erwartet");

        assert!(start.direction.dot(Vec3::X) > 0.99);
        assert!(end.direction.dot(-Vec3::X) > 0.99);
        assert!(start.starts_at_center());
    }
}
