//! Ergebnis-Typen der Konstruktions-Pipeline.
//!
//! Platzierungs-Probleme sind Daten (`ConstructionFail`), keine Fehler: Sie
//! werden gesammelt und an den Aufrufer zurückgegeben.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{ConstructionObjects, Knot, ObjectId, ObjectKind, RoundaboutDesign, Spline};

/// Grund, warum eine Konstruktion nicht übernommen werden kann.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructionFail {
    /// Strasse zu kurz oder zu lang
    TrackLength,
    /// Krümmung über dem Maximum
    Curvature,
    /// Steigung über dem Maximum
    Slope,
    /// Ein Ast müsste um mindestens 99 % gekürzt werden
    IntersectionTrackLength,
    /// Ein gekürzter Ast überschreitet die maximale Steigung
    IntersectionTrackSlope,
    /// Überschneidung mit einer anderen Strasse
    OverlapTrack,
    /// Überschneidung mit einem Knoten
    OverlapIntersection,
    /// Kein Boden unter der Fahrbahn
    GroundMissing,
    /// Fahrbahn zu hoch oder zu tief über dem Boden
    HeightRange,
    /// Kreuzung zwischen erhöhten Strassen ist deaktiviert
    ElevatedIntersection,
    /// Strassentyp darf nicht erhöht gebaut werden
    NotElevatable,
    /// Kein passendes Anschluss-Objekt gefunden
    MissingConnection,
    /// Kreisverkehre brauchen eine Einbahnstrasse
    OneWayRequired,
}

impl fmt::Display for ConstructionFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConstructionFail::TrackLength => "Strassenlänge ausserhalb der Grenzen",
            ConstructionFail::Curvature => "Krümmung zu stark",
            ConstructionFail::Slope => "Steigung zu stark",
            ConstructionFail::IntersectionTrackLength => "Ast für die Kreuzung zu kurz",
            ConstructionFail::IntersectionTrackSlope => "Ast an der Kreuzung zu steil",
            ConstructionFail::OverlapTrack => "Überschneidung mit einer Strasse",
            ConstructionFail::OverlapIntersection => "Überschneidung mit einem Knoten",
            ConstructionFail::GroundMissing => "Kein Boden vorhanden",
            ConstructionFail::HeightRange => "Höhe über dem Boden ausserhalb der Grenzen",
            ConstructionFail::ElevatedIntersection => "Erhöhte Kreuzungen sind deaktiviert",
            ConstructionFail::NotElevatable => "Strassentyp kann nicht erhöht werden",
            ConstructionFail::MissingConnection => "Kein Anschluss gefunden",
            ConstructionFail::OneWayRequired => "Einbahnstrasse erforderlich",
        };
        f.write_str(text)
    }
}

/// Gemeinsamer Teil aller Konstruktions-Ergebnisse.
#[derive(Debug, Clone, Default)]
pub struct ConstructionResult {
    /// Das Ergebnis beschreibt eine tatsächlich ausgeführte Planung
    pub is_valid: bool,
    pub construction_fails: Vec<ConstructionFail>,
    pub new_roads: Vec<ObjectId>,
    pub new_intersections: Vec<ObjectId>,
    pub replaced_roads: Vec<ObjectId>,
    pub replaced_intersections: Vec<ObjectId>,
    pub removed: Vec<ObjectId>,
    /// Geplante Objekte samt Meshes (Vorschau)
    pub objects: ConstructionObjects,
}

impl ConstructionResult {
    /// Leeres Ergebnis für Anfragen ohne Ziel.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Ergebnis aus einem geplanten Batch.
    pub fn from_batch(objects: ConstructionObjects, fails: Vec<ConstructionFail>) -> Self {
        let mut result = Self {
            is_valid: true,
            construction_fails: fails,
            ..Default::default()
        };
        for object in objects.new_objects() {
            match object.kind {
                ObjectKind::Road(_) => result.new_roads.push(object.id),
                _ => result.new_intersections.push(object.id),
            }
        }
        for object in objects.replaced_objects() {
            match object.kind {
                ObjectKind::Road(_) => result.replaced_roads.push(object.id),
                _ => result.replaced_intersections.push(object.id),
            }
        }
        result.removed = objects.removable().collect();
        result.objects = objects;
        result
    }

    /// Mindestens ein Fehlschlag oder kein gültiges Ziel: nichts wird übernommen.
    pub fn construction_failed(&self) -> bool {
        !self.is_valid || !self.construction_fails.is_empty()
    }

    pub fn has_fail(&self, fail: ConstructionFail) -> bool {
        self.construction_fails.contains(&fail)
    }

    pub fn summary(&self) -> ConstructionObjectsSummary {
        ConstructionObjectsSummary {
            new: self.new_roads.len() + self.new_intersections.len(),
            replaced: self.replaced_roads.len() + self.replaced_intersections.len(),
            removed: self.removed.len(),
            fails: self.construction_fails.clone(),
        }
    }
}

/// Objekt-Zählung eines Ergebnisses (für Vorschau-Zustand und Logs).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructionObjectsSummary {
    pub new: usize,
    pub replaced: usize,
    pub removed: usize,
    pub fails: Vec<ConstructionFail>,
}

/// Geometrie einer geplanten Strasse (für Vorschau und Vergleich).
#[derive(Debug, Clone, PartialEq)]
pub struct RoadGeometry {
    pub knots: Vec<Knot>,
    pub length: f32,
    pub curvature: f32,
}

impl RoadGeometry {
    pub fn from_spline(spline: &Spline) -> Self {
        Self {
            knots: spline.knots().to_vec(),
            length: spline.length(),
            curvature: spline.curvature(),
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = glam::Vec3> + '_ {
        self.knots.iter().map(|k| k.position)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstructionResultRoad {
    pub result: ConstructionResult,
    /// Strasse, die das neue Teilstück trägt
    pub road_id: Option<ObjectId>,
    pub road_data: Option<RoadGeometry>,
}

#[derive(Debug, Clone, Default)]
pub struct ConstructionResultRoundabout {
    pub result: ConstructionResult,
    pub roundabout_id: Option<ObjectId>,
    pub design: RoundaboutDesign,
}

#[derive(Debug, Clone, Default)]
pub struct ConstructionResultRamp {
    pub result: ConstructionResult,
    pub ramp_id: Option<ObjectId>,
    pub ramp_road_id: Option<ObjectId>,
    pub road_data: Option<RoadGeometry>,
}

#[derive(Debug, Clone, Default)]
pub struct ConstructionResultDemolish {
    pub result: ConstructionResult,
    /// Primäres Abriss-Ziel
    pub target: Option<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct ConstructionResultMoveIntersection {
    pub result: ConstructionResult,
    pub intersection_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct ConstructionResultReverse {
    pub result: ConstructionResult,
    pub road_id: Option<ObjectId>,
}
