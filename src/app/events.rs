//! Konstruktions-Commands und ihr Ergebnis.
//!
//! Commands sind serialisierbare Anfragen an den [`RoadBuilder`](super::RoadBuilder):
//! Strassentypen werden per Katalog-Name referenziert, damit ein Command-Log
//! als JSON gespeichert und später erneut abgespielt werden kann.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::construction::ConstructionResult;
use super::state::ConstructionPhase;
use crate::core::RoundaboutDesign;

/// Mutierende bzw. planende Schritte, zentral vom Controller ausgeführt.
///
/// `preview: true` plant nur (`display_*`), sonst wird übernommen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ConstructionCommand {
    /// Strasse zwischen zwei Punkten
    BuildRoad {
        start: Vec3,
        end: Vec3,
        road: String,
        #[serde(default)]
        elevated: bool,
        #[serde(default)]
        curve_center: Option<Vec3>,
        #[serde(default)]
        continue_tangent: bool,
        #[serde(default)]
        smooth_slope: bool,
        #[serde(default)]
        preview: bool,
    },
    /// Kreisverkehr an einem Knoten oder auf einer Strasse
    BuildRoundabout {
        center: Vec3,
        road: String,
        #[serde(default)]
        radius: Option<f32>,
        #[serde(default)]
        design: RoundaboutDesign,
        #[serde(default)]
        preview: bool,
    },
    /// Rampe von einer durchgehenden Strasse
    BuildRamp {
        start: Vec3,
        end: Vec3,
        road: String,
        #[serde(default)]
        elevated: bool,
        #[serde(default)]
        preview: bool,
    },
    /// Abriss am Punkt
    Demolish {
        point: Vec3,
        #[serde(default)]
        radius: Option<f32>,
        #[serde(default)]
        preview: bool,
    },
    /// Knoten am Ausgangspunkt an eine neue Lage verschieben
    MoveIntersection {
        from: Vec3,
        to: Vec3,
        #[serde(default)]
        radius: Option<f32>,
        #[serde(default)]
        preview: bool,
    },
    /// Fahrtrichtung der Strasse am Punkt umkehren
    ReverseRoad {
        point: Vec3,
        #[serde(default)]
        radius: Option<f32>,
    },
    /// Letzte Konstruktion rückgängig machen
    Undo,
    /// Laufende Vorschau verwerfen
    Cancel,
}

impl ConstructionCommand {
    /// Kurzname für Logs und Undo-Einträge.
    pub fn label(&self) -> &'static str {
        match self {
            ConstructionCommand::BuildRoad { .. } => "road",
            ConstructionCommand::BuildRoundabout { .. } => "roundabout",
            ConstructionCommand::BuildRamp { .. } => "ramp",
            ConstructionCommand::Demolish { .. } => "demolish",
            ConstructionCommand::MoveIntersection { .. } => "move_intersection",
            ConstructionCommand::ReverseRoad { .. } => "reverse",
            ConstructionCommand::Undo => "undo",
            ConstructionCommand::Cancel => "cancel",
        }
    }
}

/// Ergebnis eines ausgeführten Commands.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Phase nach dem Command
    pub phase: ConstructionPhase,
    /// Planungs-Ergebnis (nicht bei Undo/Cancel)
    pub result: Option<ConstructionResult>,
}

impl CommandOutcome {
    pub fn committed(&self) -> bool {
        self.phase == ConstructionPhase::Committed
    }
}
