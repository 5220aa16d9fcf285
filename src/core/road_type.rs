//! Strassentypen: Spur-Profile und der Katalog aller verfügbaren Typen.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Art einer Spur im Querprofil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneKind {
    /// Fahrspur
    #[default]
    Drive,
    /// Randstreifen (Gehweg, Bordstein, Bankett)
    Side,
}

/// Eine Spur im Querprofil (von links nach rechts in Fahrtrichtung).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneDescriptor {
    /// Breite in Metern
    pub width: f32,
    /// Höhe über der Fahrbahn (z.B. Bordstein)
    #[serde(default)]
    pub height: f32,
    /// Material-Name für das Mesh-Packing
    pub material: String,
    #[serde(default)]
    pub kind: LaneKind,
}

impl LaneDescriptor {
    pub fn drive(width: f32, material: &str) -> Self {
        Self {
            width,
            height: 0.0,
            material: material.to_string(),
            kind: LaneKind::Drive,
        }
    }

    pub fn side(width: f32, height: f32, material: &str) -> Self {
        Self {
            width,
            height,
            material: material.to_string(),
            kind: LaneKind::Side,
        }
    }

    pub fn is_side(&self) -> bool {
        self.kind == LaneKind::Side
    }
}

/// Beschreibung eines Strassentyps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadDescriptor {
    /// Eindeutiger Name (Referenz in Snapshots und Requests)
    pub name: String,
    /// Querprofil von links nach rechts in Fahrtrichtung
    pub lanes: Vec<LaneDescriptor>,
    /// Einbahnstrasse (Voraussetzung für Kreisverkehre)
    #[serde(default)]
    pub one_way: bool,
    /// Darf als erhöhte Strasse (Brücke) gebaut werden
    #[serde(default = "default_true")]
    pub elevatable: bool,
}

fn default_true() -> bool {
    true
}

impl RoadDescriptor {
    /// Gesamtbreite aller Spuren.
    pub fn width(&self) -> f32 {
        self.lanes.iter().map(|l| l.width).sum()
    }

    /// Randspuren links der Fahrbahn (führende `Side`-Spuren).
    pub fn left_side_lanes(&self) -> &[LaneDescriptor] {
        let count = self.lanes.iter().take_while(|l| l.is_side()).count();
        &self.lanes[..count]
    }

    /// Randspuren rechts der Fahrbahn (abschließende `Side`-Spuren).
    pub fn right_side_lanes(&self) -> &[LaneDescriptor] {
        let left = self.left_side_lanes().len();
        let count = self.lanes[left..]
            .iter()
            .rev()
            .take_while(|l| l.is_side())
            .count();
        &self.lanes[self.lanes.len() - count..]
    }

    /// Fahrbahn-Spuren zwischen den Randspuren.
    pub fn drive_lanes(&self) -> &[LaneDescriptor] {
        let left = self.left_side_lanes().len();
        let right = self.right_side_lanes().len();
        &self.lanes[left..self.lanes.len() - right]
    }

    pub fn drive_width(&self) -> f32 {
        self.drive_lanes().iter().map(|l| l.width).sum()
    }

    pub fn left_side_width(&self) -> f32 {
        self.left_side_lanes().iter().map(|l| l.width).sum()
    }

    pub fn right_side_width(&self) -> f32 {
        self.right_side_lanes().iter().map(|l| l.width).sum()
    }

    /// Material der ersten Fahrspur (für Flächen wie die Wendeplatte).
    pub fn surface_material(&self) -> &str {
        self.drive_lanes()
            .first()
            .or(self.lanes.first())
            .map_or("asphalt", |l| l.material.as_str())
    }
}

/// Datei-Format des Katalogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoadCatalogFile {
    roads: Vec<RoadDescriptor>,
}

/// Alle verfügbaren Strassentypen, per Name adressierbar.
#[derive(Debug, Clone)]
pub struct RoadCatalog {
    roads: Vec<Arc<RoadDescriptor>>,
}

impl Default for RoadCatalog {
    /// Eingebauter Katalog: zweispurige Strasse mit Gehwegen und eine Einbahnstrasse.
    fn default() -> Self {
        Self::new(vec![
            RoadDescriptor {
                name: "two_lane".to_string(),
                lanes: vec![
                    LaneDescriptor::side(2.0, 0.2, "sidewalk"),
                    LaneDescriptor::drive(3.5, "asphalt"),
                    LaneDescriptor::drive(3.5, "asphalt"),
                    LaneDescriptor::side(2.0, 0.2, "sidewalk"),
                ],
                one_way: false,
                elevatable: true,
            },
            RoadDescriptor {
                name: "one_way".to_string(),
                lanes: vec![
                    LaneDescriptor::side(1.0, 0.2, "curb"),
                    LaneDescriptor::drive(5.0, "asphalt"),
                    LaneDescriptor::side(1.0, 0.2, "curb"),
                ],
                one_way: true,
                elevatable: true,
            },
            RoadDescriptor {
                name: "dirt".to_string(),
                lanes: vec![LaneDescriptor::drive(4.0, "gravel")],
                one_way: false,
                elevatable: false,
            },
        ])
    }
}

impl RoadCatalog {
    pub fn new(roads: Vec<RoadDescriptor>) -> Self {
        Self {
            roads: roads.into_iter().map(Arc::new).collect(),
        }
    }

    /// Strassentyp per Name.
    pub fn get(&self, name: &str) -> Option<Arc<RoadDescriptor>> {
        self.roads.iter().find(|r| r.name == name).cloned()
    }

    /// Strassentyp per Name; unbekannte Namen sind ein Konfigurationsfehler.
    pub fn require(&self, name: &str) -> anyhow::Result<Arc<RoadDescriptor>> {
        self.get(name)
            .with_context(|| format!("Unbekannter Strassentyp: {name}"))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roads.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.roads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roads.is_empty()
    }

    /// Lädt den Katalog aus einer TOML-Datei.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Katalog nicht lesbar: {}", path.display()))?;
        let file: RoadCatalogFile = toml::from_str(&content)
            .with_context(|| format!("Katalog fehlerhaft: {}", path.display()))?;
        anyhow::ensure!(!file.roads.is_empty(), "Katalog enthält keine Strassentypen");
        log::info!(
            "Strassen-Katalog geladen aus {} ({} Typen)",
            path.display(),
            file.roads.len()
        );
        Ok(Self::new(file.roads))
    }

    /// Speichert den Katalog als TOML-Datei.
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let file = RoadCatalogFile {
            roads: self.roads.iter().map(|r| (**r).clone()).collect(),
        };
        let content = toml::to_string_pretty(&file)?;
        std::fs::write(path, content)?;
        log::info!("Strassen-Katalog gespeichert nach: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn profile_splits_into_side_and_drive_lanes() {
        let catalog = RoadCatalog::default();
        let road = catalog.get("two_lane").expect("Typ erwartet");

        assert_relative_eq!(road.width(), 11.0);
        assert_relative_eq!(road.drive_width(), 7.0);
        assert_eq!(road.left_side_lanes().len(), 1);
        assert_eq!(road.right_side_lanes().len(), 1);
        assert_eq!(road.drive_lanes().len(), 2);
    }

    #[test]
    fn profile_without_side_lanes_has_only_drive_lanes() {
        let catalog = RoadCatalog::default();
        let road = catalog.get("dirt").expect("Typ erwartet");

        assert!(road.left_side_lanes().is_empty());
        assert!(road.right_side_lanes().is_empty());
        assert_eq!(road.drive_lanes().len(), 1);
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert!(RoadCatalog::default().require("autobahn").is_err());
    }

    #[test]
    fn catalog_roundtrips_through_toml() {
        let catalog = RoadCatalog::default();
        let file = RoadCatalogFile {
            roads: catalog.roads.iter().map(|r| (**r).clone()).collect(),
        };
        let text = toml::to_string_pretty(&file).expect("serialisierbar");
        let parsed: RoadCatalogFile = toml::from_str(&text).expect("parsebar");
        assert_eq!(parsed.roads, file.roads);
    }
}
