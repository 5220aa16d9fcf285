//! Zentrale Konfiguration der Konstruktions-Pipeline.
//!
//! `ConstructionSettings` enthält alle Grenzwerte, Snap-Radien und
//! Auflösungs-Parameter. Der Wert wird explizit in jeden Pipeline-Aufruf
//! gereicht und nie global gehalten.
//! Die `const`-Werte bleiben als Fallback/Default erhalten.

use serde::{Deserialize, Serialize};

// ── Strassen ────────────────────────────────────────────────────────

/// Minimale Strassenlänge in Metern.
pub const MIN_ROAD_LENGTH: f32 = 4.0;
/// Maximale Strassenlänge in Metern.
pub const MAX_ROAD_LENGTH: f32 = 500.0;
/// Maximale Krümmung (Winkel zwischen den End-Ableitungen, Grad).
pub const MAX_CURVATURE_DEG: f32 = 150.0;
/// Maximale Steigung in Grad.
pub const MAX_SLOPE_DEG: f32 = 20.0;
/// Tangenten-Länge als Anteil der Sehnenlänge.
pub const TANGENT_LENGTH_FACTOR: f32 = 0.33;

// ── Auflösung ───────────────────────────────────────────────────────

/// Segmente pro 10 Meter Spline-Länge (Basisauflösung).
pub const BASE_RESOLUTION: f32 = 4.0;
/// Anzahl der Detailstufen pro Mesh (jede Stufe halbiert die Auflösung).
pub const LOD_COUNT: u8 = 2;

// ── Snap ────────────────────────────────────────────────────────────

/// Snap-Radius (Welteinheiten): Punkt innerhalb dieses Radius rastet auf ein Objekt ein.
pub const SNAP_RADIUS: f32 = 3.0;
/// Maximaler Höhenunterschied für einen Snap.
pub const SNAP_HEIGHT: f32 = 3.0;

// ── Kreuzungen ──────────────────────────────────────────────────────

/// Abstand zwischen zwei Ästen einer Kreuzung (Lücke in Metern).
pub const INTERSECTION_DISTANCE: f32 = 1.0;
/// Winkel-Toleranz (Grad), unter der zwei Äste als geradlinig gelten.
pub const COLLAPSE_ANGLE_TOLERANCE_DEG: f32 = 5.0;

// ── Overlap ─────────────────────────────────────────────────────────

/// Mindest-Höhenabstand zweier Fahrbahnen, ab dem sie sich nicht mehr überschneiden.
pub const MIN_OVERLAP_HEIGHT: f32 = 3.0;
/// Horizontaler Mindestabstand zwischen Fahrbahnkanten.
pub const MIN_OVERLAP_DISTANCE: f32 = 0.25;

// ── Boden ───────────────────────────────────────────────────────────

/// Tiefster erlaubter Abstand Fahrbahn → Boden (negativ = unter dem Boden).
pub const GROUND_OFFSET_MIN: f32 = -0.5;
/// Höchster erlaubter Abstand Fahrbahn → Boden für nicht-erhöhte Strassen.
pub const GROUND_OFFSET_MAX: f32 = 1.5;

// ── Kreisverkehr ────────────────────────────────────────────────────

/// Standard-Radius eines Kreisverkehrs (Fahrbahnmitte).
pub const ROUNDABOUT_RADIUS: f32 = 12.0;

// ── Historie ────────────────────────────────────────────────────────

/// Anzahl gespeicherter Undo-Schritte.
pub const UNDO_STORAGE_SIZE: usize = 20;

// ── Terrain ─────────────────────────────────────────────────────────

/// Übergangsbreite neben der Fahrbahn, in der das Terrain angeglichen wird.
pub const TERRAIN_FALLOFF: f32 = 4.0;
/// Abstand Fahrbahn-Oberfläche → angeglichenes Terrain.
pub const TERRAIN_HEIGHT_OFFSET: f32 = 0.05;

/// Parameter für den Terrain-Kollaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerrainSettings {
    /// Terrain beim Commit anpassen
    pub enabled: bool,
    /// Übergangsbreite neben der Fahrbahn
    pub falloff: f32,
    /// Abstand Fahrbahn-Oberfläche → Terrain
    pub height_offset: f32,
    /// Nur abtragen, niemals aufschütten
    #[serde(default)]
    pub check_height: bool,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            falloff: TERRAIN_FALLOFF,
            height_offset: TERRAIN_HEIGHT_OFFSET,
            check_height: false,
        }
    }
}

// ── Laufzeit-Optionen (serialisierbar) ─────────────────────────────

/// Alle Konstruktions-Parameter.
/// Wird als `roadforge.toml` neben der Binary gespeichert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructionSettings {
    // ── Strassen ────────────────────────────────────────────────
    /// Minimale Strassenlänge
    pub min_road_length: f32,
    /// Maximale Strassenlänge
    pub max_road_length: f32,
    /// Maximale Krümmung in Grad
    pub max_curvature: f32,
    /// Maximale Steigung in Grad
    pub max_slope: f32,
    /// Tangenten-Länge als Anteil der Sehne
    pub tangent_length: f32,

    // ── Auflösung ───────────────────────────────────────────────
    /// Segmente pro 10 Meter
    pub base_resolution: f32,
    /// Auflösung bei geraden, flachen Strecken reduzieren
    pub smart_reduce: bool,
    /// Anzahl Detailstufen
    #[serde(default = "default_lod_count")]
    pub lod_count: u8,

    // ── Snap ────────────────────────────────────────────────────
    /// Snap-Radius in Welteinheiten
    pub snap_radius: f32,
    /// Maximaler Höhenunterschied beim Snap
    pub snap_height: f32,

    // ── Kreuzungen ──────────────────────────────────────────────
    /// Lücke zwischen den Ästen einer Kreuzung
    pub intersection_distance: f32,
    /// Winkel-Toleranz für das Zusammenlegen geradliniger Äste
    #[serde(default = "default_collapse_angle_tolerance")]
    pub collapse_angle_tolerance: f32,
    /// Freie Strassen-Enden erhalten einen Abschluss-Knoten
    #[serde(default = "default_true")]
    pub end_caps: bool,
    /// Kreuzungen zwischen erhöhten Strassen erlauben
    #[serde(default = "default_true")]
    pub elevated_intersections: bool,

    // ── Overlap ─────────────────────────────────────────────────
    /// Höhenabstand, ab dem sich Fahrbahnen nicht mehr überschneiden
    pub min_overlap_height: f32,
    /// Horizontaler Mindestabstand zwischen Fahrbahnkanten
    pub min_overlap_distance: f32,

    // ── Boden ───────────────────────────────────────────────────
    /// Bodenprüfung aktiv
    pub check_ground: bool,
    /// Tiefster erlaubter Abstand Fahrbahn → Boden
    pub ground_offset_min: f32,
    /// Höchster erlaubter Abstand Fahrbahn → Boden
    pub ground_offset_max: f32,

    // ── Kreisverkehr ────────────────────────────────────────────
    /// Standard-Radius
    pub roundabout_radius: f32,

    // ── Historie ────────────────────────────────────────────────
    /// Anzahl gespeicherter Undo-Schritte
    pub undo_storage_size: usize,

    // ── Terrain ─────────────────────────────────────────────────
    /// Terrain-Anpassung beim Commit
    #[serde(default)]
    pub terrain: TerrainSettings,
}

impl Default for ConstructionSettings {
    fn default() -> Self {
        Self {
            min_road_length: MIN_ROAD_LENGTH,
            max_road_length: MAX_ROAD_LENGTH,
            max_curvature: MAX_CURVATURE_DEG,
            max_slope: MAX_SLOPE_DEG,
            tangent_length: TANGENT_LENGTH_FACTOR,

            base_resolution: BASE_RESOLUTION,
            smart_reduce: true,
            lod_count: LOD_COUNT,

            snap_radius: SNAP_RADIUS,
            snap_height: SNAP_HEIGHT,

            intersection_distance: INTERSECTION_DISTANCE,
            collapse_angle_tolerance: COLLAPSE_ANGLE_TOLERANCE_DEG,
            end_caps: true,
            elevated_intersections: true,

            min_overlap_height: MIN_OVERLAP_HEIGHT,
            min_overlap_distance: MIN_OVERLAP_DISTANCE,

            check_ground: true,
            ground_offset_min: GROUND_OFFSET_MIN,
            ground_offset_max: GROUND_OFFSET_MAX,

            roundabout_radius: ROUNDABOUT_RADIUS,

            undo_storage_size: UNDO_STORAGE_SIZE,

            terrain: TerrainSettings::default(),
        }
    }
}

/// Serde-Default für `lod_count` (Abwärtskompatibilität bestehender TOML-Dateien).
fn default_lod_count() -> u8 {
    LOD_COUNT
}

fn default_collapse_angle_tolerance() -> f32 {
    COLLAPSE_ANGLE_TOLERANCE_DEG
}

fn default_true() -> bool {
    true
}

impl ConstructionSettings {
    /// Lädt Einstellungen aus einer TOML-Datei. Bei Fehler: Standardwerte.
    pub fn load_from_file(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    log::info!("Einstellungen geladen aus: {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!(
                        "Einstellungs-Datei fehlerhaft, verwende Standardwerte: {}",
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Keine Einstellungs-Datei gefunden, verwende Standardwerte");
                Self::default()
            }
        }
    }

    /// Speichert Einstellungen als TOML-Datei.
    pub fn save_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        log::info!("Einstellungen gespeichert nach: {}", path.display());
        Ok(())
    }

    /// Ermittelt den Pfad zur Einstellungs-Datei neben der Binary.
    pub fn config_path() -> std::path::PathBuf {
        std::env::current_exe()
            .unwrap_or_else(|_| std::path::PathBuf::from("roadforge"))
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join("roadforge.toml")
    }

    /// Anzahl der zu erzeugenden Detailstufen (mindestens eine).
    pub fn lod_levels(&self) -> u8 {
        self.lod_count.max(1)
    }
}
