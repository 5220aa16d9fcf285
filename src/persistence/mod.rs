//! Speichern und Laden eines ganzen Strassennetzes als JSON.
//!
//! Beim Laden werden die Strassentypen über den Katalog aufgelöst und alle
//! Meshes mit den Creators neu erzeugt: zuerst die Strassen, danach die Knoten,
//! die deren Enden lesen.

pub mod records;

pub use records::{
    SerializedCustom, SerializedIntersection, SerializedObject, SerializedRamp, SerializedRoad,
    SerializedRoadSystem, SerializedRoundabout, SNAPSHOT_VERSION,
};

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::app::creators;
use crate::app::use_cases::roundabout::RING_KNOTS;
use crate::core::{
    CustomData, IntersectionData, ObjectId, ObjectKind, RampData, RoadCatalog, RoadData,
    RoadDescriptor, RoadSystem, RoundaboutData, SceneObject, Spline,
};
use crate::shared::ConstructionSettings;

impl SerializedObject {
    fn from_object(object: &SceneObject) -> Self {
        let road_type = object.road.name.clone();
        match &object.kind {
            ObjectKind::Road(data) => SerializedObject::Road(SerializedRoad {
                id: object.id,
                road_type,
                elevated: object.elevated,
                spline: data.spline.clone(),
                width: data.width,
                ramp_road: data.ramp_road,
                start: data.start,
                end: data.end,
                split_original_id: data.split_original_id,
                split_original_spline: data.split_original_spline.clone(),
            }),
            ObjectKind::Intersection(data) => SerializedObject::Intersection(SerializedIntersection {
                id: object.id,
                road_type,
                elevated: object.elevated,
                center: data.center,
                branches: data.branches.clone(),
                snap: data.snap,
            }),
            ObjectKind::Roundabout(data) => SerializedObject::Roundabout(SerializedRoundabout {
                id: object.id,
                road_type,
                elevated: object.elevated,
                center: data.center,
                radius: data.radius,
                design: data.design,
                branches: data.branches.clone(),
            }),
            ObjectKind::Ramp(data) => SerializedObject::Ramp(SerializedRamp {
                id: object.id,
                road_type,
                elevated: object.elevated,
                center: data.center,
                branches: data.branches.clone(),
                ramp_side: data.ramp_side,
                gap_spline: data.gap_spline.clone(),
            }),
            ObjectKind::Custom(data) => SerializedObject::Custom(SerializedCustom {
                id: object.id,
                road_type,
                bounds_min: object.bounds.min,
                bounds_max: object.bounds.max,
                slots: data.slots.clone(),
            }),
        }
    }

    /// Objekt ohne Geometrie (Meshes entstehen beim Wiederaufbau).
    fn to_object(&self, descriptor: Arc<RoadDescriptor>) -> SceneObject {
        match self {
            SerializedObject::Road(r) => {
                let mut data = RoadData::new(r.spline.clone(), r.width);
                data.ramp_road = r.ramp_road;
                data.start = r.start;
                data.end = r.end;
                data.split_original_id = r.split_original_id;
                data.split_original_spline = r.split_original_spline.clone();
                SceneObject::new(r.id, descriptor, r.elevated, ObjectKind::Road(data))
            }
            SerializedObject::Intersection(r) => {
                let mut data = IntersectionData::new(r.center, r.branches.clone());
                data.snap = r.snap;
                SceneObject::new(r.id, descriptor, r.elevated, ObjectKind::Intersection(data))
            }
            SerializedObject::Roundabout(r) => SceneObject::new(
                r.id,
                descriptor,
                r.elevated,
                ObjectKind::Roundabout(RoundaboutData {
                    center: r.center,
                    radius: r.radius,
                    design: r.design,
                    branches: r.branches.clone(),
                    ring: Spline::circle(r.center, r.radius, RING_KNOTS),
                }),
            ),
            SerializedObject::Ramp(r) => SceneObject::new(
                r.id,
                descriptor,
                r.elevated,
                ObjectKind::Ramp(RampData {
                    center: r.center,
                    branches: r.branches.clone(),
                    ramp_side: r.ramp_side,
                    gap_spline: r.gap_spline.clone(),
                }),
            ),
            SerializedObject::Custom(r) => {
                let mut object = SceneObject::new(
                    r.id,
                    descriptor,
                    false,
                    ObjectKind::Custom(CustomData {
                        slots: r.slots.clone(),
                    }),
                );
                object.bounds = r.bounds();
                object
            }
        }
    }
}

impl SerializedRoadSystem {
    pub fn from_system(system: &RoadSystem) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            next_id: system.next_id(),
            objects: system.objects().map(SerializedObject::from_object).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Snapshot fehlerhaft")
    }

    /// Baut das Netz samt Meshes neu auf.
    ///
    /// Fehler: unbekannte Strassentypen, doppelte Ids oder Verbindungen
    /// ohne Gegenstück.
    pub fn rebuild(&self, catalog: &RoadCatalog, settings: &ConstructionSettings) -> Result<RoadSystem> {
        anyhow::ensure!(
            self.version <= SNAPSHOT_VERSION,
            "Snapshot-Version {} wird nicht unterstützt",
            self.version
        );

        let mut objects: IndexMap<ObjectId, SceneObject> = IndexMap::new();
        for record in &self.objects {
            let descriptor = catalog
                .require(record.road_type())
                .with_context(|| format!("Objekt {}", record.id()))?;
            let object = record.to_object(descriptor);
            let id = object.id;
            anyhow::ensure!(objects.insert(id, object).is_none(), "Doppelte Objekt-Id {id}");
        }

        // Knoten lesen die Enden ihrer Strassen: Strassen zuerst
        let (roads, others): (Vec<ObjectId>, Vec<ObjectId>) =
            objects.keys().copied().partition(|id| objects[id].is_road());
        let mut fails = Vec::new();
        for id in roads.into_iter().chain(others) {
            let Some(mut object) = objects.get(&id).cloned() else {
                continue;
            };
            creators::refresh(&mut object, &objects, settings, &mut fails);
            objects.insert(id, object);
        }
        if !fails.is_empty() {
            log::warn!("Snapshot: Geometrie mit Problemen erzeugt: {:?}", fails);
        }

        let system = RoadSystem::from_objects(objects.into_values(), self.next_id);
        let broken = system.check_symmetry();
        anyhow::ensure!(
            broken.is_empty(),
            "Snapshot inkonsistent: {} Verbindungen ohne Gegenstück (erste: {:?})",
            broken.len(),
            broken.first()
        );
        Ok(system)
    }
}

/// Speichert ein Netz als JSON-Datei.
pub fn save_to_file(system: &RoadSystem, path: &Path) -> Result<()> {
    let json = SerializedRoadSystem::from_system(system).to_json()?;
    std::fs::write(path, json)
        .with_context(|| format!("Snapshot nicht schreibbar: {}", path.display()))?;
    log::info!("Netz gespeichert nach: {}", path.display());
    Ok(())
}

/// Lädt ein Netz aus einer JSON-Datei.
pub fn load_from_file(
    path: &Path,
    catalog: &RoadCatalog,
    settings: &ConstructionSettings,
) -> Result<RoadSystem> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Snapshot nicht lesbar: {}", path.display()))?;
    SerializedRoadSystem::from_json(&json)
        .with_context(|| format!("Datei: {}", path.display()))?
        .rebuild(catalog, settings)
}

#[cfg(test)]
mod tests;
