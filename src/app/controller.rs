//! Builder: zentrale Anlaufstelle für alle Konstruktions-Anfragen.
//!
//! Jede Operation gibt es als `display_*` (nur planen und anzeigen) und als
//! `construct_*` (planen und übernehmen). Beide laufen durch dieselbe Planung
//! und liefern damit identische Geometrie.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use super::construction::{
    ConstructionResult, ConstructionResultDemolish, ConstructionResultMoveIntersection,
    ConstructionResultRamp, ConstructionResultReverse, ConstructionResultRoad,
    ConstructionResultRoundabout,
};
use super::graph::BatchContext;
use super::history::{ConstructionHistory, ConstructionUndo};
use super::sink::SceneSink;
use super::state::{BuilderState, ConstructionPhase};
use super::terrain::{TerrainUndoCache, TerrainUpdater};
use super::traffic::{FinalizedNetwork, WaypointGenerator};
use super::use_cases::{
    self, DemolishRequest, MoveIntersectionRequest, RampRequest, ReverseRequest, RoadRequest,
    RoundaboutRequest,
};
use super::{CommandOutcome, ConstructionCommand};
use crate::core::{
    Aabb, ConnectionSlot, ConstructionObjects, CustomData, GroundSampler, KnotData, ObjectId,
    ObjectKind, RoadCatalog, RoadDescriptor, RoadSystem, SceneObject, Spline,
};
use crate::persistence;
use crate::shared::ConstructionSettings;

/// Orchestriert Planung, Commit und Undo auf dem Live-Netz.
pub struct RoadBuilder {
    system: Arc<RoadSystem>,
    settings: ConstructionSettings,
    catalog: RoadCatalog,
    ground: Box<dyn GroundSampler>,
    terrain: Option<Box<dyn TerrainUpdater>>,
    waypoints: Option<Box<dyn WaypointGenerator>>,
    sink: Option<Box<dyn SceneSink>>,
    history: ConstructionHistory,
    state: BuilderState,
}

impl RoadBuilder {
    /// Erstellt einen Builder mit leerem Netz.
    pub fn new(
        settings: ConstructionSettings,
        catalog: RoadCatalog,
        ground: Box<dyn GroundSampler>,
    ) -> Self {
        Self {
            system: Arc::new(RoadSystem::new()),
            history: ConstructionHistory::new_with_capacity(settings.undo_storage_size),
            settings,
            catalog,
            ground,
            terrain: None,
            waypoints: None,
            sink: None,
            state: BuilderState::new(),
        }
    }

    pub fn with_terrain(mut self, terrain: Box<dyn TerrainUpdater>) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn with_waypoints(mut self, waypoints: Box<dyn WaypointGenerator>) -> Self {
        self.waypoints = Some(waypoints);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn SceneSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn system(&self) -> &RoadSystem {
        &self.system
    }

    /// Geteilter Zugriff auf den aktuellen Stand (O(1)).
    pub fn shared_system(&self) -> Arc<RoadSystem> {
        Arc::clone(&self.system)
    }

    pub fn settings(&self) -> &ConstructionSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &RoadCatalog {
        &self.catalog
    }

    pub fn history(&self) -> &ConstructionHistory {
        &self.history
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    pub fn phase(&self) -> ConstructionPhase {
        self.state.phase
    }

    /// Strassentyp per Katalog-Name.
    pub fn road_type(&self, name: &str) -> anyhow::Result<Arc<RoadDescriptor>> {
        self.catalog.require(name)
    }

    /// Ersetzt das gesamte Netz (z.B. nach dem Laden); die Historie wird geleert.
    pub fn replace_system(&mut self, system: RoadSystem) {
        if let Some(sink) = self.sink.as_mut() {
            for object in self.system.objects() {
                sink.destroy(object.id);
            }
            for object in system.objects() {
                sink.create(object);
            }
        }
        self.system = Arc::new(system);
        self.history.clear();
        self.state.enter(ConstructionPhase::Idle);
        self.rebuild_waypoints();
    }

    // ── Strassen ────────────────────────────────────────────────────

    pub fn display_road(&mut self, request: &RoadRequest) -> ConstructionResultRoad {
        let result = use_cases::plan_road(&self.system, &*self.ground, &self.settings, request);
        self.show_preview(&result.result);
        result
    }

    pub fn construct_road(&mut self, request: &RoadRequest) -> anyhow::Result<ConstructionResultRoad> {
        let result = use_cases::plan_road(&self.system, &*self.ground, &self.settings, request);
        self.commit("road", &result.result)?;
        Ok(result)
    }

    // ── Kreisverkehre ───────────────────────────────────────────────

    pub fn display_roundabout(&mut self, request: &RoundaboutRequest) -> ConstructionResultRoundabout {
        let result = use_cases::plan_roundabout(&self.system, &*self.ground, &self.settings, request);
        self.show_preview(&result.result);
        result
    }

    pub fn construct_roundabout(
        &mut self,
        request: &RoundaboutRequest,
    ) -> anyhow::Result<ConstructionResultRoundabout> {
        let result = use_cases::plan_roundabout(&self.system, &*self.ground, &self.settings, request);
        self.commit("roundabout", &result.result)?;
        Ok(result)
    }

    // ── Rampen ──────────────────────────────────────────────────────

    pub fn display_ramp(&mut self, request: &RampRequest) -> ConstructionResultRamp {
        let result = use_cases::plan_ramp(&self.system, &*self.ground, &self.settings, request);
        self.show_preview(&result.result);
        result
    }

    pub fn construct_ramp(&mut self, request: &RampRequest) -> anyhow::Result<ConstructionResultRamp> {
        let result = use_cases::plan_ramp(&self.system, &*self.ground, &self.settings, request);
        self.commit("ramp", &result.result)?;
        Ok(result)
    }

    // ── Abriss ──────────────────────────────────────────────────────

    pub fn display_demolish_objects(&mut self, request: &DemolishRequest) -> ConstructionResultDemolish {
        let result = use_cases::plan_demolish(&self.system, &self.settings, request);
        self.show_preview(&result.result);
        result
    }

    pub fn demolish(&mut self, request: &DemolishRequest) -> anyhow::Result<ConstructionResultDemolish> {
        let result = use_cases::plan_demolish(&self.system, &self.settings, request);
        self.commit("demolish", &result.result)?;
        Ok(result)
    }

    /// Reisst ein bekanntes Objekt ab.
    pub fn demolish_object(&mut self, id: ObjectId) -> anyhow::Result<ConstructionResultDemolish> {
        let result = use_cases::demolish::demolish_object(&self.system, &self.settings, id);
        self.commit("demolish", &result.result)?;
        Ok(result)
    }

    // ── Knoten verschieben ──────────────────────────────────────────

    pub fn display_move_intersection(
        &mut self,
        request: &MoveIntersectionRequest,
    ) -> ConstructionResultMoveIntersection {
        let result =
            use_cases::plan_move_intersection(&self.system, &*self.ground, &self.settings, request);
        self.show_preview(&result.result);
        result
    }

    pub fn move_intersection(
        &mut self,
        request: &MoveIntersectionRequest,
    ) -> anyhow::Result<ConstructionResultMoveIntersection> {
        let result =
            use_cases::plan_move_intersection(&self.system, &*self.ground, &self.settings, request);
        self.commit("move_intersection", &result.result)?;
        Ok(result)
    }

    // ── Richtung umkehren ───────────────────────────────────────────

    /// Kehrt die Strasse am Punkt der Anfrage um; `road_id` im Ergebnis nennt sie.
    pub fn reverse_road_direction(
        &mut self,
        request: &ReverseRequest,
    ) -> anyhow::Result<ConstructionResultReverse> {
        let result = use_cases::plan_reverse(&self.system, &self.settings, request);
        self.commit("reverse", &result.result)?;
        Ok(result)
    }

    // ── Externe Objekte ─────────────────────────────────────────────

    /// Übernimmt ein extern platziertes Objekt mit Anschluss-Slots.
    ///
    /// `road` bestimmt das Querprofil der Strassen, die an den Slots einrasten.
    pub fn integrate_custom(
        &mut self,
        road: &str,
        bounds: Aabb,
        slots: Vec<ConnectionSlot>,
    ) -> anyhow::Result<ObjectId> {
        let descriptor = self.catalog.require(road)?;
        let slots = slots
            .into_iter()
            .map(|slot| ConnectionSlot {
                occupant: None,
                ..slot
            })
            .collect();

        let mut ctx = BatchContext::new(&self.system, &self.settings);
        let id = ctx.allocate_id();
        let mut object = SceneObject::new(id, descriptor, false, ObjectKind::Custom(CustomData { slots }));
        object.bounds = bounds;
        ctx.put(object);
        let result = use_cases::finish(ctx, Vec::new());

        anyhow::ensure!(
            self.commit("custom", &result)?,
            "Externes Objekt nicht übernommen: {:?}",
            result.construction_fails
        );
        Ok(id)
    }

    // ── Undo ────────────────────────────────────────────────────────

    /// Macht den zuletzt übernommenen Batch rückgängig.
    ///
    /// Rückgabe `false`, wenn die Historie leer ist.
    pub fn undo_last_construction(&mut self) -> anyhow::Result<bool> {
        let Some(entry) = self.history.pop_undo() else {
            log::warn!("Undo: keine Konstruktion gespeichert");
            return Ok(false);
        };
        let next = match self.system.reverted(&entry.record) {
            Ok(next) => next,
            Err(err) => {
                let label = entry.label;
                self.history.restore_top(entry);
                return Err(anyhow::Error::new(err).context(format!("Undo von '{label}' verworfen")));
            }
        };

        if let (Some(cache), Some(terrain)) = (&entry.terrain, self.terrain.as_mut()) {
            terrain.restore(cache);
        }
        if let Some(sink) = self.sink.as_mut() {
            for id in &entry.record.created {
                sink.destroy(*id);
            }
            for object in &entry.record.previous {
                sink.create(object);
            }
        }
        self.system = Arc::new(next);
        self.state.enter(ConstructionPhase::Idle);
        self.rebuild_waypoints();
        log::info!(
            "Undo '{}': {} Objekte entfernt, {} wiederhergestellt",
            entry.label,
            entry.record.created.len(),
            entry.record.previous.len()
        );
        Ok(true)
    }

    /// Verwirft eine laufende Vorschau.
    pub fn cancel_preview(&mut self) {
        if self.state.is_previewing() {
            if let Some(sink) = self.sink.as_mut() {
                sink.clear_preview();
            }
            self.state.enter(ConstructionPhase::Cancelled);
        }
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Führt einen serialisierten Command aus und protokolliert ihn.
    pub fn handle_command(&mut self, command: ConstructionCommand) -> anyhow::Result<CommandOutcome> {
        self.state.command_log.record(&command);
        log::debug!("Command '{}'", command.label());

        let result = match command {
            ConstructionCommand::BuildRoad {
                start,
                end,
                road,
                elevated,
                curve_center,
                continue_tangent,
                smooth_slope,
                preview,
            } => {
                let request = RoadRequest {
                    start,
                    end,
                    road: self.road_type(&road)?,
                    elevated,
                    curve_center,
                    continue_tangent,
                    smooth_slope,
                };
                Some(if preview {
                    self.display_road(&request).result
                } else {
                    self.construct_road(&request)?.result
                })
            }
            ConstructionCommand::BuildRoundabout {
                center,
                road,
                radius,
                design,
                preview,
            } => {
                let request = RoundaboutRequest {
                    center,
                    radius,
                    road: self.road_type(&road)?,
                    design,
                };
                Some(if preview {
                    self.display_roundabout(&request).result
                } else {
                    self.construct_roundabout(&request)?.result
                })
            }
            ConstructionCommand::BuildRamp {
                start,
                end,
                road,
                elevated,
                preview,
            } => {
                let request = RampRequest {
                    start,
                    end,
                    road: self.road_type(&road)?,
                    elevated,
                };
                Some(if preview {
                    self.display_ramp(&request).result
                } else {
                    self.construct_ramp(&request)?.result
                })
            }
            ConstructionCommand::Demolish {
                point,
                radius,
                preview,
            } => {
                let request = DemolishRequest { point, radius };
                Some(if preview {
                    self.display_demolish_objects(&request).result
                } else {
                    self.demolish(&request)?.result
                })
            }
            ConstructionCommand::MoveIntersection {
                from,
                to,
                radius,
                preview,
            } => {
                let request = MoveIntersectionRequest { from, radius, to };
                Some(if preview {
                    self.display_move_intersection(&request).result
                } else {
                    self.move_intersection(&request)?.result
                })
            }
            ConstructionCommand::ReverseRoad { point, radius } => {
                Some(self.reverse_road_direction(&ReverseRequest { point, radius })?.result)
            }
            ConstructionCommand::Undo => {
                self.undo_last_construction()?;
                None
            }
            ConstructionCommand::Cancel => {
                self.cancel_preview();
                None
            }
        };

        Ok(CommandOutcome {
            phase: self.state.phase,
            result,
        })
    }

    // ── Persistenz ──────────────────────────────────────────────────

    pub fn save_snapshot(&self, path: &Path) -> anyhow::Result<()> {
        persistence::save_to_file(&self.system, path)
    }

    /// Lädt ein Netz und baut alle Meshes mit dem eigenen Katalog neu auf.
    pub fn load_snapshot(&mut self, path: &Path) -> anyhow::Result<()> {
        let system = persistence::load_from_file(path, &self.catalog, &self.settings)?;
        log::info!(
            "Netz geladen: {} Strassen, {} Knoten",
            system.road_count(),
            system.node_count()
        );
        self.replace_system(system);
        Ok(())
    }

    // ── intern ──────────────────────────────────────────────────────

    fn show_preview(&mut self, result: &ConstructionResult) {
        self.state.enter(ConstructionPhase::Previewing);
        self.state.preview = Some(result.summary());
        if let Some(sink) = self.sink.as_mut() {
            sink.show_preview(&result.objects);
        }
    }

    /// Übernimmt ein geplantes Ergebnis. Rückgabe `false` bei Fehlschlägen.
    fn commit(&mut self, label: &'static str, result: &ConstructionResult) -> anyhow::Result<bool> {
        if let Some(sink) = self.sink.as_mut() {
            sink.clear_preview();
        }
        if result.construction_failed() {
            log::warn!("'{}' nicht übernommen: {:?}", label, result.construction_fails);
            self.state.enter(ConstructionPhase::Cancelled);
            return Ok(false);
        }

        let (next, record) = self
            .system
            .applied(&result.objects)
            .with_context(|| format!("Commit von '{label}' verworfen"))?;
        let terrain = self.update_terrain(&result.objects, &next);

        if let Some(sink) = self.sink.as_mut() {
            for id in result.objects.removable() {
                sink.destroy(id);
            }
            for object in result.objects.replaced_objects().chain(result.objects.new_objects()) {
                sink.create(object);
            }
        }
        self.system = Arc::new(next);
        self.history.record(ConstructionUndo {
            label,
            record,
            terrain,
        });
        self.rebuild_waypoints();
        self.state.enter(ConstructionPhase::Committed);
        log::info!(
            "'{}' übernommen: {} neu, {} ersetzt, {} entfernt",
            label,
            result.new_roads.len() + result.new_intersections.len(),
            result.replaced_roads.len() + result.replaced_intersections.len(),
            result.removed.len()
        );
        Ok(true)
    }

    /// Passt das Terrain an alle neuen und geänderten Fahrbahnen an.
    ///
    /// Kreuzungen tragen ihre Verbindungskurven bei, jeweils mit der Breite
    /// der Strasse am Ast; `next` ist das Netz nach dem Commit.
    fn update_terrain(&mut self, objects: &ConstructionObjects, next: &RoadSystem) -> Option<TerrainUndoCache> {
        if !self.settings.terrain.enabled {
            return None;
        }
        let terrain = self.terrain.as_mut()?;
        let mut footprints: Vec<(&Spline, f32)> = Vec::new();
        for object in objects.new_objects().chain(objects.replaced_objects()) {
            if object.elevated {
                continue;
            }
            match &object.kind {
                ObjectKind::Road(data) => footprints.push((&data.spline, data.width)),
                ObjectKind::Roundabout(data) => footprints.push((&data.ring, object.road.width())),
                ObjectKind::Ramp(data) => footprints.push((&data.gap_spline, object.road.width())),
                ObjectKind::Intersection(data) => {
                    for (connector, branch) in data.connector_splines.iter().zip(&data.branches) {
                        let width = KnotData::from_branch(next, *branch)
                            .map_or_else(|| object.road.width(), |knot| knot.width);
                        footprints.push((connector, width));
                    }
                }
                ObjectKind::Custom(_) => {}
            }
        }

        let mut cache = TerrainUndoCache::default();
        for (index, (spline, width)) in footprints.into_iter().enumerate() {
            terrain.update_terrain(
                &self.settings.terrain,
                spline,
                width,
                self.settings.terrain.check_height,
                index == 0,
                &mut cache,
            );
        }
        (!cache.is_empty()).then_some(cache)
    }

    fn rebuild_waypoints(&mut self) {
        if let Some(waypoints) = self.waypoints.as_mut() {
            let network = FinalizedNetwork::from_system(&self.system);
            log::debug!("Wegpunkte: {} Spuren", network.lane_count());
            waypoints.rebuild(&network);
        }
    }
}
