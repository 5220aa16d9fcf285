use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use glam::Vec3;
use roadforge::app::ConstructionFail;
use roadforge::{
    ConstructionPhase, ConstructionSettings, CountingSink, DemolishRequest, FinalizedNetwork,
    FlatGround, Heightmap, HeightmapTerrain, MoveIntersectionRequest, NodeKind, RoadBuilder,
    RoadCatalog, RoadRequest, SceneSink, SharedHeightmap, WaypointGenerator, WorldBounds,
};

fn builder() -> RoadBuilder {
    RoadBuilder::new(
        ConstructionSettings::default(),
        RoadCatalog::default(),
        Box::new(FlatGround::new(0.0)),
    )
}

fn road(builder: &RoadBuilder, start: Vec3, end: Vec3) -> RoadRequest {
    let descriptor = builder.road_type("two_lane").expect("Typ erwartet");
    RoadRequest::straight(start, end, descriptor)
}

/// Sink, dessen Zähler der Test nach der Übergabe an den Builder noch liest.
#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<CountingSink>>);

impl SceneSink for SharedSink {
    fn create(&mut self, object: &roadforge::SceneObject) {
        self.0.lock().expect("Sink").create(object);
    }

    fn destroy(&mut self, id: roadforge::ObjectId) {
        self.0.lock().expect("Sink").destroy(id);
    }

    fn show_preview(&mut self, objects: &roadforge::core::ConstructionObjects) {
        self.0.lock().expect("Sink").show_preview(objects);
    }
}

#[derive(Clone, Default)]
struct RecordingWaypoints(Arc<Mutex<Vec<usize>>>);

impl WaypointGenerator for RecordingWaypoints {
    fn rebuild(&mut self, network: &FinalizedNetwork) {
        self.0.lock().expect("Wegpunkte").push(network.lane_count());
    }
}

#[test]
fn test_corner_shortens_first_road() {
    let mut builder = builder();
    let first = builder
        .construct_road(&road(&builder, Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)))
        .expect("erste Strasse");
    let first_id = first.road_id.expect("Id erwartet");

    let second = builder
        .construct_road(&road(&builder, Vec3::new(20.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 20.0)))
        .expect("zweite Strasse");
    assert!(!second.result.construction_failed());

    let system = builder.system();
    assert_eq!(system.road_count(), 2);
    let length = system
        .get(first_id)
        .and_then(|o| o.as_road())
        .map(|r| r.length)
        .expect("erste Strasse erhalten");
    // Zweispurig 11 m breit, Lücke 1 m
    assert_relative_eq!(length, 13.5, epsilon = 0.05);

    let kinds: Vec<_> = system.nodes().filter_map(|o| o.node_kind()).collect();
    assert_eq!(kinds.iter().filter(|k| **k == NodeKind::Intersection).count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == NodeKind::EndCap).count(), 2);
    assert!(system.check_symmetry().is_empty());
    assert_eq!(builder.history().len(), 2);
    assert_eq!(builder.phase(), ConstructionPhase::Committed);
}

#[test]
fn test_display_and_construct_produce_identical_geometry() {
    let mut builder = builder();
    let request = road(&builder, Vec3::ZERO, Vec3::new(30.0, 0.0, 10.0)).curved(Vec3::new(15.0, 0.0, 15.0));

    let preview = builder.display_road(&request);
    assert_eq!(builder.phase(), ConstructionPhase::Previewing);
    assert!(builder.system().is_empty());
    assert_eq!(
        builder.state().preview.as_ref().map(|p| p.new),
        Some(preview.result.summary().new)
    );

    let committed = builder.construct_road(&request).expect("Commit");
    assert_eq!(preview.road_data, committed.road_data);
    assert_eq!(preview.result.new_roads, committed.result.new_roads);
    assert_eq!(builder.system().road_count(), 1);
}

#[test]
fn test_failed_construction_is_cancelled_without_history() {
    let mut builder = builder();
    let result = builder
        .construct_road(&road(&builder, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)))
        .expect("Fehlschlag ist kein Fehler");

    assert!(result.result.has_fail(ConstructionFail::TrackLength));
    assert!(builder.system().is_empty());
    assert!(builder.history().is_empty());
    assert_eq!(builder.phase(), ConstructionPhase::Cancelled);
}

#[test]
fn test_demolish_and_undo_restore_network() {
    let sink = SharedSink::default();
    let waypoints = RecordingWaypoints::default();
    let mut builder = builder()
        .with_sink(Box::new(sink.clone()))
        .with_waypoints(Box::new(waypoints.clone()));

    let built = builder
        .construct_road(&road(&builder, Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)))
        .expect("Strasse");
    assert_eq!(sink.0.lock().expect("Sink").created, 3);
    let road_id = built.road_id.expect("Id erwartet");
    let before = builder
        .system()
        .get(road_id)
        .cloned()
        .expect("Strasse erwartet");

    let demolished = builder
        .demolish(&DemolishRequest::at(Vec3::new(10.0, 0.0, 1.0)))
        .expect("Abriss");
    assert_eq!(demolished.result.removed.len(), 3);
    assert!(builder.system().is_empty());

    assert!(builder.undo_last_construction().expect("Undo"));
    assert_eq!(builder.system().road_count(), 1);
    assert_eq!(builder.system().node_count(), 2);
    assert!(builder.system().check_symmetry().is_empty());
    let restored = builder.system().get(road_id).expect("Strasse wiederhergestellt");
    assert_eq!(
        restored.as_road().map(|r| &r.spline),
        before.as_road().map(|r| &r.spline)
    );
    assert_eq!(restored.connections(), before.connections());

    let counts = sink.0.lock().expect("Sink").clone();
    assert_eq!(counts.destroyed, 3);
    assert_eq!(counts.created, 6);
    // Zwei Spuren nach Bau, keine nach Abriss, zwei nach Undo
    assert_eq!(*waypoints.0.lock().expect("Wegpunkte"), vec![2, 0, 2]);
}

#[test]
fn test_undo_on_empty_history_returns_false() {
    let mut builder = builder();
    assert!(!builder.undo_last_construction().expect("kein Fehler"));
}

#[test]
fn test_move_end_cap_drags_road_end() {
    let mut builder = builder();
    let built = builder
        .construct_road(&road(&builder, Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)))
        .expect("Strasse");
    let road_id = built.road_id.expect("Id erwartet");
    let cap = builder
        .system()
        .get(road_id)
        .and_then(|o| o.as_road())
        .and_then(|r| r.end.node())
        .expect("Abschluss erwartet");

    // Ausgangspunkt neben dem Abschluss, innerhalb des Fangradius
    let moved = builder
        .move_intersection(&MoveIntersectionRequest::new(
            Vec3::new(19.0, 0.0, 1.0),
            Vec3::new(25.0, 0.0, 5.0),
        ))
        .expect("Verschieben");
    assert_eq!(moved.intersection_id, Some(cap));

    let end = builder
        .system()
        .get(road_id)
        .and_then(|o| o.as_road())
        .map(|r| r.spline.last_position())
        .expect("Strasse erwartet");
    assert_relative_eq!(end.x, 25.0, epsilon = 1e-3);
    assert_relative_eq!(end.z, 5.0, epsilon = 1e-3);
    assert!(builder.system().check_symmetry().is_empty());
}

fn terrain_map() -> SharedHeightmap {
    let pixels = vec![0.2; 41 * 41];
    let map = Heightmap::from_pixels(pixels, 41, 41, WorldBounds::from_map_size(80.0), 10.0)
        .expect("gültige Heightmap");
    SharedHeightmap::new(map)
}

fn terrain_settings() -> ConstructionSettings {
    let mut settings = ConstructionSettings::default();
    settings.check_ground = false;
    settings.terrain.enabled = true;
    settings.terrain.height_offset = 0.5;
    settings
}

fn ground_at(map: &SharedHeightmap, x: f32, z: f32) -> f32 {
    use roadforge::GroundSampler;
    map.ground_height(x, z).unwrap_or(f32::NAN)
}

#[test]
fn test_terrain_follows_road_and_undo_restores_it() {
    let shared = terrain_map();
    let mut builder = RoadBuilder::new(terrain_settings(), RoadCatalog::default(), Box::new(shared.clone()))
        .with_terrain(Box::new(HeightmapTerrain::new(shared.clone())));
    assert_relative_eq!(ground_at(&shared, 0.0, 0.0), 2.0, epsilon = 1e-3);

    builder
        .construct_road(&road(&builder, Vec3::new(-20.0, 2.0, 0.0), Vec3::new(20.0, 2.0, 0.0)))
        .expect("Strasse");
    assert_relative_eq!(ground_at(&shared, 0.0, 0.0), 1.5, epsilon = 1e-3);
    assert!(builder.history().peek().and_then(|e| e.terrain.as_ref()).is_some());

    assert!(builder.undo_last_construction().expect("Undo"));
    assert_relative_eq!(ground_at(&shared, 0.0, 0.0), 2.0, epsilon = 1e-3);
}

#[test]
fn test_terrain_levels_intersection_area() {
    // Erste Strasse ohne Terrain-Anpassung, damit nur die Ecke das Gelände formt
    let mut plain = RoadBuilder::new(terrain_settings(), RoadCatalog::default(), Box::new(terrain_map()));
    plain
        .construct_road(&road(&plain, Vec3::new(-20.0, 2.0, 0.0), Vec3::new(20.0, 2.0, 0.0)))
        .expect("Strasse");

    let shared = terrain_map();
    let mut builder = RoadBuilder::new(terrain_settings(), RoadCatalog::default(), Box::new(shared.clone()))
        .with_terrain(Box::new(HeightmapTerrain::new(shared.clone())));
    builder.replace_system(plain.system().clone());

    builder
        .construct_road(&road(&builder, Vec3::new(20.0, 2.0, 0.0), Vec3::new(20.0, 2.0, 20.0)))
        .expect("Ecke");
    let corner = builder
        .system()
        .nodes()
        .find(|o| o.node_kind() == Some(NodeKind::Intersection))
        .and_then(|o| o.center())
        .expect("Kreuzung erwartet");
    assert_relative_eq!(corner.x, 20.0, epsilon = 1e-3);

    // Beide Punkte liegen mehr als eine halbe Breite von den gekürzten Strassen-Enden entfernt
    assert_relative_eq!(ground_at(&shared, 20.0, 0.0), 1.5, epsilon = 1e-3);
    assert_relative_eq!(ground_at(&shared, 22.0, -4.0), 1.5, epsilon = 1e-3);

    assert!(builder.undo_last_construction().expect("Undo"));
    assert_relative_eq!(ground_at(&shared, 20.0, 0.0), 2.0, epsilon = 1e-3);
    assert_relative_eq!(ground_at(&shared, 22.0, -4.0), 2.0, epsilon = 1e-3);
}

/// Temporäre Datei, die beim Verlassen des Tests (auch bei Panic) gelöscht wird.
struct TempFile(PathBuf);

impl TempFile {
    fn new(name: &str) -> Self {
        Self(std::env::temp_dir().join(format!("roadforge_{}_{}.json", name, std::process::id())))
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.0.exists() {
            let _ = std::fs::remove_file(&self.0);
        }
    }
}

#[test]
fn test_snapshot_round_trip_through_builder() {
    let file = TempFile::new("builder");
    let path = file.0.as_path();
    let mut builder = builder();
    builder
        .construct_road(&road(&builder, Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)))
        .expect("Strasse");
    builder
        .construct_road(&road(&builder, Vec3::new(20.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 20.0)))
        .expect("Strasse");
    builder.save_snapshot(path).expect("speicherbar");

    let mut loaded = self::builder();
    loaded.load_snapshot(path).expect("ladbar");

    assert_eq!(loaded.system().road_count(), 2);
    assert_eq!(loaded.system().node_count(), builder.system().node_count());
    assert!(loaded.history().is_empty());
    assert_eq!(loaded.phase(), ConstructionPhase::Idle);
}
