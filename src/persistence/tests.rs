use glam::Vec3;

use super::*;
use crate::app::use_cases::{plan_road, RoadRequest};
use crate::core::{EndpointLink, FlatGround};

fn corner_system() -> RoadSystem {
    let settings = ConstructionSettings::default();
    let road = RoadCatalog::default().get("two_lane").expect("Typ erwartet");
    let ground = FlatGround::new(0.0);
    let mut system = RoadSystem::new();
    for (a, b) in [
        (Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)),
        (Vec3::new(20.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 20.0)),
    ] {
        let planned = plan_road(&system, &ground, &settings, &RoadRequest::straight(a, b, road.clone()));
        system = system.applied(&planned.result.objects).expect("Commit erwartet").0;
    }
    system
}

#[test]
fn json_round_trip_rebuilds_identical_topology() {
    let system = corner_system();
    let json = SerializedRoadSystem::from_system(&system)
        .to_json()
        .expect("serialisierbar");
    let loaded = SerializedRoadSystem::from_json(&json)
        .expect("lesbar")
        .rebuild(&RoadCatalog::default(), &ConstructionSettings::default())
        .expect("Wiederaufbau erwartet");

    assert_eq!(loaded.len(), system.len());
    assert_eq!(loaded.next_id(), system.next_id());
    for object in system.objects() {
        let other = loaded.get(object.id).expect("Objekt erwartet");
        assert_eq!(other.kind, object.kind);
        assert_eq!(other.road.name, object.road.name);
        assert!(!other.lods.is_empty());
        assert!(!other.bounds.is_empty());
    }
    assert!(loaded.check_symmetry().is_empty());
}

#[test]
fn records_are_tagged_by_type() {
    let json = SerializedRoadSystem::from_system(&corner_system())
        .to_json()
        .expect("serialisierbar");
    assert!(json.contains("\"type\": \"road\""));
    assert!(json.contains("\"type\": \"intersection\""));
    assert!(json.contains("\"road_type\": \"two_lane\""));
}

#[test]
fn unknown_road_type_is_rejected() {
    let mut snapshot = SerializedRoadSystem::from_system(&corner_system());
    if let Some(SerializedObject::Road(road)) = snapshot.objects.first_mut() {
        road.road_type = "autobahn".to_string();
    }
    let err = snapshot
        .rebuild(&RoadCatalog::default(), &ConstructionSettings::default())
        .expect_err("unbekannter Typ");
    assert!(format!("{err:#}").contains("autobahn"));
}

#[test]
fn dangling_link_is_rejected() {
    let mut snapshot = SerializedRoadSystem::from_system(&corner_system());
    let road = snapshot
        .objects
        .iter_mut()
        .find_map(|o| match o {
            SerializedObject::Road(r) => Some(r),
            _ => None,
        })
        .expect("Strasse erwartet");
    road.end = EndpointLink::Node { id: ObjectId(999) };

    assert!(snapshot
        .rebuild(&RoadCatalog::default(), &ConstructionSettings::default())
        .is_err());
}

/// Löscht die Datei beim Verlassen des Tests, auch nach fehlgeschlagenen Asserts.
struct RemoveOnDrop(std::path::PathBuf);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if self.0.exists() {
            let _ = std::fs::remove_file(&self.0);
        }
    }
}

#[test]
fn file_round_trip() {
    let file = RemoveOnDrop(
        std::env::temp_dir().join(format!("roadforge_snapshot_{}.json", std::process::id())),
    );
    let path = file.0.as_path();
    let system = corner_system();
    save_to_file(&system, path).expect("speicherbar");
    let loaded = load_from_file(path, &RoadCatalog::default(), &ConstructionSettings::default())
        .expect("ladbar");

    assert_eq!(loaded.road_count(), system.road_count());
    assert_eq!(loaded.node_count(), system.node_count());
}
