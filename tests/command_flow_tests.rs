use glam::Vec3;
use roadforge::{
    ConstructionCommand, ConstructionPhase, ConstructionSettings, FlatGround, RoadBuilder,
    RoadCatalog,
};

fn builder() -> RoadBuilder {
    RoadBuilder::new(
        ConstructionSettings::default(),
        RoadCatalog::default(),
        Box::new(FlatGround::new(0.0)),
    )
}

fn build_road(start: Vec3, end: Vec3, preview: bool) -> ConstructionCommand {
    ConstructionCommand::BuildRoad {
        start,
        end,
        road: "two_lane".to_string(),
        elevated: false,
        curve_center: None,
        continue_tangent: false,
        smooth_slope: false,
        preview,
    }
}

#[test]
fn test_preview_command_leaves_network_untouched() {
    let mut builder = builder();
    let outcome = builder
        .handle_command(build_road(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0), true))
        .expect("Vorschau");

    assert_eq!(outcome.phase, ConstructionPhase::Previewing);
    assert!(!outcome.committed());
    assert!(outcome.result.is_some());
    assert!(builder.system().is_empty());

    let outcome = builder.handle_command(ConstructionCommand::Cancel).expect("Abbruch");
    assert_eq!(outcome.phase, ConstructionPhase::Cancelled);
    assert_eq!(builder.state().command_log.len(), 2);
}

#[test]
fn test_build_reverse_and_undo_via_commands() {
    let mut builder = builder();
    let outcome = builder
        .handle_command(build_road(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0), false))
        .expect("Bau");
    assert!(outcome.committed());

    let road = builder.system().roads().next().map(|o| o.id).expect("Strasse erwartet");
    let outcome = builder
        .handle_command(ConstructionCommand::ReverseRoad {
            point: Vec3::new(10.0, 0.0, 1.0),
            radius: None,
        })
        .expect("Umkehren");
    assert!(outcome.committed());
    assert!(outcome
        .result
        .as_ref()
        .is_some_and(|r| r.replaced_roads.contains(&road)));
    let start = builder
        .system()
        .get(road)
        .and_then(|o| o.as_road())
        .map(|r| r.spline.first_position())
        .expect("Strasse erwartet");
    assert!((start.x - 20.0).abs() < 1e-3);

    builder.handle_command(ConstructionCommand::Undo).expect("Undo");
    builder.handle_command(ConstructionCommand::Undo).expect("Undo");
    assert!(builder.system().is_empty());
    assert_eq!(builder.phase(), ConstructionPhase::Idle);
}

#[test]
fn test_unknown_road_type_is_an_error() {
    let mut builder = builder();
    let command = ConstructionCommand::BuildRoad {
        start: Vec3::ZERO,
        end: Vec3::new(20.0, 0.0, 0.0),
        road: "autobahn".to_string(),
        elevated: false,
        curve_center: None,
        continue_tangent: false,
        smooth_slope: false,
        preview: false,
    };
    let err = builder.handle_command(command).expect_err("unbekannter Typ");
    assert!(format!("{err:#}").contains("autobahn"));
    assert!(builder.system().is_empty());
}

#[test]
fn test_command_log_replays_from_json() {
    let json = r#"[
        {"command": "build_road", "start": [0.0, 0.0, 0.0], "end": [20.0, 0.0, 0.0], "road": "two_lane"},
        {"command": "build_road", "start": [20.0, 0.0, 0.0], "end": [20.0, 0.0, 20.0], "road": "two_lane"},
        {"command": "move_intersection", "from": [20.0, 0.0, 20.5], "to": [22.0, 0.0, 22.0]},
        {"command": "demolish", "point": [20.0, 0.0, 12.0], "preview": true}
    ]"#;
    let commands: Vec<ConstructionCommand> = serde_json::from_str(json).expect("gültiges JSON");

    let mut builder = builder();
    let outcomes: Vec<_> = commands
        .into_iter()
        .map(|c| builder.handle_command(c).expect("Command"))
        .collect();

    assert!(outcomes[0].committed());
    assert!(outcomes[1].committed());
    assert!(outcomes[2].committed());
    assert_eq!(outcomes[3].phase, ConstructionPhase::Previewing);
    assert_eq!(builder.system().road_count(), 2);
    assert_eq!(builder.history().len(), 3);

    let logged = builder.state().command_log.to_json().expect("serialisierbar");
    assert!(logged.contains("\"command\": \"demolish\""));
}
