//! RoadForge Kommandozeile.
//!
//! `roadforge [optionen.toml] [netz.json] [commands.json]`
//!
//! Lädt Einstellungen, Katalog und Netz, spielt optional ein Command-Log ab
//! (und speichert das Netz danach zurück) und gibt einen Bericht aus.

use std::path::{Path, PathBuf};

use anyhow::Context;
use roadforge::{
    ConstructionCommand, ConstructionSettings, FinalizedNetwork, FlatGround, NodeKind,
    RoadBuilder, RoadCatalog,
};

/// Katalog-Datei neben den Optionen.
const CATALOG_FILE: &str = "roadforge_catalog.toml";

fn main() -> anyhow::Result<()> {
    // Logger initialisieren
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("RoadForge v{} startet...", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let options_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(ConstructionSettings::config_path);
    let snapshot_path = args.next().map(PathBuf::from);
    let commands_path = args.next().map(PathBuf::from);

    let settings = ConstructionSettings::load_from_file(&options_path);
    let catalog = load_catalog(&options_path)?;
    let mut builder = RoadBuilder::new(settings, catalog, Box::new(FlatGround::new(0.0)));

    if let Some(path) = snapshot_path.as_deref().filter(|p| p.exists()) {
        builder.load_snapshot(path)?;
    }

    if let Some(path) = commands_path.as_deref() {
        replay(&mut builder, path)?;
        if let Some(snapshot) = snapshot_path.as_deref() {
            builder.save_snapshot(snapshot)?;
        }
    }

    report(&builder);
    let broken = builder.system().check_symmetry();
    anyhow::ensure!(
        broken.is_empty(),
        "Netz inkonsistent: {} Verbindungen ohne Gegenstück",
        broken.len()
    );
    Ok(())
}

fn load_catalog(options_path: &Path) -> anyhow::Result<RoadCatalog> {
    let path = options_path
        .parent()
        .map(|dir| dir.join(CATALOG_FILE))
        .unwrap_or_else(|| PathBuf::from(CATALOG_FILE));
    if path.exists() {
        RoadCatalog::load_from_file(&path)
    } else {
        log::info!("Kein Katalog unter {}, verwende eingebauten", path.display());
        Ok(RoadCatalog::default())
    }
}

fn replay(builder: &mut RoadBuilder, path: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Commands nicht lesbar: {}", path.display()))?;
    let commands: Vec<ConstructionCommand> = serde_json::from_str(&json)
        .with_context(|| format!("Commands fehlerhaft: {}", path.display()))?;

    let mut committed = 0;
    for (index, command) in commands.into_iter().enumerate() {
        let label = command.label();
        let outcome = builder
            .handle_command(command)
            .with_context(|| format!("Command {} ('{}')", index + 1, label))?;
        if outcome.committed() {
            committed += 1;
        }
    }
    log::info!(
        "{} von {} Commands übernommen",
        committed,
        builder.state().command_log.len()
    );
    Ok(())
}

fn report(builder: &RoadBuilder) {
    let system = builder.system();
    let count = |kind: NodeKind| system.nodes().filter(|o| o.node_kind() == Some(kind)).count();
    let triangles: usize = system
        .objects()
        .filter_map(|o| o.lods.first())
        .map(|lod| lod.triangle_count())
        .sum();
    let length: f32 = system.roads().filter_map(|o| o.as_road()).map(|r| r.length).sum();

    println!("Strassen:        {} ({:.1} m)", system.road_count(), length);
    println!("Kreuzungen:      {}", count(NodeKind::Intersection));
    println!("Strassen-Enden:  {}", count(NodeKind::EndCap));
    println!("Kreisverkehre:   {}", count(NodeKind::Roundabout));
    println!("Rampen:          {}", count(NodeKind::Ramp));
    println!("Dreiecke (LOD0): {}", triangles);
    println!("Fahrspuren:      {}", FinalizedNetwork::from_system(system).lane_count());
    println!("Undo-Schritte:   {}", builder.history().len());
}
