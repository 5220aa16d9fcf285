//! RoadForge: Konstruktions-Engine für Strassennetze.
//! Core-Funktionalität als Library exportiert für Tests und Wiederverwendung.

pub mod app;
pub mod core;
pub mod persistence;
pub mod shared;

pub use app::{
    CommandOutcome, ConstructionCommand, ConstructionFail, ConstructionPhase, ConstructionResult,
    CountingSink, DemolishRequest, FinalizedNetwork, HeightmapTerrain, MoveIntersectionRequest,
    RampRequest, ReverseRequest, RoadBuilder, RoadRequest, RoundaboutRequest, SceneSink,
    TerrainUndoCache, TerrainUpdater, WaypointGenerator,
};
pub use core::{
    Aabb, ConnectionSlot, EndpointLink, FlatGround, GroundSampler, Heightmap, NodeKind, ObjectId,
    ObjectKind, RoadCatalog, RoadDescriptor, RoadSystem, SceneObject, SharedHeightmap, Spline,
    WorldBounds,
};
pub use persistence::SerializedRoadSystem;
pub use shared::{ConstructionSettings, TerrainSettings};
