//! Application-Layer: Konstruktions-Pipeline, Controller, State und Use-Cases.

pub mod command_log;
pub mod construction;
pub mod controller;
pub mod creators;
pub mod events;
pub mod graph;
pub mod history;
/// Overlap-Auflösung von Platzierungspunkten
pub mod overlap;
pub mod sink;
/// Builder-Zustand (Phasen, Vorschau, Command-Log)
pub mod state;
pub mod terrain;
pub mod traffic;
pub mod use_cases;
pub mod validation;

pub use command_log::CommandLog;
pub use construction::{
    ConstructionFail, ConstructionObjectsSummary, ConstructionResult, ConstructionResultDemolish,
    ConstructionResultMoveIntersection, ConstructionResultRamp, ConstructionResultReverse,
    ConstructionResultRoad, ConstructionResultRoundabout, RoadGeometry,
};
pub use controller::RoadBuilder;
pub use events::{CommandOutcome, ConstructionCommand};
pub use history::{ConstructionHistory, ConstructionUndo};
pub use overlap::{resolve_overlap, resolve_overlap_within, Overlap, OverlapTarget};
pub use sink::{CountingSink, SceneSink};
pub use state::{BuilderState, ConstructionPhase};
pub use terrain::{HeightmapTerrain, TerrainUndoCache, TerrainUpdater};
pub use traffic::{FinalizedNetwork, FinalizedNode, FinalizedRoad, WaypointGenerator, WaypointLane};
pub use use_cases::{
    DemolishRequest, MoveIntersectionRequest, RampRequest, ReverseRequest, RoadRequest,
    RoundaboutRequest,
};
