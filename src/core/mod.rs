//! Core-Domänentypen: Splines, Strassentypen, Szene-Objekte, RoadSystem,
//! Spatial-Index und Bodenhöhen.

pub mod batch;
pub mod bounds;
pub mod heightmap;
pub mod mesh;
pub mod road_system;
pub mod road_type;
/// Szene-Objekte des Strassennetzes
///
/// - SceneObject: ein Objekt mit Typ-Variante, Bounding-Box und Meshes
/// - RoadData/IntersectionData/…: Daten der einzelnen Varianten
/// - KnotData: transiente Sicht auf ein Strassen-Ende an einem Knoten
pub mod scene_object;
pub mod spatial;
pub mod spline;

pub use batch::{ConstructionObjects, UndoRecord};
pub use bounds::Aabb;
pub use heightmap::{
    sample_ground_batch, FlatGround, GroundSampler, Heightmap, SharedHeightmap, WorldBounds,
};
pub use mesh::{LodMesh, MeshBuilder, MeshPart, Vertex};
pub use road_system::{CommitError, RoadSystem};
pub use road_type::{LaneDescriptor, LaneKind, RoadCatalog, RoadDescriptor};
pub use scene_object::{
    Branch, ConnectionSlot, CustomData, EndpointLink, IntersectionData, KnotData, NodeKind,
    ObjectId, ObjectKind, ObjectLookup, RampData, RampSide, RoadData, RoundaboutData,
    RoundaboutDesign, SceneObject, SlotRef,
};
pub use spatial::SpatialIndex;
pub use spline::{Frame, Knot, NearestPoint, Spline, KNOT_EPSILON};
