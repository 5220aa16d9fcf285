//! Geteilte, layer-neutrale Bausteine.
//!
//! Enthält die Konstruktions-Einstellungen und reine Geometrie-Funktionen,
//! die von `core` und `app` gleichermaßen genutzt werden.

pub mod options;
pub mod spline_geometry;

pub use options::{ConstructionSettings, TerrainSettings};
pub use options::{SNAP_HEIGHT, SNAP_RADIUS};
