//! Strassen-Mesh: Querprofil entlang der Mittellinie.

use crate::core::{EndpointLink, LodMesh, MeshBuilder, RoadData, SceneObject};
use crate::shared::ConstructionSettings;

use super::lanes::{closing_rectangles, sweep_lanes};
use super::segments_for;

pub(super) fn build(
    object: &SceneObject,
    data: &RoadData,
    settings: &ConstructionSettings,
    level: u8,
) -> LodMesh {
    let mut builder = MeshBuilder::new();
    let lanes = &object.road.lanes;
    let profile_width = object.road.width();
    let scale = if profile_width > f32::EPSILON {
        data.width / profile_width
    } else {
        1.0
    };

    let frames = data
        .spline
        .sample_frames(segments_for(&data.spline, settings, level));
    sweep_lanes(&mut builder, &frames, lanes, |_| scale);

    // Offene Enden ohne Knoten werden direkt verschlossen
    if data.start == EndpointLink::Free {
        if let Some(first) = frames.first() {
            closing_rectangles(&mut builder, first.position, first.right, lanes, -first.forward);
        }
    }
    if data.end == EndpointLink::Free {
        if let Some(last) = frames.last() {
            closing_rectangles(&mut builder, last.position, last.right, lanes, last.forward);
        }
    }

    LodMesh {
        level,
        parts: builder.finish(),
    }
}
