//! Use-Case: Fahrtrichtung einer Strasse umkehren.

use glam::Vec3;

use crate::app::construction::{ConstructionFail, ConstructionResultReverse};
use crate::app::graph::BatchContext;
use crate::app::overlap::{resolve_overlap_within, OverlapTarget};
use crate::core::{Branch, EndpointLink, NodeKind, ObjectId, RoadSystem, SceneObject};
use crate::shared::ConstructionSettings;

use super::finish;

#[derive(Debug, Clone, Copy)]
pub struct ReverseRequest {
    /// Punkt auf oder nahe der Strasse
    pub point: Vec3,
    /// Suchradius; ohne Angabe `snap_radius`
    pub radius: Option<f32>,
}

impl ReverseRequest {
    pub fn at(point: Vec3) -> Self {
        Self { point, radius: None }
    }
}

/// Strasse unter dem Punkt; ein Abschluss steht für seine einzige Strasse.
fn find_road(system: &RoadSystem, settings: &ConstructionSettings, request: &ReverseRequest) -> Option<ObjectId> {
    let hit = resolve_overlap_within(system, request.point, request.radius, settings);
    match hit.target {
        OverlapTarget::Road { id, .. } => Some(id),
        OverlapTarget::Node {
            id,
            kind: NodeKind::EndCap,
        } => system.get(id).and_then(|o| o.branches().first()).map(|b| b.road),
        _ => None,
    }
}

/// Tauscht die Ast-Indizes einer Strasse an einem Knoten (`0 ↔ last`).
fn swap_branch_indices(ctx: &mut BatchContext<'_>, node_id: ObjectId, road_id: ObjectId, last: usize) {
    let Some(mut node) = ctx.cloned(node_id) else {
        return;
    };
    let Some(branches) = node.branches_mut() else {
        return;
    };
    for branch in branches.iter_mut().filter(|b| b.road == road_id) {
        let flipped = if branch.knot_index == 0 { last } else { 0 };
        *branch = Branch::new(road_id, flipped);
    }
    ctx.put(node);
}

/// Plant die Umkehr einer Strasse.
///
/// Kurve und Endpunkt-Verweise werden getauscht; die Knoten an beiden Enden
/// erhalten die gespiegelten Ast-Indizes. Eingerastete Slots bleiben belegt.
pub fn plan_reverse(
    system: &RoadSystem,
    settings: &ConstructionSettings,
    request: &ReverseRequest,
) -> ConstructionResultReverse {
    let mut ctx = BatchContext::new(system, settings);
    let road_id = find_road(system, settings, request);
    let Some((road_id, road)) =
        road_id.and_then(|id| system.get(id).and_then(SceneObject::as_road).cloned().map(|r| (id, r)))
    else {
        log::debug!("Umkehren: keine Strasse bei {:?}", request.point);
        ctx.fail(ConstructionFail::MissingConnection);
        return ConstructionResultReverse {
            result: finish(ctx, Vec::new()),
            road_id: None,
        };
    };

    let last = road.spline.last_index();
    let (start, end) = (road.start, road.end);
    ctx.update_road(road_id, |data| {
        data.set_spline(road.spline.reversed());
        data.start = end;
        data.end = start;
        data.split_original_spline = data.split_original_spline.as_ref().map(|s| s.reversed());
    });

    let mut nodes: Vec<ObjectId> = Vec::new();
    for link in [start, end] {
        if let EndpointLink::Node { id } = link {
            if !nodes.contains(&id) {
                nodes.push(id);
            }
        }
    }
    // Schleifen an einem Knoten: beide Indizes gleichzeitig tauschen
    for node in nodes {
        swap_branch_indices(&mut ctx, node, road_id, last);
    }
    log::debug!("Strasse {} umgekehrt", road_id);

    ConstructionResultReverse {
        result: finish(ctx, Vec::new()),
        road_id: Some(road_id),
    }
}
