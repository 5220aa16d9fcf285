//! Use-Case: Knoten verschieben.
//!
//! Der Knoten wird über den Ausgangspunkt und einen Suchradius gefunden.
//! Das Zentrum und alle Ast-Enden wandern um denselben Versatz; die Strassen
//! behalten ihr fernes Ende. Abgeleitete Kurven (Ring, Lücken-Überbrückung)
//! werden aus der neuen Lage neu aufgebaut.

use glam::Vec3;
use indexmap::IndexSet;

use crate::app::construction::{ConstructionFail, ConstructionResultMoveIntersection};
use crate::app::graph::{set_road_spline, BatchContext};
use crate::app::overlap::{resolve_overlap_within, OverlapTarget};
use crate::app::validation::{check_ground, check_track_bounds, check_track_overlap};
use crate::core::{Branch, GroundSampler, ObjectId, ObjectKind, RoadSystem, SceneObject, Spline};
use crate::shared::ConstructionSettings;

use super::ramp::bridge_gap;
use super::roundabout::RING_KNOTS;
use super::finish;

#[derive(Debug, Clone, Copy)]
pub struct MoveIntersectionRequest {
    /// Punkt am bestehenden Knoten
    pub from: Vec3,
    /// Suchradius; ohne Angabe `snap_radius`
    pub radius: Option<f32>,
    /// Neues Zentrum
    pub to: Vec3,
}

impl MoveIntersectionRequest {
    pub fn new(from: Vec3, to: Vec3) -> Self {
        Self {
            from,
            radius: None,
            to,
        }
    }
}

/// Verschiebt die Enden aller Äste einer Strasse an diesem Knoten.
fn move_branch_ends(ctx: &mut BatchContext<'_>, road_id: ObjectId, branches: &[Branch], delta: Vec3) {
    let Some(road) = ctx.get(road_id).and_then(SceneObject::as_road) else {
        return;
    };
    let mut spline = road.spline.clone();
    for branch in branches.iter().filter(|b| b.road == road_id) {
        let Some(knot) = spline.knot(branch.knot_index) else {
            continue;
        };
        let target = knot.position + delta;
        spline = spline.with_moved_end(branch.knot_index, target);
    }
    set_road_spline(ctx, road_id, spline);
}

/// Plant das Verschieben eines Knotens.
pub fn plan_move_intersection(
    system: &RoadSystem,
    ground: &dyn GroundSampler,
    settings: &ConstructionSettings,
    request: &MoveIntersectionRequest,
) -> ConstructionResultMoveIntersection {
    let mut ctx = BatchContext::new(system, settings);
    let hit = resolve_overlap_within(system, request.from, request.radius, settings);
    let node = match hit.target {
        OverlapTarget::Node { id, .. } => system.get(id).cloned(),
        _ => None,
    };
    let Some(mut node) = node else {
        log::warn!("Verschieben: kein Knoten bei {:?}", request.from);
        ctx.fail(ConstructionFail::MissingConnection);
        return ConstructionResultMoveIntersection {
            result: finish(ctx, Vec::new()),
            intersection_id: None,
        };
    };
    if let ObjectKind::Intersection(data) = &node.kind {
        if data.snap.is_some() {
            // Eingerastete Knoten hängen am externen Objekt fest
            ctx.fail(ConstructionFail::MissingConnection);
            return ConstructionResultMoveIntersection {
                result: finish(ctx, Vec::new()),
                intersection_id: Some(node.id),
            };
        }
    }
    let node_id = node.id;

    let Some(center) = node.center() else {
        ctx.fail(ConstructionFail::MissingConnection);
        return ConstructionResultMoveIntersection {
            result: finish(ctx, Vec::new()),
            intersection_id: None,
        };
    };
    let delta = request.to - center;
    let branches = node.branches().to_vec();
    let roads: IndexSet<ObjectId> = branches.iter().map(|b| b.road).collect();
    log::debug!(
        "Verschiebe {} {} um {:?} ({} Äste)",
        node.kind_name(),
        node_id,
        delta,
        branches.len()
    );

    for road in &roads {
        move_branch_ends(&mut ctx, *road, &branches, delta);
    }

    match &mut node.kind {
        ObjectKind::Intersection(data) => data.center = request.to,
        ObjectKind::Roundabout(data) => {
            data.center = request.to;
            data.ring = Spline::circle(request.to, data.radius, RING_KNOTS);
        }
        ObjectKind::Ramp(data) => {
            data.center = request.to;
            let head = data.branches.first().and_then(|b| ctx.get(b.road)).and_then(SceneObject::as_road);
            let tail = data.branches.get(1).and_then(|b| ctx.get(b.road)).and_then(SceneObject::as_road);
            if let (Some(head), Some(tail)) = (head, tail) {
                data.gap_spline = bridge_gap(
                    head.spline.last_position(),
                    head.spline.end_direction(),
                    tail.spline.first_position(),
                    tail.spline.start_direction(),
                );
            }
        }
        ObjectKind::Road(_) | ObjectKind::Custom(_) => {}
    }
    ctx.put(node);

    // Geänderte Strassen prüfen
    let mut ignore: IndexSet<ObjectId> = IndexSet::new();
    ignore.insert(node_id);
    for road in &roads {
        ignore.insert(*road);
        ignore.extend(system.connections_of(*road));
    }
    let mut fails = Vec::new();
    for road in &roads {
        let Some(object) = ctx.get(*road) else {
            continue;
        };
        let Some(data) = object.as_road() else {
            continue;
        };
        check_track_bounds(&data.spline, settings, &mut fails);
        check_track_overlap(system, &data.spline, data.width, &ignore, settings, &mut fails);
        check_ground(ground, &data.spline, &object.road, object.elevated, settings, &mut fails);
    }

    ConstructionResultMoveIntersection {
        result: finish(ctx, fails),
        intersection_id: Some(node_id),
    }
}
