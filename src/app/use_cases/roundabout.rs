//! Use-Case: Kreisverkehr an einer Kreuzung, einem Strassen-Ende oder mitten
//! auf einer Strasse einsetzen.

use std::sync::Arc;

use glam::Vec3;

use crate::app::construction::{ConstructionFail, ConstructionResultRoundabout};
use crate::app::graph::{roundabout_clearance, shorten_branch, split_road, BatchContext};
use crate::app::overlap::{resolve_overlap, OverlapTarget};
use crate::app::validation::{check_ground, check_track_overlap};
use crate::core::{
    GroundSampler, KnotData, NodeKind, ObjectId, ObjectKind, RoadDescriptor, RoadSystem,
    RoundaboutData, RoundaboutDesign, SceneObject, Spline,
};
use crate::shared::ConstructionSettings;

use super::{finish, ignored_near};

/// Knoten der Ring-Kurve.
pub(crate) const RING_KNOTS: usize = 8;

#[derive(Debug, Clone)]
pub struct RoundaboutRequest {
    pub center: Vec3,
    /// Ohne Angabe: `roundabout_radius` aus den Einstellungen
    pub radius: Option<f32>,
    /// Strassentyp des Rings (muss eine Einbahnstrasse sein)
    pub road: Arc<RoadDescriptor>,
    pub design: RoundaboutDesign,
}

impl RoundaboutRequest {
    pub fn new(center: Vec3, road: Arc<RoadDescriptor>) -> Self {
        Self {
            center,
            radius: None,
            road,
            design: RoundaboutDesign::Default,
        }
    }
}

/// Ersetzt einen Knoten durch einen Kreisverkehr mit denselben Ästen.
fn convert_node(
    ctx: &mut BatchContext<'_>,
    node_id: ObjectId,
    request: &RoundaboutRequest,
    radius: f32,
) -> Option<ObjectId> {
    let mut node = ctx.cloned(node_id)?;
    let ObjectKind::Intersection(data) = &node.kind else {
        ctx.fail(ConstructionFail::OverlapIntersection);
        return None;
    };
    if data.snap.is_some() {
        // Ein eingerasteter Knoten liegt an einem externen Objekt fest
        ctx.fail(ConstructionFail::OverlapIntersection);
        return None;
    }
    let center = data.center;
    let branches = data.branches.clone();

    node.road = Arc::clone(&request.road);
    node.kind = ObjectKind::Roundabout(RoundaboutData {
        center,
        radius,
        design: request.design,
        branches: branches.clone(),
        ring: Spline::circle(center, radius, RING_KNOTS),
    });
    let need = roundabout_clearance(&node, radius, ctx.settings.intersection_distance);
    ctx.put(node);

    let knots: Vec<KnotData> = branches
        .iter()
        .filter_map(|b| KnotData::from_branch(&*ctx, *b))
        .collect();
    for knot in knots {
        if !shorten_branch(ctx, &knot, center, need) {
            break;
        }
    }
    Some(node_id)
}

/// Plant einen Kreisverkehr.
pub fn plan_roundabout(
    system: &RoadSystem,
    ground: &dyn GroundSampler,
    settings: &ConstructionSettings,
    request: &RoundaboutRequest,
) -> ConstructionResultRoundabout {
    let mut ctx = BatchContext::new(system, settings);
    let radius = request.radius.unwrap_or(settings.roundabout_radius);
    let invalid = |ctx: BatchContext<'_>| ConstructionResultRoundabout {
        result: finish(ctx, Vec::new()),
        roundabout_id: None,
        design: request.design,
    };

    if !request.road.one_way {
        log::warn!("Kreisverkehr mit '{}' abgelehnt: keine Einbahnstrasse", request.road.name);
        ctx.fail(ConstructionFail::OneWayRequired);
        return invalid(ctx);
    }

    let overlap = resolve_overlap(system, request.center, settings);
    let node_id = match overlap.target {
        OverlapTarget::Node {
            id,
            kind: NodeKind::Intersection | NodeKind::EndCap,
        } => id,
        OverlapTarget::Road { id, anchor: None } => {
            let split = system
                .get(id)
                .and_then(SceneObject::as_road)
                .and_then(|r| r.spline.split(overlap.t));
            let (Some(object), Some((first, second))) = (system.get(id).cloned(), split) else {
                ctx.fail(ConstructionFail::MissingConnection);
                return invalid(ctx);
            };
            match split_road(&mut ctx, &object, first, second) {
                Some((node, _)) => node,
                None => {
                    ctx.fail(ConstructionFail::MissingConnection);
                    return invalid(ctx);
                }
            }
        }
        OverlapTarget::Node { .. } => {
            ctx.fail(ConstructionFail::OverlapIntersection);
            return invalid(ctx);
        }
        OverlapTarget::Nothing | OverlapTarget::Slot { .. } | OverlapTarget::Road { .. } => {
            ctx.fail(ConstructionFail::MissingConnection);
            return invalid(ctx);
        }
    };

    let Some(roundabout_id) = convert_node(&mut ctx, node_id, request, radius) else {
        return invalid(ctx);
    };

    // Fläche des Rings gegen fremde Objekte und Boden prüfen
    let mut fails = Vec::new();
    if let Some(ObjectKind::Roundabout(data)) = ctx.get(roundabout_id).map(|o| &o.kind) {
        let ring = data.ring.clone();
        let ring_width = request.road.width();
        let mut ignore = ignored_near(system, overlap.target_id());
        ignore.insert(node_id);
        for branch in &data.branches {
            ignore.insert(branch.road);
            ignore.extend(system.connections_of(branch.road));
        }
        check_track_overlap(system, &ring, ring_width, &ignore, settings, &mut fails);
        check_ground(ground, &ring, &request.road, false, settings, &mut fails);
    }

    ConstructionResultRoundabout {
        result: finish(ctx, fails),
        roundabout_id: Some(roundabout_id),
        design: request.design,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::use_cases::{plan_road, RoadRequest};
    use crate::core::{FlatGround, RoadCatalog};

    fn straight_road(length: f32) -> RoadSystem {
        let road = RoadCatalog::default().get("two_lane").expect("Typ erwartet");
        let planned = plan_road(
            &RoadSystem::new(),
            &FlatGround::new(0.0),
            &ConstructionSettings::default(),
            &RoadRequest::straight(Vec3::ZERO, Vec3::new(length, 0.0, 0.0), road),
        );
        RoadSystem::new()
            .applied(&planned.result.objects)
            .expect("Commit erwartet")
            .0
    }

    #[test]
    fn two_way_ring_is_rejected() {
        let system = straight_road(60.0);
        let request = RoundaboutRequest::new(
            Vec3::new(30.0, 0.0, 0.0),
            RoadCatalog::default().get("two_lane").expect("Typ erwartet"),
        );
        let result = plan_roundabout(&system, &FlatGround::new(0.0), &ConstructionSettings::default(), &request);
        assert!(result.result.has_fail(ConstructionFail::OneWayRequired));
        assert_eq!(result.roundabout_id, None);
    }

    #[test]
    fn roundabout_splits_road_and_trims_both_halves() {
        let system = straight_road(60.0);
        let request = RoundaboutRequest::new(
            Vec3::new(30.0, 0.0, 0.0),
            RoadCatalog::default().get("one_way").expect("Typ erwartet"),
        );
        let result = plan_roundabout(&system, &FlatGround::new(0.0), &ConstructionSettings::default(), &request);
        assert!(!result.result.construction_failed(), "{:?}", result.result.construction_fails);

        let (next, _) = system.applied(&result.result.objects).expect("Commit erwartet");
        let id = result.roundabout_id.expect("Kreisverkehr erwartet");
        let roundabout = next.get(id).expect("Objekt erwartet");
        assert_eq!(roundabout.node_kind(), Some(NodeKind::Roundabout));
        assert_eq!(roundabout.branches().len(), 2);
        assert_eq!(next.road_count(), 2);
        // Radius 12 + halbe Fahrbahn 2,5 + Rand 1 + Lücke 1
        for road in next.roads().filter_map(SceneObject::as_road) {
            assert!((road.length - 13.5).abs() < 0.1, "Länge {}", road.length);
        }
        assert!(next.check_symmetry().is_empty());
    }

    #[test]
    fn nothing_under_center_is_missing_connection() {
        let request = RoundaboutRequest::new(
            Vec3::new(100.0, 0.0, 100.0),
            RoadCatalog::default().get("one_way").expect("Typ erwartet"),
        );
        let result = plan_roundabout(
            &RoadSystem::new(),
            &FlatGround::new(0.0),
            &ConstructionSettings::default(),
            &request,
        );
        assert!(result.result.has_fail(ConstructionFail::MissingConnection));
    }
}
