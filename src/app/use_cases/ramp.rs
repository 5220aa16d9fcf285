//! Use-Case: Rampe (Abzweig) von einer durchgehenden Strasse.
//!
//! Die durchgehende Strasse wird um den Abzweigpunkt asymmetrisch geöffnet.
//! Jede Seite erhält mindestens `gap + w/2`; die stumpfe Seite zusätzlich den
//! Winkelzuschlag aus [`get_angle_distance`], die spitze Seite bleibt schmal.
//! Die Lücke überbrückt die Rampe selbst; die Rampenstrasse beginnt seitlich davon.

use std::sync::Arc;

use glam::Vec3;

use crate::app::construction::{ConstructionFail, ConstructionResultRamp, RoadGeometry};
use crate::app::graph::{relink_end, BatchContext};
use crate::app::overlap::{resolve_overlap, OverlapTarget};
use crate::app::validation::{check_ground, check_track_bounds, check_track_overlap};
use crate::core::{
    Branch, EndpointLink, GroundSampler, ObjectKind, RampData, RampSide, RoadData,
    RoadDescriptor, RoadSystem, SceneObject, Spline,
};
use crate::shared::spline_geometry::{
    angle_between_deg, calculate_tangents, flat, get_angle_distance, safe_normalize, TangentInput,
};
use crate::shared::ConstructionSettings;

use super::add_road::leaving_direction;
use super::{connect_road_ends, finish, ignored_near, overlap_targets};

#[derive(Debug, Clone)]
pub struct RampRequest {
    /// Abzweigpunkt auf der durchgehenden Strasse
    pub start: Vec3,
    pub end: Vec3,
    pub road: Arc<RoadDescriptor>,
    pub elevated: bool,
}

/// Überbrückung der Lücke zwischen Zulauf-Ende und Ablauf-Anfang.
pub(crate) fn bridge_gap(head_end: Vec3, head_direction: Vec3, tail_start: Vec3, tail_direction: Vec3) -> Spline {
    let length = head_end.distance(tail_start) / 3.0;
    Spline::from_tangents(head_end, head_direction * length, tail_start, -tail_direction * length)
}

/// Öffnung vor und hinter dem Abzweigpunkt, `angle_deg` zwischen
/// Fahrtrichtung und Rampe (0..=180°).
///
/// Jede Seite wird mit dem Gegenwinkel bemessen: die spitze Seite liegt
/// damit über 90° und bekommt nur die Basisöffnung, die stumpfe Seite den
/// Winkelzuschlag.
pub(crate) fn ramp_opening(gap: f32, through_width: f32, ramp_width: f32, angle_deg: f32) -> (f32, f32) {
    let angle = angle_deg.clamp(0.0, 180.0);
    let before = get_angle_distance(gap, through_width, ramp_width, angle);
    let after = get_angle_distance(gap, through_width, ramp_width, 180.0 - angle);
    (before, after)
}

/// Plant eine Rampe.
pub fn plan_ramp(
    system: &RoadSystem,
    ground: &dyn GroundSampler,
    settings: &ConstructionSettings,
    request: &RampRequest,
) -> ConstructionResultRamp {
    let mut ctx = BatchContext::new(system, settings);
    let start = resolve_overlap(system, request.start, settings);

    let OverlapTarget::Road {
        id: through_id,
        anchor: None,
    } = start.target
    else {
        log::warn!("Rampe braucht eine durchgehende Strasse am Startpunkt");
        ctx.fail(ConstructionFail::MissingConnection);
        return ConstructionResultRamp {
            result: finish(ctx, Vec::new()),
            ..Default::default()
        };
    };
    let Some(through) = system.get(through_id).cloned() else {
        ctx.fail(ConstructionFail::MissingConnection);
        return ConstructionResultRamp {
            result: finish(ctx, Vec::new()),
            ..Default::default()
        };
    };
    let Some(data) = through.as_road().cloned() else {
        ctx.fail(ConstructionFail::MissingConnection);
        return ConstructionResultRamp {
            result: finish(ctx, Vec::new()),
            ..Default::default()
        };
    };

    let frame = data.spline.frame(start.t);
    let ramp_direction = safe_normalize(flat(request.end - start.position));

    // Öffnung der durchgehenden Strasse
    let length = data.length.max(f32::EPSILON);
    let gap = settings.intersection_distance;
    let (open_before, open_after) = ramp_opening(
        gap,
        through.road.width(),
        request.road.width(),
        angle_between_deg(frame.forward, ramp_direction),
    );
    let t_before = start.t - open_before / length;
    let t_after = start.t + open_after / length;
    let pieces = if t_before > 0.0 && t_after < 1.0 {
        data.spline
            .sub_spline(0.0, t_before)
            .zip(data.spline.sub_spline(t_after, 1.0))
    } else {
        None
    };
    let Some((head, tail)) = pieces else {
        ctx.fail(ConstructionFail::IntersectionTrackLength);
        return ConstructionResultRamp {
            result: finish(ctx, Vec::new()),
            ..Default::default()
        };
    };

    let ramp_side = if ramp_direction.dot(frame.right) >= 0.0 {
        RampSide::Right
    } else {
        RampSide::Left
    };
    let side = match ramp_side {
        RampSide::Right => frame.right,
        RampSide::Left => -frame.right,
    };

    let gap_spline = bridge_gap(
        head.last_position(),
        head.end_direction(),
        tail.first_position(),
        tail.start_direction(),
    );

    // Rampenstrasse: beginnt seitlich der Fahrbahn, läuft schräg nach vorne aus
    let ramp_start = frame.position + side * (through.road.drive_width() * 0.5 + gap);
    let end = resolve_overlap(system, request.end, settings);
    let (tangent_out, tangent_in) = calculate_tangents(&TangentInput {
        start: ramp_start,
        end: end.position,
        start_direction: Some(safe_normalize(frame.forward + side)),
        end_direction: leaving_direction(&end, false).map(|d| -d),
        center: None,
        smooth_slope: false,
        tangent_length: settings.tangent_length,
    });
    let ramp_spline = Spline::from_tangents(ramp_start, tangent_out, end.position, tangent_in);

    let mut fails = Vec::new();
    check_track_bounds(&ramp_spline, settings, &mut fails);
    let mut targets = overlap_targets([&end]);
    targets.push(through_id);
    let ignore = ignored_near(system, targets);
    check_track_overlap(system, &ramp_spline, request.road.width(), &ignore, settings, &mut fails);
    check_ground(ground, &ramp_spline, &request.road, request.elevated, settings, &mut fails);

    // Objekte
    let ramp_id = ctx.allocate_id();
    let tail_id = ctx.allocate_id();
    let ramp_road_id = ctx.allocate_id();
    let root_id = data.split_original_id.unwrap_or(through_id);
    let root_spline = data
        .split_original_spline
        .clone()
        .unwrap_or_else(|| data.spline.clone());
    let old_end = data.end;
    let old_last = data.spline.last_index();
    let head_last = head.last_index();
    let tail_last = tail.last_index();

    let mut head_object = through.clone();
    if let Some(road) = head_object.as_road_mut() {
        road.set_spline(head);
        road.end = EndpointLink::Node { id: ramp_id };
        road.split_original_id = Some(root_id);
        road.split_original_spline = Some(root_spline.clone());
    }
    ctx.put(head_object);

    let mut tail_data = RoadData::new(tail, data.width);
    tail_data.start = EndpointLink::Node { id: ramp_id };
    tail_data.end = old_end;
    tail_data.split_original_id = Some(root_id);
    tail_data.split_original_spline = Some(root_spline);
    ctx.put(SceneObject::new(
        tail_id,
        Arc::clone(&through.road),
        through.elevated,
        ObjectKind::Road(tail_data),
    ));
    relink_end(&mut ctx, old_end, through_id, old_last, tail_id, tail_last);

    let mut ramp_data = RoadData::new(ramp_spline, request.road.width());
    ramp_data.ramp_road = true;
    ramp_data.start = EndpointLink::Node { id: ramp_id };
    ctx.put(SceneObject::new(
        ramp_road_id,
        Arc::clone(&request.road),
        request.elevated,
        ObjectKind::Road(ramp_data),
    ));

    ctx.put(SceneObject::new(
        ramp_id,
        Arc::clone(&through.road),
        through.elevated,
        ObjectKind::Ramp(RampData {
            center: frame.position,
            branches: vec![
                Branch::new(through_id, head_last),
                Branch::new(tail_id, 0),
                Branch::new(ramp_road_id, 0),
            ],
            ramp_side,
            gap_spline,
        }),
    ));
    log::debug!(
        "Rampe {} an Strasse {} ({:?}), Rampenstrasse {}",
        ramp_id,
        through_id,
        ramp_side,
        ramp_road_id
    );

    let ramp_road_id = connect_road_ends(&mut ctx, ramp_road_id, None, &end);
    let road_data = ctx
        .get(ramp_road_id)
        .and_then(SceneObject::as_road)
        .map(|r| RoadGeometry::from_spline(&r.spline));

    ConstructionResultRamp {
        result: finish(ctx, fails),
        ramp_id: Some(ramp_id),
        ramp_road_id: Some(ramp_road_id),
        road_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::use_cases::{plan_road, RoadRequest};
    use crate::core::{FlatGround, NodeKind, RoadCatalog};

    fn through_road() -> RoadSystem {
        let road = RoadCatalog::default().get("two_lane").expect("Typ erwartet");
        let planned = plan_road(
            &RoadSystem::new(),
            &FlatGround::new(0.0),
            &ConstructionSettings::default(),
            &RoadRequest::straight(Vec3::ZERO, Vec3::new(80.0, 0.0, 0.0), road),
        );
        RoadSystem::new()
            .applied(&planned.result.objects)
            .expect("Commit erwartet")
            .0
    }

    fn request(start: Vec3, end: Vec3) -> RampRequest {
        RampRequest {
            start,
            end,
            road: RoadCatalog::default().get("dirt").expect("Typ erwartet"),
            elevated: false,
        }
    }

    #[test]
    fn ramp_opens_through_road() {
        let system = through_road();
        let result = plan_ramp(
            &system,
            &FlatGround::new(0.0),
            &ConstructionSettings::default(),
            &request(Vec3::new(30.0, 0.0, 0.0), Vec3::new(55.0, 0.0, 25.0)),
        );
        assert!(!result.result.construction_failed(), "{:?}", result.result.construction_fails);

        let (next, _) = system.applied(&result.result.objects).expect("Commit erwartet");
        let ramp = next.get(result.ramp_id.expect("Rampe erwartet")).expect("Objekt erwartet");
        assert_eq!(ramp.node_kind(), Some(NodeKind::Ramp));
        assert_eq!(ramp.branches().len(), 3);
        let ramp_road = next
            .get(result.ramp_road_id.expect("Rampenstrasse erwartet"))
            .and_then(SceneObject::as_road)
            .expect("Strasse erwartet");
        assert!(ramp_road.ramp_road);
        // Zulauf, Ablauf, Rampenstrasse
        assert_eq!(next.road_count(), 3);
        assert!(next.check_symmetry().is_empty());
    }

    /// Öffnung (vor, hinter) dem Abzweigpunkt bei x = 30.
    fn planned_opening(end: Vec3) -> (f32, f32) {
        let system = through_road();
        let result = plan_ramp(
            &system,
            &FlatGround::new(0.0),
            &ConstructionSettings::default(),
            &request(Vec3::new(30.0, 0.0, 0.0), end),
        );
        let ramp_id = result.ramp_id.expect("Rampe erwartet");
        let Some(ObjectKind::Ramp(data)) = result.result.objects.pending(ramp_id).map(|o| &o.kind)
        else {
            panic!("Rampe erwartet");
        };
        (
            30.0 - data.gap_spline.first_position().x,
            data.gap_spline.last_position().x - 30.0,
        )
    }

    #[test]
    fn acute_side_of_forward_ramp_opens_less() {
        // 45° und etwa 63° nach vorne
        for end in [Vec3::new(55.0, 0.0, 25.0), Vec3::new(42.5, 0.0, 25.0)] {
            let (before, after) = planned_opening(end);
            assert!(after < before, "{end}: vor {before}, hinter {after}");
            // Spitze Seite: 1 m Abstand + halbe Breite
            assert!((after - 6.5).abs() < 0.1, "{end}: hinter {after}");
        }
    }

    #[test]
    fn steeper_ramp_narrows_obtuse_side() {
        let (flat_before, _) = planned_opening(Vec3::new(55.0, 0.0, 25.0));
        let (steep_before, _) = planned_opening(Vec3::new(42.5, 0.0, 25.0));
        assert!(steep_before < flat_before);
    }

    #[test]
    fn backward_ramp_swaps_acute_side() {
        let (before, after) = planned_opening(Vec3::new(5.0, 0.0, 25.0));
        assert!(before < after, "vor {before}, hinter {after}");
    }

    #[test]
    fn perpendicular_ramp_opens_symmetrically() {
        let (before, after) = ramp_opening(1.0, 11.0, 4.0, 90.0);
        assert_eq!(before, after);
        let (before, after) = ramp_opening(1.0, 11.0, 4.0, 45.0);
        // 45° * 4 m * 0,02 Zuschlag auf der stumpfen Seite
        assert!((before - 10.1).abs() < 1e-4);
        assert!((after - 6.5).abs() < 1e-4);
    }

    #[test]
    fn ramp_needs_through_road() {
        let result = plan_ramp(
            &RoadSystem::new(),
            &FlatGround::new(0.0),
            &ConstructionSettings::default(),
            &request(Vec3::new(30.0, 0.0, 0.0), Vec3::new(55.0, 0.0, 25.0)),
        );
        assert!(result.result.has_fail(ConstructionFail::MissingConnection));
        assert_eq!(result.ramp_id, None);
    }
}
