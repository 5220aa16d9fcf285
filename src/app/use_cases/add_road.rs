//! Use-Case: Strasse zwischen zwei Punkten bauen.

use std::sync::Arc;

use glam::Vec3;

use crate::app::construction::{ConstructionResultRoad, RoadGeometry};
use crate::app::graph::BatchContext;
use crate::app::overlap::{resolve_overlap, Overlap, OverlapTarget};
use crate::app::validation::{check_ground, check_track_bounds, check_track_overlap};
use crate::core::{GroundSampler, NodeKind, ObjectKind, RoadData, RoadDescriptor, RoadSystem, SceneObject, Spline};
use crate::shared::spline_geometry::{calculate_tangents, TangentInput};
use crate::shared::ConstructionSettings;

use super::{connect_road_ends, finish, ignored_near, overlap_targets};

/// Anfrage für eine neue Strasse.
#[derive(Debug, Clone)]
pub struct RoadRequest {
    pub start: Vec3,
    pub end: Vec3,
    pub road: Arc<RoadDescriptor>,
    pub elevated: bool,
    /// Kontrollpunkt einer gebogenen Strasse
    pub curve_center: Option<Vec3>,
    /// Am Strassen-Ende in dessen Richtung weiterbauen
    pub continue_tangent: bool,
    pub smooth_slope: bool,
}

impl RoadRequest {
    /// Gerade, ebenerdige Strasse.
    pub fn straight(start: Vec3, end: Vec3, road: Arc<RoadDescriptor>) -> Self {
        Self {
            start,
            end,
            road,
            elevated: false,
            curve_center: None,
            continue_tangent: false,
            smooth_slope: false,
        }
    }

    pub fn curved(mut self, center: Vec3) -> Self {
        self.curve_center = Some(center);
        self
    }

    pub fn elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }
}

/// Richtung, in der eine Strasse den Overlap-Punkt verlässt (falls vorgegeben).
///
/// Slots geben ihre Richtung immer vor, Strassen-Enden nur beim Weiterbauen.
pub(crate) fn leaving_direction(overlap: &Overlap, continue_tangent: bool) -> Option<Vec3> {
    match overlap.target {
        OverlapTarget::Slot { .. } => overlap.tangent(),
        OverlapTarget::Node {
            kind: NodeKind::EndCap,
            ..
        } if continue_tangent => overlap.tangent(),
        _ => None,
    }
}

/// Mittellinie zwischen zwei aufgelösten Punkten.
pub(crate) fn road_spline(
    start: &Overlap,
    end: &Overlap,
    curve_center: Option<Vec3>,
    continue_tangent: bool,
    smooth_slope: bool,
    settings: &ConstructionSettings,
) -> Spline {
    let (tangent_out, tangent_in) = calculate_tangents(&TangentInput {
        start: start.position,
        end: end.position,
        start_direction: leaving_direction(start, continue_tangent),
        end_direction: leaving_direction(end, false).map(|d| -d),
        center: curve_center,
        smooth_slope,
        tangent_length: settings.tangent_length,
    });
    Spline::from_tangents(start.position, tangent_out, end.position, tangent_in)
}

/// Plant eine Strasse: Kurve, Prüfungen, Anschlüsse und Kreuzungs-Abstände.
pub fn plan_road(
    system: &RoadSystem,
    ground: &dyn GroundSampler,
    settings: &ConstructionSettings,
    request: &RoadRequest,
) -> ConstructionResultRoad {
    let start = resolve_overlap(system, request.start, settings);
    let end = resolve_overlap(system, request.end, settings);
    let spline = road_spline(
        &start,
        &end,
        request.curve_center,
        request.continue_tangent,
        request.smooth_slope,
        settings,
    );
    log::debug!(
        "Strasse {:?} → {:?}: Länge {:.2}, Ziele {:?} / {:?}",
        start.position,
        end.position,
        spline.length(),
        start.target,
        end.target
    );

    let mut fails = Vec::new();
    check_track_bounds(&spline, settings, &mut fails);
    let ignore = ignored_near(system, overlap_targets([&start, &end]));
    check_track_overlap(system, &spline, request.road.width(), &ignore, settings, &mut fails);
    check_ground(ground, &spline, &request.road, request.elevated, settings, &mut fails);

    let mut ctx = BatchContext::new(system, settings);
    let road_id = ctx.allocate_id();
    ctx.put(SceneObject::new(
        road_id,
        Arc::clone(&request.road),
        request.elevated,
        ObjectKind::Road(RoadData::new(spline, request.road.width())),
    ));
    let road_id = connect_road_ends(&mut ctx, road_id, Some(&start), &end);
    let road_data = ctx
        .get(road_id)
        .and_then(SceneObject::as_road)
        .map(|r| RoadGeometry::from_spline(&r.spline));

    ConstructionResultRoad {
        result: finish(ctx, fails),
        road_id: Some(road_id),
        road_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FlatGround, RoadCatalog};
    use approx::assert_relative_eq;

    fn request(start: Vec3, end: Vec3) -> RoadRequest {
        RoadRequest::straight(start, end, RoadCatalog::default().get("two_lane").expect("Typ erwartet"))
    }

    #[test]
    fn single_road_on_empty_system() {
        let system = RoadSystem::new();
        let result = plan_road(
            &system,
            &FlatGround::new(0.0),
            &ConstructionSettings::default(),
            &request(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)),
        );
        assert!(!result.result.construction_failed());
        assert_eq!(result.result.new_roads.len(), 1);
        // Zwei Abschlüsse
        assert_eq!(result.result.new_intersections.len(), 2);
        let geometry = result.road_data.expect("Geometrie erwartet");
        assert_relative_eq!(geometry.length, 20.0, epsilon = 1e-3);
    }

    #[test]
    fn too_short_road_is_rejected() {
        let result = plan_road(
            &RoadSystem::new(),
            &FlatGround::new(0.0),
            &ConstructionSettings::default(),
            &request(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)),
        );
        assert!(result.result.construction_failed());
        assert!(result.result.has_fail(crate::app::construction::ConstructionFail::TrackLength));
    }

    #[test]
    fn curved_road_passes_near_control_point() {
        let result = plan_road(
            &RoadSystem::new(),
            &FlatGround::new(0.0),
            &ConstructionSettings::default(),
            &request(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)).curved(Vec3::new(10.0, 0.0, 10.0)),
        );
        let geometry = result.road_data.expect("Geometrie erwartet");
        assert!(geometry.length > 20.5);
        assert!(geometry.curvature > 45.0);
    }
}
