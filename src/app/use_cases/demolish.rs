//! Use-Case: Abriss eines Objekts am Platzierungspunkt.
//!
//! Genau ein primäres Ziel wird abgerissen: der nächste Knoten, sonst die
//! nächste Strasse, sonst ein externes Objekt. Alles Weitere (verwaiste
//! Abschlüsse, zusammengelegte Strassen, freigegebene Slots) folgt aus der
//! Graph-Pflege. Übrige Strassen und Knoten im Suchradius landen unverändert
//! als ersetzt im Batch, damit Verbraucher ihre Anschlüsse neu aufbauen.

use glam::Vec3;

use crate::app::construction::{ConstructionResult, ConstructionResultDemolish};
use crate::app::graph::{demolish_node, remove_custom, remove_road, BatchContext};
use crate::core::{Aabb, ObjectId, ObjectKind, RoadSystem, SceneObject};
use crate::shared::spline_geometry::horizontal_distance;
use crate::shared::ConstructionSettings;

use super::finish;

#[derive(Debug, Clone, Copy)]
pub struct DemolishRequest {
    pub point: Vec3,
    /// Suchradius; ohne Angabe `snap_radius`
    pub radius: Option<f32>,
}

impl DemolishRequest {
    pub fn at(point: Vec3) -> Self {
        Self {
            point,
            radius: None,
        }
    }
}

/// Sucht das primäre Abriss-Ziel.
fn find_target(system: &RoadSystem, point: Vec3, radius: f32) -> Option<ObjectId> {
    let reach = radius.max(1.0);
    // Kreisverkehre sind grösser als der Suchradius
    let largest_roundabout = system
        .nodes()
        .filter_map(|o| match &o.kind {
            ObjectKind::Roundabout(data) => Some(data.radius),
            _ => None,
        })
        .fold(0.0f32, f32::max);
    let query = Aabb::around(point, Vec3::splat(reach + largest_roundabout));
    let candidates: Vec<&SceneObject> = system
        .find_overlapping(&query)
        .into_iter()
        .filter_map(|id| system.get(id))
        .collect();

    let mut best_node: Option<(f32, ObjectId)> = None;
    for object in &candidates {
        let (Some(center), Some(_)) = (object.center(), object.node_kind()) else {
            continue;
        };
        let distance = horizontal_distance(point, center);
        let limit = match &object.kind {
            ObjectKind::Roundabout(data) => reach + data.radius,
            _ => reach,
        };
        if distance <= limit && best_node.is_none_or(|(d, _)| distance < d) {
            best_node = Some((distance, object.id));
        }
    }
    if let Some((_, id)) = best_node {
        return Some(id);
    }

    let mut best_road: Option<(f32, ObjectId)> = None;
    for object in &candidates {
        let Some(road) = object.as_road() else {
            continue;
        };
        let Some(hit) = road.spline.nearest_point(point) else {
            continue;
        };
        if hit.distance <= reach.max(road.width * 0.5) && best_road.is_none_or(|(d, _)| hit.distance < d) {
            best_road = Some((hit.distance, object.id));
        }
    }
    if let Some((_, id)) = best_road {
        return Some(id);
    }

    candidates
        .iter()
        .find(|o| matches!(o.kind, ObjectKind::Custom(_)) && o.bounds.contains_xz(point))
        .map(|o| o.id)
}

/// Plant den Abriss am Punkt der Anfrage.
pub fn plan_demolish(
    system: &RoadSystem,
    settings: &ConstructionSettings,
    request: &DemolishRequest,
) -> ConstructionResultDemolish {
    let radius = request.radius.unwrap_or(settings.snap_radius);
    let Some(target) = find_target(system, request.point, radius) else {
        log::debug!("Abriss bei {:?}: kein Ziel", request.point);
        return ConstructionResultDemolish {
            result: ConstructionResult::invalid(),
            target: None,
        };
    };
    plan_target(system, settings, target, Some((request.point, radius)))
}

/// Plant den Abriss eines bekannten Objekts.
pub fn demolish_object(
    system: &RoadSystem,
    settings: &ConstructionSettings,
    target: ObjectId,
) -> ConstructionResultDemolish {
    plan_target(system, settings, target, None)
}

/// Legt Strassen und Knoten im Umkreis, die der Abriss nicht erfasst hat,
/// unverändert als ersetzt ab.
fn touch_surroundings(ctx: &mut BatchContext<'_>, point: Vec3, radius: f32) {
    let system = ctx.system;
    let query = Aabb::around(point, Vec3::splat(radius.max(1.0)));
    for id in system.find_overlapping(&query) {
        if ctx.objects().pending(id).is_some() || ctx.objects().is_removed(id) {
            continue;
        }
        let Some(object) = system.get(id) else {
            continue;
        };
        if matches!(object.kind, ObjectKind::Custom(_)) {
            continue;
        }
        ctx.put(object.clone());
    }
}

fn plan_target(
    system: &RoadSystem,
    settings: &ConstructionSettings,
    target: ObjectId,
    region: Option<(Vec3, f32)>,
) -> ConstructionResultDemolish {
    let Some(object) = system.get(target) else {
        return ConstructionResultDemolish {
            result: ConstructionResult::invalid(),
            target: None,
        };
    };
    log::debug!("Abriss: {} {}", object.kind_name(), target);

    let mut ctx = BatchContext::new(system, settings);
    match &object.kind {
        ObjectKind::Road(_) => remove_road(&mut ctx, target),
        ObjectKind::Custom(_) => remove_custom(&mut ctx, target),
        ObjectKind::Intersection(_) | ObjectKind::Roundabout(_) | ObjectKind::Ramp(_) => {
            demolish_node(&mut ctx, target)
        }
    }
    if let Some((point, radius)) = region {
        touch_surroundings(&mut ctx, point, radius);
    }

    ConstructionResultDemolish {
        result: finish(ctx, Vec::new()),
        target: Some(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::use_cases::{plan_road, RoadRequest};
    use crate::core::{FlatGround, RoadCatalog};

    fn system_with_road() -> (RoadSystem, ConstructionSettings) {
        let settings = ConstructionSettings::default();
        let road = RoadCatalog::default().get("two_lane").expect("Typ erwartet");
        let planned = plan_road(
            &RoadSystem::new(),
            &FlatGround::new(0.0),
            &settings,
            &RoadRequest::straight(Vec3::ZERO, Vec3::new(30.0, 0.0, 0.0), road),
        );
        let (system, _) = RoadSystem::new()
            .applied(&planned.result.objects)
            .expect("Commit erwartet");
        (system, settings)
    }

    #[test]
    fn nothing_in_reach_gives_invalid_result() {
        let (system, settings) = system_with_road();
        let result = plan_demolish(&system, &settings, &DemolishRequest::at(Vec3::new(15.0, 0.0, 40.0)));
        assert!(!result.result.is_valid);
        assert!(result.target.is_none());
    }

    #[test]
    fn demolishing_road_removes_its_end_caps() {
        let (system, settings) = system_with_road();
        let result = plan_demolish(&system, &settings, &DemolishRequest::at(Vec3::new(15.0, 0.0, 1.0)));
        assert!(!result.result.construction_failed());
        assert_eq!(result.result.removed.len(), 3);
        let (after, _) = system.applied(&result.result.objects).expect("Commit erwartet");
        assert!(after.is_empty());
    }

    #[test]
    fn neighbouring_road_in_radius_is_replaced_unchanged() {
        let (system, settings) = system_with_road();
        let road = RoadCatalog::default().get("two_lane").expect("Typ erwartet");
        let planned = plan_road(
            &system,
            &FlatGround::new(0.0),
            &settings,
            &RoadRequest::straight(Vec3::new(0.0, 0.0, 14.0), Vec3::new(30.0, 0.0, 14.0), road),
        );
        assert!(!planned.result.construction_failed(), "{:?}", planned.result.construction_fails);
        let neighbour = planned.road_id.expect("Id erwartet");
        let (system, _) = system.applied(&planned.result.objects).expect("Commit erwartet");

        let request = DemolishRequest {
            point: Vec3::new(15.0, 0.0, 1.0),
            radius: Some(14.0),
        };
        let result = plan_demolish(&system, &settings, &request);
        let target = result.target.expect("Ziel erwartet");
        assert_ne!(target, neighbour);
        assert!(result.result.removed.contains(&target));
        assert_eq!(result.result.replaced_roads, vec![neighbour]);

        let before = system.get(neighbour).and_then(SceneObject::as_road).expect("Strasse");
        let (after, _) = system.applied(&result.result.objects).expect("Commit erwartet");
        let kept = after.get(neighbour).and_then(SceneObject::as_road).expect("Strasse");
        assert_eq!(kept.spline, before.spline);
        assert_eq!(after.road_count(), 1);
        assert!(after.check_symmetry().is_empty());
    }

    #[test]
    fn demolish_by_id_touches_nothing_else() {
        let (system, settings) = system_with_road();
        let road = system.roads().next().map(|o| o.id).expect("Strasse");
        let result = demolish_object(&system, &settings, road);
        assert!(result.result.replaced_roads.is_empty());
        assert!(result.result.replaced_intersections.is_empty());
    }

    #[test]
    fn end_cap_wins_over_road_near_the_end() {
        let (system, settings) = system_with_road();
        let result = plan_demolish(&system, &settings, &DemolishRequest::at(Vec3::new(0.5, 0.0, 0.0)));
        let target = result.target.expect("Ziel erwartet");
        assert!(system.get(target).is_some_and(SceneObject::is_node));
    }
}
