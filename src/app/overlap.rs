//! Overlap-Auflösung: Worauf zeigt ein Platzierungspunkt?
//!
//! Priorität: Knoten → freie Slots externer Objekte → eingerastete
//! Strassen-Enden → nächster Punkt auf einer Strasse. Es wird genau ein
//! Treffer geliefert; bei Gleichstand innerhalb einer Klasse gewinnt der
//! zuerst gefundene (kleinste Id).

use glam::Vec3;

use crate::core::{
    Aabb, EndpointLink, NodeKind, ObjectId, ObjectKind, RoadSystem, SceneObject,
};
use crate::shared::spline_geometry::{flat, horizontal_distance, safe_normalize};
use crate::shared::ConstructionSettings;

/// Ziel eines Platzierungspunkts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapTarget {
    /// Kein Objekt in Reichweite
    Nothing,
    /// Kreuzung, Strassen-Ende, Kreisverkehr oder Rampe
    Node { id: ObjectId, kind: NodeKind },
    /// Freier Anschluss-Slot eines externen Objekts
    Slot { target: ObjectId, slot: usize },
    /// Strasse; `anchor` = Knoten-Index eines eingerasteten Endes
    Road {
        id: ObjectId,
        anchor: Option<usize>,
    },
}

/// Aufgelöster Platzierungspunkt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub target: OverlapTarget,
    /// Eingerastete Position (bzw. der Eingabepunkt ohne Treffer)
    pub position: Vec3,
    /// Richtung am Treffer (`Vec3::ZERO`, wenn keine Richtung vorgegeben ist)
    pub tangent: Vec3,
    pub up: Vec3,
    /// Bogenlängen-Parameter auf der getroffenen Kurve
    pub t: f32,
    /// Abstand Eingabepunkt → Treffer (horizontal)
    pub distance: f32,
}

impl Overlap {
    pub fn nothing(point: Vec3) -> Self {
        Self {
            target: OverlapTarget::Nothing,
            position: point,
            tangent: Vec3::ZERO,
            up: Vec3::Y,
            t: 0.0,
            distance: 0.0,
        }
    }

    pub fn exists(&self) -> bool {
        self.target != OverlapTarget::Nothing
    }

    /// Id des getroffenen Objekts.
    pub fn target_id(&self) -> Option<ObjectId> {
        match self.target {
            OverlapTarget::Nothing => None,
            OverlapTarget::Node { id, .. } | OverlapTarget::Road { id, .. } => Some(id),
            OverlapTarget::Slot { target, .. } => Some(target),
        }
    }

    pub fn tangent(&self) -> Option<Vec3> {
        (self.tangent != Vec3::ZERO).then_some(self.tangent)
    }
}

fn within_height(a: f32, b: f32, settings: &ConstructionSettings) -> bool {
    (a - b).abs() <= settings.snap_height
}

/// Löst einen Platzierungspunkt gegen das Live-Netz auf.
pub fn resolve_overlap(system: &RoadSystem, point: Vec3, settings: &ConstructionSettings) -> Overlap {
    let radius = settings.snap_radius;
    let query = Aabb::around(point, Vec3::new(radius, settings.snap_height, radius));
    let candidates: Vec<&SceneObject> = system
        .find_overlapping(&query)
        .into_iter()
        .filter_map(|id| system.get(id))
        .collect();

    if let Some(hit) = nearest_node(system, &candidates, point, settings) {
        return hit;
    }
    if let Some(hit) = nearest_free_slot(&candidates, point, settings) {
        return hit;
    }
    if let Some(hit) = nearest_anchor(&candidates, point, settings) {
        return hit;
    }
    if let Some(hit) = nearest_road(&candidates, point, settings) {
        return hit;
    }
    Overlap::nothing(point)
}

/// Wie [`resolve_overlap`], aber mit eigenem Suchradius statt `snap_radius`.
pub fn resolve_overlap_within(
    system: &RoadSystem,
    point: Vec3,
    radius: Option<f32>,
    settings: &ConstructionSettings,
) -> Overlap {
    match radius {
        Some(radius) => {
            let local = ConstructionSettings {
                snap_radius: radius.max(0.0),
                ..settings.clone()
            };
            resolve_overlap(system, point, &local)
        }
        None => resolve_overlap(system, point, settings),
    }
}

fn keep_nearest(best: &mut Option<Overlap>, candidate: Overlap) {
    if best.is_none_or(|b| candidate.distance < b.distance) {
        *best = Some(candidate);
    }
}

fn nearest_node(
    system: &RoadSystem,
    candidates: &[&SceneObject],
    point: Vec3,
    settings: &ConstructionSettings,
) -> Option<Overlap> {
    let mut best: Option<Overlap> = None;
    for object in candidates {
        let Some(kind) = object.node_kind() else {
            continue;
        };
        match &object.kind {
            ObjectKind::Roundabout(data) => {
                let from_center = horizontal_distance(point, data.center);
                if from_center > data.radius + settings.snap_radius {
                    continue;
                }
                let Some(hit) = data.ring.nearest_point(point) else {
                    continue;
                };
                if !within_height(point.y, hit.position.y, settings) {
                    continue;
                }
                let frame = data.ring.frame(hit.t);
                keep_nearest(
                    &mut best,
                    Overlap {
                        target: OverlapTarget::Node { id: object.id, kind },
                        position: hit.position,
                        tangent: frame.forward,
                        up: frame.up,
                        t: hit.t,
                        distance: (from_center - data.radius).max(0.0),
                    },
                );
            }
            ObjectKind::Intersection(_) | ObjectKind::Ramp(_) => {
                let Some(center) = object.center() else {
                    continue;
                };
                let distance = horizontal_distance(point, center);
                if distance > settings.snap_radius || !within_height(point.y, center.y, settings) {
                    continue;
                }
                let tangent = if kind == NodeKind::EndCap {
                    end_cap_tangent(system, object, center)
                } else {
                    Vec3::ZERO
                };
                keep_nearest(
                    &mut best,
                    Overlap {
                        target: OverlapTarget::Node { id: object.id, kind },
                        position: center,
                        tangent,
                        up: Vec3::Y,
                        t: 0.0,
                        distance,
                    },
                );
            }
            ObjectKind::Road(_) | ObjectKind::Custom(_) => {}
        }
    }
    best
}

/// Richtung am Strassen-Ende: weg vom anderen Ende der Strasse.
fn end_cap_tangent(system: &RoadSystem, cap: &SceneObject, center: Vec3) -> Vec3 {
    let Some(branch) = cap.branches().first() else {
        return Vec3::ZERO;
    };
    let Some(road) = system.get(branch.road).and_then(SceneObject::as_road) else {
        return Vec3::ZERO;
    };
    let far = if branch.knot_index == 0 {
        road.spline.last_position()
    } else {
        road.spline.first_position()
    };
    safe_normalize(flat(center - far))
}

fn nearest_free_slot(
    candidates: &[&SceneObject],
    point: Vec3,
    settings: &ConstructionSettings,
) -> Option<Overlap> {
    let mut best: Option<Overlap> = None;
    for object in candidates {
        let ObjectKind::Custom(data) = &object.kind else {
            continue;
        };
        for (index, slot) in data.free_slots() {
            let distance = horizontal_distance(point, slot.position);
            if distance > settings.snap_radius || !within_height(point.y, slot.position.y, settings)
            {
                continue;
            }
            keep_nearest(
                &mut best,
                Overlap {
                    target: OverlapTarget::Slot {
                        target: object.id,
                        slot: index,
                    },
                    position: slot.position,
                    tangent: safe_normalize(flat(slot.direction)),
                    up: Vec3::Y,
                    t: 0.0,
                    distance,
                },
            );
        }
    }
    best
}

fn nearest_anchor(
    candidates: &[&SceneObject],
    point: Vec3,
    settings: &ConstructionSettings,
) -> Option<Overlap> {
    let mut best: Option<Overlap> = None;
    for object in candidates {
        let Some(road) = object.as_road() else {
            continue;
        };
        for (link, knot_index, t) in [
            (road.start, 0, 0.0),
            (road.end, road.spline.last_index(), 1.0),
        ] {
            if !matches!(link, EndpointLink::Snapped { .. }) {
                continue;
            }
            let Some(knot) = road.spline.knot(knot_index) else {
                continue;
            };
            let distance = horizontal_distance(point, knot.position);
            if distance > settings.snap_radius || !within_height(point.y, knot.position.y, settings)
            {
                continue;
            }
            let frame = road.spline.frame(t);
            keep_nearest(
                &mut best,
                Overlap {
                    target: OverlapTarget::Road {
                        id: object.id,
                        anchor: Some(knot_index),
                    },
                    position: knot.position,
                    tangent: frame.forward,
                    up: frame.up,
                    t,
                    distance,
                },
            );
        }
    }
    best
}

fn nearest_road(
    candidates: &[&SceneObject],
    point: Vec3,
    settings: &ConstructionSettings,
) -> Option<Overlap> {
    let mut best: Option<Overlap> = None;
    for object in candidates {
        let Some(road) = object.as_road() else {
            continue;
        };
        let Some(hit) = road.spline.nearest_point(point) else {
            continue;
        };
        let distance = horizontal_distance(point, hit.position);
        let reach = settings.snap_radius.max(road.width * 0.5);
        if distance > reach || !within_height(point.y, hit.position.y, settings) {
            continue;
        }
        let frame = road.spline.frame(hit.t);
        keep_nearest(
            &mut best,
            Overlap {
                target: OverlapTarget::Road {
                    id: object.id,
                    anchor: None,
                },
                position: hit.position,
                tangent: frame.forward,
                up: frame.up,
                t: hit.t,
                distance,
            },
        );
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::use_cases::{plan_road, RoadRequest};
    use crate::core::{FlatGround, RoadCatalog};
    use approx::assert_relative_eq;

    fn single_road() -> RoadSystem {
        let road = RoadCatalog::default().get("two_lane").expect("Typ erwartet");
        let planned = plan_road(
            &RoadSystem::new(),
            &FlatGround::new(0.0),
            &ConstructionSettings::default(),
            &RoadRequest::straight(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0), road),
        );
        RoadSystem::new()
            .applied(&planned.result.objects)
            .expect("Commit erwartet")
            .0
    }

    #[test]
    fn empty_system_resolves_to_nothing() {
        let point = Vec3::new(3.0, 0.0, 4.0);
        let overlap = resolve_overlap(&RoadSystem::new(), point, &ConstructionSettings::default());
        assert!(!overlap.exists());
        assert_eq!(overlap.position, point);
    }

    #[test]
    fn end_cap_wins_over_road_and_points_outward() {
        let system = single_road();
        let overlap = resolve_overlap(&system, Vec3::new(19.0, 0.0, 0.5), &ConstructionSettings::default());

        let OverlapTarget::Node { kind, .. } = overlap.target else {
            panic!("Knoten erwartet, erhalten {:?}", overlap.target);
        };
        assert_eq!(kind, NodeKind::EndCap);
        assert_relative_eq!(overlap.position.x, 20.0, epsilon = 1e-3);
        assert_relative_eq!(overlap.tangent.x, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn mid_span_point_snaps_onto_road() {
        let system = single_road();
        let overlap = resolve_overlap(&system, Vec3::new(10.0, 0.0, 2.0), &ConstructionSettings::default());

        assert!(matches!(overlap.target, OverlapTarget::Road { anchor: None, .. }));
        assert_relative_eq!(overlap.position.z, 0.0, epsilon = 1e-2);
        assert_relative_eq!(overlap.t, 0.5, epsilon = 1e-2);
        assert_relative_eq!(overlap.distance, 2.0, epsilon = 1e-2);
    }

    #[test]
    fn explicit_radius_widens_the_search() {
        let system = single_road();
        let settings = ConstructionSettings::default();
        let point = Vec3::new(10.0, 0.0, 9.0);
        assert!(!resolve_overlap_within(&system, point, None, &settings).exists());
        let hit = resolve_overlap_within(&system, point, Some(10.0), &settings);
        assert!(matches!(hit.target, OverlapTarget::Road { .. }));
    }

    #[test]
    fn height_difference_beyond_snap_height_is_ignored() {
        let system = single_road();
        let overlap = resolve_overlap(&system, Vec3::new(10.0, 8.0, 0.0), &ConstructionSettings::default());
        assert!(!overlap.exists());
    }
}
