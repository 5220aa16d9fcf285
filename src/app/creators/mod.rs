//! Mesh-Erzeugung für Strassen, Kreuzungen, Kreisverkehre und Rampen.
//!
//! Die Creators lesen ausschließlich Objekt-Daten und liefern Meshes,
//! Bounding-Box und abgeleitete Kurven (Verbindungskurven der Kreuzungen).
//! Probleme landen in der gemeinsamen Fail-Liste der Konstruktion.

mod intersection;
pub(crate) mod lanes;
mod ramp;
mod road;
mod roundabout;

use glam::Vec3;

use crate::app::construction::ConstructionFail;
use crate::core::{
    Aabb, KnotData, LodMesh, ObjectKind, ObjectLookup, SceneObject, Spline,
};
use crate::shared::spline_geometry::calculate_resolution;
use crate::shared::ConstructionSettings;

/// Höhen-Zugabe der Bounding-Box über und unter der Fahrbahn.
const BOUNDS_HEIGHT_MARGIN: f32 = 0.5;

/// Mesh-Segmente einer Kurve für eine Detailstufe (halbiert pro Stufe).
pub(crate) fn segments_for(spline: &Spline, settings: &ConstructionSettings, level: u8) -> usize {
    let full = calculate_resolution(
        spline.length(),
        settings.base_resolution,
        settings.smart_reduce,
        spline.curvature(),
        spline.max_slope(),
    );
    (full >> level).max(1)
}

/// Kurve zwischen zwei Randpunkten mit vorgegebener Fahrtrichtung an beiden Enden.
pub(crate) fn edge_curve(a: Vec3, travel_a: Vec3, b: Vec3, travel_b: Vec3) -> Spline {
    let length = a.distance(b) / 3.0;
    Spline::from_tangents(a, travel_a * length, b, -travel_b * length)
}

/// Endpunkt-Daten aller Äste eines Knotens; fehlende Strassen sind ein Fehlschlag.
pub(crate) fn branch_knots(
    object: &SceneObject,
    view: &dyn ObjectLookup,
    fails: &mut Vec<ConstructionFail>,
) -> Vec<KnotData> {
    object
        .branches()
        .iter()
        .filter_map(|branch| {
            let knot = KnotData::from_branch(view, *branch);
            if knot.is_none() {
                log::warn!("{} {}: Ast {} nicht auflösbar", object.kind_name(), object.id, branch.road);
                push_fail(fails, ConstructionFail::MissingConnection);
            }
            knot
        })
        .collect()
}

pub(crate) fn push_fail(fails: &mut Vec<ConstructionFail>, fail: ConstructionFail) {
    if !fails.contains(&fail) {
        fails.push(fail);
    }
}

/// Erzeugt abgeleitete Kurven, alle Detailstufen und die Bounding-Box neu.
pub(crate) fn refresh(
    object: &mut SceneObject,
    view: &dyn ObjectLookup,
    settings: &ConstructionSettings,
    fails: &mut Vec<ConstructionFail>,
) {
    let knots = if object.is_node() {
        branch_knots(object, view, fails)
    } else {
        Vec::new()
    };

    if let ObjectKind::Intersection(data) = &mut object.kind {
        let center = data.center;
        data.connector_splines = knots
            .iter()
            .map(|k| Spline::connector(center, k.position, k.direction))
            .collect();
    }

    object.lods = (0..settings.lod_levels())
        .map(|level| build_lod(object, &knots, settings, level))
        .collect();
    object.bounds = bounds_of(object, &knots);
}

fn build_lod(
    object: &SceneObject,
    knots: &[KnotData],
    settings: &ConstructionSettings,
    level: u8,
) -> LodMesh {
    match &object.kind {
        ObjectKind::Road(data) => road::build(object, data, settings, level),
        ObjectKind::Intersection(data) => intersection::build(data, knots, settings, level),
        ObjectKind::Roundabout(data) => roundabout::build(object, data, knots, settings, level),
        ObjectKind::Ramp(data) => ramp::build(data, knots, settings, level),
        ObjectKind::Custom(_) => LodMesh {
            level,
            parts: Vec::new(),
        },
    }
}

fn bounds_of(object: &SceneObject, knots: &[KnotData]) -> Aabb {
    let mut points: Vec<Vec3> = object
        .lods
        .first()
        .map(|lod| lod.positions().collect())
        .unwrap_or_default();

    let mut margin = 0.0f32;
    match &object.kind {
        ObjectKind::Road(data) => {
            points.extend(data.spline.sample_points(data.spline.segment_count().max(1) * 4));
            margin = data.width * 0.5;
        }
        ObjectKind::Intersection(data) => {
            points.push(data.center);
            points.extend(knots.iter().map(|k| k.position));
            margin = object.road.width() * 0.5;
        }
        ObjectKind::Roundabout(data) => {
            points.push(data.center);
            points.extend(data.ring.sample_points(16));
            margin = object.road.width() * 0.5;
        }
        ObjectKind::Ramp(data) => {
            points.push(data.center);
            points.extend(data.gap_spline.sample_points(4));
            margin = object.road.width() * 0.5;
        }
        ObjectKind::Custom(data) => {
            // Vom Host vorgegebene Ausdehnung bleibt erhalten
            if !object.bounds.is_empty() {
                return object.bounds;
            }
            points.extend(data.slots.iter().map(|s| s.position));
            margin = 1.0;
        }
    }

    let bounds = Aabb::from_points(&points);
    if bounds.is_empty() {
        return bounds;
    }
    let mut expanded = bounds.expanded(margin);
    expanded.min.y = bounds.min.y - BOUNDS_HEIGHT_MARGIN;
    expanded.max.y = bounds.max.y + BOUNDS_HEIGHT_MARGIN;
    expanded
}
