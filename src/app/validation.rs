//! Prüfungen einer geplanten Kurve gegen Grenzen, bestehende Objekte und Boden.
//!
//! Alle Prüfungen hängen ihre Fehlschläge an eine gemeinsame Liste an und
//! brechen nie ab; der Aufrufer entscheidet anhand der Liste.

use glam::Vec3;
use indexmap::IndexSet;

use crate::core::{
    sample_ground_batch, Aabb, GroundSampler, ObjectId, ObjectKind, RoadDescriptor, RoadSystem,
    Spline,
};
use crate::shared::spline_geometry::{calculate_resolution, horizontal_distance};
use crate::shared::ConstructionSettings;

use super::construction::ConstructionFail;
use super::creators::push_fail;

/// Abtastpunkte einer Kurve: Mitte plus beide Kanten.
fn edge_samples(spline: &Spline, width: f32, settings: &ConstructionSettings) -> Vec<Vec3> {
    let segments = calculate_resolution(spline.length(), settings.base_resolution, false, 0.0, 0.0);
    let half = width * 0.5;
    spline
        .sample_frames(segments)
        .into_iter()
        .flat_map(|f| [f.position, f.position - f.right * half, f.position + f.right * half])
        .collect()
}

/// Länge, Krümmung und Steigung.
pub(crate) fn check_track_bounds(
    spline: &Spline,
    settings: &ConstructionSettings,
    fails: &mut Vec<ConstructionFail>,
) {
    let length = spline.length();
    if length < settings.min_road_length || length > settings.max_road_length {
        log::debug!(
            "Länge {:.2} ausserhalb [{}, {}]",
            length,
            settings.min_road_length,
            settings.max_road_length
        );
        push_fail(fails, ConstructionFail::TrackLength);
    }
    if spline.curvature() > settings.max_curvature {
        push_fail(fails, ConstructionFail::Curvature);
    }
    if spline.max_slope() > settings.max_slope {
        push_fail(fails, ConstructionFail::Slope);
    }
}

/// Überschneidung mit bestehenden Strassen, Knoten und externen Objekten.
///
/// Objekte in `ignore` (Anschluss-Ziele und deren Nachbarn) werden übersprungen.
pub(crate) fn check_track_overlap(
    system: &RoadSystem,
    spline: &Spline,
    width: f32,
    ignore: &IndexSet<ObjectId>,
    settings: &ConstructionSettings,
    fails: &mut Vec<ConstructionFail>,
) {
    let samples = edge_samples(spline, width, settings);
    let bounds = Aabb::from_points(&samples);
    if bounds.is_empty() {
        return;
    }
    let margin = Vec3::new(
        settings.min_overlap_distance,
        settings.min_overlap_height,
        settings.min_overlap_distance,
    );
    let query = Aabb::new(bounds.min - margin, bounds.max + margin);

    for id in system.find_overlapping(&query) {
        if ignore.contains(&id) {
            continue;
        }
        let Some(object) = system.get(id) else {
            continue;
        };
        let clear_height = |a: f32, b: f32| (a - b).abs() >= settings.min_overlap_height;
        match &object.kind {
            ObjectKind::Road(road) => {
                let reach = road.width * 0.5 + settings.min_overlap_distance;
                let hit = samples.iter().any(|p| {
                    road.spline.nearest_point(*p).is_some_and(|n| {
                        horizontal_distance(*p, n.position) < reach && !clear_height(p.y, n.position.y)
                    })
                });
                if hit {
                    log::debug!("Überschneidung mit Strasse {}", id);
                    push_fail(fails, ConstructionFail::OverlapTrack);
                }
            }
            ObjectKind::Roundabout(data) => {
                let reach = data.radius
                    + object.road.drive_width() * 0.5
                    + object.road.right_side_width()
                    + settings.min_overlap_distance;
                if samples.iter().any(|p| {
                    horizontal_distance(*p, data.center) < reach && !clear_height(p.y, data.center.y)
                }) {
                    push_fail(fails, ConstructionFail::OverlapIntersection);
                }
            }
            ObjectKind::Intersection(_) | ObjectKind::Ramp(_) | ObjectKind::Custom(_) => {
                let area = object.bounds;
                let hit = samples.iter().any(|p| {
                    area.contains_xz(*p)
                        && p.y + settings.min_overlap_height > area.min.y
                        && p.y - settings.min_overlap_height < area.max.y
                });
                if hit {
                    log::debug!("Überschneidung mit {} {}", object.kind_name(), id);
                    push_fail(fails, ConstructionFail::OverlapIntersection);
                }
            }
        }
    }
}

/// Boden unter beiden Kanten.
///
/// Ebenerdige Strassen müssen innerhalb von `[ground_offset_min,
/// ground_offset_max]` über dem Boden liegen, erhöhte nur oberhalb des Minimums.
pub(crate) fn check_ground(
    ground: &dyn GroundSampler,
    spline: &Spline,
    descriptor: &RoadDescriptor,
    elevated: bool,
    settings: &ConstructionSettings,
    fails: &mut Vec<ConstructionFail>,
) {
    if elevated && !descriptor.elevatable {
        push_fail(fails, ConstructionFail::NotElevatable);
    }
    if !settings.check_ground {
        return;
    }

    let samples = edge_samples(spline, descriptor.width(), settings);
    let heights = sample_ground_batch(ground, &samples);
    for (point, height) in samples.iter().zip(heights) {
        let Some(height) = height else {
            push_fail(fails, ConstructionFail::GroundMissing);
            continue;
        };
        let offset = point.y - height;
        let out_of_range = if elevated {
            offset < settings.ground_offset_min
        } else {
            offset < settings.ground_offset_min || offset > settings.ground_offset_max
        };
        if out_of_range {
            push_fail(fails, ConstructionFail::HeightRange);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FlatGround, RoadCatalog, WorldBounds};

    fn settings() -> ConstructionSettings {
        ConstructionSettings::default()
    }

    #[test]
    fn short_road_fails_track_length() {
        let mut fails = Vec::new();
        let spline = Spline::straight(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        check_track_bounds(&spline, &settings(), &mut fails);
        assert_eq!(fails, vec![ConstructionFail::TrackLength]);
    }

    #[test]
    fn hairpin_fails_curvature() {
        let mut fails = Vec::new();
        // Start nach +X, Ende zurück nach -X: 180° Krümmung
        let spline = Spline::from_tangents(
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, 0.0),
        );
        check_track_bounds(&spline, &settings(), &mut fails);
        assert!(fails.contains(&ConstructionFail::Curvature));
    }

    #[test]
    fn steep_road_fails_slope() {
        let mut fails = Vec::new();
        let spline = Spline::straight(Vec3::ZERO, Vec3::new(20.0, 10.0, 0.0));
        check_track_bounds(&spline, &settings(), &mut fails);
        assert!(fails.contains(&ConstructionFail::Slope));
    }

    #[test]
    fn ground_outside_terrain_is_missing() {
        let descriptor = RoadCatalog::default().get("two_lane").expect("Typ erwartet");
        let ground = FlatGround::bounded(0.0, WorldBounds::from_map_size(20.0));
        let spline = Spline::straight(Vec3::ZERO, Vec3::new(30.0, 0.0, 0.0));
        let mut fails = Vec::new();
        check_ground(&ground, &spline, &descriptor, false, &settings(), &mut fails);
        assert_eq!(fails, vec![ConstructionFail::GroundMissing]);
    }

    #[test]
    fn height_range_depends_on_elevation() {
        let descriptor = RoadCatalog::default().get("two_lane").expect("Typ erwartet");
        let ground = FlatGround::new(0.0);
        let bridge = Spline::straight(Vec3::new(0.0, 6.0, 0.0), Vec3::new(20.0, 6.0, 0.0));

        let mut fails = Vec::new();
        check_ground(&ground, &bridge, &descriptor, false, &settings(), &mut fails);
        assert_eq!(fails, vec![ConstructionFail::HeightRange]);

        let mut fails = Vec::new();
        check_ground(&ground, &bridge, &descriptor, true, &settings(), &mut fails);
        assert!(fails.is_empty());
    }

    #[test]
    fn dirt_roads_cannot_be_elevated() {
        let descriptor = RoadCatalog::default().get("dirt").expect("Typ erwartet");
        let spline = Spline::straight(Vec3::new(0.0, 6.0, 0.0), Vec3::new(20.0, 6.0, 0.0));
        let mut fails = Vec::new();
        check_ground(&FlatGround::new(0.0), &spline, &descriptor, true, &settings(), &mut fails);
        assert_eq!(fails, vec![ConstructionFail::NotElevatable]);
    }
}
