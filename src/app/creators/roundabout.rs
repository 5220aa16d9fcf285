//! Kreisverkehr-Mesh: drei konzentrische Kreise (Insel, Fahrbahn, Aussenrand).
//!
//! Der Aussenrand wird an jedem Ast durch eine Winkel-Lücke unterbrochen, in
//! die die Zufahrt mündet. Die Wendeplatte ersetzt Insel und Ring durch eine
//! durchgehende Scheibe.

use glam::Vec3;

use crate::core::{KnotData, LodMesh, MeshBuilder, RoundaboutData, RoundaboutDesign, SceneObject, Spline};
use crate::shared::spline_geometry::{calculate_resolution, flat, safe_normalize};
use crate::shared::ConstructionSettings;

use super::lanes::{drive_lanes_facing_away, side_strip, sweep_lanes};
use super::segments_for;

/// Mindestanzahl der Kreis-Segmente in der höchsten Detailstufe.
const MIN_RING_SEGMENTS: usize = 24;
const ISLAND_MATERIAL: &str = "grass";

/// Richtung auf dem Kreis zum Winkel `phi` (gleiche Parametrisierung wie `Spline::circle`).
fn circle_direction(phi: f32) -> Vec3 {
    let (sin, cos) = phi.sin_cos();
    Vec3::new(cos, 0.0, sin)
}

fn circle_points(center: Vec3, radius: f32, segments: usize) -> Vec<Vec3> {
    (0..=segments)
        .map(|i| center + circle_direction(std::f32::consts::TAU * i as f32 / segments as f32) * radius)
        .collect()
}

/// Winkel einer Richtung in der Kreis-Parametrisierung (0..TAU).
fn circle_angle(direction: Vec3) -> f32 {
    direction.z.atan2(direction.x).rem_euclid(std::f32::consts::TAU)
}

/// Kleinster Winkelabstand zweier Kreiswinkel.
fn angular_distance(a: f32, b: f32) -> f32 {
    let delta = (a - b).rem_euclid(std::f32::consts::TAU);
    delta.min(std::f32::consts::TAU - delta)
}

pub(super) fn build(
    object: &SceneObject,
    data: &RoundaboutData,
    knots: &[KnotData],
    settings: &ConstructionSettings,
    level: u8,
) -> LodMesh {
    let mut builder = MeshBuilder::new();
    let descriptor = &object.road;
    let drive_width = descriptor.drive_width();
    let inner_radius = (data.radius - drive_width * 0.5).max(0.0);
    let outer_radius = data.radius + drive_width * 0.5;

    let full = calculate_resolution(
        std::f32::consts::TAU * outer_radius,
        settings.base_resolution,
        false,
        0.0,
        0.0,
    )
    .max(MIN_RING_SEGMENTS);
    let segments = (full >> level).max(8);

    let outer = circle_points(data.center, outer_radius, segments);
    match data.design {
        RoundaboutDesign::CulDeSac => {
            builder.add_fan(
                descriptor.surface_material(),
                data.center,
                &outer[..segments],
            );
        }
        RoundaboutDesign::Default => {
            let inner = circle_points(data.center, inner_radius, segments);
            side_strip(&mut builder, &inner, &outer, descriptor.drive_lanes());

            // Insel: linke Randspuren, vom Fahrbahnrand nach innen
            let island_lanes: Vec<_> = descriptor.left_side_lanes().iter().rev().cloned().collect();
            let island_width: f32 = island_lanes.iter().map(|l| l.width).sum();
            let island_radius = (inner_radius - island_width).max(0.0);
            if !island_lanes.is_empty() {
                let island_edge = circle_points(data.center, island_radius, segments);
                side_strip(&mut builder, &inner, &island_edge, &island_lanes);
            }
            if island_radius > f32::EPSILON {
                let island = circle_points(data.center, island_radius, segments);
                builder.add_fan(ISLAND_MATERIAL, data.center, &island[..segments]);
            }
        }
    }

    outer_rim(
        &mut builder,
        data,
        knots,
        outer_radius,
        segments,
        object.road.right_side_lanes(),
    );

    // Zufahrten vom Ring zu den Ast-Knoten
    for knot in knots {
        let outward = safe_normalize(flat(knot.position - data.center));
        if outward == Vec3::ZERO {
            continue;
        }
        let entry = data.center + outward * outer_radius;
        let connector = Spline::connector(entry, knot.position, knot.direction);
        sweep_lanes(
            &mut builder,
            &connector.sample_frames(segments_for(&connector, settings, level)),
            &drive_lanes_facing_away(knot),
            |_| 1.0,
        );
    }

    LodMesh {
        level,
        parts: builder.finish(),
    }
}

/// Aussenrand mit Lücken an den Ästen.
fn outer_rim(
    builder: &mut MeshBuilder,
    data: &RoundaboutData,
    knots: &[KnotData],
    outer_radius: f32,
    segments: usize,
    lanes: &[crate::core::LaneDescriptor],
) {
    let rim_width: f32 = lanes.iter().map(|l| l.width).sum();
    if lanes.is_empty() || outer_radius <= f32::EPSILON {
        return;
    }

    let gaps: Vec<(f32, f32)> = knots
        .iter()
        .filter_map(|knot| {
            let outward = safe_normalize(flat(knot.position - data.center));
            if outward == Vec3::ZERO {
                return None;
            }
            let half = (knot.descriptor.drive_width() * 0.5 + rim_width) / outer_radius;
            Some((circle_angle(outward), half.clamp(0.0, 1.0).asin()))
        })
        .collect();

    let step = std::f32::consts::TAU / segments as f32;
    let in_gap = |i: usize| {
        let mid = (i as f32 + 0.5) * step;
        gaps.iter().any(|(angle, half)| angular_distance(mid, *angle) < *half)
    };

    let inner = circle_points(data.center, outer_radius, segments);
    let outer = circle_points(data.center, outer_radius + rim_width, segments);
    let mut run_start: Option<usize> = None;
    for i in 0..=segments {
        let open = i < segments && !in_gap(i);
        match (open, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                side_strip(builder, &inner[start..=i], &outer[start..=i], lanes);
                run_start = None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ObjectId, ObjectKind, RoadCatalog};

    fn roundabout(design: RoundaboutDesign) -> SceneObject {
        let descriptor = RoadCatalog::default().get("one_way").expect("Typ erwartet");
        let data = RoundaboutData {
            center: Vec3::ZERO,
            radius: 12.0,
            design,
            branches: Vec::new(),
            ring: Spline::circle(Vec3::ZERO, 12.0, 8),
        };
        SceneObject::new(ObjectId(1), descriptor, false, ObjectKind::Roundabout(data))
    }

    fn data(object: &SceneObject) -> &RoundaboutData {
        match &object.kind {
            ObjectKind::Roundabout(data) => data,
            _ => panic!("Kreisverkehr erwartet"),
        }
    }

    #[test]
    fn default_design_has_island() {
        let object = roundabout(RoundaboutDesign::Default);
        let lod = build(&object, data(&object), &[], &ConstructionSettings::default(), 0);
        assert!(lod.parts.iter().any(|p| p.material == ISLAND_MATERIAL));
        assert!(lod.positions().all(|p| flat(p).length() <= 12.0 + 2.5 + 1.0 + 1e-3));
    }

    #[test]
    fn cul_de_sac_is_a_disc_without_island() {
        let object = roundabout(RoundaboutDesign::CulDeSac);
        let lod = build(&object, data(&object), &[], &ConstructionSettings::default(), 0);
        assert!(!lod.parts.iter().any(|p| p.material == ISLAND_MATERIAL));
        assert!(lod.parts.iter().any(|p| p.material == "asphalt"));
    }

    #[test]
    fn angular_distance_wraps() {
        assert!((angular_distance(0.1, std::f32::consts::TAU - 0.1) - 0.2).abs() < 1e-5);
    }
}
