//! Rampen-Mesh: Brücke über die Lücke der durchgehenden Strasse, Abzweig der
//! Rampe und zwei gerichtete Randverbindungen auf der Rampenseite.

use glam::Vec3;

use crate::core::{KnotData, LaneDescriptor, LodMesh, MeshBuilder, RampData, RampSide, Spline};
use crate::shared::spline_geometry::right_vector;
use crate::shared::ConstructionSettings;

use super::lanes::{drive_lanes_facing_away, side_strip, sweep_lanes, total_width};
use super::{edge_curve, segments_for};

/// Stelle auf der Lücken-Kurve, an der die Rampe abzweigt.
const RAMP_BRANCH_T: f32 = 0.5;

pub(super) fn build(
    data: &RampData,
    knots: &[KnotData],
    settings: &ConstructionSettings,
    level: u8,
) -> LodMesh {
    let mut builder = MeshBuilder::new();
    if let [through_in, through_out, ramp] = knots {
        bridge(&mut builder, data, through_in, through_out, settings, level);
        ramp_branch(&mut builder, data, through_in, ramp, settings, level);
        ramp_side_edges(&mut builder, data, through_in, through_out, ramp, settings, level);
    } else {
        log::debug!("Rampe mit {} Ästen: kein Mesh", knots.len());
    }
    LodMesh {
        level,
        parts: builder.finish(),
    }
}

/// Vorzeichen der Rampenseite bezogen auf den Rechts-Vektor.
fn side_sign(side: RampSide) -> f32 {
    match side {
        RampSide::Right => 1.0,
        RampSide::Left => -1.0,
    }
}

/// Fahrbahn und durchgehender Rand auf der Gegenseite entlang der Lücke.
fn bridge(
    builder: &mut MeshBuilder,
    data: &RampData,
    through_in: &KnotData,
    through_out: &KnotData,
    settings: &ConstructionSettings,
    level: u8,
) {
    let gap = &data.gap_spline;
    let segments = segments_for(gap, settings, level);

    // Zulauf endet am Zentrum: Profil in Fahrtrichtung = gespiegelt
    let lanes: Vec<LaneDescriptor> = drive_lanes_facing_away(through_in).into_iter().rev().collect();
    let in_width = total_width(&lanes);
    let out_width = total_width(&drive_lanes_facing_away(through_out));
    let end_scale = if in_width > f32::EPSILON {
        out_width / in_width
    } else {
        1.0
    };
    sweep_lanes(builder, &gap.sample_frames(segments), &lanes, |s| {
        1.0 + (end_scale - 1.0) * s
    });

    // Gegenseite: Randspuren der durchgehenden Strasse ohne Unterbrechung
    let descriptor = &through_in.descriptor;
    let (side_lanes, sign): (Vec<LaneDescriptor>, f32) = match data.ramp_side {
        RampSide::Right => (descriptor.left_side_lanes().iter().rev().cloned().collect(), -1.0),
        RampSide::Left => (descriptor.right_side_lanes().to_vec(), 1.0),
    };
    if side_lanes.is_empty() {
        return;
    }
    let half = descriptor.drive_width() * 0.5;
    let inner = gap.offset(sign * half).sample_points(segments);
    let outer = gap
        .offset(sign * (half + total_width(&side_lanes)))
        .sample_points(segments);
    side_strip(builder, &inner, &outer, &side_lanes);
}

fn ramp_branch(
    builder: &mut MeshBuilder,
    data: &RampData,
    through_in: &KnotData,
    ramp: &KnotData,
    settings: &ConstructionSettings,
    level: u8,
) {
    let frame = data.gap_spline.frame(RAMP_BRANCH_T);
    let start = frame.position
        + frame.right * (side_sign(data.ramp_side) * through_in.descriptor.drive_width() * 0.5);
    let branch = Spline::connector(start, ramp.position, ramp.direction);
    sweep_lanes(
        builder,
        &branch.sample_frames(segments_for(&branch, settings, level)),
        &drive_lanes_facing_away(ramp),
        |_| 1.0,
    );
}

/// Randverbindungen Zulauf → Rampe und Rampe → Ablauf.
fn ramp_side_edges(
    builder: &mut MeshBuilder,
    data: &RampData,
    through_in: &KnotData,
    through_out: &KnotData,
    ramp: &KnotData,
    settings: &ConstructionSettings,
    level: u8,
) {
    let descriptor = &through_in.descriptor;
    let lanes: Vec<LaneDescriptor> = match data.ramp_side {
        RampSide::Right => descriptor.right_side_lanes().to_vec(),
        RampSide::Left => descriptor.left_side_lanes().iter().rev().cloned().collect(),
    };
    if lanes.is_empty() {
        return;
    }
    let side_width = total_width(&lanes);
    let sign = side_sign(data.ramp_side);

    // Fahrtrichtungen: Zulauf zum Zentrum hin, Ablauf und Rampe vom Zentrum weg
    let in_travel = -through_in.direction;
    let in_side = right_vector(in_travel) * sign;
    let in_edge = through_in.position + in_side * (through_in.descriptor.drive_width() * 0.5);

    let out_travel = through_out.direction;
    let out_side = right_vector(out_travel) * sign;
    let out_edge = through_out.position + out_side * (through_out.descriptor.drive_width() * 0.5);

    let ramp_right = right_vector(ramp.direction);
    let ramp_half = ramp.descriptor.drive_width() * 0.5;
    let (near, far) = {
        let a = ramp.position + ramp_right * ramp_half;
        let b = ramp.position - ramp_right * ramp_half;
        if a.distance(in_edge) <= b.distance(in_edge) {
            (a, b)
        } else {
            (b, a)
        }
    };
    let near_side = (near - ramp.position).normalize_or_zero();
    let far_side = (far - ramp.position).normalize_or_zero();

    let edges = [
        (in_edge, in_travel, in_side, near, ramp.direction, near_side),
        (far, -ramp.direction, far_side, out_edge, out_travel, out_side),
    ];
    for (a, travel_a, side_a, b, travel_b, side_b) in edges {
        let inner = edge_curve(a, travel_a, b, travel_b);
        let outer = edge_curve(a + side_a * side_width, travel_a, b + side_b * side_width, travel_b);
        let segments = segments_for(&outer, settings, level);
        side_strip(
            builder,
            &inner.sample_points(segments),
            &outer.sample_points(segments),
            &lanes,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Branch, ObjectId, RoadCatalog};

    fn knot(id: u64, knot_index: usize, position: Vec3, direction: Vec3) -> KnotData {
        let descriptor = RoadCatalog::default().get("two_lane").expect("Typ erwartet");
        KnotData {
            road: ObjectId(id),
            width: descriptor.width(),
            descriptor,
            knot_index,
            position,
            direction,
            elevated: false,
        }
    }

    #[test]
    fn ramp_mesh_contains_bridge_and_side_edges() {
        let data = RampData {
            center: Vec3::ZERO,
            branches: vec![
                Branch::new(ObjectId(1), 1),
                Branch::new(ObjectId(2), 0),
                Branch::new(ObjectId(3), 0),
            ],
            ramp_side: RampSide::Right,
            gap_spline: Spline::straight(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(15.0, 0.0, 0.0)),
        };
        let knots = [
            knot(1, 1, Vec3::new(-5.0, 0.0, 0.0), -Vec3::X),
            knot(2, 2, Vec3::new(15.0, 0.0, 0.0), Vec3::X),
            knot(3, 0, Vec3::new(12.0, 0.0, -14.0), Vec3::new(0.5, 0.0, -0.86).normalize()),
        ];

        let lod = build(&data, &knots, &ConstructionSettings::default(), 0);
        assert!(lod.parts.iter().any(|p| p.material == "asphalt"));
        assert!(lod.parts.iter().any(|p| p.material == "sidewalk"));
    }

    #[test]
    fn incomplete_ramp_has_no_mesh() {
        let data = RampData {
            center: Vec3::ZERO,
            branches: Vec::new(),
            ramp_side: RampSide::Left,
            gap_spline: Spline::straight(Vec3::ZERO, Vec3::X),
        };
        let lod = build(&data, &[], &ConstructionSettings::default(), 0);
        assert_eq!(lod.triangle_count(), 0);
    }
}
