//! Kreuzungs- und Abschluss-Meshes.
//!
//! Aufbau einer Kreuzung:
//! 1. Hauptpaar: die zwei Äste mit der geringsten Abweichung von einer Geraden
//! 2. Haupt-Sweep mit dem Spurprofil des breiteren Asts, zum schmaleren hin
//!    herunterskaliert
//! 3. Ausfahrten aller übrigen Äste ab der Mitte der Hauptverbindung
//! 4. Randstreifen zwischen im Uhrzeigersinn benachbarten Ästen
//! 5. Abschluss-Rechtecke für erhöhte Randspuren ohne Gegenstück

use glam::Vec3;

use crate::core::{IntersectionData, KnotData, LaneDescriptor, LodMesh, MeshBuilder, Spline};
use crate::shared::spline_geometry::{
    angle_between_deg, calculate_tangents, heading_deg, right_vector, TangentInput,
};
use crate::shared::ConstructionSettings;

use super::lanes::{
    closing_rectangles, drive_lanes_facing_away, lanes_facing_away, left_side_facing_away,
    right_side_facing_away, side_strip, sweep_lanes, total_width,
};
use super::{edge_curve, segments_for};

/// Toleranz, ab der die Aussenseite zweier Äste als gerade gilt.
const STRAIGHT_TOLERANCE_DEG: f32 = 0.5;

pub(super) fn build(
    data: &IntersectionData,
    knots: &[KnotData],
    settings: &ConstructionSettings,
    level: u8,
) -> LodMesh {
    let mut builder = MeshBuilder::new();
    match knots.len() {
        0 => {}
        1 => end_cap(&mut builder, &knots[0]),
        _ => junction(&mut builder, data.center, knots, settings, level),
    }
    LodMesh {
        level,
        parts: builder.finish(),
    }
}

/// Abschluss eines Strassen-Endes: senkrechte Rechtecke für erhöhte Spuren.
fn end_cap(builder: &mut MeshBuilder, knot: &KnotData) {
    closing_rectangles(
        builder,
        knot.position,
        right_vector(knot.direction),
        &lanes_facing_away(knot),
        -knot.direction,
    );
}

fn drive_width_facing_away(knot: &KnotData) -> f32 {
    total_width(&drive_lanes_facing_away(knot))
}

/// Indizes der beiden Äste, die am ehesten eine Gerade bilden.
pub(crate) fn main_pair(knots: &[KnotData]) -> (usize, usize) {
    let mut best = (0, 1);
    let mut best_deviation = f32::MAX;
    for i in 0..knots.len() {
        for j in i + 1..knots.len() {
            let deviation =
                (180.0 - angle_between_deg(knots[i].direction, knots[j].direction)).abs();
            if deviation < best_deviation {
                best_deviation = deviation;
                best = (i, j);
            }
        }
    }
    best
}

/// Ast-Indizes im Uhrzeigersinn (aufsteigendes Heading).
pub(crate) fn clockwise_order(knots: &[KnotData]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..knots.len()).collect();
    order.sort_by(|a, b| {
        heading_deg(knots[*a].direction).total_cmp(&heading_deg(knots[*b].direction))
    });
    order
}

fn junction(
    builder: &mut MeshBuilder,
    center: Vec3,
    knots: &[KnotData],
    settings: &ConstructionSettings,
    level: u8,
) {
    let (a, b) = main_pair(knots);
    let (a, b) = if drive_width_facing_away(&knots[b]) > drive_width_facing_away(&knots[a]) {
        (b, a)
    } else {
        (a, b)
    };
    let from = &knots[a];
    let to = &knots[b];

    // Hauptverbindung: quadratische Kurve durch das Zentrum als Kontrollpunkt
    let (tangent_out, tangent_in) = calculate_tangents(&TangentInput {
        start: from.position,
        end: to.position,
        start_direction: None,
        end_direction: None,
        center: Some(center),
        smooth_slope: false,
        tangent_length: settings.tangent_length,
    });
    let main = Spline::from_tangents(from.position, tangent_out, to.position, tangent_in);
    let main_lanes: Vec<LaneDescriptor> = drive_lanes_facing_away(from).into_iter().rev().collect();
    let from_width = total_width(&main_lanes);
    let to_width = drive_width_facing_away(to);
    let end_scale = if from_width > f32::EPSILON {
        to_width / from_width
    } else {
        1.0
    };
    sweep_lanes(
        builder,
        &main.sample_frames(segments_for(&main, settings, level)),
        &main_lanes,
        |s| 1.0 + (end_scale - 1.0) * s,
    );

    // Ausfahrten der übrigen Äste
    let midpoint = main.evaluate(0.5);
    for (index, knot) in knots.iter().enumerate() {
        if index == a || index == b {
            continue;
        }
        let exit = Spline::connector(midpoint, knot.position, knot.direction);
        sweep_lanes(
            builder,
            &exit.sample_frames(segments_for(&exit, settings, level)),
            &drive_lanes_facing_away(knot),
            |_| 1.0,
        );
    }

    // Randstreifen zwischen Nachbarn im Uhrzeigersinn
    let order = clockwise_order(knots);
    let count = order.len();
    let mut right_closed = vec![false; knots.len()];
    let mut left_closed = vec![false; knots.len()];
    for position in 0..count {
        let k = order[position];
        let n = order[(position + 1) % count];
        if k == n {
            continue;
        }
        let gap = (heading_deg(knots[n].direction) - heading_deg(knots[k].direction)).rem_euclid(360.0);
        if gap > 180.0 + STRAIGHT_TOLERANCE_DEG {
            continue;
        }
        if side_connection(builder, &knots[k], &knots[n], settings, level) {
            right_closed[k] = true;
            left_closed[n] = true;
        }
    }

    // Offene erhöhte Randspuren verschließen
    for (index, knot) in knots.iter().enumerate() {
        let right = right_vector(knot.direction);
        let half_drive = knot.descriptor.drive_width() * 0.5;
        if !right_closed[index] {
            let lanes = right_side_facing_away(knot);
            let offset = half_drive + total_width(&lanes) * 0.5;
            closing_rectangles(builder, knot.position + right * offset, right, &lanes, -knot.direction);
        }
        if !left_closed[index] {
            let lanes: Vec<LaneDescriptor> = left_side_facing_away(knot).into_iter().rev().collect();
            let offset = half_drive + total_width(&lanes) * 0.5;
            closing_rectangles(builder, knot.position - right * offset, right, &lanes, -knot.direction);
        }
    }
}

/// Randstreifen von der rechten Kante von `k` zur linken Kante von `n`.
///
/// Das breitere Randprofil gewinnt, bei Gleichstand das von `k`. Fehlt einer
/// Seite das Randprofil, entsteht kein Streifen (Rückgabe `false`).
fn side_connection(
    builder: &mut MeshBuilder,
    k: &KnotData,
    n: &KnotData,
    settings: &ConstructionSettings,
    level: u8,
) -> bool {
    let k_lanes = right_side_facing_away(k);
    let n_lanes = left_side_facing_away(n);
    if k_lanes.is_empty() || n_lanes.is_empty() {
        return false;
    }
    let lanes = if total_width(&n_lanes) > total_width(&k_lanes) {
        n_lanes
    } else {
        k_lanes
    };
    let side_width = total_width(&lanes);

    let right_k = right_vector(k.direction);
    let right_n = right_vector(n.direction);
    let inner_a = k.position + right_k * (k.descriptor.drive_width() * 0.5);
    let inner_b = n.position - right_n * (n.descriptor.drive_width() * 0.5);
    let outer_a = inner_a + right_k * side_width;
    let outer_b = inner_b - right_n * side_width;

    let inner = edge_curve(inner_a, -k.direction, inner_b, n.direction);
    let outer = edge_curve(outer_a, -k.direction, outer_b, n.direction);
    let segments = segments_for(&outer, settings, level);
    side_strip(
        builder,
        &inner.sample_points(segments),
        &outer.sample_points(segments),
        &lanes,
    );
    true
}
