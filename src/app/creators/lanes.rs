//! Querprofil-Sweeps: Spuren entlang von Kurven zu Mesh-Flächen extrudieren.

use glam::Vec3;

use crate::core::{Frame, KnotData, LaneDescriptor, MeshBuilder};

/// UV-Wiederholung in Fahrtrichtung (Meter pro Textur-Kachel).
const UV_METERS_PER_TILE: f32 = 4.0;

/// Seitliche Offsets jeder Spur (links, rechts), relativ zur Profilmitte.
pub(crate) fn lane_offsets(lanes: &[LaneDescriptor]) -> Vec<(f32, f32)> {
    let total: f32 = lanes.iter().map(|l| l.width).sum();
    let mut left = -total * 0.5;
    lanes
        .iter()
        .map(|lane| {
            let offsets = (left, left + lane.width);
            left += lane.width;
            offsets
        })
        .collect()
}

/// Spuren in Blickrichtung weg vom Zentrum, von links nach rechts.
///
/// Das Profil einer Strasse gilt in ihrer Fahrtrichtung; endet die Strasse am
/// Zentrum, ist es aus Sicht des Zentrums gespiegelt.
pub(crate) fn lanes_facing_away(knot: &KnotData) -> Vec<LaneDescriptor> {
    if knot.starts_at_center() {
        knot.descriptor.lanes.clone()
    } else {
        knot.descriptor.lanes.iter().rev().cloned().collect()
    }
}

/// Nur die Fahrspuren, in Blickrichtung weg vom Zentrum.
pub(crate) fn drive_lanes_facing_away(knot: &KnotData) -> Vec<LaneDescriptor> {
    let drive = knot.descriptor.drive_lanes();
    if knot.starts_at_center() {
        drive.to_vec()
    } else {
        drive.iter().rev().cloned().collect()
    }
}

/// Randspuren auf der rechten Seite (weg vom Zentrum gesehen), von der
/// Fahrbahnkante nach außen.
pub(crate) fn right_side_facing_away(knot: &KnotData) -> Vec<LaneDescriptor> {
    if knot.starts_at_center() {
        knot.descriptor.right_side_lanes().to_vec()
    } else {
        knot.descriptor.left_side_lanes().iter().rev().cloned().collect()
    }
}

/// Randspuren auf der linken Seite (weg vom Zentrum gesehen), von der
/// Fahrbahnkante nach außen.
pub(crate) fn left_side_facing_away(knot: &KnotData) -> Vec<LaneDescriptor> {
    if knot.starts_at_center() {
        knot.descriptor.left_side_lanes().iter().rev().cloned().collect()
    } else {
        knot.descriptor.right_side_lanes().to_vec()
    }
}

pub(crate) fn total_width(lanes: &[LaneDescriptor]) -> f32 {
    lanes.iter().map(|l| l.width).sum()
}

/// Extrudiert ein Querprofil entlang einer Frame-Folge.
///
/// `width_scale(s)` skaliert die Profilbreite abhängig vom Fortschritt
/// `s ∈ [0, 1]` (für Übergänge zwischen unterschiedlich breiten Ästen).
pub(crate) fn sweep_lanes(
    builder: &mut MeshBuilder,
    frames: &[Frame],
    lanes: &[LaneDescriptor],
    width_scale: impl Fn(f32) -> f32,
) {
    if frames.len() < 2 || lanes.is_empty() {
        return;
    }
    let offsets = lane_offsets(lanes);
    let last = (frames.len() - 1) as f32;

    let mut travelled = 0.0f32;
    for (i, pair) in frames.windows(2).enumerate() {
        let (f0, f1) = (pair[0], pair[1]);
        let scale0 = width_scale(i as f32 / last);
        let scale1 = width_scale((i + 1) as f32 / last);
        let v0 = travelled / UV_METERS_PER_TILE;
        travelled += f0.position.distance(f1.position);
        let v1 = travelled / UV_METERS_PER_TILE;

        for (k, (lane, (x0, x1))) in lanes.iter().zip(&offsets).enumerate() {
            let lift = Vec3::Y * lane.height;
            let a = f0.position + f0.right * (x0 * scale0) + lift;
            let b = f0.position + f0.right * (x1 * scale0) + lift;
            let c = f1.position + f1.right * (x1 * scale1) + lift;
            let d = f1.position + f1.right * (x0 * scale1) + lift;
            builder.add_quad_facing(
                &lane.material,
                [a, b, c, d],
                [[0.0, v0], [1.0, v0], [1.0, v1], [0.0, v1]],
                Vec3::Y,
            );

            // Kanten zu niedrigeren Nachbarn (Bordsteine)
            let left_height = k.checked_sub(1).map_or(0.0, |j| lanes[j].height);
            let right_height = lanes.get(k + 1).map_or(0.0, |l| l.height);
            if lane.height > left_height {
                let drop = Vec3::Y * (lane.height - left_height);
                builder.add_quad_facing(
                    &lane.material,
                    [a - drop, a, d, d - drop],
                    [[0.0, v0], [0.1, v0], [0.1, v1], [0.0, v1]],
                    -f0.right,
                );
            }
            if lane.height > right_height {
                let drop = Vec3::Y * (lane.height - right_height);
                builder.add_quad_facing(
                    &lane.material,
                    [b, b - drop, c - drop, c],
                    [[0.9, v0], [1.0, v0], [1.0, v1], [0.9, v1]],
                    f0.right,
                );
            }
        }
    }
}

/// Schließt erhöhte Spuren an einem offenen Ende mit senkrechten Rechtecken.
///
/// `right` ist der Rechts-Vektor des Profils, `facing` die Blickrichtung der
/// Abschlussfläche.
pub(crate) fn closing_rectangles(
    builder: &mut MeshBuilder,
    position: Vec3,
    right: Vec3,
    lanes: &[LaneDescriptor],
    facing: Vec3,
) {
    for (lane, (x0, x1)) in lanes.iter().zip(lane_offsets(lanes)) {
        if lane.height <= 0.0 {
            continue;
        }
        let a = position + right * x0;
        let b = position + right * x1;
        let top = Vec3::Y * lane.height;
        builder.add_quad_facing(
            &lane.material,
            [a, b, b + top, a + top],
            [[0.0, 0.0], [1.0, 0.0], [1.0, 0.1], [0.0, 0.1]],
            facing,
        );
    }
}

/// Randstreifen zwischen zwei Kurven (`inner` = Fahrbahnkante, `outer` = Außenkante).
///
/// Die Spuren werden proportional zu ihrer Breite zwischen den Kurven verteilt.
pub(crate) fn side_strip(
    builder: &mut MeshBuilder,
    inner: &[Vec3],
    outer: &[Vec3],
    lanes: &[LaneDescriptor],
) {
    let total = total_width(lanes);
    if inner.len() < 2 || inner.len() != outer.len() || total <= f32::EPSILON {
        return;
    }

    let mut fractions = Vec::with_capacity(lanes.len());
    let mut start = 0.0;
    for lane in lanes {
        let end = start + lane.width / total;
        fractions.push((start, end));
        start = end;
    }

    let mut travelled = 0.0f32;
    for i in 0..inner.len() - 1 {
        let v0 = travelled / UV_METERS_PER_TILE;
        travelled += inner[i].distance(inner[i + 1]);
        let v1 = travelled / UV_METERS_PER_TILE;
        for (lane, (f0, f1)) in lanes.iter().zip(&fractions) {
            let lift = Vec3::Y * lane.height;
            let a = inner[i].lerp(outer[i], *f0) + lift;
            let b = inner[i].lerp(outer[i], *f1) + lift;
            let c = inner[i + 1].lerp(outer[i + 1], *f1) + lift;
            let d = inner[i + 1].lerp(outer[i + 1], *f0) + lift;
            builder.add_quad_facing(
                &lane.material,
                [a, b, c, d],
                [[0.0, v0], [1.0, v0], [1.0, v1], [0.0, v1]],
                Vec3::Y,
            );
        }
    }
}
