//! Reine Geometrie-Funktionen für kubische Bézier-Splines und Winkel auf der XZ-Ebene.
//!
//! Layer-neutral: kann von `core` und `app` importiert werden, ohne
//! Zirkel-Abhängigkeiten zu erzeugen. Alle Winkel in Grad, Richtungen im
//! Weltkoordinatensystem (Y = oben, Heading 0° = +Z, im Uhrzeigersinn).

use glam::Vec3;

/// Quadrat-Länge, unter der ein Vektor als degeneriert gilt.
pub const DEGENERATE_LENGTH_SQ: f32 = 1e-10;
/// Faktor für die Zusatz-Lücke bei spitzen Winkeln (pro Grad unter 90°, pro Meter Breite).
pub const ANGLE_DISTANCE_FACTOR: f32 = 0.02;
/// Minimaler Anteil der Basisauflösung bei aktiver Reduktion.
pub const SMART_REDUCE_MIN_FACTOR: f32 = 0.25;
/// Krümmung (Grad), ab der keine Reduktion mehr stattfindet.
pub const SMART_REDUCE_FULL_CURVATURE: f32 = 45.0;
/// Steigung (Grad), ab der keine Reduktion mehr stattfindet.
pub const SMART_REDUCE_FULL_SLOPE: f32 = 5.0;

/// B(t) = (1-t)³·P0 + 3(1-t)²t·P1 + 3(1-t)t²·P2 + t³·P3
pub fn cubic_bezier(p: &[Vec3; 4], t: f32) -> Vec3 {
    let inv = 1.0 - t;
    let inv2 = inv * inv;
    let t2 = t * t;
    inv2 * inv * p[0] + 3.0 * inv2 * t * p[1] + 3.0 * inv * t2 * p[2] + t2 * t * p[3]
}

/// B'(t) = 3(1-t)²·(P1-P0) + 6(1-t)t·(P2-P1) + 3t²·(P3-P2)
pub fn cubic_bezier_derivative(p: &[Vec3; 4], t: f32) -> Vec3 {
    let inv = 1.0 - t;
    3.0 * inv * inv * (p[1] - p[0]) + 6.0 * inv * t * (p[2] - p[1]) + 3.0 * t * t * (p[3] - p[2])
}

/// Teilt ein kubisches Segment bei `u` (de Casteljau).
///
/// Beide Hälften beschreiben zusammen exakt dieselbe Kurve; die Tangente am
/// Teilungspunkt ist auf beiden Seiten kollinear (C1).
pub fn split_cubic(p: &[Vec3; 4], u: f32) -> ([Vec3; 4], [Vec3; 4]) {
    let p01 = p[0].lerp(p[1], u);
    let p12 = p[1].lerp(p[2], u);
    let p23 = p[2].lerp(p[3], u);
    let p012 = p01.lerp(p12, u);
    let p123 = p12.lerp(p23, u);
    let mid = p012.lerp(p123, u);
    ([p[0], p01, p012, mid], [mid, p123, p23, p[3]])
}

/// Projiziert einen Vektor auf die XZ-Ebene.
pub fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Normalisiert einen Vektor; degenerierte Vektoren ergeben `Vec3::ZERO`.
pub fn safe_normalize(v: Vec3) -> Vec3 {
    if v.length_squared() < DEGENERATE_LENGTH_SQ {
        Vec3::ZERO
    } else {
        v.normalize()
    }
}

/// Horizontaler Abstand zweier Punkte (XZ-Ebene).
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    flat(b - a).length()
}

/// Ungerichteter Winkel zwischen zwei Richtungen auf der XZ-Ebene (0..=180°).
///
/// Degenerierte Richtungen ergeben 0°.
pub fn angle_between_deg(a: Vec3, b: Vec3) -> f32 {
    let a = flat(a);
    let b = flat(b);
    if a.length_squared() < DEGENERATE_LENGTH_SQ || b.length_squared() < DEGENERATE_LENGTH_SQ {
        return 0.0;
    }
    a.angle_between(b).to_degrees()
}

/// Kompass-Heading einer Richtung: 0° = +Z, im Uhrzeigersinn von oben gesehen (0..360°).
pub fn heading_deg(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z).to_degrees().rem_euclid(360.0)
}

/// Vorzeichenbehafteter Winkel von `from` nach `to` im Uhrzeigersinn (-180..=180°).
pub fn signed_angle_deg(from: Vec3, to: Vec3) -> f32 {
    let delta = (heading_deg(to) - heading_deg(from)).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Rechts-Vektor zu einer Fahrtrichtung (horizontal, normalisiert).
pub fn right_vector(forward: Vec3) -> Vec3 {
    safe_normalize(Vec3::Y.cross(flat(forward)))
}

/// Steigung zwischen zwei Punkten in Grad (immer positiv).
pub fn slope_deg(a: Vec3, b: Vec3) -> f32 {
    let horizontal = horizontal_distance(a, b);
    let vertical = (b.y - a.y).abs();
    if horizontal < 1e-6 {
        return if vertical < 1e-6 { 0.0 } else { 90.0 };
    }
    vertical.atan2(horizontal).to_degrees()
}

/// Krümmungsmaß einer Kurve: Winkel zwischen Start- und End-Ableitung auf der XZ-Ebene.
pub fn curvature_deg(start_derivative: Vec3, end_derivative: Vec3) -> f32 {
    angle_between_deg(start_derivative, end_derivative)
}

/// Abstand, um den ein Ast `a` vom Kreuzungs-Zentrum zurückweichen muss,
/// damit er den benachbarten Ast `b` nicht berührt.
///
/// `w_a * 0.5 + gap`, bei Winkeln unter 90° zusätzlich
/// `(90° - angle) * w_b * ANGLE_DISTANCE_FACTOR`.
pub fn get_angle_distance(gap: f32, width_a: f32, width_b: f32, angle_deg: f32) -> f32 {
    let base = width_a * 0.5 + gap;
    if angle_deg >= 90.0 {
        base
    } else {
        base + (90.0 - angle_deg.max(0.0)) * width_b * ANGLE_DISTANCE_FACTOR
    }
}

/// Eingabe für [`calculate_tangents`].
#[derive(Debug, Clone, Copy)]
pub struct TangentInput {
    /// Startpunkt der Kurve
    pub start: Vec3,
    /// Endpunkt der Kurve
    pub end: Vec3,
    /// Gewünschte Fahrtrichtung am Start (z.B. Fortsetzung eines bestehenden Asts)
    pub start_direction: Option<Vec3>,
    /// Gewünschte Fahrtrichtung am Ende
    pub end_direction: Option<Vec3>,
    /// Expliziter Kontrollpunkt für symmetrische Krümmung
    pub center: Option<Vec3>,
    /// Steigung an den Enden auslaufen lassen statt linear zu verteilen
    pub smooth_slope: bool,
    /// Tangenten-Länge als Anteil der Sehne
    pub tangent_length: f32,
}

/// Berechnet Start- und End-Tangente eines kubischen Segments.
///
/// Rückgabe: (`tangent_out` am Start, `tangent_in` am Ende), beide relativ zum
/// jeweiligen Knoten. `tangent_in` zeigt entgegen der Fahrtrichtung.
///
/// Mit `center` entsteht die exakte kubische Form einer quadratischen Kurve
/// durch diesen Kontrollpunkt. Ohne Richtungsvorgabe am Ende wird die
/// Start-Richtung an der Sehne gespiegelt.
pub fn calculate_tangents(input: &TangentInput) -> (Vec3, Vec3) {
    let chord = input.end - input.start;
    let chord_length = chord.length();
    if chord_length < 1e-5 {
        return (Vec3::ZERO, Vec3::ZERO);
    }

    let (mut out, mut inn) = match input.center {
        Some(center) => (
            (center - input.start) * (2.0 / 3.0),
            (center - input.end) * (2.0 / 3.0),
        ),
        None => {
            let chord_dir = flat(chord).normalize_or_zero();
            let start_dir = input
                .start_direction
                .map(|d| safe_normalize(flat(d)))
                .filter(|d| *d != Vec3::ZERO)
                .unwrap_or(chord_dir);
            let end_dir = input
                .end_direction
                .map(|d| safe_normalize(flat(d)))
                .filter(|d| *d != Vec3::ZERO)
                .unwrap_or_else(|| {
                    if input.start_direction.is_some() {
                        safe_normalize(2.0 * start_dir.dot(chord_dir) * chord_dir - start_dir)
                    } else {
                        chord_dir
                    }
                });
            let length = chord_length * input.tangent_length;
            (start_dir * length, -end_dir * length)
        }
    };

    let horizontal = flat(chord).length();
    if input.smooth_slope || horizontal < 1e-5 {
        out.y = 0.0;
        inn.y = 0.0;
    } else {
        let grade = chord.y / horizontal;
        out.y = flat(out).length() * grade;
        inn.y = -flat(inn).length() * grade;
    }
    (out, inn)
}

/// Anzahl der Mesh-Segmente für eine Kurve.
///
/// `base` Segmente pro 10 Meter. Mit `smart_reduce` sinkt die Auflösung bei
/// geraden, flachen Kurven bis auf `SMART_REDUCE_MIN_FACTOR`.
pub fn calculate_resolution(
    length: f32,
    base: f32,
    smart_reduce: bool,
    curvature_deg: f32,
    slope_deg: f32,
) -> usize {
    let mut segments = (length / 10.0 * base).max(1.0);
    if smart_reduce {
        let bend = (curvature_deg / SMART_REDUCE_FULL_CURVATURE)
            .max(slope_deg / SMART_REDUCE_FULL_SLOPE)
            .clamp(0.0, 1.0);
        segments *= SMART_REDUCE_MIN_FACTOR + (1.0 - SMART_REDUCE_MIN_FACTOR) * bend;
    }
    segments.ceil().max(1.0) as usize
}

/// Tangenten-Länge für einen Kreis aus `knot_count` Bézier-Segmenten.
///
/// kappa = 4/3 · tan(π / (2n)), für n = 4 der bekannte Wert 0.5523.
pub fn circle_tangent_length(radius: f32, knot_count: usize) -> f32 {
    let n = knot_count.max(3) as f32;
    radius * 4.0 / 3.0 * (std::f32::consts::PI / (2.0 * n)).tan()
}

/// Approximierte Länge einer Polyline.
pub fn polyline_length(points: &[Vec3]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}
