//! Stückweise kubische Bézier-Splines mit Bogenlängen-Parametrisierung.
//!
//! Ein `Spline` ist eine Folge von `Knot`s; jeder Knoten trägt seine Position
//! und zwei relative Tangenten (`tangent_in` zeigt entgegen der Fahrtrichtung,
//! `tangent_out` in Fahrtrichtung). Der öffentliche Parameter `t ∈ [0, 1]` ist
//! bogenlängen-normiert: `t = 0.5` liegt auf halber Strecke.
//!
//! Alle Operationen sind unveränderlich und liefern neue Splines.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::shared::spline_geometry::{
    circle_tangent_length, cubic_bezier, cubic_bezier_derivative, curvature_deg, right_vector,
    safe_normalize, slope_deg, split_cubic,
};

/// Stützstellen pro Segment in der Bogenlängen-Tabelle.
const LUT_SAMPLES: usize = 32;
/// Grobe Abtastung pro Segment für die Nächster-Punkt-Suche.
const NEAREST_COARSE_SAMPLES: usize = 24;
/// Iterationen der Goldener-Schnitt-Verfeinerung.
const NEAREST_REFINE_ITERATIONS: usize = 24;
/// Abtastpunkte pro Segment für die Steigungs-Prüfung.
const SLOPE_SAMPLES: usize = 8;

/// Abstand, unter dem ein Teilungspunkt auf einen bestehenden Knoten einrastet.
pub const KNOT_EPSILON: f32 = 1e-3;
/// Anteil der Länge, ab dem eine Kürzung als unmöglich gilt.
pub const SHORTEN_LIMIT: f32 = 0.99;

/// Stützpunkt eines Splines.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Knot {
    /// Weltposition
    pub position: Vec3,
    /// Eingehende Tangente (relativ, entgegen der Fahrtrichtung)
    pub tangent_in: Vec3,
    /// Ausgehende Tangente (relativ, in Fahrtrichtung)
    pub tangent_out: Vec3,
}

impl Knot {
    /// Erstellt einen Knoten mit expliziten Tangenten.
    pub fn new(position: Vec3, tangent_in: Vec3, tangent_out: Vec3) -> Self {
        Self {
            position,
            tangent_in,
            tangent_out,
        }
    }

    /// Knoten mit gespiegelter Eingangstangente (C1-stetig).
    pub fn mirrored(position: Vec3, tangent_out: Vec3) -> Self {
        Self::new(position, -tangent_out, tangent_out)
    }

    /// Vertauscht Ein- und Ausgang (für umgekehrte Fahrtrichtung).
    pub fn reversed(self) -> Self {
        Self::new(self.position, self.tangent_out, self.tangent_in)
    }

    /// Fahrtrichtung am Knoten (normalisiert, ggf. `Vec3::ZERO`).
    pub fn direction(&self) -> Vec3 {
        let out = safe_normalize(self.tangent_out);
        if out != Vec3::ZERO {
            out
        } else {
            safe_normalize(-self.tangent_in)
        }
    }
}

/// Lokales Koordinatensystem an einer Kurvenstelle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Position auf der Kurve
    pub position: Vec3,
    /// Fahrtrichtung (normalisiert)
    pub forward: Vec3,
    /// Horizontaler Rechts-Vektor
    pub right: Vec3,
    /// Oben-Vektor senkrecht zu Fahrtrichtung und Rechts-Vektor
    pub up: Vec3,
}

/// Ergebnis einer Nächster-Punkt-Suche.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoint {
    /// Bogenlängen-Parameter des Treffers
    pub t: f32,
    /// Position auf der Kurve
    pub position: Vec3,
    /// Abstand zum Suchpunkt
    pub distance: f32,
}

/// Bogenlängen-Tabelle eines Splines (pro Segment kumulierte Längen).
struct ArcTable {
    segment_luts: Vec<Vec<f32>>,
    prefix: Vec<f32>,
    total: f32,
}

impl ArcTable {
    fn new(spline: &Spline) -> Self {
        let count = spline.segment_count();
        let mut segment_luts = Vec::with_capacity(count);
        let mut prefix = Vec::with_capacity(count);
        let mut total = 0.0f32;

        for index in 0..count {
            let points = spline.segment(index);
            let mut lut = Vec::with_capacity(LUT_SAMPLES + 1);
            let mut prev = points[0];
            let mut cumulative = 0.0f32;
            lut.push(0.0);
            for i in 1..=LUT_SAMPLES {
                let p = cubic_bezier(&points, i as f32 / LUT_SAMPLES as f32);
                cumulative += prev.distance(p);
                lut.push(cumulative);
                prev = p;
            }
            prefix.push(total);
            total += cumulative;
            segment_luts.push(lut);
        }

        Self {
            segment_luts,
            prefix,
            total,
        }
    }

    /// Bogenlängen-Parameter → (Segment, lokaler Bézier-Parameter).
    fn locate(&self, t: f32) -> (usize, f32) {
        let count = self.segment_luts.len();
        if count == 0 {
            return (0, 0.0);
        }
        if self.total <= f32::EPSILON {
            let scaled = t.clamp(0.0, 1.0) * count as f32;
            let segment = (scaled.floor() as usize).min(count - 1);
            return (segment, scaled - segment as f32);
        }

        let target = t.clamp(0.0, 1.0) * self.total;
        let segment = self
            .prefix
            .partition_point(|&p| p <= target)
            .saturating_sub(1)
            .min(count - 1);
        let local = target - self.prefix[segment];
        let lut = &self.segment_luts[segment];
        let idx = lut
            .partition_point(|&len| len < local)
            .clamp(1, LUT_SAMPLES);

        let len_before = lut[idx - 1];
        let len_after = lut[idx];
        let frac = if (len_after - len_before).abs() > f32::EPSILON {
            ((local - len_before) / (len_after - len_before)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (segment, ((idx - 1) as f32 + frac) / LUT_SAMPLES as f32)
    }

    /// (Segment, lokaler Bézier-Parameter) → Bogenlängen-Parameter.
    fn parameter(&self, segment: usize, u: f32) -> f32 {
        if self.total <= f32::EPSILON || segment >= self.segment_luts.len() {
            return 0.0;
        }
        let lut = &self.segment_luts[segment];
        let scaled = u.clamp(0.0, 1.0) * LUT_SAMPLES as f32;
        let idx = (scaled.floor() as usize).min(LUT_SAMPLES - 1);
        let frac = scaled - idx as f32;
        let local = lut[idx] + (lut[idx + 1] - lut[idx]) * frac;
        ((self.prefix[segment] + local) / self.total).clamp(0.0, 1.0)
    }
}

/// Stückweise kubische Bézier-Kurve.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Spline {
    knots: Vec<Knot>,
    #[serde(default)]
    closed: bool,
}

impl Spline {
    /// Offene Kurve durch die gegebenen Knoten.
    pub fn new(knots: Vec<Knot>) -> Self {
        Self {
            knots,
            closed: false,
        }
    }

    /// Geschlossene Kurve: das letzte Segment führt zurück zum ersten Knoten.
    pub fn new_closed(knots: Vec<Knot>) -> Self {
        Self {
            knots,
            closed: true,
        }
    }

    /// Gerade Verbindung zweier Punkte.
    pub fn straight(start: Vec3, end: Vec3) -> Self {
        let third = (end - start) / 3.0;
        Self::new(vec![
            Knot::mirrored(start, third),
            Knot::mirrored(end, third),
        ])
    }

    /// Zweipunkt-Kurve aus Start-Tangente und End-Tangente (relativ).
    pub fn from_tangents(start: Vec3, tangent_out: Vec3, end: Vec3, tangent_in: Vec3) -> Self {
        Self::new(vec![
            Knot::new(start, -tangent_out, tangent_out),
            Knot::new(end, tangent_in, -tangent_in),
        ])
    }

    pub fn knots(&self) -> &[Knot] {
        &self.knots
    }

    pub fn knot(&self, index: usize) -> Option<&Knot> {
        self.knots.get(index)
    }

    pub fn knot_count(&self) -> usize {
        self.knots.len()
    }

    /// Index des letzten Knotens.
    pub fn last_index(&self) -> usize {
        self.knots.len().saturating_sub(1)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Position des ersten Knotens.
    pub fn first_position(&self) -> Vec3 {
        self.knots.first().map_or(Vec3::ZERO, |k| k.position)
    }

    /// Position des letzten Knotens.
    pub fn last_position(&self) -> Vec3 {
        self.knots.last().map_or(Vec3::ZERO, |k| k.position)
    }

    /// Anzahl der kubischen Segmente.
    pub fn segment_count(&self) -> usize {
        match self.knots.len() {
            0 | 1 => 0,
            n if self.closed => n,
            n => n - 1,
        }
    }

    /// Die vier Kontrollpunkte eines Segments.
    pub fn segment(&self, index: usize) -> [Vec3; 4] {
        let n = self.knots.len();
        let a = self.knots[index % n];
        let b = self.knots[(index + 1) % n];
        [
            a.position,
            a.position + a.tangent_out,
            b.position + b.tangent_in,
            b.position,
        ]
    }

    fn arc_table(&self) -> ArcTable {
        ArcTable::new(self)
    }

    /// Gesamtlänge (Polylinien-Näherung).
    pub fn length(&self) -> f32 {
        self.arc_table().total
    }

    /// Punkt bei Bogenlängen-Parameter `t`.
    pub fn evaluate(&self, t: f32) -> Vec3 {
        self.evaluate_with(&self.arc_table(), t)
    }

    fn evaluate_with(&self, table: &ArcTable, t: f32) -> Vec3 {
        if self.segment_count() == 0 {
            return self.first_position();
        }
        let (segment, u) = table.locate(t);
        cubic_bezier(&self.segment(segment), u)
    }

    /// Erste Ableitung bei `t` (nicht normalisiert).
    pub fn derivative(&self, t: f32) -> Vec3 {
        self.derivative_with(&self.arc_table(), t)
    }

    fn derivative_with(&self, table: &ArcTable, t: f32) -> Vec3 {
        if self.segment_count() == 0 {
            return Vec3::ZERO;
        }
        let (segment, u) = table.locate(t);
        cubic_bezier_derivative(&self.segment(segment), u)
    }

    /// Normalisierte Fahrtrichtung bei `t`; degenerierte Tangenten werden
    /// über benachbarte Kurvenpunkte ersetzt.
    pub fn tangent(&self, t: f32) -> Vec3 {
        self.tangent_with(&self.arc_table(), t)
    }

    fn tangent_with(&self, table: &ArcTable, t: f32) -> Vec3 {
        let direction = safe_normalize(self.derivative_with(table, t));
        if direction != Vec3::ZERO {
            return direction;
        }
        let before = self.evaluate_with(table, (t - 0.01).max(0.0));
        let after = self.evaluate_with(table, (t + 0.01).min(1.0));
        safe_normalize(after - before)
    }

    /// Lokales Koordinatensystem bei `t`.
    pub fn frame(&self, t: f32) -> Frame {
        self.frame_with(&self.arc_table(), t)
    }

    fn frame_with(&self, table: &ArcTable, t: f32) -> Frame {
        let forward = self.tangent_with(table, t);
        let right = right_vector(forward);
        let up = safe_normalize(forward.cross(right));
        Frame {
            position: self.evaluate_with(table, t),
            forward,
            right,
            up: if up == Vec3::ZERO { Vec3::Y } else { up },
        }
    }

    /// `count + 1` gleichmäßig verteilte Frames (inklusive beider Enden).
    pub fn sample_frames(&self, count: usize) -> Vec<Frame> {
        let table = self.arc_table();
        let count = count.max(1);
        (0..=count)
            .map(|i| self.frame_with(&table, i as f32 / count as f32))
            .collect()
    }

    /// `count + 1` gleichmäßig verteilte Punkte (inklusive beider Enden).
    pub fn sample_points(&self, count: usize) -> Vec<Vec3> {
        let table = self.arc_table();
        let count = count.max(1);
        (0..=count)
            .map(|i| self.evaluate_with(&table, i as f32 / count as f32))
            .collect()
    }

    /// Fahrtrichtung am Start.
    pub fn start_direction(&self) -> Vec3 {
        self.tangent(0.0)
    }

    /// Fahrtrichtung am Ende.
    pub fn end_direction(&self) -> Vec3 {
        self.tangent(1.0)
    }

    /// Krümmungsmaß (Winkel zwischen Start- und End-Ableitung, horizontal).
    pub fn curvature(&self) -> f32 {
        let table = self.arc_table();
        curvature_deg(
            self.tangent_with(&table, 0.0),
            self.tangent_with(&table, 1.0),
        )
    }

    /// Maximale Steigung entlang der Kurve in Grad.
    pub fn max_slope(&self) -> f32 {
        let samples = self.segment_count().max(1) * SLOPE_SAMPLES;
        self.sample_points(samples)
            .windows(2)
            .map(|w| slope_deg(w[0], w[1]))
            .fold(0.0, f32::max)
    }

    /// Nächster Punkt auf der Kurve (grobe Abtastung + Goldener Schnitt).
    pub fn nearest_point(&self, point: Vec3) -> Option<NearestPoint> {
        let count = self.segment_count();
        if count == 0 {
            let knot = self.knots.first()?;
            return Some(NearestPoint {
                t: 0.0,
                position: knot.position,
                distance: knot.position.distance(point),
            });
        }

        let mut best_segment = 0;
        let mut best_u = 0.0;
        let mut best_distance = f32::MAX;
        for segment in 0..count {
            let points = self.segment(segment);
            for i in 0..=NEAREST_COARSE_SAMPLES {
                let u = i as f32 / NEAREST_COARSE_SAMPLES as f32;
                let distance = cubic_bezier(&points, u).distance_squared(point);
                if distance < best_distance {
                    best_distance = distance;
                    best_segment = segment;
                    best_u = u;
                }
            }
        }

        let points = self.segment(best_segment);
        let step = 1.0 / NEAREST_COARSE_SAMPLES as f32;
        let mut lo = (best_u - step).max(0.0);
        let mut hi = (best_u + step).min(1.0);
        let ratio = 0.618_034f32;
        let cost = |u: f32| cubic_bezier(&points, u).distance_squared(point);
        for _ in 0..NEAREST_REFINE_ITERATIONS {
            let a = hi - (hi - lo) * ratio;
            let b = lo + (hi - lo) * ratio;
            if cost(a) < cost(b) {
                hi = b;
            } else {
                lo = a;
            }
        }
        let mut u = (lo + hi) * 0.5;
        if cost(best_u) < cost(u) {
            u = best_u;
        }

        let position = cubic_bezier(&points, u);
        Some(NearestPoint {
            t: self.arc_table().parameter(best_segment, u),
            position,
            distance: position.distance(point),
        })
    }

    /// Fügt einen Knoten bei `t` ein, ohne die Kurvenform zu verändern.
    ///
    /// Rückgabe: neue Kurve und Index des Knotens bei `t`. Liegt `t` auf einem
    /// bestehenden Knoten, wird dieser zurückgegeben und nichts eingefügt.
    pub fn insert_knot(&self, t: f32) -> (Spline, usize) {
        if self.segment_count() == 0 {
            return (self.clone(), 0);
        }
        let (segment, u) = self.arc_table().locate(t);
        let points = self.segment(segment);
        let next = (segment + 1) % self.knots.len();
        let point = cubic_bezier(&points, u);
        if point.distance(points[0]) < KNOT_EPSILON {
            return (self.clone(), segment);
        }
        if point.distance(points[3]) < KNOT_EPSILON {
            return (self.clone(), next);
        }

        let (left, right) = split_cubic(&points, u);
        let mut knots = Vec::with_capacity(self.knots.len() + 1);
        for (i, knot) in self.knots.iter().enumerate() {
            let mut knot = *knot;
            if i == segment {
                knot.tangent_out = left[1] - left[0];
            }
            if i == next {
                knot.tangent_in = right[2] - right[3];
            }
            knots.push(knot);
            if i == segment {
                knots.push(Knot::new(
                    left[3],
                    left[2] - left[3],
                    right[1] - right[0],
                ));
            }
        }

        (
            Spline {
                knots,
                closed: self.closed,
            },
            segment + 1,
        )
    }

    /// Teilt eine offene Kurve bei `t` in zwei Teile.
    ///
    /// `None`, wenn `t` auf einem Endknoten liegt.
    pub fn split(&self, t: f32) -> Option<(Spline, Spline)> {
        if self.closed {
            return None;
        }
        let (inserted, index) = self.insert_knot(t);
        if index == 0 || index >= inserted.last_index() {
            return None;
        }
        Some((
            Spline::new(inserted.knots[..=index].to_vec()),
            Spline::new(inserted.knots[index..].to_vec()),
        ))
    }

    /// Teilstück zwischen `t0` und `t1` (`t0 < t1`).
    pub fn sub_spline(&self, t0: f32, t1: f32) -> Option<Spline> {
        if self.closed || t1 <= t0 || self.segment_count() == 0 {
            return None;
        }
        let (upper, end_index) = self.insert_knot(t1);
        let (both, start_index) = upper.insert_knot(t0);
        let end_index = if both.knots.len() > upper.knots.len() && start_index <= end_index {
            end_index + 1
        } else {
            end_index
        };
        if end_index <= start_index {
            return None;
        }
        Some(Spline::new(both.knots[start_index..=end_index].to_vec()))
    }

    /// Kürzt die Kurve um `distance` Meter vom Start.
    ///
    /// `None`, wenn die Kürzung mindestens 99 % der Länge ausmachen würde.
    pub fn reduce_from_start(&self, distance: f32) -> Option<Spline> {
        if distance <= 0.0 {
            return Some(self.clone());
        }
        let length = self.length();
        if length <= f32::EPSILON || distance >= length * SHORTEN_LIMIT {
            return None;
        }
        self.sub_spline(distance / length, 1.0)
    }

    /// Kürzt die Kurve um `distance` Meter vom Ende.
    pub fn reduce_from_end(&self, distance: f32) -> Option<Spline> {
        if distance <= 0.0 {
            return Some(self.clone());
        }
        let length = self.length();
        if length <= f32::EPSILON || distance >= length * SHORTEN_LIMIT {
            return None;
        }
        self.sub_spline(0.0, 1.0 - distance / length)
    }

    /// Kurve mit umgekehrter Fahrtrichtung.
    pub fn reversed(&self) -> Spline {
        Spline {
            knots: self.knots.iter().rev().map(|k| k.reversed()).collect(),
            closed: self.closed,
        }
    }

    /// Parallel verschobene Kurve (`distance > 0` = nach rechts).
    ///
    /// Tangenten werden pro Segment mit dem Sehnen-Verhältnis skaliert.
    pub fn offset(&self, distance: f32) -> Spline {
        if self.knots.len() < 2 {
            return self.clone();
        }
        let mut knots: Vec<Knot> = self
            .knots
            .iter()
            .map(|k| {
                let shift = right_vector(k.direction()) * distance;
                Knot::new(k.position + shift, k.tangent_in, k.tangent_out)
            })
            .collect();

        let n = knots.len();
        for segment in 0..self.segment_count() {
            let next = (segment + 1) % n;
            let old_chord = self.knots[segment]
                .position
                .distance(self.knots[next].position);
            if old_chord <= f32::EPSILON {
                continue;
            }
            let scale = knots[segment].position.distance(knots[next].position) / old_chord;
            knots[segment].tangent_out *= scale;
            knots[next].tangent_in *= scale;
        }

        Spline {
            knots,
            closed: self.closed,
        }
    }

    /// Kopie mit ersetztem Knoten.
    pub fn with_knot(&self, index: usize, knot: Knot) -> Spline {
        let mut result = self.clone();
        if let Some(slot) = result.knots.get_mut(index) {
            *slot = knot;
        }
        result
    }

    /// Verschiebt einen Endknoten nach `position`.
    ///
    /// Die Tangente am verschobenen Knoten zeigt entlang der neuen Sehne, die
    /// Tangente des Nachbarknotens wird mit dem Sehnen-Verhältnis skaliert.
    pub fn with_moved_end(&self, index: usize, position: Vec3) -> Spline {
        if self.knots.len() < 2 || index >= self.knots.len() {
            return self.clone();
        }
        let mut knots = self.knots.clone();
        let neighbour = if index == 0 { 1 } else { index - 1 };
        let old_chord = knots[index].position.distance(knots[neighbour].position);
        let new_chord = position.distance(knots[neighbour].position);
        let scale = if old_chord > f32::EPSILON {
            new_chord / old_chord
        } else {
            1.0
        };
        let third = new_chord / 3.0;
        if index == 0 {
            let direction = safe_normalize(knots[neighbour].position - position);
            knots[0] = Knot::mirrored(position, direction * third);
            knots[neighbour].tangent_in *= scale;
        } else {
            let direction = safe_normalize(position - knots[neighbour].position);
            knots[index] = Knot::mirrored(position, direction * third);
            knots[neighbour].tangent_out *= scale;
        }
        Spline {
            knots,
            closed: self.closed,
        }
    }

    /// Hängt `other` an. Fallen die Enden zusammen, werden die Knoten
    /// verschmolzen, sonst verbindet ein Übergangssegment beide Kurven.
    pub fn join(&self, other: &Spline) -> Spline {
        let (Some(last), Some(first)) = (self.knots.last(), other.knots.first()) else {
            return if self.knots.is_empty() {
                other.clone()
            } else {
                self.clone()
            };
        };

        let mut knots = self.knots.clone();
        let gap = last.position.distance(first.position);
        if gap < KNOT_EPSILON * 10.0 {
            if let Some(merged) = knots.last_mut() {
                merged.tangent_out = first.tangent_out;
            }
            knots.extend_from_slice(&other.knots[1..]);
        } else {
            let chord = safe_normalize(first.position - last.position);
            let dir_a = Some(last.direction())
                .filter(|d| *d != Vec3::ZERO)
                .unwrap_or(chord);
            let dir_b = Some(first.direction())
                .filter(|d| *d != Vec3::ZERO)
                .unwrap_or(chord);
            if let Some(end) = knots.last_mut() {
                end.tangent_out = dir_a * gap / 3.0;
            }
            let mut start = *first;
            start.tangent_in = -dir_b * gap / 3.0;
            knots.push(start);
            knots.extend_from_slice(&other.knots[1..]);
        }
        Spline::new(knots)
    }

    /// Geschlossener Kreis aus `knot_count` Bézier-Segmenten auf der XZ-Ebene.
    pub fn circle(center: Vec3, radius: f32, knot_count: usize) -> Spline {
        let count = knot_count.max(3);
        let tangent = circle_tangent_length(radius, count);
        let knots = (0..count)
            .map(|i| {
                let phi = std::f32::consts::TAU * i as f32 / count as f32;
                let (sin, cos) = phi.sin_cos();
                let position = center + Vec3::new(cos * radius, 0.0, sin * radius);
                let direction = Vec3::new(-sin, 0.0, cos);
                Knot::mirrored(position, direction * tangent)
            })
            .collect();
        Spline::new_closed(knots)
    }

    /// Kurze Verbindungskurve vom Kreuzungs-Zentrum zu einem Ast-Knoten.
    ///
    /// Am Ast-Knoten läuft die Kurve in `outward` (weg vom Zentrum) aus.
    pub fn connector(center: Vec3, knot_position: Vec3, outward: Vec3) -> Spline {
        let length = center.distance(knot_position) / 3.0;
        let outward = safe_normalize(outward);
        let start = Some(safe_normalize(knot_position - center))
            .filter(|d| *d != Vec3::ZERO)
            .unwrap_or(outward);
        Spline::new(vec![
            Knot::mirrored(center, start * length),
            Knot::mirrored(knot_position, outward * length),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bent() -> Spline {
        Spline::from_tangents(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(30.0, 0.0, 20.0),
            Vec3::new(-10.0, 0.0, 0.0),
        )
    }

    #[test]
    fn straight_length_matches_chord() {
        let spline = Spline::straight(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0));
        assert_relative_eq!(spline.length(), 20.0, epsilon = 1e-4);
        assert_relative_eq!(spline.curvature(), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn evaluate_is_arc_length_parametrised() {
        let spline = bent();
        let length = spline.length();
        let quarter = spline.sub_spline(0.0, 0.25).expect("Teilstück erwartet");
        assert_relative_eq!(quarter.length(), length * 0.25, epsilon = 0.05);
    }

    #[test]
    fn insert_knot_keeps_shape() {
        let spline = bent();
        let (inserted, index) = spline.insert_knot(0.4);
        assert_eq!(index, 1);
        assert_eq!(inserted.knot_count(), 3);
        for i in 0..=20 {
            let t = i as f32 / 20.0;
            assert!(spline.evaluate(t).distance(inserted.evaluate(t)) < 0.1);
        }
    }

    #[test]
    fn insert_knot_at_existing_knot_is_noop() {
        let spline = bent();
        let (same, index) = spline.insert_knot(1.0);
        assert_eq!(same, spline);
        assert_eq!(index, 1);
    }

    #[test]
    fn split_halves_join_back_to_same_curve() {
        let spline = bent();
        let (left, right) = spline.split(0.5).expect("Teilung erwartet");
        assert!(left.last_position().distance(right.first_position()) < 1e-5);
        let joined = left.join(&right);
        assert_eq!(joined.knot_count(), 3);
        assert_relative_eq!(joined.length(), spline.length(), epsilon = 0.05);
    }

    #[test]
    fn split_at_end_is_rejected() {
        assert!(bent().split(0.0).is_none());
        assert!(bent().split(1.0).is_none());
    }

    #[test]
    fn reduce_shortens_by_absolute_distance() {
        let spline = Spline::straight(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0));
        let reduced = spline.reduce_from_end(6.5).expect("Kürzung erwartet");
        assert_relative_eq!(reduced.length(), 13.5, epsilon = 1e-3);
        assert_relative_eq!(reduced.last_position().x, 13.5, epsilon = 1e-3);

        let reduced = spline.reduce_from_start(5.0).expect("Kürzung erwartet");
        assert_relative_eq!(reduced.first_position().x, 5.0, epsilon = 1e-3);
    }

    #[test]
    fn reduce_beyond_limit_fails() {
        let spline = Spline::straight(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        assert!(spline.reduce_from_start(9.95).is_none());
        assert!(spline.reduce_from_end(12.0).is_none());
    }

    #[test]
    fn nearest_point_finds_projection() {
        let spline = Spline::straight(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0));
        let hit = spline
            .nearest_point(Vec3::new(5.0, 0.0, 2.0))
            .expect("Treffer erwartet");
        assert_relative_eq!(hit.t, 0.25, epsilon = 1e-3);
        assert_relative_eq!(hit.distance, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn circle_stays_on_radius() {
        let circle = Spline::circle(Vec3::new(5.0, 1.0, 5.0), 10.0, 8);
        assert!(circle.is_closed());
        assert_eq!(circle.segment_count(), 8);
        for p in circle.sample_points(64) {
            assert_relative_eq!(p.distance(Vec3::new(5.0, 1.0, 5.0)), 10.0, epsilon = 0.01);
        }
        assert_relative_eq!(circle.length(), std::f32::consts::TAU * 10.0, epsilon = 0.05);
    }

    #[test]
    fn reversed_swaps_direction() {
        let spline = bent();
        let reversed = spline.reversed();
        assert_eq!(reversed.first_position(), spline.last_position());
        assert!(reversed.start_direction().dot(spline.end_direction()) < -0.99);
    }

    #[test]
    fn offset_moves_straight_line_sideways() {
        let spline = Spline::straight(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0));
        let shifted = spline.offset(2.0);
        assert_relative_eq!(shifted.first_position().x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(shifted.length(), 10.0, epsilon = 1e-3);
    }

    #[test]
    fn connector_runs_from_center_outward() {
        let connector = Spline::connector(Vec3::ZERO, Vec3::new(6.0, 0.0, 0.0), Vec3::X);
        assert_relative_eq!(connector.length(), 6.0, epsilon = 1e-3);
        assert!(connector.end_direction().dot(Vec3::X) > 0.99);
    }

    #[test]
    fn moved_end_follows_new_chord() {
        let spline = Spline::straight(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        let moved = spline.with_moved_end(1, Vec3::new(10.0, 0.0, 10.0));
        assert_eq!(moved.last_position(), Vec3::new(10.0, 0.0, 10.0));
        assert_eq!(moved.first_position(), Vec3::ZERO);
    }
}
