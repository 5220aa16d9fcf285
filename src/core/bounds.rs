//! Achsenparallele Bounding-Box für Szene-Objekte.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Achsenparallele Box im Weltraum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Leere Box (min > max); wächst mit jedem eingeschlossenen Punkt.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Würfel um einen Punkt.
    pub fn around(center: Vec3, half_extent: Vec3) -> Self {
        Self::new(center - half_extent, center + half_extent)
    }

    /// Kleinste Box um alle Punkte.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut bounds = Self::empty();
        for p in points {
            bounds.include(*p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Vereinigung zweier Boxen.
    pub fn union(&self, other: &Aabb) -> Aabb {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Box mit allseitig vergrößertem Rand.
    pub fn expanded(&self, margin: f32) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Halbe Diagonale der Grundfläche (XZ).
    pub fn horizontal_radius(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let half = (self.max - self.min) * 0.5;
        (half.x * half.x + half.z * half.z).sqrt()
    }

    /// Überschneidung der Grundflächen (XZ).
    pub fn intersects_xz(&self, other: &Aabb) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Überschneidung der Höhen-Intervalle.
    pub fn overlaps_y(&self, other: &Aabb) -> bool {
        self.min.y <= other.max.y && self.max.y >= other.min.y
    }

    /// Vollständige Überschneidung (Grundfläche und Höhe).
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.intersects_xz(other) && self.overlaps_y(other)
    }

    /// Liegt der Punkt innerhalb der Grundfläche?
    pub fn contains_xz(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.z >= self.min.z && point.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_ignores_empty_boxes() {
        let a = Aabb::around(Vec3::ZERO, Vec3::ONE);
        assert_eq!(a.union(&Aabb::empty()), a);
        assert_eq!(Aabb::empty().union(&a), a);
    }

    #[test]
    fn height_separated_boxes_do_not_intersect() {
        let ground = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 1.0, 10.0));
        let bridge = Aabb::new(Vec3::new(0.0, 6.0, 0.0), Vec3::new(10.0, 7.0, 10.0));
        assert!(ground.intersects_xz(&bridge));
        assert!(!ground.intersects(&bridge));
    }
}
