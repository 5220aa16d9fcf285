//! Spatial-Index (KD-Tree) für Bounding-Box-Abfragen über alle Szene-Objekte.

use kiddo::{KdTree, SquaredEuclidean};

use crate::core::{Aabb, ObjectId};

/// Read-only Spatial-Index über den Bounding-Boxes eines `RoadSystem`.
///
/// Der KD-Tree indiziert die Box-Mittelpunkte auf der XZ-Ebene. Eine Abfrage
/// sucht mit einem konservativen Radius (Halbdiagonale der Abfrage plus größte
/// Halbdiagonale aller Einträge) und filtert danach exakt.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: KdTree<f64, 2>,
    entries: Vec<(ObjectId, Aabb)>,
    max_radius: f32,
}

impl SpatialIndex {
    /// Erstellt einen leeren Spatial-Index.
    pub fn empty() -> Self {
        Self {
            tree: (&Vec::<[f64; 2]>::new()).into(),
            entries: Vec::new(),
            max_radius: 0.0,
        }
    }

    /// Baut einen neuen Index aus den übergebenen Boxen.
    ///
    /// Leere Boxen werden nicht indiziert.
    pub fn from_bounds(bounds: impl IntoIterator<Item = (ObjectId, Aabb)>) -> Self {
        let mut entries: Vec<(ObjectId, Aabb)> =
            bounds.into_iter().filter(|(_, b)| !b.is_empty()).collect();
        entries.sort_unstable_by_key(|(id, _)| *id);

        let points: Vec<[f64; 2]> = entries
            .iter()
            .map(|(_, b)| {
                let c = b.center();
                [c.x as f64, c.z as f64]
            })
            .collect();
        let tree: KdTree<f64, 2> = (&points).into();

        let max_radius = entries
            .iter()
            .map(|(_, b)| b.horizontal_radius())
            .fold(0.0, f32::max);

        Self {
            tree,
            entries,
            max_radius,
        }
    }

    /// Gibt die Anzahl indexierter Objekte zurück.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Gibt `true` zurück, wenn keine Objekte im Index liegen.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Alle Objekte, deren Box die Abfrage auf XZ schneidet und deren
    /// Höhen-Intervall das der Abfrage überlappt. Sortiert nach Id.
    pub fn find_overlapping(&self, query: &Aabb) -> Vec<ObjectId> {
        if self.is_empty() || query.is_empty() {
            return Vec::new();
        }

        let center = query.center();
        let radius = (query.horizontal_radius() + self.max_radius) as f64;

        let mut ids: Vec<ObjectId> = self
            .tree
            .within::<SquaredEuclidean>(&[center.x as f64, center.z as f64], radius * radius)
            .into_iter()
            .filter_map(|entry| {
                let (id, bounds) = self.entries.get(entry.item as usize)?;
                // Exakte Box-Prüfung nach dem KD-Tree-Vorfilter
                bounds.intersects(query).then_some(*id)
            })
            .collect();

        ids.sort_unstable();
        ids
    }

    /// Referenz-Abfrage durch lineare Suche über alle Einträge.
    pub fn find_overlapping_linear(&self, query: &Aabb) -> Vec<ObjectId> {
        self.entries
            .iter()
            .filter(|(_, bounds)| bounds.intersects(query))
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn sample_bounds() -> Vec<(ObjectId, Aabb)> {
        vec![
            (
                ObjectId(1),
                Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(20.0, 1.0, 4.0)),
            ),
            (
                ObjectId(2),
                Aabb::new(Vec3::new(30.0, 0.0, 0.0), Vec3::new(34.0, 1.0, 4.0)),
            ),
            (
                ObjectId(3),
                Aabb::new(Vec3::new(5.0, 8.0, -10.0), Vec3::new(9.0, 9.0, 10.0)),
            ),
        ]
    }

    #[test]
    fn query_finds_long_boxes_by_extent_not_center() {
        let index = SpatialIndex::from_bounds(sample_bounds());
        let query = Aabb::around(Vec3::new(19.0, 0.5, 2.0), Vec3::splat(0.5));

        assert_eq!(index.find_overlapping(&query), vec![ObjectId(1)]);
    }

    #[test]
    fn query_respects_height_extent() {
        let index = SpatialIndex::from_bounds(sample_bounds());
        let low = Aabb::new(Vec3::new(6.0, 0.0, 1.0), Vec3::new(7.0, 1.0, 2.0));
        let high = Aabb::new(Vec3::new(6.0, 8.5, 1.0), Vec3::new(7.0, 9.5, 2.0));

        assert_eq!(index.find_overlapping(&low), vec![ObjectId(1)]);
        assert_eq!(index.find_overlapping(&high), vec![ObjectId(3)]);
    }

    #[test]
    fn kd_tree_query_equals_linear_scan() {
        let mut bounds = Vec::new();
        for i in 0..200u64 {
            let x = (i * 37 % 101) as f32;
            let z = (i * 53 % 97) as f32;
            let size = 1.0 + (i % 7) as f32 * 3.0;
            bounds.push((
                ObjectId(i),
                Aabb::new(Vec3::new(x, 0.0, z), Vec3::new(x + size, 2.0, z + size * 0.5)),
            ));
        }
        let index = SpatialIndex::from_bounds(bounds);

        for q in 0..50u64 {
            let x = (q * 13 % 90) as f32;
            let z = (q * 29 % 90) as f32;
            let query = Aabb::new(Vec3::new(x, 0.5, z), Vec3::new(x + 6.0, 1.0, z + 4.0));
            assert_eq!(
                index.find_overlapping(&query),
                index.find_overlapping_linear(&query)
            );
        }
    }

    #[test]
    fn empty_index_has_no_entries() {
        let index = SpatialIndex::empty();

        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert!(index
            .find_overlapping(&Aabb::around(Vec3::ZERO, Vec3::ONE))
            .is_empty());
    }
}
