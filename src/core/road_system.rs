//! Das Live-Strassennetz: alle Szene-Objekte plus persistenter Spatial-Index.

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use super::{Aabb, ConstructionObjects, ObjectId, ObjectLookup, SceneObject, SpatialIndex, UndoRecord};

/// Konsistenz-Verletzung beim Anwenden eines Batches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("Objekt {0} existiert nicht")]
    MissingObject(ObjectId),
    #[error("Objekt {0} existiert bereits")]
    DuplicateObject(ObjectId),
    #[error("Verbindung {from} → {to} ist nicht symmetrisch")]
    Asymmetric { from: ObjectId, to: ObjectId },
    #[error("Objekt {from} verweist auf fehlendes Objekt {to}")]
    DanglingConnection { from: ObjectId, to: ObjectId },
}

/// Vollständiges Strassennetz.
///
/// Änderungen laufen ausschließlich über [`RoadSystem::applied`] und
/// [`RoadSystem::reverted`], die einen neuen Zustand liefern; der bisherige
/// bleibt unverändert, bis der Aufrufer ihn austauscht.
#[derive(Debug, Clone)]
pub struct RoadSystem {
    objects: IndexMap<ObjectId, SceneObject>,
    /// Persistenter Spatial-Index über allen Bounding-Boxes
    spatial_index: SpatialIndex,
    next_id: u64,
}

impl Default for RoadSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl RoadSystem {
    /// Erstellt ein leeres Netz; die erste vergebene Id ist 1.
    pub fn new() -> Self {
        Self {
            objects: IndexMap::new(),
            spatial_index: SpatialIndex::empty(),
            next_id: 1,
        }
    }

    /// Baut ein Netz aus fertigen Objekten (z.B. nach dem Laden).
    pub fn from_objects(objects: impl IntoIterator<Item = SceneObject>, next_id: u64) -> Self {
        let objects: IndexMap<ObjectId, SceneObject> =
            objects.into_iter().map(|o| (o.id, o)).collect();
        let max_id = objects.keys().map(|id| id.0).max().unwrap_or(0);
        let mut system = Self {
            objects,
            spatial_index: SpatialIndex::empty(),
            next_id: next_id.max(max_id + 1),
        };
        system.rebuild_spatial_index();
        system
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Nächste freie Id (für die Vergabe in einer Konstruktion).
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    pub fn roads(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values().filter(|o| o.is_road())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values().filter(|o| o.is_node())
    }

    pub fn road_count(&self) -> usize {
        self.roads().count()
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    /// Alle Objekte, deren Bounding-Box die Abfrage schneidet.
    pub fn find_overlapping(&self, query: &Aabb) -> Vec<ObjectId> {
        self.spatial_index.find_overlapping(query)
    }

    pub fn connections_of(&self, id: ObjectId) -> Vec<ObjectId> {
        self.get(id).map(SceneObject::connections).unwrap_or_default()
    }

    pub fn are_connected(&self, a: ObjectId, b: ObjectId) -> bool {
        self.connections_of(a).contains(&b)
    }

    /// Baut den Spatial-Index aus den aktuellen Bounding-Boxes neu auf.
    pub fn rebuild_spatial_index(&mut self) {
        self.spatial_index =
            SpatialIndex::from_bounds(self.objects.values().map(|o| (o.id, o.bounds)));
    }

    /// Alle Verbindungen, die nicht erwidert werden oder ins Leere zeigen.
    ///
    /// Leer bei einem konsistenten Netz.
    pub fn check_symmetry(&self) -> Vec<(ObjectId, ObjectId)> {
        let mut broken = Vec::new();
        for object in self.objects.values() {
            for other in object.connections() {
                let reciprocated = self
                    .get(other)
                    .is_some_and(|o| o.connections().contains(&object.id));
                if !reciprocated {
                    broken.push((object.id, other));
                }
            }
        }
        broken
    }

    fn check_local_symmetry(
        &self,
        ids: impl IntoIterator<Item = ObjectId>,
    ) -> Result<(), CommitError> {
        for id in ids {
            let Some(object) = self.get(id) else {
                continue;
            };
            for other in object.connections() {
                match self.get(other) {
                    None => return Err(CommitError::DanglingConnection { from: id, to: other }),
                    Some(o) if !o.connections().contains(&id) => {
                        return Err(CommitError::Asymmetric { from: id, to: other })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Wendet einen Batch an und liefert den neuen Zustand samt Undo-Record.
    ///
    /// Der Batch wird vollständig oder gar nicht übernommen: Fehlende Objekte,
    /// doppelte Ids und asymmetrische Verbindungen verwerfen den Commit.
    pub fn applied(
        &self,
        batch: &ConstructionObjects,
    ) -> Result<(RoadSystem, UndoRecord), CommitError> {
        let mut next = self.clone();
        let mut record = UndoRecord::default();
        let mut affected: IndexSet<ObjectId> = IndexSet::new();

        for id in batch.removable() {
            let previous = next
                .objects
                .shift_remove(&id)
                .ok_or(CommitError::MissingObject(id))?;
            affected.extend(previous.connections());
            record.previous.push(previous);
        }
        for object in batch.replaced_objects() {
            let previous = next
                .objects
                .insert(object.id, object.clone())
                .ok_or(CommitError::MissingObject(object.id))?;
            affected.insert(object.id);
            affected.extend(previous.connections());
            record.previous.push(previous);
        }
        for object in batch.new_objects() {
            if next.objects.contains_key(&object.id) {
                return Err(CommitError::DuplicateObject(object.id));
            }
            next.objects.insert(object.id, object.clone());
            next.next_id = next.next_id.max(object.id.0 + 1);
            affected.insert(object.id);
            record.created.push(object.id);
        }

        next.check_local_symmetry(affected)?;
        next.rebuild_spatial_index();
        Ok((next, record))
    }

    /// Macht einen angewendeten Batch rückgängig.
    pub fn reverted(&self, record: &UndoRecord) -> Result<RoadSystem, CommitError> {
        let mut next = self.clone();
        let mut affected: IndexSet<ObjectId> = IndexSet::new();

        for id in &record.created {
            let removed = next
                .objects
                .shift_remove(id)
                .ok_or(CommitError::MissingObject(*id))?;
            affected.extend(removed.connections());
        }
        for object in &record.previous {
            if let Some(current) = next.objects.insert(object.id, object.clone()) {
                affected.extend(current.connections());
            }
            affected.insert(object.id);
        }

        next.check_local_symmetry(affected)?;
        next.rebuild_spatial_index();
        Ok(next)
    }
}

impl ObjectLookup for RoadSystem {
    fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.get(id)
    }
}
