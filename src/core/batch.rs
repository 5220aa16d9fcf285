//! Ausstehende Änderungen einer Konstruktion und ihr Undo-Gegenstück.

use indexmap::{IndexMap, IndexSet};

use super::{ObjectId, SceneObject};

/// Transaktions-Container einer einzelnen Operation.
///
/// - `new`: Objekte mit frisch vergebener Id
/// - `replaced`: neue Fassung eines bestehenden Objekts (gleiche Id)
/// - `removable`: Ids bestehender Objekte, die beim Commit entfernt werden
///
/// Eine Id ist nie gleichzeitig neu und entfernbar: Das Entfernen eines
/// ausstehenden neuen Objekts verwirft es einfach.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstructionObjects {
    new: IndexMap<ObjectId, SceneObject>,
    replaced: IndexMap<ObjectId, SceneObject>,
    removable: IndexSet<ObjectId>,
}

impl ConstructionObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.replaced.is_empty() && self.removable.is_empty()
    }

    /// Ausstehende Fassung eines Objekts (neu oder ersetzt).
    pub fn pending(&self, id: ObjectId) -> Option<&SceneObject> {
        self.new.get(&id).or_else(|| self.replaced.get(&id))
    }

    pub fn is_new(&self, id: ObjectId) -> bool {
        self.new.contains_key(&id)
    }

    pub fn is_replaced(&self, id: ObjectId) -> bool {
        self.replaced.contains_key(&id)
    }

    pub fn is_removed(&self, id: ObjectId) -> bool {
        self.removable.contains(&id)
    }

    /// Nimmt ein Objekt mit frischer Id auf.
    pub fn insert_new(&mut self, object: SceneObject) {
        self.new.insert(object.id, object);
    }

    /// Legt die neue Fassung eines Objekts ab.
    ///
    /// Ausstehende neue Objekte bleiben neu; bestehende werden als ersetzt
    /// markiert. Ein bereits entfernbares Objekt lebt damit wieder auf.
    pub fn replace(&mut self, object: SceneObject) {
        if let Some(slot) = self.new.get_mut(&object.id) {
            *slot = object;
            return;
        }
        self.removable.shift_remove(&object.id);
        self.replaced.insert(object.id, object);
    }

    /// Markiert ein Objekt zur Entfernung.
    pub fn remove(&mut self, id: ObjectId) {
        if self.new.shift_remove(&id).is_some() {
            return;
        }
        self.replaced.shift_remove(&id);
        self.removable.insert(id);
    }

    pub fn new_objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.new.values()
    }

    pub fn replaced_objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.replaced.values()
    }

    pub fn removable(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.removable.iter().copied()
    }

    /// Ids aller neuen und ersetzten Objekte in Einfüge-Reihenfolge.
    pub fn pending_ids(&self) -> Vec<ObjectId> {
        self.new.keys().chain(self.replaced.keys()).copied().collect()
    }

    /// Alle Ids, die der Commit berührt.
    pub fn touched_ids(&self) -> Vec<ObjectId> {
        self.new
            .keys()
            .chain(self.replaced.keys())
            .chain(self.removable.iter())
            .copied()
            .collect()
    }
}

/// Umkehrung eines angewendeten Batches.
#[derive(Debug, Clone, Default)]
pub struct UndoRecord {
    /// Beim Commit erzeugte Ids (werden beim Undo zerstört)
    pub created: Vec<ObjectId>,
    /// Vorherige Fassung aller ersetzten und entfernten Objekte
    pub previous: Vec<SceneObject>,
}

impl UndoRecord {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.previous.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CustomData, ObjectKind, RoadCatalog};

    fn object(id: u64) -> SceneObject {
        let descriptor = RoadCatalog::default().get("dirt").expect("Typ erwartet");
        SceneObject::new(
            ObjectId(id),
            descriptor,
            false,
            ObjectKind::Custom(CustomData { slots: Vec::new() }),
        )
    }

    #[test]
    fn removing_pending_new_object_drops_it() {
        let mut batch = ConstructionObjects::new();
        batch.insert_new(object(5));
        batch.remove(ObjectId(5));

        assert!(batch.is_empty());
        assert!(!batch.is_removed(ObjectId(5)));
    }

    #[test]
    fn replacing_new_object_keeps_it_new() {
        let mut batch = ConstructionObjects::new();
        batch.insert_new(object(5));
        let mut changed = object(5);
        changed.elevated = true;
        batch.replace(changed);

        assert!(batch.is_new(ObjectId(5)));
        assert!(!batch.is_replaced(ObjectId(5)));
        assert!(batch.pending(ObjectId(5)).is_some_and(|o| o.elevated));
    }

    #[test]
    fn removing_replaced_object_marks_it_removable() {
        let mut batch = ConstructionObjects::new();
        batch.replace(object(2));
        batch.remove(ObjectId(2));

        assert!(!batch.is_replaced(ObjectId(2)));
        assert!(batch.is_removed(ObjectId(2)));
        assert_eq!(batch.touched_ids(), vec![ObjectId(2)]);
    }
}
