//! Pflege des Verbindungs-Graphen während einer Konstruktion.
//!
//! Alle Änderungen landen im [`BatchContext`], einer Arbeitsansicht aus
//! Live-Zustand plus ausstehendem Batch. Das Live-Netz wird nie verändert;
//! erst der Commit im Controller übernimmt den Batch atomar.

mod attach;
mod remove;

pub(crate) use attach::{
    apply_clearance, attach_end, attach_to_node, collapse_if_straight, roundabout_clearance,
    set_road_spline, shorten_branch, split_road, Attachment,
};
pub(crate) use remove::{demolish_node, detach_branch, relink_end, remove_custom, remove_road};

use indexmap::IndexSet;

use crate::app::construction::ConstructionFail;
use crate::app::creators;
use crate::core::{
    ConstructionObjects, EndpointLink, ObjectId, ObjectKind, ObjectLookup, RoadSystem, SceneObject,
};
use crate::shared::ConstructionSettings;

/// Arbeitsansicht einer laufenden Konstruktion.
pub struct BatchContext<'a> {
    pub system: &'a RoadSystem,
    pub settings: &'a ConstructionSettings,
    objects: ConstructionObjects,
    fails: Vec<ConstructionFail>,
    next_id: u64,
}

impl<'a> BatchContext<'a> {
    pub fn new(system: &'a RoadSystem, settings: &'a ConstructionSettings) -> Self {
        Self {
            system,
            settings,
            objects: ConstructionObjects::new(),
            fails: Vec::new(),
            next_id: system.next_id(),
        }
    }

    /// Vergibt eine frische Id (fortlaufend ab der nächsten freien Id des Netzes).
    pub fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Aktuelle Fassung eines Objekts: ausstehend vor live, entfernte sind weg.
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        if self.objects.is_removed(id) {
            return None;
        }
        self.objects.pending(id).or_else(|| self.system.get(id))
    }

    /// Kopie eines Objekts zur Bearbeitung.
    pub fn cloned(&self, id: ObjectId) -> Option<SceneObject> {
        self.get(id).cloned()
    }

    /// Legt ein Objekt ab: bestehende Ids werden ersetzt, unbekannte sind neu.
    pub fn put(&mut self, object: SceneObject) {
        if self.system.contains(object.id) {
            self.objects.replace(object);
        } else {
            self.objects.insert_new(object);
        }
    }

    pub fn remove(&mut self, id: ObjectId) {
        self.objects.remove(id);
    }

    pub fn is_removed(&self, id: ObjectId) -> bool {
        self.objects.is_removed(id) || (!self.system.contains(id) && self.objects.pending(id).is_none())
    }

    pub fn is_new(&self, id: ObjectId) -> bool {
        self.objects.is_new(id)
    }

    /// Bearbeitet die Strassen-Daten eines Objekts und legt es ab.
    pub fn update_road(&mut self, id: ObjectId, edit: impl FnOnce(&mut crate::core::RoadData)) -> bool {
        let Some(mut object) = self.cloned(id) else {
            return false;
        };
        let Some(road) = object.as_road_mut() else {
            return false;
        };
        edit(road);
        self.put(object);
        true
    }

    /// Vermerkt einen Fehlschlag (jede Art nur einmal).
    pub fn fail(&mut self, fail: ConstructionFail) {
        log::debug!("Konstruktion: {}", fail);
        creators::push_fail(&mut self.fails, fail);
    }

    pub fn fails(&self) -> &[ConstructionFail] {
        &self.fails
    }

    pub fn has_fails(&self) -> bool {
        !self.fails.is_empty()
    }

    pub fn has_fail(&self, fail: ConstructionFail) -> bool {
        self.fails.contains(&fail)
    }

    pub fn objects(&self) -> &ConstructionObjects {
        &self.objects
    }

    /// Alle Ids, die der Batch berührt, plus ihre direkten Nachbarn.
    pub fn touched_with_neighbours(&self) -> IndexSet<ObjectId> {
        let mut ids: IndexSet<ObjectId> = self.objects.touched_ids().into_iter().collect();
        let direct: Vec<ObjectId> = ids.iter().copied().collect();
        for id in direct {
            if let Some(object) = self.get(id).or_else(|| self.system.get(id)) {
                ids.extend(object.connections());
            }
        }
        ids
    }

    /// Erzeugt Meshes, abgeleitete Kurven und Bounding-Boxes aller
    /// ausstehenden Objekte neu.
    ///
    /// Knoten an geänderten Strassen werden mit aufgenommen, auch wenn sie
    /// selbst nicht bearbeitet wurden.
    pub fn finalize_geometry(&mut self) {
        let pending = self.objects.pending_ids();
        let mut nodes: IndexSet<ObjectId> = IndexSet::new();
        for id in &pending {
            let Some(object) = self.get(*id) else {
                continue;
            };
            match &object.kind {
                ObjectKind::Road(road) => {
                    nodes.extend([road.start, road.end].iter().filter_map(EndpointLink::node));
                }
                ObjectKind::Custom(_) => {}
                _ => {
                    nodes.insert(*id);
                }
            }
        }

        let roads: Vec<ObjectId> = pending
            .iter()
            .copied()
            .filter(|id| self.get(*id).is_some_and(SceneObject::is_road))
            .collect();
        for id in roads.into_iter().chain(nodes) {
            let Some(mut object) = self.cloned(id) else {
                continue;
            };
            let mut fails = Vec::new();
            creators::refresh(&mut object, &*self, self.settings, &mut fails);
            for fail in fails {
                self.fail(fail);
            }
            self.put(object);
        }
    }

    /// Beendet die Konstruktion und liefert Batch und Fehlschläge.
    pub fn finish(self) -> (ConstructionObjects, Vec<ConstructionFail>) {
        (self.objects, self.fails)
    }
}

impl ObjectLookup for BatchContext<'_> {
    fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.get(id)
    }
}

#[cfg(test)]
mod tests;
