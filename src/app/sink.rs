//! Ausgabe der Szene an den Host (Renderer, Engine-Szene).
//!
//! Der Kern kennt nur Mesh-Puffer; wie der Host Objekte anlegt oder zerstört,
//! bleibt hinter [`SceneSink`] verborgen.

use crate::core::{ConstructionObjects, ObjectId, SceneObject};

/// Empfänger für Objekte, die sichtbar werden oder verschwinden.
pub trait SceneSink: Send {
    /// Objekt ist neu oder wurde ersetzt (gleiche Id).
    fn create(&mut self, object: &SceneObject);

    fn destroy(&mut self, id: ObjectId);

    /// Vorschau einer noch nicht übernommenen Konstruktion.
    fn show_preview(&mut self, _objects: &ConstructionObjects) {}

    fn clear_preview(&mut self) {}
}

/// Sink, der nur mitzählt (Tests und der Kommandozeilen-Bericht).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CountingSink {
    pub created: usize,
    pub destroyed: usize,
    pub previews: usize,
}

impl SceneSink for CountingSink {
    fn create(&mut self, object: &SceneObject) {
        log::trace!("Szene: {} {} angelegt", object.kind_name(), object.id);
        self.created += 1;
    }

    fn destroy(&mut self, id: ObjectId) {
        log::trace!("Szene: {} entfernt", id);
        self.destroyed += 1;
    }

    fn show_preview(&mut self, _objects: &ConstructionObjects) {
        self.previews += 1;
    }
}
