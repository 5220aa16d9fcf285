use super::terrain::TerrainUndoCache;
use crate::core::UndoRecord;

/// Ein übernommener Batch, reduziert auf das, was Undo braucht.
///
/// Enthält keine Kopie des ganzen Netzes: nur die erzeugten Ids und die
/// vorherigen Fassungen der ersetzten bzw. entfernten Objekte.
#[derive(Debug, Clone)]
pub struct ConstructionUndo {
    /// Operation, die den Batch erzeugt hat (für Logs)
    pub label: &'static str,
    pub record: UndoRecord,
    /// Terrain-Pixel vor dem Commit, falls das Terrain angepasst wurde
    pub terrain: Option<TerrainUndoCache>,
}

/// Begrenzter Undo-Stapel übernommener Konstruktionen.
///
/// Ist der Stapel voll, fällt der älteste Eintrag heraus.
#[derive(Debug, Default)]
pub struct ConstructionHistory {
    undo_stack: Vec<ConstructionUndo>,
    max_depth: usize,
}

impl ConstructionHistory {
    /// Erstellt einen neuen History-Manager mit maximaler Tiefe.
    pub fn new_with_capacity(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth),
            max_depth,
        }
    }

    /// Merkt sich einen übernommenen Batch. Leere Batches werden ignoriert.
    pub fn record(&mut self, entry: ConstructionUndo) {
        if self.max_depth == 0 || (entry.record.is_empty() && entry.terrain.is_none()) {
            return;
        }
        if self.undo_stack.len() >= self.max_depth {
            let dropped = self.undo_stack.remove(0);
            log::debug!("Undo-Speicher voll, '{}' verworfen", dropped.label);
        }
        self.undo_stack.push(entry);
    }

    /// Prüft ob Undo möglich ist.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Jüngster Eintrag, ohne ihn zu entnehmen.
    pub fn peek(&self) -> Option<&ConstructionUndo> {
        self.undo_stack.last()
    }

    pub fn pop_undo(&mut self) -> Option<ConstructionUndo> {
        self.undo_stack.pop()
    }

    /// Legt einen entnommenen Eintrag zurück (fehlgeschlagenes Undo).
    pub fn restore_top(&mut self, entry: ConstructionUndo) {
        self.undo_stack.push(entry);
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ObjectId;

    fn entry(id: u64) -> ConstructionUndo {
        ConstructionUndo {
            label: "test",
            record: UndoRecord {
                created: vec![ObjectId(id)],
                previous: Vec::new(),
            },
            terrain: None,
        }
    }

    #[test]
    fn empty_history_cannot_undo() {
        let history = ConstructionHistory::new_with_capacity(10);
        assert!(!history.can_undo());
        assert!(history.peek().is_none());
    }

    #[test]
    fn undo_returns_entries_newest_first() {
        let mut history = ConstructionHistory::new_with_capacity(10);
        history.record(entry(1));
        history.record(entry(2));

        let newest = history.pop_undo().expect("Eintrag erwartet");
        assert_eq!(newest.record.created, vec![ObjectId(2)]);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn respects_max_depth() {
        let mut history = ConstructionHistory::new_with_capacity(3);
        for i in 1..=5 {
            history.record(entry(i));
        }

        assert_eq!(history.len(), 3);
        let mut oldest = None;
        while let Some(e) = history.pop_undo() {
            oldest = Some(e);
        }
        assert_eq!(oldest.map(|e| e.record.created), Some(vec![ObjectId(3)]));
    }

    #[test]
    fn empty_batches_are_not_recorded() {
        let mut history = ConstructionHistory::new_with_capacity(3);
        history.record(ConstructionUndo {
            label: "leer",
            record: UndoRecord::default(),
            terrain: None,
        });
        assert!(history.is_empty());
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = ConstructionHistory::new_with_capacity(0);
        history.record(entry(1));
        assert!(!history.can_undo());
    }
}
