//! Command-Log der ausgeführten Konstruktions-Commands.

use super::ConstructionCommand;

/// Speichert ausgeführte Commands in Reihenfolge.
#[derive(Debug, Default)]
pub struct CommandLog {
    entries: Vec<ConstructionCommand>,
}

impl CommandLog {
    const MAX_ENTRIES: usize = 1000;
}

impl CommandLog {
    /// Erstellt ein leeres Command-Log.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Fügt einen ausgeführten Command hinzu.
    /// Begrenzt auf MAX_ENTRIES, die ältere Hälfte wird dann verworfen.
    pub fn record(&mut self, command: &ConstructionCommand) {
        if self.entries.len() >= Self::MAX_ENTRIES {
            self.entries.drain(..Self::MAX_ENTRIES / 2);
        }
        self.entries.push(command.clone());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Liefert eine read-only Sicht auf alle Einträge.
    pub fn entries(&self) -> &[ConstructionCommand] {
        &self.entries
    }

    /// Alle Einträge als JSON-Array (zum erneuten Abspielen).
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}
