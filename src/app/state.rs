//! Zustand des Builders zwischen zwei Anfragen.

use super::construction::ConstructionObjectsSummary;
use super::CommandLog;

/// Phase der aktuellen Konstruktion.
///
/// `Idle → Previewing → Committed | Cancelled`; jede neue Anfrage beginnt
/// wieder bei `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstructionPhase {
    #[default]
    Idle,
    /// Ergebnis wird nur angezeigt
    Previewing,
    /// Batch wurde übernommen
    Committed,
    /// Vorschau verworfen oder Konstruktion abgelehnt
    Cancelled,
}

/// Laufzeit-Zustand des [`RoadBuilder`](super::RoadBuilder).
#[derive(Debug, Default)]
pub struct BuilderState {
    pub phase: ConstructionPhase,
    /// Kurzfassung der zuletzt angezeigten Vorschau
    pub preview: Option<ConstructionObjectsSummary>,
    /// Ausgeführte Commands
    pub command_log: CommandLog,
}

impl BuilderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Übergang in eine neue Phase (mit Debug-Log bei Wechsel).
    pub fn enter(&mut self, phase: ConstructionPhase) {
        if self.phase != phase {
            log::debug!("Phase {:?} → {:?}", self.phase, phase);
        }
        if phase != ConstructionPhase::Previewing {
            self.preview = None;
        }
        self.phase = phase;
    }

    pub fn is_previewing(&self) -> bool {
        self.phase == ConstructionPhase::Previewing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaving_preview_drops_summary() {
        let mut state = BuilderState::new();
        state.enter(ConstructionPhase::Previewing);
        state.preview = Some(ConstructionObjectsSummary::default());
        assert!(state.is_previewing());

        state.enter(ConstructionPhase::Cancelled);
        assert!(state.preview.is_none());
        assert!(!state.is_previewing());
    }
}
