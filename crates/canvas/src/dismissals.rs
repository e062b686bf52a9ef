use compass_protocol::Conflict;
use std::collections::HashSet;

/// Conflicts the user chose to hide for the rest of the session. Never
/// persisted; ids of conflicts that stop being detected simply linger.
#[derive(Debug, Default, Clone)]
pub struct ConflictDismissals {
    dismissed: HashSet<String>,
}

impl ConflictDismissals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the id was already dismissed.
    pub fn dismiss(&mut self, conflict_id: impl Into<String>) -> bool {
        self.dismissed.insert(conflict_id.into())
    }

    pub fn restore(&mut self, conflict_id: &str) -> bool {
        self.dismissed.remove(conflict_id)
    }

    #[must_use]
    pub fn is_dismissed(&self, conflict_id: &str) -> bool {
        self.dismissed.contains(conflict_id)
    }

    #[must_use]
    pub fn visible<'c>(&self, conflicts: &'c [Conflict]) -> Vec<&'c Conflict> {
        conflicts
            .iter()
            .filter(|c| !self.is_dismissed(&c.id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.dismissed.clear();
    }
}
