use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn transposed(self) -> Self {
        Self {
            x: self.y,
            y: self.x,
        }
    }

    #[must_use]
    pub fn coincides(self, other: Self) -> bool {
        (self.x - other.x).abs() < 0.5 && (self.y - other.y).abs() < 0.5
    }
}

/// Durable node positions keyed by node id. Entries for nodes that no longer
/// exist are kept and ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GraphLayout {
    #[serde(default)]
    pub positions: BTreeMap<String, Position>,
}

impl GraphLayout {
    #[must_use]
    pub fn position(&self, node_id: &str) -> Option<Position> {
        self.positions.get(node_id).copied()
    }

    /// Overlay `positions` onto the stored map; nothing is removed.
    pub fn merge<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = (String, Position)>,
    {
        self.positions.extend(positions);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_stale_entries() {
        let mut layout = GraphLayout::default();
        layout.merge([("gone".to_string(), Position::new(1.0, 2.0))]);
        layout.merge([("v1".to_string(), Position::new(100.0, 200.0))]);
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.position("v1"), Some(Position::new(100.0, 200.0)));
    }
}
