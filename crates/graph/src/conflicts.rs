use crate::lexicon::{Lexicon, Opposition};
use crate::tagger::SemanticTagger;
use compass_protocol::{Concept, Conflict, ConflictItem, Node, Severity};

/// Pairwise scan for known tension patterns between nodes.
///
/// Only node types listed in the lexicon take part (values by default).
/// Detection is symmetric: items are ordered by node id, so scanning
/// `(a, b)` and `(b, a)` yields identical conflicts.
pub struct ConflictDetector<'a> {
    lexicon: &'a Lexicon,
    tagger: SemanticTagger<'a>,
}

struct Candidate<'n> {
    node: &'n Node,
    text: &'n str,
}

impl<'a> ConflictDetector<'a> {
    #[must_use]
    pub const fn new(lexicon: &'a Lexicon) -> Self {
        Self {
            lexicon,
            tagger: SemanticTagger::new(lexicon),
        }
    }

    /// O(n²) over the eligible nodes; n is typically below ten.
    #[must_use]
    pub fn detect(&self, nodes: &[Node]) -> Vec<Conflict> {
        let eligible: Vec<&Node> = nodes
            .iter()
            .filter(|n| self.lexicon.conflict_node_types().contains(&n.node_type))
            .collect();

        let mut conflicts = Vec::new();
        for (i, a) in eligible.iter().enumerate() {
            for b in &eligible[i + 1..] {
                conflicts.extend(self.detect_pair(a, b));
            }
        }

        if !conflicts.is_empty() {
            log::debug!(
                "Detected {} conflict(s) across {} eligible node(s)",
                conflicts.len(),
                eligible.len()
            );
        }
        conflicts
    }

    /// Conflicts between two specific nodes, one per matching opposition.
    #[must_use]
    pub fn detect_pair(&self, a: &Node, b: &Node) -> Vec<Conflict> {
        if a.id == b.id {
            return Vec::new();
        }
        let (first, second) = if a.id <= b.id {
            (Candidate::of(a), Candidate::of(b))
        } else {
            (Candidate::of(b), Candidate::of(a))
        };

        self.lexicon
            .oppositions()
            .iter()
            .filter_map(|opposition| self.check(opposition, &first, &second))
            .collect()
    }

    fn check(
        &self,
        opposition: &Opposition,
        first: &Candidate<'_>,
        second: &Candidate<'_>,
    ) -> Option<Conflict> {
        let forward = self.orientation(first, opposition.left, second, opposition.right);
        let backward = self.orientation(first, opposition.right, second, opposition.left);

        // Higher severity wins; on a tie the table orientation is kept.
        let (severity, first_concept, second_concept) = match (forward, backward) {
            (Some(f), Some(b)) if b > f => (b, opposition.right, opposition.left),
            (Some(f), _) => (f, opposition.left, opposition.right),
            (None, Some(b)) => (b, opposition.right, opposition.left),
            (None, None) => return None,
        };

        let resolution = opposition.resolution.clone().unwrap_or_else(|| {
            format!(
                "Decide when {} takes precedence over {}, and write that down as a principle.",
                concept_word(opposition.left),
                concept_word(opposition.right)
            )
        });

        Some(Conflict {
            id: format!(
                "conflict:{}:{}:{}:{}",
                first.node.id,
                second.node.id,
                concept_word(opposition.left),
                concept_word(opposition.right)
            ),
            dimension: format!("{} vs {}", opposition.left, opposition.right),
            severity,
            item1: first.item(),
            item2: second.item(),
            explanation: format!(
                "\"{}\" leans toward {} while \"{}\" leans toward {}; the two pull in opposite directions.",
                first.node.label,
                concept_word(first_concept),
                second.node.label,
                concept_word(second_concept)
            ),
            suggested_resolution: Some(resolution),
        })
    }

    /// Severity when `a` carries `concept_a` and `b` carries `concept_b`,
    /// both at or above the detection floor.
    fn orientation(
        &self,
        a: &Candidate<'_>,
        concept_a: Concept,
        b: &Candidate<'_>,
        concept_b: Concept,
    ) -> Option<Severity> {
        let floor = self.lexicon.thresholds().detection_floor;
        let ca = self.tagger.confidence(a.text, concept_a);
        let cb = self.tagger.confidence(b.text, concept_b);
        if ca < floor || cb < floor {
            return None;
        }
        Some(self.classify(ca, cb))
    }

    #[must_use]
    pub fn classify(&self, ca: f32, cb: f32) -> Severity {
        let thresholds = self.lexicon.thresholds();
        if ca >= thresholds.critical && cb >= thresholds.critical {
            Severity::CriticalConflict
        } else if ca.max(cb) >= thresholds.potential {
            Severity::PotentialConflict
        } else {
            Severity::HealthyTension
        }
    }
}

impl<'n> Candidate<'n> {
    fn of(node: &'n Node) -> Self {
        Self {
            node,
            text: node.text.as_deref().unwrap_or(&node.label),
        }
    }

    fn item(&self) -> ConflictItem {
        ConflictItem {
            id: self.node.id.clone(),
            node_type: self.node.node_type,
            text: self.text.to_string(),
        }
    }
}

fn concept_word(concept: Concept) -> String {
    concept.as_str().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_protocol::NodeType;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn value_node(id: &str, text: &str) -> Node {
        Node {
            id: id.to_string(),
            node_type: NodeType::Value,
            label: text.to_string(),
            text: Some(text.to_string()),
            layer: NodeType::Value.layer(),
            semantic_tags: Vec::new(),
        }
    }

    #[test]
    fn speed_versus_perfect_quality_is_one_potential_conflict() {
        let lexicon = Lexicon::bundled();
        let detector = ConflictDetector::new(&lexicon);
        let nodes = vec![
            value_node("value-0", "Speed"),
            value_node("value-1", "Perfect Quality"),
        ];
        let conflicts = detector.detect(&nodes);
        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.dimension, "SPEED vs QUALITY");
        assert!(conflict.severity >= Severity::PotentialConflict);
        assert_eq!(conflict.item1.id, "value-0");
        assert_eq!(conflict.item2.id, "value-1");
        assert!(conflict.explanation.contains("speed"));
        assert!(conflict.suggested_resolution.is_some());
    }

    #[test]
    fn strong_signals_on_both_sides_are_critical() {
        let lexicon = Lexicon::bundled();
        let detector = ConflictDetector::new(&lexicon);
        let nodes = vec![
            value_node("value-a", "Fast, quick, rapid and agile delivery"),
            value_node("value-b", "Perfect quality, excellence, craft and polish"),
        ];
        let conflicts = detector.detect(&nodes);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::CriticalConflict);
    }

    #[test]
    fn weak_signals_are_healthy_tension() {
        let lexicon = Lexicon::bundled();
        let detector = ConflictDetector::new(&lexicon);
        assert_eq!(detector.classify(0.17, 0.2), Severity::HealthyTension);
        assert_eq!(detector.classify(0.17, 0.34), Severity::PotentialConflict);
        assert_eq!(detector.classify(0.6, 0.66), Severity::CriticalConflict);
    }

    #[test]
    fn only_configured_node_types_are_scanned() {
        let lexicon = Lexicon::bundled();
        let detector = ConflictDetector::new(&lexicon);
        let mut principle = value_node("principle-1", "Perfect quality");
        principle.node_type = NodeType::Principle;
        let nodes = vec![value_node("value-0", "Speed"), principle];
        assert!(detector.detect(&nodes).is_empty());

        let widened = Lexicon::from_bytes("wide", br#"{"conflict_node_types":["value","principle"]}"#)
            .unwrap();
        assert_eq!(ConflictDetector::new(&widened).detect(&nodes).len(), 1);
    }

    #[test]
    fn unrelated_values_do_not_conflict() {
        let lexicon = Lexicon::bundled();
        let detector = ConflictDetector::new(&lexicon);
        let nodes = vec![value_node("value-0", "Kindness"), value_node("value-1", "Humility")];
        assert!(detector.detect(&nodes).is_empty());
    }

    proptest! {
        #[test]
        fn detection_is_symmetric(
            left in "[a-z ]{0,40}",
            right in "[a-z ]{0,40}",
            seed in prop::sample::select(vec!["speed", "quality", "open", "private", "profit", "customer"]),
        ) {
            let lexicon = Lexicon::bundled();
            let detector = ConflictDetector::new(&lexicon);
            let a = value_node("value-a", &format!("{left} {seed}"));
            let b = value_node("value-b", &right);
            prop_assert_eq!(detector.detect_pair(&a, &b), detector.detect_pair(&b, &a));
        }
    }
}
