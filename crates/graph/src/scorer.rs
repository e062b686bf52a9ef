use crate::lexicon::Lexicon;
use compass_protocol::{AlignmentMetrics, OntologyGraph, Severity, StatementSnapshot};
use std::collections::HashSet;

/// Required fields counted by the completeness score.
const REQUIRED_FIELDS: usize = 8;

/// Below this density (with more than one node) the graph is reported as
/// sparsely connected.
const SPARSE_DENSITY: u8 = 30;

/// Computes completeness, density, conflict and overall alignment scores
/// plus templated insights.
pub struct AlignmentScorer<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> AlignmentScorer<'a> {
    #[must_use]
    pub const fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    #[must_use]
    pub fn score(&self, snapshot: &StatementSnapshot, graph: &OntologyGraph) -> AlignmentMetrics {
        let completeness_score = completeness(snapshot);
        let connection_density = density(graph);
        let conflict_score = self.conflict_score(graph);

        let weights = self.lexicon.weights();
        let total = weights.completeness + weights.density + weights.conflict;
        let weighted = (f32::from(completeness_score) * weights.completeness
            + f32::from(connection_density) * weights.density
            + f32::from(conflict_score) * weights.conflict)
            / total;
        let alignment_score = to_score(weighted);

        AlignmentMetrics {
            alignment_score,
            completeness_score,
            connection_density,
            conflict_score,
            insights: insights(snapshot, graph, completeness_score, connection_density),
        }
    }

    fn conflict_score(&self, graph: &OntologyGraph) -> u8 {
        let penalties = self.lexicon.penalties();
        let penalty: u32 = graph
            .conflicts
            .iter()
            .map(|c| match c.severity {
                Severity::CriticalConflict => penalties.critical,
                Severity::PotentialConflict => penalties.potential,
                Severity::HealthyTension => penalties.healthy,
            })
            .fold(0u32, u32::saturating_add);
        u8::try_from(100u32.saturating_sub(penalty)).unwrap_or(100)
    }
}

/// Percentage of the required fields that are filled in.
#[must_use]
pub fn completeness(snapshot: &StatementSnapshot) -> u8 {
    let filled = [
        !snapshot.purpose.trim().is_empty(),
        !snapshot.vision.trim().is_empty(),
        !snapshot.mission.trim().is_empty(),
        !snapshot.strategy.trim().is_empty(),
        snapshot.values.iter().any(|v| !v.full_text().trim().is_empty()),
        snapshot.principles.iter().any(|p| !p.text.trim().is_empty()),
        snapshot.behaviors.iter().any(|b| !b.text.trim().is_empty()),
        snapshot.goals.iter().any(|g| !g.text().trim().is_empty()),
    ]
    .into_iter()
    .filter(|filled| *filled)
    .count();
    to_score(100.0 * filled as f32 / REQUIRED_FIELDS as f32)
}

/// Relationships relative to a spanning tree (`nodes - 1` edges), capped.
#[must_use]
pub fn density(graph: &OntologyGraph) -> u8 {
    let nodes = graph.nodes.len();
    if nodes <= 1 {
        return 0;
    }
    let ratio = graph.relationships.len() as f32 / (nodes - 1) as f32;
    to_score(100.0 * ratio)
}

fn to_score(value: f32) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

fn insights(
    snapshot: &StatementSnapshot,
    graph: &OntologyGraph,
    completeness: u8,
    density: u8,
) -> Vec<String> {
    let mut out = Vec::new();

    let values = snapshot
        .values
        .iter()
        .filter(|v| !v.full_text().trim().is_empty())
        .count();
    let principles = snapshot
        .principles
        .iter()
        .filter(|p| !p.text.trim().is_empty())
        .count();
    let behaviors = snapshot
        .behaviors
        .iter()
        .filter(|b| !b.text.trim().is_empty())
        .count();
    let goals = snapshot
        .goals
        .iter()
        .filter(|g| !g.text().trim().is_empty())
        .count();
    let roles = snapshot
        .roles
        .iter()
        .filter(|r| !r.title().trim().is_empty())
        .count();

    if snapshot.purpose.trim().is_empty() {
        out.push("No purpose defined yet: start with why the team exists.".to_string());
    }
    if goals == 0 {
        out.push(
            "No goals defined: add measurable goals to turn the strategy into execution."
                .to_string(),
        );
    }
    if values > 0 && principles == 0 {
        out.push(
            "Values are present but no principles translate them into guidance.".to_string(),
        );
    }
    if principles > behaviors {
        out.push(format!(
            "Principles outnumber behaviors ({principles} vs {behaviors}): describe what living each principle looks like."
        ));
    }

    let critical = graph
        .conflicts
        .iter()
        .filter(|c| c.severity == Severity::CriticalConflict)
        .count();
    if critical > 0 {
        out.push(format!(
            "{critical} critical conflict(s) between values need an explicit decision."
        ));
    }

    let value_ids: HashSet<&str> = snapshot
        .values
        .iter()
        .map(|v| v.id.trim())
        .filter(|id| !id.is_empty())
        .collect();
    let unlinked = snapshot
        .principles
        .iter()
        .chain(&snapshot.behaviors)
        .filter(|s| !s.text.trim().is_empty())
        .filter(|s| {
            !s.source_value_ids
                .iter()
                .any(|id| value_ids.contains(id.trim()))
        })
        .count();
    if values > 0 && unlinked > 0 {
        out.push(format!(
            "{unlinked} principle(s) or behavior(s) are not linked to any value."
        ));
    }

    if !snapshot.people.is_empty() && roles == 0 {
        out.push("People are listed but no roles are defined.".to_string());
    }

    if graph.nodes.len() > 1 && density < SPARSE_DENSITY {
        out.push(
            "The identity graph is sparsely connected: link statements to the values they serve."
                .to_string(),
        );
    }

    if completeness == 100 && graph.conflicts.is_empty() {
        out.push("All core elements are defined and no conflicts were detected.".to_string());
    }

    out
}
