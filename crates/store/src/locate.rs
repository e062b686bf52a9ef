use compass_protocol::{NodeType, StatementSnapshot};
use std::collections::HashSet;

/// The snapshot record a graph node was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordRef {
    Purpose,
    Vision,
    Mission,
    Strategy,
    Value(usize),
    Principle(usize),
    Behavior(usize),
    Goal(usize),
    Role(usize),
}

/// Node type implied by a node id (`mission`, `value-v1`, `goal-3~2`).
pub(crate) fn node_type_of(id: &str) -> Option<NodeType> {
    let prefix = id.split_once('-').map_or(id, |(prefix, _)| prefix);
    NodeType::parse(prefix)
}

/// Resolve `id` against `snapshot` using the same id scheme the graph
/// builder assigns: record id, else position, `~n` for repeats, blank
/// entries skipped.
pub(crate) fn locate(snapshot: &StatementSnapshot, node_type: NodeType, id: &str) -> Option<RecordRef> {
    let single = |text: &str, record: RecordRef| {
        (id == node_type.as_str() && !text.trim().is_empty()).then_some(record)
    };
    match node_type {
        NodeType::Purpose => single(&snapshot.purpose, RecordRef::Purpose),
        NodeType::Vision => single(&snapshot.vision, RecordRef::Vision),
        NodeType::Mission => single(&snapshot.mission, RecordRef::Mission),
        NodeType::Strategy => single(&snapshot.strategy, RecordRef::Strategy),
        NodeType::Value => find_entry(
            node_type,
            id,
            snapshot
                .values
                .iter()
                .map(|v| (v.id.as_str(), v.full_text().trim().is_empty())),
        )
        .map(RecordRef::Value),
        NodeType::Principle => find_entry(
            node_type,
            id,
            snapshot
                .principles
                .iter()
                .map(|p| (p.id.as_str(), p.text.trim().is_empty())),
        )
        .map(RecordRef::Principle),
        NodeType::Behavior => find_entry(
            node_type,
            id,
            snapshot
                .behaviors
                .iter()
                .map(|b| (b.id.as_str(), b.text.trim().is_empty())),
        )
        .map(RecordRef::Behavior),
        NodeType::Goal => find_entry(
            node_type,
            id,
            snapshot
                .goals
                .iter()
                .map(|g| (g.stable_id().unwrap_or_default(), g.text().trim().is_empty())),
        )
        .map(RecordRef::Goal),
        NodeType::Role => find_entry(
            node_type,
            id,
            snapshot
                .roles
                .iter()
                .map(|r| (r.stable_id().unwrap_or_default(), r.title().trim().is_empty())),
        )
        .map(RecordRef::Role),
    }
}

fn find_entry<'s>(
    node_type: NodeType,
    wanted: &str,
    records: impl Iterator<Item = (&'s str, bool)>,
) -> Option<usize> {
    let mut assigned: HashSet<String> = HashSet::new();
    for (index, (record_id, blank)) in records.enumerate() {
        if blank {
            continue;
        }
        let record_id = record_id.trim();
        let base = if record_id.is_empty() {
            format!("{}-{index}", node_type.as_str())
        } else {
            format!("{}-{record_id}", node_type.as_str())
        };
        let mut id = base.clone();
        let mut n = 2usize;
        while assigned.contains(&id) {
            id = format!("{base}~{n}");
            n += 1;
        }
        if id == wanted {
            return Some(index);
        }
        assigned.insert(id);
    }
    None
}
