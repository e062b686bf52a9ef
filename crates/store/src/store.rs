use crate::error::{Result, StoreError};
use crate::locate::{locate, node_type_of, RecordRef};
use compass_canvas::GraphHost;
use compass_protocol::{
    parse_snapshot, GraphLayout, NodeType, PairKey, RelationType, Relationship, StatementSnapshot,
    StoreCommand,
};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// Sole owner of the authored snapshot and its durable canvas state.
///
/// Every mutation goes through [`dispatch`](Self::dispatch), which takes
/// `&mut self`, so writes are serialized by construction. Each applied
/// change bumps a revision published on a watch channel.
#[derive(Debug)]
pub struct IdentityStore {
    snapshot: StatementSnapshot,
    path: Option<PathBuf>,
    revision_tx: watch::Sender<u64>,
}

impl IdentityStore {
    #[must_use]
    pub fn new(snapshot: StatementSnapshot) -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            snapshot,
            path: None,
            revision_tx,
        }
    }

    /// Load a snapshot file and remember it as the backing file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = parse_snapshot(&bytes).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded snapshot from {}", path.display());
        let mut store = Self::new(snapshot);
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    #[must_use]
    pub fn snapshot(&self) -> &StatementSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision_tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    /// Write back to the file the store was loaded from.
    pub fn save(&self) -> Result<()> {
        let path = self.path.as_deref().ok_or(StoreError::NoBackingFile)?;
        self.save_to(path)
    }

    /// Write the snapshot as pretty JSON. The file is replaced atomically
    /// through a temporary sibling.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(&self.snapshot)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        log::debug!("Saved snapshot to {}", path.display());
        Ok(())
    }

    /// Apply one command. Returns whether the snapshot changed.
    pub fn dispatch(&mut self, command: StoreCommand) -> Result<bool> {
        let changed = match command {
            StoreCommand::EditNode {
                id,
                node_type,
                new_label,
            } => self.edit_node(&id, node_type, new_label)?,
            StoreCommand::SaveLayout { layout } => self.save_layout(layout),
            StoreCommand::AddManualEdge {
                source_id,
                target_id,
            } => self.add_manual_edge(&source_id, &target_id)?,
            StoreCommand::SaveRelationships { relationships } => {
                self.save_relationships(relationships)
            }
        };
        if changed {
            self.revision_tx.send_modify(|revision| *revision += 1);
        }
        Ok(changed)
    }

    fn edit_node(&mut self, id: &str, node_type: NodeType, new_label: String) -> Result<bool> {
        let record = locate(&self.snapshot, node_type, id).ok_or_else(|| {
            StoreError::NodeNotFound {
                id: id.to_string(),
                node_type,
            }
        })?;
        let snapshot = &mut self.snapshot;
        let field: &mut String = match record {
            RecordRef::Purpose => &mut snapshot.purpose,
            RecordRef::Vision => &mut snapshot.vision,
            RecordRef::Mission => &mut snapshot.mission,
            RecordRef::Strategy => &mut snapshot.strategy,
            RecordRef::Value(index) => &mut snapshot.values[index].name,
            RecordRef::Principle(index) => &mut snapshot.principles[index].text,
            RecordRef::Behavior(index) => &mut snapshot.behaviors[index].text,
            RecordRef::Goal(index) => {
                let goal = &mut snapshot.goals[index];
                if goal.text() == new_label {
                    return Ok(false);
                }
                goal.set_text(new_label);
                return Ok(true);
            }
            RecordRef::Role(index) => {
                let role = &mut snapshot.roles[index];
                if role.title() == new_label {
                    return Ok(false);
                }
                role.set_title(new_label);
                return Ok(true);
            }
        };
        if *field == new_label {
            return Ok(false);
        }
        *field = new_label;
        log::debug!("Edited {node_type} node {id}");
        Ok(true)
    }

    fn save_layout(&mut self, layout: GraphLayout) -> bool {
        let before = self.snapshot.layout.clone();
        self.snapshot.layout.merge(layout.positions);
        self.snapshot.layout != before
    }

    fn add_manual_edge(&mut self, source_id: &str, target_id: &str) -> Result<bool> {
        let source_type = self.resolve_type(source_id)?;
        let target_type = self.resolve_type(target_id)?;
        if source_id == target_id {
            return Ok(false);
        }
        let key = PairKey::new(source_id, target_id);
        if self.snapshot.relationships.iter().any(|r| r.pair_key() == key) {
            return Ok(false);
        }
        self.snapshot.relationships.push(Relationship {
            id: format!("user:{source_id}:{target_id}"),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            source_type,
            target_type,
            relation_type: RelationType::UserDefined,
            strength: 100,
            confidence: 100,
            explanation: None,
            auto_detected: false,
        });
        Ok(true)
    }

    fn save_relationships(&mut self, relationships: Vec<Relationship>) -> bool {
        let mut seen: HashSet<PairKey> = self
            .snapshot
            .relationships
            .iter()
            .map(Relationship::pair_key)
            .collect();
        let mut added = 0usize;
        for relationship in relationships {
            if relationship.source_id == relationship.target_id {
                continue;
            }
            if seen.insert(relationship.pair_key()) {
                self.snapshot.relationships.push(Relationship {
                    auto_detected: false,
                    ..relationship
                });
                added += 1;
            }
        }
        if added > 0 {
            log::info!("Stored {added} new relationship(s)");
        }
        added > 0
    }

    fn resolve_type(&self, id: &str) -> Result<NodeType> {
        node_type_of(id)
            .filter(|node_type| locate(&self.snapshot, *node_type, id).is_some())
            .ok_or_else(|| StoreError::UnknownNode(id.to_string()))
    }
}

impl GraphHost for IdentityStore {
    fn persist_layout(&mut self, layout: GraphLayout) -> anyhow::Result<()> {
        self.dispatch(StoreCommand::SaveLayout { layout })?;
        Ok(())
    }

    fn persist_relationships(&mut self, relationships: Vec<Relationship>) -> anyhow::Result<()> {
        self.dispatch(StoreCommand::SaveRelationships { relationships })?;
        Ok(())
    }
}
