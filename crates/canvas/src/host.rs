use compass_protocol::{GraphLayout, Relationship};

/// Owner of the durable identity data. The synchronizer never writes
/// durable state itself; it asks the host through these callbacks.
pub trait GraphHost {
    /// Replace the durable layout.
    fn persist_layout(&mut self, layout: GraphLayout) -> anyhow::Result<()>;

    /// Replace the durable relationship list (user-drawn and saved
    /// suggestions).
    fn persist_relationships(&mut self, relationships: Vec<Relationship>) -> anyhow::Result<()>;
}
