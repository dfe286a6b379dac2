/// Engine-wide settings held by every [`crate::graph::Graph`].
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Upper bound on live nodes. A rewrite that would exceed it fails with
    /// [`crate::error::GraphError::CapacityExceeded`] and leaves the graph as is.
    pub max_nodes: Option<usize>,
    /// Re-check the tree invariants after every rewrite. A failure comes back
    /// as [`crate::error::GraphError::Corrupted`].
    pub validate_after_rewrite: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_nodes: None,
            validate_after_rewrite: cfg!(debug_assertions),
        }
    }
}
