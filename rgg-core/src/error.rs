use thiserror::Error;

use crate::types::NodeId;

#[derive(Debug, Error)]
pub enum GraphError {
    /// A graph was built from a fragment with no nodes.
    #[error("axiom fragment is empty")]
    EmptyAxiom,

    /// A required shape is missing: a multi-rooted axiom, or a predicate that
    /// expected some node in its branch and did not find it.
    #[error("structural violation: {0}")]
    StructuralViolation(String),

    /// [`crate::context::Context::parent_n`] walked past the root.
    #[error("node {from} has no ancestor {steps} level(s) up")]
    NotFound { from: NodeId, steps: usize },

    /// An id that is vacant or was never allocated.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// A rewrite plan would leave `roots` top-level nodes instead of one,
    /// e.g. deleting the root or replacing it with two side branches.
    /// Raised before anything is spliced.
    #[error("replacing the root must leave exactly one root, got {roots}")]
    RootReplacement { roots: usize },

    /// A rewrite would grow past [`crate::config::EngineConfig::max_nodes`].
    /// Raised before anything is spliced.
    #[error("rewrite would grow the graph to {projected} nodes (limit {limit})")]
    CapacityExceeded { limit: usize, projected: usize },

    /// A rule's predicate, capture or generator failed on `node`. `source`
    /// is what the rule raised; the graph is unchanged.
    #[error("rule `{rule}` failed on node {node}: {source}")]
    Rule {
        rule: String,
        node: NodeId,
        #[source]
        source: Box<GraphError>,
    },

    /// Tree invariants did not hold after splicing generation `generation`.
    /// The graph has been modified and should be discarded.
    #[error("graph corrupted while rewriting generation {generation}: {source}")]
    Corrupted {
        generation: u64,
        #[source]
        source: Box<GraphError>,
    },
}

impl GraphError {
    /// Shorthand for predicates that find a required invariant broken,
    /// e.g. `GraphError::structural("no meristem found in branch")`.
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::StructuralViolation(msg.into())
    }

    /// Strips any [`GraphError::Rule`] or [`GraphError::Corrupted`] wrappers
    /// and returns the underlying error.
    pub fn root_cause(&self) -> &GraphError {
        match self {
            Self::Rule { source, .. } | Self::Corrupted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
