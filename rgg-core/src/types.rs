/// Identifier for a node in a [`crate::graph::Graph`].
///
/// This is an index into the graph's node arena. Ids are never reused:
/// a node removed by a rewrite leaves a vacant slot behind, so an id is
/// only meaningful within the lifetime of a given `Graph` instance.
pub type NodeId = usize;
