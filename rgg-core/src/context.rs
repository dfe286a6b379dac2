//! Read-only navigation handles used by rule and query predicates.
//!
//! A [`Context`] is bound to one node of a graph and can walk to its
//! parent, children, ancestors and descendants. It never exposes the arena
//! itself, and because it borrows the graph immutably no topology change can
//! happen while one is alive.
//!
//! ### Search order
//! - Ancestor searches start at the parent and climb one level per step.
//! - Descendant searches are depth-first, pre-order, first child first
//!   (children in attachment order). `steps` is the depth below the start
//!   node of the node that matched.

use std::fmt;

use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::Node;
use crate::types::NodeId;

pub struct Context<'g, N: Node, D> {
    graph: &'g Graph<N, D>,
    id: NodeId,
}

impl<N: Node, D> Clone for Context<'_, N, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N: Node, D> Copy for Context<'_, N, D> {}

impl<'g, N: Node, D> Context<'g, N, D> {
    /// `id` must be live in `graph`.
    pub(crate) fn new(graph: &'g Graph<N, D>, id: NodeId) -> Self {
        Self { graph, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn data(&self) -> &'g N {
        &self.graph.slot(self.id).payload
    }

    pub fn kind(&self) -> N::Kind {
        self.data().kind()
    }

    /// The graph-level data record.
    pub fn graph_data(&self) -> &'g D {
        self.graph.data()
    }

    pub fn is_root(&self) -> bool {
        self.graph.slot(self.id).parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.graph.slot(self.id).children.is_empty()
    }

    /// Number of edges between this node and the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cur = *self;
        while let Some(p) = cur.parent() {
            depth += 1;
            cur = p;
        }
        depth
    }

    pub fn parent(&self) -> Option<Self> {
        self.graph
            .slot(self.id)
            .parent
            .map(|p| Self::new(self.graph, p))
    }

    /// The ancestor `nsteps` levels up; `parent_n(0)` is the node itself.
    ///
    /// ### Errors
    /// [`GraphError::NotFound`] when the walk passes the root.
    pub fn parent_n(&self, nsteps: usize) -> Result<Self, GraphError> {
        let mut cur = *self;
        for _ in 0..nsteps {
            cur = cur.parent().ok_or(GraphError::NotFound {
                from: self.id,
                steps: nsteps,
            })?;
        }
        Ok(cur)
    }

    /// Children in attachment order.
    pub fn children(&self) -> Vec<Self> {
        self.graph
            .slot(self.id)
            .children
            .iter()
            .map(|&c| Self::new(self.graph, c))
            .collect()
    }

    pub fn child_count(&self) -> usize {
        self.graph.slot(self.id).children.len()
    }

    /// Walks upward until `condition` holds.
    ///
    /// Returns whether a match was found and the number of levels climbed,
    /// to the match or to the root when none matched.
    pub fn has_ancestor(&self, condition: impl Fn(&Self) -> bool) -> (bool, usize) {
        let (found, steps) = self.search_ancestors(&condition, usize::MAX);
        (found.is_some(), steps)
    }

    /// Like [`Context::has_ancestor`] but climbs at most `max_level` levels.
    pub fn has_ancestor_within(
        &self,
        condition: impl Fn(&Self) -> bool,
        max_level: usize,
    ) -> (bool, usize) {
        let (found, steps) = self.search_ancestors(&condition, max_level);
        (found.is_some(), steps)
    }

    /// The nearest ancestor for which `condition` holds.
    pub fn ancestor(&self, condition: impl Fn(&Self) -> bool) -> Option<Self> {
        self.search_ancestors(&condition, usize::MAX).0
    }

    /// Searches the subtree (first child first, depth-first) until
    /// `condition` holds.
    ///
    /// Returns whether a match was found and its depth below this node. When
    /// nothing matched, `steps` is the deepest level explored, so a caller
    /// must branch on the boolean rather than assume success.
    pub fn has_descendant(&self, condition: impl Fn(&Self) -> bool) -> (bool, usize) {
        let (found, steps) = self.search_descendants(&condition, usize::MAX);
        (found.is_some(), steps)
    }

    /// Like [`Context::has_descendant`] but looks at most `max_level` levels down.
    pub fn has_descendant_within(
        &self,
        condition: impl Fn(&Self) -> bool,
        max_level: usize,
    ) -> (bool, usize) {
        let (found, steps) = self.search_descendants(&condition, max_level);
        (found.is_some(), steps)
    }

    /// The first descendant, in first-child depth-first order, for which
    /// `condition` holds.
    pub fn descendant(&self, condition: impl Fn(&Self) -> bool) -> Option<Self> {
        self.search_descendants(&condition, usize::MAX).0
    }

    fn search_ancestors(
        &self,
        condition: &impl Fn(&Self) -> bool,
        max_level: usize,
    ) -> (Option<Self>, usize) {
        let mut steps = 0;
        let mut cur = *self;
        while steps < max_level {
            let Some(p) = cur.parent() else { break };
            steps += 1;
            if condition(&p) {
                return (Some(p), steps);
            }
            cur = p;
        }
        (None, steps)
    }

    fn search_descendants(
        &self,
        condition: &impl Fn(&Self) -> bool,
        max_level: usize,
    ) -> (Option<Self>, usize) {
        let mut deepest = 0;
        let mut stack: Vec<(NodeId, usize)> = Vec::new();
        push_children_reversed(self.graph, self.id, 1, max_level, &mut stack);

        while let Some((id, level)) = stack.pop() {
            deepest = deepest.max(level);
            let ctx = Self::new(self.graph, id);
            if condition(&ctx) {
                return (Some(ctx), level);
            }
            push_children_reversed(self.graph, id, level + 1, max_level, &mut stack);
        }
        (None, deepest)
    }
}

/// Pushes so that the first child is popped first.
fn push_children_reversed<N: Node, D>(
    graph: &Graph<N, D>,
    id: NodeId,
    level: usize,
    max_level: usize,
    stack: &mut Vec<(NodeId, usize)>,
) {
    if level > max_level {
        return;
    }
    stack.extend(graph.slot(id).children.iter().rev().map(|&c| (c, level)));
}

impl<N: Node, D> fmt::Debug for Context<'_, N, D>
where
    N: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("node", self.data())
            .finish()
    }
}
