//! Queries: rule-style matching without replacement.
//!
//! Results come back in **storage order**. That is not the order the axiom
//! was written in, nor any traversal order, once a rewrite has run. Sort the
//! ids or use [`Graph::dfs_order`] when order matters.

use std::fmt;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::Node;
use crate::types::NodeId;

type Predicate<N, D> = Box<dyn Fn(&Context<'_, N, D>) -> Result<bool, GraphError>>;

pub struct Query<N: Node, D = ()> {
    kind: Option<N::Kind>,
    predicate: Option<Predicate<N, D>>,
}

impl<N: Node, D> Query<N, D> {
    /// Matches every node of `kind`.
    pub fn new(kind: N::Kind) -> Self {
        Self {
            kind: Some(kind),
            predicate: None,
        }
    }

    /// Matches nodes of any kind.
    pub fn any() -> Self {
        Self {
            kind: None,
            predicate: None,
        }
    }

    pub fn when(self, predicate: impl Fn(&Context<'_, N, D>) -> bool + 'static) -> Self {
        self.try_when(move |ctx| Ok(predicate(ctx)))
    }

    pub fn try_when(
        mut self,
        predicate: impl Fn(&Context<'_, N, D>) -> Result<bool, GraphError> + 'static,
    ) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    pub fn kind(&self) -> Option<N::Kind> {
        self.kind
    }

    fn matches(&self, ctx: &Context<'_, N, D>) -> Result<bool, GraphError> {
        if self.kind.is_some_and(|k| k != ctx.kind()) {
            return Ok(false);
        }
        match &self.predicate {
            Some(p) => p(ctx),
            None => Ok(true),
        }
    }
}

impl<N: Node, D> fmt::Debug for Query<N, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("kind", &self.kind)
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}

impl<N: Node, D> Graph<N, D> {
    /// Ids of every node matching `query`, in storage order.
    pub fn apply(&self, query: &Query<N, D>) -> Result<Vec<NodeId>, GraphError> {
        let mut hits = Vec::new();
        for id in self.ids() {
            if query.matches(&Context::new(self, id))? {
                hits.push(id);
            }
        }
        Ok(hits)
    }

    /// Evaluates `query` node by node in storage order and hands each match
    /// to `f` together with the graph-level data, before the next node is
    /// tested. Later predicates therefore observe earlier mutations.
    ///
    /// Returns the number of matches. A predicate error stops the walk;
    /// mutations already made are kept.
    pub fn apply_mut(
        &mut self,
        query: &Query<N, D>,
        mut f: impl FnMut(NodeId, &mut N, &mut D),
    ) -> Result<usize, GraphError> {
        let ids: Vec<NodeId> = self.ids().collect();
        let mut count = 0;
        for id in ids {
            if query.matches(&Context::new(self, id))? {
                let (node, data) = self.payload_and_data_mut(id);
                f(id, node, data);
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{Fragment, branch};
    use crate::rule::Rule;
    use proptest::prelude::*;

    #[derive(Clone, Debug, PartialEq)]
    enum Organ {
        Internode { length: f32 },
        Leaf { area: f32 },
        Meristem,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum OrganKind {
        Internode,
        Leaf,
        Meristem,
    }

    impl Node for Organ {
        type Kind = OrganKind;

        fn kind(&self) -> OrganKind {
            match self {
                Organ::Internode { .. } => OrganKind::Internode,
                Organ::Leaf { .. } => OrganKind::Leaf,
                Organ::Meristem => OrganKind::Meristem,
            }
        }
    }

    fn internode(length: f32) -> Fragment<Organ> {
        Fragment::node(Organ::Internode { length })
    }

    fn leaf(area: f32) -> Fragment<Organ> {
        Fragment::node(Organ::Leaf { area })
    }

    /// I(1) [L(2)] I(3) [L(4)] M
    fn shoot() -> Graph<Organ, f32> {
        let axiom = internode(1.0)
            + branch(leaf(2.0))
            + internode(3.0)
            + branch(leaf(4.0))
            + Fragment::node(Organ::Meristem);
        Graph::build(axiom).unwrap()
    }

    #[test]
    fn apply_selects_by_kind() {
        let g = shoot();

        assert_eq!(g.apply(&Query::new(OrganKind::Leaf)).unwrap(), vec![1, 3]);
        assert_eq!(g.apply(&Query::new(OrganKind::Meristem)).unwrap(), vec![4]);
        assert_eq!(g.apply(&Query::any()).unwrap().len(), 5);
    }

    #[test]
    fn apply_filters_with_a_relational_predicate() {
        let g = shoot();
        // Internodes that still carry a meristem somewhere above them.
        let q = Query::<Organ, f32>::new(OrganKind::Internode)
            .when(|c| c.has_descendant(|d| d.kind() == OrganKind::Meristem).0);
        let upper = Query::<Organ, f32>::new(OrganKind::Internode).when(|c| !c.is_root());

        assert_eq!(g.apply(&q).unwrap(), vec![0, 2]);
        assert_eq!(g.apply(&upper).unwrap(), vec![2]);
    }

    #[test]
    fn apply_propagates_predicate_errors() {
        let g = shoot();
        let q = Query::new(OrganKind::Leaf)
            .try_when(|_| Err(GraphError::structural("leaf without petiole")));

        assert!(matches!(
            g.apply(&q),
            Err(GraphError::StructuralViolation(_))
        ));
    }

    #[test]
    fn apply_mut_updates_payloads_and_graph_data_in_storage_order() {
        let mut g = shoot();
        let mut seen = Vec::new();

        let n = g
            .apply_mut(&Query::new(OrganKind::Leaf), |id, node, total| {
                if let Organ::Leaf { area } = node {
                    *area *= 2.0;
                    *total += *area;
                }
                seen.push(id);
            })
            .unwrap();

        assert_eq!(n, 2);
        assert_eq!(seen, vec![1, 3]);
        assert_eq!(*g.data(), 12.0);
        assert_eq!(*g.node(1).unwrap(), Organ::Leaf { area: 4.0 });
    }

    #[test]
    fn apply_mut_predicates_see_earlier_mutations() {
        let mut g = shoot();
        // Only the first internode reached in storage order passes; it raises
        // the shared threshold so the next one fails.
        *g.data_mut() = 0.0;
        let q = Query::<Organ, f32>::new(OrganKind::Internode).when(|c| *c.graph_data() == 0.0);

        let n = g.apply_mut(&q, |_, _, flag| *flag = 1.0).unwrap();

        assert_eq!(n, 1);
    }

    #[test]
    fn query_storage_order_differs_from_traversal_after_rewrite() {
        let mut g = shoot();
        // Replacing the bottom internode appends its replacement at the end of
        // the arena while it stays at the bottom of the tree.
        g.add_rule(
            Rule::<Organ, f32>::new("elongate", OrganKind::Internode, |c, _| match c.data() {
                Organ::Internode { length } => internode(length + 1.0),
                _ => Fragment::empty(),
            })
            .when(|c| c.is_root()),
        );
        g.rewrite().unwrap();

        let hits = g.apply(&Query::new(OrganKind::Internode)).unwrap();
        let dfs: Vec<NodeId> = g
            .dfs_order()
            .into_iter()
            .filter(|&id| g.kind_of(id).unwrap() == OrganKind::Internode)
            .collect();

        assert_eq!(hits, vec![2, 5]);
        assert_eq!(dfs, vec![5, 2]);
    }

    fn chain_graph(len: usize) -> Graph<Organ, f32> {
        let axiom = Fragment::chain((0..len).map(|i| {
            if i % 3 == 0 {
                Organ::Leaf { area: i as f32 }
            } else {
                Organ::Internode { length: i as f32 }
            }
        }));
        Graph::build(axiom).unwrap()
    }

    proptest! {
        #[test]
        fn repeated_queries_return_the_same_ids(len in 1usize..60, threshold in 0.0f32..60.0) {
            let g = chain_graph(len);
            let q = Query::<Organ, f32>::new(OrganKind::Internode).when(move |c| match c.data() {
                Organ::Internode { length } => *length < threshold,
                _ => false,
            });

            let first = g.apply(&q).unwrap();
            let second = g.apply(&q).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
