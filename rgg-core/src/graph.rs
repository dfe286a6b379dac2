//! The node store.
//!
//! [`Graph`] is an arena of [`GraphNode`]s linked by parent/children
//! indices, plus the graph-level data record and the registered rules.
//! Topology only changes through [`Graph::build`] and
//! [`Graph::rewrite`](crate::rewrite); everything else reads it or
//! mutates payloads in place.

use std::collections::HashMap;
use std::fmt;

use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::GraphError;
use crate::fragment::Fragment;
use crate::node::Node;
use crate::rule::Rule;
use crate::types::NodeId;

#[derive(Debug, Clone)]
pub struct GraphNode<N> {
    pub payload: N,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A rooted tree of typed nodes with its rules and graph-level data.
///
/// `D` is shared state visible to every rule, query and traversal (global
/// parameters, accumulators). It survives rewrites unless replaced with
/// [`Graph::replace_data`].
pub struct Graph<N: Node, D = ()> {
    pub(crate) nodes: Vec<Option<GraphNode<N>>>,
    pub(crate) root: NodeId,
    pub(crate) live: usize,
    pub(crate) data: D,
    pub(crate) rules: Vec<Rule<N, D>>,
    pub(crate) dispatch: HashMap<N::Kind, Vec<usize>>,
    pub(crate) generation: u64,
    pub(crate) config: EngineConfig,
}

impl<N: Node, D: Default> Graph<N, D> {
    /// Materializes `axiom` with default graph-level data.
    pub fn build(axiom: Fragment<N>) -> Result<Self, GraphError> {
        Self::with_data(axiom, D::default())
    }
}

impl<N: Node, D> Graph<N, D> {
    /// Materializes `axiom` into a rooted graph.
    ///
    /// ### Errors
    /// - [`GraphError::EmptyAxiom`] if the fragment has no nodes.
    /// - [`GraphError::StructuralViolation`] if it starts with side branches
    ///   and therefore has more than one root.
    pub fn with_data(axiom: Fragment<N>, data: D) -> Result<Self, GraphError> {
        if axiom.is_empty() {
            return Err(GraphError::EmptyAxiom);
        }
        if axiom.root_count() != 1 {
            return Err(GraphError::structural(format!(
                "axiom must have a single root, found {}",
                axiom.root_count()
            )));
        }

        let mut graph = Self {
            nodes: Vec::with_capacity(axiom.len()),
            root: 0,
            live: 0,
            data,
            rules: Vec::new(),
            dispatch: HashMap::new(),
            generation: 0,
            config: EngineConfig::default(),
        };
        let (roots, _) = graph.insert_fragment(axiom);
        graph.root = roots[0];
        Ok(graph)
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    /// Registers a rule. Rules are tried in registration order; the first one
    /// that matches a node wins. The rule's kind is resolved into the
    /// dispatch table here, once.
    pub fn add_rule(&mut self, rule: Rule<N, D>) -> &mut Self {
        let index = self.rules.len();
        self.dispatch.entry(rule.kind()).or_default().push(index);
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Rule<N, D>] {
        &self.rules
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    /// A built graph always holds its root, so this is only `true` for a
    /// graph whose invariants were broken.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of successful rewrites applied so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    /// Swaps in new graph-level data and returns the old record.
    pub fn replace_data(&mut self, data: D) -> D {
        std::mem::replace(&mut self.data, data)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id), Some(Some(_)))
    }

    /// Live node ids in storage order.
    ///
    /// Storage order is an implementation detail of the arena. It is neither
    /// creation order of the axiom nor any traversal order once rewrites have
    /// run; use [`Graph::dfs_order`] or [`Graph::bfs_order`] when order matters.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|_| id))
    }

    pub fn get(&self, id: NodeId) -> Result<&GraphNode<N>, GraphError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(GraphError::UnknownNode(id))
    }

    pub fn node(&self, id: NodeId) -> Result<&N, GraphError> {
        self.get(id).map(|n| &n.payload)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut N, GraphError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .map(|n| &mut n.payload)
            .ok_or(GraphError::UnknownNode(id))
    }

    pub fn kind_of(&self, id: NodeId) -> Result<N::Kind, GraphError> {
        self.node(id).map(|n| n.kind())
    }

    pub fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>, GraphError> {
        self.get(id).map(|n| n.parent)
    }

    pub fn children_of(&self, id: NodeId) -> Result<&[NodeId], GraphError> {
        self.get(id).map(|n| n.children.as_slice())
    }

    /// Read-only navigation handle bound to `id`.
    pub fn context(&self, id: NodeId) -> Result<Context<'_, N, D>, GraphError> {
        if self.contains(id) {
            Ok(Context::new(self, id))
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    /// Ids of every node of the given kind, in storage order.
    pub fn nodes_of_kind(&self, kind: N::Kind) -> Vec<NodeId> {
        self.ids()
            .filter(|&id| self.slot(id).payload.kind() == kind)
            .collect()
    }

    /// Panicking accessor for ids the engine itself just read from the arena.
    pub(crate) fn slot(&self, id: NodeId) -> &GraphNode<N> {
        self.nodes[id]
            .as_ref()
            .unwrap_or_else(|| panic!("node {id} is vacant"))
    }

    pub(crate) fn slot_mut(&mut self, id: NodeId) -> &mut GraphNode<N> {
        self.nodes[id]
            .as_mut()
            .unwrap_or_else(|| panic!("node {id} is vacant"))
    }

    /// Payload and graph-level data borrowed mutably at the same time.
    pub(crate) fn payload_and_data_mut(&mut self, id: NodeId) -> (&mut N, &mut D) {
        let node = self.nodes[id]
            .as_mut()
            .unwrap_or_else(|| panic!("node {id} is vacant"));
        (&mut node.payload, &mut self.data)
    }

    /// Appends `fragment` to the arena. Roots come back detached (no parent);
    /// the caller links them.
    pub(crate) fn insert_fragment(
        &mut self,
        fragment: Fragment<N>,
    ) -> (Vec<NodeId>, Option<NodeId>) {
        let base = self.nodes.len();
        let count = fragment.nodes.len();
        let mut parents: Vec<Option<NodeId>> = vec![None; count];
        for (i, n) in fragment.nodes.iter().enumerate() {
            for &c in &n.children {
                parents[c] = Some(base + i);
            }
        }

        for (n, parent) in fragment.nodes.into_iter().zip(parents) {
            let children = n.children.into_iter().map(|c| base + c).collect();
            self.nodes.push(Some(GraphNode {
                payload: n.payload,
                parent,
                children,
            }));
        }
        self.live += count;

        let roots = fragment.roots.into_iter().map(|r| base + r).collect();
        (roots, fragment.tip.map(|t| base + t))
    }

    /// Checks the tree invariants: one live root without a parent, every
    /// child pointing back at its parent, and every live node reachable from
    /// the root exactly once.
    pub fn validate(&self) -> Result<(), GraphError> {
        let root = self.get(self.root)?;
        if root.parent.is_some() {
            return Err(GraphError::structural(format!(
                "root {} has a parent",
                self.root
            )));
        }

        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        let mut reached = 0usize;
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id], true) {
                return Err(GraphError::structural(format!(
                    "node {id} is reachable more than once"
                )));
            }
            reached += 1;
            for &c in &self.get(id)?.children {
                if self.get(c)?.parent != Some(id) {
                    return Err(GraphError::structural(format!(
                        "node {c} is listed under {id} but points elsewhere"
                    )));
                }
                stack.push(c);
            }
        }

        if reached != self.live {
            return Err(GraphError::structural(format!(
                "{} of {} live nodes are unreachable from the root",
                self.live - reached,
                self.live
            )));
        }
        Ok(())
    }
}

impl<N: Node, D> fmt::Debug for Graph<N, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.live)
            .field("root", &self.root)
            .field("rules", &self.rules.len())
            .field("generation", &self.generation)
            .finish()
    }
}
