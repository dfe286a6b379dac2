//! Whole-graph traversals with bare-payload visitors.
//!
//! Unlike queries, visitors get the payload itself rather than a
//! [`crate::context::Context`], and the visiting order is guaranteed:
//!
//! - depth-first: pre-order, parent before children, children in
//!   attachment order;
//! - breadth-first: level order;
//! - post-order: children before parent, for bottom-up accumulation.
//!
//! Every live node is visited exactly once. The `_mut` variants borrow the
//! graph mutably, so topology cannot change while they run.

use std::collections::VecDeque;

use crate::graph::Graph;
use crate::node::Node;
use crate::types::NodeId;

impl<N: Node, D> Graph<N, D> {
    /// Node ids in depth-first pre-order.
    pub fn dfs_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.live);
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.slot(id).children.iter().rev());
        }
        order
    }

    /// Node ids in breadth-first (level) order.
    pub fn bfs_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.live);
        let mut queue = VecDeque::from([self.root]);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.slot(id).children.iter());
        }
        order
    }

    /// Node ids in depth-first post-order.
    pub fn post_order(&self) -> Vec<NodeId> {
        // Pre-order with children pushed in reverse, then flipped.
        let mut order = Vec::with_capacity(self.live);
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.slot(id).children.iter());
        }
        order.reverse();
        order
    }

    pub fn traverse_dfs(&self, mut visitor: impl FnMut(&N)) {
        for id in self.dfs_order() {
            visitor(&self.slot(id).payload);
        }
    }

    pub fn traverse_dfs_mut(&mut self, mut visitor: impl FnMut(&mut N)) {
        for id in self.dfs_order() {
            visitor(&mut self.slot_mut(id).payload);
        }
    }

    pub fn traverse_bfs(&self, mut visitor: impl FnMut(&N)) {
        for id in self.bfs_order() {
            visitor(&self.slot(id).payload);
        }
    }

    pub fn traverse_bfs_mut(&mut self, mut visitor: impl FnMut(&mut N)) {
        for id in self.bfs_order() {
            visitor(&mut self.slot_mut(id).payload);
        }
    }

    /// Bottom-up traversal. The visitor also receives the payloads of the
    /// node's children, already visited, so sums and maxima can be folded
    /// upward in one pass.
    pub fn traverse_post_order_mut(&mut self, mut visitor: impl FnMut(&mut N, &[&N])) {
        for id in self.post_order() {
            let Some(mut node) = self.nodes[id].take() else {
                continue;
            };
            {
                let children: Vec<&N> = node
                    .children
                    .iter()
                    .map(|&c| &self.slot(c).payload)
                    .collect();
                visitor(&mut node.payload, &children);
            }
            self.nodes[id] = Some(node);
        }
    }
}
