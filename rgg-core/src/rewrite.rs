//! One rewrite generation.
//!
//! ## Protocol
//!
//! 1. **Snapshot** the live ids in storage order.
//! 2. **Match**: for each node, try the rules registered for its kind in
//!    registration order. The first rule whose lhs matches wins; nodes
//!    without a match are left alone.
//! 3. **Produce**: run every winning rhs. Matching and production both read
//!    the unchanged graph, so no rule sees another rule's effect within the
//!    same generation.
//! 4. **Validate** the plan as a whole (root count, node budget). Any error
//!    up to here leaves the graph untouched.
//! 5. **Splice** in storage order: the matched node is removed, the fragment
//!    roots take its place in the parent's child list and its former
//!    children are re-attached under the fragment tip. The top level is kept
//!    as a list while splicing and the new root is read from it at the end,
//!    so a replaced root may have rewritten descendants in the same pass.

use std::collections::HashMap;

use tracing::{debug, error, trace};

use crate::context::Context;
use crate::error::GraphError;
use crate::fragment::Fragment;
use crate::graph::Graph;
use crate::node::Node;
use crate::types::NodeId;

/// Statistics returned by [`Graph::rewrite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteReport {
    /// Generation number reached by this rewrite.
    pub generation: u64,
    /// Nodes replaced (each removed and spliced over).
    pub matched: usize,
    /// Nodes created from replacement fragments.
    pub inserted: usize,
    pub total_nodes: usize,
}

impl RewriteReport {
    /// `true` if no rule matched anything.
    pub fn is_noop(&self) -> bool {
        self.matched == 0
    }
}

/// Shape of a planned replacement, as far as root counting is concerned.
#[derive(Clone, Copy)]
struct Shape {
    roots: usize,
    has_tip: bool,
}

impl<N: Node, D> Graph<N, D> {
    /// Applies every registered rule once, see the module docs.
    ///
    /// ### Errors
    /// - [`GraphError::Rule`] wrapping whatever a predicate or generator raised.
    /// - [`GraphError::RootReplacement`] if the root would be replaced by
    ///   nothing or by several roots.
    /// - [`GraphError::CapacityExceeded`] if [`crate::config::EngineConfig::max_nodes`]
    ///   would be exceeded.
    ///
    /// On error the graph is left exactly as it was. The one exception is
    /// [`GraphError::Corrupted`], raised by the post-splice check that
    /// [`crate::config::EngineConfig::validate_after_rewrite`] enables: it
    /// means the tree was already broken or the engine has a bug, and the
    /// graph should be discarded.
    pub fn rewrite(&mut self) -> Result<RewriteReport, GraphError> {
        let plan = self.plan()?;
        self.check_plan(&plan)?;

        let matched = plan.len();
        let mut inserted = 0usize;
        let mut top = vec![self.root];
        for (id, fragment) in plan {
            inserted += fragment.len();
            self.splice(id, fragment, &mut top);
        }
        // check_plan counted the same top level, so this only trips on a tree
        // that was already broken.
        match top[..] {
            [root] => self.root = root,
            _ => {
                return Err(GraphError::Corrupted {
                    generation: self.generation,
                    source: Box::new(GraphError::RootReplacement { roots: top.len() }),
                });
            }
        }

        if self.config.validate_after_rewrite {
            self.validate().map_err(|source| {
                error!(
                    generation = self.generation,
                    error = %source,
                    "graph invariants broken by rewrite"
                );
                GraphError::Corrupted {
                    generation: self.generation,
                    source: Box::new(source),
                }
            })?;
        }
        self.generation += 1;

        let report = RewriteReport {
            generation: self.generation,
            matched,
            inserted,
            total_nodes: self.live,
        };
        debug!(
            generation = report.generation,
            matched = report.matched,
            inserted = report.inserted,
            total = report.total_nodes,
            "rewrite applied"
        );
        Ok(report)
    }

    /// Runs [`Graph::rewrite`] `n` times, stopping at the first error.
    pub fn rewrite_n(&mut self, n: usize) -> Result<Vec<RewriteReport>, GraphError> {
        (0..n).map(|_| self.rewrite()).collect()
    }

    /// Steps 1 to 3: match and produce against the unchanged graph.
    fn plan(&self) -> Result<Vec<(NodeId, Fragment<N>)>, GraphError> {
        let mut plan = Vec::new();
        if self.rules.is_empty() {
            return Ok(plan);
        }

        for id in self.ids() {
            let ctx = Context::new(self, id);
            let Some(candidates) = self.dispatch.get(&ctx.kind()) else {
                continue;
            };

            for &r in candidates {
                let rule = &self.rules[r];
                let wrap = |source: GraphError| GraphError::Rule {
                    rule: rule.name().to_string(),
                    node: id,
                    source: Box::new(source),
                };

                let Some(captured) = rule.matches(&ctx).map_err(wrap)? else {
                    continue;
                };
                let captures = captured
                    .into_iter()
                    .map(|c| self.context(c))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(wrap)?;
                let fragment = rule.produce(&ctx, &captures).map_err(wrap)?;

                trace!(rule = rule.name(), node = id, size = fragment.len(), "rule matched");
                plan.push((id, fragment));
                break;
            }
        }
        Ok(plan)
    }

    /// Step 4: reject plans that would break the single-root invariant or
    /// the node budget.
    fn check_plan(&self, plan: &[(NodeId, Fragment<N>)]) -> Result<(), GraphError> {
        if let Some(limit) = self.config.max_nodes {
            let added: usize = plan.iter().map(|(_, f)| f.len()).sum();
            let projected = self.live - plan.len() + added;
            if projected > limit {
                return Err(GraphError::CapacityExceeded { limit, projected });
            }
        }

        let shapes: HashMap<NodeId, Shape> = plan
            .iter()
            .map(|(id, f)| {
                let shape = Shape {
                    roots: f.root_count(),
                    has_tip: f.has_tip(),
                };
                (*id, shape)
            })
            .collect();

        let roots = self.roots_after(&shapes);
        if roots != 1 {
            return Err(GraphError::RootReplacement { roots });
        }
        Ok(())
    }

    /// Counts the top-level nodes the root would turn into.
    ///
    /// An unmatched node stays one node. A replaced node contributes its
    /// fragment roots, plus, when the fragment has no tip, whatever its
    /// children contribute (they move up to the parent).
    fn roots_after(&self, shapes: &HashMap<NodeId, Shape>) -> usize {
        if !shapes.contains_key(&self.root) {
            return 1;
        }

        let mut top = vec![0usize; self.nodes.len()];
        for id in self.post_order() {
            top[id] = match shapes.get(&id) {
                None => 1,
                Some(s) if s.has_tip => s.roots,
                Some(s) => {
                    s.roots
                        + self
                            .slot(id)
                            .children
                            .iter()
                            .map(|&c| top[c])
                            .sum::<usize>()
                }
            };
        }
        top[self.root]
    }

    /// Step 5 for a single node. `top` holds the nodes currently without a
    /// parent; a parentless target is replaced in that list.
    fn splice(&mut self, target: NodeId, fragment: Fragment<N>, top: &mut Vec<NodeId>) {
        let Some(old) = self.nodes[target].take() else {
            return;
        };
        self.live -= 1;

        let (roots, tip) = self.insert_fragment(fragment);

        // Without a tip the old children move up next to the fragment roots.
        let (replacement, orphans) = match tip {
            Some(_) => (roots, old.children),
            None => {
                let mut all = roots;
                all.extend(old.children);
                (all, Vec::new())
            }
        };

        match old.parent {
            Some(p) => {
                for &r in &replacement {
                    self.slot_mut(r).parent = Some(p);
                }
                let siblings = &mut self.slot_mut(p).children;
                let pos = siblings
                    .iter()
                    .position(|&c| c == target)
                    .unwrap_or(siblings.len());
                siblings.splice(pos..(pos + 1).min(siblings.len()), replacement);
            }
            None => {
                for &r in &replacement {
                    self.slot_mut(r).parent = None;
                }
                let pos = top.iter().position(|&t| t == target).unwrap_or(top.len());
                top.splice(pos..(pos + 1).min(top.len()), replacement);
            }
        }

        if let Some(t) = tip {
            for &c in &orphans {
                self.slot_mut(c).parent = Some(t);
            }
            self.slot_mut(t).children.extend(orphans);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::fragment::branch;
    use crate::graph::tests::{Algae, a, b};
    use crate::node::Node;
    use crate::rule::Rule;
    use proptest::prelude::*;

    fn kinds<D>(g: &Graph<Algae, D>) -> Vec<Algae> {
        g.dfs_order().into_iter().map(|id| *g.node(id).unwrap()).collect()
    }

    fn algae() -> Graph<Algae> {
        let mut g = Graph::build(a()).unwrap();
        g.add_rule(Rule::new("a", Algae::A, |_, _| a() + b()));
        g.add_rule(Rule::new("b", Algae::B, |_, _| a()));
        g
    }

    #[test]
    fn algae_grows_one_generation_at_a_time() {
        let mut g = algae();

        let r1 = g.rewrite().unwrap();
        assert_eq!(kinds(&g), vec![Algae::A, Algae::B]);
        assert_eq!(r1.generation, 1);
        assert_eq!(r1.matched, 1);
        assert_eq!(r1.inserted, 2);

        let r2 = g.rewrite().unwrap();
        assert_eq!(kinds(&g), vec![Algae::A, Algae::B, Algae::A]);
        assert_eq!(r2.total_nodes, 3);
        g.validate().unwrap();
    }

    #[test]
    fn algae_follows_fibonacci_sizes() {
        let mut g = algae();
        let sizes: Vec<usize> = g
            .rewrite_n(6)
            .unwrap()
            .iter()
            .map(|r| r.total_nodes)
            .collect();

        assert_eq!(sizes, vec![2, 3, 5, 8, 13, 21]);
        assert_eq!(g.generation(), 6);
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Cell {
        state: u8,
    }

    impl Node for Cell {
        type Kind = ();

        fn kind(&self) -> Self::Kind {}
    }

    fn cell(state: u8) -> Fragment<Cell> {
        Fragment::node(Cell { state })
    }

    fn states(g: &Graph<Cell>) -> Vec<u8> {
        g.dfs_order()
            .into_iter()
            .map(|id| g.node(id).unwrap().state)
            .collect()
    }

    #[test]
    fn parent_state_propagates_one_cell_per_generation() {
        let mut g = Graph::build(cell(1) + cell(0) + cell(0)).unwrap();
        g.add_rule(
            Rule::<Cell, ()>::new("copy-parent", (), |ctx, _| {
                let parent = ctx.parent().map(|p| p.data().state).unwrap_or(0);
                cell(parent)
            })
            .when(|ctx| !ctx.is_root()),
        );

        g.rewrite().unwrap();
        assert_eq!(states(&g), vec![1, 1, 0]);
        g.rewrite().unwrap();
        assert_eq!(states(&g), vec![1, 1, 1]);
    }

    #[test]
    fn rewrite_without_matches_is_a_noop() {
        let mut g = Graph::<Algae>::build(a() + b() + a()).unwrap();
        g.add_rule(Rule::new("never", Algae::A, |_, _| b()).when(|_| false));
        let before_ids: Vec<NodeId> = g.ids().collect();

        let report = g.rewrite().unwrap();

        assert!(report.is_noop());
        assert_eq!(g.ids().collect::<Vec<_>>(), before_ids);
        assert_eq!(kinds(&g), vec![Algae::A, Algae::B, Algae::A]);
    }

    #[test]
    fn first_registered_rule_wins() {
        let mut g = Graph::<Algae>::build(a()).unwrap();
        g.add_rule(Rule::new("first", Algae::A, |_, _| b()));
        g.add_rule(Rule::new("second", Algae::A, |_, _| a() + a()));

        g.rewrite().unwrap();
        assert_eq!(kinds(&g), vec![Algae::B]);
    }

    #[test]
    fn later_rule_applies_when_earlier_predicate_rejects() {
        let mut g = Graph::<Algae>::build(a() + a()).unwrap();
        g.add_rule(Rule::new("root-only", Algae::A, |_, _| b()).when(|c| c.is_root()));
        g.add_rule(Rule::new("fallback", Algae::A, |_, _| b() + b()));

        g.rewrite().unwrap();
        assert_eq!(kinds(&g), vec![Algae::B, Algae::B, Algae::B]);
    }

    #[test]
    fn empty_replacement_deletes_and_reconnects_children() {
        // A + B + A: delete B, its child moves up to the root.
        let mut g = Graph::<Algae>::build(a() + b() + a()).unwrap();
        g.add_rule(Rule::new("drop-b", Algae::B, |_, _| Fragment::empty()));

        let report = g.rewrite().unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(kinds(&g), vec![Algae::A, Algae::A]);
        assert_eq!(g.children_of(g.root()).unwrap(), &[2]);
        g.validate().unwrap();
    }

    #[test]
    fn branching_replacement_keeps_downstream_on_the_tip() {
        // A + B  with  A -> A [B] B : old child B follows the new tip.
        let mut g = Graph::<Algae>::build(a() + b()).unwrap();
        g.add_rule(
            Rule::new("fork", Algae::A, |_, _| a() + branch(b()) + b())
                .when(|c| c.is_root()),
        );

        g.rewrite().unwrap();

        let root = g.root();
        let kids = g.children_of(root).unwrap().to_vec();
        assert_eq!(kids.len(), 2);
        let tip = kids[1];
        assert_eq!(g.children_of(tip).unwrap(), &[1]);
        assert_eq!(g.len(), 4);
        g.validate().unwrap();
    }

    #[test]
    fn replacement_keeps_position_among_siblings() {
        // A [B] [A] B : rewrite the middle branch only.
        let mut g = Graph::<Algae>::build(a() + branch(b()) + branch(a()) + b()).unwrap();
        g.add_rule(
            Rule::new("swap", Algae::A, |_, _| b() + b()).when(|c| !c.is_root()),
        );

        g.rewrite().unwrap();

        let kids = g.children_of(0).unwrap().to_vec();
        assert_eq!(kids.len(), 3);
        assert_eq!(kids[0], 1);
        assert_eq!(kids[2], 3);
        assert_eq!(g.kind_of(kids[1]).unwrap(), Algae::B);
        assert_eq!(g.children_of(kids[1]).unwrap().len(), 1);
    }

    #[test]
    fn predicate_error_aborts_without_mutation() {
        let mut g = Graph::<Algae>::build(a() + b() + a()).unwrap();
        g.add_rule(Rule::new("grow", Algae::A, |_, _| a() + b()));
        g.add_rule(
            Rule::new("needs-a", Algae::B, |_, _| a()).try_when(|ctx| {
                let (found, _) = ctx.has_descendant(|c| c.kind() == Algae::B);
                if found {
                    Ok(true)
                } else {
                    Err(GraphError::structural("no B found in branch"))
                }
            }),
        );

        let err = g.rewrite().unwrap_err();

        assert!(matches!(err, GraphError::Rule { ref rule, node: 1, .. } if rule == "needs-a"));
        assert!(matches!(err.root_cause(), GraphError::StructuralViolation(_)));
        assert_eq!(g.len(), 3);
        assert_eq!(g.generation(), 0);
        assert_eq!(kinds(&g), vec![Algae::A, Algae::B, Algae::A]);
    }

    #[test]
    fn captures_are_forwarded_in_order() {
        // A + B + B: each non-root B captures the root and its parent.
        let mut g = Graph::<Algae>::build(a() + b() + b()).unwrap();
        g.add_rule(
            Rule::new("count", Algae::B, |ctx, caps| {
                assert_eq!(caps.len(), 2);
                assert_eq!(caps[0].id(), 0);
                assert_eq!(caps[1].id(), ctx.parent().unwrap().id());
                a()
            })
            .capturing(|ctx| {
                let root = ctx.ancestor(|c| c.is_root()).map(|c| c.id());
                let parent = ctx.parent().map(|p| p.id());
                Ok(root.zip(parent).map(|(r, p)| vec![r, p]))
            }),
        );

        let report = g.rewrite().unwrap();
        assert_eq!(report.matched, 2);
    }

    #[test]
    fn capturing_an_unknown_node_fails() {
        let mut g = Graph::<Algae>::build(a()).unwrap();
        g.add_rule(Rule::new("bad", Algae::A, |_, _| b()).capturing(|_| Ok(Some(vec![99]))));

        let err = g.rewrite().unwrap_err();
        assert!(matches!(err.root_cause(), GraphError::UnknownNode(99)));
    }

    #[test]
    fn deleting_the_only_root_is_rejected() {
        let mut g = Graph::<Algae>::build(a()).unwrap();
        g.add_rule(Rule::new("vanish", Algae::A, |_, _| Fragment::empty()));

        let err = g.rewrite().unwrap_err();
        assert!(matches!(err, GraphError::RootReplacement { roots: 0 }));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn deleting_the_root_promotes_a_single_child() {
        let mut g = Graph::<Algae>::build(a() + b()).unwrap();
        g.add_rule(Rule::new("vanish", Algae::A, |_, _| Fragment::empty()));

        g.rewrite().unwrap();
        assert_eq!(g.root(), 1);
        assert_eq!(kinds(&g), vec![Algae::B]);
    }

    #[test]
    fn root_count_accounts_for_rewritten_children() {
        // Root A with child B. Both vanish: nothing left.
        let mut g = Graph::<Algae>::build(a() + b()).unwrap();
        g.add_rule(Rule::new("vanish-a", Algae::A, |_, _| Fragment::empty()));
        g.add_rule(Rule::new("vanish-b", Algae::B, |_, _| Fragment::empty()));

        let err = g.rewrite().unwrap_err();
        assert!(matches!(err, GraphError::RootReplacement { roots: 0 }));
    }

    #[test]
    fn root_and_branch_vanishing_together_leave_the_main_axis() {
        // A [B] A: the root A and the branch B both vanish in one pass.
        let mut g = Graph::<Algae>::build(a() + branch(b()) + a()).unwrap();
        g.add_rule(
            Rule::new("drop-root", Algae::A, |_, _| Fragment::empty())
                .when(|c| c.is_root()),
        );
        g.add_rule(Rule::new("drop-b", Algae::B, |_, _| Fragment::empty()));

        let report = g.rewrite().unwrap();

        assert_eq!(report.matched, 2);
        assert_eq!(g.root(), 2);
        assert_eq!(g.len(), 1);
        assert_eq!(g.parent_of(2).unwrap(), None);
        assert_eq!(kinds(&g), vec![Algae::A]);
        g.validate().unwrap();
    }

    #[test]
    fn root_replaced_by_a_branch_while_its_child_vanishes() {
        // A + B with A -> [A] and B -> nothing: the branch becomes the root.
        let mut g = Graph::<Algae>::build(a() + b()).unwrap();
        g.add_rule(Rule::new("lift", Algae::A, |_, _| Fragment::empty() + branch(a())));
        g.add_rule(Rule::new("drop-b", Algae::B, |_, _| Fragment::empty()));

        g.rewrite().unwrap();

        assert_eq!(g.len(), 1);
        assert_eq!(g.root(), 2);
        assert_eq!(kinds(&g), vec![Algae::A]);
        assert!(g.children_of(2).unwrap().is_empty());
        g.validate().unwrap();
    }

    #[test]
    fn broken_tree_is_reported_as_corrupted_after_splicing() {
        let mut g = Graph::<Algae>::build(a() + b())
            .unwrap()
            .with_config(EngineConfig {
                max_nodes: None,
                validate_after_rewrite: true,
            });
        g.slot_mut(0).children.clear();

        let err = g.rewrite().unwrap_err();

        assert!(matches!(err, GraphError::Corrupted { generation: 0, .. }));
        assert!(matches!(err.root_cause(), GraphError::StructuralViolation(_)));
        assert_eq!(g.generation(), 0);
    }

    #[test]
    fn node_budget_is_enforced_before_splicing() {
        let mut g = algae().with_config(EngineConfig {
            max_nodes: Some(4),
            validate_after_rewrite: true,
        });

        g.rewrite_n(2).unwrap();
        let err = g.rewrite().unwrap_err();

        assert!(matches!(
            err,
            GraphError::CapacityExceeded {
                limit: 4,
                projected: 5
            }
        ));
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn identical_graphs_rewrite_identically() {
        let mut left = algae();
        let mut right = algae();
        left.rewrite_n(5).unwrap();
        right.rewrite_n(5).unwrap();

        assert_eq!(kinds(&left), kinds(&right));
        assert_eq!(left.dfs_order(), right.dfs_order());
    }

    proptest! {
        #[test]
        fn unmatched_rewrites_leave_the_graph_alone(
            shape in proptest::collection::vec(any::<bool>(), 1..30)
        ) {
            let axiom = Fragment::chain(shape.iter().map(|&x| if x { Algae::A } else { Algae::B }));
            let mut g = Graph::<Algae>::build(axiom).unwrap();
            g.add_rule(Rule::new("never", Algae::B, |_, _| a()).when(|_| false));
            let ids: Vec<NodeId> = g.ids().collect();
            let before = kinds(&g);

            for _ in 0..3 {
                prop_assert!(g.rewrite().unwrap().is_noop());
            }
            prop_assert_eq!(g.ids().collect::<Vec<_>>(), ids);
            prop_assert_eq!(kinds(&g), before);
        }
    }
}
