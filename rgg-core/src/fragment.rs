//! Detached subgraphs used as axioms and as rule replacements.
//!
//! A fragment is written the way growth grammars are usually written:
//! `+` concatenates along the *default path* and [`branch`] opens a
//! bracketed side branch.
//!
//! ```rust
//! use rgg_core::fragment::{branch, Fragment};
//!
//! // Internode + [Leaf] + Meristem
//! let f = Fragment::node("internode")
//!     + branch(Fragment::node("leaf"))
//!     + Fragment::node("meristem");
//! assert_eq!(f.len(), 3);
//! assert_eq!(f.tip_payload(), Some(&"meristem"));
//! ```

use std::ops::Add;

#[derive(Debug, Clone)]
pub(crate) struct FragmentNode<N> {
    pub(crate) payload: N,
    pub(crate) children: Vec<usize>,
}

/// A small tree (or forest of leading branches) not yet attached to a graph.
///
/// - `roots` are the entry points spliced under the rewritten node's parent.
/// - `tip` is the last node of the default path. Whatever hung below the
///   rewritten node is re-attached there. A fragment without a tip (empty,
///   or only branches) passes the old children up to the parent instead.
#[derive(Debug, Clone)]
pub struct Fragment<N> {
    pub(crate) nodes: Vec<FragmentNode<N>>,
    pub(crate) roots: Vec<usize>,
    pub(crate) tip: Option<usize>,
}

/// A bracketed side branch, see [`branch`].
#[derive(Debug, Clone)]
pub struct Branch<N>(Fragment<N>);

/// Wraps `fragment` so that `+` attaches it to the current tip without
/// moving the tip forward.
pub fn branch<N>(fragment: Fragment<N>) -> Branch<N> {
    Branch(fragment)
}

impl<N> Fragment<N> {
    /// The empty replacement. Returning it from a rule deletes the node.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            tip: None,
        }
    }

    pub fn node(payload: N) -> Self {
        Self {
            nodes: vec![FragmentNode {
                payload,
                children: Vec::new(),
            }],
            roots: vec![0],
            tip: Some(0),
        }
    }

    /// Builds a linear chain `a + b + c + ...`.
    pub fn chain(payloads: impl IntoIterator<Item = N>) -> Self {
        payloads
            .into_iter()
            .fold(Self::empty(), |acc, p| acc.then(Self::node(p)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn has_tip(&self) -> bool {
        self.tip.is_some()
    }

    pub fn tip_payload(&self) -> Option<&N> {
        self.tip.map(|t| &self.nodes[t].payload)
    }

    /// Payloads in insertion order.
    pub fn payloads(&self) -> impl Iterator<Item = &N> {
        self.nodes.iter().map(|n| &n.payload)
    }

    /// Concatenates `other` after the tip. `other`'s tip (if any) becomes
    /// the new tip.
    pub fn then(mut self, other: Fragment<N>) -> Self {
        let (roots, tip) = self.absorb(other);
        self.attach_at_tip(roots);
        if tip.is_some() {
            self.tip = tip;
        }
        self
    }

    /// Attaches `side` to the tip as a side branch; the tip does not move.
    pub fn with_branch(mut self, side: Fragment<N>) -> Self {
        let (roots, _) = self.absorb(side);
        self.attach_at_tip(roots);
        self
    }

    fn attach_at_tip(&mut self, roots: Vec<usize>) {
        match self.tip {
            Some(t) => self.nodes[t].children.extend(roots),
            None => self.roots.extend(roots),
        }
    }

    /// Moves `other`'s nodes into `self`, returning its roots and tip
    /// re-indexed into `self.nodes`.
    fn absorb(&mut self, other: Fragment<N>) -> (Vec<usize>, Option<usize>) {
        let offset = self.nodes.len();
        self.nodes.extend(other.nodes.into_iter().map(|mut n| {
            for c in &mut n.children {
                *c += offset;
            }
            n
        }));
        let roots = other.roots.into_iter().map(|r| r + offset).collect();
        (roots, other.tip.map(|t| t + offset))
    }
}

impl<N> Default for Fragment<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<N> From<N> for Fragment<N> {
    fn from(payload: N) -> Self {
        Self::node(payload)
    }
}

impl<N> Add<Fragment<N>> for Fragment<N> {
    type Output = Fragment<N>;

    fn add(self, rhs: Fragment<N>) -> Self::Output {
        self.then(rhs)
    }
}

impl<N> Add<Branch<N>> for Fragment<N> {
    type Output = Fragment<N>;

    fn add(self, rhs: Branch<N>) -> Self::Output {
        self.with_branch(rhs.0)
    }
}
