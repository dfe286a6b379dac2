//! Node payloads and their type selectors.
//!
//! A graph stores user-defined payloads, usually one `enum` with a variant
//! per domain type (meristem, internode, leaf, ...). Rules and queries do
//! not look at the payload to decide whether they apply; they look at its
//! [`Node::Kind`], a small `Copy` tag resolved once per node.

use std::fmt::Debug;
use std::hash::Hash;

/// A payload that can be stored in a [`crate::graph::Graph`].
///
/// ```rust
/// use rgg_core::node::Node;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum Algae {
///     A,
///     B,
/// }
///
/// impl Node for Algae {
///     type Kind = Self;
///
///     fn kind(&self) -> Self {
///         *self
///     }
/// }
/// # let _ = Algae::B.kind();
/// ```
pub trait Node {
    /// Type selector used by the rule dispatch table.
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}
