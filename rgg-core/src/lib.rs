//! Relational growth graph engine.
//!
//! Main components:
//! - [`graph`] — the node store: typed payloads in an arena-backed tree.
//! - [`fragment`] — axioms and replacements built with `+` and [`fragment::branch`].
//! - [`rule`] / [`rewrite`] — rewriting rules and the generation step.
//! - [`query`] — rule-style matching without replacement.
//! - [`traversal`] — depth-first, breadth-first and post-order visitors.
//! - [`context`] — read-only navigation used by predicates.
//! - [`turtle`] — geometry feed boundary.
//! - [`forest`] — many independent graphs rewritten in parallel.
//! - [`config`] — engine settings.
//! - [`error`] — [`error::GraphError`].
//! - [`node`] / [`types`] — the payload trait and shared ids.
//!
//! A typical loop builds an axiom, registers rules and alternates
//! [`Graph::rewrite`] with queries and traversals:
//!
//! ```rust
//! use rgg_core::prelude::*;
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum Algae {
//!     A,
//!     B,
//! }
//!
//! impl Node for Algae {
//!     type Kind = Self;
//!
//!     fn kind(&self) -> Self {
//!         *self
//!     }
//! }
//!
//! let mut g: Graph<Algae> = Graph::build(Fragment::node(Algae::A)).unwrap();
//! g.add_rule(Rule::new("a", Algae::A, |_, _| {
//!     Fragment::node(Algae::A) + Fragment::node(Algae::B)
//! }));
//! g.add_rule(Rule::new("b", Algae::B, |_, _| Fragment::node(Algae::A)));
//!
//! g.rewrite_n(2).unwrap();
//! assert_eq!(g.len(), 3);
//! assert_eq!(g.apply(&Query::new(Algae::B)).unwrap().len(), 1);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod forest;
pub mod fragment;
pub mod graph;
pub mod node;
pub mod query;
pub mod rewrite;
pub mod rule;
pub mod traversal;
pub mod turtle;
pub mod types;

pub use graph::Graph;

pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::context::Context;
    pub use crate::error::GraphError;
    pub use crate::forest::Forest;
    pub use crate::fragment::{Fragment, branch};
    pub use crate::graph::Graph;
    pub use crate::node::Node;
    pub use crate::query::Query;
    pub use crate::rewrite::RewriteReport;
    pub use crate::rule::Rule;
    pub use crate::turtle::{Feed, Primitive, Scene, Turtle, TurtleState};
    pub use crate::types::NodeId;
}
