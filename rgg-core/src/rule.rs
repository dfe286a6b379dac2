//! Rewriting rules.
//!
//! A [`Rule`] pairs a node-kind selector with two call slots:
//!
//! 1. **lhs**: decides whether the rule applies to a node and may capture
//!    extra context nodes (ancestors, descendants, ...). It returns
//!    `Ok(Some(captures))` on a match and `Ok(None)` otherwise.
//! 2. **rhs**: receives the matched node's [`Context`] and the captured
//!    contexts (in the order the lhs listed them) and returns the
//!    replacement [`Fragment`].
//!
//! Either slot may fail with a [`GraphError`], which aborts the whole
//! rewrite before anything is spliced.

use std::fmt;

use crate::context::Context;
use crate::error::GraphError;
use crate::fragment::Fragment;
use crate::node::Node;
use crate::types::NodeId;

type Lhs<N, D> =
    Box<dyn Fn(&Context<'_, N, D>) -> Result<Option<Vec<NodeId>>, GraphError> + Send + Sync>;
type Rhs<N, D> = Box<
    dyn Fn(&Context<'_, N, D>, &[Context<'_, N, D>]) -> Result<Fragment<N>, GraphError>
        + Send
        + Sync,
>;

pub struct Rule<N: Node, D = ()> {
    name: String,
    kind: N::Kind,
    lhs: Option<Lhs<N, D>>,
    rhs: Rhs<N, D>,
}

impl<N: Node, D> Rule<N, D> {
    /// A rule that replaces every node of `kind` with the fragment `rhs`
    /// returns. Narrow it with [`Rule::when`] or [`Rule::capturing`].
    pub fn new(
        name: impl Into<String>,
        kind: N::Kind,
        rhs: impl Fn(&Context<'_, N, D>, &[Context<'_, N, D>]) -> Fragment<N>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::try_new(name, kind, move |ctx, captures| Ok(rhs(ctx, captures)))
    }

    /// Like [`Rule::new`] with a generator that can fail.
    pub fn try_new(
        name: impl Into<String>,
        kind: N::Kind,
        rhs: impl Fn(&Context<'_, N, D>, &[Context<'_, N, D>]) -> Result<Fragment<N>, GraphError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            lhs: None,
            rhs: Box::new(rhs),
        }
    }

    /// Boolean predicate without captures.
    pub fn when(
        self,
        predicate: impl Fn(&Context<'_, N, D>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.capturing(move |ctx| Ok(predicate(ctx).then(Vec::new)))
    }

    /// Boolean predicate that may raise a domain error, e.g. a
    /// [`GraphError::StructuralViolation`] when an expected node is missing.
    pub fn try_when(
        self,
        predicate: impl Fn(&Context<'_, N, D>) -> Result<bool, GraphError> + Send + Sync + 'static,
    ) -> Self {
        self.capturing(move |ctx| Ok(predicate(ctx)?.then(Vec::new)))
    }

    /// Full lhs: `Ok(Some(ids))` matches and forwards `ids` to the rhs.
    pub fn capturing(
        mut self,
        lhs: impl Fn(&Context<'_, N, D>) -> Result<Option<Vec<NodeId>>, GraphError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.lhs = Some(Box::new(lhs));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> N::Kind {
        self.kind
    }

    pub(crate) fn matches(
        &self,
        ctx: &Context<'_, N, D>,
    ) -> Result<Option<Vec<NodeId>>, GraphError> {
        match &self.lhs {
            Some(lhs) => lhs(ctx),
            None => Ok(Some(Vec::new())),
        }
    }

    pub(crate) fn produce(
        &self,
        ctx: &Context<'_, N, D>,
        captures: &[Context<'_, N, D>],
    ) -> Result<Fragment<N>, GraphError> {
        (self.rhs)(ctx, captures)
    }
}

impl<N: Node, D> fmt::Debug for Rule<N, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("has_lhs", &self.lhs.is_some())
            .finish()
    }
}
