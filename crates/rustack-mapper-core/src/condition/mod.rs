//! Condition expressions: the arena-backed AST, its algebra, and the
//! placeholder renderer that compiles conditions into request fragments.

mod ast;
mod render;

use std::fmt;

pub use ast::{
    ComparisonOp, ConditionArena, ConditionId, ConditionNode, DisplayCondition, Leaf, LeafOp,
    Operand,
};
pub use render::{RenderMode, RenderedExpressions, Renderer};

/// A condition together with the arena that owns its nodes.
///
/// This is the owned form handed to builders and stored in tracking records.
/// Combining two trees imports the right-hand arena into the left one and
/// applies the same simplification rules as [`ConditionArena`].
#[derive(Debug, Clone)]
pub struct ConditionTree {
    arena: ConditionArena,
    root: ConditionId,
}

impl ConditionTree {
    /// The empty condition.
    #[must_use]
    pub fn empty() -> Self {
        Self::from(ConditionNode::Empty)
    }

    /// Wrap an arena and one of its nodes.
    #[must_use]
    pub fn new(arena: ConditionArena, root: ConditionId) -> Self {
        Self { arena, root }
    }

    /// The owning arena.
    #[must_use]
    pub fn arena(&self) -> &ConditionArena {
        &self.arena
    }

    /// Root node id.
    #[must_use]
    pub fn root(&self) -> ConditionId {
        self.root
    }

    /// The root node.
    #[must_use]
    pub fn node(&self) -> &ConditionNode {
        self.arena.node(self.root)
    }

    /// See [`ConditionArena::is_empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty(self.root)
    }

    /// See [`ConditionArena::len`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len(self.root)
    }

    /// `self & other`.
    #[must_use]
    pub fn and(mut self, other: impl Into<ConditionTree>) -> Self {
        let other = other.into();
        let b = self.arena.import(&other.arena, other.root);
        self.root = self.arena.and_(self.root, b);
        self
    }

    /// `self | other`.
    #[must_use]
    pub fn or(mut self, other: impl Into<ConditionTree>) -> Self {
        let other = other.into();
        let b = self.arena.import(&other.arena, other.root);
        self.root = self.arena.or_(self.root, b);
        self
    }

    /// `self &= other`.
    pub fn and_assign(&mut self, other: impl Into<ConditionTree>) {
        let other = other.into();
        let b = self.arena.import(&other.arena, other.root);
        self.arena.and_assign(&mut self.root, b);
    }

    /// `self |= other`.
    pub fn or_assign(&mut self, other: impl Into<ConditionTree>) {
        let other = other.into();
        let b = self.arena.import(&other.arena, other.root);
        self.arena.or_assign(&mut self.root, b);
    }

    /// `~self`.
    #[must_use]
    pub fn negate(mut self) -> Self {
        self.root = self.arena.not_(self.root);
        self
    }
}

impl Default for ConditionTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<ConditionNode> for ConditionTree {
    fn from(node: ConditionNode) -> Self {
        let mut arena = ConditionArena::new();
        let root = arena.push(node);
        Self { arena, root }
    }
}

impl PartialEq for ConditionTree {
    fn eq(&self, other: &Self) -> bool {
        self.arena.equals(self.root, &other.arena, other.root)
    }
}

impl fmt::Display for ConditionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.arena.display(self.root))
    }
}
