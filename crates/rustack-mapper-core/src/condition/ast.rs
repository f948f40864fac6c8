//! Condition arena and the combination algebra.
//!
//! Nodes live in a [`ConditionArena`] and refer to each other by
//! [`ConditionId`]. A composite may list the same child more than once, and a
//! descendant may point back at an ancestor; every walk in this module keeps a
//! visited set so cyclic graphs terminate.

use std::collections::{HashMap, HashSet};
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rustack_mapper_model::AttributeValue;
use uuid::Uuid;

use crate::error::{MapperError, MapperResult};
use crate::marshal::Value;
use crate::schema::ColumnRef;

// ---------------------------------------------------------------------------
// Node types
// ---------------------------------------------------------------------------

/// Index of a node inside its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConditionId(usize);

impl ConditionId {
    /// Position in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl ComparisonOp {
    /// Operator as shown in debug output.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Operator in the wire expression grammar.
    #[must_use]
    pub fn wire_symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            other => other.symbol(),
        }
    }
}

/// Leaf operation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafOp {
    /// One of the six comparisons.
    Comparison(ComparisonOp),
    /// `begins_with(column, value)`
    BeginsWith,
    /// `column BETWEEN lower AND upper`
    Between,
    /// `contains(column, value)`
    Contains,
    /// `column IN (...)`
    In,
}

/// Right-hand side of a leaf condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Native value, marshalled against the column type at render time.
    Value(Value),
    /// Value already in wire form.
    Wire(AttributeValue),
    /// Another attribute of the same item.
    Column(ColumnRef),
    /// "No value"; only meaningful for `==` and `!=`.
    Absent,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Wire(av) => write!(f, "{av}"),
            Self::Column(c) => write!(f, "{c}"),
            Self::Absent => f.write_str("None"),
        }
    }
}

macro_rules! operand_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Self::Value(Value::from(v))
                }
            }
        )*
    };
}

operand_from_value!(&str, String, i64, i32, f64, bool, Uuid, DateTime<Utc>, Bytes, Vec<u8>);

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<AttributeValue> for Operand {
    fn from(v: AttributeValue) -> Self {
        Self::Wire(v)
    }
}

impl From<ColumnRef> for Operand {
    fn from(c: ColumnRef) -> Self {
        Self::Column(c)
    }
}

/// A non-empty, non-meta condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// Operation tag.
    pub operation: LeafOp,
    /// Left-hand column, possibly nested.
    pub column: ColumnRef,
    /// Right-hand operands; two for `between`, any number for `in`.
    pub values: Vec<Operand>,
}

/// One node of a condition graph.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    /// Matches everything; renders as nothing.
    Empty,
    /// A single predicate.
    Leaf(Leaf),
    /// All children must hold.
    And(Vec<ConditionId>),
    /// Any child must hold.
    Or(Vec<ConditionId>),
    /// Negation of one child.
    Not(ConditionId),
}

impl ConditionNode {
    /// Build a leaf node.
    #[must_use]
    pub fn leaf(operation: LeafOp, column: ColumnRef, values: Vec<Operand>) -> Self {
        Self::Leaf(Leaf {
            operation,
            column,
            values,
        })
    }

    /// `And`, `Or` or `Not`.
    #[must_use]
    pub fn is_meta(&self) -> bool {
        matches!(self, Self::And(_) | Self::Or(_) | Self::Not(_))
    }

    fn children(&self) -> &[ConditionId] {
        match self {
            Self::And(children) | Self::Or(children) => children,
            Self::Not(child) => std::slice::from_ref(child),
            Self::Empty | Self::Leaf(_) => &[],
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Meta {
    And,
    Or,
}

impl Meta {
    fn matches(self, node: &ConditionNode) -> bool {
        matches!(
            (self, node),
            (Self::And, ConditionNode::And(_)) | (Self::Or, ConditionNode::Or(_))
        )
    }

    fn node(self, children: Vec<ConditionId>) -> ConditionNode {
        match self {
            Self::And => ConditionNode::And(children),
            Self::Or => ConditionNode::Or(children),
        }
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// Owns condition nodes and implements the combination algebra over them.
#[derive(Debug, Clone, Default)]
pub struct ConditionArena {
    nodes: Vec<ConditionNode>,
}

impl ConditionArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Allocate a node.
    pub fn push(&mut self, node: ConditionNode) -> ConditionId {
        self.nodes.push(node);
        ConditionId(self.nodes.len() - 1)
    }

    /// Allocate a fresh `Empty` node.
    pub fn empty(&mut self) -> ConditionId {
        self.push(ConditionNode::Empty)
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this arena.
    #[must_use]
    pub fn node(&self, id: ConditionId) -> &ConditionNode {
        &self.nodes[id.0]
    }

    /// Append `child` to an existing `And`/`Or` node in place.
    ///
    /// This is the one way to build a back-reference to an ancestor.
    pub fn push_child(&mut self, parent: ConditionId, child: ConditionId) -> MapperResult<()> {
        match &mut self.nodes[parent.0] {
            ConditionNode::And(children) | ConditionNode::Or(children) => {
                children.push(child);
                Ok(())
            }
            _ => Err(MapperError::invalid_condition(
                "only And/Or conditions accept children",
                self.display(parent),
            )),
        }
    }

    // -- algebra -----------------------------------------------------------

    /// `a & b` without redundant nesting.
    pub fn and_(&mut self, a: ConditionId, b: ConditionId) -> ConditionId {
        self.combine(Meta::And, a, b)
    }

    /// `a | b` without redundant nesting.
    pub fn or_(&mut self, a: ConditionId, b: ConditionId) -> ConditionId {
        self.combine(Meta::Or, a, b)
    }

    /// `a &= b`; extends `a` in place when it is already an `And`.
    pub fn and_assign(&mut self, a: &mut ConditionId, b: ConditionId) {
        self.combine_assign(Meta::And, a, b);
    }

    /// `a |= b`; extends `a` in place when it is already an `Or`.
    pub fn or_assign(&mut self, a: &mut ConditionId, b: ConditionId) {
        self.combine_assign(Meta::Or, a, b);
    }

    /// `~a`. Empty stays empty and a double negation cancels.
    pub fn not_(&mut self, a: ConditionId) -> ConditionId {
        if self.is_empty(a) {
            return a;
        }
        if let ConditionNode::Not(inner) = self.nodes[a.0] {
            return inner;
        }
        self.push(ConditionNode::Not(a))
    }

    fn combine(&mut self, meta: Meta, a: ConditionId, b: ConditionId) -> ConditionId {
        match (self.is_empty(a), self.is_empty(b)) {
            (true, true) | (false, true) => return a,
            (true, false) => return b,
            (false, false) => {}
        }
        let left = meta.matches(&self.nodes[a.0]);
        let right = meta.matches(&self.nodes[b.0]);
        let children = match (left, right) {
            (true, true) => {
                let mut children = self.nodes[a.0].children().to_vec();
                children.extend_from_slice(self.nodes[b.0].children());
                children
            }
            (true, false) => {
                let mut children = self.nodes[a.0].children().to_vec();
                children.push(b);
                children
            }
            (false, true) => {
                let mut children = vec![a];
                children.extend_from_slice(self.nodes[b.0].children());
                children
            }
            (false, false) => vec![a, b],
        };
        self.push(meta.node(children))
    }

    fn combine_assign(&mut self, meta: Meta, a: &mut ConditionId, b: ConditionId) {
        match (self.is_empty(*a), self.is_empty(b)) {
            (_, true) => return,
            (true, false) => {
                *a = b;
                return;
            }
            (false, false) => {}
        }
        if !meta.matches(&self.nodes[a.0]) {
            *a = self.combine(meta, *a, b);
            return;
        }
        let extra = if meta.matches(&self.nodes[b.0]) {
            self.nodes[b.0].children().to_vec()
        } else {
            vec![b]
        };
        if let ConditionNode::And(children) | ConditionNode::Or(children) = &mut self.nodes[a.0] {
            children.extend(extra);
        }
    }

    // -- traversal ---------------------------------------------------------

    /// Whether the condition constrains nothing: `len(id) == 0`.
    #[must_use]
    pub fn is_empty(&self, id: ConditionId) -> bool {
        self.len(id) == 0
    }

    /// Number of leaf conditions reachable from `id`, counting repeats.
    ///
    /// A composite child contributes one for itself plus its own length; a
    /// reference back to a node on the current path contributes exactly one.
    #[must_use]
    pub fn len(&self, id: ConditionId) -> usize {
        let mut path = HashSet::new();
        self.len_on_path(id, &mut path)
    }

    fn len_on_path(&self, id: ConditionId, path: &mut HashSet<ConditionId>) -> usize {
        match &self.nodes[id.0] {
            ConditionNode::Empty => 0,
            ConditionNode::Leaf(_) => 1,
            ConditionNode::Not(inner) => {
                if path.contains(inner) {
                    return 1;
                }
                path.insert(id);
                let n = self.len_on_path(*inner, path);
                path.remove(&id);
                n
            }
            ConditionNode::And(children) | ConditionNode::Or(children) => {
                path.insert(id);
                let n = children.iter().map(|c| self.child_weight(*c, path)).sum();
                path.remove(&id);
                n
            }
        }
    }

    fn child_weight(&self, id: ConditionId, path: &mut HashSet<ConditionId>) -> usize {
        if path.contains(&id) {
            return 1;
        }
        match &self.nodes[id.0] {
            ConditionNode::Empty => 0,
            ConditionNode::Leaf(_) => 1,
            ConditionNode::Not(inner) => {
                path.insert(id);
                let n = self.child_weight(*inner, path);
                path.remove(&id);
                n
            }
            ConditionNode::And(_) | ConditionNode::Or(_) => match self.len_on_path(id, path) {
                0 => 0,
                n => n + 1,
            },
        }
    }

    /// Every distinct node reachable below `id`, each reported once.
    ///
    /// `id` itself only appears if a descendant refers back to it.
    #[must_use]
    pub fn iter_conditions(&self, id: ConditionId) -> Vec<ConditionId> {
        let mut visited = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<ConditionId> = self.nodes[id.0].children().iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.nodes[next.0].children().iter().rev().copied());
        }
        out
    }

    /// Structural equality between `a` in this arena and `b` in `other`.
    ///
    /// Pairs already under comparison are assumed equal, so matching cycles
    /// compare equal instead of recursing forever.
    #[must_use]
    pub fn equals(&self, a: ConditionId, other: &ConditionArena, b: ConditionId) -> bool {
        let mut assumed = HashSet::new();
        self.equals_with(a, other, b, &mut assumed)
    }

    fn equals_with(
        &self,
        a: ConditionId,
        other: &ConditionArena,
        b: ConditionId,
        assumed: &mut HashSet<(ConditionId, ConditionId)>,
    ) -> bool {
        if !assumed.insert((a, b)) {
            return true;
        }
        match (&self.nodes[a.0], &other.nodes[b.0]) {
            (ConditionNode::Empty, ConditionNode::Empty) => true,
            (ConditionNode::Leaf(x), ConditionNode::Leaf(y)) => x == y,
            (ConditionNode::Not(x), ConditionNode::Not(y)) => self.equals_with(*x, other, *y, assumed),
            (ConditionNode::And(xs), ConditionNode::And(ys))
            | (ConditionNode::Or(xs), ConditionNode::Or(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys)
                        .all(|(x, y)| self.equals_with(*x, other, *y, assumed))
            }
            _ => false,
        }
    }

    /// Debug representation of the condition rooted at `id`.
    #[must_use]
    pub fn display(&self, id: ConditionId) -> DisplayCondition<'_> {
        DisplayCondition { arena: self, id }
    }

    /// Copy everything reachable from `id` into a standalone tree.
    ///
    /// Shared children stay shared and cycles are preserved.
    #[must_use]
    pub fn subtree(&self, id: ConditionId) -> super::ConditionTree {
        let mut remap: HashMap<ConditionId, ConditionId> = HashMap::new();
        let mut order = vec![id];
        let mut stack = vec![id];
        remap.insert(id, ConditionId(0));
        while let Some(next) = stack.pop() {
            for child in self.nodes[next.0].children() {
                if !remap.contains_key(child) {
                    remap.insert(*child, ConditionId(order.len()));
                    order.push(*child);
                    stack.push(*child);
                }
            }
        }
        let map = |c: &ConditionId| remap.get(c).copied().unwrap_or(*c);
        let nodes = order
            .iter()
            .map(|old| match &self.nodes[old.0] {
                ConditionNode::And(children) => ConditionNode::And(children.iter().map(map).collect()),
                ConditionNode::Or(children) => ConditionNode::Or(children.iter().map(map).collect()),
                ConditionNode::Not(child) => ConditionNode::Not(map(child)),
                other => other.clone(),
            })
            .collect();
        super::ConditionTree::new(Self { nodes }, ConditionId(0))
    }

    /// Append every node of `other` to this arena; returns the new id of
    /// `other`'s node `root`.
    pub fn import(&mut self, other: &ConditionArena, root: ConditionId) -> ConditionId {
        let offset = self.nodes.len();
        let shift = |c: &ConditionId| ConditionId(c.0 + offset);
        self.nodes.extend(other.nodes.iter().map(|node| match node {
            ConditionNode::And(children) => ConditionNode::And(children.iter().map(shift).collect()),
            ConditionNode::Or(children) => ConditionNode::Or(children.iter().map(shift).collect()),
            ConditionNode::Not(child) => ConditionNode::Not(shift(child)),
            other => other.clone(),
        }));
        shift(&root)
    }
}

// ---------------------------------------------------------------------------
// Debug representation
// ---------------------------------------------------------------------------

/// `Display` adapter returned by [`ConditionArena::display`].
#[derive(Debug, Clone, Copy)]
pub struct DisplayCondition<'a> {
    arena: &'a ConditionArena,
    id: ConditionId,
}

impl DisplayCondition<'_> {
    fn write(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: ConditionId,
        path: &mut Vec<ConditionId>,
    ) -> fmt::Result {
        if path.contains(&id) {
            return f.write_str("<cycle>");
        }
        match self.arena.node(id) {
            ConditionNode::Empty => f.write_str("()"),
            ConditionNode::Leaf(leaf) => write_leaf(f, leaf),
            ConditionNode::Not(inner) => {
                path.push(id);
                f.write_str("(~")?;
                self.write(f, *inner, path)?;
                path.pop();
                f.write_str(")")
            }
            ConditionNode::And(children) | ConditionNode::Or(children) => {
                let symbol = if matches!(self.arena.node(id), ConditionNode::And(_)) {
                    "&"
                } else {
                    "|"
                };
                path.push(id);
                f.write_str("(")?;
                match children.as_slice() {
                    [] => write!(f, " {symbol} ")?,
                    [only] => {
                        self.write(f, *only, path)?;
                        write!(f, " {symbol}")?;
                    }
                    many => {
                        for (i, child) in many.iter().enumerate() {
                            if i > 0 {
                                write!(f, " {symbol} ")?;
                            }
                            self.write(f, *child, path)?;
                        }
                    }
                }
                path.pop();
                f.write_str(")")
            }
        }
    }
}

fn write_leaf(f: &mut fmt::Formatter<'_>, leaf: &Leaf) -> fmt::Result {
    let column = &leaf.column;
    let list = |values: &[Operand]| {
        values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    match leaf.operation {
        LeafOp::Comparison(op) => {
            let value = leaf.values.first().map(ToString::to_string).unwrap_or_default();
            write!(f, "({column} {} {value})", op.symbol())
        }
        LeafOp::BeginsWith => write!(f, "begins_with({column}, {})", list(&leaf.values)),
        LeafOp::Contains => write!(f, "contains({column}, {})", list(&leaf.values)),
        LeafOp::Between => write!(f, "({column} between [{}])", list(&leaf.values)),
        LeafOp::In => write!(f, "({column} in [{}])", list(&leaf.values)),
    }
}

impl fmt::Display for DisplayCondition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut path = Vec::new();
        self.write(f, self.id, &mut path)
    }
}
