//! Compile conditions into wire expressions with name/value placeholders.
//!
//! One [`Renderer`] is used per request. Names and values draw from a single
//! counter, so a request rendered as filter then key reads `#n0`, `:v1`,
//! `#n2`, `:v3`. Name placeholders are cached per attribute path; value
//! placeholders never are.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rustack_mapper_model::AttributeValue;
use serde::Serialize;
use tracing::trace;

use super::ConditionTree;
use super::ast::{ComparisonOp, ConditionArena, ConditionId, ConditionNode, Leaf, LeafOp, Operand};
use crate::error::{MapperError, MapperResult};
use crate::marshal::{TypeDef, encode};
use crate::schema::{Column, ColumnRef, PathSegment};

/// Which request field a rendered condition fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// `ConditionExpression`, a write precondition.
    Condition,
    /// `FilterExpression`.
    Filter,
    /// `KeyConditionExpression`.
    Key,
}

impl RenderMode {
    /// Request field name for this mode.
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Condition => "ConditionExpression",
            Self::Filter => "FilterExpression",
            Self::Key => "KeyConditionExpression",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// The request fragments produced by a [`Renderer`].
///
/// Serializes to exactly the keys that were rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenderedExpressions {
    /// Write precondition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Post-key filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    /// Key condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,
    /// Attribute list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Name placeholders.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// Value placeholders.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,
}

/// Per-request render context.
#[derive(Debug, Default)]
pub struct Renderer {
    counter: usize,
    names: HashMap<(String, String, Vec<PathSegment>), String>,
    output: RenderedExpressions,
}

impl Renderer {
    /// Start a fresh context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragments rendered so far.
    #[must_use]
    pub fn expressions(&self) -> &RenderedExpressions {
        &self.output
    }

    /// Finish and take the fragments.
    #[must_use]
    pub fn finish(self) -> RenderedExpressions {
        self.output
    }

    /// Render `tree` into the field selected by `mode`.
    pub fn render(&mut self, tree: &ConditionTree, mode: RenderMode) -> MapperResult<()> {
        self.render_node(tree.arena(), tree.root(), mode)
    }

    /// Render one node of an arena into the field selected by `mode`.
    ///
    /// An empty condition is rejected: callers check emptiness first and
    /// leave the field out instead.
    pub fn render_node(
        &mut self,
        arena: &ConditionArena,
        root: ConditionId,
        mode: RenderMode,
    ) -> MapperResult<()> {
        if arena.is_empty(root) {
            return Err(MapperError::invalid_condition(
                format!("empty condition cannot be rendered as {mode}"),
                arena.display(root),
            ));
        }
        let mut path = Vec::new();
        let expression = self.expression(arena, root, &mut path)?;
        let slot = match mode {
            RenderMode::Condition => &mut self.output.condition_expression,
            RenderMode::Filter => &mut self.output.filter_expression,
            RenderMode::Key => &mut self.output.key_condition_expression,
        };
        *slot = Some(expression);
        Ok(())
    }

    /// Render a `ProjectionExpression` naming `columns`.
    pub fn render_projection(&mut self, columns: &[Arc<Column>]) {
        if columns.is_empty() {
            return;
        }
        let names: Vec<String> = columns
            .iter()
            .map(|c| self.name_ref(&ColumnRef::from(c)))
            .collect();
        self.output.projection_expression = Some(names.join(", "));
    }

    // -- placeholders ------------------------------------------------------

    fn next_index(&mut self) -> usize {
        let index = self.counter;
        self.counter += 1;
        index
    }

    fn mint_name(&mut self, name: &str) -> String {
        let placeholder = format!("#n{}", self.next_index());
        trace!(placeholder = %placeholder, name, "minted name placeholder");
        self.output
            .expression_attribute_names
            .insert(placeholder.clone(), name.to_owned());
        placeholder
    }

    fn mint_value(&mut self, value: AttributeValue) -> String {
        let placeholder = format!(":v{}", self.next_index());
        trace!(placeholder = %placeholder, "minted value placeholder");
        self.output
            .expression_attribute_values
            .insert(placeholder.clone(), value);
        placeholder
    }

    fn cache_key(column: &ColumnRef, path: &[PathSegment]) -> (String, String, Vec<PathSegment>) {
        (
            column.column().model().to_owned(),
            column.column().wire_name().to_owned(),
            path.to_vec(),
        )
    }

    /// Placeholder path for a (possibly nested) column; cached per path.
    fn name_ref(&mut self, column: &ColumnRef) -> String {
        let key = Self::cache_key(column, column.path());
        if let Some(existing) = self.names.get(&key) {
            return existing.clone();
        }

        let base_key = Self::cache_key(column, &[]);
        let mut rendered = match self.names.get(&base_key) {
            Some(base) => base.clone(),
            None => {
                let base = self.mint_name(column.column().wire_name());
                self.names.insert(base_key, base.clone());
                base
            }
        };
        // Every prefix ending in a key is cached, so sibling paths share it.
        for (depth, segment) in column.path().iter().enumerate() {
            match segment {
                PathSegment::Index(i) => rendered.push_str(&format!("[{i}]")),
                PathSegment::Key(k) => {
                    let prefix_key = Self::cache_key(column, &column.path()[..=depth]);
                    if let Some(prefix) = self.names.get(&prefix_key) {
                        rendered.clone_from(prefix);
                    } else {
                        let placeholder = self.mint_name(k);
                        rendered.push('.');
                        rendered.push_str(&placeholder);
                        self.names.insert(prefix_key, rendered.clone());
                    }
                }
            }
        }
        self.names.insert(key, rendered.clone());
        rendered
    }

    fn value_ref(&mut self, operand: &Operand, typedef: &TypeDef) -> MapperResult<String> {
        match operand {
            Operand::Value(v) => {
                let wire = encode(v, typedef)?;
                Ok(self.mint_value(wire))
            }
            Operand::Wire(av) => Ok(self.mint_value(av.clone())),
            Operand::Column(c) => Ok(self.name_ref(c)),
            Operand::Absent => Err(MapperError::invalid_condition(
                "no-value operand is only valid with == or !=",
                operand,
            )),
        }
    }

    // -- expressions -------------------------------------------------------

    fn expression(
        &mut self,
        arena: &ConditionArena,
        id: ConditionId,
        path: &mut Vec<ConditionId>,
    ) -> MapperResult<String> {
        if path.contains(&id) {
            return Err(MapperError::invalid_condition(
                "cyclic condition cannot be rendered",
                arena.display(id),
            ));
        }
        match arena.node(id) {
            ConditionNode::Empty => Ok(String::new()),
            ConditionNode::Leaf(leaf) => self.leaf(leaf),
            ConditionNode::Not(inner) => {
                path.push(id);
                let rendered = self.expression(arena, *inner, path)?;
                path.pop();
                Ok(format!("(NOT {rendered})"))
            }
            ConditionNode::And(children) | ConditionNode::Or(children) => {
                let joiner = if matches!(arena.node(id), ConditionNode::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                path.push(id);
                let mut parts = Vec::with_capacity(children.len());
                for child in children {
                    if arena.is_empty(*child) {
                        continue;
                    }
                    parts.push(self.expression(arena, *child, path)?);
                }
                path.pop();
                Ok(match parts.len() {
                    1 => parts.remove(0),
                    _ => format!("({})", parts.join(joiner)),
                })
            }
        }
    }

    fn leaf(&mut self, leaf: &Leaf) -> MapperResult<String> {
        let arity_error = |expected: &str| {
            MapperError::invalid_condition(
                format!("expected {expected} operand(s), got {}", leaf.values.len()),
                leaf_repr(leaf),
            )
        };

        let name = self.name_ref(&leaf.column);
        let typedef = leaf.column.typedef()?.clone();

        match leaf.operation {
            LeafOp::Comparison(op) => {
                let [value] = leaf.values.as_slice() else {
                    return Err(arity_error("1"));
                };
                match (op, value) {
                    (ComparisonOp::Eq, Operand::Absent) => {
                        Ok(format!("(attribute_not_exists({name}))"))
                    }
                    (ComparisonOp::Ne, Operand::Absent) => Ok(format!("(attribute_exists({name}))")),
                    _ => {
                        let value = self.value_ref(value, &typedef)?;
                        Ok(format!("({name} {} {value})", op.wire_symbol()))
                    }
                }
            }
            LeafOp::BeginsWith => {
                let [value] = leaf.values.as_slice() else {
                    return Err(arity_error("1"));
                };
                let value = self.value_ref(value, &typedef)?;
                Ok(format!("begins_with({name}, {value})"))
            }
            LeafOp::Contains => {
                let [value] = leaf.values.as_slice() else {
                    return Err(arity_error("1"));
                };
                // Containment compares against a single element of a set or list.
                let element = match &typedef {
                    TypeDef::Set(inner) | TypeDef::List(inner) => inner.as_ref(),
                    other => other,
                };
                let value = self.value_ref(value, element)?;
                Ok(format!("contains({name}, {value})"))
            }
            LeafOp::Between => {
                let [lower, upper] = leaf.values.as_slice() else {
                    return Err(arity_error("2"));
                };
                let lower = self.value_ref(lower, &typedef)?;
                let upper = self.value_ref(upper, &typedef)?;
                Ok(format!("({name} BETWEEN {lower} AND {upper})"))
            }
            LeafOp::In => {
                if leaf.values.is_empty() {
                    return Err(arity_error("at least 1"));
                }
                let values = leaf
                    .values
                    .iter()
                    .map(|v| self.value_ref(v, &typedef))
                    .collect::<MapperResult<Vec<_>>>()?;
                Ok(format!("({name} IN ({}))", values.join(", ")))
            }
        }
    }
}

fn leaf_repr(leaf: &Leaf) -> String {
    let mut arena = ConditionArena::new();
    let id = arena.push(ConditionNode::Leaf(leaf.clone()));
    arena.display(id).to_string()
}
