//! Change tracking for optimistic, conditional writes.
//!
//! Each [`ModelObject`] owns a [`Tracking`] record. The model-binding layer
//! calls [`on_loaded`], [`on_saved`] and [`on_deleted`] as objects are synced
//! with the table; each call rebuilds the snapshot condition from scratch.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::condition::{ConditionArena, ConditionTree, Operand};
use crate::error::MapperResult;
use crate::marshal::encode;
use crate::object::ModelObject;
use crate::schema::{Column, ColumnRef, ModelSchema};

/// Per-object tracking state.
#[derive(Debug, Clone, Default)]
pub struct Tracking {
    marked: BTreeSet<String>,
    snapshot: Option<ConditionTree>,
}

impl Tracking {
    /// Record that a column was set or deleted. Never unmarks.
    pub fn mark(&mut self, column: &str) {
        self.marked.insert(column.to_owned());
    }

    /// Model names of every column touched since creation.
    #[must_use]
    pub fn marked(&self) -> &BTreeSet<String> {
        &self.marked
    }

    /// Whether `column` has been touched.
    #[must_use]
    pub fn is_marked(&self, column: &str) -> bool {
        self.marked.contains(column)
    }

    /// Snapshot from the last sync event, if there was one.
    #[must_use]
    pub fn last_snapshot(&self) -> Option<&ConditionTree> {
        self.snapshot.as_ref()
    }
}

/// The condition an atomic write should assert for `obj`.
///
/// Before any sync event this expects every declared column to be absent.
#[must_use]
pub fn snapshot(obj: &ModelObject) -> ConditionTree {
    match obj.tracking().last_snapshot() {
        Some(tree) => tree.clone(),
        None => all_absent(obj.schema()),
    }
}

/// The object was just loaded; its marked columns reflect the table.
pub fn on_loaded(obj: &mut ModelObject) -> MapperResult<()> {
    let tree = synced_state(obj)?;
    record(obj, "loaded", tree);
    Ok(())
}

/// The object was just written; its marked columns reflect the table.
pub fn on_saved(obj: &mut ModelObject) -> MapperResult<()> {
    let tree = synced_state(obj)?;
    record(obj, "saved", tree);
    Ok(())
}

/// The object was just deleted. In-memory values are left alone.
pub fn on_deleted(obj: &mut ModelObject) {
    let tree = all_absent(obj.schema());
    record(obj, "deleted", tree);
}

fn record(obj: &mut ModelObject, event: &str, tree: ConditionTree) {
    debug!(
        model = obj.schema().name(),
        event,
        clauses = tree.len(),
        "rebuilt tracking snapshot"
    );
    obj.tracking_mut().snapshot = Some(tree);
}

fn sorted_columns(schema: &ModelSchema) -> Vec<&Arc<Column>> {
    let mut columns: Vec<&Arc<Column>> = schema.columns().iter().collect();
    columns.sort_by(|a, b| a.name().cmp(b.name()));
    columns
}

fn all_absent(schema: &ModelSchema) -> ConditionTree {
    let mut arena = ConditionArena::new();
    let mut root = arena.empty();
    for column in sorted_columns(schema) {
        let clause = arena.push(ColumnRef::from(column).is_(None));
        arena.and_assign(&mut root, clause);
    }
    ConditionTree::new(arena, root)
}

/// Equality against the dumped value for every marked column, absence for
/// marked columns that hold no value.
fn synced_state(obj: &ModelObject) -> MapperResult<ConditionTree> {
    let mut arena = ConditionArena::new();
    let mut root = arena.empty();
    for column in sorted_columns(obj.schema()) {
        if !obj.tracking().is_marked(column.name()) {
            continue;
        }
        let reference = ColumnRef::from(column);
        let node = match obj.state(column.name()) {
            Some(Some(value)) => {
                let wire = encode(value, column.typedef())?;
                reference.eq(Operand::Wire(wire))
            }
            _ => reference.is_(None),
        };
        let clause = arena.push(node);
        arena.and_assign(&mut root, clause);
    }
    Ok(ConditionTree::new(arena, root))
}
