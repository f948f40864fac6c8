//! Model schema: columns, nested column references and secondary indexes.
//!
//! The model-binding layer registers one [`ModelSchema`] per model. Columns are
//! shared through `Arc` so that conditions, cursors and objects can all point at
//! the same descriptor without copying it.

use std::fmt;
use std::sync::Arc;

use crate::condition::{ComparisonOp, ConditionNode, LeafOp, Operand};
use crate::error::{MapperError, MapperResult};
use crate::marshal::{MarshalError, TypeDef, Value};

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// A declared model attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    model: String,
    model_name: String,
    dynamo_name: String,
    typedef: TypeDef,
    hash_key: bool,
    range_key: bool,
}

impl Column {
    /// Declare a column whose wire name equals its model name.
    pub fn new(name: impl Into<String>, typedef: TypeDef) -> Self {
        let name = name.into();
        Self {
            model: String::new(),
            dynamo_name: name.clone(),
            model_name: name,
            typedef,
            hash_key: false,
            range_key: false,
        }
    }

    /// Store the column under a different wire name.
    #[must_use]
    pub fn dynamo_name(mut self, name: impl Into<String>) -> Self {
        self.dynamo_name = name.into();
        self
    }

    /// Mark the column as the table's partition key.
    #[must_use]
    pub fn hash_key(mut self) -> Self {
        self.hash_key = true;
        self
    }

    /// Mark the column as the table's sort key.
    #[must_use]
    pub fn range_key(mut self) -> Self {
        self.range_key = true;
        self
    }

    /// Name of the model that owns this column.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Model-facing attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.model_name
    }

    /// Attribute name on the wire.
    #[must_use]
    pub fn wire_name(&self) -> &str {
        &self.dynamo_name
    }

    /// Declared storage type.
    #[must_use]
    pub fn typedef(&self) -> &TypeDef {
        &self.typedef
    }

    /// Whether this is the table's partition key.
    #[must_use]
    pub fn is_hash_key(&self) -> bool {
        self.hash_key
    }

    /// Whether this is the table's sort key.
    #[must_use]
    pub fn is_range_key(&self) -> bool {
        self.range_key
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.model, self.model_name)
    }
}

/// One step of nested attribute access.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// List element.
    Index(usize),
    /// Map entry.
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "[{i}]"),
            Self::Key(k) => write!(f, ".{k}"),
        }
    }
}

/// A column, optionally narrowed to a nested element.
///
/// Comparison methods build leaf conditions; push them into a
/// [`ConditionArena`](crate::condition::ConditionArena) or convert them into a
/// [`ConditionTree`](crate::condition::ConditionTree) to combine them.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    column: Arc<Column>,
    path: Vec<PathSegment>,
}

impl ColumnRef {
    /// Reference the whole column.
    #[must_use]
    pub fn new(column: Arc<Column>) -> Self {
        Self {
            column,
            path: Vec::new(),
        }
    }

    /// The referenced column.
    #[must_use]
    pub fn column(&self) -> &Arc<Column> {
        &self.column
    }

    /// Nested segments below the column.
    #[must_use]
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Narrow to a list element.
    #[must_use]
    pub fn index(&self, i: usize) -> Self {
        let mut next = self.clone();
        next.path.push(PathSegment::Index(i));
        next
    }

    /// Narrow to a map entry.
    #[must_use]
    pub fn key(&self, k: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.path.push(PathSegment::Key(k.into()));
        next
    }

    /// Storage type at the end of the path.
    pub fn typedef(&self) -> Result<&TypeDef, MarshalError> {
        self.column.typedef().at_path(&self.path)
    }

    fn leaf(&self, operation: LeafOp, values: Vec<Operand>) -> ConditionNode {
        ConditionNode::leaf(operation, self.clone(), values)
    }

    fn compare(&self, op: ComparisonOp, value: impl Into<Operand>) -> ConditionNode {
        self.leaf(LeafOp::Comparison(op), vec![value.into()])
    }

    /// `column == value`
    pub fn eq(&self, value: impl Into<Operand>) -> ConditionNode {
        self.compare(ComparisonOp::Eq, value)
    }

    /// `column != value`
    pub fn ne(&self, value: impl Into<Operand>) -> ConditionNode {
        self.compare(ComparisonOp::Ne, value)
    }

    /// `column < value`
    pub fn lt(&self, value: impl Into<Operand>) -> ConditionNode {
        self.compare(ComparisonOp::Lt, value)
    }

    /// `column <= value`
    pub fn le(&self, value: impl Into<Operand>) -> ConditionNode {
        self.compare(ComparisonOp::Le, value)
    }

    /// `column > value`
    pub fn gt(&self, value: impl Into<Operand>) -> ConditionNode {
        self.compare(ComparisonOp::Gt, value)
    }

    /// `column >= value`
    pub fn ge(&self, value: impl Into<Operand>) -> ConditionNode {
        self.compare(ComparisonOp::Ge, value)
    }

    /// Equality that also accepts "no value", which tests for absence.
    pub fn is_(&self, value: Option<Value>) -> ConditionNode {
        self.eq(value.map_or(Operand::Absent, Operand::Value))
    }

    /// Inequality that also accepts "no value", which tests for presence.
    pub fn is_not(&self, value: Option<Value>) -> ConditionNode {
        self.ne(value.map_or(Operand::Absent, Operand::Value))
    }

    /// `begins_with(column, value)`
    pub fn begins_with(&self, value: impl Into<Operand>) -> ConditionNode {
        self.leaf(LeafOp::BeginsWith, vec![value.into()])
    }

    /// `contains(column, value)`
    pub fn contains(&self, value: impl Into<Operand>) -> ConditionNode {
        self.leaf(LeafOp::Contains, vec![value.into()])
    }

    /// `column BETWEEN lower AND upper`
    pub fn between(&self, lower: impl Into<Operand>, upper: impl Into<Operand>) -> ConditionNode {
        self.leaf(LeafOp::Between, vec![lower.into(), upper.into()])
    }

    /// `column IN (values...)`
    pub fn in_<V: Into<Operand>>(&self, values: impl IntoIterator<Item = V>) -> ConditionNode {
        self.leaf(LeafOp::In, values.into_iter().map(Into::into).collect())
    }
}

impl From<Arc<Column>> for ColumnRef {
    fn from(column: Arc<Column>) -> Self {
        Self::new(column)
    }
}

impl From<&Arc<Column>> for ColumnRef {
    fn from(column: &Arc<Column>) -> Self {
        Self::new(Arc::clone(column))
    }
}

/// Same model, same wire name, same path.
impl PartialEq for ColumnRef {
    fn eq(&self, other: &Self) -> bool {
        self.column.model == other.column.model
            && self.column.dynamo_name == other.column.dynamo_name
            && self.path == other.path
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column)?;
        for segment in &self.path {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Indexes
// ---------------------------------------------------------------------------

/// Global or local secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Own partition key; eventually consistent only.
    Global,
    /// Shares the table's partition key.
    Local,
}

/// Attributes an index stores in addition to the keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Every attribute.
    All,
    /// Table and index keys only.
    KeysOnly,
    /// Keys plus the listed model attribute names.
    Include(Vec<String>),
}

/// A secondary index declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    name: String,
    kind: IndexKind,
    hash_key: Option<String>,
    range_key: Option<String>,
    projection: Projection,
}

impl Index {
    /// A global secondary index with its own partition key.
    pub fn global(
        name: impl Into<String>,
        hash_key: impl Into<String>,
        range_key: Option<&str>,
        projection: Projection,
    ) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Global,
            hash_key: Some(hash_key.into()),
            range_key: range_key.map(str::to_owned),
            projection,
        }
    }

    /// A local secondary index. The partition key is the model's.
    pub fn local(name: impl Into<String>, range_key: impl Into<String>, projection: Projection) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Local,
            hash_key: None,
            range_key: Some(range_key.into()),
            projection,
        }
    }

    /// Index name on the wire.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Global or local.
    #[must_use]
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Whether this is a global secondary index.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.kind == IndexKind::Global
    }

    /// Declared projection.
    #[must_use]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Model name of the index partition key.
    #[must_use]
    pub fn hash_key(&self) -> Option<&str> {
        self.hash_key.as_deref()
    }

    /// Model name of the index sort key.
    #[must_use]
    pub fn range_key(&self) -> Option<&str> {
        self.range_key.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Model schema
// ---------------------------------------------------------------------------

/// All columns and indexes of one model.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    name: String,
    table_name: String,
    columns: Vec<Arc<Column>>,
    hash_position: usize,
    indexes: Vec<Index>,
}

impl ModelSchema {
    /// Start declaring a model stored in `table_name`.
    pub fn builder(name: impl Into<String>, table_name: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            name: name.into(),
            table_name: table_name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Declared columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    /// Declared secondary indexes.
    #[must_use]
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Look a column up by model name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Arc<Column>> {
        self.columns.iter().find(|c| c.model_name == name)
    }

    /// Reference a column by model name.
    pub fn column(&self, name: &str) -> MapperResult<ColumnRef> {
        self.find(name)
            .map(ColumnRef::from)
            .ok_or_else(|| MapperError::UnknownColumn {
                model: self.name.clone(),
                column: name.to_owned(),
            })
    }

    /// Look an index up by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// The table's partition key column.
    #[must_use]
    pub fn hash_key(&self) -> &Arc<Column> {
        &self.columns[self.hash_position]
    }

    /// The table's sort key column, if any.
    #[must_use]
    pub fn range_key(&self) -> Option<&Arc<Column>> {
        self.columns.iter().find(|c| c.range_key)
    }

    /// Table key columns followed by the index key columns, without repeats.
    #[must_use]
    pub fn key_columns(&self, index: Option<&Index>) -> Vec<Arc<Column>> {
        let mut names: Vec<&str> = vec![self.hash_key().name()];
        names.extend(self.range_key().map(|c| c.name()));
        if let Some(index) = index {
            names.extend(index.hash_key());
            names.extend(index.range_key());
        }
        self.ordered(&names)
    }

    /// Columns available when reading through `index`, or every column for
    /// the table itself.
    #[must_use]
    pub fn projected_columns(&self, index: Option<&Index>) -> Vec<Arc<Column>> {
        let Some(index) = index else {
            return self.columns.clone();
        };
        match &index.projection {
            Projection::All => self.columns.clone(),
            Projection::KeysOnly => self.key_columns(Some(index)),
            Projection::Include(extra) => {
                let keys = self.key_columns(Some(index));
                let mut names: Vec<&str> = keys.iter().map(|c| c.name()).collect();
                names.extend(extra.iter().map(String::as_str));
                self.ordered(&names)
            }
        }
    }

    /// Whether `index` stores every declared column.
    #[must_use]
    pub fn projects_all(&self, index: &Index) -> bool {
        self.projected_columns(Some(index)).len() == self.columns.len()
    }

    fn ordered(&self, names: &[&str]) -> Vec<Arc<Column>> {
        self.columns
            .iter()
            .filter(|c| names.contains(&c.name()))
            .cloned()
            .collect()
    }
}

/// Builder for [`ModelSchema`]; validates key declarations on `build`.
#[derive(Debug)]
pub struct ModelSchemaBuilder {
    name: String,
    table_name: String,
    columns: Vec<Column>,
    indexes: Vec<Index>,
}

impl ModelSchemaBuilder {
    /// Declare a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Declare a secondary index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Validate and freeze the schema.
    pub fn build(self) -> MapperResult<Arc<ModelSchema>> {
        let invalid = MapperError::InvalidSchema;

        let hash_keys = self.columns.iter().filter(|c| c.hash_key).count();
        if hash_keys != 1 {
            return Err(invalid(format!(
                "{} must declare exactly one hash key, found {hash_keys}",
                self.name
            )));
        }
        if self.columns.iter().filter(|c| c.range_key).count() > 1 {
            return Err(invalid(format!("{} declares more than one range key", self.name)));
        }

        let Self {
            name,
            table_name,
            columns,
            mut indexes,
        } = self;

        let columns: Vec<Arc<Column>> = columns
            .into_iter()
            .map(|mut c| {
                c.model.clone_from(&name);
                Arc::new(c)
            })
            .collect();

        let known = |column: &str| columns.iter().any(|c| c.model_name == column);
        let hash_position = columns.iter().position(|c| c.hash_key).unwrap_or_default();
        let model_hash = columns[hash_position].model_name.clone();

        for index in &mut indexes {
            if index.hash_key.is_none() {
                index.hash_key = Some(model_hash.clone());
            }
            let mut referenced: Vec<&str> = index.hash_key.iter().map(String::as_str).collect();
            referenced.extend(index.range_key.as_deref());
            if let Projection::Include(extra) = &index.projection {
                referenced.extend(extra.iter().map(String::as_str));
            }
            if let Some(missing) = referenced.into_iter().find(|n| !known(n)) {
                return Err(MapperError::UnknownColumn {
                    model: name.clone(),
                    column: missing.to_owned(),
                });
            }
        }

        Ok(Arc::new(ModelSchema {
            name,
            table_name,
            columns,
            hash_position,
            indexes,
        }))
    }
}
