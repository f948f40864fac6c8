//! Query and scan builder.
//!
//! Every setter validates immediately, so misuse surfaces where it happens
//! rather than when the first page is requested. [`SearchBuilder::build`]
//! compiles the request once; the resulting [`PreparedSearch`] can open any
//! number of independent cursors.

use std::sync::Arc;

use rustack_mapper_model::{SearchMode, SearchRequest, Select};

use super::cursor::SearchIterator;
use super::transport::SearchTransport;
use crate::condition::{
    ComparisonOp, ConditionArena, ConditionId, ConditionNode, ConditionTree, Leaf, LeafOp,
    Operand, RenderMode, Renderer,
};
use crate::config::MapperConfig;
use crate::error::{MapperError, MapperResult};
use crate::schema::{Column, ColumnRef, Index, ModelSchema};

/// Which attributes a search returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Every attribute of the item.
    All,
    /// Every attribute the queried index projects.
    Projected,
    /// Only the number of matches.
    Count,
    /// The listed columns.
    Specific(Vec<ColumnRef>),
}

/// Validated search configuration.
#[derive(Debug, Clone)]
pub struct SearchBuilder {
    mode: SearchMode,
    schema: Arc<ModelSchema>,
    index: Option<Index>,
    strict: bool,
    key: ConditionTree,
    filter: ConditionTree,
    selection: Selection,
    default_consistent: bool,
    consistent: Option<bool>,
    forward: bool,
    limit: u32,
    prefetch: usize,
}

impl SearchBuilder {
    /// A query against the table.
    #[must_use]
    pub fn query(schema: Arc<ModelSchema>, config: &MapperConfig) -> Self {
        Self::new(SearchMode::Query, schema, config)
    }

    /// A scan of the table.
    #[must_use]
    pub fn scan(schema: Arc<ModelSchema>, config: &MapperConfig) -> Self {
        Self::new(SearchMode::Scan, schema, config)
    }

    /// A search of the table in `mode`, with defaults from `config`.
    #[must_use]
    pub fn new(mode: SearchMode, schema: Arc<ModelSchema>, config: &MapperConfig) -> Self {
        Self {
            mode,
            schema,
            index: None,
            strict: config.strict,
            key: ConditionTree::empty(),
            filter: ConditionTree::empty(),
            selection: Selection::All,
            default_consistent: config.consistent,
            consistent: None,
            forward: true,
            limit: 0,
            prefetch: config.prefetch,
        }
    }

    /// Search a secondary index instead of the table.
    ///
    /// A configured default of consistent reads is dropped for global
    /// indexes; an explicit [`consistent`](Self::consistent) request is an
    /// error, whichever call came first.
    pub fn index(mut self, name: &str) -> MapperResult<Self> {
        let index = self.schema.index(name).cloned().ok_or_else(|| {
            MapperError::invalid_search(format!(
                "{} has no index named {name}",
                self.schema.name()
            ))
        })?;
        if index.is_global() && self.consistent == Some(true) {
            return Err(MapperError::invalid_search(
                "Can't use ConsistentRead with a GlobalSecondaryIndex",
            ));
        }
        self.index = Some(index);
        Ok(self)
    }

    /// Restrict a query by key.
    pub fn key(mut self, condition: impl Into<ConditionTree>) -> MapperResult<Self> {
        let condition = condition.into();
        if self.mode == SearchMode::Scan && !condition.is_empty() {
            return Err(MapperError::invalid_search("Scan cannot have a key condition"));
        }
        self.validate_key(&condition)?;
        self.key = condition;
        Ok(self)
    }

    /// Filter results after the key condition is applied.
    #[must_use]
    pub fn filter(mut self, condition: impl Into<ConditionTree>) -> Self {
        self.filter = condition.into();
        self
    }

    /// Choose the returned attributes.
    pub fn select(mut self, selection: Selection) -> MapperResult<Self> {
        self.projection_for(&selection)?;
        self.selection = selection;
        Ok(self)
    }

    /// Request strongly consistent reads.
    pub fn consistent(mut self, consistent: bool) -> MapperResult<Self> {
        if consistent && self.index.as_ref().is_some_and(Index::is_global) {
            return Err(MapperError::invalid_search(
                "Can't use ConsistentRead with a GlobalSecondaryIndex",
            ));
        }
        self.consistent = Some(consistent);
        Ok(self)
    }

    /// Sort direction of a query.
    pub fn forward(mut self, forward: bool) -> MapperResult<Self> {
        if self.mode == SearchMode::Scan {
            return Err(MapperError::invalid_search(
                "Can't set ScanIndexForward for scan operations, only queries",
            ));
        }
        self.forward = forward;
        Ok(self)
    }

    /// Stop after `limit` items; `0` is unbounded.
    pub fn limit(mut self, limit: i64) -> MapperResult<Self> {
        if limit < 0 {
            return Err(MapperError::invalid_search("Limit must be a non-negative int"));
        }
        self.limit = u32::try_from(limit).map_err(|_| {
            MapperError::invalid_search(format!("Limit must not exceed {}", u32::MAX))
        })?;
        Ok(self)
    }

    /// Follow up to `prefetch` extra pages whenever the buffer is refilled.
    pub fn prefetch(mut self, prefetch: i64) -> MapperResult<Self> {
        self.prefetch = usize::try_from(prefetch)
            .map_err(|_| MapperError::invalid_search("Prefetch must be a non-negative int"))?;
        Ok(self)
    }

    // -- validation --------------------------------------------------------

    fn key_columns(&self) -> (Option<&str>, Option<&str>) {
        match &self.index {
            Some(index) => (index.hash_key(), index.range_key()),
            None => (
                Some(self.schema.hash_key().name()),
                self.schema.range_key().map(|c| c.name()),
            ),
        }
    }

    fn is_key_leaf(&self, leaf: &Leaf, key: Option<&str>) -> bool {
        let column = leaf.column.column();
        key.is_some_and(|k| column.name() == k)
            && column.model() == self.schema.name()
            && leaf.column.path().is_empty()
            && leaf
                .values
                .iter()
                .all(|v| matches!(v, Operand::Value(_) | Operand::Wire(_)))
    }

    fn is_hash_condition(&self, leaf: &Leaf) -> bool {
        let (hash, _) = self.key_columns();
        leaf.operation == LeafOp::Comparison(ComparisonOp::Eq) && self.is_key_leaf(leaf, hash)
    }

    fn is_range_condition(&self, leaf: &Leaf) -> bool {
        let (_, range) = self.key_columns();
        let allowed = matches!(
            leaf.operation,
            LeafOp::Comparison(
                ComparisonOp::Eq
                    | ComparisonOp::Lt
                    | ComparisonOp::Le
                    | ComparisonOp::Gt
                    | ComparisonOp::Ge
            ) | LeafOp::Between
                | LeafOp::BeginsWith
        );
        allowed && self.is_key_leaf(leaf, range)
    }

    /// Hash equality, optionally AND one range condition.
    fn validate_key(&self, condition: &ConditionTree) -> MapperResult<()> {
        if condition.is_empty() {
            return Ok(());
        }
        let arena = condition.arena();
        let leaves = key_leaves(arena, condition.root());
        let valid = match leaves.as_deref() {
            Some([only]) => self.is_hash_condition(only),
            Some([a, b]) => {
                (self.is_hash_condition(a) && self.is_range_condition(b))
                    || (self.is_hash_condition(b) && self.is_range_condition(a))
            }
            _ => false,
        };
        if valid {
            Ok(())
        } else {
            Err(MapperError::invalid_condition(
                "key condition must be hash key equality, optionally AND one range key condition",
                condition,
            ))
        }
    }

    /// Columns decoded into objects for `selection`.
    fn projection_for(&self, selection: &Selection) -> MapperResult<Loaded> {
        let index = self.index.as_ref();
        match selection {
            Selection::All => {
                if let Some(index) = index.filter(|i| i.is_global()) {
                    if !self.schema.projects_all(index) {
                        return Err(MapperError::invalid_search(format!(
                            "Can't select all attributes from GSI {} which does not project all attributes",
                            index.name()
                        )));
                    }
                }
                Ok(Loaded::columns(self.schema.columns().to_vec()))
            }
            Selection::Projected => match index {
                Some(index) => Ok(Loaded::columns(self.schema.projected_columns(Some(index)))),
                None => Err(MapperError::invalid_search(
                    "Can't select projected attributes without an index",
                )),
            },
            Selection::Count => Ok(Loaded::columns(Vec::new())),
            Selection::Specific(columns) => {
                if columns.is_empty() {
                    return Err(MapperError::invalid_search(
                        "Must specify at least one column to load",
                    ));
                }
                if let Some(foreign) = columns.iter().find(|c| {
                    c.column().model() != self.schema.name() || !c.path().is_empty()
                }) {
                    return Err(MapperError::invalid_search(format!(
                        "{foreign} is not a top-level column of {}",
                        self.schema.name()
                    )));
                }
                let available = self.schema.projected_columns(index);
                let missing = columns
                    .iter()
                    .any(|c| !available.iter().any(|a| a.name() == c.column().name()));
                match index {
                    Some(index) if missing && (index.is_global() || self.strict) => {
                        Err(MapperError::invalid_search(format!(
                            "{} does not project every requested column",
                            index.name()
                        )))
                    }
                    // Local index outside strict mode: read through to the table.
                    Some(_) if missing => Ok(Loaded {
                        columns: self.schema.columns().to_vec(),
                        read_through: true,
                    }),
                    _ => Ok(Loaded::columns(
                        columns.iter().map(|c| Arc::clone(c.column())).collect(),
                    )),
                }
            }
        }
    }

    // -- compile -----------------------------------------------------------

    /// Compile the request.
    pub fn build(&self) -> MapperResult<PreparedSearch> {
        match self.mode {
            SearchMode::Query if self.key.is_empty() => {
                return Err(MapperError::invalid_search(
                    "Query must specify at least a hash key condition",
                ));
            }
            SearchMode::Scan if !self.key.is_empty() => {
                return Err(MapperError::invalid_search("Scan cannot have a key condition"));
            }
            _ => {}
        }

        let loaded = self.projection_for(&self.selection)?;
        let mut renderer = Renderer::new();

        if !self.filter.is_empty() {
            renderer.render(&self.filter, RenderMode::Filter)?;
        }

        let select = match &self.selection {
            Selection::All => Select::AllAttributes,
            Selection::Projected => Select::AllProjectedAttributes,
            Selection::Count => Select::Count,
            Selection::Specific(_) if loaded.read_through => Select::AllAttributes,
            Selection::Specific(_) => {
                renderer.render_projection(&loaded.columns);
                Select::SpecificAttributes
            }
        };

        if !self.key.is_empty() {
            renderer.render(&self.key, RenderMode::Key)?;
        }

        let rendered = renderer.finish();
        let request = SearchRequest {
            table_name: self.schema.table_name().to_owned(),
            index_name: self.index.as_ref().map(|i| i.name().to_owned()),
            key_condition_expression: rendered.key_condition_expression,
            filter_expression: rendered.filter_expression,
            projection_expression: rendered.projection_expression,
            select: Some(select),
            consistent_read: (self.consistent.unwrap_or(self.default_consistent)
                && !self.index.as_ref().is_some_and(Index::is_global))
            .then_some(true),
            scan_index_forward: (self.mode == SearchMode::Query).then_some(self.forward),
            limit: Some(self.limit).filter(|l| *l > 0),
            expression_attribute_names: rendered.expression_attribute_names,
            expression_attribute_values: rendered.expression_attribute_values,
            exclusive_start_key: None,
        };

        Ok(PreparedSearch {
            mode: self.mode,
            schema: Arc::clone(&self.schema),
            request,
            projection: loaded.columns,
            limit: usize::try_from(self.limit).unwrap_or(usize::MAX),
            prefetch: self.prefetch,
        })
    }
}

/// Columns a search decodes, and whether an under-projected local index
/// forces reading every attribute from the table.
struct Loaded {
    columns: Vec<Arc<Column>>,
    read_through: bool,
}

impl Loaded {
    fn columns(columns: Vec<Arc<Column>>) -> Self {
        Self {
            columns,
            read_through: false,
        }
    }
}

/// Leaves of a key condition: the leaf itself, or the non-empty children of
/// an `And` when they are all leaves.
fn key_leaves(arena: &ConditionArena, root: ConditionId) -> Option<Vec<&Leaf>> {
    match arena.node(root) {
        ConditionNode::Leaf(leaf) => Some(vec![leaf]),
        ConditionNode::And(children) => children
            .iter()
            .filter(|c| !arena.is_empty(**c))
            .map(|c| match arena.node(*c) {
                ConditionNode::Leaf(leaf) => Some(leaf),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// A compiled search, ready to be iterated.
#[derive(Debug, Clone)]
pub struct PreparedSearch {
    mode: SearchMode,
    schema: Arc<ModelSchema>,
    request: SearchRequest,
    projection: Vec<Arc<Column>>,
    limit: usize,
    prefetch: usize,
}

/// Totals reported by [`PreparedSearch::count`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCount {
    /// Matches after filtering.
    pub count: usize,
    /// Items evaluated before filtering.
    pub scanned_count: usize,
}

impl PreparedSearch {
    /// Query or scan.
    #[must_use]
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// The model being searched.
    #[must_use]
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// The request template; the cursor fills in `ExclusiveStartKey`.
    #[must_use]
    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    /// Columns populated on decoded objects.
    #[must_use]
    pub fn projection(&self) -> &[Arc<Column>] {
        &self.projection
    }

    /// Maximum number of items to yield; `0` is unbounded.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Extra pages followed per refill.
    #[must_use]
    pub fn prefetch(&self) -> usize {
        self.prefetch
    }

    /// Open a cursor at the first page.
    pub fn iter<'t, T: SearchTransport + ?Sized>(&self, transport: &'t T) -> SearchIterator<'t, T> {
        SearchIterator::new(transport, self.clone())
    }

    /// Run the search to completion and report its totals.
    pub fn count<T: SearchTransport + ?Sized>(&self, transport: &T) -> MapperResult<SearchCount> {
        let mut cursor = self.iter(transport);
        while cursor.step()?.is_some() {}
        Ok(SearchCount {
            count: cursor.matched_count(),
            scanned_count: cursor.scanned_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::marshal::TypeDef;
    use crate::schema::Projection;

    fn user() -> Arc<ModelSchema> {
        ModelSchema::builder("User", "users")
            .column(Column::new("id", TypeDef::String).hash_key())
            .column(Column::new("created", TypeDef::Integer).range_key())
            .column(Column::new("age", TypeDef::Integer))
            .column(Column::new("email", TypeDef::String))
            .column(Column::new("name", TypeDef::String))
            .index(Index::global("by_email", "email", None, Projection::KeysOnly))
            .index(Index::global("by_name", "name", Some("age"), Projection::All))
            .index(Index::local(
                "by_age",
                "age",
                Projection::Include(vec!["name".to_owned()]),
            ))
            .build()
            .unwrap()
    }

    fn col(schema: &ModelSchema, name: &str) -> ColumnRef {
        schema.column(name).unwrap()
    }

    fn config() -> MapperConfig {
        MapperConfig::default()
    }

    #[test]
    fn test_should_compile_scan_request() {
        let schema = user();
        let search = SearchBuilder::scan(Arc::clone(&schema), &config())
            .filter(col(&schema, "age").gt(3))
            .build()
            .unwrap();
        assert_eq!(
            serde_json::to_value(search.request()).unwrap(),
            json!({
                "TableName": "users",
                "FilterExpression": "(#n0 > :v1)",
                "Select": "ALL_ATTRIBUTES",
                "ExpressionAttributeNames": {"#n0": "age"},
                "ExpressionAttributeValues": {":v1": {"N": "3"}}
            })
        );
        assert_eq!(search.projection().len(), 5);
    }

    #[test]
    fn test_should_compile_query_with_shared_counter() {
        let schema = user();
        let search = SearchBuilder::query(Arc::clone(&schema), &config())
            .key(col(&schema, "id").eq("u1"))
            .unwrap()
            .filter(col(&schema, "age").ge(18))
            .select(Selection::Specific(vec![col(&schema, "name")]))
            .unwrap()
            .forward(false)
            .unwrap()
            .limit(10)
            .unwrap()
            .consistent(true)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            serde_json::to_value(search.request()).unwrap(),
            json!({
                "TableName": "users",
                "KeyConditionExpression": "(#n3 = :v4)",
                "FilterExpression": "(#n0 >= :v1)",
                "ProjectionExpression": "#n2",
                "Select": "SPECIFIC_ATTRIBUTES",
                "ConsistentRead": true,
                "ScanIndexForward": false,
                "Limit": 10,
                "ExpressionAttributeNames": {"#n0": "age", "#n2": "name", "#n3": "id"},
                "ExpressionAttributeValues": {":v1": {"N": "18"}, ":v4": {"S": "u1"}}
            })
        );
        assert_eq!(search.limit(), 10);
        assert_eq!(search.projection().len(), 1);
    }

    #[test]
    fn test_should_accept_hash_and_range_key_conditions() {
        let schema = user();
        let id = col(&schema, "id");
        let created = col(&schema, "created");
        let builder = || SearchBuilder::query(Arc::clone(&schema), &config());

        let both = ConditionTree::from(created.between(1, 5)).and(id.eq("u1"));
        assert!(builder().key(both).is_ok());
        let prefix = ConditionTree::from(id.eq("u1")).and(created.begins_with(1));
        assert!(builder().key(prefix).is_ok());

        let mut arena = ConditionArena::new();
        let hash = arena.push(id.eq("u1"));
        let single = arena.push(ConditionNode::And(vec![hash]));
        assert!(builder().key(ConditionTree::new(arena, single)).is_ok());
    }

    #[test]
    fn test_should_reject_invalid_key_conditions() {
        let schema = user();
        let id = col(&schema, "id");
        let created = col(&schema, "created");
        let age = col(&schema, "age");
        let builder = || SearchBuilder::query(Arc::clone(&schema), &config());

        let bad: Vec<ConditionTree> = vec![
            id.ne("u1").into(),
            created.eq(1).into(),
            age.eq(1).into(),
            ConditionTree::from(id.eq("u1")).or(created.eq(1)),
            ConditionTree::from(id.eq("u1")).and(created.contains(1)),
            ConditionTree::from(id.eq("u1")).and(created.eq(1)).and(age.eq(2)),
            ConditionTree::from(id.eq("u1")).and(id.eq("u2")),
            ConditionTree::from(id.eq("u1")).negate(),
            id.is_(None).into(),
        ];
        for condition in bad {
            let err = builder().key(condition).unwrap_err();
            assert!(matches!(err, MapperError::InvalidCondition { .. }), "{err}");
        }
    }

    #[test]
    fn test_should_use_index_keys() {
        let schema = user();
        let search = SearchBuilder::query(Arc::clone(&schema), &config())
            .index("by_name")
            .unwrap()
            .key(ConditionTree::from(col(&schema, "name").eq("n")).and(col(&schema, "age").lt(5)))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(search.request().index_name.as_deref(), Some("by_name"));

        let err = SearchBuilder::query(Arc::clone(&schema), &config())
            .index("by_name")
            .unwrap()
            .key(col(&schema, "id").eq("u1"))
            .unwrap_err();
        assert!(matches!(err, MapperError::InvalidCondition { .. }));
    }

    #[test]
    fn test_should_require_key_for_query_and_forbid_it_for_scan() {
        let schema = user();
        let err = SearchBuilder::query(Arc::clone(&schema), &config()).build().unwrap_err();
        assert!(err.to_string().contains("at least a hash key condition"));

        let err = SearchBuilder::scan(Arc::clone(&schema), &config())
            .key(col(&schema, "id").eq("u1"))
            .unwrap_err();
        assert!(err.to_string().contains("Scan cannot have a key condition"));
    }

    #[test]
    fn test_should_validate_scalar_options() {
        let schema = user();
        let scan = || SearchBuilder::scan(Arc::clone(&schema), &config());
        assert!(scan().forward(true).is_err());
        assert!(scan().limit(-1).unwrap_err().to_string().contains("non-negative"));
        assert!(scan().prefetch(-3).is_err());
        assert!(scan().limit(0).is_ok());

        let err = scan().index("by_email").unwrap().consistent(true).unwrap_err();
        assert!(err.to_string().contains("GlobalSecondaryIndex"));
        assert!(scan().index("by_age").unwrap().consistent(true).is_ok());
        assert!(scan().index("missing").is_err());
    }

    #[test]
    fn test_should_reject_consistent_global_read_in_either_order() {
        let schema = user();
        let scan = || SearchBuilder::scan(Arc::clone(&schema), &config());

        let err = scan().consistent(true).unwrap().index("by_email").unwrap_err();
        assert!(err.to_string().contains("GlobalSecondaryIndex"), "{err}");
        let err = scan().index("by_email").unwrap().consistent(true).unwrap_err();
        assert!(err.to_string().contains("GlobalSecondaryIndex"), "{err}");

        let explicit_off = scan()
            .consistent(false)
            .unwrap()
            .index("by_email")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(explicit_off.request().consistent_read, None);
        let local = scan()
            .consistent(true)
            .unwrap()
            .index("by_age")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(local.request().consistent_read, Some(true));
    }

    #[test]
    fn test_should_reject_limit_beyond_request_range() {
        let schema = user();
        let scan = || SearchBuilder::scan(Arc::clone(&schema), &config());

        let err = scan().limit(i64::from(u32::MAX) + 1).unwrap_err();
        assert!(matches!(err, MapperError::InvalidSearch(_)), "{err}");

        let search = scan().limit(i64::from(u32::MAX)).unwrap().build().unwrap();
        assert_eq!(search.request().limit, Some(u32::MAX));
        assert_eq!(search.limit(), usize::try_from(u32::MAX).unwrap());
    }

    #[test]
    fn test_should_omit_consistent_read_for_global_index_defaults() {
        let schema = user();
        let config = MapperConfig {
            consistent: true,
            ..MapperConfig::default()
        };
        let table = SearchBuilder::scan(Arc::clone(&schema), &config).build().unwrap();
        assert_eq!(table.request().consistent_read, Some(true));

        let global = SearchBuilder::scan(Arc::clone(&schema), &config)
            .index("by_name")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(global.request().consistent_read, None);
        assert_eq!(global.request().scan_index_forward, None);
    }

    #[test]
    fn test_should_validate_selection_against_index() {
        let schema = user();
        let scan = || SearchBuilder::scan(Arc::clone(&schema), &config());

        assert!(scan().select(Selection::Projected).is_err());
        assert!(scan().index("by_email").unwrap().select(Selection::All).is_err());
        assert!(scan().index("by_name").unwrap().select(Selection::All).is_ok());
        assert!(scan().select(Selection::Specific(vec![])).is_err());

        let projected = scan()
            .index("by_email")
            .unwrap()
            .select(Selection::Projected)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            projected.request().select,
            Some(Select::AllProjectedAttributes)
        );
        let names: Vec<_> = projected.projection().iter().map(|c| c.name()).collect();
        assert_eq!(names, ["id", "created", "email"]);

        let err = scan()
            .index("by_email")
            .unwrap()
            .select(Selection::Specific(vec![col(&schema, "age")]))
            .unwrap_err();
        assert!(err.to_string().contains("does not project"));
        assert!(scan()
            .index("by_age")
            .unwrap()
            .select(Selection::Specific(vec![col(&schema, "email")]))
            .is_err());
    }

    #[test]
    fn test_should_read_through_local_index_outside_strict_mode() {
        let schema = user();
        let config = MapperConfig {
            strict: false,
            ..MapperConfig::default()
        };
        let search = SearchBuilder::scan(Arc::clone(&schema), &config)
            .index("by_age")
            .unwrap()
            .select(Selection::Specific(vec![col(&schema, "email")]))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(search.request().select, Some(Select::AllAttributes));
        assert!(search.request().projection_expression.is_none());
        assert_eq!(search.projection().len(), 5);
    }

    #[test]
    fn test_should_count_without_projection() {
        let schema = user();
        let search = SearchBuilder::scan(Arc::clone(&schema), &config())
            .select(Selection::Count)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(search.request().select, Some(Select::Count));
        assert!(search.projection().is_empty());
    }
}
