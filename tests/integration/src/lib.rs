//! Integration tests for the Rustack object mapper.
//!
//! The mapper core never talks to a network itself, so these tests drive it
//! against [`MemoryTable`], an in-memory transport that pages through stored
//! items the way the service does. Conditions are not evaluated by the
//! table; tests assert on the compiled requests it records instead.
//!
//! Run them with:
//! ```text
//! RUST_LOG=rustack_mapper_core=debug cargo test -p rustack-mapper-integration
//! ```

use std::cell::RefCell;
use std::sync::{Arc, Once};

use rustack_mapper_core::{Column, Index, ModelObject, ModelSchema, Projection, TypeDef};
use rustack_mapper_core::search::SearchTransport;
use rustack_mapper_model::{
    DeleteItemRequest, Item, PutItemRequest, SearchMode, SearchRequest, SearchResponse, Select,
};

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Generate a unique table name for a test.
#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// The `User` model used throughout the tests.
///
/// Keyed by `id` + `created`, with a keys-only global index on `email` and a
/// local index on `age` that also projects `name`.
#[must_use]
pub fn user_schema(table: &str) -> Arc<ModelSchema> {
    ModelSchema::builder("User", table)
        .column(Column::new("id", TypeDef::String).hash_key())
        .column(Column::new("created", TypeDef::Integer).range_key())
        .column(Column::new("age", TypeDef::Integer))
        .column(Column::new("name", TypeDef::String))
        .column(Column::new("email", TypeDef::String).dynamo_name("e"))
        .column(
            Column::new(
                "tags",
                TypeDef::set(TypeDef::String).unwrap_or_else(|e| panic!("bad set type: {e}")),
            ),
        )
        .index(Index::global("by_email", "email", None, Projection::KeysOnly))
        .index(Index::local(
            "by_age",
            "age",
            Projection::Include(vec!["name".to_owned()]),
        ))
        .build()
        .unwrap_or_else(|e| panic!("invalid User schema: {e}"))
}

/// A `User` with the key, an age and a name set.
#[must_use]
pub fn user(schema: &Arc<ModelSchema>, id: &str, created: i64, age: i64, name: &str) -> ModelObject {
    ModelObject::new(Arc::clone(schema))
        .with("id", id)
        .and_then(|o| o.with("created", created))
        .and_then(|o| o.with("age", age))
        .and_then(|o| o.with("name", name))
        .unwrap_or_else(|e| panic!("failed to build user {id}: {e}"))
}

/// In-memory table paging through its items in insertion order.
///
/// Continuation tokens are the key attributes of the last item in a page,
/// like the service returns them.
#[derive(Debug)]
pub struct MemoryTable {
    key: Vec<String>,
    page_size: usize,
    items: RefCell<Vec<Item>>,
    requests: RefCell<Vec<(SearchMode, SearchRequest)>>,
}

impl MemoryTable {
    /// An empty table keyed by the wire names of `schema`'s key columns.
    #[must_use]
    pub fn new(schema: &ModelSchema, page_size: usize) -> Self {
        assert!(page_size > 0, "page size must be positive");
        Self {
            key: schema
                .key_columns(None)
                .iter()
                .map(|c| c.wire_name().to_owned())
                .collect(),
            page_size,
            items: RefCell::new(Vec::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn key_of(&self, item: &Item) -> Item {
        item.iter()
            .filter(|(name, _)| self.key.contains(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn position(&self, key: &Item) -> Option<usize> {
        self.items.borrow().iter().position(|item| self.key_of(item) == *key)
    }

    /// Store `request.item`, replacing an item with the same key.
    pub fn put(&self, request: &PutItemRequest) {
        let key = self.key_of(&request.item);
        match self.position(&key) {
            Some(pos) => self.items.borrow_mut()[pos] = request.item.clone(),
            None => self.items.borrow_mut().push(request.item.clone()),
        }
    }

    /// Remove the item keyed by `request.key`, if stored.
    pub fn delete(&self, request: &DeleteItemRequest) {
        if let Some(pos) = self.position(&request.key) {
            self.items.borrow_mut().remove(pos);
        }
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<(SearchMode, SearchRequest)> {
        self.requests.borrow().clone()
    }

    /// Number of search calls received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    fn project(request: &SearchRequest, item: &Item) -> Item {
        let Some(expression) = &request.projection_expression else {
            return item.clone();
        };
        let wanted: Vec<&str> = expression
            .split(", ")
            .filter_map(|placeholder| {
                request
                    .expression_attribute_names
                    .get(placeholder)
                    .map(String::as_str)
            })
            .collect();
        item.iter()
            .filter(|(name, _)| wanted.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl SearchTransport for MemoryTable {
    fn search_items(
        &self,
        mode: SearchMode,
        request: &SearchRequest,
    ) -> anyhow::Result<SearchResponse> {
        self.requests.borrow_mut().push((mode, request.clone()));

        let start = match &request.exclusive_start_key {
            Some(token) => {
                self.position(token)
                    .ok_or_else(|| anyhow::anyhow!("ExclusiveStartKey does not match any item"))?
                    + 1
            }
            None => 0,
        };
        let page_size = request
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .map_or(self.page_size, |l| l.min(self.page_size));

        let items = self.items.borrow();
        let end = (start + page_size).min(items.len());
        let page = &items[start.min(end)..end];
        let last_evaluated_key = match page.last() {
            Some(last) if end < items.len() => self.key_of(last),
            _ => Item::new(),
        };

        Ok(SearchResponse {
            items: if request.select == Some(Select::Count) {
                Vec::new()
            } else {
                page.iter().map(|item| Self::project(request, item)).collect()
            },
            count: page.len(),
            scanned_count: page.len(),
            last_evaluated_key,
        })
    }
}

mod test_search;
mod test_tracking;
mod test_write;
