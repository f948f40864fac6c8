//! DynamoDB object mapper core for Rustack.
//!
//! Conditions are built from [`schema::ColumnRef`] comparisons and combined
//! with the [`condition::ConditionTree`] algebra. Searches are compiled once
//! by [`search::SearchBuilder`] and iterated page by page through a
//! caller-supplied [`search::SearchTransport`]. Conditional writes assert the
//! state recorded by [`tracking`].
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod condition;
pub mod config;
pub mod error;
pub mod marshal;
pub mod object;
pub mod schema;
pub mod search;
pub mod tracking;
pub mod write;

pub use condition::{ConditionNode, ConditionTree};
pub use config::MapperConfig;
pub use error::{Cardinality, MapperError, MapperResult};
pub use marshal::{MarshalError, TypeDef, Value};
pub use object::ModelObject;
pub use schema::{Column, ColumnRef, Index, ModelSchema, Projection};
pub use search::{PreparedSearch, SearchBuilder, SearchIterator, SearchTransport, Selection};
