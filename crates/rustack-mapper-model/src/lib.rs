//! DynamoDB wire types for the Rustack object mapper.
//!
//! Only the request/response fragments the mapper compiles or consumes live
//! here: the tagged `AttributeValue`, the compiled search request, one page
//! of search results, and the conditional write requests. Everything uses the
//! DynamoDB JSON field naming so a transport can forward these structs as-is.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod input;
pub mod output;
pub mod types;

use std::collections::HashMap;

pub use attribute_value::AttributeValue;
pub use input::{DeleteItemRequest, PutItemRequest, SearchRequest};
pub use output::SearchResponse;
pub use types::{SearchMode, Select};

/// A single item as it travels over the wire: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;
