//! Compiled request shapes handed to the transport.
//!
//! Field names follow the DynamoDB JSON protocol. Optional fields are omitted
//! when `None` and the expression maps are omitted when empty, so a request
//! serializes to exactly the keys that apply to it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Item;
use crate::attribute_value::AttributeValue;
use crate::types::Select;

/// A compiled `Query` or `Scan` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchRequest {
    /// The table to search. Always present.
    pub table_name: String,

    /// Secondary index to search, when the search is index-backed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// Key condition; queries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,

    /// Post-key filter applied by the service before returning a page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Attribute list for a `SPECIFIC_ATTRIBUTES` selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Which attributes come back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Select>,

    /// Strongly consistent read. Never set for global secondary indexes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Sort direction; queries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,

    /// Per-page evaluation limit. Omitted when unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Name placeholders (`#n0`) to attribute names.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Value placeholders (`:v1`) to marshalled values.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// Continuation token from the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<Item>,
}

/// A compiled `PutItem` request with an optional precondition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemRequest {
    /// The table to write into.
    pub table_name: String,

    /// The full item to store.
    pub item: Item,

    /// Precondition that must hold for the write to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Name placeholders referenced by the condition.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Value placeholders referenced by the condition.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,
}

/// A compiled `DeleteItem` request with an optional precondition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemRequest {
    /// The table to delete from.
    pub table_name: String,

    /// Primary key of the item to delete.
    pub key: Item,

    /// Precondition that must hold for the delete to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Name placeholders referenced by the condition.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Value placeholders referenced by the condition.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,
}
