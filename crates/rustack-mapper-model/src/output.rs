//! Raw page returned by the transport for one `Query` or `Scan` call.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Item;

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResponse {
    /// Items in this page. Absent when `Select=COUNT`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,

    /// Number of items in this page after filtering.
    #[serde(default)]
    pub count: usize,

    /// Number of items evaluated before the filter was applied.
    #[serde(default)]
    pub scanned_count: usize,

    /// Key where this page stopped. Empty when there are no further pages.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub last_evaluated_key: Item,
}

impl SearchResponse {
    /// The continuation token to echo back as `ExclusiveStartKey`, if any.
    #[must_use]
    pub fn continuation_token(&self) -> Option<&Item> {
        if self.last_evaluated_key.is_empty() {
            None
        } else {
            Some(&self.last_evaluated_key)
        }
    }
}
