//! Instances of a model.
//!
//! A [`ModelObject`] distinguishes three attribute states: unset (never
//! assigned or deleted), explicitly no-value, and a value. Only the last is
//! written to the wire. Every assignment or deletion marks the column on the
//! object's [`Tracking`] record.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rustack_mapper_model::Item;

use crate::error::{MapperError, MapperResult};
use crate::marshal::{Value, decode, encode};
use crate::schema::{Column, ModelSchema};
use crate::tracking::Tracking;

/// One item of a model, with its change-tracking state.
#[derive(Debug, Clone)]
pub struct ModelObject {
    schema: Arc<ModelSchema>,
    values: BTreeMap<String, Option<Value>>,
    tracking: Tracking,
}

impl ModelObject {
    /// A new object with every attribute unset and nothing marked.
    #[must_use]
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
            tracking: Tracking::default(),
        }
    }

    /// Builder-style [`set`](Self::set) of a value.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> MapperResult<Self> {
        self.set(name, Some(value.into()))?;
        Ok(self)
    }

    /// The model this object belongs to.
    #[must_use]
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// Change-tracking record.
    #[must_use]
    pub fn tracking(&self) -> &Tracking {
        &self.tracking
    }

    pub(crate) fn tracking_mut(&mut self) -> &mut Tracking {
        &mut self.tracking
    }

    fn declared(&self, name: &str) -> MapperResult<&Arc<Column>> {
        self.schema.find(name).ok_or_else(|| MapperError::UnknownColumn {
            model: self.schema.name().to_owned(),
            column: name.to_owned(),
        })
    }

    fn missing(&self, name: &str) -> MapperError {
        MapperError::MissingAttribute {
            model: self.schema.name().to_owned(),
            column: name.to_owned(),
        }
    }

    /// Assign a value, or `None` for an explicit no-value.
    pub fn set(&mut self, name: &str, value: Option<Value>) -> MapperResult<()> {
        let column = Arc::clone(self.declared(name)?);
        self.tracking.mark(column.name());
        self.values.insert(column.name().to_owned(), value);
        Ok(())
    }

    /// Unset an attribute.
    ///
    /// The column is marked even when it was not set and the call fails.
    pub fn delete(&mut self, name: &str) -> MapperResult<()> {
        let column = Arc::clone(self.declared(name)?);
        self.tracking.mark(column.name());
        match self.values.remove(column.name()) {
            Some(_) => Ok(()),
            None => Err(self.missing(name)),
        }
    }

    /// Read an attribute. Fails with [`MapperError::MissingAttribute`] when unset.
    pub fn get(&self, name: &str) -> MapperResult<Option<&Value>> {
        self.declared(name)?;
        match self.values.get(name) {
            Some(value) => Ok(value.as_ref()),
            None => Err(self.missing(name)),
        }
    }

    /// Whether the attribute is set, including an explicit no-value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Current state of a column: `None` when unset, `Some(None)` when it
    /// holds no value.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<Option<&Value>> {
        self.values.get(name).map(Option::as_ref)
    }

    /// Dump every attribute that holds a value.
    pub fn to_item(&self) -> MapperResult<Item> {
        let mut item = Item::new();
        for column in self.schema.columns() {
            if let Some(Some(value)) = self.values.get(column.name()) {
                item.insert(column.wire_name().to_owned(), encode(value, column.typedef())?);
            }
        }
        Ok(item)
    }

    /// Dump the table key attributes. Every key column must hold a value.
    pub fn key(&self) -> MapperResult<Item> {
        let mut item = Item::new();
        for column in self.schema.key_columns(None) {
            let Some(Some(value)) = self.values.get(column.name()) else {
                return Err(self.missing(column.name()));
            };
            item.insert(column.wire_name().to_owned(), encode(value, column.typedef())?);
        }
        Ok(item)
    }

    /// Load `item`, populating only the `projected` columns.
    ///
    /// A projected column missing from the item becomes an explicit no-value;
    /// columns outside the projection stay unset.
    pub fn from_item(
        schema: Arc<ModelSchema>,
        item: &Item,
        projected: &[Arc<Column>],
    ) -> MapperResult<Self> {
        let mut obj = Self::new(schema);
        for column in projected {
            let value = decode(item.get(column.wire_name()), column.typedef())?;
            obj.set(column.name(), value)?;
        }
        Ok(obj)
    }
}

impl fmt::Display for ModelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.schema.name())?;
        for (i, column) in self.schema.columns().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match self.values.get(column.name()) {
                Some(Some(value)) => write!(f, "{}={value}", column.name())?,
                _ => write!(f, "{}=None", column.name())?,
            }
        }
        f.write_str(")")
    }
}
