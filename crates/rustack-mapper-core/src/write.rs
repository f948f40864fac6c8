//! Conditional write compilation.
//!
//! The model-binding layer sends these requests through its own client and,
//! once the write succeeds, reports it with [`tracking::on_saved`] or
//! [`tracking::on_deleted`].

use std::collections::HashMap;

use rustack_mapper_model::{AttributeValue, DeleteItemRequest, PutItemRequest};

use crate::condition::{ConditionTree, RenderMode, Renderer};
use crate::error::MapperResult;
use crate::object::ModelObject;
use crate::tracking;

/// Compile a `PutItem` of every attribute `obj` holds a value for.
pub fn prepare_put(
    obj: &ModelObject,
    condition: Option<ConditionTree>,
    atomic: bool,
) -> MapperResult<PutItemRequest> {
    let (condition_expression, names, values) = precondition(obj, condition, atomic)?;
    Ok(PutItemRequest {
        table_name: obj.schema().table_name().to_owned(),
        item: obj.to_item()?,
        condition_expression,
        expression_attribute_names: names,
        expression_attribute_values: values,
    })
}

/// Compile a `DeleteItem` of the item keyed by `obj`.
pub fn prepare_delete(
    obj: &ModelObject,
    condition: Option<ConditionTree>,
    atomic: bool,
) -> MapperResult<DeleteItemRequest> {
    let (condition_expression, names, values) = precondition(obj, condition, atomic)?;
    Ok(DeleteItemRequest {
        table_name: obj.schema().table_name().to_owned(),
        key: obj.key()?,
        condition_expression,
        expression_attribute_names: names,
        expression_attribute_values: values,
    })
}

type Precondition = (
    Option<String>,
    HashMap<String, String>,
    HashMap<String, AttributeValue>,
);

fn precondition(
    obj: &ModelObject,
    condition: Option<ConditionTree>,
    atomic: bool,
) -> MapperResult<Precondition> {
    let mut combined = condition.unwrap_or_default();
    if atomic {
        combined.and_assign(tracking::snapshot(obj));
    }
    if combined.is_empty() {
        return Ok((None, HashMap::new(), HashMap::new()));
    }
    let mut renderer = Renderer::new();
    renderer.render(&combined, RenderMode::Condition)?;
    let rendered = renderer.finish();
    Ok((
        rendered.condition_expression,
        rendered.expression_attribute_names,
        rendered.expression_attribute_values,
    ))
}
