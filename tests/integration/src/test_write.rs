//! Conditional writes applied to the in-memory table.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rustack_mapper_core::{ConditionTree, MapperError, ModelObject, write};
    use serde_json::json;

    use crate::{MemoryTable, init_tracing, test_table_name, user, user_schema};

    #[test]
    fn test_should_put_and_replace_by_key() {
        init_tracing();
        let schema = user_schema(&test_table_name("write"));
        let table = MemoryTable::new(&schema, 10);

        table.put(&write::prepare_put(&user(&schema, "u0", 0, 20, "a"), None, false).unwrap());
        table.put(&write::prepare_put(&user(&schema, "u0", 1, 20, "b"), None, false).unwrap());
        table.put(&write::prepare_put(&user(&schema, "u0", 0, 21, "c"), None, false).unwrap());
        assert_eq!(table.len(), 2);

        let delete = write::prepare_delete(&user(&schema, "u0", 1, 0, ""), None, false).unwrap();
        table.delete(&delete);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_should_render_user_condition_without_snapshot() {
        init_tracing();
        let schema = user_schema(&test_table_name("write"));
        let obj = user(&schema, "u0", 0, 20, "name0");
        let condition = ConditionTree::from(schema.column("name").unwrap().begins_with("na"))
            .or(schema.column("tags").unwrap().contains("admin"));

        let request = write::prepare_put(&obj, Some(condition), false).unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "TableName": schema.table_name(),
                "Item": {
                    "id": {"S": "u0"},
                    "created": {"N": "0"},
                    "age": {"N": "20"},
                    "name": {"S": "name0"}
                },
                "ConditionExpression": "(begins_with(#n0, :v1) OR contains(#n2, :v3))",
                "ExpressionAttributeNames": {"#n0": "name", "#n2": "tags"},
                "ExpressionAttributeValues": {":v1": {"S": "na"}, ":v3": {"S": "admin"}}
            })
        );
    }

    #[test]
    fn test_should_reject_write_of_unmarshallable_value() {
        init_tracing();
        let schema = user_schema(&test_table_name("write"));
        let mut obj = ModelObject::new(Arc::clone(&schema)).with("id", "u0").unwrap();
        obj.set("created", Some(f64::NAN.into())).unwrap();
        let err = write::prepare_put(&obj, None, false).unwrap_err();
        assert!(matches!(err, MapperError::Marshal(_)), "{err}");
    }
}
