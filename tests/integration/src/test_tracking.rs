//! Change tracking across load, save and delete.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rustack_mapper_core::search::SearchBuilder;
    use rustack_mapper_core::{MapperConfig, ModelObject, ModelSchema, Value, tracking, write};
    use rustack_mapper_model::AttributeValue;

    use crate::{MemoryTable, init_tracing, test_table_name, user, user_schema};

    const ALL_ABSENT: &str = "((attribute_not_exists(#n0)) AND (attribute_not_exists(#n1)) \
        AND (attribute_not_exists(#n2)) AND (attribute_not_exists(#n3)) \
        AND (attribute_not_exists(#n4)) AND (attribute_not_exists(#n5)))";

    fn load_first(schema: &Arc<ModelSchema>, table: &MemoryTable) -> ModelObject {
        SearchBuilder::scan(Arc::clone(schema), &MapperConfig::default())
            .build()
            .unwrap()
            .iter(table)
            .first()
            .unwrap()
    }

    #[test]
    fn test_should_expect_absent_item_for_new_object() {
        init_tracing();
        let schema = user_schema(&test_table_name("tracking"));
        let obj = user(&schema, "u0", 0, 20, "name0");
        assert_eq!(obj.tracking().marked().len(), 4);

        let request = write::prepare_put(&obj, None, true).unwrap();
        assert_eq!(request.condition_expression.as_deref(), Some(ALL_ABSENT));
        assert_eq!(request.expression_attribute_names["#n2"], "e");
    }

    #[test]
    fn test_should_assert_loaded_state_on_atomic_save() {
        init_tracing();
        let schema = user_schema(&test_table_name("tracking"));
        let table = MemoryTable::new(&schema, 10);
        let mut original = user(&schema, "u0", 0, 20, "name0");
        table.put(&write::prepare_put(&original, None, true).unwrap());
        tracking::on_saved(&mut original).unwrap();

        let mut loaded = load_first(&schema, &table);
        assert_eq!(loaded.tracking().last_snapshot().map(|s| s.len()), Some(6));

        loaded.set("name", Some(Value::from("renamed"))).unwrap();
        let request = write::prepare_put(&loaded, None, true).unwrap();
        assert_eq!(
            request.condition_expression.as_deref(),
            Some(
                "((#n0 = :v1) AND (#n2 = :v3) AND (attribute_not_exists(#n4)) \
                 AND (#n5 = :v6) AND (#n7 = :v8) AND (attribute_not_exists(#n9)))"
            )
        );
        assert_eq!(request.expression_attribute_names["#n4"], "e");
        assert_eq!(
            request.expression_attribute_values[":v8"],
            AttributeValue::S("name0".to_owned())
        );
        assert_eq!(request.item["name"], AttributeValue::S("renamed".to_owned()));

        table.put(&request);
        tracking::on_saved(&mut loaded).unwrap();
        let again = write::prepare_put(&loaded, None, true).unwrap();
        let renamed = AttributeValue::S("renamed".to_owned());
        assert!(again.expression_attribute_values.values().any(|v| *v == renamed));

        let reloaded = load_first(&schema, &table);
        assert_eq!(reloaded.get("name").unwrap(), Some(&Value::from("renamed")));
    }

    #[test]
    fn test_should_expect_absent_item_after_delete() {
        init_tracing();
        let schema = user_schema(&test_table_name("tracking"));
        let table = MemoryTable::new(&schema, 10);
        table.put(&write::prepare_put(&user(&schema, "u0", 0, 20, "name0"), None, false).unwrap());

        let mut loaded = load_first(&schema, &table);
        let request = write::prepare_delete(&loaded, None, true).unwrap();
        assert_eq!(request.key.len(), 2);
        table.delete(&request);
        tracking::on_deleted(&mut loaded);
        assert!(table.is_empty());

        let next = write::prepare_put(&loaded, None, true).unwrap();
        assert_eq!(next.condition_expression.as_deref(), Some(ALL_ABSENT));
        assert_eq!(loaded.get("age").unwrap(), Some(&Value::Int(20)));
    }

    #[test]
    fn test_should_snapshot_only_saved_columns_on_partial_save() {
        init_tracing();
        let schema = user_schema(&test_table_name("tracking"));
        let mut obj = ModelObject::new(Arc::clone(&schema))
            .with("id", "u0")
            .unwrap()
            .with("created", 0)
            .unwrap();
        tracking::on_saved(&mut obj).unwrap();

        let request = write::prepare_delete(&obj, None, true).unwrap();
        assert_eq!(
            request.condition_expression.as_deref(),
            Some("((#n0 = :v1) AND (#n2 = :v3))")
        );
        assert_eq!(request.expression_attribute_names["#n0"], "created");
        assert_eq!(request.expression_attribute_names["#n2"], "id");
    }
}
