//! Queries and scans paged through the in-memory table.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rustack_mapper_core::search::{SearchBuilder, SearchCount, Selection};
    use rustack_mapper_core::{ConditionTree, MapperConfig, MapperError, ModelSchema, Value, write};
    use rustack_mapper_model::{AttributeValue, Item, SearchMode, Select};
    use serde_json::json;

    use crate::{MemoryTable, init_tracing, test_table_name, user, user_schema};

    fn seeded(count: i64, page_size: usize) -> (Arc<ModelSchema>, MemoryTable) {
        init_tracing();
        let schema = user_schema(&test_table_name("search"));
        let table = MemoryTable::new(&schema, page_size);
        for i in 0..count {
            let obj = user(&schema, &format!("u{i}"), i, 20 + i, &format!("name{i}"));
            table.put(&write::prepare_put(&obj, None, false).unwrap());
        }
        (schema, table)
    }

    fn names(objs: &[rustack_mapper_core::ModelObject]) -> Vec<String> {
        objs.iter()
            .map(|o| match o.get("name").unwrap() {
                Some(Value::String(s)) => s.clone(),
                other => panic!("unexpected name {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_should_scan_every_page_in_order() {
        let (schema, table) = seeded(5, 2);
        let search = SearchBuilder::scan(Arc::clone(&schema), &MapperConfig::default())
            .build()
            .unwrap();

        let mut cursor = search.iter(&table);
        let objs: Vec<_> = cursor.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(names(&objs), ["name0", "name1", "name2", "name3", "name4"]);
        assert_eq!(table.calls(), 3);
        assert!(cursor.exhausted());
        assert!(cursor.next().is_none());
        assert_eq!(table.calls(), 3);

        let requests = table.requests();
        assert!(requests.iter().all(|(mode, _)| *mode == SearchMode::Scan));
        assert!(requests[0].1.exclusive_start_key.is_none());
        let token = requests[1].1.exclusive_start_key.clone().unwrap();
        assert_eq!(
            token,
            Item::from([
                ("id".to_owned(), AttributeValue::S("u1".to_owned())),
                ("created".to_owned(), AttributeValue::N("1".to_owned())),
            ])
        );
    }

    #[test]
    fn test_should_count_without_loading_items() {
        let (schema, table) = seeded(5, 2);
        let search = SearchBuilder::scan(Arc::clone(&schema), &MapperConfig::default())
            .select(Selection::Count)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(search.request().select, Some(Select::Count));
        assert_eq!(
            search.count(&table).unwrap(),
            SearchCount {
                count: 5,
                scanned_count: 5
            }
        );
        assert_eq!(table.calls(), 3);
    }

    #[test]
    fn test_should_compile_query_and_load_projection() {
        let (schema, table) = seeded(3, 10);
        let key = ConditionTree::from(schema.column("id").unwrap().eq("u1"))
            .and(schema.column("created").unwrap().ge(1));
        let search = SearchBuilder::query(Arc::clone(&schema), &MapperConfig::default())
            .key(key)
            .unwrap()
            .filter(schema.column("age").unwrap().gt(18))
            .select(Selection::Specific(vec![
                schema.column("name").unwrap(),
                schema.column("email").unwrap(),
            ]))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            serde_json::to_value(search.request()).unwrap(),
            json!({
                "TableName": schema.table_name(),
                "KeyConditionExpression": "((#n4 = :v5) AND (#n6 >= :v7))",
                "FilterExpression": "(#n0 > :v1)",
                "ProjectionExpression": "#n2, #n3",
                "Select": "SPECIFIC_ATTRIBUTES",
                "ScanIndexForward": true,
                "ExpressionAttributeNames": {
                    "#n0": "age", "#n2": "name", "#n3": "e", "#n4": "id", "#n6": "created"
                },
                "ExpressionAttributeValues": {
                    ":v1": {"N": "18"}, ":v5": {"S": "u1"}, ":v7": {"N": "1"}
                }
            })
        );

        let obj = search.iter(&table).first().unwrap();
        assert_eq!(obj.get("name").unwrap(), Some(&Value::from("name0")));
        assert_eq!(obj.get("email").unwrap(), None);
        assert!(matches!(
            obj.get("age"),
            Err(MapperError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_should_enforce_result_cardinality() {
        let (schema, table) = seeded(3, 2);
        let search = SearchBuilder::scan(Arc::clone(&schema), &MapperConfig::default())
            .build()
            .unwrap();

        let mut cursor = search.iter(&table);
        let first = cursor.first().unwrap();
        assert_eq!(cursor.first().unwrap().to_string(), first.to_string());
        assert_eq!(table.calls(), 1);

        let err = search.iter(&table).one().unwrap_err();
        assert!(err.is_constraint_violation(), "{err}");

        let (schema, table) = seeded(1, 2);
        let search = SearchBuilder::scan(Arc::clone(&schema), &MapperConfig::default())
            .build()
            .unwrap();
        let only = search.iter(&table).one().unwrap();
        assert_eq!(only.get("id").unwrap(), Some(&Value::from("u0")));

        let (schema, table) = seeded(0, 2);
        let search = SearchBuilder::scan(Arc::clone(&schema), &MapperConfig::default())
            .build()
            .unwrap();
        let err = search.iter(&table).first().unwrap_err();
        assert!(err.to_string().contains("at least one result"), "{err}");
    }

    #[test]
    fn test_should_stop_at_limit_before_final_page() {
        let (schema, table) = seeded(5, 2);
        let search = SearchBuilder::scan(Arc::clone(&schema), &MapperConfig::default())
            .limit(3)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(search.request().limit, Some(3));

        let objs: Vec<_> = search.iter(&table).collect::<Result<_, _>>().unwrap();
        assert_eq!(names(&objs), ["name0", "name1", "name2"]);
        assert_eq!(table.calls(), 2);
    }

    #[test]
    fn test_should_prefetch_following_pages() {
        let (schema, table) = seeded(5, 2);
        let config = MapperConfig {
            prefetch: 1,
            ..MapperConfig::default()
        };
        let search = SearchBuilder::scan(Arc::clone(&schema), &config).build().unwrap();
        let mut cursor = search.iter(&table);
        cursor.next().unwrap().unwrap();
        assert_eq!(table.calls(), 2);
        assert_eq!(cursor.buffered(), 3);
    }

    #[test]
    fn test_should_load_only_index_projection() {
        let (schema, table) = seeded(2, 10);
        let search = SearchBuilder::scan(Arc::clone(&schema), &MapperConfig::default())
            .index("by_email")
            .unwrap()
            .select(Selection::Projected)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(search.request().index_name.as_deref(), Some("by_email"));

        let obj = search.iter(&table).first().unwrap();
        assert_eq!(obj.get("id").unwrap(), Some(&Value::from("u0")));
        assert_eq!(obj.get("email").unwrap(), None);
        assert!(!obj.contains("name"));
        assert!(!obj.contains("tags"));
    }

    #[test]
    fn test_should_fall_back_to_table_read_for_local_index() {
        let (schema, table) = seeded(2, 10);
        let email = schema.column("email").unwrap();

        let strict = SearchBuilder::scan(Arc::clone(&schema), &MapperConfig::default())
            .index("by_age")
            .unwrap()
            .select(Selection::Specific(vec![email.clone()]));
        assert!(matches!(strict, Err(MapperError::InvalidSearch(_))));

        let config = MapperConfig {
            strict: false,
            ..MapperConfig::default()
        };
        let search = SearchBuilder::scan(Arc::clone(&schema), &config)
            .index("by_age")
            .unwrap()
            .select(Selection::Specific(vec![email]))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(search.request().select, Some(Select::AllAttributes));
        let obj = search.iter(&table).first().unwrap();
        assert_eq!(obj.get("age").unwrap(), Some(&Value::Int(20)));
        assert!(obj.contains("tags"));
    }

    #[test]
    fn test_should_reiterate_after_reset() {
        let (schema, table) = seeded(3, 2);
        let search = SearchBuilder::scan(Arc::clone(&schema), &MapperConfig::default())
            .build()
            .unwrap();
        let mut cursor = search.iter(&table);
        let before: Vec<_> = cursor.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(cursor.matched_count(), 3);

        cursor.reset();
        assert_eq!(cursor.matched_count(), 0);
        assert_eq!(cursor.yielded(), 0);
        let after: Vec<_> = cursor.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(names(&before), names(&after));
        assert_eq!(table.calls(), 4);
    }
}
