//! End-to-end lowering against the bundled sample dictionary
//!
//! Loads schemas/content_model.yaml, lowers the demo invoice query and walks
//! a result cursor over an in-memory node store.

#[cfg(test)]
mod lowering_pipeline_tests {
    use eavquery::config::EngineConfig;
    use eavquery::dictionary::{
        Dictionary, DictionaryConfig, DictionaryService, InMemoryQNameDirectory, NamespaceRegistry, QNameDirectory,
        SchemaContext, SingleTenant, TenantDomainMapper,
    };
    use eavquery::lowering::{lower_query, render_predicate, JoinCategory, LoweringError};
    use eavquery::node::{InMemoryNodeResolver, NodeRef, StoreRef};
    use eavquery::query_model::Query;
    use eavquery::result_set::{LimitBy, ResultCursor, ResultOptions};

    const SCHEMA_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/schemas/content_model.yaml");
    const DEMO_QUERY_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/invoice_query.json");

    fn load_schema() -> (Dictionary, InMemoryQNameDirectory) {
        DictionaryConfig::from_yaml_file(SCHEMA_PATH)
            .expect("sample dictionary should parse")
            .build()
            .expect("sample dictionary should build")
    }

    fn demo_query() -> Query {
        let content = std::fs::read_to_string(DEMO_QUERY_PATH).expect("demo query should exist");
        serde_json::from_str(&content).expect("demo query should deserialize")
    }

    fn id(namespaces: &NamespaceRegistry, directory: &InMemoryQNameDirectory, name: &str) -> i64 {
        let qname = namespaces.resolve(name).expect("known prefix");
        directory.id(&qname).expect("persisted name")
    }

    #[test]
    fn test_demo_invoice_query_lowers() {
        let (dictionary, directory) = load_schema();
        let tenant = SingleTenant;
        let schema = SchemaContext::new(&dictionary, &directory, &tenant);
        let namespaces = dictionary.namespaces();

        let lowered = lower_query(&demo_query(), &schema).expect("demo query should lower");

        // draftInvoice is excluded from sub-type closures
        let invoice = id(namespaces, &directory, "ex:invoice");
        let mut aspects = vec![
            id(namespaces, &directory, "ex:taggable"),
            id(namespaces, &directory, "ex:reviewed"),
        ];
        aspects.sort_unstable();

        assert_eq!(
            render_predicate(&lowered.predicate),
            format!(
                "node.type_qname_id IN ({}) AND ASPECT_1.qname_id IN ({}, {}) AND ( \
                 PROPERTY_1.long_value > 1000 AND PROPERTY_2.string_value LIKE 'ACME%' AND \
                 CONTENT_MIMETYPE_1.mimetype_str IS NOT NULL )",
                invoice, aspects[0], aspects[1]
            )
        );

        let joins: Vec<(JoinCategory, &str, bool)> = lowered
            .joins
            .iter()
            .map(|join| (join.category, join.alias.as_str(), join.outer))
            .collect();
        assert_eq!(
            joins,
            vec![
                // amount is also the ordering key, which forces an outer join
                (JoinCategory::Property, "PROPERTY_1", true),
                (JoinCategory::Property, "PROPERTY_2", false),
                (JoinCategory::ContentMimetype, "CONTENT_MIMETYPE_1", true),
                (JoinCategory::AspectPresence, "ASPECT_1", false),
            ]
        );
        assert_eq!(
            lowered.joins[0].qname_id,
            Some(id(namespaces, &directory, "ex:amount"))
        );

        assert_eq!(lowered.order_by.len(), 1);
        assert_eq!(lowered.order_by[0].to_string(), "PROPERTY_1.long_value DESC");
        assert_eq!(lowered.store, StoreRef::workspace());
        assert!(lowered.deleted_type_id.is_some());
        assert_eq!(lowered.since_txn_id, None);
    }

    #[test]
    fn test_lowered_text_rendering() {
        let (dictionary, directory) = load_schema();
        let tenant = SingleTenant;
        let schema = SchemaContext::new(&dictionary, &directory, &tenant);
        let lowered = lower_query(&demo_query(), &schema).unwrap();

        let text = lowered.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "STORE workspace://SpacesStore");
        assert!(lines[1].starts_with("LEFT OUTER JOIN Property AS PROPERTY_1 ON qname_id = "));
        assert!(text.contains("\nWHERE node.type_qname_id IN ("));
        assert!(text.contains("\nEXCLUDING TYPE "));
        assert!(text.ends_with("ORDER BY PROPERTY_1.long_value DESC\n"));
    }

    #[test]
    fn test_tenant_store_is_normalized() {
        let (dictionary, directory) = load_schema();
        let tenant = TenantDomainMapper::for_domain("acme");
        let schema = SchemaContext::new(&dictionary, &directory, &tenant);
        let query = demo_query().in_store(StoreRef::new("workspace", "@acme@SpacesStore"));

        let lowered = lower_query(&query, &schema).unwrap();
        assert_eq!(lowered.store, StoreRef::workspace());
    }

    #[test]
    fn test_unknown_selector_in_demo_variant() {
        let (dictionary, directory) = load_schema();
        let tenant = SingleTenant;
        let schema = SchemaContext::new(&dictionary, &directory, &tenant);

        let content = std::fs::read_to_string(DEMO_QUERY_PATH).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&content).unwrap();
        value["orderings"][0]["column"]["arguments"]["property"]["selector"] =
            serde_json::Value::String("missing".to_string());
        let query: Query = serde_json::from_value(value).unwrap();

        assert_eq!(
            lower_query(&query, &schema),
            Err(LoweringError::UnknownSelector("missing".to_string()))
        );
    }

    #[test]
    fn test_cursor_over_lowered_result() {
        let store = StoreRef::workspace();
        let mut nodes = InMemoryNodeResolver::new();
        let first = nodes.insert_generated(10, &store);
        let second = nodes.insert_generated(11, &store);
        let third = NodeRef::new(store.clone(), "invoice-3");
        nodes.insert(12, third.clone());

        let config = EngineConfig {
            bulk_fetch_size: 2,
            ..Default::default()
        };
        let tenant = SingleTenant;
        let options = ResultOptions::default().with_max_items(2);
        let mut cursor = ResultCursor::new(vec![10, 11, 12, 13], &nodes, &tenant, &config, &options);

        assert_eq!(cursor.len(), 4);
        assert_eq!(cursor.limit_by(), LimitBy::FinalSize);
        assert_eq!(cursor.max_size(), 2);

        let refs: Vec<Option<NodeRef>> = cursor
            .node_refs()
            .collect::<Result<_, _>>()
            .expect("in-memory lookups never fail");
        assert_eq!(refs, vec![Some(first), Some(second), Some(third), None]);
        assert!(!cursor.exists(3).unwrap());
    }

    #[test]
    fn test_cursor_over_loaded_node_map() {
        let nodes = InMemoryNodeResolver::from_yaml_str(
            r#"
12: workspace://SpacesStore/invoices-folder
13: workspace://SpacesStore/invoice-0001
"#,
        )
        .expect("node map should parse");
        let config = EngineConfig {
            max_permission_checks: 50,
            ..Default::default()
        };
        let tenant = SingleTenant;
        let mut cursor = ResultCursor::new(vec![13, 14, 12], &nodes, &tenant, &config, &ResultOptions::default());

        let metadata = cursor.metadata();
        assert_eq!(metadata.length, 3);
        assert_eq!(metadata.limit_by, LimitBy::NumberOfPermissionEvaluations);
        assert_eq!(metadata.max_size, 50);
        assert_eq!(metadata.bulk_fetch_size, config.bulk_fetch_size);

        let row = cursor.row(0).unwrap();
        assert_eq!(row.node_id(), 13);
        assert_eq!(row.node_ref().map(|node| node.id.as_str()), Some("invoice-0001"));
        assert_eq!(cursor.row(1).unwrap().node_ref(), None);
    }
}
