//! Unit tests for loading engine and dictionary configuration from disk

#[cfg(test)]
mod config_loading_tests {
    use std::io::Write;

    use eavquery::config::{ConfigError, EngineConfig};
    use eavquery::dictionary::{
        resolve_class, DictionaryConfig, DictionaryError, QName, QNameDirectory, SchemaContext,
        SingleTenant,
    };
    use eavquery::lowering::{lower_query, render_predicate, LoweringError};
    use eavquery::node::{InMemoryNodeResolver, NodeResolver, ResolveError};
    use eavquery::query_model::{Argument, Constraint, Query, Source};
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn test_engine_config_from_yaml_file() {
        let file = write_temp(
            r#"
bulk_fetch_size: 0
default_store: archive://SpacesStore
tenant_domain: acme
"#,
        );
        let config = EngineConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.bulk_fetch_size, 0);
        // Unset fields keep their defaults
        assert_eq!(config.max_permission_checks, 1000);
        assert_eq!(config.default_store_ref().unwrap().protocol, "archive");
        assert_eq!(config.tenant_domain.as_deref(), Some("acme"));
    }

    #[test]
    fn test_engine_config_rejects_invalid_values() {
        let file = write_temp("max_permission_checks: 0\n");
        assert!(matches!(
            EngineConfig::from_yaml_file(file.path()),
            Err(ConfigError::Validation(_))
        ));

        let file = write_temp("bulk_fetch_size: [1, 2]\n");
        assert!(matches!(
            EngineConfig::from_yaml_file(file.path()),
            Err(ConfigError::Parse { field, .. }) if field == "yaml_content"
        ));
    }

    #[test]
    fn test_engine_config_missing_file() {
        let result = EngineConfig::from_yaml_file("/nonexistent/eavquery.yaml");
        assert!(matches!(result, Err(ConfigError::Parse { field, .. }) if field == "yaml_file"));
    }

    #[test]
    fn test_dictionary_with_explicit_ids() {
        let file = write_temp(
            r#"
namespaces:
  - prefix: ex
    uri: urn:example:model:1.0
classes:
  - name: ex:invoice
    kind: type
    parent: cm:cmobject
    properties:
      - name: ex:amount
        type: long
  - name: cm:cmobject
    kind: type
ids:
  cm:cmobject: 10
  ex:invoice: 11
  ex:amount: 20
"#,
        );
        let (dictionary, directory) = DictionaryConfig::from_yaml_file(file.path())
            .unwrap()
            .build()
            .unwrap();

        let invoice = QName::new("urn:example:model:1.0", "invoice");
        assert_eq!(directory.id(&invoice), Some(11));
        // Explicit ids never include sys:deleted unless listed
        assert_eq!(directory.id(&QName::system("deleted")), None);

        let tenant = SingleTenant;
        let schema = SchemaContext::new(&dictionary, &directory, &tenant);
        let resolved = resolve_class(&schema, "cm:cmobject", false).unwrap();
        assert_eq!(resolved.ids.into_iter().collect::<Vec<_>>(), vec![10, 11]);
    }

    #[test]
    fn test_dictionary_with_missing_parent() {
        let file = write_temp(
            r#"
classes:
  - name: cm:content
    kind: type
    parent: cm:cmobject
"#,
        );
        let config = DictionaryConfig::from_yaml_file(file.path()).unwrap();
        assert!(matches!(
            config.build(),
            Err(DictionaryError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_dictionary_unknown_prefix() {
        let file = write_temp(
            r#"
classes:
  - name: zz:thing
    kind: type
"#,
        );
        let config = DictionaryConfig::from_yaml_file(file.path()).unwrap();
        assert!(matches!(
            config.build(),
            Err(DictionaryError::UnknownPrefix(prefix)) if prefix == "zz"
        ));
    }

    #[test]
    fn test_node_map_file_resolves_child_parent() {
        let dictionary_file = write_temp(
            r#"
classes:
  - name: cm:cmobject
    kind: type
ids:
  cm:cmobject: 10
"#,
        );
        let nodes_file = write_temp(
            r#"
12: workspace://SpacesStore/invoices-folder
13: workspace://SpacesStore/invoice-0001
"#,
        );
        let (dictionary, directory) = DictionaryConfig::from_yaml_file(dictionary_file.path())
            .unwrap()
            .build()
            .unwrap();
        let nodes = InMemoryNodeResolver::from_yaml_file(nodes_file.path()).unwrap();
        assert_eq!(nodes.len(), 2);

        let query = Query::new(Source::selector("d", "cm:cmobject")).with_constraint(
            Constraint::functional(
                "Child",
                [
                    (
                        "parent",
                        Argument::literal("workspace://SpacesStore/invoices-folder"),
                    ),
                    ("selector", Argument::selector("d")),
                ],
            ),
        );

        let tenant = SingleTenant;
        let without_nodes = SchemaContext::new(&dictionary, &directory, &tenant);
        assert_eq!(
            lower_query(&query, &without_nodes),
            Err(LoweringError::MissingNodeResolver)
        );

        let schema = without_nodes.with_nodes(&nodes);
        let lowered = lower_query(&query, &schema).unwrap();
        assert_eq!(
            render_predicate(&lowered.predicate),
            "node.type_qname_id IN (10) AND node.parent_node_id = 12"
        );
    }

    #[test]
    fn test_node_map_missing_file() {
        let result = InMemoryNodeResolver::from_yaml_file("/nonexistent/nodes.yaml");
        assert!(matches!(result, Err(ResolveError::NodeMap(_))));
    }

    #[test]
    fn test_node_map_file_in_json() {
        let file = write_temp(r#"{"7": "workspace://SpacesStore/abc", "8": "archive://SpacesStore/def"}"#);
        let nodes = InMemoryNodeResolver::from_yaml_file(file.path()).unwrap();
        let archived = nodes.node_ref(8).unwrap().expect("row 8 is mapped");
        assert_eq!(archived.store.protocol, "archive");
        assert_eq!(nodes.node_ref(9).unwrap(), None);
    }
}
