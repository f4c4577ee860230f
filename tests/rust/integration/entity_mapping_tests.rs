//! End-to-end tests for entity result mappings
//!
//! These tests build implicit mappings from a YAML model, resolve them
//! against result-set metadata and read rows through the resolved plan.

#[cfg(test)]
mod entity_mapping_tests {
    use resultgraph::domain_model::types::{CollectionState, TypeRegistry, Value, ValueType};
    use resultgraph::results::builders::{
        collect_fetch_paths, ExplicitFetchBuilder, ExplicitMappings, NoExplicitMappings,
        ResultBuilder,
    };
    use resultgraph::results::{
        CacheKeyCopy, DomainResultCreationState, JdbcValuesMapping, MappingError,
        ResultSetMapping, RowReader,
    };
    use resultgraph::sql::jdbc_metadata::ResultSetMetadata;
    use resultgraph::sql::selection::ColumnLocator;
    use resultgraph::sql::table_group::FromClauseIndex;
    use resultgraph::{DomainModel, EngineConfig};

    const SHOP: &str = include_str!("../fixtures/shop.yaml");

    fn shop() -> DomainModel {
        DomainModel::from_yaml_str(SHOP).expect("fixture model should load")
    }

    fn resolve(
        model: &DomainModel,
        mapping: &ResultSetMapping,
        labels: &[&str],
    ) -> Result<(JdbcValuesMapping, FromClauseIndex), MappingError> {
        let metadata = ResultSetMetadata::from_labels(labels);
        let mut from_clause = FromClauseIndex::new();
        let resolved = mapping.resolve(&metadata, model, &mut from_clause, &EngineConfig::default())?;
        Ok((resolved, from_clause))
    }

    fn entity_attributes(value: Value) -> (Value, Vec<(String, Value)>) {
        match value {
            Value::Entity(entity) => (*entity.id, entity.attributes.into_iter().collect()),
            other => panic!("expected entity value, got {:?}", other),
        }
    }

    /// Order { id, total, customer -> Customer } read from a single row
    #[test]
    fn test_order_with_customer_reference() {
        let model = shop();
        let mapping = ResultSetMapping::for_entity(
            &model,
            "Order",
            &NoExplicitMappings,
            &EngineConfig::default(),
        )
        .unwrap();
        let (resolved, from_clause) =
            resolve(&model, &mapping, &["id", "total", "customer_id"]).unwrap();

        assert_eq!(
            from_clause.to_sql(),
            "orders o1_0 join customers c1_0 on c1_0.id=o1_0.customer_id"
        );
        let labels: Vec<&str> = resolved
            .selections
            .iter()
            .map(|s| s.column_label.as_str())
            .collect();
        assert_eq!(labels, vec!["id", "total", "customer_id"]);

        let mut reader = RowReader::new(&resolved);
        let row = [Value::Long(1), Value::Decimal("9.50".to_string()), Value::Long(7)];
        let (id, attributes) = entity_attributes(reader.read_row(&row).unwrap());
        assert_eq!(id, Value::Long(1));
        assert_eq!(attributes[0], ("total".to_string(), Value::Decimal("9.50".to_string())));
        let Value::EntityRef(customer) = &attributes[1].1 else {
            panic!("expected customer reference");
        };
        assert_eq!(customer.entity, "Customer");
        assert_eq!(*customer.key, Value::Long(7));

        // A NULL foreign key is a NULL association, a NULL id a NULL entity
        let (_, attributes) = entity_attributes(
            reader
                .read_row(&[Value::Long(2), Value::Null, Value::Null])
                .unwrap(),
        );
        assert_eq!(attributes[1].1, Value::Null);
        assert_eq!(
            reader
                .read_row(&[Value::Null, Value::Null, Value::Null])
                .unwrap(),
            Value::Null
        );
        assert_eq!(reader.rows_read(), 3);
    }

    #[test]
    fn test_repeated_resolution_reuses_table_groups() {
        let model = shop();
        let mapping = ResultSetMapping::for_entity(
            &model,
            "Order",
            &NoExplicitMappings,
            &EngineConfig::default(),
        )
        .unwrap();
        let metadata = ResultSetMetadata::from_labels(&["id", "total", "customer_id"]);
        let mut from_clause = FromClauseIndex::new();
        let config = EngineConfig::default();

        let first = mapping
            .resolve(&metadata, &model, &mut from_clause, &config)
            .unwrap();
        let second = mapping
            .resolve(&metadata, &model, &mut from_clause, &config)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(from_clause.physical_join_count(), 1);
        assert_eq!(from_clause.table_groups().count(), 2);
    }

    const REGISTRY: &str = r#"
name: registry
entities:
  - name: Region
    table: regions
    id:
      kind: embedded
      name: id
      attributes:
        - { kind: basic, name: country, column: country_code, type: string }
        - { kind: basic, name: number, column: region_no, type: integer }
  - name: Office
    table: offices
    id: { kind: basic, name: id, type: long }
    attributes:
      - { kind: to_one, name: region, target: Region, columns: [region_country, region_no] }
"#;

    /// The association and its explicit mapping both reach Office.region
    /// while one mapping resolves; the join is created once.
    #[test]
    fn test_table_groups_are_registered_once() {
        let model = DomainModel::from_yaml_str(REGISTRY).unwrap();
        let region = model
            .entity("Office")
            .unwrap()
            .find_sub_part("region")
            .unwrap()
            .clone();
        let mut explicit = ExplicitMappings::new();
        explicit.register(ExplicitFetchBuilder::new(
            region,
            vec![ColumnLocator::name("rc"), ColumnLocator::name("rn")],
        ));
        let mapping =
            ResultSetMapping::for_entity(&model, "Office", &explicit, &EngineConfig::default())
                .unwrap();

        let (resolved, from_clause) = resolve(&model, &mapping, &["id", "rc", "rn"]).unwrap();
        assert_eq!(from_clause.physical_join_count(), 1);
        assert_eq!(
            from_clause
                .table_groups()
                .filter(|g| g.path.full_path() == "Office.region")
                .count(),
            1
        );
        assert_eq!(
            from_clause
                .joins()
                .iter()
                .filter(|j| j.joined_group.path.full_path() == "Office.region")
                .count(),
            1
        );
        assert_eq!(
            from_clause.to_sql(),
            "offices o1_0 join regions r1_0 on r1_0.country_code=o1_0.region_country and r1_0.region_no=o1_0.region_no"
        );

        let row = [Value::Long(1), Value::text("NO"), Value::Int(3)];
        let (_, attributes) = entity_attributes(RowReader::new(&resolved).read_row(&row).unwrap());
        let Value::EntityRef(region) = &attributes[0].1 else {
            panic!("expected region reference");
        };
        assert_eq!(region.entity, "Region");
        assert_eq!(region.key.to_string(), "(country=NO, number=3)");
    }

    #[test]
    fn test_declaration_order_is_preserved() {
        let model = shop();
        let mapping = ResultSetMapping::for_entity(
            &model,
            "Invoice",
            &NoExplicitMappings,
            &EngineConfig::default(),
        )
        .unwrap();
        let root = mapping.result_builder().unwrap();
        assert_eq!(
            collect_fetch_paths(root),
            vec![
                "Invoice.id",
                "Invoice.billing",
                "Invoice.billing.city",
                "Invoice.billing.zip",
                "Invoice.payment",
                "Invoice.lines",
                "Invoice.lines.{element}",
            ]
        );

        let (resolved, _) = resolve(
            &model,
            &mapping,
            &["postal_code", "payment_id", "city", "id", "payment_type"],
        )
        .unwrap();
        let row = [
            Value::text("0150"),
            Value::Long(3),
            Value::text("Oslo"),
            Value::Long(10),
            Value::text("CARD"),
        ];
        let (_, attributes) = entity_attributes(RowReader::new(&resolved).read_row(&row).unwrap());
        let names: Vec<&str> = attributes.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["billing", "payment", "lines"]);
        assert_eq!(attributes[0].1.to_string(), "(city=Oslo, zip=0150)");
    }

    #[test]
    fn test_independent_builds_share_a_cache_key() {
        let model = shop();
        let config = EngineConfig::default();
        let first = ResultSetMapping::for_entity(&model, "Order", &NoExplicitMappings, &config)
            .unwrap();
        let second = ResultSetMapping::for_entity(&model, "Order", &NoExplicitMappings, &config)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.cache_key_copy(), second.cache_key_copy());

        // Column order differs; the builder tree does not depend on it
        let (a, _) = resolve(&model, &first, &["id", "total", "customer_id"]).unwrap();
        let (b, _) = resolve(&model, &second, &["customer_id", "id", "total"]).unwrap();
        assert_ne!(a.selections, b.selections);
        assert_eq!(a.column_count, b.column_count);
    }

    #[test]
    fn test_explicit_mapping_takes_precedence() {
        let model = shop();
        let order = model.entity("Order").unwrap();
        let total = order.find_sub_part("total").unwrap().clone();
        let mut explicit = ExplicitMappings::new();
        explicit.register(ExplicitFetchBuilder::new(
            total,
            vec![ColumnLocator::name("amount")],
        ));

        let config = EngineConfig::default();
        let mapping = ResultSetMapping::for_entity(&model, "Order", &explicit, &config).unwrap();
        let implicit =
            ResultSetMapping::for_entity(&model, "Order", &NoExplicitMappings, &config).unwrap();
        assert_ne!(mapping, implicit);

        let (resolved, _) =
            resolve(&model, &mapping, &["id", "total", "amount", "customer_id"]).unwrap();
        let row = [
            Value::Long(1),
            Value::Decimal("1.00".to_string()),
            Value::Decimal("2.50".to_string()),
            Value::Long(7),
        ];
        let (_, attributes) = entity_attributes(RowReader::new(&resolved).read_row(&row).unwrap());
        assert_eq!(attributes[0].1, Value::Decimal("2.50".to_string()));
    }

    #[test]
    fn test_positional_columns_rejected_for_entity_roots() {
        let model = shop();
        let order = model.entity("Order").unwrap();
        let total = order.find_sub_part("total").unwrap().clone();
        let mut explicit = ExplicitMappings::new();
        explicit.register(ExplicitFetchBuilder::new(total, vec![ColumnLocator::Position(2)]));

        let mapping =
            ResultSetMapping::for_entity(&model, "Order", &explicit, &EngineConfig::default())
                .unwrap();
        let err = resolve(&model, &mapping, &["id", "total", "customer_id"]).unwrap_err();
        assert_eq!(err, MappingError::PositionalSelectionNotAllowed { position: 2 });
    }

    #[test]
    fn test_result_class_reads_first_column_only() {
        let model = shop();
        let mapping = ResultSetMapping::for_result_class(ValueType::Long);
        let (resolved, from_clause) = resolve(&model, &mapping, &["n", "extra"]).unwrap();
        assert_eq!(resolved.selections.len(), 1);
        assert_eq!(resolved.selections[0].jdbc_position, 1);
        assert_eq!(from_clause.table_groups().count(), 0);
        assert_eq!(
            RowReader::new(&resolved)
                .read_row(&[Value::Int(42), Value::Null])
                .unwrap(),
            Value::Long(42)
        );

        let metadata = ResultSetMetadata::from_labels(&["n"]);
        let mut from_clause = FromClauseIndex::new();
        let mut state =
            DomainResultCreationState::new(&model, &metadata, TypeRegistry::shared(), &mut from_clause);
        let err = ResultBuilder::result_class(ValueType::Long)
            .build_result(1, &mut state)
            .unwrap_err();
        assert_eq!(err, MappingError::NonZeroResultPosition(1));
    }

    #[test]
    fn test_discriminated_association_picks_target_per_row() {
        let model = shop();
        let mapping = ResultSetMapping::for_entity(
            &model,
            "Invoice",
            &NoExplicitMappings,
            &EngineConfig::default(),
        )
        .unwrap();
        let (resolved, from_clause) = resolve(
            &model,
            &mapping,
            &["id", "city", "postal_code", "payment_type", "payment_id"],
        )
        .unwrap();
        assert_eq!(from_clause.physical_join_count(), 0);

        let mut reader = RowReader::new(&resolved);
        let row = |kind: Value, key: Value| {
            vec![Value::Long(5), Value::Null, Value::Null, kind, key]
        };

        let (_, attributes) =
            entity_attributes(reader.read_row(&row(Value::text("WIRE"), Value::Long(9))).unwrap());
        assert_eq!(attributes[0].1, Value::Null);
        let Value::EntityRef(payment) = &attributes[1].1 else {
            panic!("expected payment reference");
        };
        assert_eq!(payment.entity, "WirePayment");
        assert_eq!(*payment.key, Value::Long(9));

        let (_, attributes) =
            entity_attributes(reader.read_row(&row(Value::Null, Value::Null)).unwrap());
        assert_eq!(attributes[1].1, Value::Null);

        let err = reader
            .read_row(&row(Value::text("CASH"), Value::Long(9)))
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::UnknownDiscriminator {
                role: "Invoice.payment".to_string(),
                value: "CASH".to_string(),
            }
        );
    }

    #[test]
    fn test_delayed_collection_is_a_reference() {
        let model = shop();
        let mapping = ResultSetMapping::for_entity(
            &model,
            "Invoice",
            &NoExplicitMappings,
            &EngineConfig::default(),
        )
        .unwrap();
        let (resolved, from_clause) = resolve(
            &model,
            &mapping,
            &["id", "city", "postal_code", "payment_type", "payment_id"],
        )
        .unwrap();
        assert!(!from_clause.to_sql().contains("invoice_lines"));

        let row = [Value::Long(5), Value::Null, Value::Null, Value::Null, Value::Null];
        let (_, attributes) = entity_attributes(RowReader::new(&resolved).read_row(&row).unwrap());
        let Value::Collection(lines) = &attributes[2].1 else {
            panic!("expected collection value");
        };
        assert_eq!(lines.role, "Invoice.lines");
        assert_eq!(*lines.owner_key, Value::Long(5));
        assert_eq!(lines.state, CollectionState::Delayed);
    }

    #[test]
    fn test_missing_column_fails_resolution() {
        let model = shop();
        let mapping = ResultSetMapping::for_entity(
            &model,
            "Order",
            &NoExplicitMappings,
            &EngineConfig::default(),
        )
        .unwrap();
        let err = resolve(&model, &mapping, &["id", "total"]).unwrap_err();
        assert_eq!(err, MappingError::UnknownColumn("customer_id".to_string()));
    }
}
