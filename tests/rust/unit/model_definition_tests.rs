//! Domain model loading and validation through the public API

#[cfg(test)]
mod model_definition_tests {
    use std::io::Write;

    use resultgraph::domain_model::errors::DomainModelError;
    use resultgraph::domain_model::model_part::{FetchTiming, ModelPartKind};
    use resultgraph::DomainModel;
    use test_case::test_case;

    const SHOP: &str = include_str!("../fixtures/shop.yaml");

    #[test]
    fn test_fixture_model_loads_in_declaration_order() {
        let model = DomainModel::from_yaml_str(SHOP).unwrap();
        assert_eq!(model.name(), "shop");
        let names: Vec<&str> = model.entities().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["Customer", "CardPayment", "WirePayment", "Order", "Invoice"]
        );

        let invoice = model.entity("Invoice").unwrap();
        let payment = invoice.find_sub_part("payment").unwrap();
        let ModelPartKind::Discriminated(any) = payment.kind() else {
            panic!("expected any-association");
        };
        let values: Vec<&str> = any.targets.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["CARD", "WIRE"]);
        assert_eq!(any.timing, FetchTiming::Delayed);
    }

    #[test]
    fn test_json_and_yaml_definitions_agree() {
        let json = r#"{
            "name": "shop",
            "entities": [
                { "name": "Customer", "table": "customers",
                  "id": { "kind": "basic", "name": "id", "type": "long" } },
                { "name": "Order", "table": "orders",
                  "id": { "kind": "basic", "name": "id", "type": "long" },
                  "attributes": [
                      { "kind": "to_one", "name": "customer", "target": "Customer",
                        "columns": ["customer_id"], "fetch": "immediate" }
                  ] }
            ]
        }"#;
        let model = DomainModel::from_json_str(json).unwrap();
        let order = model.entity("Order").unwrap();
        let customer = order.find_sub_part("customer").unwrap();
        let ModelPartKind::EntityValued(to_one) = customer.kind() else {
            panic!("expected to-one association");
        };
        assert_eq!(to_one.timing, FetchTiming::Immediate);
        assert_eq!(to_one.foreign_key.key_columns(), vec!["customer_id".to_string()]);
    }

    #[test]
    fn test_secondary_table_defaults_to_owner_identifier() {
        let yaml = r#"
name: hr
entities:
  - name: Employee
    table: employees
    id: { kind: basic, name: id, column: emp_id, type: long }
    attributes:
      - kind: embedded
        name: address
        secondary_table: { table: employee_addresses, key_columns: [employee_id] }
        attributes:
          - { kind: basic, name: street, type: string }
"#;
        let model = DomainModel::from_yaml_str(yaml).unwrap();
        let address = model
            .entity("Employee")
            .unwrap()
            .find_sub_part("address")
            .unwrap();
        let embedded = address.as_embedded().unwrap();
        let secondary = embedded.secondary_table.as_ref().unwrap();
        assert_eq!(secondary.owner_columns, vec!["emp_id".to_string()]);
        let street = &embedded.sub_parts[0];
        assert_eq!(street.as_basic().unwrap().table, "employee_addresses");
    }

    #[test]
    fn test_model_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SHOP.as_bytes()).unwrap();
        let model = DomainModel::from_yaml_file(file.path()).unwrap();
        assert_eq!(model.entities().count(), 5);

        assert!(matches!(
            DomainModel::from_yaml_file("/nonexistent/model.yaml"),
            Err(DomainModelError::Io { .. })
        ));
    }

    #[test_case("kind: any\n        name: p\n        discriminator_column: t\n        key_column: k\n        key_type: long\n        targets: {}" ; "any without targets")]
    #[test_case("{ kind: to_one, name: c, target: Nobody, columns: [c_id] }" ; "unknown target")]
    #[test_case("{ kind: basic, name: id, type: long }" ; "duplicate attribute")]
    #[test_case("{ kind: basic, name: x, type: currency }" ; "unknown value type")]
    #[test_case("{ kind: plural, name: charges, table: thing_charges, key_columns: [thing_id], element: { kind: embedded, attributes: [{ kind: any, name: method, discriminator_column: t, key_column: k, key_type: long, targets: { T: Thing } }] } }" ; "any inside collection element")]
    fn test_invalid_attribute_is_rejected(attribute: &str) {
        let yaml = format!(
            r#"
name: broken
entities:
  - name: Thing
    table: things
    id: {{ kind: basic, name: id, type: long }}
    attributes:
      - {}
"#,
            attribute
        );
        assert!(DomainModel::from_yaml_str(&yaml).is_err());
    }

    #[test_case("{ kind: any, name: method, discriminator_column: t, key_column: k, key_type: long, targets: { T: Thing } }", "Thing.charges.{element}.method" ; "any-association")]
    #[test_case("{ kind: embedded, name: detail, attributes: [{ kind: any, name: method, discriminator_column: t, key_column: k, key_type: long, targets: { T: Thing } }] }", "Thing.charges.{element}.detail.method" ; "nested any-association")]
    #[test_case("{ kind: plural, name: parts, table: charge_parts, key_columns: [charge_id], element: { kind: basic, column: part, type: string } }", "Thing.charges.{element}.parts" ; "nested collection")]
    fn test_collection_element_rejects_part(attribute: &str, expected_role: &str) {
        let yaml = format!(
            r#"
name: broken
entities:
  - name: Thing
    table: things
    id: {{ kind: basic, name: id, type: long }}
    attributes:
      - kind: plural
        name: charges
        table: thing_charges
        key_columns: [thing_id]
        element:
          kind: embedded
          attributes:
            - {{ kind: basic, name: amount, type: decimal }}
            - {}
"#,
            attribute
        );
        match DomainModel::from_yaml_str(&yaml) {
            Err(DomainModelError::InvalidAttribute { role, .. }) => assert_eq!(role, expected_role),
            other => panic!("expected invalid attribute, got {:?}", other),
        }
    }
}
