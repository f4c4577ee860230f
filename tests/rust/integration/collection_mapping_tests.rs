//! End-to-end tests for collection-valued attributes
//!
//! Element and index parts get builders of their own, so explicit mappings
//! registered for them are honoured like any other attribute's.

#[cfg(test)]
mod collection_mapping_tests {
    use std::cell::RefCell;

    use resultgraph::domain_model::model_part::{ModelPartKind, ModelPartRef};
    use resultgraph::domain_model::types::{CollectionState, Value};
    use resultgraph::results::builders::{
        collect_fetch_paths, ExplicitFetchBuilder, NoExplicitMappings,
    };
    use resultgraph::results::{MappingError, ResultSetMapping, RowReader};
    use resultgraph::sql::jdbc_metadata::ResultSetMetadata;
    use resultgraph::sql::selection::ColumnLocator;
    use resultgraph::sql::table_group::FromClauseIndex;
    use resultgraph::{DomainModel, EngineConfig};

    const LIBRARY: &str = r#"
name: library
entities:
  - name: Author
    table: authors
    id: { kind: basic, name: id, type: long }
  - name: Book
    table: books
    id: { kind: basic, name: id, type: long }
    attributes:
      - kind: plural
        name: authors
        table: book_authors
        key_columns: [book_id]
        element: { kind: entity, target: Author, columns: [author_id] }
        fetch: immediate
"#;

    fn library() -> DomainModel {
        DomainModel::from_yaml_str(LIBRARY).expect("library model should load")
    }

    fn element_of(model: &DomainModel, entity: &str, collection: &str) -> ModelPartRef {
        let part = model
            .entity(entity)
            .unwrap()
            .find_sub_part(collection)
            .unwrap();
        let ModelPartKind::Plural(plural) = part.kind() else {
            panic!("expected collection attribute");
        };
        plural.element.clone()
    }

    fn loaded_elements(value: Value) -> Vec<Value> {
        let Value::Entity(book) = value else {
            panic!("expected entity value, got {:?}", value);
        };
        let (_, authors) = book.attributes.into_iter().next().unwrap();
        let Value::Collection(authors) = authors else {
            panic!("expected collection value");
        };
        let CollectionState::Loaded { entries } = authors.state else {
            panic!("expected loaded collection");
        };
        entries.into_iter().map(|entry| entry.element).collect()
    }

    #[test]
    fn test_entity_element_joins_through_collection_table() {
        let model = library();
        let mapping = ResultSetMapping::for_entity(
            &model,
            "Book",
            &NoExplicitMappings,
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(
            collect_fetch_paths(mapping.result_builder().unwrap()),
            vec!["Book.id", "Book.authors", "Book.authors.{element}"]
        );

        let metadata = ResultSetMetadata::from_labels(&["id", "author_id"]);
        let mut from_clause = FromClauseIndex::new();
        let resolved = mapping
            .resolve(&metadata, &model, &mut from_clause, &EngineConfig::default())
            .unwrap();
        assert_eq!(
            from_clause.to_sql(),
            "books b1_0 left join book_authors b2_0 on b2_0.book_id=b1_0.id join authors a1_0 on a1_0.id=b2_0.author_id"
        );

        let row = [Value::Long(1), Value::Long(42)];
        let elements = loaded_elements(RowReader::new(&resolved).read_row(&row).unwrap());
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].to_string(), "Author#42");
    }

    #[test]
    fn test_explicit_element_mapping_renames_column() {
        let model = library();
        let element = element_of(&model, "Book", "authors");
        let explicit = ExplicitFetchBuilder::new(element, vec![ColumnLocator::name("writer_id")]);
        let asked = RefCell::new(Vec::new());
        let resolver = |part: &ModelPartRef| -> Result<Option<ExplicitFetchBuilder>, MappingError> {
            asked.borrow_mut().push(part.role().to_string());
            Ok((part.role() == "Book.authors.{element}").then(|| explicit.clone()))
        };

        let config = EngineConfig::default();
        let mapping = ResultSetMapping::for_entity(&model, "Book", &resolver, &config).unwrap();
        assert!(asked
            .borrow()
            .iter()
            .any(|role| role == "Book.authors.{element}"));

        let metadata = ResultSetMetadata::from_labels(&["id", "writer_id"]);
        let mut from_clause = FromClauseIndex::new();
        let resolved = mapping
            .resolve(&metadata, &model, &mut from_clause, &config)
            .unwrap();
        let labels: Vec<&str> = resolved
            .selections
            .iter()
            .map(|s| s.column_label.as_str())
            .collect();
        assert_eq!(labels, vec!["id", "writer_id"]);

        let row = [Value::Long(1), Value::Long(42)];
        let elements = loaded_elements(RowReader::new(&resolved).read_row(&row).unwrap());
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].to_string(), "Author#42");
    }
}
