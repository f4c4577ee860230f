use serde::Serialize;

use crate::domain_model::fetchable::{create_table_group_join, generate_fetch};
use crate::domain_model::model_part::{FetchTiming, ModelPartKind, ModelPartRef, PluralPart};
use crate::navigable_path::{NavigablePath, ELEMENT_SEGMENT, INDEX_SEGMENT};
use crate::results::builders::{fetch_builder_for, unsupported, CacheKeyCopy, FetchBuilderMap};
use crate::results::creation_state::{BuilderContext, DomainResultCreationState};
use crate::results::errors::MappingError;
use crate::results::graph::{CollectionFetch, Fetch};
use crate::sql::table_group::JoinType;

/// Collection container. Honours the configured fetch timing.
///
/// Element and index builders are resolved at construction, resolver first,
/// and kept as children: the index (when the collection has one) precedes
/// the element. An immediate collection left-joins its table and reads both
/// through those children; a delayed one adds no join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImplicitPluralFetchBuilder {
    fetch_path: NavigablePath,
    part: ModelPartRef,
    children: FetchBuilderMap,
}

fn plural(part: &ModelPartRef) -> Result<&PluralPart, MappingError> {
    match part.kind() {
        ModelPartKind::Plural(plural) => Ok(plural),
        _ => Err(unsupported(part, "as a collection")),
    }
}

impl ImplicitPluralFetchBuilder {
    pub fn new(
        fetch_path: &NavigablePath,
        part: &ModelPartRef,
        ctx: &mut BuilderContext<'_>,
    ) -> Result<Self, MappingError> {
        let collection = plural(part)?;
        let mut children = FetchBuilderMap::new();
        if let Some(index) = &collection.index {
            let child = fetch_builder_for(&fetch_path.append(INDEX_SEGMENT), index, ctx)?;
            children.insert(index.clone(), child);
        }
        let element = &collection.element;
        let child = fetch_builder_for(&fetch_path.append(ELEMENT_SEGMENT), element, ctx)?;
        children.insert(element.clone(), child);

        Ok(ImplicitPluralFetchBuilder {
            fetch_path: fetch_path.clone(),
            part: part.clone(),
            children,
        })
    }

    pub fn fetch_path(&self) -> &NavigablePath {
        &self.fetch_path
    }

    pub fn part(&self) -> &ModelPartRef {
        &self.part
    }

    pub fn children(&self) -> &FetchBuilderMap {
        &self.children
    }

    pub fn build_fetch(
        &self,
        parent_path: &NavigablePath,
        fetch_path: &NavigablePath,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<Fetch, MappingError> {
        let collection = plural(&self.part)?;
        if collection.timing == FetchTiming::Delayed {
            return generate_fetch(
                &self.part,
                fetch_path,
                parent_path,
                collection.timing,
                false,
                state,
            );
        }

        let part = &self.part;
        let group = state.resolve_table_group(fetch_path, Some(parent_path), &mut |parent, aliases| {
            create_table_group_join(part, fetch_path, parent, JoinType::Left, true, aliases)
        })?;
        let index = match &collection.index {
            Some(index) => Some(Box::new(
                self.child_fetch(index, INDEX_SEGMENT, fetch_path, state)?,
            )),
            None => None,
        };
        let element = self.child_fetch(&collection.element, ELEMENT_SEGMENT, fetch_path, state)?;

        Ok(Fetch::Collection(CollectionFetch {
            path: fetch_path.clone(),
            name: self.part.name().to_string(),
            role: self.part.role().to_string(),
            timing: collection.timing,
            table_alias: Some(group.alias),
            element: Some(Box::new(element)),
            index,
        }))
    }

    fn child_fetch(
        &self,
        part: &ModelPartRef,
        segment: &str,
        fetch_path: &NavigablePath,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<Fetch, MappingError> {
        let child = self
            .children
            .get(part)
            .ok_or_else(|| unsupported(part, "without a collection part builder"))?;
        child.build_fetch(fetch_path, &fetch_path.append(segment), state)
    }
}

impl CacheKeyCopy for ImplicitPluralFetchBuilder {
    fn cache_key_copy(&self) -> Self {
        ImplicitPluralFetchBuilder {
            fetch_path: self.fetch_path.clone(),
            part: self.part.clone(),
            children: self.children.cache_key_copy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::fetchable::create_root_table_group;
    use crate::domain_model::types::{CollectionState, TypeRegistry, Value};
    use crate::results::builders::resolver::NoExplicitMappings;
    use crate::domain_model::DomainModel;
    use crate::sql::jdbc_metadata::ResultSetMetadata;
    use crate::sql::table_group::{FromClauseIndex, TableGroupCreation, TableGroupResolver};

    const MODEL: &str = r#"
name: blog
entities:
  - name: Post
    table: posts
    id: { kind: basic, name: id, type: long }
    attributes:
      - kind: plural
        name: tags
        table: post_tags
        key_columns: [post_id]
        element: { kind: basic, column: tag, type: string }
      - kind: plural
        name: ratings
        table: post_ratings
        key_columns: [post_id]
        element: { kind: basic, column: stars, type: integer }
        index: { kind: basic, column: reviewer, type: string }
        fetch: immediate
"#;

    fn build(name: &str, labels: &[&str]) -> (Fetch, FromClauseIndex) {
        let model = DomainModel::from_yaml_str(MODEL).unwrap();
        let post = model.entity("Post").unwrap();
        let part = post.find_sub_part(name).unwrap().clone();
        let root = NavigablePath::root("Post");
        let path = root.append(name);
        let mut ctx = BuilderContext::new(&model, &NoExplicitMappings);
        let builder = ImplicitPluralFetchBuilder::new(&path, &part, &mut ctx).unwrap();

        let metadata = ResultSetMetadata::from_labels(labels);
        let types = TypeRegistry::standard();
        let mut from_clause = FromClauseIndex::new();
        from_clause
            .resolve_or_create(&root, None, &mut |_, aliases| {
                Ok::<TableGroupCreation, MappingError>(create_root_table_group(post, &root, aliases))
            })
            .unwrap();
        let mut state = DomainResultCreationState::new(&model, &metadata, &types, &mut from_clause);
        let fetch = builder.build_fetch(&root, &path, &mut state).unwrap();
        drop(state);
        (fetch, from_clause)
    }

    #[test]
    fn test_index_and_element_are_child_builders() {
        let model = DomainModel::from_yaml_str(MODEL).unwrap();
        let ratings = model
            .entity("Post")
            .unwrap()
            .find_sub_part("ratings")
            .unwrap()
            .clone();
        let path = NavigablePath::root("Post").append("ratings");
        let mut ctx = BuilderContext::new(&model, &NoExplicitMappings);
        let builder = ImplicitPluralFetchBuilder::new(&path, &ratings, &mut ctx).unwrap();

        let roles: Vec<&str> = builder.children().keys().map(|p| p.role()).collect();
        assert_eq!(roles, vec!["Post.ratings.{index}", "Post.ratings.{element}"]);
        let copy = builder.cache_key_copy();
        assert_eq!(copy, builder);
        let (_, original) = builder.children().iter().next().unwrap();
        let (_, copied) = copy.children().iter().next().unwrap();
        assert!(!std::sync::Arc::ptr_eq(original, copied));
    }

    #[test]
    fn test_delayed_collection_adds_no_join() {
        let (fetch, from_clause) = build("tags", &["id"]);
        assert_eq!(from_clause.physical_join_count(), 0);
        let Fetch::Collection(collection) = &fetch else {
            panic!("expected collection fetch");
        };
        assert_eq!(collection.timing, FetchTiming::Delayed);
        let Value::Collection(value) = fetch.assemble(&[Value::Long(4)], &Value::Long(4)).unwrap() else {
            panic!("expected collection value");
        };
        assert_eq!(value.state, CollectionState::Delayed);
        assert_eq!(*value.owner_key, Value::Long(4));
    }

    #[test]
    fn test_immediate_collection_left_joins_and_reads_entries() {
        let (fetch, from_clause) = build("ratings", &["id", "stars", "reviewer"]);
        assert_eq!(
            from_clause.to_sql(),
            "posts p1_0 left join post_ratings p2_0 on p2_0.post_id=p1_0.id"
        );
        let row = [Value::Long(4), Value::Int(5), Value::text("ann")];
        let Value::Collection(value) = fetch.assemble(&row, &Value::Long(4)).unwrap() else {
            panic!("expected collection value");
        };
        let CollectionState::Loaded { entries } = value.state else {
            panic!("expected loaded collection");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].element, Value::Int(5));
        assert_eq!(entries[0].index, Some(Value::text("ann")));

        let empty = [Value::Long(4), Value::Null, Value::Null];
        let Value::Collection(value) = fetch.assemble(&empty, &Value::Long(4)).unwrap() else {
            panic!("expected collection value");
        };
        assert_eq!(value.state, CollectionState::Loaded { entries: vec![] });
    }
}
