//! Plan cache behaviour across independently built mappings

#[cfg(test)]
mod plan_cache_tests {
    use std::sync::Arc;

    use resultgraph::domain_model::types::Value;
    use resultgraph::results::builders::NoExplicitMappings;
    use resultgraph::sql::jdbc_metadata::ResultSetMetadata;
    use resultgraph::sql::table_group::FromClauseIndex;
    use resultgraph::{
        DomainModel, EngineConfig, PlanCache, PlanCacheConfig, PlanCacheKey, ResultSetMapping,
        RowReader,
    };

    const SHOP: &str = include_str!("../fixtures/shop.yaml");
    const SQL: &str = "select o.id, o.total, o.customer_id from orders o";

    #[test]
    fn test_rebuilt_mapping_hits_cached_plan() {
        let model = DomainModel::from_yaml_str(SHOP).unwrap();
        let config = EngineConfig::default();
        let cache = PlanCache::new(PlanCacheConfig::from(&config));
        let metadata = ResultSetMetadata::from_labels(&["id", "total", "customer_id"]);

        let mut plans = Vec::new();
        for _ in 0..3 {
            // Every execution builds its mapping from scratch
            let mapping =
                ResultSetMapping::for_entity(&model, "Order", &NoExplicitMappings, &config)
                    .unwrap();
            let key = PlanCacheKey::new(model.name(), SQL, &mapping);
            let plan = cache
                .get_or_build(key, || {
                    let mut from_clause = FromClauseIndex::new();
                    mapping.resolve(&metadata, &model, &mut from_clause, &config)
                })
                .unwrap();
            plans.push(plan);
        }

        assert!(Arc::ptr_eq(&plans[0], &plans[2]));
        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hits, 2);
        assert!((metrics.hit_rate() - 2.0 / 3.0).abs() < 1e-9);

        let value = RowReader::new(&plans[1])
            .read_row(&[Value::Long(1), Value::Null, Value::Long(7)])
            .unwrap();
        assert!(matches!(value, Value::Entity(_)));
    }

    #[test]
    fn test_different_roots_do_not_collide() {
        let model = DomainModel::from_yaml_str(SHOP).unwrap();
        let config = EngineConfig::default();
        let order =
            ResultSetMapping::for_entity(&model, "Order", &NoExplicitMappings, &config).unwrap();
        let customer =
            ResultSetMapping::for_entity(&model, "Customer", &NoExplicitMappings, &config)
                .unwrap();

        let sql = "select * from t";
        let order_key = PlanCacheKey::new(model.name(), sql, &order);
        let customer_key = PlanCacheKey::new(model.name(), sql, &customer);
        assert_ne!(order_key, customer_key);
        assert_ne!(order_key.fingerprint(), customer_key.fingerprint());
    }
}
