//! Integration tests - Tests that run whole mappings against a model fixture
//!
//! These tests verify that model loading, builder construction, resolution
//! and row reading work together correctly.

mod collection_mapping_tests;
mod entity_mapping_tests;
mod plan_cache_tests;
