//! Unit tests - Tests that exercise one public surface in isolation

mod engine_config_tests;
mod model_definition_tests;
