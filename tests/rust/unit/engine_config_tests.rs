//! Engine configuration loading from the environment and YAML files

#[cfg(test)]
mod engine_config_tests {
    use std::io::Write;

    use resultgraph::{ConfigError, EngineConfig};
    use serial_test::serial;

    const VARS: [&str; 4] = [
        "RESULTGRAPH_MAX_FETCH_DEPTH",
        "RESULTGRAPH_ALLOW_POSITIONAL_SELECTIONS",
        "RESULTGRAPH_PLAN_CACHE_ENABLED",
        "RESULTGRAPH_PLAN_CACHE_MAX_ENTRIES",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("RESULTGRAPH_MAX_FETCH_DEPTH", "4");
        std::env::set_var("RESULTGRAPH_ALLOW_POSITIONAL_SELECTIONS", "false");
        let config = EngineConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.max_fetch_depth, 4);
        assert!(!config.allow_positional_selections);
        assert!(config.plan_cache_enabled);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_values() {
        clear_env();
        std::env::set_var("RESULTGRAPH_PLAN_CACHE_MAX_ENTRIES", "lots");
        let parse_err = EngineConfig::from_env().unwrap_err();
        std::env::set_var("RESULTGRAPH_PLAN_CACHE_MAX_ENTRIES", "0");
        let range_err = EngineConfig::from_env().unwrap_err();
        clear_env();

        assert!(matches!(parse_err, ConfigError::Parse { ref field, .. } if field == "RESULTGRAPH_PLAN_CACHE_MAX_ENTRIES"));
        assert!(matches!(range_err, ConfigError::Validation(_)));
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_from_env_rejects_non_unicode_value() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        clear_env();
        std::env::set_var(
            "RESULTGRAPH_MAX_FETCH_DEPTH",
            OsStr::from_bytes(&[0x66, 0x6f, 0x80]),
        );
        let err = EngineConfig::from_env().unwrap_err();
        clear_env();

        assert!(matches!(
            err,
            ConfigError::EnvVar(std::env::VarError::NotUnicode(_))
        ));
    }

    #[test]
    fn test_from_yaml_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_fetch_depth: 8\nplan_cache_enabled: false").unwrap();

        let config = EngineConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.max_fetch_depth, 8);
        assert!(!config.plan_cache_enabled);
        assert_eq!(config.plan_cache_max_entries, 256);
    }

    #[test]
    fn test_from_yaml_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_fetch_depth: 100").unwrap();
        assert!(matches!(
            EngineConfig::from_yaml_file(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }
}
