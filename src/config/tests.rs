//! Tests for config functionality.

use crate::config::types::{default_distributed_args, default_driver_generate_args};
use crate::config::{BackendPreference, Config};
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.bootstrap_targets, vec!["UnrealHeaderTool"]);
    assert_eq!(config.distributed_platforms, vec!["Win64", "Win32"]);
    assert_eq!(config.default_backend, BackendPreference::Distributed);
    assert_eq!(config.driver_program, "UnrealBuildTool");
    assert_eq!(config.export_glob, "*.graph.json");
    assert!(config.post_build_hooks.is_empty());
    assert_eq!(config.distributed_tool, None);
    assert_eq!(config.distributed_tool_name, "xgConsole");
    assert_eq!(config.distributed_args, "{graph_file} /Rebuild /MaxCPUS=200");
    assert_eq!(config.stop_on_errors_arg, "/StopOnErrors");
    assert_eq!(config.work_began_marker, "------Project:");
    assert_eq!(config.transient_exit_codes, vec![2, 4]);
    assert_eq!(config.connection_retries, 4);
    assert_eq!(config.connection_retry_wait(), Duration::from_secs(60));
    assert_eq!(config.local_executor, None);
    assert!(!config.show_progress);
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    // Should use all defaults
    assert_eq!(config.connection_retries, 4);
    assert_eq!(config.distributed_tool_name, "xgConsole");
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
connection_retries: 2
distributed_platforms: [Win64, Linux]
"#;
    let config = Config::from_yaml(yaml).unwrap();

    // Specified values should be used
    assert_eq!(config.connection_retries, 2);
    assert!(config.is_distributed_platform("Linux"));

    // Unspecified values should use defaults
    assert_eq!(config.connection_retry_wait_seconds, 60);
    assert_eq!(config.driver_generate_args, default_driver_generate_args());
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
bootstrap_targets: [HeaderTool, ShaderCompileWorker]
distributed_platforms: [Linux]
default_backend: local_parallel
driver_program: /opt/driver/bin/driver
driver_manifest_args: "{target} {platform} {configuration} -manifest={manifest}"
driver_generate_args: "{target} {platform} {configuration} -export={export_dir} -manifest={manifest}"
driver_build_args: "{target} {platform} {configuration} {args}"
export_glob: "*.actions.json"
post_build_hooks:
  Linux: "strip-symbols {target} {configuration}"
distributed_tool: /opt/xge/xgConsole
distributed_args: "{graph_file} /Rebuild"
stop_on_errors_arg: /Stop
work_began_marker: "== started"
transient_exit_codes: [3]
connection_retries: 1
connection_retry_wait_seconds: 5
local_executor: "parallel-exec {graph_file}"
show_progress: true
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert!(config.is_bootstrap_target("ShaderCompileWorker"));
    assert_eq!(config.default_backend, BackendPreference::LocalParallel);
    assert_eq!(config.driver_program, "/opt/driver/bin/driver");
    assert_eq!(config.export_glob, "*.actions.json");
    assert_eq!(
        config.post_build_hook("Linux"),
        Some("strip-symbols {target} {configuration}")
    );
    assert_eq!(config.distributed_tool.as_deref(), Some("/opt/xge/xgConsole"));
    assert_eq!(config.transient_exit_codes, vec![3]);
    assert_eq!(config.connection_retry_wait(), Duration::from_secs(5));
    assert_eq!(
        config.local_executor.as_deref(),
        Some("parallel-exec {graph_file}")
    );
    assert!(config.show_progress);
}

#[test]
fn test_parse_yaml_with_unknown_fields() {
    // Unknown fields should be silently ignored for forward compatibility
    let yaml = r#"
connection_retries: 3
unknown_field: "some value"
another_unknown:
  nested: true
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.connection_retries, 3);
    assert_eq!(config.distributed_tool_name, "xgConsole");
}

#[test]
fn test_validate_empty_driver_program() {
    let result = Config::from_yaml("driver_program: \"  \"");

    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.to_string().contains("driver_program"));
    assert!(err.to_string().contains("non-empty"));
}

#[test]
fn test_validate_invalid_export_glob() {
    let result = Config::from_yaml("export_glob: \"[*.json\"");

    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.to_string().contains("export_glob"));
    assert!(err.to_string().contains("not a valid glob"));
}

#[test]
fn test_validate_zero_transient_exit_code() {
    let result = Config::from_yaml("transient_exit_codes: [0, 4]");

    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("transient_exit_codes must not contain 0")
    );
}

#[test]
fn test_validate_distributed_args_needs_graph_file() {
    let result = Config::from_yaml("distributed_args: \"/Rebuild\"");

    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.to_string().contains("distributed_args"));
    assert!(err.to_string().contains("{graph_file}"));
}

#[test]
fn test_validate_local_executor_needs_graph_file() {
    let result = Config::from_yaml("local_executor: \"parallel-exec\"");

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("local_executor"));
}

#[test]
fn test_backend_preference_parsing() {
    let config = Config::from_yaml("default_backend: distributed").unwrap();
    assert_eq!(config.default_backend, BackendPreference::Distributed);

    let config = Config::from_yaml("default_backend: direct").unwrap();
    assert_eq!(config.default_backend, BackendPreference::Direct);

    assert!(Config::from_yaml("default_backend: remote").is_err());
}

#[test]
fn test_target_and_platform_matching_ignores_case() {
    let config = Config::default();

    assert!(config.is_bootstrap_target("unrealheadertool"));
    assert!(!config.is_bootstrap_target("Game"));
    assert!(config.is_distributed_platform("win64"));
    assert!(!config.is_distributed_platform("Linux"));
}

#[test]
fn test_to_yaml() {
    let config = Config::default();
    let yaml = config.to_yaml().unwrap();

    // Should be valid YAML that can be parsed back
    let parsed = Config::from_yaml(&yaml).unwrap();
    assert_eq!(parsed.distributed_args, default_distributed_args());
    assert_eq!(parsed.bootstrap_targets, config.bootstrap_targets);
}

#[test]
fn test_config_load_from_file() {
    use std::io::Write;
    use tempfile::NamedTempFile;

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "connection_retries: 7").unwrap();
    writeln!(file, "driver_program: ubt").unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.connection_retries, 7);
    assert_eq!(config.driver_program, "ubt");
}

#[test]
fn test_config_load_missing_file() {
    let result = Config::load("/nonexistent/path/config.yaml");
    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn test_config_load_or_default_missing_file() {
    let config = Config::load_or_default("/nonexistent/path/config.yaml").unwrap();
    assert_eq!(config.connection_retries, 4);
}
