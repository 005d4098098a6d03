//! Integration tests for loading registries and build configuration from disk.

use routegen_core::cli::ExitCode;
use routegen_core::registry::validate_registry;
use routegen_core::{
    BuildConfig, DEFAULT_CONFIG_FILE, Error, RoutePath, RouteRegistry, StaticRegistry,
};
use std::fs;
use tempfile::TempDir;

const REGISTRY: &str = r#"{
    "routes": [
        {
            "path": "/equity/price/historical",
            "summary": "Historical prices.",
            "model_name": "EquityHistorical",
            "result_model": "EquityHistoricalData",
            "examples": [
                {"description": "Daily bars.", "parameters": {"symbol": "AAPL"}}
            ]
        },
        {
            "path": "/equity/price/quote",
            "summary": "Latest quote.",
            "deprecated": {"since": "4.2", "message": "Use /equity/price/historical."},
            "parameters": [
                {"name": "symbol", "type": {"kind": "str"}, "required": true}
            ]
        }
    ],
    "models": {
        "EquityHistorical": {
            "providers": {
                "standard": {
                    "query": [
                        {"name": "symbol", "type": {"kind": "str"}, "required": true}
                    ]
                },
                "fmp": {
                    "query": [
                        {"name": "symbol", "type": {"kind": "str"}, "required": true},
                        {"name": "limit", "type": {"kind": "int"}, "default": 100}
                    ],
                    "result": [
                        {"name": "close", "type": {"kind": "float"}}
                    ]
                }
            }
        }
    }
}"#;

fn path(raw: &str) -> RoutePath {
    RoutePath::parse(raw).unwrap()
}

#[test]
fn test_load_registry_from_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("routes.json");
    fs::write(&file, REGISTRY).unwrap();

    let registry = StaticRegistry::from_file(&file).unwrap();
    let paths: Vec<_> = registry.list_paths().into_iter().map(String::from).collect();
    assert_eq!(paths, vec!["/equity/price/historical", "/equity/price/quote"]);

    let quote = registry.get_registration(&path("/equity/price/quote")).unwrap();
    assert_eq!(quote.parameters.len(), 1);
    assert_eq!(quote.deprecated.as_ref().unwrap().since, "4.2");

    let historical = registry
        .get_registration(&path("/equity/price/historical"))
        .unwrap();
    assert_eq!(historical.examples.len(), 1);

    let providers: Vec<_> = registry
        .get_provider_schema("EquityHistorical")
        .unwrap()
        .provider_names()
        .map(|p| p.as_str().to_string())
        .collect();
    assert_eq!(providers, vec!["fmp", "standard"]);

    assert!(validate_registry(&registry, "standard").is_ok());
}

#[test]
fn test_missing_registry_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let err = StaticRegistry::from_file(temp.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert_eq!(ExitCode::from_error(&err), ExitCode::ERROR);
}

#[test]
fn test_malformed_registry_maps_to_schema_exit_code() {
    let err = StaticRegistry::from_json_str(r#"{"routes": [{"path": "/a//b"}]}"#).unwrap_err();
    assert!(err.is_schema_error());
    assert_eq!(ExitCode::from_error(&err), ExitCode::SCHEMA_ERROR);
}

#[test]
fn test_registry_survives_file_round_trip() {
    let temp = TempDir::new().unwrap();
    let original = StaticRegistry::from_json_str(REGISTRY).unwrap();
    let file = temp.path().join("copy.json");
    fs::write(&file, original.to_json_string().unwrap()).unwrap();

    let copy = StaticRegistry::from_file(&file).unwrap();
    assert_eq!(copy.list_paths(), original.list_paths());
    assert_eq!(
        copy.get_provider_schema("EquityHistorical"),
        original.get_provider_schema("EquityHistorical")
    );
}

#[test]
fn test_load_config_from_working_dir() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(DEFAULT_CONFIG_FILE),
        r#"
output_dir = "pkg"
generic_provider = "common"
provider_priority = ["fmp", "intrinio"]
clean_stale = false
formatters = []
"#,
    )
    .unwrap();

    let config = BuildConfig::load(None, temp.path()).unwrap();
    assert_eq!(config.output_dir.to_str(), Some("pkg"));
    assert_eq!(config.generic_provider, "common");
    assert_eq!(config.provider_priority, vec!["fmp", "intrinio"]);
    assert!(!config.clean_stale);
    assert!(config.formatters.is_empty());
    assert_eq!(config.runtime_package, "routegen_runtime");
}

#[test]
fn test_explicit_config_wins() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(DEFAULT_CONFIG_FILE), "output_dir = \"implicit\"\n").unwrap();
    let explicit = temp.path().join("custom.toml");
    fs::write(&explicit, "output_dir = \"explicit\"\n").unwrap();

    let config = BuildConfig::load(Some(&explicit), temp.path()).unwrap();
    assert_eq!(config.output_dir.to_str(), Some("explicit"));
}

#[test]
fn test_defaults_without_config_file() {
    let temp = TempDir::new().unwrap();
    let config = BuildConfig::load(None, temp.path()).unwrap();
    assert_eq!(config, BuildConfig::default());
}

#[test]
fn test_unknown_config_key_is_invalid_input() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("bad.toml");
    fs::write(&file, "output = \"pkg\"\n").unwrap();

    let err = BuildConfig::from_file(&file).unwrap_err();
    assert!(err.is_config_error());
    assert_eq!(ExitCode::from_error(&err), ExitCode::INVALID_INPUT);
}

#[test]
fn test_config_survives_toml_round_trip() {
    let config = BuildConfig::builder()
        .output_dir("out")
        .provider_priority(["fmp"])
        .clean_stale(false)
        .build();
    let reparsed = BuildConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
    assert_eq!(reparsed, config);
}
