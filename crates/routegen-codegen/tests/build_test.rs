//! Integration tests for full package builds.
//!
//! Runs the complete pipeline from a registry to files on disk and checks
//! the properties a consumer of the generated package relies on.

use routegen_codegen::package::{BuildOptions, MODULE_MAP_FILE, PackageBuilder};
use routegen_codegen::{BuildReport, ModuleMap};
use routegen_core::cli::ExitCode;
use routegen_core::schema::{Field, FieldType, ProviderSchema, ProviderSchemaSet};
use routegen_core::{BuildConfig, RoutePath, RouteRegistration, StaticRegistry};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn path(raw: &str) -> RoutePath {
    RoutePath::parse(raw).unwrap()
}

/// The minimal registry from the package layout documentation.
fn cpi_registry() -> StaticRegistry {
    StaticRegistry::new()
        .with_route(
            RouteRegistration::new(path("/econ/cpi"))
                .with_summary("Consumer Price Index.")
                .with_model("ConsumerPriceIndex")
                .with_result("ConsumerPriceIndexData"),
        )
        .with_model(
            "ConsumerPriceIndex",
            ProviderSchemaSet::new().provider(
                "fred",
                ProviderSchema::new()
                    .query(
                        Field::new("country", FieldType::Str)
                            .required()
                            .with_description("The country to get data for."),
                    )
                    .query(
                        Field::new("units", FieldType::Str).with_choices(["growth_same", "index"]),
                    )
                    .result(Field::new("date", FieldType::Date))
                    .result(Field::new("value", FieldType::Float)),
            ),
        )
}

/// A wider registry with several providers, namespaces and a native route.
fn market_registry() -> StaticRegistry {
    cpi_registry()
        .with_route(
            RouteRegistration::new(path("/equity/price/historical"))
                .with_summary("Historical prices.")
                .with_model("EquityHistorical")
                .with_result("EquityHistoricalData"),
        )
        .with_route(RouteRegistration::new(path("/news/world")).with_summary("World news."))
        .with_model(
            "EquityHistorical",
            ProviderSchemaSet::new()
                .provider(
                    "standard",
                    ProviderSchema::new()
                        .query(Field::new("symbol", FieldType::Str).required())
                        .query(Field::new("start_date", FieldType::Date)),
                )
                .provider(
                    "fmp",
                    ProviderSchema::new()
                        .query(Field::new("symbol", FieldType::Str).required())
                        .query(Field::new("start_date", FieldType::Date))
                        .query(Field::new("limit", FieldType::Int).with_default(json!(100))),
                )
                .provider(
                    "intrinio",
                    ProviderSchema::new()
                        .query(Field::new("symbol", FieldType::Str).required())
                        .query(Field::new("start_date", FieldType::Date))
                        .query(Field::new("interval", FieldType::Str).with_choices(["1d", "1h"])),
                ),
        )
}

fn config(output_dir: &Path) -> BuildConfig {
    BuildConfig::builder()
        .output_dir(output_dir)
        .formatters(Vec::new())
        .build()
}

fn build(registry: &StaticRegistry, output_dir: &Path, options: BuildOptions) -> BuildReport {
    PackageBuilder::new(registry, config(output_dir))
        .with_options(options.without_formatters())
        .build()
        .unwrap()
}

/// Reads every file under `dir` into a name to content map.
fn snapshot(dir: &Path) -> BTreeMap<String, String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (
                entry.file_name().to_string_lossy().into_owned(),
                fs::read_to_string(entry.path()).unwrap(),
            )
        })
        .collect()
}

fn read_map(dir: &Path) -> ModuleMap {
    ModuleMap::from_json_str(&fs::read_to_string(dir.join(MODULE_MAP_FILE)).unwrap()).unwrap()
}

#[test]
fn test_cpi_package_layout() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    build(&cpi_registry(), &out, BuildOptions::default());

    let files: Vec<_> = snapshot(&out).into_keys().collect();
    assert_eq!(
        files,
        vec![
            "__extensions__.py",
            "__init__.py",
            "econ.py",
            "econ_cpi.py",
            "module_map.json",
        ]
    );

    let map = read_map(&out);
    assert_eq!(map.len(), 2);
    let entries: Vec<_> = map
        .iter()
        .map(|(id, p)| (id.as_str().to_string(), p.to_string()))
        .collect();
    assert_eq!(
        entries,
        vec![
            ("econ".to_string(), "/econ".to_string()),
            ("econ_cpi".to_string(), "/econ/cpi".to_string()),
        ]
    );

    let econ = fs::read_to_string(out.join("econ.py")).unwrap();
    assert!(econ.contains("    @property\n    def cpi(self):\n        from . import econ_cpi\n"));

    let cpi = fs::read_to_string(out.join("econ_cpi.py")).unwrap();
    assert!(cpi.contains("        country: str,\n"));
    assert!(cpi.contains("        units: "));
    assert!(cpi.contains("        provider: Optional[Literal[\"fred\"]] = None,\n"));
    assert!(cpi.contains("        **extra: Any,\n"));
    assert!(cpi.contains("    ) -> CommandResult[List[ConsumerPriceIndexData]]:\n"));
}

#[test]
fn test_build_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    let registry = market_registry();

    build(&registry, &out, BuildOptions::default());
    let first = snapshot(&out);
    let report = build(&registry, &out, BuildOptions::default());
    let second = snapshot(&out);

    assert_eq!(first, second);
    assert!(report.stale_removed.is_empty());
}

#[test]
fn test_every_path_has_a_module() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    build(&market_registry(), &out, BuildOptions::default());

    let map = read_map(&out);
    let routes: Vec<_> = map.iter().map(|(_, p)| p.to_string()).collect();
    assert_eq!(
        routes,
        vec![
            "/econ",
            "/econ/cpi",
            "/equity",
            "/equity/price",
            "/equity/price/historical",
            "/news",
            "/news/world",
        ]
    );
    for identifier in map.identifiers() {
        assert!(
            out.join(format!("{identifier}.py")).is_file(),
            "{identifier}.py missing"
        );
    }
}

#[test]
fn test_navigators_import_no_children_at_top_level() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    build(&market_registry(), &out, BuildOptions::default());

    for name in ["__extensions__.py", "econ.py", "equity.py", "equity_price.py", "news.py"] {
        let content = fs::read_to_string(out.join(name)).unwrap();
        let top_level: Vec<_> = content
            .lines()
            .filter(|l| l.starts_with("import ") || l.starts_with("from "))
            .collect();
        assert_eq!(
            top_level,
            vec!["from routegen_runtime.container import Container"],
            "{name} imports eagerly"
        );
    }

    let root = fs::read_to_string(out.join("__extensions__.py")).unwrap();
    let accessors: Vec<_> = root
        .lines()
        .filter_map(|l| l.trim().strip_prefix("def "))
        .collect();
    assert_eq!(
        accessors,
        vec!["__repr__(self) -> str:", "econ(self):", "equity(self):", "news(self):"]
    );
}

#[test]
fn test_output_independent_of_registration_order() {
    let temp = TempDir::new().unwrap();
    let forward_dir = temp.path().join("forward");
    let backward_dir = temp.path().join("backward");

    let routes = ["/b/two", "/a/one", "/c", "/a/three"];
    let forward = routes.iter().fold(StaticRegistry::new(), |r, p| {
        r.with_route(RouteRegistration::new(path(p)).with_summary("Command."))
    });
    let backward = routes.iter().rev().fold(StaticRegistry::new(), |r, p| {
        r.with_route(RouteRegistration::new(path(p)).with_summary("Command."))
    });

    build(&forward, &forward_dir, BuildOptions::default());
    build(&backward, &backward_dir, BuildOptions::default());
    assert_eq!(snapshot(&forward_dir), snapshot(&backward_dir));
}

#[test]
fn test_parameters_are_unified_across_providers() {
    let temp = TempDir::new().unwrap();
    let registry = market_registry();
    let builder = PackageBuilder::new(&registry, config(temp.path()));
    let schema = builder.inspect(&path("/equity/price/historical")).unwrap();

    let names: Vec<_> = schema.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["symbol", "start_date", "limit", "interval", "provider", "extra"]
    );
    assert!(schema.parameter("symbol").unwrap().required);
    assert!(!schema.parameter("limit").unwrap().required);
    let limit_providers: Vec<_> = schema
        .parameter("limit")
        .unwrap()
        .providers
        .iter()
        .map(|p| p.as_str())
        .collect();
    assert_eq!(limit_providers, vec!["fmp"]);

    let selectable: Vec<_> = schema.selectable_providers().map(ToString::to_string).collect();
    assert_eq!(selectable, vec!["fmp", "intrinio"]);
}

#[test]
fn test_colliding_paths_get_distinct_modules() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    let registry = StaticRegistry::new()
        .with_route(RouteRegistration::new(path("/equity/price")).with_summary("Nested."))
        .with_route(RouteRegistration::new(path("/equity-price")).with_summary("Flat."));
    build(&registry, &out, BuildOptions::default());

    let map = read_map(&out);
    let nested = map
        .iter()
        .find(|(_, p)| p.as_str() == "/equity/price")
        .map(|(id, _)| id.clone())
        .unwrap();
    let flat = map
        .iter()
        .find(|(_, p)| p.as_str() == "/equity-price")
        .map(|(id, _)| id.clone())
        .unwrap();

    assert_ne!(nested, flat);
    assert!(nested.as_str().starts_with("equity_price_"));
    assert!(flat.as_str().starts_with("equity_price_"));
    assert!(out.join(format!("{nested}.py")).is_file());
    assert!(out.join(format!("{flat}.py")).is_file());
}

#[test]
fn test_stale_modules_are_removed() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    build(&market_registry(), &out, BuildOptions::default());
    assert!(out.join("news_world.py").is_file());

    let report = build(&cpi_registry(), &out, BuildOptions::default());
    assert!(report.stale_removed.contains(&"news_world.py".to_string()));
    assert!(report.stale_removed.contains(&"news.py".to_string()));
    assert!(!out.join("news_world.py").exists());
    assert!(!out.join("equity_price_historical.py").exists());
    assert_eq!(read_map(&out).len(), 2);
}

#[test]
fn test_stale_cleanup_can_be_disabled() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    build(&market_registry(), &out, BuildOptions::default());

    let config = BuildConfig::builder()
        .output_dir(&out)
        .formatters(Vec::new())
        .clean_stale(false)
        .build();
    let registry = cpi_registry();
    let report = PackageBuilder::new(&registry, config).build().unwrap();

    assert!(report.stale_removed.is_empty());
    assert!(out.join("news_world.py").is_file());
}

#[test]
fn test_subset_build_keeps_other_modules() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    let registry = market_registry();
    build(&registry, &out, BuildOptions::default());
    fs::write(out.join("news_world.py"), "# edited\n").unwrap();

    let report = build(
        &registry,
        &out,
        BuildOptions::default().with_paths([path("/econ")]),
    );

    assert!(report.modules_written.contains(&"econ_cpi.py".to_string()));
    assert!(report.modules_written.contains(&"__extensions__.py".to_string()));
    assert!(!report.modules_written.contains(&"news_world.py".to_string()));
    assert!(report.stale_removed.is_empty());
    assert_eq!(fs::read_to_string(out.join("news_world.py")).unwrap(), "# edited\n");
    assert_eq!(read_map(&out).len(), 7);
}

#[test]
fn test_native_module_is_left_untouched() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("news_local.py"), "# hand written\n").unwrap();

    let registry =
        market_registry().with_route(RouteRegistration::new(path("/news/local")).native());
    let report = build(&registry, &out, BuildOptions::default());

    assert_eq!(report.modules_skipped_native, vec!["news_local.py".to_string()]);
    assert!(!report.modules_written.contains(&"news_local.py".to_string()));
    assert_eq!(
        fs::read_to_string(out.join("news_local.py")).unwrap(),
        "# hand written\n"
    );

    let news = fs::read_to_string(out.join("news.py")).unwrap();
    assert!(news.contains("def local(self):"));

    // A rebuild never treats the native module as stale.
    let report = build(&registry, &out, BuildOptions::default());
    assert!(report.stale_removed.is_empty());
    assert!(out.join("news_local.py").is_file());
}

#[test]
fn test_conflicts_are_reported_together() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    let registry = StaticRegistry::new()
        .with_route(RouteRegistration::new(path("/a/one")).with_model("One"))
        .with_route(RouteRegistration::new(path("/a/two")).with_model("Two"))
        .with_model(
            "One",
            ProviderSchemaSet::new()
                .provider("x", ProviderSchema::new().query(Field::new("p", FieldType::Dict)))
                .provider("y", ProviderSchema::new().query(Field::new("p", FieldType::Int))),
        )
        .with_model(
            "Two",
            ProviderSchemaSet::new()
                .provider(
                    "x",
                    ProviderSchema::new().query(Field::new("q", FieldType::list(FieldType::Int))),
                )
                .provider("y", ProviderSchema::new().query(Field::new("q", FieldType::Str))),
        );

    let err = PackageBuilder::new(&registry, config(&out))
        .with_options(BuildOptions::default().without_formatters())
        .build()
        .unwrap_err();

    let paths: Vec<_> = err
        .diagnostics()
        .iter()
        .filter_map(|e| e.route_path())
        .collect();
    assert_eq!(paths, vec!["/a/one", "/a/two"]);
    assert_eq!(ExitCode::from_error(&err), ExitCode::CONFLICT_ERROR);
    assert!(!out.exists(), "failed build must not write anything");
}

#[test]
fn test_structural_errors_outrank_conflicts() {
    let temp = TempDir::new().unwrap();
    let registry = StaticRegistry::new()
        .with_route(RouteRegistration::new(path("/a/native")).native())
        .with_route(RouteRegistration::new(path("/a/one")).with_model("One"))
        .with_model(
            "One",
            ProviderSchemaSet::new()
                .provider("x", ProviderSchema::new().query(Field::new("p", FieldType::Dict)))
                .provider("y", ProviderSchema::new().query(Field::new("p", FieldType::Int))),
        );

    let err = PackageBuilder::new(&registry, config(temp.path()))
        .plan()
        .unwrap_err();
    assert_eq!(err.diagnostics().len(), 2);
    assert_eq!(ExitCode::from_error(&err), ExitCode::STRUCTURAL_ERROR);
}

#[test]
fn test_deprecated_route_warns_at_call_time() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    let registry = cpi_registry().with_route(
        RouteRegistration::new(path("/econ/inflation"))
            .with_summary("Old inflation endpoint.")
            .with_model("ConsumerPriceIndex")
            .deprecated("4.1", "Use /econ/cpi instead."),
    );
    build(&registry, &out, BuildOptions::default());

    let content = fs::read_to_string(out.join("econ_inflation.py")).unwrap();
    assert!(content.contains("import warnings as _warnings\n"));
    assert!(content.contains("        _warnings.warn(\n"));
    assert!(content.contains(".. deprecated:: 4.1"));
    assert!(content.contains("Deprecated since 4.1. Use /econ/cpi instead."));
}

#[test]
fn test_empty_registry_builds_root_only() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("extensions");
    build(&StaticRegistry::new(), &out, BuildOptions::default());

    let files: Vec<_> = snapshot(&out).into_keys().collect();
    assert_eq!(files, vec!["__extensions__.py", "__init__.py", "module_map.json"]);
    assert!(read_map(&out).is_empty());
}
