//! Integration tests for filesystem export and stale cleanup.

use routegen_files::{ExportOptions, FilesBuilder, remove_stale_files};
use std::fs;
use tempfile::TempDir;

/// A package-shaped file set: map, navigators, command modules, init.
fn package_files(leaves: &[&str]) -> FilesBuilder {
    let mut builder = FilesBuilder::new()
        .add_file("/module_map.json", "{}\n")
        .add_file("/__init__.py", "from .__extensions__ import Extensions\n")
        .add_file("/__extensions__.py", "class Extensions: ...\n");
    for leaf in leaves {
        builder = builder.add_file(format!("/{leaf}.py"), format!("class CLASS_{leaf}: ...\n"));
    }
    builder
}

#[test]
fn test_export_and_verify_content() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("extensions");

    let fs_set = package_files(&["econ", "econ_cpi"]).build().unwrap();
    fs_set.export_to_filesystem(&out).unwrap();

    assert_eq!(fs_set.file_count(), 5);
    for name in ["module_map.json", "__init__.py", "__extensions__.py", "econ.py", "econ_cpi.py"] {
        assert!(out.join(name).is_file(), "{name} should exist");
    }
    assert_eq!(
        fs::read_to_string(out.join("econ_cpi.py")).unwrap(),
        "class CLASS_econ_cpi: ...\n"
    );
}

#[test]
fn test_export_leaves_no_temp_files() {
    let temp_dir = TempDir::new().unwrap();
    package_files(&["a", "b", "c"])
        .build()
        .unwrap()
        .export_to_filesystem(temp_dir.path())
        .unwrap();

    let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_export_overwrites_previous_build() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("econ.py"), "old\n").unwrap();

    FilesBuilder::new()
        .add_file("/econ.py", "new\n")
        .build()
        .unwrap()
        .export_to_filesystem(temp_dir.path())
        .unwrap();

    assert_eq!(fs::read_to_string(temp_dir.path().join("econ.py")).unwrap(), "new\n");
}

#[test]
fn test_export_without_overwrite_keeps_existing() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("native.py"), "# hand written\n").unwrap();

    FilesBuilder::new()
        .add_file("/native.py", "# generated\n")
        .add_file("/other.py", "# generated\n")
        .build()
        .unwrap()
        .export_to_filesystem_with_options(
            temp_dir.path(),
            &ExportOptions::default().with_overwrite(false),
        )
        .unwrap();

    assert_eq!(
        fs::read_to_string(temp_dir.path().join("native.py")).unwrap(),
        "# hand written\n"
    );
    assert!(temp_dir.path().join("other.py").is_file());
}

#[test]
fn test_from_relative_roots_files_under_base() {
    let temp_dir = TempDir::new().unwrap();
    let fs_set = FilesBuilder::from_relative("/pkg", [("econ.py", "pass\n"), ("news.py", "pass\n")])
        .build()
        .unwrap();
    fs_set.export_to_filesystem(temp_dir.path()).unwrap();

    assert!(temp_dir.path().join("pkg/econ.py").is_file());
    assert!(temp_dir.path().join("pkg/news.py").is_file());
}

#[test]
fn test_remove_stale_after_rebuild() {
    let temp_dir = TempDir::new().unwrap();
    package_files(&["econ", "econ_cpi", "news", "news_world"])
        .build()
        .unwrap()
        .export_to_filesystem(temp_dir.path())
        .unwrap();

    let removed = remove_stale_files(temp_dir.path(), ["news.py", "news_world.py"]).unwrap();

    assert_eq!(removed, vec!["news.py".to_string(), "news_world.py".to_string()]);
    assert!(!temp_dir.path().join("news.py").exists());
    assert!(temp_dir.path().join("econ_cpi.py").is_file());
}

#[test]
fn test_remove_stale_skips_directories() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("legacy.py")).unwrap();

    let removed = remove_stale_files(temp_dir.path(), ["legacy.py"]).unwrap();

    assert!(removed.is_empty());
    assert!(temp_dir.path().join("legacy.py").is_dir());
}

#[test]
fn test_remove_stale_rejects_escaping_paths() {
    let temp_dir = TempDir::new().unwrap();
    assert!(remove_stale_files(temp_dir.path(), ["../outside.py"]).is_err());
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_export_matches_sequential() {
    let temp_dir = TempDir::new().unwrap();
    let sequential = temp_dir.path().join("seq");
    let parallel = temp_dir.path().join("par");
    let leaves: Vec<String> = (0..50).map(|i| format!("module_{i}")).collect();
    let names: Vec<&str> = leaves.iter().map(String::as_str).collect();

    let fs_set = package_files(&names).build().unwrap();
    fs_set.export_to_filesystem(&sequential).unwrap();
    fs_set
        .export_to_filesystem_parallel(&parallel, &ExportOptions::default())
        .unwrap();

    for name in &names {
        let file = format!("{name}.py");
        assert_eq!(
            fs::read_to_string(sequential.join(&file)).unwrap(),
            fs::read_to_string(parallel.join(&file)).unwrap()
        );
    }
}
