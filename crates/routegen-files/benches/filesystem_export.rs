//! Benchmarks for filesystem export operations.
//!
//! Measures in-memory file set to disk export with various module counts,
//! atomic versus direct writes, and stale cleanup.
//!
//! # Run Benchmarks
//!
//! ```bash
//! cargo bench --package routegen-files --bench filesystem_export
//! ```

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use routegen_files::{ExportOptions, FileSystem, FilesBuilder, remove_stale_files};
use std::hint::black_box;
use tempfile::TempDir;

/// Builds a package-shaped file set with `count` command modules.
fn package(count: usize) -> FileSystem {
    let mut builder = FilesBuilder::new()
        .add_file("/module_map.json", "{}\n")
        .add_file("/__init__.py", "from .__extensions__ import Extensions\n");
    for i in 0..count {
        builder = builder.add_file(
            format!("/area_command_{i}.py"),
            format!(
                "### THIS FILE IS AUTO-GENERATED. DO NOT EDIT. ###\n\n\
                 class CLASS_area_command_{i}(Container):\n    \
                 def command_{i}(self, symbol: str, **extra: Any) -> NoContent:\n        \
                 return NoContent()\n"
            ),
        );
    }
    builder.build().unwrap()
}

fn bench_export_module_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("export_by_module_count");

    for count in [10, 100, 500] {
        let files = package(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &files, |b, files| {
            b.iter(|| {
                let temp = TempDir::new().unwrap();
                files.export_to_filesystem(temp.path()).unwrap();
                black_box(temp)
            });
        });
    }

    group.finish();
}

fn bench_atomic_vs_direct(c: &mut Criterion) {
    let mut group = c.benchmark_group("export_atomic_vs_direct");
    let files = package(100);

    for atomic in [true, false] {
        let options = ExportOptions::default().with_atomic_writes(atomic);
        let label = if atomic { "atomic" } else { "direct" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let temp = TempDir::new().unwrap();
                files
                    .export_to_filesystem_with_options(temp.path(), &options)
                    .unwrap();
                black_box(temp)
            });
        });
    }

    group.finish();
}

fn bench_stale_cleanup(c: &mut Criterion) {
    let files = package(100);
    let stale: Vec<String> = (0..100).map(|i| format!("area_command_{i}.py")).collect();

    c.bench_function("remove_stale_100", |b| {
        b.iter_batched(
            || {
                let temp = TempDir::new().unwrap();
                files.export_to_filesystem(temp.path()).unwrap();
                temp
            },
            |temp| {
                let removed = remove_stale_files(temp.path(), &stale).unwrap();
                black_box((temp, removed))
            },
            criterion::BatchSize::PerIteration,
        );
    });
}

criterion_group!(
    benches,
    bench_export_module_count,
    bench_atomic_vs_direct,
    bench_stale_cleanup
);
criterion_main!(benches);
