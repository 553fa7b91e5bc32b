//! Benchmarks for package graph resolution
//!
//! Resolves layered synthetic specifications where every package depends on
//! two packages of the next layer, so most nodes are reached through several
//! parents.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio_util::sync::CancellationToken;
use usagescope::exclusion::ExclusionPolicy;
use usagescope::graph::{DependencyResolver, PackageGraph};
use usagescope::oracle::{
    DeclaredDependency, DependencyGroup, InMemorySpecifications, PackageSpecification,
};
use usagescope::parser::{PackageReference, TargetPlatform, Version};
use usagescope::report::{HasMetricsFilter, ProjectResult};

fn version() -> Version {
    Version::new(1, 0, 0)
}

/// `layers` layers of `width` packages; `L{l}_{i}` depends on
/// `L{l+1}_{i}` and `L{l+1}_{i+1}` (wrapping).
fn layered_specs(layers: usize, width: usize) -> InMemorySpecifications {
    let mut specs = InMemorySpecifications::new();

    for layer in 0..layers {
        for i in 0..width {
            let dependencies = if layer + 1 < layers {
                vec![
                    DeclaredDependency::new(format!("L{}_{}", layer + 1, i), "1.0.0"),
                    DeclaredDependency::new(format!("L{}_{}", layer + 1, (i + 1) % width), "1.0.0"),
                ]
            } else {
                Vec::new()
            };

            specs.insert(PackageSpecification {
                name: format!("L{}_{}", layer, i),
                version: version(),
                groups: vec![DependencyGroup {
                    target: None,
                    dependencies,
                }],
            });
        }
    }

    specs
}

fn explicit_references(width: usize) -> Vec<PackageReference> {
    (0..width)
        .map(|i| PackageReference::new(format!("L0_{}", i), version()))
        .collect()
}

async fn resolve(specs: &InMemorySpecifications, explicit: &[PackageReference]) -> PackageGraph {
    let exclusions = ExclusionPolicy::new(Vec::<String>::new());
    let platform = TargetPlatform::new("net8.0");
    let cancel = CancellationToken::new();
    let resolver = DependencyResolver::new(specs, &exclusions, &platform, &cancel);

    let mut graph = PackageGraph::new();
    resolver
        .resolve(&mut graph, explicit)
        .await
        .expect("synthetic graph stays within the depth limit");
    graph
}

/// Benchmark full resolution of explicit references
fn bench_resolve(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime");
    let mut group = c.benchmark_group("resolve");

    for width in [10, 50, 100, 200].iter() {
        let specs = layered_specs(8, *width);
        let explicit = explicit_references(*width);

        group.bench_with_input(BenchmarkId::new("packages", width * 8), width, |b, _| {
            b.iter(|| black_box(runtime.block_on(resolve(&specs, &explicit))));
        });
    }

    group.finish();
}

/// Benchmark descendant counting over a resolved graph
fn bench_descendants(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime");
    let mut group = c.benchmark_group("descendant_count");

    for width in [10, 50, 100].iter() {
        let specs = layered_specs(8, *width);
        let graph = runtime.block_on(resolve(&specs, &explicit_references(*width)));

        group.bench_with_input(BenchmarkId::new("packages", width * 8), &graph, |b, g| {
            b.iter(|| {
                for node in g.explicit_nodes() {
                    black_box(g.descendant_count(&node.key));
                }
            });
        });
    }

    group.finish();
}

/// Benchmark report row layout with the metrics filter
fn bench_report_rows(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime");
    let mut group = c.benchmark_group("report_rows");

    for width in [10, 20].iter() {
        let specs = layered_specs(6, *width);
        let graph = runtime.block_on(resolve(&specs, &explicit_references(*width)));
        let result = ProjectResult::ok("Bench", Vec::new(), graph, std::time::Duration::ZERO);

        group.bench_with_input(BenchmarkId::new("packages", width * 6), &result, |b, r| {
            b.iter(|| {
                let filter = HasMetricsFilter::new(r);
                black_box(r.rows(&filter).len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_descendants, bench_report_rows);
criterion_main!(benches);
