//! Benchmarks for AMD analysis
//!
//! Measures analysis and rewriting throughput on files with many modules,
//! the shape of concatenated RequireJS builds.

use amdcheck::analysis::{AmdAnalyzer, Analyzer};
use amdcheck::options::CheckOptions;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Create a source file with `modules` named modules, each with one unused dependency
fn create_bundle(modules: usize, deps_per_module: usize) -> String {
    let mut source = String::new();

    for m in 0..modules {
        let paths: Vec<String> = (0..deps_per_module)
            .map(|d| format!("'lib/dep-{}-{}'", m, d))
            .collect();
        let params: Vec<String> = (0..deps_per_module).map(|d| format!("d{}", d)).collect();
        // Every dependency but the last is used
        let body: Vec<String> = params
            .iter()
            .take(deps_per_module.saturating_sub(1))
            .map(|p| format!("    {}.init();", p))
            .collect();

        source.push_str(&format!(
            "define('mod-{}', [{}], function ({}) {{\n{}\n}});\n",
            m,
            paths.join(", "),
            params.join(", "),
            body.join("\n")
        ));
    }

    source
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    let options = CheckOptions::default();

    for modules in [10, 100, 1000].iter() {
        let source = create_bundle(*modules, 5);
        group.bench_with_input(BenchmarkId::from_parameter(modules), &source, |b, source| {
            let mut analyzer = AmdAnalyzer::new().unwrap();
            b.iter(|| {
                let output = analyzer.analyze(black_box(source), &options).unwrap();
                black_box(output)
            });
        });
    }

    group.finish();
}

fn bench_excepts(c: &mut Criterion) {
    let source = create_bundle(100, 5);
    let options = CheckOptions {
        excepts_paths: vec!["/^lib/dep-\\d+-4$/".to_string()],
        ..CheckOptions::default()
    };

    c.bench_function("analyze_with_excepts", |b| {
        let mut analyzer = AmdAnalyzer::new().unwrap();
        b.iter(|| black_box(analyzer.analyze(black_box(&source), &options).unwrap()));
    });
}

criterion_group!(benches, bench_analyze, bench_excepts);
criterion_main!(benches);
