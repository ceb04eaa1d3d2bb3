//! Benchmarks for coverage scoring and repair.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::prelude::*;

use site_coverage::{
    compute::{
        ConstraintEngine, CoverageEvaluator, ExactUnionEvaluator, SafetyGridEvaluator,
        evolution::{EvolutionEngine, GenomeRng},
    },
    schema::{
        Candidate, CandidateSet, ConstraintConfig, EvolutionConfig, GridExtent, PopulationConfig,
        SafetyGridConfig,
    },
};

/// Uniform random sites over a 1 x 1 degree box.
fn random_sites(count: usize, seed: u64) -> Vec<Candidate> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Candidate::new(35.0 + rng.r#gen::<f64>(), 128.0 + rng.r#gen::<f64>()))
        .collect()
}

fn bench_exact_union(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact_union");
    let evaluator = ExactUnionEvaluator::new(10.0).unwrap();

    for count in [10, 76, 250, 1000] {
        let sites = random_sites(count, 7);
        group.bench_with_input(BenchmarkId::from_parameter(count), &sites, |b, sites| {
            b.iter(|| evaluator.evaluate(black_box(sites)));
        });
    }

    group.finish();
}

fn bench_safety_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("safety_grid");
    let sites = random_sites(76, 7);
    let set = CandidateSet::new(sites.clone());

    for resolution in [100, 250, 500] {
        let config = SafetyGridConfig {
            resolution,
            extent: GridExtent::FitCandidates,
            ..Default::default()
        };
        let evaluator = SafetyGridEvaluator::new(10.0, &config, &set).unwrap();

        group.bench_with_input(
            BenchmarkId::new("local_window", resolution),
            &sites,
            |b, sites| {
                b.iter(|| evaluator.evaluate(black_box(sites)));
            },
        );

        if resolution <= 250 {
            group.bench_with_input(
                BenchmarkId::new("full_scan", resolution),
                &sites,
                |b, sites| {
                    b.iter(|| evaluator.evaluate_full_scan(black_box(sites)));
                },
            );
        }
    }

    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("repair");
    let set = CandidateSet::new(random_sites(2000, 11));

    for min_distance_km in [None, Some(5.0)] {
        let engine = ConstraintEngine::new(
            &ConstraintConfig {
                budget: 1600.0,
                installation_cost_per_point: 21.0,
                min_distance_km,
                max_repair_iterations: None,
            },
            set.clone(),
        )
        .unwrap();
        let label = match min_distance_km {
            Some(km) => format!("min_{}km", km),
            None => "budget_only".to_string(),
        };

        let mut genome_rng = GenomeRng::new(3);
        let start = genome_rng.bernoulli_genes(set.size(), 0.5);
        let mut rng = StdRng::seed_from_u64(5);

        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            b.iter(|| {
                let mut genes = start.as_slice().to_vec();
                engine.repair(black_box(&mut genes), &mut rng).unwrap();
                genes
            });
        });
    }

    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    group.sample_size(10);
    let set = CandidateSet::new(random_sites(500, 13));

    for size in [50, 200] {
        let config = EvolutionConfig {
            population: PopulationConfig {
                size,
                max_generations: 1,
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        };

        group.bench_with_input(BenchmarkId::from_parameter(size), &config, |b, config| {
            b.iter(|| {
                let mut engine = EvolutionEngine::new(config.clone(), set.clone()).unwrap();
                engine.run()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_exact_union,
    bench_safety_grid,
    bench_repair,
    bench_generation
);
criterion_main!(benches);
