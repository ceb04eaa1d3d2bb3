use std::f64::consts::PI;
use std::fs;

use tempfile::tempdir;

use site_coverage::{
    compute::{CoverageEvaluator, ExactUnionEvaluator, evolution::EvolutionEngine, haversine_km},
    schema::{
        Candidate, CandidateSet, ConstraintConfig, CoverageConfig, EvolutionConfig, FitnessKind,
        GeneticAlgorithmConfig, LoadError, ObjectiveMode, PopulationConfig, SafetyGridConfig,
        SelectionMethod, StopReason,
    },
};

fn config(budget: f64, min_distance_km: Option<f64>, radius_km: f64) -> EvolutionConfig {
    EvolutionConfig {
        coverage: CoverageConfig {
            radius_km,
            ..Default::default()
        },
        constraints: ConstraintConfig {
            budget,
            installation_cost_per_point: 21.0,
            min_distance_km,
            max_repair_iterations: None,
        },
        population: PopulationConfig {
            size: 30,
            max_generations: 10,
            ..Default::default()
        },
        algorithm: GeneticAlgorithmConfig {
            elitism: 2,
            ..Default::default()
        },
        random_seed: Some(7),
        ..Default::default()
    }
}

#[test]
fn test_four_corners_installs_all_sites() {
    // Corners of a 1 x 1 degree square with 1 degree (111 km) disks: each
    // disk overlaps its neighbours, yet every corner still adds area.
    let corners = [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)];
    let set = CandidateSet::from_coordinates(corners);
    let result = EvolutionEngine::new(config(84.0, None, 111.0), set)
        .unwrap()
        .run();

    assert_eq!(result.best.installations, 4);
    assert_eq!(result.best.installed_indices, vec![0, 1, 2, 3]);

    let evaluator = ExactUnionEvaluator::new(111.0).unwrap();
    let best_subset = (0..4)
        .map(|skip| {
            let subset: Vec<Candidate> = corners
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != skip)
                .map(|(_, &(lat, lon))| Candidate::new(lat, lon))
                .collect();
            evaluator.evaluate(&subset)
        })
        .fold(0.0, f64::max);

    let disk = PI * 111.0 * 111.0;
    assert!(result.best.coverage > best_subset);
    assert!(result.best.coverage < 4.0 * disk);
    // The overlapping union is about 7.968 square degrees.
    let square_degrees = result.best.coverage / (111.0 * 111.0);
    assert!((square_degrees - 7.968).abs() < 0.01, "{}", square_degrees);
}

#[test]
fn test_budget_for_single_site() {
    let set = CandidateSet::from_coordinates((0..12).map(|i| (35.0 + i as f64 * 0.05, 128.0)));
    let result = EvolutionEngine::new(config(21.0, None, 10.0), set)
        .unwrap()
        .run();

    assert_eq!(result.best.installations, 1);
    assert!((result.best.cost - 21.0).abs() < 1e-12);
    assert!((result.best.coverage - PI * 100.0).abs() < 1e-6);
    for solution in &result.ranked {
        assert_eq!(solution.installations, 1);
    }
}

#[test]
fn test_close_pair_respects_min_distance() {
    // Sites 0 and 1 are about 1.1 km apart; the rest are far from both.
    let coords = [
        (35.00, 128.00),
        (35.01, 128.00),
        (35.50, 128.00),
        (36.00, 128.00),
        (36.50, 128.00),
    ];
    let set = CandidateSet::from_coordinates(coords);
    assert!(haversine_km(coords[0], coords[1]) < 2.0);

    let mut engine = EvolutionEngine::new(config(210.0, Some(10.0), 10.0), set).unwrap();
    let result = engine.run();

    for solution in result.ranked.iter().chain([&result.best]) {
        let idx = &solution.installed_indices;
        assert!(!(idx.contains(&0) && idx.contains(&1)));
    }
    for ind in engine.population() {
        assert!(engine.constraints().is_within_min_distance(ind.genes.as_slice()));
    }
    // Four sites fit: one of the close pair plus the three far ones.
    assert_eq!(result.best.installations, 4);
}

#[test]
fn test_safety_grid_objective() {
    let set = CandidateSet::from_coordinates((0..20).map(|i| (35.0 + i as f64 * 0.1, 128.0)));
    let mut config = config(105.0, None, 10.0);
    config.coverage.objective = ObjectiveMode::SafetyGrid(SafetyGridConfig {
        resolution: 150,
        ..Default::default()
    });
    let result = EvolutionEngine::new(config, set).unwrap().run();

    assert!(result.best.coverage > 0.0);
    assert!(result.best.installations <= 5);
    assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
}

#[test]
fn test_multi_objective_front_trades_coverage_for_sites() {
    let set = CandidateSet::from_coordinates((0..15).map(|i| (35.0 + i as f64 * 0.3, 128.0)));
    let mut config = config(105.0, None, 10.0);
    config.fitness = FitnessKind::coverage_vs_installations();
    config.algorithm.selection = SelectionMethod::Nsga2;
    config.population.max_generations = 15;
    let result = EvolutionEngine::new(config, set).unwrap().run();

    assert!(!result.pareto_front.is_empty());
    // Along the front, more coverage always costs more sites.
    for pair in result.pareto_front.windows(2) {
        assert!(pair[0].coverage >= pair[1].coverage);
        assert!(pair[0].installations >= pair[1].installations);
    }
}

#[test]
fn test_load_config_and_candidates_from_files() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let candidates_path = dir.path().join("candidates.json");

    fs::write(
        &config_path,
        r#"{
            "coverage": { "radius_km": 10.0 },
            "constraints": { "budget": 63.0, "installation_cost_per_point": 21.0 },
            "population": { "size": 12, "max_generations": 3 },
            "algorithm": { "elitism": 1, "selection": { "method": "Tournament", "size": 2 } },
            "random_seed": 3
        }"#,
    )
    .unwrap();
    fs::write(
        &candidates_path,
        r#"[
            { "latitude": 35.0, "longitude": 128.0 },
            { "latitude": 35.3, "longitude": 128.0 },
            { "latitude": null, "longitude": 128.5 },
            { "latitude": 35.6 },
            { "latitude": 35.9, "longitude": 128.0 }
        ]"#,
    )
    .unwrap();

    let config = EvolutionConfig::from_json_file(&config_path).unwrap();
    assert_eq!(config.population.size, 12);
    assert_eq!(config.constraints.max_installations(), 3);

    let candidates = CandidateSet::from_json_file(&candidates_path).unwrap();
    assert_eq!(candidates.size(), 3);
    assert_eq!(candidates.coordinates_of(2), Some((35.9, 128.0)));

    let result = EvolutionEngine::new(config, candidates).unwrap().run();
    assert_eq!(result.stats.generations, 3);
    assert_eq!(result.best.installations, 3);

    // The result serializes for the CLI output.
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"stop_reason\":\"MaxGenerations\""));
}

#[test]
fn test_load_errors() {
    let dir = tempdir().unwrap();

    let missing = CandidateSet::from_json_file(dir.path().join("missing.json"));
    assert!(matches!(missing, Err(LoadError::Io(_))));

    let bad_path = dir.path().join("bad.json");
    fs::write(&bad_path, "not json").unwrap();
    assert!(matches!(
        CandidateSet::from_json_file(&bad_path),
        Err(LoadError::Parse(_))
    ));

    let empty_path = dir.path().join("empty.json");
    fs::write(&empty_path, r#"[{ "latitude": 35.0 }]"#).unwrap();
    assert!(matches!(
        CandidateSet::from_json_file(&empty_path),
        Err(LoadError::NoCandidates)
    ));

    assert!(EvolutionConfig::from_json_file(dir.path().join("missing.json")).is_err());
}
