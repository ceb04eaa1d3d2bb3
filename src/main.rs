//! Site coverage CLI - Run a placement search from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;

use serde::Serialize;

use site_coverage::{
    compute::evolution::EvolutionEngine,
    schema::{CandidateRecord, CandidateSet, EvolutionConfig, ObjectiveMode},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.get(1).is_some_and(|a| a == "--example") {
        print_example_config();
        return;
    }

    if args.len() < 3 {
        eprintln!("Usage: {} <config.json> <candidates.json> [generations]", args[0]);
        eprintln!();
        eprintln!("Select coverage-maximizing sites under a budget by genetic search.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json      Path to search configuration file");
        eprintln!("  candidates.json  Array of {{\"latitude\", \"longitude\"}} records");
        eprintln!("  generations      Override the configured generation count");
        eprintln!();
        eprintln!("Example files are generated with --example flag.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let candidates_path = PathBuf::from(&args[2]);

    // Load configuration
    let mut config = EvolutionConfig::from_json_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });
    if let Some(generations) = args.get(3).and_then(|s| s.parse::<usize>().ok()) {
        config.population.max_generations = generations;
    }

    // Load candidates
    let candidates = CandidateSet::from_json_file(&candidates_path).unwrap_or_else(|e| {
        eprintln!("Error loading candidates: {}", e);
        std::process::exit(1);
    });

    println!("Site Coverage Search");
    println!("====================");
    println!("Candidates: {}", candidates.size());
    println!(
        "Budget: {} (cost {} per site, at most {} sites)",
        config.constraints.budget,
        config.constraints.installation_cost_per_point,
        config.constraints.max_installations()
    );
    println!("Radius: {} km", config.coverage.radius_km);
    println!(
        "Objective: {}",
        match config.coverage.objective {
            ObjectiveMode::ExactUnion => "exact union area",
            ObjectiveMode::SafetyGrid(_) => "safety grid",
        }
    );
    if let Some(min_km) = config.constraints.min_distance_km {
        println!("Minimum spacing: {} km", min_km);
    }
    println!(
        "Population: {}, generations: {}",
        config.population.size, config.population.max_generations
    );
    println!();

    let total = config.population.max_generations;
    let mut engine = EvolutionEngine::new(config, candidates).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    println!("Running search...");
    let result = engine.run_with_callback(|progress| {
        // Print progress every 10%
        if progress.generation > 0 && progress.generation % (total / 10).max(1) == 0 {
            println!(
                "  Generation {}/{}: best={:.3}, avg={:.3}, stagnation={}",
                progress.generation,
                total,
                progress.best_coverage,
                progress.avg_coverage,
                progress.stagnation_count
            );
        }
    });

    println!();
    println!("Stopped: {:?}", result.stats.stop_reason);
    println!(
        "Best: {} sites, cost {}, coverage {:.3}",
        result.best.installations, result.best.cost, result.best.coverage
    );
    if !result.stalled_generations.is_empty() {
        println!("Stalled generations: {:?}", result.stalled_generations);
    }
    println!(
        "Time: {:.2}s ({} evaluations, {:.1} evals/s)",
        result.stats.elapsed_seconds,
        result.stats.total_evaluations,
        result.stats.evaluations_per_second
    );
    println!();
    println!("{}", to_json(&result));
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing output: {}", e);
        std::process::exit(1);
    })
}

fn print_example_config() {
    let config = EvolutionConfig {
        random_seed: Some(42),
        ..Default::default()
    };
    let candidates = vec![
        CandidateRecord {
            latitude: Some(35.1796),
            longitude: Some(129.0756),
        },
        CandidateRecord {
            latitude: Some(35.1587),
            longitude: Some(129.1604),
        },
        CandidateRecord {
            latitude: Some(35.2100),
            longitude: None,
        },
    ];

    println!("Example configuration (config.json):");
    println!("{}", to_json(&config));
    println!();
    println!("Example candidates (candidates.json, incomplete rows are skipped):");
    println!("{}", to_json(&candidates));
}
