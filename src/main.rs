//! Calibration CLI - Run an optimizer on a test function from JSON configuration.

use std::fs;
use std::path::PathBuf;

use orcs_calibrate::{
    compute::benchmark::Benchmark,
    optimizer::{OptimizationRun, create_optimizer},
    schema::{OptimizerAlgorithm, OptimizerConfig, StopReason},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [function]", args[0]);
        eprintln!();
        eprintln!("Calibrate the parameters of a test function from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to optimizer configuration file");
        eprintln!("  function     sphere, shifted_quadratic or rosenbrock (default: sphere)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let benchmark: Benchmark = match args.get(2) {
        Some(name) => name.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }),
        None => Benchmark::default(),
    };

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: OptimizerConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    let mut optimizer = create_optimizer(&config, benchmark).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    println!("Model Calibration");
    println!("=================");
    println!("Optimizer: {}", optimizer.name());
    println!("Function: {:?}", benchmark);
    println!("Parameters:");
    for p in &config.parameters {
        println!("  {} in [{}, {}] ({:?})", p.name, p.min, p.max, p.init);
    }
    match &config.algorithm {
        OptimizerAlgorithm::EvolutionStrategy(es) => println!(
            "Population: mu={}, rho={}, lambda={}, {:?} selection",
            es.mu, es.rho, es.lambda, es.selection
        ),
        OptimizerAlgorithm::Powell(powell) => {
            println!("Tolerance: {}", powell.tolerance)
        }
    }
    println!("Max steps: {}", config.run.max_steps);
    println!();

    let report_every = (config.run.max_steps / 10).max(1);
    let run = OptimizationRun::new(config.run.clone());
    let outcome = run.run_with_callback(optimizer.as_mut(), |report| {
        if report.step % report_every == 0 {
            println!(
                "  Step {}: smallest={:.6e}, mean={:.6e}, highest={:.6e}, evaluations={}",
                report.step,
                report.smallest_error,
                report.mean_error,
                report.highest_error,
                report.evaluations
            );
        }
    });

    println!();
    println!("Stopped: {:?}", outcome.stop_reason);
    println!("Steps: {}", outcome.report.step);
    println!("Smallest error: {:.6e}", outcome.report.smallest_error);
    println!("Best parameters:");
    for (p, value) in config.parameters.iter().zip(&outcome.report.best_parameters) {
        println!("  {} = {:.6}", p.name, value);
    }
    let distance = benchmark
        .minimum(config.parameters.len())
        .iter()
        .zip(&outcome.report.best_parameters)
        .map(|(m, x)| (x - m).powi(2))
        .sum::<f64>()
        .sqrt();
    println!("Distance to known minimum: {:.6e}", distance);
    println!(
        "Time: {:.2}s ({} evaluations)",
        outcome.elapsed_seconds, outcome.report.evaluations
    );

    if let StopReason::Error(_) = outcome.stop_reason {
        std::process::exit(2);
    }
}

fn print_example_config() {
    let config = OptimizerConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
