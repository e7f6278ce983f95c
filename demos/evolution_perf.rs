//! Quick optimizer performance test

use orcs_calibrate::{
    compute::benchmark::Benchmark,
    optimizer::{OptimizationRun, create_optimizer},
    schema::{
        EsConfig, MutationConfig, OptimizerAlgorithm, OptimizerConfig, ParameterConfig,
        ParameterInit, PowellConfig, RunConfig, SelectionKind,
    },
};
use std::time::Instant;

fn parameters(dim: usize) -> Vec<ParameterConfig> {
    (0..dim)
        .map(|i| ParameterConfig {
            name: format!("p{}", i),
            min: -5.0,
            max: 5.0,
            init: ParameterInit::Random,
        })
        .collect()
}

fn run(label: &str, config: &OptimizerConfig, benchmark: Benchmark) {
    let mut optimizer = match create_optimizer(config, benchmark) {
        Ok(optimizer) => optimizer,
        Err(e) => {
            println!("  {}: invalid configuration: {}", label, e);
            return;
        }
    };

    let start = Instant::now();
    let outcome = OptimizationRun::new(config.run.clone()).run(optimizer.as_mut());
    let elapsed = start.elapsed();

    let evals = outcome.report.evaluations;
    let evals_per_sec = evals as f64 / elapsed.as_secs_f64();

    println!("  {}", label);
    println!("    Steps:          {}", outcome.report.step);
    println!("    Evaluations:    {}", evals);
    println!("    Elapsed:        {:.3}s", elapsed.as_secs_f64());
    println!("    Evals/sec:      {:.1}", evals_per_sec);
    println!("    Smallest error: {:.6e}", outcome.report.smallest_error);
    println!("    Stopped:        {:?}", outcome.stop_reason);
    println!();
}

fn main() {
    println!("=== Evolution Strategy Performance Test ===\n");

    for dim in [2, 10, 30] {
        println!("Dimensions: {}", dim);

        for (label, selection, mutation) in [
            (
                "(10/2+70) single std",
                SelectionKind::Plus,
                MutationConfig::SingleStd {
                    learn_rate_coeff: 1.0,
                },
            ),
            (
                "(10/2,70) multi std",
                SelectionKind::Comma,
                MutationConfig::MultiStd {
                    learn_rate_coeff: 1.0,
                },
            ),
            (
                "(10/2+70) 1/5 rule",
                SelectionKind::Plus,
                MutationConfig::OneFifthRule {
                    check_interval: 5,
                    learn_rate_coeff: 0.85,
                },
            ),
        ] {
            let config = OptimizerConfig {
                parameters: parameters(dim),
                algorithm: OptimizerAlgorithm::EvolutionStrategy(EsConfig {
                    selection,
                    mutation,
                    random_seed: Some(42),
                    ..Default::default()
                }),
                run: RunConfig {
                    max_steps: 200,
                    ..Default::default()
                },
            };
            run(label, &config, Benchmark::Sphere);
        }
    }

    println!("=== Powell Scalability Test (Rosenbrock) ===\n");

    for dim in [2, 5, 10, 20] {
        let config = OptimizerConfig {
            parameters: parameters(dim),
            algorithm: OptimizerAlgorithm::Powell(PowellConfig {
                tolerance: 1.0e-10,
                ..Default::default()
            }),
            run: RunConfig {
                max_steps: 10_000,
                ..Default::default()
            },
        };
        run(&format!("{} dimensions", dim), &config, Benchmark::Rosenbrock);
    }
}
