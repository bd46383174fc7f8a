// SPDX-License-Identifier: MIT OR Apache-2.0
//! Build a reduced basis from a synthetic simulation stream.

use basis_stream::{BasisConfig, BasisSampler};

const DIM: usize = 128;
const STEPS: usize = 20;
const DT: f64 = 0.05;

/// State snapshot of a toy advection-ish system: a few smooth modes whose
/// amplitudes drift with time.
#[allow(clippy::cast_precision_loss)]
fn snapshot(time: f64) -> Vec<f64> {
    use std::f64::consts::PI;
    (0..DIM)
        .map(|i| {
            let x = i as f64 / DIM as f64;
            (2.0 * time).cos() * (PI * x).sin()
                + 0.6 * (3.0 * time).sin() * (2.0 * PI * x).sin()
                + 0.25 * (0.5 * time).cos() * (3.0 * PI * x).sin()
                + 0.05 * (4.0 * PI * x * (1.0 + 0.1 * time)).cos()
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn main() {
    let mut config = BasisConfig::for_dim(DIM).unwrap();
    config.redundancy_tol = 1e-6;
    let mut sampler = BasisSampler::serial(config).unwrap();

    println!("=== Streaming Reduced-Basis Construction ===\n");
    println!("{:>5} {:>8} {:>18} {:>6} {:>12}", "Step", "Time", "Outcome", "Rank", "Leading σ");
    println!("{}", "-".repeat(54));

    for step in 0..STEPS {
        let time = step as f64 * DT;
        let outcome = sampler.take_sample(&snapshot(time), time).unwrap();
        let leading = sampler.singular_values().unwrap()[0];
        println!(
            "{:>5} {:>8.3} {:>18} {:>6} {:>12.6}",
            step,
            time,
            format!("{outcome:?}"),
            sampler.rank(),
            leading
        );
    }

    println!("\nSingular values:");
    for (i, value) in sampler.singular_values().unwrap().iter().enumerate() {
        println!("  σ[{i}] = {value:.6e}");
    }

    // Compress and reconstruct the final state through the basis.
    let final_time = (STEPS - 1) as f64 * DT;
    let state = snapshot(final_time);
    let coords = sampler.project(&state).unwrap();
    let back = sampler.reconstruct(&coords).unwrap();
    let err: f64 = state
        .iter()
        .zip(back.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt();
    println!(
        "\nFinal state: {} dofs -> {} coordinates, reconstruction error {err:.3e}",
        DIM,
        coords.len()
    );

    // Ask the sampler when the simulation should hand over its next sample.
    let derivative: Vec<f64> = snapshot(final_time + 1e-6)
        .iter()
        .zip(state.iter())
        .map(|(a, b)| (a - b) / 1e-6)
        .collect();
    let next = sampler
        .predict_next_sample_time(&state, &derivative, final_time)
        .unwrap();
    println!("Next sample suggested at t = {next:.4}");
}
