// ─────────────────────────────────────────────────────────────────────
// Wakefield Interstage — Betatron Integrator Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use beam_core::betatron::{BetatronIntegrator, BetatronModel};
use beam_types::config::IntegratorSettings;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

const KP: f64 = 1.88e4;

fn ensemble(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let x0 = (0..n).map(|i| 1e-6 * ((i as f64) * 0.37).sin()).collect();
    let ux0 = (0..n).map(|i| 2.0 * ((i as f64) * 0.71).cos()).collect();
    let gamma0 = (0..n).map(|i| 2e4 * (1.0 + 0.01 * ((i as f64) * 0.13).sin())).collect();
    (x0, ux0, gamma0)
}

fn bench_betatron(c: &mut Criterion) {
    let model = BetatronModel::from_plasma(KP, 6.4e9).expect("valid plasma");
    let mut group = c.benchmark_group("betatron_evolve");
    group.sample_size(10);

    for parallel in [false, true] {
        let settings = IntegratorSettings {
            parallel,
            ..IntegratorSettings::default()
        };
        let integ = BetatronIntegrator::new(model, settings).expect("valid settings");
        let (x0, ux0, gamma0) = ensemble(256);
        let label = if parallel { "256_particles_rayon" } else { "256_particles_serial" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let out = integ
                    .evolve(&x0, &ux0, &gamma0, 0.1)
                    .expect("integration should succeed");
                black_box(out.gamma[0]);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_betatron);
criterion_main!(benches);
