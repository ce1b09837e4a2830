//! # Inverse Kinematics and Planning Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arm_lib::arm_ctrl::{inverse_kinematics, ArmCtrl, Params, StepOutcome};
use nalgebra::Vector3;

fn ik_benchmark(c: &mut Criterion) {
    let params = Params::default();
    let target = Vector3::new(0.18, -0.06, 0.07);

    c.bench_function("ik_solve", |b| {
        b.iter(|| {
            inverse_kinematics::solve(
                &params.geometry,
                &params.calibration,
                black_box(&target),
            )
        })
    });
}

fn plan_benchmark(c: &mut Criterion) {
    let target = Vector3::new(0.20, 0.0, 0.10);

    // Plan from home to arrival
    c.bench_function("plan_to_arrival", |b| {
        b.iter(|| {
            let mut ctrl = ArmCtrl::default();
            loop {
                match ctrl.plan_step(black_box(&target)) {
                    Ok(StepOutcome::Step { .. }) => (),
                    _ => break,
                }
            }
        })
    });
}

criterion_group!(benches, ik_benchmark, plan_benchmark);
criterion_main!(benches);
