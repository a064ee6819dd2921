use criterion::{criterion_group, criterion_main, Criterion};
use gpbo_gp::{fit_kernel_params, DefaultLogPrior, Matern52Kernel, Posterior, StandardizedData};
use gpbo_infill::{
    optimize_acqf_mixed, AcquisitionKind, AcquisitionParams, Dimension, MixedOptimizerConfig,
    SearchSpace,
};
use ndarray::Axis;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn mixed_acqf(n_obs: usize) -> AcquisitionParams<Matern52Kernel> {
    let space = SearchSpace::new(vec![
        Dimension::continuous(-5., 5.),
        Dimension::log(1e-4, 1.),
        Dimension::int(1, 20),
        Dimension::categorical(4),
    ])
    .expect("valid search space");
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let x = space.sample(n_obs, &mut rng);
    let y = x.map_axis(Axis(1), |r| {
        -(r[0] - 0.3).powi(2) - (r[1] - 0.7).powi(2) + 0.1 * r[2] - 0.2 * r[3]
    });
    let y = StandardizedData::new(&y);
    let mask = space.is_categorical_mask();
    let (params, diagnostics) =
        fit_kernel_params(&x, &y.data, &mask, DefaultLogPrior, 1e-6, false)
            .expect("kernel fitted")
            .into_parts();
    let gp = Posterior::new(Matern52Kernel(), &params, &x, &y.data, &mask)
        .expect("posterior")
        .with_upstream(diagnostics);
    AcquisitionParams::new(AcquisitionKind::LogEi, gp, space).expect("acquisition")
}

fn criterion_acqf(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquisition");
    group.sample_size(10);
    for n_obs in [20, 50] {
        let acqf = mixed_acqf(n_obs);
        group.bench_function(format!("optimize_acqf_mixed {n_obs} obs"), |b| {
            b.iter(|| {
                let mut rng = Xoshiro256Plus::seed_from_u64(42);
                std::hint::black_box(
                    optimize_acqf_mixed(&acqf, &MixedOptimizerConfig::default(), &mut rng)
                        .expect("candidate"),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_acqf);
criterion_main!(benches);
