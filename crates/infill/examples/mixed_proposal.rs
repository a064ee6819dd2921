use gpbo_gp::{fit_kernel_params, DefaultLogPrior, Matern52Kernel, Posterior, StandardizedData};
use gpbo_infill::{
    optimize_acqf_mixed, AcquisitionKind, AcquisitionParams, Dimension, MixedOptimizerConfig,
    SearchSpace,
};
use ndarray::{array, Array1, Array2, ArrayView1, Axis};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

/// Objective to maximize: learning rate (log), number of layers (int), optimizer (categorical)
fn objective(x: &ArrayView1<f64>) -> f64 {
    let (lr, layers, optim) = (x[0], x[1], x[2]);
    -(lr.log10() + 2.5).powi(2) - 0.05 * (layers - 4.).powi(2) + [0., 0.4, -0.2][optim as usize]
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("GPBO_LOG", "info")).init();

    let space = SearchSpace::new(vec![
        Dimension::log(1e-5, 1e-1),
        Dimension::int(1, 8),
        Dimension::categorical(3),
    ])
    .expect("valid search space");

    let mut raw = array![
        [1e-4, 2., 0.],
        [1e-2, 6., 1.],
        [3e-3, 3., 2.],
        [5e-5, 8., 1.],
        [2e-2, 1., 0.]
    ];
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    for iter in 0..10 {
        let scores: Array1<f64> = raw.map_axis(Axis(1), |x| objective(&x));
        let x: Array2<f64> = Array2::from_shape_vec(
            raw.dim(),
            raw.outer_iter()
                .flat_map(|r| space.normalize(&r).expect("valid point").to_vec())
                .collect(),
        )
        .expect("normalized observations");
        let y = StandardizedData::new(&scores);
        let mask = space.is_categorical_mask();

        let (params, diagnostics) =
            fit_kernel_params(&x, &y.data, &mask, DefaultLogPrior, 1e-6, true)
                .expect("kernel fitted")
                .into_parts();
        let gp = Posterior::new(Matern52Kernel(), &params, &x, &y.data, &mask)
            .expect("posterior")
            .with_upstream(diagnostics);
        let acqf = AcquisitionParams::new(AcquisitionKind::LogEi, gp, space.clone())
            .expect("acquisition parameters");
        let candidate = optimize_acqf_mixed(&acqf, &MixedOptimizerConfig::default(), &mut rng)
            .expect("candidate")
            .into_value();
        let proposal = space.denormalize(&candidate.x).expect("raw candidate");
        println!(
            "iter {iter}: propose {proposal} (logEI={:.3}), f={:.4}",
            candidate.score,
            objective(&proposal.view())
        );
        raw.push_row(proposal.view()).expect("same dimension");
    }
    let scores = raw.map_axis(Axis(1), |x| objective(&x));
    let ibest = (0..scores.len())
        .max_by(|&i, &j| scores[i].total_cmp(&scores[j]))
        .unwrap_or(0);
    println!("Best found: {} f={}", raw.row(ibest), scores[ibest]);
}
