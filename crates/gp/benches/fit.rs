use criterion::{criterion_group, criterion_main, Criterion};
use gpbo_gp::{fit_kernel_params, DefaultLogPrior, Matern52Kernel, Posterior};
use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

fn training_data(nt: usize, dim: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let xt: Array2<f64> = Array2::random_using((nt, dim), Uniform::new(0., 1.), &mut rng);
    let yt = xt.map_axis(Axis(1), |x| {
        -x.mapv(|v| (v - 0.3) * (v - 0.3)).sum() + (5. * x[0]).sin() * 0.1
    });
    (xt, yt)
}

fn criterion_fit(c: &mut Criterion) {
    let dims = [2, 5, 10];
    let nts = [20, 50, 100];

    let mut group = c.benchmark_group("fit");
    group.sample_size(10);
    for (dim, nt) in dims.iter().zip(nts.iter()) {
        let (xt, yt) = training_data(*nt, *dim);
        let mask = vec![false; *dim];
        group.bench_function(format!("fit {dim}x{nt}"), |b| {
            b.iter(|| {
                std::hint::black_box(
                    fit_kernel_params(&xt, &yt, &mask, DefaultLogPrior, 1e-6, false)
                        .expect("kernel fitted"),
                )
            })
        });
    }
    group.finish();
}

fn criterion_predict(c: &mut Criterion) {
    let (xt, yt) = training_data(100, 5);
    let mask = vec![false; 5];
    let params = fit_kernel_params(&xt, &yt, &mask, DefaultLogPrior, 1e-6, false)
        .expect("kernel fitted")
        .into_value();
    let gp = Posterior::new(Matern52Kernel(), &params, &xt, &yt, &mask)
        .expect("posterior")
        .into_value();
    let x = Array1::from_elem(5, 0.4);

    let mut group = c.benchmark_group("predict");
    group.bench_function("valvar gradients 100x5", |b| {
        b.iter(|| std::hint::black_box(gp.predict_valvar_gradients_single(&x)))
    });
    group.finish();
}

criterion_group!(benches, criterion_fit, criterion_predict);
criterion_main!(benches);
