use gpbo_gp::{KernelFitter, Matern52Kernel, Posterior, StandardizedData};
use linfa::prelude::*;
use ndarray::{arr2, concatenate, Array, Array1, Array2, Axis};

fn xsinx(x: &Array2<f64>) -> Array1<f64> {
    ((x - 3.5) * ((x - 3.5) / std::f64::consts::PI).mapv(|v| v.sin())).remove_axis(Axis(1))
}

fn main() {
    let xt = arr2(&[[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]]);
    let yt = xsinx(&xt);

    // kernel works on normalized inputs and standardized outputs
    let xn = &xt / 25.;
    let ys = StandardizedData::new(&yt);

    println!("Fit kernel parameters of 'xsinx' at {}", xt.column(0));
    let params = KernelFitter::default_params()
        .is_categorical(&[false])
        .fit(&Dataset::new(xn.clone(), ys.data.clone()))
        .expect("kernel fitted");
    for diag in params.diagnostics() {
        println!("diagnostic: {diag}");
    }
    let params = params.into_value();
    println!("Kernel parameters: {params:?}");

    let gp = Posterior::new(Matern52Kernel(), &params, &xn, &ys.data, &[false])
        .expect("posterior")
        .into_value();
    println!("{gp}");

    let xtest = Array::linspace(0., 25., 26).insert_axis(Axis(1));
    let ytest = xsinx(&xtest);
    let xtest_n = &xtest / 25.;
    let ypred = gp.predict(&xtest_n) * ys.std + ys.mean;
    let ysigma = gp.predict_var(&xtest_n).mapv(|v| v.sqrt() * ys.std);

    println!("Compute prediction errors (x, err(x), sigma(x))");
    println!(
        "{}",
        concatenate![
            Axis(1),
            xtest,
            (ypred - ytest).insert_axis(Axis(1)),
            ysigma.insert_axis(Axis(1))
        ]
    );
}
