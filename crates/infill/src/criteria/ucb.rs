use ndarray::Array1;

/// Upper Confidence Bound `mean + sqrt(beta) sigma`
pub(crate) fn ucb(mean: f64, var: f64, beta: f64) -> f64 {
    mean + beta.sqrt() * var.sqrt()
}

/// Upper Confidence Bound and its gradient
pub(crate) fn ucb_valgrad(
    mean: f64,
    var: f64,
    dmean: &Array1<f64>,
    dvar: &Array1<f64>,
    beta: f64,
) -> (f64, Array1<f64>) {
    let sigma = var.sqrt();
    let value = mean + beta.sqrt() * sigma;
    let grad = dmean + &(dvar * (beta.sqrt() / (2. * sigma)));
    (value, grad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_ucb() {
        assert_abs_diff_eq!(ucb(1., 4., 9.), 7.);
        let (v, g) = ucb_valgrad(1., 4., &array![2.], &array![8.], 9.);
        assert_abs_diff_eq!(v, 7.);
        // 2 + 3 * 8 / (2 * 2)
        assert_abs_diff_eq!(g, array![8.]);
    }
}
