use crate::utils::{d_log_ei_helper, log_ei_helper, norm_cdf, norm_pdf};
use ndarray::Array1;

/// Standardized improvement `u = (mean - best) / sigma`
fn improvement(mean: f64, sigma: f64, best: f64) -> f64 {
    (mean - best) / sigma
}

/// Log of Expected Improvement over `best` (maximization) given posterior
/// mean and variance, the latter being already floored
pub(crate) fn log_ei(mean: f64, var: f64, best: f64) -> f64 {
    let sigma = var.sqrt();
    log_ei_helper(improvement(mean, sigma, best)) + sigma.ln()
}

/// Log of Expected Improvement and its gradient given posterior mean, variance
/// and their gradients
pub(crate) fn log_ei_valgrad(
    mean: f64,
    var: f64,
    dmean: &Array1<f64>,
    dvar: &Array1<f64>,
    best: f64,
) -> (f64, Array1<f64>) {
    let sigma = var.sqrt();
    let u = improvement(mean, sigma, best);
    let value = log_ei_helper(u) + sigma.ln();

    let dsigma = dvar / (2. * sigma);
    let du = (dmean - &(&dsigma * u)) / sigma;
    let grad = du * d_log_ei_helper(u) + dsigma / sigma;
    (value, grad)
}

/// Expected Improvement over `best` (maximization)
pub(crate) fn ei(mean: f64, var: f64, best: f64) -> f64 {
    let sigma = var.sqrt();
    let u = improvement(mean, sigma, best);
    sigma * (u * norm_cdf(u) + norm_pdf(u))
}

/// Expected Improvement and its gradient:
/// `dEI = Phi(u) dmean + phi(u) dsigma`
pub(crate) fn ei_valgrad(
    mean: f64,
    var: f64,
    dmean: &Array1<f64>,
    dvar: &Array1<f64>,
    best: f64,
) -> (f64, Array1<f64>) {
    let sigma = var.sqrt();
    let u = improvement(mean, sigma, best);
    let (cdf, pdf) = (norm_cdf(u), norm_pdf(u));
    let value = sigma * (u * cdf + pdf);
    let grad = dmean * cdf + dvar * (pdf / (2. * sigma));
    (value, grad)
}
