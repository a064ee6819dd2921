use libm::erfc;

const SQRT_2PI: f64 = 2.5066282746310007;

/// Cumulative distribution function of Standard Normal at x
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Probability density function of Standard Normal at x
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / SQRT_2PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_norm_cdf_pdf() {
        assert_abs_diff_eq!(norm_cdf(0.), 0.5);
        assert_abs_diff_eq!(norm_cdf(1.959963984540054), 0.975, epsilon = 1e-12);
        assert_abs_diff_eq!(norm_cdf(-1.), 1. - norm_cdf(1.), epsilon = 1e-15);
        assert_abs_diff_eq!(norm_pdf(0.), 0.3989422804014327, epsilon = 1e-15);
        assert!(norm_cdf(-30.) > 0.);
    }
}
