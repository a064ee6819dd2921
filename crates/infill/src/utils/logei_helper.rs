//! Numerically stable computation of `h(u) = ln(phi(u) + u Phi(u))`, the standardized
//! log expected improvement, and of its derivative.
//!
//! Far in the left tail `phi(u) + u Phi(u)` cancels catastrophically, it is then
//! rewritten as `phi(u) (1 - |u| Phi(u) / phi(u))` where the Mills ratio
//! `Phi(u) / phi(u) = sqrt(pi/2) erfcx(-u / sqrt(2))` stays accurate.
use crate::utils::{norm_cdf, norm_pdf};
use libm::{erfc, exp, expm1, log, log1p};

const INV_SQRT_2: f64 = std::f64::consts::FRAC_1_SQRT_2;
const SQRT_PI: f64 = 1.772_453_850_905_516;
const SQRT_PI_OVER_2: f64 = 1.253_314_137_315_500_3;
const LOG_2PI_OVER_2: f64 = 0.918_938_533_204_672_8; // log(2π)/2
const LOG_PI_OVER_2_ALL_OVER_2: f64 = 0.225_791_352_644_727_4; // log(π/2)/2
/// Below this value the asymptotic expansion `-u²/2 - 2 ln|u|` is used
const LOG_EI_ASYMPTOTE: f64 = -1e3;
/// Above this value erfcx is computed with its asymptotic series
const ERFCX_ASYMPTOTE: f64 = 25.;

/// Scaled complementary error function `exp(x²) erfc(x)`, finite for large x
pub fn erfcx(x: f64) -> f64 {
    if x < ERFCX_ASYMPTOTE {
        exp(x * x) * erfc(x)
    } else {
        let t2 = 1. / (x * x);
        (1. - 0.5 * t2 + 0.75 * t2 * t2 - 1.875 * t2 * t2 * t2) / (x * SQRT_PI)
    }
}

/// `ln(1 - exp(x))` for `x < 0`
fn log1mexp(x: f64) -> f64 {
    if x > -std::f64::consts::LN_2 {
        log(-expm1(x))
    } else {
        log1p(-exp(x))
    }
}

/// `ln(phi(u) + u Phi(u))`
pub fn log_ei_helper(u: f64) -> f64 {
    if u > -1.0 {
        log(norm_pdf(u) + u * norm_cdf(u))
    } else {
        let log_phi_u = -0.5 * u * u - LOG_2PI_OVER_2;
        let log_term = if u > LOG_EI_ASYMPTOTE {
            let w = log(erfcx(-INV_SQRT_2 * u) * u.abs()) + LOG_PI_OVER_2_ALL_OVER_2;
            log1mexp(w)
        } else {
            -2.0 * log(u.abs())
        };
        log_phi_u + log_term
    }
}

/// Derivative of [`log_ei_helper`]: `Phi(u) / (phi(u) + u Phi(u))`
pub fn d_log_ei_helper(u: f64) -> f64 {
    if u > -1.0 {
        let cdf = norm_cdf(u);
        cdf / (norm_pdf(u) + u * cdf)
    } else if u > LOG_EI_ASYMPTOTE {
        // Mills ratio Phi(u) / phi(u)
        let r = SQRT_PI_OVER_2 * erfcx(-INV_SQRT_2 * u);
        r / (1. + u * r)
    } else {
        -u - 2. / u
    }
}
