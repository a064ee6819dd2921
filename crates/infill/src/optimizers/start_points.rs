use ndarray::{Array1, ArrayBase, Data, Ix1};
use ndarray_rand::rand::Rng;
use ndarray_stats::QuantileExt;

/// Local search starting points picked among preliminary samples
#[derive(Debug)]
pub(crate) struct StartPool {
    /// Indices of chosen samples, the best sample first
    pub indices: Vec<usize>,
    /// Number of samples with non zero selection weight (best sample excluded)
    pub n_candidates: usize,
    /// Whether fewer samples than requested could be selected
    pub reduced: bool,
}

/// Choose the best sample then up to `n_additional` other samples by roulette wheel
/// selection without replacement, each sample being weighted by `exp(f - f_max)`.
///
/// Samples whose weight underflows to zero are never selected: when there are not more
/// candidates than requested, the pool is flagged as reduced.
pub(crate) fn select_start_points<R: Rng>(
    values: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    n_additional: usize,
    rng: &mut R,
) -> Option<StartPool> {
    let values = values.mapv(|v| if v.is_nan() { f64::NEG_INFINITY } else { v });
    let best = values.argmax().ok()?;
    let fmax = values[best];

    let mut weights: Array1<f64> = if fmax.is_finite() {
        values.mapv(|v| (v - fmax).exp())
    } else {
        Array1::zeros(values.len())
    };
    weights[best] = 0.;
    let n_candidates = weights.iter().filter(|w| **w > 0.).count();
    let n_select = n_additional.min(n_candidates);

    let mut indices = vec![best];
    for _ in 0..n_select {
        match roulette(&weights, rng) {
            Some(i) => {
                weights[i] = 0.;
                indices.push(i);
            }
            None => break,
        }
    }
    Some(StartPool {
        indices,
        n_candidates,
        reduced: n_select == n_candidates,
    })
}

/// Draw one index with probability proportional to `weights`
fn roulette<R: Rng>(weights: &Array1<f64>, rng: &mut R) -> Option<usize> {
    let total: f64 = weights.sum();
    if total <= 0. {
        return None;
    }
    let target = rng.gen::<f64>() * total;
    let mut acc = 0.;
    let mut last = None;
    for (i, w) in weights.iter().enumerate() {
        if *w > 0. {
            acc += w;
            last = Some(i);
            if acc > target {
                return Some(i);
            }
        }
    }
    // rounding may leave target just above the cumulated sum
    last
}
