use ndarray::Array1;

use super::features::FeatureVector;

/// Scales a sparse vector to unit L2 norm; the zero vector stays zero.
pub(crate) fn normalize_vector(entries: &mut [(usize, f64)]) {
    let norm: f64 = entries.iter().map(|&(_, x)| x * x).sum::<f64>().sqrt();
    if norm > 1e-12 {
        for (_, value) in entries.iter_mut() {
            *value /= norm;
        }
    }
}

pub(crate) fn sparse_dot(x: &FeatureVector, weights: &Array1<f64>) -> f64 {
    x.entries().iter().map(|&(i, v)| v * weights[i]).sum()
}

/// Logistic function, evaluated without overflow for large |z|.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
