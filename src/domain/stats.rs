//! Sample statistics shared by the derived factors and the metrics.
//!
//! Dispersion uses the n - 1 denominator and is 0 below two samples.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (ma, mb) = (mean(a), mean(b));
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (n - 1) as f64
}

pub fn sample_variance(values: &[f64]) -> f64 {
    sample_covariance(values, values)
}

pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}
