/// Finite-difference slope of `values` over a unit-spaced index.
///
/// One-sided differences at both ends, centered `(v[i+1] - v[i-1]) / 2`
/// elsewhere. Fewer than two values have no defined slope and yield an
/// empty vector.
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(n);
    out.push(values[1] - values[0]);
    out.extend(values.windows(3).map(|w| (w[2] - w[0]) / 2.0));
    out.push(values[n - 1] - values[n - 2]);
    out
}
