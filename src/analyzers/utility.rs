/// Computes the arithmetic mean of a slice of values.
///
/// Accumulates incrementally so large finite inputs cannot overflow the sum.
/// Returns `None` for empty input or a non-finite result.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values
        .iter()
        .enumerate()
        .fold(0.0, |acc, (i, x)| acc + (x - acc) / (i + 1) as f64);
    Some(mean).filter(|m| m.is_finite())
}
