/// IV Rank: where the current implied volatility sits inside its historical
/// min/max range, on a 0–100 scale.
///
/// Returns `None` when there is no finite history or the range is degenerate
/// (min == max), since the rank is undefined there.
pub fn iv_rank(current: f64, history: &[f64]) -> Option<f64> {
    if !current.is_finite() {
        return None;
    }
    let (min, max) = history
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() || max - min <= f64::EPSILON {
        return None;
    }
    Some(((current - min) / (max - min) * 100.0).clamp(0.0, 100.0))
}
