//! Fixed-window rolling statistics over plain value slices.
//!
//! Non-finite inputs (NaN or infinite) count as missing. A window containing
//! a missing value yields NaN. The first `window - 1` outputs are NaN.

/// Rolling sum over `window` values.
pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            nan_count += 1;
        } else {
            sum += v;
        }
        if i >= window {
            let leaving = values[i - window];
            if !leaving.is_finite() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }
        if i + 1 >= window && nan_count == 0 {
            result[i] = sum;
        }
    }
    result
}

/// Rolling arithmetic mean.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling_sum(values, window)
        .into_iter()
        .map(|s| s / window as f64)
        .collect()
}

/// Rolling sample standard deviation (n - 1 denominator).
///
/// Computed per window rather than incrementally so long series do not
/// accumulate cancellation error.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window < 2 || n < window {
        return result;
    }
    for i in (window - 1)..n {
        let slice = &values[(i + 1 - window)..=i];
        if slice.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        result[i] = var.sqrt();
    }
    result
}

/// Percent change versus the value `periods` steps earlier, times 100.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if periods == 0 {
        return result;
    }
    for i in periods..n {
        let prev = values[i - periods];
        let curr = values[i];
        if !prev.is_finite() || !curr.is_finite() || prev == 0.0 {
            continue;
        }
        result[i] = (curr - prev) / prev * 100.0;
    }
    result
}
