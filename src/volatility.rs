use crate::error::CycleError;

/// Minimum window for a sample standard deviation (n - 1 divisor).
pub const MIN_SAMPLES: usize = 2;

/// Sample standard deviation of a window of closes.
///
/// Note this is the dispersion of raw prices, not of returns, so it scales
/// with the price level of the pair.
pub fn sample_std(closes: &[f64]) -> Result<f64, CycleError> {
    let n = closes.len();
    if n < MIN_SAMPLES {
        return Err(CycleError::InsufficientData { got: n, need: MIN_SAMPLES });
    }
    if let Some(bad) = closes.iter().find(|x| !x.is_finite()) {
        return Err(CycleError::InvalidInput(format!("non-finite close {}", bad)));
    }

    let mean = closes.iter().sum::<f64>() / n as f64;
    let m2 = closes.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
    Ok((m2 / (n as f64 - 1.0)).sqrt())
}
