use thiserror::Error;

/// Why a single polling cycle produced no report.
///
/// None of these are fatal; the driver logs them and waits for the next cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0:#}")]
    Fetch(#[source] anyhow::Error),

    #[error("insufficient data: got {got} closes, need at least {need}")]
    InsufficientData { got: usize, need: usize },

    #[error("degenerate input: {0}")]
    Degenerate(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CycleError {
    /// Stable label for log records.
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::Fetch(_) => "fetch",
            CycleError::InsufficientData { .. } => "insufficient_data",
            CycleError::Degenerate(_) => "degenerate",
            CycleError::InvalidInput(_) => "invalid_input",
        }
    }
}
