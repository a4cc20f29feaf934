//! One fetch → estimate → compute step.

use std::fmt;

use crate::error::CycleError;
use crate::exchange::retry::retry_async;
use crate::exchange::Exchange;
use crate::greeks::Greeks;
use crate::logging::{log_candles, log_greeks};
use crate::state::{ChangeReport, ChangeTracker, Config};
use crate::volatility::{sample_std, MIN_SAMPLES};

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub symbol: String,
    pub candles: usize,
    pub spot: f64,
    pub sigma: f64,
    pub greeks: Greeks,
    pub changes: ChangeReport,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Delta: {}", self.greeks.delta)?;
        writeln!(f, "Gamma: {}", self.greeks.gamma)?;
        writeln!(f, "Vega: {}", self.greeks.vega)?;
        writeln!(f, "Sigma: {}", self.sigma)?;
        writeln!(f, "Delta Change: {}", self.changes.delta)?;
        write!(f, "Vega Change: {}", self.changes.vega)
    }
}

/// Run a single cycle against `exchange`.
///
/// `tracker` is only advanced once every step has succeeded; on `Err` it is
/// exactly as it was on entry.
pub async fn run_cycle<E>(
    exchange: &E,
    cfg: &Config,
    tracker: &mut ChangeTracker,
) -> Result<CycleReport, CycleError>
where
    E: Exchange + ?Sized + Sync,
{
    let candles = retry_async(&cfg.retry, "fetch_candles", || {
        exchange.fetch_candles(&cfg.symbol, cfg.candle_granularity, cfg.kline_limit)
    })
    .await
    .map_err(CycleError::Fetch)?;
    log_candles(&cfg.symbol, &candles);

    let closes: Vec<f64> = candles.iter().map(|c| c.c).collect();
    let spot = *closes
        .last()
        .ok_or(CycleError::InsufficientData { got: 0, need: MIN_SAMPLES })?;
    let sigma = sample_std(&closes)?;
    let greeks = cfg.pricing().greeks(spot, sigma)?;

    let changes = tracker.report(&greeks);
    tracker.observe(&greeks);
    log_greeks(&cfg.symbol, spot, sigma, &greeks);

    Ok(CycleReport {
        symbol: cfg.symbol.clone(),
        candles: candles.len(),
        spot,
        sigma,
        greeks,
        changes,
    })
}
