use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::state::Config;

mod binance;
mod kraken;
pub mod retry;

pub use binance::Binance;
pub use kraken::Kraken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeKind {
    Binance,
    Kraken,
}

impl ExchangeKind {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(ExchangeKind::Binance),
            "kraken" => Ok(ExchangeKind::Kraken),
            other => Err(anyhow!("unknown exchange {:?} (expected binance or kraken)", other)),
        }
    }

    pub fn build(self, cfg: &Config) -> Result<Box<dyn Exchange + Send + Sync>> {
        match self {
            ExchangeKind::Binance => Ok(Box::new(Binance::new(cfg)?)),
            ExchangeKind::Kraken => Ok(Box::new(Kraken::new(cfg)?)),
        }
    }
}

/// Bar sizes, in seconds, both venues can serve.
pub const SUPPORTED_GRANULARITIES: [u64; 4] = [60, 300, 900, 3600];

/// One OHLCV bar. `ts` is the bar open time in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub ts: u64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
}

#[async_trait]
pub trait Exchange {
    /// Most recent bars for `symbol`, oldest first, at most `limit` of them.
    async fn fetch_candles(&self, symbol: &str, granularity: u64, limit: usize) -> Result<Vec<Candle>>;
}

/// Venues send prices as decimal strings; accept bare numbers too.
pub(crate) fn parse_num(value: &serde_json::Value, field: &str) -> Result<f64> {
    let parsed = match value {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("field {} is not a number: {:?}", field, s))?,
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| anyhow!("field {} out of range: {}", field, n))?,
        other => return Err(anyhow!("field {} has unexpected type: {}", field, other)),
    };
    Ok(parsed)
}

pub(crate) fn parse_ts(value: &serde_json::Value, field: &str) -> Result<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .ok_or_else(|| anyhow!("field {} is not a timestamp: {}", field, value))
}
