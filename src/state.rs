use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::exchange::retry::RetryConfig;
use crate::exchange::{ExchangeKind, SUPPORTED_GRANULARITIES};
use crate::greeks::{Greeks, PricingParams};
use crate::volatility::MIN_SAMPLES;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub symbol: String,
    pub exchange: ExchangeKind,
    pub strike: f64,
    /// Years to expiry; one minute by default.
    pub time_to_expiry: f64,
    pub rate: f64,
    pub dividend: f64,
    /// Pause after each cycle, not a fixed cadence.
    pub interval_secs: u64,
    pub candle_granularity: u64,
    pub kline_limit: usize,
    pub retry: RetryConfig,
    pub http_timeout: Duration,
    pub binance_base: String,
    pub kraken_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            exchange: ExchangeKind::Binance,
            strike: 1.0,
            time_to_expiry: 1.0 / 1440.0,
            rate: 0.05,
            dividend: 0.0,
            interval_secs: 60,
            candle_granularity: 60,
            kline_limit: 500,
            retry: RetryConfig::default(),
            http_timeout: Duration::from_secs(10),
            binance_base: "https://api.binance.com".to_string(),
            kraken_base: "https://api.kraken.com".to_string(),
        }
    }
}

fn lookup_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {}={:?}", key, raw)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        let exchange = match lookup("EXCHANGE") {
            Some(raw) => ExchangeKind::parse(&raw)?,
            None => d.exchange,
        };
        let cfg = Self {
            symbol: lookup("SYMBOL").unwrap_or(d.symbol),
            exchange,
            strike: lookup_or(&lookup, "STRIKE", d.strike)?,
            time_to_expiry: lookup_or(&lookup, "EXPIRY_YEARS", d.time_to_expiry)?,
            rate: lookup_or(&lookup, "RATE", d.rate)?,
            dividend: lookup_or(&lookup, "DIVIDEND", d.dividend)?,
            interval_secs: lookup_or(&lookup, "INTERVAL_SECS", d.interval_secs)?,
            candle_granularity: lookup_or(&lookup, "CANDLE_SECS", d.candle_granularity)?,
            kline_limit: lookup_or(&lookup, "KLINE_LIMIT", d.kline_limit)?,
            retry: RetryConfig {
                max_retries: lookup_or(&lookup, "FETCH_RETRIES", d.retry.max_retries)?,
                ..d.retry
            },
            http_timeout: Duration::from_secs(lookup_or(
                &lookup,
                "HTTP_TIMEOUT_SECS",
                d.http_timeout.as_secs(),
            )?),
            binance_base: lookup("BINANCE_BASE").unwrap_or(d.binance_base),
            kraken_base: lookup("KRAKEN_BASE").unwrap_or(d.kraken_base),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            bail!("SYMBOL must not be empty");
        }
        for (name, value) in [
            ("STRIKE", self.strike),
            ("EXPIRY_YEARS", self.time_to_expiry),
        ] {
            if !(value.is_finite() && value > 0.0) {
                bail!("{} must be a positive number, got {}", name, value);
            }
        }
        for (name, value) in [("RATE", self.rate), ("DIVIDEND", self.dividend)] {
            if !value.is_finite() {
                bail!("{} must be finite, got {}", name, value);
            }
        }
        if self.interval_secs == 0 {
            bail!("INTERVAL_SECS must be at least 1");
        }
        if !SUPPORTED_GRANULARITIES.contains(&self.candle_granularity) {
            bail!(
                "CANDLE_SECS must be one of {:?}, got {}",
                SUPPORTED_GRANULARITIES,
                self.candle_granularity
            );
        }
        if self.kline_limit < MIN_SAMPLES {
            return Err(anyhow!(
                "KLINE_LIMIT must be at least {}, got {}",
                MIN_SAMPLES,
                self.kline_limit
            ));
        }
        if self.http_timeout.is_zero() {
            bail!("HTTP_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }

    pub fn pricing(&self) -> PricingParams {
        PricingParams {
            strike: self.strike,
            time_to_expiry: self.time_to_expiry,
            rate: self.rate,
            dividend: self.dividend,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// =============================================================================
// Change tracking between cycles
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    FirstSample,
    ZeroBase,
    /// Previous value so small the ratio overflows.
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Change {
    Percent(f64),
    NotAvailable(Unavailable),
}

impl Change {
    pub fn between(previous: Option<f64>, current: f64) -> Self {
        match previous {
            None => Change::NotAvailable(Unavailable::FirstSample),
            Some(prev) if prev == 0.0 => Change::NotAvailable(Unavailable::ZeroBase),
            Some(prev) => {
                let pct = (current - prev) / prev * 100.0;
                if pct.is_finite() {
                    Change::Percent(pct)
                } else {
                    Change::NotAvailable(Unavailable::NonFinite)
                }
            }
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Change::Percent(p) => Some(*p),
            Change::NotAvailable(_) => None,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Percent(p) => write!(f, "{:+.2}%", p),
            Change::NotAvailable(Unavailable::FirstSample) => write!(f, "N/A (first calculation)"),
            Change::NotAvailable(Unavailable::ZeroBase) => write!(f, "N/A (previous value was zero)"),
            Change::NotAvailable(Unavailable::NonFinite) => write!(f, "N/A (change out of range)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeReport {
    pub delta: Change,
    pub vega: Change,
}

/// Delta and vega from the last successful cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChangeTracker {
    prev_delta: Option<f64>,
    prev_vega: Option<f64>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracking(&self) -> bool {
        self.prev_delta.is_some()
    }

    pub fn previous(&self) -> Option<(f64, f64)> {
        self.prev_delta.zip(self.prev_vega)
    }

    pub fn report(&self, greeks: &Greeks) -> ChangeReport {
        ChangeReport {
            delta: Change::between(self.prev_delta, greeks.delta),
            vega: Change::between(self.prev_vega, greeks.vega),
        }
    }

    pub fn observe(&mut self, greeks: &Greeks) {
        self.prev_delta = Some(greeks.delta);
        self.prev_vega = Some(greeks.vega);
    }
}
