//! Black-Scholes greeks monitor for exchange-traded pairs.
//!
//! Each cycle fetches recent 1-minute candles, estimates volatility from the
//! closes, and reports delta, gamma and vega together with the percentage
//! change of delta and vega since the previous successful cycle.

pub mod cycle;
pub mod driver;
pub mod error;
pub mod exchange;
pub mod greeks;
pub mod logging;
pub mod state;
pub mod volatility;
