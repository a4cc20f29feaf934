//! Black-Scholes sensitivities for a European call.
//!
//! ```text
//! d1    = (ln(S/K) + (r + sigma^2/2) T) / (sigma sqrt(T))
//! delta = e^(-qT) N(d1)
//! gamma = e^(-qT) n(d1) / (S sigma sqrt(T))
//! vega  = S e^(-qT) n(d1) sqrt(T)
//! ```
//!
//! The dividend yield only discounts the outputs; it does not enter d1.

use serde::Serialize;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::CycleError;

/// Contract terms held constant across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricingParams {
    pub strike: f64,
    /// Years to expiry.
    pub time_to_expiry: f64,
    pub rate: f64,
    pub dividend: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
}

impl PricingParams {
    fn validate(&self, spot: f64, sigma: f64) -> Result<(), CycleError> {
        let inputs = [
            ("spot", spot),
            ("strike", self.strike),
            ("time_to_expiry", self.time_to_expiry),
            ("rate", self.rate),
            ("dividend", self.dividend),
            ("sigma", sigma),
        ];
        for (name, value) in inputs {
            if !value.is_finite() {
                return Err(CycleError::InvalidInput(format!("{} is {}", name, value)));
            }
        }
        if spot <= 0.0 {
            return Err(CycleError::InvalidInput(format!("spot must be positive, got {}", spot)));
        }
        if self.strike <= 0.0 {
            return Err(CycleError::InvalidInput(format!(
                "strike must be positive, got {}",
                self.strike
            )));
        }
        if sigma <= 0.0 {
            return Err(CycleError::Degenerate(format!("volatility is {}", sigma)));
        }
        if self.time_to_expiry <= 0.0 {
            return Err(CycleError::Degenerate(format!(
                "time to expiry is {}",
                self.time_to_expiry
            )));
        }
        Ok(())
    }

    pub fn d1(&self, spot: f64, sigma: f64) -> f64 {
        let t = self.time_to_expiry;
        ((spot / self.strike).ln() + (self.rate + sigma * sigma / 2.0) * t) / (sigma * t.sqrt())
    }

    /// Delta, gamma and vega at `spot` with volatility `sigma`.
    pub fn greeks(&self, spot: f64, sigma: f64) -> Result<Greeks, CycleError> {
        self.validate(spot, sigma)?;

        let t = self.time_to_expiry;
        let sqrt_t = t.sqrt();
        let d1 = self.d1(spot, sigma);
        let discount = (-self.dividend * t).exp();

        let normal = Normal::new(0.0, 1.0).map_err(|e| CycleError::Degenerate(e.to_string()))?;
        let cdf = normal.cdf(d1);
        let pdf = normal.pdf(d1);

        let greeks = Greeks {
            delta: discount * cdf,
            gamma: discount * pdf / (spot * sigma * sqrt_t),
            vega: spot * discount * pdf * sqrt_t,
        };

        if [greeks.delta, greeks.gamma, greeks.vega].iter().all(|g| g.is_finite()) {
            Ok(greeks)
        } else {
            Err(CycleError::Degenerate(format!(
                "non-finite greeks (d1={}) {:?}",
                d1, greeks
            )))
        }
    }
}
