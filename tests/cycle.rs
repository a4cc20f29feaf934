mod common;

use greekwatch::cycle::run_cycle;
use greekwatch::error::CycleError;
use greekwatch::state::{Change, ChangeTracker, Config, Unavailable};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use common::{test_config, ScriptedExchange};

const WINDOW: [f64; 5] = [100.0, 101.0, 99.0, 102.0, 98.0];

/// Closed-form (delta, gamma, vega) written out independently of the crate.
fn closed_form(s: f64, k: f64, t: f64, r: f64, q: f64, sigma: f64) -> (f64, f64, f64) {
    let n = Normal::new(0.0, 1.0).unwrap();
    let d1 = ((s / k).ln() + (r + sigma.powi(2) / 2.0) * t) / (sigma * t.sqrt());
    let delta = (-q * t).exp() * n.cdf(d1);
    let gamma = (-q * t).exp() * n.pdf(d1) / (s * sigma * t.sqrt());
    let vega = s * (-q * t).exp() * n.pdf(d1) * t.sqrt();
    (delta, gamma, vega)
}

fn assert_close(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() <= 1e-9,
        "{}: got {} expected {}",
        what,
        actual,
        expected
    );
}

#[tokio::test]
async fn end_to_end_default_params_match_closed_form() {
    let cfg = test_config();
    let exchange = ScriptedExchange::new(vec![Ok(WINDOW.to_vec())]);
    let mut tracker = ChangeTracker::new();

    let report = run_cycle(&exchange, &cfg, &mut tracker).await.unwrap();

    let sigma = 2.5_f64.sqrt();
    assert_close(report.sigma, sigma, "sigma");
    assert_eq!(report.spot, 98.0);
    assert_eq!(report.candles, 5);

    let (delta, gamma, vega) = closed_form(98.0, 1.0, 1.0 / 1440.0, 0.05, 0.0, sigma);
    assert_close(report.greeks.delta, delta, "delta");
    assert_close(report.greeks.gamma, gamma, "gamma");
    assert_close(report.greeks.vega, vega, "vega");
    // Deep in the money at a one-minute expiry
    assert_close(report.greeks.delta, 1.0, "delta saturates");
}

#[tokio::test]
async fn near_the_money_strike_matches_closed_form() {
    let cfg = Config { strike: 100.0, dividend: 0.02, ..test_config() };
    let exchange = ScriptedExchange::new(vec![Ok(WINDOW.to_vec())]);
    let mut tracker = ChangeTracker::new();

    let report = run_cycle(&exchange, &cfg, &mut tracker).await.unwrap();

    let (delta, gamma, vega) = closed_form(98.0, 100.0, 1.0 / 1440.0, 0.05, 0.02, 2.5_f64.sqrt());
    assert_close(report.greeks.delta, delta, "delta");
    assert_close(report.greeks.gamma, gamma, "gamma");
    assert_close(report.greeks.vega, vega, "vega");
    assert!(report.greeks.delta > 0.0 && report.greeks.delta < 1.0);
    assert!(report.greeks.gamma > 0.0);
}

#[tokio::test]
async fn first_cycle_reports_not_available_then_percent() {
    let cfg = Config { strike: 100.0, ..test_config() };
    let exchange = ScriptedExchange::new(vec![
        Ok(vec![100.0, 101.0, 99.0, 100.0]),
        Ok(vec![100.0, 101.0, 99.0, 100.0, 101.5]),
    ]);
    let mut tracker = ChangeTracker::new();

    let first = run_cycle(&exchange, &cfg, &mut tracker).await.unwrap();
    assert_eq!(first.changes.delta, Change::NotAvailable(Unavailable::FirstSample));
    assert_eq!(first.changes.vega, Change::NotAvailable(Unavailable::FirstSample));
    assert!(first.to_string().contains("Delta Change: N/A (first calculation)"));

    let second = run_cycle(&exchange, &cfg, &mut tracker).await.unwrap();
    let expected = (second.greeks.delta - first.greeks.delta) / first.greeks.delta * 100.0;
    assert_close(second.changes.delta.percent().unwrap(), expected, "delta change");
    assert!(second.changes.vega.percent().is_some());
    assert_eq!(tracker.previous(), Some((second.greeks.delta, second.greeks.vega)));
}

#[tokio::test]
async fn zero_previous_vega_is_not_available() {
    // Default strike of 1 pins vega to 0 at these prices
    let cfg = test_config();
    let exchange = ScriptedExchange::new(vec![Ok(WINDOW.to_vec()), Ok(WINDOW.to_vec())]);
    let mut tracker = ChangeTracker::new();

    let first = run_cycle(&exchange, &cfg, &mut tracker).await.unwrap();
    assert_eq!(first.greeks.vega, 0.0);

    let second = run_cycle(&exchange, &cfg, &mut tracker).await.unwrap();
    assert_eq!(second.changes.vega, Change::NotAvailable(Unavailable::ZeroBase));
    assert_eq!(second.changes.delta, Change::Percent(0.0));
    assert!(second.to_string().contains("Vega Change: N/A (previous value was zero)"));
}

#[tokio::test]
async fn fetch_failure_leaves_tracker_untouched() {
    let cfg = test_config();
    let exchange = ScriptedExchange::new(vec![
        Ok(WINDOW.to_vec()),
        Err("503 Service Unavailable".to_string()),
    ]);
    let mut tracker = ChangeTracker::new();

    run_cycle(&exchange, &cfg, &mut tracker).await.unwrap();
    let before = tracker;

    let err = run_cycle(&exchange, &cfg, &mut tracker).await.unwrap_err();
    assert!(matches!(err, CycleError::Fetch(_)));
    assert!(err.to_string().contains("503"));
    assert_eq!(tracker, before);
}

#[tokio::test]
async fn single_close_is_insufficient_data() {
    let cfg = test_config();
    let exchange = ScriptedExchange::new(vec![Ok(vec![100.0])]);
    let mut tracker = ChangeTracker::new();

    let err = run_cycle(&exchange, &cfg, &mut tracker).await.unwrap_err();
    assert!(matches!(err, CycleError::InsufficientData { got: 1, need: 2 }));
    assert!(!tracker.is_tracking());
}

#[tokio::test]
async fn empty_response_is_insufficient_data() {
    let cfg = test_config();
    let exchange = ScriptedExchange::new(vec![Ok(vec![])]);
    let mut tracker = ChangeTracker::new();

    let err = run_cycle(&exchange, &cfg, &mut tracker).await.unwrap_err();
    assert!(matches!(err, CycleError::InsufficientData { got: 0, .. }));
}

#[tokio::test]
async fn flat_prices_are_degenerate() {
    let cfg = test_config();
    let exchange = ScriptedExchange::new(vec![Ok(vec![100.0; 10])]);
    let mut tracker = ChangeTracker::new();

    let err = run_cycle(&exchange, &cfg, &mut tracker).await.unwrap_err();
    assert!(matches!(err, CycleError::Degenerate(_)));
    assert!(!tracker.is_tracking());
}

#[tokio::test]
async fn retries_recover_transient_fetch_errors() {
    let mut cfg = test_config();
    cfg.retry.max_retries = 2;
    cfg.retry.base_delay_ms = 1;
    let exchange = ScriptedExchange::new(vec![
        Err("timeout".to_string()),
        Ok(WINDOW.to_vec()),
    ]);
    let mut tracker = ChangeTracker::new();

    let report = run_cycle(&exchange, &cfg, &mut tracker).await.unwrap();
    assert_eq!(exchange.calls(), 2);
    assert_eq!(report.spot, 98.0);
}
