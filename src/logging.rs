//! Structured logging for the greeks monitor.
//!
//! Every record is a single JSON line on stderr so that stdout stays
//! reserved for the human-readable cycle report.
//!
//! Records carry a process-wide sequence number and an RFC3339 timestamp,
//! and can be filtered by level (`LOG_LEVEL`) and by domain (`LOG_DOMAINS`).

use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CycleError;
use crate::exchange::Candle;
use crate::greeks::Greeks;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_LEVEL").as_deref().unwrap_or("info"))
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "warn" => Level::Warn,
            "error" => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Market,  // Candle fetches, venue errors, retries
    Pricing, // Volatility and greeks per cycle
    System,  // Startup, shutdown, session summary
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Market => "market",
            Domain::Pricing => "pricing",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

/// Pull the well-known keys up to the top level of the record.
fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["symbol", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    eprintln!("{}", render(level, domain, event, fields));
}

fn render(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) -> String {
    let (mut top, data) = split_fields(fields);

    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    if let Some(msg) = top.remove("msg") {
        entry.insert("msg".to_string(), msg);
    }
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry).to_string()
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_candles(symbol: &str, candles: &[Candle]) {
    let (first_ts, last) = match (candles.first(), candles.last()) {
        (Some(first), Some(last)) => (first.ts, *last),
        _ => return,
    };
    log(
        Level::Debug,
        Domain::Market,
        "candles",
        obj(&[
            ("symbol", v_str(symbol)),
            ("count", json!(candles.len())),
            ("first_ts", json!(first_ts)),
            ("last_ts", json!(last.ts)),
            ("last_close", v_num(last.c)),
        ]),
    );
}

pub fn log_greeks(symbol: &str, spot: f64, sigma: f64, greeks: &Greeks) {
    log(
        Level::Info,
        Domain::Pricing,
        "greeks",
        obj(&[
            ("symbol", v_str(symbol)),
            ("spot", v_num(spot)),
            ("sigma", v_num(sigma)),
            ("delta", v_num(greeks.delta)),
            ("gamma", v_num(greeks.gamma)),
            ("vega", v_num(greeks.vega)),
        ]),
    );
}

pub fn log_cycle_error(symbol: &str, err: &CycleError) {
    log(
        Level::Error,
        Domain::Pricing,
        "cycle_failed",
        obj(&[
            ("symbol", v_str(symbol)),
            ("kind", v_str(err.kind())),
            ("msg", v_str(&err.to_string())),
        ]),
    );
}

/// Session summary on shutdown
pub fn log_session_summary(duration_secs: u64, cycles_ok: u64, cycles_failed: u64) {
    log(
        Level::Info,
        Domain::System,
        "session_summary",
        obj(&[
            ("duration_secs", json!(duration_secs)),
            ("cycles_ok", json!(cycles_ok)),
            ("cycles_failed", json!(cycles_failed)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

/// Non-finite floats have no JSON representation and become `null`.
pub fn v_num(n: f64) -> Value {
    json!(n)
}
