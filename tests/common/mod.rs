//! Scripted in-memory exchange shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use greekwatch::exchange::retry::RetryConfig;
use greekwatch::exchange::{Candle, Exchange};
use greekwatch::state::Config;

pub struct ScriptedExchange {
    script: Mutex<VecDeque<Result<Vec<f64>, String>>>,
    calls: AtomicUsize,
    on_exhausted: Option<CancellationToken>,
}

impl ScriptedExchange {
    pub fn new(script: Vec<Result<Vec<f64>, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            on_exhausted: None,
        }
    }

    /// Cancel `token` once the last scripted response has been served.
    pub fn cancel_when_done(mut self, token: CancellationToken) -> Self {
        self.on_exhausted = Some(token);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle {
            ts: 1_700_000_000 + 60 * i as u64,
            o: c,
            h: c,
            l: c,
            c,
            v: 1.0,
        })
        .collect()
}

#[async_trait]
impl Exchange for ScriptedExchange {
    async fn fetch_candles(&self, _symbol: &str, _granularity: u64, _limit: usize) -> Result<Vec<Candle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (next, exhausted) = {
            let mut script = self.script.lock().unwrap();
            let next = script.pop_front();
            (next, script.is_empty())
        };
        if exhausted {
            if let Some(token) = &self.on_exhausted {
                token.cancel();
            }
        }
        match next {
            Some(Ok(closes)) => Ok(candles(&closes)),
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("script exhausted")),
        }
    }
}

/// Config matching the monitored defaults, without retry backoff.
pub fn test_config() -> Config {
    Config {
        retry: RetryConfig::none(),
        ..Config::default()
    }
}
