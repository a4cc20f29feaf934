use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::exchange::{parse_num, parse_ts, Candle, Exchange};
use crate::state::Config;

/// Binance caps a single klines request at 1000 rows.
const MAX_LIMIT: usize = 1000;

pub struct Binance {
    client: Client,
    base: String,
}

impl Binance {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(cfg.http_timeout)
                .build()
                .context("building http client")?,
            base: cfg.binance_base.clone(),
        })
    }

    fn as_kline_interval(granularity: u64) -> &'static str {
        match granularity {
            60 => "1m",
            300 => "5m",
            900 => "15m",
            3600 => "1h",
            _ => "1m",
        }
    }

    fn klines_url(&self, symbol: &str, granularity: u64, limit: usize) -> Result<Url> {
        let limit = limit.clamp(1, MAX_LIMIT).to_string();
        Url::parse_with_params(
            &format!("{}/api/v3/klines", self.base.trim_end_matches('/')),
            &[
                ("symbol", symbol),
                ("interval", Self::as_kline_interval(granularity)),
                ("limit", limit.as_str()),
            ],
        )
        .context("building klines url")
    }
}

#[derive(Deserialize, Debug)]
struct BinanceError {
    code: i64,
    msg: String,
}

/// Kline rows are `[open_time_ms, "o", "h", "l", "c", "v", close_time_ms, ...]`.
fn parse_klines(rows: &[Vec<Value>]) -> Result<Vec<Candle>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() < 6 {
                return Err(anyhow!("kline {} has {} fields, expected at least 6", i, row.len()));
            }
            Ok(Candle {
                ts: parse_ts(&row[0], "open_time")? / 1000,
                o: parse_num(&row[1], "open")?,
                h: parse_num(&row[2], "high")?,
                l: parse_num(&row[3], "low")?,
                c: parse_num(&row[4], "close")?,
                v: parse_num(&row[5], "volume")?,
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl Exchange for Binance {
    async fn fetch_candles(&self, symbol: &str, granularity: u64, limit: usize) -> Result<Vec<Candle>> {
        let url = self.klines_url(symbol, granularity, limit)?;
        let resp = self.client.get(url).send().await.context("GET klines")?;

        let status = resp.status();
        let body = resp.text().await.context("reading klines body")?;

        if !status.is_success() {
            let err: BinanceError = serde_json::from_str(&body)
                .unwrap_or(BinanceError { code: -1, msg: body.clone() });
            return Err(anyhow!("Binance klines failed ({}): {} - {}", status, err.code, err.msg));
        }

        let rows: Vec<Vec<Value>> = serde_json::from_str(&body).context("decoding klines")?;
        parse_klines(&rows)
    }
}
