use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::exchange::{parse_num, parse_ts, Candle, Exchange};
use crate::state::Config;

pub struct Kraken {
    client: Client,
    base: String,
}

impl Kraken {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(cfg.http_timeout)
                .build()
                .context("building http client")?,
            base: cfg.kraken_base.clone(),
        })
    }

    fn as_kraken_interval(granularity: u64) -> u64 {
        match granularity {
            60 => 1,
            300 => 5,
            900 => 15,
            3600 => 60,
            _ => 1,
        }
    }

    fn to_kraken_pair(symbol: &str) -> String {
        if symbol.starts_with("BTC") {
            symbol.replacen("BTC", "XBT", 1)
        } else {
            symbol.to_string()
        }
    }

    fn ohlc_url(&self, symbol: &str, granularity: u64) -> Result<Url> {
        let pair = Self::to_kraken_pair(symbol);
        let interval = Self::as_kraken_interval(granularity).to_string();
        Url::parse_with_params(
            &format!("{}/0/public/OHLC", self.base.trim_end_matches('/')),
            &[("pair", pair.as_str()), ("interval", interval.as_str())],
        )
        .context("building OHLC url")
    }
}

#[derive(Deserialize, Debug)]
struct KrakenResp<T> {
    error: Vec<String>,
    result: Option<T>,
}

/// OHLC rows are `[time_s, "o", "h", "l", "c", "vwap", "volume", count]`,
/// keyed by the venue's pair name next to a `last` cursor.
fn parse_ohlc(resp: KrakenResp<Value>, limit: usize) -> Result<Vec<Candle>> {
    if !resp.error.is_empty() {
        return Err(anyhow!("Kraken error: {:?}", resp.error));
    }

    let result = resp.result.ok_or_else(|| anyhow!("missing result"))?;
    let arr = result.as_object().ok_or_else(|| anyhow!("invalid kraken response"))?;
    let (_, series) = arr
        .iter()
        .find(|(k, _)| *k != "last")
        .ok_or_else(|| anyhow!("missing series"))?;
    let rows = series.as_array().ok_or_else(|| anyhow!("bad series"))?;

    let skip = rows.len().saturating_sub(limit);
    rows.iter()
        .skip(skip)
        .map(|row| {
            let row = row.as_array().ok_or_else(|| anyhow!("bad row"))?;
            if row.len() < 7 {
                return Err(anyhow!("OHLC row has {} fields, expected at least 7", row.len()));
            }
            Ok(Candle {
                ts: parse_ts(&row[0], "time")?,
                o: parse_num(&row[1], "open")?,
                h: parse_num(&row[2], "high")?,
                l: parse_num(&row[3], "low")?,
                c: parse_num(&row[4], "close")?,
                v: parse_num(&row[6], "volume")?,
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl Exchange for Kraken {
    async fn fetch_candles(&self, symbol: &str, granularity: u64, limit: usize) -> Result<Vec<Candle>> {
        let url = self.ohlc_url(symbol, granularity)?;
        let resp = self.client.get(url).send().await.context("GET OHLC")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("Kraken OHLC failed: {}", status));
        }
        let data: KrakenResp<Value> = resp.json().await.context("decoding OHLC")?;
        parse_ohlc(data, limit)
    }
}
