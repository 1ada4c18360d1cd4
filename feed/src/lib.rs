pub mod adapter;
pub mod connect;
pub mod resilience;
pub mod unit;

pub use adapter::{Command, Event, EventKind, FeedError, FeedMessage};
use unit::Cents;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use std::fmt;

/// One fixed-duration period of trading activity as the analytics server
/// reports it: millisecond period start, OHLC in cents, share volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub period_start: u64,
    pub open: Cents,
    pub high: Cents,
    pub low: Cents,
    pub close: Cents,
    #[serde(default)]
    pub volume: u64,
}

impl Candle {
    /// Chart key: period start normalized to seconds.
    pub fn time_secs(&self) -> u64 {
        self.period_start / 1_000
    }

    /// A period with any non-positive OHLC field never reaches the price
    /// series; the server emits zeroed candles for periods it could not
    /// price.
    pub fn has_valid_prices(&self) -> bool {
        self.open.is_positive()
            && self.high.is_positive()
            && self.low.is_positive()
            && self.close.is_positive()
    }
}

/// One closed period with its derived microstructure statistics.
///
/// `candle.period_start` is the natural key; within one session's history it
/// is unique. Sweep volumes are mutually exclusive categories. Dark-pool
/// fields are zero for periods without off-exchange prints.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPoint {
    pub candle: Candle,
    #[serde(default)]
    pub sweep_at_bid: u64,
    #[serde(default)]
    pub sweep_at_ask: u64,
    #[serde(default)]
    pub sweep_unknown: u64,
    #[serde(default)]
    pub dark_pool_sum: Cents,
    #[serde(default, rename = "darkPoolVWAP")]
    pub dark_pool_vwap: Cents,
    #[serde(default)]
    pub largest_dark_pool_txn: Cents,
    #[serde(default)]
    pub sweep_ratio: f64,
}

impl AnalysisPoint {
    pub fn period_start(&self) -> u64 {
        self.candle.period_start
    }

    pub fn time_secs(&self) -> u64 {
        self.candle.time_secs()
    }

    /// Whether the period carries a plottable dark-pool print. Both the
    /// dollar sum and the VWAP must be positive; one without the other is a
    /// partial aggregate the chart cannot place.
    pub fn has_dark_pool_print(&self) -> bool {
        self.dark_pool_sum.is_positive() && self.dark_pool_vwap.is_positive()
    }
}

/// The currently-forming, not-yet-closed period. Candle-shaped; the derived
/// sweep/dark-pool statistics only exist once the period closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPeriod {
    pub period_start: u64,
    pub open: Cents,
    pub high: Cents,
    pub low: Cents,
    pub close: Cents,
    #[serde(default)]
    pub volume: u64,
}

impl PendingPeriod {
    pub fn time_secs(&self) -> u64 {
        self.period_start / 1_000
    }

    pub fn has_valid_prices(&self) -> bool {
        self.open.is_positive()
            && self.high.is_positive()
            && self.low.is_positive()
            && self.close.is_positive()
    }
}

/// A selectable trading session: date plus optional ticker/interval
/// overrides. Matches the `server_default_date` payload and the
/// `select_date` request body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Session {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

impl Session {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            ticker: None,
            interval: None,
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date)?;
        if let Some(ticker) = &self.ticker {
            write!(f, " {ticker}")?;
        }
        if let Some(interval) = &self.interval {
            write!(f, " @{interval}")?;
        }
        Ok(())
    }
}
