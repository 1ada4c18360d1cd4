use crate::bucket::DarkPoolBucket;

use enum_map::EnumMap;
use feed::{AnalysisPoint, Candle, PendingPeriod};
use rustc_hash::FxHashMap;

use std::collections::BTreeMap;

/// One value point on a chart series: key in seconds, value in dollars
/// (or shares, for the sweep histograms).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub time: u64,
    pub value: f64,
}

/// One OHLC point on the price series, in dollars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandlePoint {
    pub time: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<&Candle> for CandlePoint {
    fn from(candle: &Candle) -> Self {
        Self {
            time: candle.time_secs(),
            open: candle.open.to_dollars(),
            high: candle.high.to_dollars(),
            low: candle.low.to_dollars(),
            close: candle.close.to_dollars(),
        }
    }
}

impl From<&PendingPeriod> for CandlePoint {
    fn from(pending: &PendingPeriod) -> Self {
        Self {
            time: pending.time_secs(),
            open: pending.open.to_dollars(),
            high: pending.high.to_dollars(),
            low: pending.low.to_dollars(),
            close: pending.close.to_dollars(),
        }
    }
}

/// Which of the two merge paths a point arrived on. Snapshots keep the
/// first occurrence of a duplicated key (bulk reloads occasionally carry
/// trailing duplicates of one period); appends keep the latest (re-sends
/// carry corrections). The asymmetry is the observable contract of the
/// feed and is preserved deliberately.
#[derive(Clone, Copy, PartialEq, Eq)]
enum MergePolicy {
    FirstWins,
    LastWins,
}

/// Canonical owner of one session's analysis history and every derived
/// chart series.
///
/// `history` is the raw, ungapped append list exactly as delivered. The
/// derived series dedupe, validate, and order it; they are `BTreeMap`s
/// keyed by period-start seconds, so after any sequence of
/// `load_snapshot`/`append_point` calls every series iterates strictly
/// ascending with unique keys.
#[derive(Default)]
pub struct SeriesStore {
    history: Vec<AnalysisPoint>,
    candles: BTreeMap<u64, CandlePoint>,
    sweep_at_bid: BTreeMap<u64, f64>,
    sweep_at_ask: BTreeMap<u64, f64>,
    sweep_unknown: BTreeMap<u64, f64>,
    dark_pool: EnumMap<DarkPoolBucket, BTreeMap<u64, f64>>,
    index: FxHashMap<u64, AnalysisPoint>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all state with a history snapshot.
    pub fn load_snapshot(&mut self, points: Vec<AnalysisPoint>) {
        self.clear_derived();

        for point in &points {
            self.merge_point(point, MergePolicy::FirstWins);
            self.index
                .entry(point.time_secs())
                .or_insert_with(|| point.clone());
        }

        self.history = points;
    }

    /// Adds one closed point to the history and upserts every derived
    /// series. Arrival order is non-decreasing in practice, but duplicate
    /// delivery must stay correct, so this upserts by key rather than
    /// blind-appending.
    pub fn append_point(&mut self, point: AnalysisPoint) {
        self.merge_point(&point, MergePolicy::LastWins);
        // The index answers "what was delivered at this key" and keeps the
        // first occurrence, like a linear scan over the raw history would.
        self.index
            .entry(point.time_secs())
            .or_insert_with(|| point.clone());
        self.history.push(point);
    }

    /// Clears the raw history and all derived state. Used on session
    /// switches; nothing of the old session may remain visible.
    pub fn reset(&mut self) {
        self.history.clear();
        self.clear_derived();
    }

    /// Crosshair lookup: the full analysis point at a normalized time key,
    /// or `None` when hovering a gap.
    pub fn resolve(&self, time_secs: u64) -> Option<&AnalysisPoint> {
        self.index.get(&time_secs)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn latest_closed(&self) -> Option<&AnalysisPoint> {
        self.history.last()
    }

    pub fn candles(&self) -> impl Iterator<Item = CandlePoint> + '_ {
        self.candles.values().copied()
    }

    pub fn sweep_at_bid(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
        Self::value_series(&self.sweep_at_bid)
    }

    pub fn sweep_at_ask(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
        Self::value_series(&self.sweep_at_ask)
    }

    pub fn sweep_unknown(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
        Self::value_series(&self.sweep_unknown)
    }

    pub fn dark_pool(&self, bucket: DarkPoolBucket) -> impl Iterator<Item = SeriesPoint> + '_ {
        Self::value_series(&self.dark_pool[bucket])
    }

    fn value_series(series: &BTreeMap<u64, f64>) -> impl Iterator<Item = SeriesPoint> + '_ {
        series.iter().map(|(&time, &value)| SeriesPoint { time, value })
    }

    fn clear_derived(&mut self) {
        self.candles.clear();
        self.sweep_at_bid.clear();
        self.sweep_at_ask.clear();
        self.sweep_unknown.clear();
        for (_, series) in &mut self.dark_pool {
            series.clear();
        }
        self.index.clear();
    }

    fn merge_point(&mut self, point: &AnalysisPoint, policy: MergePolicy) {
        let time = point.time_secs();

        // Zero/negative OHLC disqualifies a point from the price series
        // only; its sweep activity is still real.
        if point.candle.has_valid_prices() {
            let candle = CandlePoint::from(&point.candle);
            match policy {
                MergePolicy::FirstWins => {
                    self.candles.entry(time).or_insert(candle);
                }
                MergePolicy::LastWins => {
                    self.candles.insert(time, candle);
                }
            }
        }

        let sweeps = [
            (&mut self.sweep_at_bid, point.sweep_at_bid as f64),
            (&mut self.sweep_at_ask, point.sweep_at_ask as f64),
            (&mut self.sweep_unknown, point.sweep_unknown as f64),
        ];
        for (series, value) in sweeps {
            match policy {
                MergePolicy::FirstWins => {
                    series.entry(time).or_insert(value);
                }
                MergePolicy::LastWins => {
                    series.insert(time, value);
                }
            }
        }

        self.merge_dark_pool(point, time, policy);
    }

    /// A key lives in exactly one bucket series. First-wins keeps whatever
    /// bucket the first occurrence landed in; last-wins re-homes the key
    /// when a corrected sum crosses a threshold, and evicts it when the
    /// correction no longer carries a plottable print.
    fn merge_dark_pool(&mut self, point: &AnalysisPoint, time: u64, policy: MergePolicy) {
        let already_bucketed = DarkPoolBucket::ALL
            .iter()
            .any(|&bucket| self.dark_pool[bucket].contains_key(&time));

        match policy {
            MergePolicy::FirstWins => {
                if already_bucketed || !point.has_dark_pool_print() {
                    return;
                }
            }
            MergePolicy::LastWins => {
                if already_bucketed {
                    for (_, series) in &mut self.dark_pool {
                        series.remove(&time);
                    }
                }
                if !point.has_dark_pool_print() {
                    return;
                }
            }
        }

        let bucket = DarkPoolBucket::classify(point.dark_pool_sum.to_dollars());
        self.dark_pool[bucket].insert(time, point.dark_pool_vwap.to_dollars());
    }
}
