use data::{CandlePoint, DarkPoolBucket, SeriesPoint};

/// Addresses one value series on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesId {
    SweepAtBid,
    SweepAtAsk,
    SweepUnknown,
    DarkPool(DarkPoolBucket),
}

impl std::fmt::Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesId::SweepAtBid => write!(f, "sweep_at_bid"),
            SeriesId::SweepAtAsk => write!(f, "sweep_at_ask"),
            SeriesId::SweepUnknown => write!(f, "sweep_unknown"),
            SeriesId::DarkPool(bucket) => write!(f, "dark_pool_{bucket}"),
        }
    }
}

/// The rendering surface this core drives: a chart widget taking sorted,
/// unique-keyed arrays for bulk replacement and single points for upserts.
/// The widget itself (wgpu, canvas, whatever hosts it) lives outside this
/// crate; everything here talks through this seam.
pub trait ChartSurface {
    fn set_candles(&mut self, candles: &[CandlePoint]);
    fn update_candle(&mut self, candle: CandlePoint);
    fn set_series(&mut self, id: SeriesId, points: &[SeriesPoint]);
    fn update_series(&mut self, id: SeriesId, point: SeriesPoint);
    fn set_visible_range(&mut self, from: u64, to: u64);
    fn set_legend(&mut self, text: &str);
    fn clear_legend(&mut self);
}

/// Headless surface: mutations go to the log. Lets the client run against a
/// live feed without a widget attached.
#[derive(Debug, Default)]
pub struct TraceSurface;

impl ChartSurface for TraceSurface {
    fn set_candles(&mut self, candles: &[CandlePoint]) {
        log::debug!("candles: set {} points", candles.len());
    }

    fn update_candle(&mut self, candle: CandlePoint) {
        log::debug!(
            "candles: update t={} c={:.2}",
            candle.time,
            candle.close
        );
    }

    fn set_series(&mut self, id: SeriesId, points: &[SeriesPoint]) {
        log::debug!("{id}: set {} points", points.len());
    }

    fn update_series(&mut self, id: SeriesId, point: SeriesPoint) {
        log::debug!("{id}: update t={} v={}", point.time, point.value);
    }

    fn set_visible_range(&mut self, from: u64, to: u64) {
        log::debug!("visible range {from}..{to}");
    }

    fn set_legend(&mut self, text: &str) {
        log::debug!("legend: {}", text.replace('\n', " / "));
    }

    fn clear_legend(&mut self) {
        log::debug!("legend cleared");
    }
}
