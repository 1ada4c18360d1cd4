use crate::surface::{ChartSurface, SeriesId};

use data::{CandlePoint, DarkPoolBucket, SeriesPoint, SeriesStore, pending};
use feed::{AnalysisPoint, PendingPeriod, unit};

/// Trailing window shown after a snapshot loads.
const VISIBLE_WINDOW_SECS: u64 = 2 * 60 * 60;
/// Cap on how many periods the initial window may span.
const VISIBLE_MAX_PERIODS: usize = 120;
/// Breathing room to the right of the latest bar.
const RIGHT_MARGIN_SECS: u64 = 5 * 60;

/// Pushes store state onto the rendering surface.
///
/// The store owns the truth; this view only translates commits into
/// surface calls: bulk `set_*` after a snapshot, single-point `update_*`
/// per append, one candle upsert per accepted pending refinement. Each
/// store mutation is followed synchronously by its surface notification.
pub struct ChartView<S> {
    surface: S,
}

impl<S: ChartSurface> ChartView<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Blanks every series. Run when a session switch invalidates displayed
    /// state, before the next snapshot arrives.
    pub fn clear(&mut self) {
        self.surface.set_candles(&[]);
        for id in Self::value_series_ids() {
            self.surface.set_series(id, &[]);
        }
        self.surface.clear_legend();
    }

    /// Bulk-replaces every series from a freshly loaded snapshot and frames
    /// the trailing window.
    pub fn load_history(&mut self, store: &SeriesStore) {
        let candles: Vec<CandlePoint> = store.candles().collect();
        self.surface.set_candles(&candles);

        self.surface
            .set_series(SeriesId::SweepAtBid, &store.sweep_at_bid().collect::<Vec<_>>());
        self.surface
            .set_series(SeriesId::SweepAtAsk, &store.sweep_at_ask().collect::<Vec<_>>());
        self.surface.set_series(
            SeriesId::SweepUnknown,
            &store.sweep_unknown().collect::<Vec<_>>(),
        );

        for bucket in DarkPoolBucket::ALL {
            self.surface.set_series(
                SeriesId::DarkPool(bucket),
                &store.dark_pool(bucket).collect::<Vec<_>>(),
            );
        }

        if let Some((from, to)) = initial_visible_range(&candles) {
            self.surface.set_visible_range(from, to);
        }
    }

    /// Pushes one appended closed point. Sweep series update regardless of
    /// candle validity; the candle updates only when priced and not
    /// superseded by a newer forming bar already on screen.
    pub fn apply_append(&mut self, point: &AnalysisPoint, current_pending: Option<&PendingPeriod>) {
        let time = point.time_secs();

        if point.candle.has_valid_prices()
            && !pending::closed_superseded_by_pending(point, current_pending)
        {
            self.surface.update_candle(CandlePoint::from(&point.candle));
        }

        self.surface.update_series(
            SeriesId::SweepAtBid,
            SeriesPoint {
                time,
                value: point.sweep_at_bid as f64,
            },
        );
        self.surface.update_series(
            SeriesId::SweepAtAsk,
            SeriesPoint {
                time,
                value: point.sweep_at_ask as f64,
            },
        );
        self.surface.update_series(
            SeriesId::SweepUnknown,
            SeriesPoint {
                time,
                value: point.sweep_unknown as f64,
            },
        );

        if point.has_dark_pool_print() {
            let bucket = DarkPoolBucket::classify(point.dark_pool_sum.to_dollars());
            self.surface.update_series(
                SeriesId::DarkPool(bucket),
                SeriesPoint {
                    time,
                    value: point.dark_pool_vwap.to_dollars(),
                },
            );
        }
    }

    /// Extends/refreshes the forming bar. The closed history is untouched;
    /// the next snapshot or closed point owns this key eventually.
    pub fn apply_pending(&mut self, pending_period: &PendingPeriod) {
        self.surface.update_candle(CandlePoint::from(pending_period));
    }

    /// Renders the inspection legend for the hovered point, or clears it
    /// when the crosshair sits on a gap.
    pub fn crosshair(&mut self, resolved: Option<&AnalysisPoint>) {
        match resolved {
            Some(point) => {
                let text = legend_text(point);
                self.surface.set_legend(&text);
            }
            None => self.surface.clear_legend(),
        }
    }

    fn value_series_ids() -> impl Iterator<Item = SeriesId> {
        [
            SeriesId::SweepAtBid,
            SeriesId::SweepAtAsk,
            SeriesId::SweepUnknown,
        ]
        .into_iter()
        .chain(DarkPoolBucket::ALL.into_iter().map(SeriesId::DarkPool))
    }
}

fn initial_visible_range(candles: &[CandlePoint]) -> Option<(u64, u64)> {
    let last = candles.last()?;

    let window_start = last.time.saturating_sub(VISIBLE_WINDOW_SECS);
    let cap_start = candles[candles.len().saturating_sub(VISIBLE_MAX_PERIODS)].time;

    Some((window_start.max(cap_start), last.time + RIGHT_MARGIN_SECS))
}

fn legend_text(point: &AnalysisPoint) -> String {
    let c = &point.candle;
    let mut text = format!(
        "O: {:.2} H: {:.2} L: {:.2} C: {:.2}\n",
        c.open.to_dollars(),
        c.high.to_dollars(),
        c.low.to_dollars(),
        c.close.to_dollars(),
    );

    text.push_str(&format!(
        "Bid: {} | Ask: {} | Unk: {}",
        unit::format_compact(point.sweep_at_bid as f64),
        unit::format_compact(point.sweep_at_ask as f64),
        unit::format_compact(point.sweep_unknown as f64),
    ));

    if point.has_dark_pool_print() {
        text.push_str(&format!(
            "\nDP VWAP: {} | $ Vol: {} | Largest: {}",
            point.dark_pool_vwap,
            unit::format_compact(point.dark_pool_sum.to_dollars()),
            unit::format_compact(point.largest_dark_pool_txn.to_dollars()),
        ));
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::testing::{Call, RecordingSurface};
    use feed::{Candle, unit::Cents};

    fn point(period_start_ms: u64, close_cents: i64) -> AnalysisPoint {
        AnalysisPoint {
            candle: Candle {
                period_start: period_start_ms,
                open: Cents(close_cents - 10),
                high: Cents(close_cents + 20),
                low: Cents(close_cents - 20),
                close: Cents(close_cents),
                volume: 100,
            },
            sweep_at_bid: 1_500_000,
            sweep_at_ask: 2_000_000,
            sweep_unknown: 300,
            dark_pool_sum: Cents::ZERO,
            dark_pool_vwap: Cents::ZERO,
            largest_dark_pool_txn: Cents::ZERO,
            sweep_ratio: 0.75,
        }
    }

    fn pending_at(period_start_ms: u64) -> PendingPeriod {
        PendingPeriod {
            period_start: period_start_ms,
            open: Cents(100),
            high: Cents(105),
            low: Cents(95),
            close: Cents(101),
            volume: 3,
        }
    }

    fn view() -> ChartView<RecordingSurface> {
        ChartView::new(RecordingSurface::default())
    }

    #[test]
    fn load_history_sets_every_series_and_frames_the_tail() {
        let mut store = SeriesStore::new();
        store.load_snapshot(vec![point(60_000, 100), point(120_000, 110)]);

        let mut view = view();
        view.load_history(&store);

        let calls = &view.surface().calls;
        let Call::SetCandles(candles) = &calls[0] else {
            panic!("expected SetCandles first");
        };
        assert_eq!(candles.len(), 2);

        // Three sweep series + four bucket series.
        let set_series = view
            .surface()
            .calls_of(|c| matches!(c, Call::SetSeries(..)))
            .count();
        assert_eq!(set_series, 7);

        // Last bar at t=120s; short history, so the window starts at the
        // first candle and extends five minutes past the last.
        assert!(view
            .surface()
            .calls
            .contains(&Call::SetVisibleRange(60, 120 + 300)));
    }

    #[test]
    fn visible_range_caps_at_120_periods() {
        let candles: Vec<CandlePoint> = (0..200)
            .map(|i| CandlePoint {
                time: 10_000 + i * 10,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
            })
            .collect();

        let (from, to) = initial_visible_range(&candles).unwrap();
        // 200 bars, 10s apart: the 2h window covers them all, so the
        // 120-period cap decides the left edge.
        assert_eq!(from, candles[200 - 120].time);
        assert_eq!(to, candles[199].time + 300);
    }

    #[test]
    fn append_updates_each_series_once() {
        let mut view = view();
        let mut p = point(60_000, 100);
        p.dark_pool_sum = Cents::from_dollars(250_000_000.0);
        p.dark_pool_vwap = Cents(10_050);

        view.apply_append(&p, None);

        let calls = &view.surface().calls;
        assert!(matches!(calls[0], Call::UpdateCandle(c) if c.time == 60));
        let updates: Vec<&Call> = view
            .surface()
            .calls_of(|c| matches!(c, Call::UpdateSeries(..)))
            .collect();
        assert_eq!(updates.len(), 4);
        assert!(matches!(
            updates[3],
            Call::UpdateSeries(SeriesId::DarkPool(DarkPoolBucket::Medium), p)
                if p.value == 100.5
        ));
    }

    #[test]
    fn append_skips_candle_when_pending_is_newer() {
        let mut view = view();
        let p = point(60_000, 100);

        view.apply_append(&p, Some(&pending_at(120_000)));

        assert!(
            !view
                .surface()
                .calls
                .iter()
                .any(|c| matches!(c, Call::UpdateCandle(_)))
        );
        // The other series still advance.
        assert_eq!(
            view.surface()
                .calls_of(|c| matches!(c, Call::UpdateSeries(..)))
                .count(),
            3
        );
    }

    #[test]
    fn append_skips_candle_when_unpriced() {
        let mut view = view();
        let mut p = point(60_000, 100);
        p.candle.close = Cents::ZERO;

        view.apply_append(&p, None);

        assert!(
            !view
                .surface()
                .calls
                .iter()
                .any(|c| matches!(c, Call::UpdateCandle(_)))
        );
    }

    #[test]
    fn pending_refreshes_the_forming_bar() {
        let mut view = view();
        view.apply_pending(&pending_at(180_000));

        assert_eq!(
            view.surface().calls,
            vec![Call::UpdateCandle(CandlePoint {
                time: 180,
                open: 1.0,
                high: 1.05,
                low: 0.95,
                close: 1.01,
            })]
        );
    }

    #[test]
    fn crosshair_legend_and_clear() {
        let mut view = view();
        let mut p = point(60_000, 10_000);
        p.dark_pool_sum = Cents::from_dollars(1_500_000.0);
        p.dark_pool_vwap = Cents(9_995);
        p.largest_dark_pool_txn = Cents::from_dollars(900_000.0);

        view.crosshair(Some(&p));
        view.crosshair(None);

        let Call::SetLegend(text) = &view.surface().calls[0] else {
            panic!("expected SetLegend");
        };
        assert!(text.starts_with("O: 99.90 H: 100.20 L: 99.80 C: 100.00"));
        assert!(text.contains("Bid: 1.50M | Ask: 2.00M | Unk: 300"));
        assert!(text.contains("DP VWAP: $99.95 | $ Vol: 1.50M | Largest: 900.0K"));
        assert_eq!(view.surface().calls[1], Call::ClearLegend);
    }

    #[test]
    fn crosshair_without_dark_pool_omits_that_line() {
        let mut view = view();
        view.crosshair(Some(&point(60_000, 10_000)));

        let Call::SetLegend(text) = &view.surface().calls[0] else {
            panic!("expected SetLegend");
        };
        assert!(!text.contains("DP VWAP"));
    }

    #[test]
    fn clear_blanks_all_series() {
        let mut view = view();
        view.clear();

        assert_eq!(view.surface().calls[0], Call::SetCandles(vec![]));
        assert_eq!(
            view.surface()
                .calls_of(|c| matches!(c, Call::SetSeries(_, points) if points.is_empty()))
                .count(),
            7
        );
        assert_eq!(*view.surface().calls.last().unwrap(), Call::ClearLegend);
    }
}
