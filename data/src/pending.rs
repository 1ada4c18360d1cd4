use feed::{AnalysisPoint, PendingPeriod};

/// Outcome of reconciling a pending-period update against the closed
/// history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingDecision {
    /// Upsert the forming bar's OHLC onto the price series.
    Apply,
    /// The update belongs to a period a closed point has already superseded;
    /// discarded without a user-visible error.
    Stale,
    /// Non-positive OHLC; ignored entirely.
    Invalid,
}

/// Guards the race where the close notification for period N arrives before
/// (or interleaved with) a pending update for the already-superseded period
/// N-1: a pending key older than the latest closed key is stale. An equal
/// key is still the forming bar being refined and applies.
pub fn reconcile(
    pending: &PendingPeriod,
    last_closed: Option<&AnalysisPoint>,
) -> PendingDecision {
    if let Some(last) = last_closed
        && pending.period_start < last.period_start()
    {
        return PendingDecision::Stale;
    }

    if !pending.has_valid_prices() {
        return PendingDecision::Invalid;
    }

    PendingDecision::Apply
}

/// Mirror of the guard on the append path: when a strictly newer forming bar
/// is already drawn, the candle update for an older closed point must not
/// drag the last bar backwards. The point's other series still update.
pub fn closed_superseded_by_pending(
    point: &AnalysisPoint,
    pending: Option<&PendingPeriod>,
) -> bool {
    pending.is_some_and(|p| p.period_start > point.period_start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed::{Candle, unit::Cents};

    fn closed_point(period_start: u64) -> AnalysisPoint {
        AnalysisPoint {
            candle: Candle {
                period_start,
                open: Cents(100),
                high: Cents(110),
                low: Cents(90),
                close: Cents(105),
                volume: 10,
            },
            sweep_at_bid: 0,
            sweep_at_ask: 0,
            sweep_unknown: 0,
            dark_pool_sum: Cents::ZERO,
            dark_pool_vwap: Cents::ZERO,
            largest_dark_pool_txn: Cents::ZERO,
            sweep_ratio: 0.0,
        }
    }

    fn pending_at(period_start: u64) -> PendingPeriod {
        PendingPeriod {
            period_start,
            open: Cents(100),
            high: Cents(101),
            low: Cents(99),
            close: Cents(100),
            volume: 1,
        }
    }

    #[test]
    fn older_pending_is_stale() {
        let last = closed_point(1000);
        assert_eq!(
            reconcile(&pending_at(900), Some(&last)),
            PendingDecision::Stale
        );
    }

    #[test]
    fn equal_and_newer_pending_apply() {
        let last = closed_point(1000);
        assert_eq!(
            reconcile(&pending_at(1000), Some(&last)),
            PendingDecision::Apply
        );
        assert_eq!(
            reconcile(&pending_at(1060), Some(&last)),
            PendingDecision::Apply
        );
    }

    #[test]
    fn first_pending_of_session_applies() {
        assert_eq!(reconcile(&pending_at(500), None), PendingDecision::Apply);
    }

    #[test]
    fn non_positive_prices_are_invalid() {
        let mut pending = pending_at(2000);
        pending.low = Cents::ZERO;
        assert_eq!(
            reconcile(&pending, Some(&closed_point(1000))),
            PendingDecision::Invalid
        );

        pending.low = Cents(-5);
        assert_eq!(reconcile(&pending, None), PendingDecision::Invalid);
    }

    #[test]
    fn append_mirror_guard() {
        let point = closed_point(1000);
        assert!(closed_superseded_by_pending(&point, Some(&pending_at(1060))));
        assert!(!closed_superseded_by_pending(&point, Some(&pending_at(1000))));
        assert!(!closed_superseded_by_pending(&point, None));
    }
}
