use crate::chart::ChartView;
use crate::surface::ChartSurface;

use data::{PendingDecision, ResyncController, SeriesStore, pending};
use feed::{AnalysisPoint, Command, PendingPeriod, Session};
use tokio::sync::mpsc::UnboundedSender;

/// Everything the event loop mutates: the canonical store, the resync
/// gate, the forming bar, and the view that mirrors commits onto the
/// surface. All methods run synchronously on the delivery thread; a
/// handler triggering a resync mid-message is the normal path, not a
/// special case.
pub struct App<S> {
    store: SeriesStore,
    controller: ResyncController,
    view: ChartView<S>,
    current_pending: Option<PendingPeriod>,
    pending_metrics: Option<serde_json::Value>,
    commands: UnboundedSender<Command>,
}

impl<S: ChartSurface> App<S> {
    pub fn new(surface: S, commands: UnboundedSender<Command>) -> Self {
        Self {
            store: SeriesStore::new(),
            controller: ResyncController::new(),
            view: ChartView::new(surface),
            current_pending: None,
            pending_metrics: None,
            commands,
        }
    }

    /// Server-pushed default session: adopt it and echo the selection back,
    /// which makes the server start streaming that session.
    pub fn on_session_default(&mut self, session: Session) {
        self.select_session(session);
    }

    /// Switches the viewer to `session`. Atomically invalidates everything
    /// derived from the old session before any new data is accepted.
    pub fn select_session(&mut self, session: Session) {
        self.controller.select(session.clone());
        self.store.reset();
        self.current_pending = None;
        self.pending_metrics = None;
        self.view.clear();

        if self.commands.send(Command::Select(session)).is_err() {
            log::error!("feed task gone; select_date not sent");
        }
    }

    pub fn on_snapshot(&mut self, points: Vec<AnalysisPoint>) {
        log::info!("history snapshot: {} points", points.len());
        self.store.load_snapshot(points);
        self.controller.on_snapshot();
        self.view.load_history(&self.store);
    }

    pub fn on_point(&mut self, point: AnalysisPoint) {
        if !self.controller.accepts_updates() {
            log::debug!(
                "ignoring append for {} while awaiting snapshot",
                point.period_start()
            );
            return;
        }

        // A closed point at or past the forming bar's key supersedes it.
        if self
            .current_pending
            .is_some_and(|p| p.period_start <= point.period_start())
        {
            self.current_pending = None;
        }

        self.store.append_point(point.clone());
        self.view.apply_append(&point, self.current_pending.as_ref());
    }

    pub fn on_pending(&mut self, pending_period: PendingPeriod) {
        if !self.controller.accepts_updates() {
            return;
        }

        match pending::reconcile(&pending_period, self.store.latest_closed()) {
            PendingDecision::Apply => {
                self.view.apply_pending(&pending_period);
                self.current_pending = Some(pending_period);
            }
            PendingDecision::Stale => {
                log::debug!(
                    "discarding stale pending update for {}",
                    pending_period.period_start
                );
            }
            PendingDecision::Invalid => {}
        }
    }

    pub fn on_pending_metrics(&mut self, metrics: serde_json::Value) {
        if !self.controller.accepts_updates() {
            return;
        }
        self.pending_metrics = Some(metrics);
    }

    /// Transport dropped: the adapter reconnects and re-selects on its own;
    /// here we only stop trusting incremental traffic until the fresh
    /// snapshot lands.
    pub fn on_transport_lost(&mut self) {
        self.controller.on_transport_lost();
    }

    /// Hover moved to `time_secs` (or off the chart). Resolves the full
    /// analysis point behind the bar and renders/clears the legend.
    pub fn on_crosshair(&mut self, time_secs: Option<u64>) {
        let resolved = time_secs.and_then(|t| self.store.resolve(t));
        self.view.crosshair(resolved);
    }

    pub fn pending_metrics(&self) -> Option<&serde_json::Value> {
        self.pending_metrics.as_ref()
    }
}
