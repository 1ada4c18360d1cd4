mod app;
mod bus;
mod chart;
mod logger;
mod surface;

use app::App;
use bus::FeedBus;
use feed::{Event, EventKind, FeedMessage, Session, adapter};
use futures::StreamExt;

use std::{cell::RefCell, rc::Rc};

const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8080/ws";

fn ws_url() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TAPEFLOW_WS_URL").ok())
        .unwrap_or_else(|| DEFAULT_WS_URL.to_string())
}

/// Optional startup session, `TAPEFLOW_DATE=YYYY-MM-DD`. Without it the
/// server's default-date push decides what loads first.
fn startup_session() -> Option<Session> {
    let raw = std::env::var("TAPEFLOW_DATE").ok()?;
    match raw.parse() {
        Ok(date) => Some(Session::new(date)),
        Err(e) => {
            log::warn!("ignoring invalid TAPEFLOW_DATE {raw:?}: {e}");
            None
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logger::setup(cfg!(debug_assertions)).expect("failed to initialize logger");

    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map_or_else(
            || "unknown location".to_string(),
            |loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()),
        );
        log::error!("PANIC at {location}: {info}");
        eprintln!("PANIC at {location}: {info}");
    }));

    let url = ws_url();
    let (command_tx, command_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut events = adapter::connect_feed(url.clone(), command_rx);

    let app = Rc::new(RefCell::new(App::new(
        surface::TraceSurface,
        command_tx,
    )));
    let mut bus = FeedBus::new();

    {
        let state = Rc::clone(&app);
        bus.subscribe(EventKind::SessionDefault, move |message| {
            if let FeedMessage::SessionDefault(session) = message {
                state.borrow_mut().on_session_default(session.clone());
            }
        });
    }
    {
        let state = Rc::clone(&app);
        bus.subscribe(EventKind::HistorySnapshot, move |message| {
            if let FeedMessage::HistorySnapshot(points) = message {
                state.borrow_mut().on_snapshot(points.clone());
            }
        });
    }
    {
        let state = Rc::clone(&app);
        bus.subscribe(EventKind::PointAppended, move |message| {
            if let FeedMessage::PointAppended(point) = message {
                state.borrow_mut().on_point(point.clone());
            }
        });
    }
    {
        let state = Rc::clone(&app);
        bus.subscribe(EventKind::PendingPeriod, move |message| {
            if let FeedMessage::PendingPeriod(pending) = message {
                state.borrow_mut().on_pending(*pending);
            }
        });
    }
    {
        let state = Rc::clone(&app);
        bus.subscribe(EventKind::PendingMetrics, move |message| {
            if let FeedMessage::PendingMetrics(metrics) = message {
                state.borrow_mut().on_pending_metrics(metrics.clone());
            }
        });
    }

    if let Some(session) = startup_session() {
        app.borrow_mut().select_session(session);
    }

    log::info!("connecting to {url}");

    while let Some(event) = events.next().await {
        match event {
            Event::Connected => log::info!("feed connected"),
            Event::Disconnected(reason) => {
                log::warn!("feed disconnected: {reason}");
                app.borrow_mut().on_transport_lost();
            }
            Event::Message(message) => bus.publish(message),
        }
    }

    log::info!("feed stream ended, shutting down");
}
