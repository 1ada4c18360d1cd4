use crate::{
    AnalysisPoint, PendingPeriod, Session,
    connect::{self, FeedSocket, State, connect_ws},
    resilience,
};

use enum_map::Enum;
use fastwebsockets::{Frame, OpCode, Payload};
use futures::{SinkExt, Stream, channel::mpsc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, error::TryRecvError};

#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("Parsing: {0}")]
    Parse(String),
    #[error("Stream: {0}")]
    Websocket(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Event kinds the subscription bus distributes, one per recognized
/// server→client message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub enum EventKind {
    SessionDefault,
    HistorySnapshot,
    PointAppended,
    PendingPeriod,
    PendingMetrics,
}

/// A parsed server→client message with its payload lifted out of the
/// envelope (top-level or under `data`, whichever the server used).
#[derive(Debug, Clone)]
pub enum FeedMessage {
    SessionDefault(Session),
    HistorySnapshot(Vec<AnalysisPoint>),
    PointAppended(AnalysisPoint),
    PendingPeriod(PendingPeriod),
    PendingMetrics(Value),
}

impl FeedMessage {
    pub fn kind(&self) -> EventKind {
        match self {
            FeedMessage::SessionDefault(_) => EventKind::SessionDefault,
            FeedMessage::HistorySnapshot(_) => EventKind::HistorySnapshot,
            FeedMessage::PointAppended(_) => EventKind::PointAppended,
            FeedMessage::PendingPeriod(_) => EventKind::PendingPeriod,
            FeedMessage::PendingMetrics(_) => EventKind::PendingMetrics,
        }
    }
}

/// Transport-level events yielded by the stream loop.
#[derive(Debug, Clone)]
pub enum Event {
    Connected,
    Disconnected(String),
    Message(FeedMessage),
}

/// Client→server requests fed into the stream loop.
#[derive(Debug, Clone)]
pub enum Command {
    Select(Session),
}

#[derive(Serialize)]
struct SelectDate<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    date: chrono::NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    ticker: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<&'a str>,
}

/// Serialized `select_date` request for a session.
pub fn select_request(session: &Session) -> Result<Vec<u8>, FeedError> {
    serde_json::to_vec(&SelectDate {
        kind: "select_date",
        date: session.date,
        ticker: session.ticker.as_deref(),
        interval: session.interval.as_deref(),
    })
    .map_err(|e| FeedError::Parse(e.to_string()))
}

/// Parses one text frame into a feed message.
///
/// `Ok(None)` means a recognized envelope with an unknown `type`: ignored,
/// not fatal. A missing `type` or a payload that fails to deserialize is a
/// `Parse` error; the caller drops the frame and logs it.
pub fn parse_message(payload: &[u8]) -> Result<Option<FeedMessage>, FeedError> {
    let value: Value =
        serde_json::from_slice(payload).map_err(|e| FeedError::Parse(e.to_string()))?;

    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(FeedError::Parse("message without a type field".to_string()));
    };

    // Payload sits under `data` when present, otherwise the envelope itself
    // is the payload (`server_default_date` carries its fields top-level).
    let body = || match value.get("data") {
        Some(data) => data.clone(),
        None => value.clone(),
    };

    fn de<T: serde::de::DeserializeOwned>(kind: &str, body: Value) -> Result<T, FeedError> {
        serde_json::from_value(body).map_err(|e| FeedError::Parse(format!("{kind}: {e}")))
    }

    let message = match kind {
        "server_default_date" => FeedMessage::SessionDefault(de(kind, body())?),
        "analysis_history" => FeedMessage::HistorySnapshot(de(kind, body())?),
        "new_analysis_point" => FeedMessage::PointAppended(de(kind, body())?),
        "pending_candle" => FeedMessage::PendingPeriod(de(kind, body())?),
        "pending_metrics" => FeedMessage::PendingMetrics(body()),
        _ => {
            log::debug!("ignoring unknown feed message type: {kind}");
            return Ok(None);
        }
    };

    Ok(Some(message))
}

async fn send_select(ws: &mut FeedSocket, session: &Session) -> Result<(), FeedError> {
    let request = select_request(session)?;
    ws.write_frame(Frame::text(Payload::Owned(request)))
        .await
        .map_err(|e| FeedError::Websocket(e.to_string()))
}

/// Connects to the analytics feed and yields transport events forever.
///
/// Two-state loop: while disconnected, dial with exponential backoff; while
/// connected, read frames under a staleness timeout and apply queued
/// `select_date` commands between reads. After every successful dial the
/// last selected session is re-sent, so a reconnect resumes the session the
/// viewer was on and the server answers with a fresh history snapshot.
pub fn connect_feed(
    url: String,
    mut commands: UnboundedReceiver<Command>,
) -> impl Stream<Item = Event> {
    let (mut output, events) = mpsc::channel(100);

    tokio::spawn(async move {
        let mut state = State::Disconnected;
        let mut backoff = resilience::reconnect_backoff();
        // The session the viewer is on. Kept across reconnects; `unsent`
        // marks a selection the current connection has not seen yet.
        let mut last_session: Option<Session> = None;
        let mut unsent = false;

        loop {
            // Selections made while offline (or queued behind a read) still
            // move the target session; only the latest one matters.
            loop {
                match commands.try_recv() {
                    Ok(Command::Select(session)) => {
                        last_session = Some(session);
                        unsent = true;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }

            match &mut state {
                State::Disconnected => match connect_ws(&url).await {
                    Ok(mut websocket) => {
                        // Resume where the viewer was; the server answers
                        // with a fresh snapshot for that session.
                        let resumed = match &last_session {
                            Some(session) => send_select(&mut websocket, session).await.is_ok(),
                            None => true,
                        };

                        if resumed {
                            unsent = false;
                            state = State::Connected(websocket);
                            backoff = resilience::reconnect_backoff();
                            if output.send(Event::Connected).await.is_err() {
                                return;
                            }
                        } else {
                            log::warn!("connected but failed to re-send session selection");
                            if let Some(delay) = backoff.next() {
                                tokio::time::sleep(delay).await;
                            }
                        }
                    }
                    Err(e) => {
                        if let Some(delay) = backoff.next() {
                            tokio::time::sleep(delay).await;
                        }
                        let event = Event::Disconnected(format!("connect failed: {e}"));
                        if output.send(event).await.is_err() {
                            return;
                        }
                    }
                },
                State::Connected(ws) => {
                    if unsent && let Some(session) = &last_session {
                        if let Err(e) = send_select(ws, session).await {
                            log::warn!("select_date write failed: {e}");
                            state = State::Disconnected;
                            let event = Event::Disconnected("write failed".to_string());
                            if output.send(event).await.is_err() {
                                return;
                            }
                            continue;
                        }
                        unsent = false;
                    }

                    match tokio::time::timeout(connect::WS_READ_TIMEOUT, ws.read_frame()).await {
                        Ok(Ok(msg)) => match msg.opcode {
                            OpCode::Text => match parse_message(&msg.payload[..]) {
                                Ok(Some(message)) => {
                                    if output.send(Event::Message(message)).await.is_err() {
                                        return;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => log::error!("dropping malformed feed message: {e}"),
                            },
                            OpCode::Close => {
                                state = State::Disconnected;
                                let event =
                                    Event::Disconnected("connection closed by server".to_string());
                                if output.send(event).await.is_err() {
                                    return;
                                }
                            }
                            _ => {}
                        },
                        Ok(Err(e)) => {
                            state = State::Disconnected;
                            let event = Event::Disconnected(format!("read failed: {e}"));
                            if output.send(event).await.is_err() {
                                return;
                            }
                        }
                        Err(_elapsed) => {
                            log::warn!("feed read timeout, reconnecting");
                            state = State::Disconnected;
                            let event = Event::Disconnected("read timeout".to_string());
                            if output.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        }
    });

    events
}
