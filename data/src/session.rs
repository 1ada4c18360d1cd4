use feed::Session;

/// Where the viewer sits relative to the feed's snapshot cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing trustworthy on screen; awaiting the next history snapshot.
    #[default]
    Idle,
    /// A snapshot for the selected session is applied; incremental updates
    /// may flow.
    Loaded,
}

/// Drives full-state resets across session switches and transport drops.
///
/// Selecting a session (or losing the transport) parks the pipeline in
/// `Idle`; the store is reset by the caller and every append or pending
/// update is gated off until the next snapshot lands. This is what stops an
/// append belonging to the old session, still in flight during a switch,
/// from resurfacing on the new chart.
#[derive(Debug, Default)]
pub struct ResyncController {
    phase: Phase,
    session: Option<Session>,
}

impl ResyncController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Begins a switch to `session`. Always invalidates displayed state,
    /// even when re-selecting the current session (that is how a manual
    /// refresh is expressed).
    pub fn select(&mut self, session: Session) {
        log::info!("switching session to {session}");
        self.session = Some(session);
        self.phase = Phase::Idle;
    }

    /// The first snapshot after a selection (or reconnect) re-arms the
    /// incremental pipeline.
    pub fn on_snapshot(&mut self) {
        self.phase = Phase::Loaded;
    }

    /// Transport dropped: whatever arrives next belongs to the reconnect's
    /// fresh snapshot cycle, so incremental traffic is stale until then.
    pub fn on_transport_lost(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Whether incremental appends and pending updates may mutate displayed
    /// state.
    pub fn accepts_updates(&self) -> bool {
        self.phase == Phase::Loaded
    }
}
