use enum_map::EnumMap;
use feed::{EventKind, FeedMessage};

/// Handle returned by `subscribe`; pass back to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token(u64);

type Handler = Box<dyn FnMut(&FeedMessage)>;

/// Typed publish/subscribe fan-out for parsed feed messages.
///
/// One instance, owned by the application root and passed to whoever wires
/// consumers. No process-global registry, so tests can't leak handlers
/// into each other.
///
/// The bus remembers the most recent payload per event kind; a handler
/// registered after that kind has already fired is invoked once with the
/// cached payload immediately, so a late-mounting consumer never misses the
/// last known state. Publishing with no handlers registered is a no-op
/// apart from updating the cache.
#[derive(Default)]
pub struct FeedBus {
    handlers: Vec<(Token, EventKind, Handler)>,
    latest: EnumMap<EventKind, Option<FeedMessage>>,
    next_token: u64,
}

impl FeedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        mut handler: impl FnMut(&FeedMessage) + 'static,
    ) -> Token {
        if let Some(cached) = &self.latest[kind] {
            handler(cached);
        }

        let token = Token(self.next_token);
        self.next_token += 1;
        self.handlers.push((token, kind, Box::new(handler)));
        token
    }

    pub fn unsubscribe(&mut self, token: Token) {
        self.handlers.retain(|(t, _, _)| *t != token);
    }

    /// Delivers `message` to every handler of its kind, in registration
    /// order, then caches it for replay-on-subscribe.
    pub fn publish(&mut self, message: FeedMessage) {
        let kind = message.kind();

        for (_, handler_kind, handler) in &mut self.handlers {
            if *handler_kind == kind {
                handler(&message);
            }
        }

        self.latest[kind] = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed::{PendingPeriod, unit::Cents};

    use std::{cell::RefCell, rc::Rc};

    fn pending(period_start: u64) -> FeedMessage {
        FeedMessage::PendingPeriod(PendingPeriod {
            period_start,
            open: Cents(1),
            high: Cents(1),
            low: Cents(1),
            close: Cents(1),
            volume: 0,
        })
    }

    fn keys_of(message: &FeedMessage) -> u64 {
        match message {
            FeedMessage::PendingPeriod(p) => p.period_start,
            _ => panic!("unexpected message"),
        }
    }

    #[test]
    fn delivers_to_matching_subscribers_only() {
        let mut bus = FeedBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        bus.subscribe(EventKind::PendingPeriod, move |m| {
            sink.borrow_mut().push(keys_of(m));
        });
        bus.subscribe(EventKind::HistorySnapshot, |_| {
            panic!("wrong kind delivered");
        });

        bus.publish(pending(1000));
        bus.publish(pending(2000));

        assert_eq!(*seen.borrow(), vec![1000, 2000]);
    }

    #[test]
    fn late_subscriber_replays_cached_payload_once() {
        let mut bus = FeedBus::new();
        bus.publish(pending(1000));
        bus.publish(pending(2000));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(EventKind::PendingPeriod, move |m| {
            sink.borrow_mut().push(keys_of(m));
        });

        // Only the latest payload, exactly once.
        assert_eq!(*seen.borrow(), vec![2000]);

        bus.publish(pending(3000));
        assert_eq!(*seen.borrow(), vec![2000, 3000]);
    }

    #[test]
    fn no_replay_for_kinds_never_published() {
        let mut bus = FeedBus::new();
        bus.publish(pending(1000));

        let fired = Rc::new(RefCell::new(false));
        let sink = Rc::clone(&fired);
        bus.subscribe(EventKind::HistorySnapshot, move |_| {
            *sink.borrow_mut() = true;
        });

        assert!(!*fired.borrow());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = FeedBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let token = bus.subscribe(EventKind::PendingPeriod, move |m| {
            sink.borrow_mut().push(keys_of(m));
        });

        bus.publish(pending(1000));
        bus.unsubscribe(token);
        bus.publish(pending(2000));

        assert_eq!(*seen.borrow(), vec![1000]);
    }

    #[test]
    fn publish_without_subscribers_still_caches() {
        let mut bus = FeedBus::new();
        bus.publish(pending(1000));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(EventKind::PendingPeriod, move |m| {
            sink.borrow_mut().push(keys_of(m));
        });

        assert_eq!(*seen.borrow(), vec![1000]);
    }
}
