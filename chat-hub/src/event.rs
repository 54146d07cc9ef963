use std::{fmt, sync::Arc};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::participant::Participant;

/// One unit of work for the hub loop. Events are processed strictly one at a
/// time in the order the loop selects them.
pub enum Event {
    Arrival(Arc<dyn Participant>),
    Message(String),
    Departure(Arc<dyn Participant>),
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arrival(participant) => f.debug_tuple("Arrival").field(&participant.name()).finish(),
            Self::Message(text) => f.debug_tuple("Message").field(text).finish(),
            Self::Departure(participant) => {
                f.debug_tuple("Departure").field(&participant.name()).finish()
            }
        }
    }
}

/// Sending halves of the three event streams.
#[derive(Clone)]
pub struct EventSenders {
    pub arrivals: UnboundedSender<Arc<dyn Participant>>,
    pub messages: UnboundedSender<String>,
    pub departures: UnboundedSender<Arc<dyn Participant>>,
}

/// Receiving halves, owned by the hub loop.
pub struct EventReceivers {
    pub arrivals: UnboundedReceiver<Arc<dyn Participant>>,
    pub messages: UnboundedReceiver<String>,
    pub departures: UnboundedReceiver<Arc<dyn Participant>>,
}

impl EventReceivers {
    /// Waits for the next event. Arrivals are preferred over messages and
    /// messages over departures, so a participant's queued lines are relayed
    /// before its departure.
    ///
    /// Returns `None` only once every stream is closed.
    pub async fn next(&mut self) -> Option<Event> {
        tokio::select! {
            biased;
            Some(participant) = self.arrivals.recv() => Some(Event::Arrival(participant)),
            Some(text) = self.messages.recv() => Some(Event::Message(text)),
            Some(participant) = self.departures.recv() => Some(Event::Departure(participant)),
            else => None,
        }
    }
}

pub fn channels() -> (EventSenders, EventReceivers) {
    let (arrivals_tx, arrivals_rx) = mpsc::unbounded_channel();
    let (messages_tx, messages_rx) = mpsc::unbounded_channel();
    let (departures_tx, departures_rx) = mpsc::unbounded_channel();

    (
        EventSenders {
            arrivals: arrivals_tx,
            messages: messages_tx,
            departures: departures_tx,
        },
        EventReceivers {
            arrivals: arrivals_rx,
            messages: messages_rx,
            departures: departures_rx,
        },
    )
}
