//! Transport-independent view of a connected chat endpoint.
//!
//! The hub only ever talks to `Arc<dyn Participant>`; the TCP and WebSocket
//! adapters each provide one implementation.

use std::{
    fmt,
    future::Future,
    ops::ControlFlow,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc::UnboundedSender};
use tracing::{debug, warn};

use crate::{
    boundary::{Screened, screen_message},
    config::Limits,
    error::SendError,
};

static NEXT_PARTICIPANT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one connection.
///
/// Names may be reused by later connections; ids never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(u64);

impl ParticipantId {
    pub fn next() -> Self {
        Self(NEXT_PARTICIPANT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    WebSocket,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::WebSocket => f.write_str("websocket"),
        }
    }
}

#[async_trait]
pub trait Participant: Send + Sync {
    fn id(&self) -> ParticipantId;

    /// Display name used as the registry key. Fixed for the participant's lifetime.
    fn name(&self) -> &str;

    fn transport(&self) -> Transport;

    /// Delivers one unit of text to the remote end.
    ///
    /// A failure is returned to the caller; the participant stays alive.
    async fn send(&self, text: &str) -> Result<(), SendError>;

    /// Reads inbound units until the transport closes, errors, idles out or
    /// the participant is terminated, offering each one to `inbound`.
    ///
    /// Only the first call reads anything; later calls return immediately.
    async fn receive_loop(&self, inbound: Inbound);

    /// Releases the transport. Idempotent.
    async fn terminate(&self);
}

/// Sending half of the hub's inbound-message stream, handed to a receive loop.
#[derive(Clone)]
pub struct Inbound {
    messages: UnboundedSender<String>,
    limits: Limits,
}

impl Inbound {
    pub fn new(messages: UnboundedSender<String>, limits: Limits) -> Self {
        Self { messages, limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub async fn within_idle<F>(&self, read: F) -> Option<F::Output>
    where
        F: Future,
    {
        self.limits.within_idle(read).await
    }

    /// Screens one raw inbound unit from `from` and admits it into the hub
    /// stream when it passes. Rejections are answered privately.
    ///
    /// Breaks once the hub has stopped listening.
    pub async fn offer<P>(&self, from: &P, raw: &str) -> ControlFlow<()>
    where
        P: Participant + ?Sized,
    {
        match screen_message(raw, &self.limits) {
            Screened::Admit(text) => {
                if self.messages.send(text).is_err() {
                    debug!(name = from.name(), "hub stopped, ending receive loop");
                    return ControlFlow::Break(());
                }
            }
            Screened::Reply(reply) => {
                if let Err(error) = from.send(&reply).await {
                    warn!(name = from.name(), ?error, "failed to answer participant");
                }
            }
            Screened::Skip => {}
        }
        ControlFlow::Continue(())
    }
}

/// Runs `participant`'s receive loop on its own task and reports exactly one
/// departure for it when the loop ends.
pub fn spawn_receive_task(
    participant: Arc<dyn Participant>,
    inbound: Inbound,
    departures: UnboundedSender<Arc<dyn Participant>>,
) {
    tokio::spawn(async move {
        participant.receive_loop(inbound).await;
        if departures.send(participant).is_err() {
            debug!("hub stopped before departure could be reported");
        }
    });
}

/// Termination state shared between a participant's sender side and its
/// receive loop.
#[derive(Debug, Default)]
pub struct Lifecycle {
    terminated: AtomicBool,
    closed: Notify,
}

impl Lifecycle {
    /// Marks the participant terminated. Returns `true` only for the first caller.
    pub fn begin_termination(&self) -> bool {
        let first = !self.terminated.swap(true, Ordering::AcqRel);
        if first {
            // `notify_one` stores a permit, so a receive loop that is not
            // currently parked still observes it on its next wait.
            self.closed.notify_one();
        }
        first
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Resolves once termination has begun.
    pub async fn closed(&self) {
        if self.is_terminated() {
            return;
        }
        self.closed.notified().await;
    }
}
