//! The hub loop: sole owner of the registry and the only place chat state changes.
//!
//! Transport adapters hand participants in through a [`HubHandle`]; each
//! registered participant gets its own receive task that feeds messages and,
//! eventually, its departure back into the loop. Nothing else touches the
//! registry, so no locks guard it.

use std::{future::Future, sync::Arc};

use futures::future::join_all;
use tokio::{sync::mpsc::UnboundedSender, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    config::HubConfig,
    error::{HubClosed, SendError},
    event::{self, Event, EventReceivers, EventSenders},
    notice,
    participant::{Inbound, Participant, spawn_receive_task},
    registry::Registry,
};

/// Cloneable entry point for transport adapters.
#[derive(Clone)]
pub struct HubHandle {
    arrivals: UnboundedSender<Arc<dyn Participant>>,
}

impl HubHandle {
    /// Queues `participant` for registration.
    pub fn arrive(&self, participant: Arc<dyn Participant>) -> Result<(), HubClosed> {
        self.arrivals.send(participant).map_err(|_| HubClosed)
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct Hub {
    registry: Registry,
    config: HubConfig,
    senders: EventSenders,
    receivers: EventReceivers,
}

impl Hub {
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (senders, receivers) = event::channels();
        let handle = HubHandle {
            arrivals: senders.arrivals.clone(),
        };
        let hub = Self {
            registry: Registry::new(),
            config,
            senders,
            receivers,
        };
        (hub, handle)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs the loop for the lifetime of the process.
    pub async fn run(self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    /// Runs the loop until `shutdown` resolves, then tells everyone and
    /// terminates every registered participant.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                biased;
                () = &mut shutdown => None,
                event = self.receivers.next() => event,
            };
            let Some(event) = next else {
                break;
            };
            self.process(event).await;
        }

        self.shut_down().await;
    }

    async fn process(&mut self, event: Event) {
        match event {
            Event::Arrival(participant) => self.on_arrival(participant).await,
            Event::Message(text) => self.on_message(text).await,
            Event::Departure(participant) => self.on_departure(participant).await,
        }
    }

    async fn on_arrival(&mut self, participant: Arc<dyn Participant>) {
        let name = participant.name().to_string();

        if self
            .registry
            .would_overflow(&name, self.config.max_participants)
        {
            warn!(%name, participant = %participant.id(), "registry full, refusing participant");
            if let Err(error) = self.deliver(participant.as_ref(), notice::ROOM_FULL).await {
                debug!(%name, ?error, "failed to tell refused participant");
            }
            participant.terminate().await;
            return;
        }

        info!(
            %name,
            participant = %participant.id(),
            transport = %participant.transport(),
            "participant joined"
        );

        if let Some(superseded) = self.registry.insert(Arc::clone(&participant)) {
            if superseded.id() != participant.id() {
                self.config.collision_policy.settle(superseded).await;
            }
        }

        if let Err(error) = self.deliver(participant.as_ref(), notice::HELP).await {
            warn!(%name, ?error, "failed to send help banner");
        }
        self.broadcast(&notice::joined(&name)).await;

        let inbound = Inbound::new(self.senders.messages.clone(), self.config.limits.clone());
        spawn_receive_task(participant, inbound, self.senders.departures.clone());
    }

    async fn on_message(&mut self, text: String) {
        info!(message = %text, "message received");
        self.broadcast(&text).await;
    }

    async fn on_departure(&mut self, participant: Arc<dyn Participant>) {
        let name = participant.name();

        if self.registry.is_current(participant.as_ref()) {
            info!(%name, participant = %participant.id(), "participant left");
            // The leaver is still registered here and gets the notice too.
            self.broadcast(&notice::left(name)).await;
            self.registry.remove_if_current(participant.as_ref());
        } else {
            debug!(
                %name,
                participant = %participant.id(),
                "departure for a participant that is no longer registered"
            );
        }

        participant.terminate().await;
    }

    /// Sends `text` to every participant registered right now.
    ///
    /// Failures are logged and counted; a failing participant stays registered.
    async fn broadcast(&self, text: &str) -> Delivery {
        let recipients = self.registry.snapshot();
        let outcomes = join_all(
            recipients
                .iter()
                .map(|participant| self.deliver(participant.as_ref(), text)),
        )
        .await;

        let mut delivery = Delivery {
            attempted: recipients.len(),
            ..Delivery::default()
        };
        for (participant, outcome) in recipients.iter().zip(outcomes) {
            match outcome {
                Ok(()) => delivery.delivered += 1,
                Err(error) => {
                    delivery.failed += 1;
                    warn!(
                        name = participant.name(),
                        participant = %participant.id(),
                        ?error,
                        "broadcast error"
                    );
                }
            }
        }
        delivery
    }

    async fn deliver(&self, participant: &dyn Participant, text: &str) -> Result<(), SendError> {
        match timeout(self.config.send_timeout, participant.send(text)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::TimedOut),
        }
    }

    async fn shut_down(&mut self) {
        info!(participants = self.registry.len(), "hub shutting down");
        self.broadcast(notice::SHUTTING_DOWN).await;
        for participant in self.registry.drain() {
            participant.terminate().await;
        }
    }
}
