use std::{collections::HashMap, sync::Arc};

use tracing::info;

use crate::participant::Participant;

/// Name → participant mapping. Owned and mutated by the hub loop only.
#[derive(Default)]
pub struct Registry {
    participants: HashMap<String, Arc<dyn Participant>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.participants.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Participant>> {
        self.participants.get(name)
    }

    /// Whether admitting a participant called `name` would exceed `max`.
    /// Taking over an existing name never grows the registry.
    pub fn would_overflow(&self, name: &str, max: Option<usize>) -> bool {
        match max {
            Some(max) => !self.contains(name) && self.len() >= max,
            None => false,
        }
    }

    /// Registers `participant` under its name, returning whichever participant
    /// previously held that name.
    pub fn insert(&mut self, participant: Arc<dyn Participant>) -> Option<Arc<dyn Participant>> {
        self.participants
            .insert(participant.name().to_string(), participant)
    }

    /// Whether `participant` itself, not a later connection reusing its name,
    /// holds the entry for its name.
    pub fn is_current(&self, participant: &dyn Participant) -> bool {
        self.participants
            .get(participant.name())
            .is_some_and(|entry| entry.id() == participant.id())
    }

    /// Removes `participant`'s entry if it is still the one registered under
    /// its name. A superseded or unknown participant leaves the registry alone.
    pub fn remove_if_current(&mut self, participant: &dyn Participant) -> bool {
        let current = self.is_current(participant);
        if current {
            self.participants.remove(participant.name());
        }
        current
    }

    /// Registered participants at the time of the call.
    pub fn snapshot(&self) -> Vec<Arc<dyn Participant>> {
        self.participants.values().cloned().collect()
    }

    /// Empties the registry, handing back everyone that was in it.
    pub fn drain(&mut self) -> Vec<Arc<dyn Participant>> {
        self.participants.drain().map(|(_, participant)| participant).collect()
    }
}

/// What to do with a connection whose name was just taken by a newer arrival.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameCollisionPolicy {
    /// The newcomer replaces the entry. The superseded connection stays open,
    /// unreachable by broadcasts, and is terminated when it departs.
    #[default]
    Replace,
    /// The newcomer replaces the entry and the superseded connection is
    /// terminated immediately.
    Evict,
}

impl NameCollisionPolicy {
    /// Deals with `superseded` after its registry entry went to a newer arrival.
    pub async fn settle(self, superseded: Arc<dyn Participant>) {
        match self {
            Self::Replace => {
                info!(
                    name = superseded.name(),
                    participant = %superseded.id(),
                    "name taken over by a new connection; old connection left open"
                );
            }
            Self::Evict => {
                info!(
                    name = superseded.name(),
                    participant = %superseded.id(),
                    "name taken over by a new connection; evicting old connection"
                );
                superseded.terminate().await;
            }
        }
    }
}
