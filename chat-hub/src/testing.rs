//! In-memory participant used by unit tests.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    error::SendError,
    participant::{Inbound, Lifecycle, Participant, ParticipantId, Transport},
};

/// Records everything sent to it; lines pushed into its script are treated as
/// typed by the remote user.
pub struct RecordingParticipant {
    id: ParticipantId,
    name: String,
    outbox: Mutex<Vec<String>>,
    fail_sends: AtomicBool,
    stall_sends: AtomicBool,
    terminations: AtomicUsize,
    lifecycle: Lifecycle,
    script: tokio::sync::Mutex<Option<UnboundedReceiver<String>>>,
}

impl RecordingParticipant {
    pub fn new(name: &str) -> (Arc<Self>, UnboundedSender<String>) {
        let (script_tx, script_rx) = mpsc::unbounded_channel();
        let participant = Arc::new(Self {
            id: ParticipantId::next(),
            name: name.to_string(),
            outbox: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            stall_sends: AtomicBool::new(false),
            terminations: AtomicUsize::new(0),
            lifecycle: Lifecycle::default(),
            script: tokio::sync::Mutex::new(Some(script_rx)),
        });
        (participant, script_tx)
    }

    pub fn received(&self) -> Vec<String> {
        self.outbox.lock().expect("outbox lock").clone()
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn stall_sends(&self) {
        self.stall_sends.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Participant for RecordingParticipant {
    fn id(&self) -> ParticipantId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn transport(&self) -> Transport {
        Transport::Tcp
    }

    async fn send(&self, text: &str) -> Result<(), SendError> {
        if self.stall_sends.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SendError::Io(std::io::ErrorKind::BrokenPipe.into()));
        }
        self.outbox.lock().expect("outbox lock").push(text.to_string());
        Ok(())
    }

    async fn receive_loop(&self, inbound: Inbound) {
        let Some(mut script) = self.script.lock().await.take() else {
            return;
        };

        loop {
            tokio::select! {
                line = script.recv() => match line {
                    Some(line) => {
                        if inbound.offer(self, &line).await.is_break() {
                            break;
                        }
                    }
                    None => break,
                },
                () = self.lifecycle.closed() => break,
            }
        }
    }

    async fn terminate(&self) {
        self.lifecycle.begin_termination();
        self.terminations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within two seconds"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
