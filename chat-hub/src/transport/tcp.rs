//! Line-oriented TCP transport.
//!
//! A client connects, sends its display name as the first line and from then
//! on every line it sends is a chat message. Everything the hub delivers comes
//! back as newline-terminated text, so `nc` works as a client.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::{
    io::AsyncWriteExt,
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex,
};
use tokio_util::codec::LinesCodecError;
use tracing::{debug, info, warn};

use crate::{
    boundary::validate_name,
    config::Limits,
    error::{NameError, SendError},
    hub::HubHandle,
    notice,
    participant::{Inbound, Lifecycle, Participant, ParticipantId, Transport},
    transport::line::{LineReader, line_reader, read_line, relimit, write_line},
};

/// Pause after a failed accept so a persistent error (e.g. out of file
/// descriptors) does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct TcpParticipant {
    id: ParticipantId,
    name: String,
    peer: SocketAddr,
    reader: Mutex<Option<LineReader<OwnedReadHalf>>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    lifecycle: Lifecycle,
}

impl TcpParticipant {
    /// Wraps an already split connection. `reader` may hold buffered input
    /// read past the name line.
    pub fn new(
        name: String,
        peer: SocketAddr,
        reader: LineReader<OwnedReadHalf>,
        writer: OwnedWriteHalf,
    ) -> Self {
        Self {
            id: ParticipantId::next(),
            name,
            peer,
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            lifecycle: Lifecycle::default(),
        }
    }
}

#[async_trait]
impl Participant for TcpParticipant {
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
        if self.lifecycle.is_terminated() {
            return Err(SendError::Closed);
        }
        // The writer goes back only after the whole line is out. A send that
        // fails or is cancelled midway leaves the connection closed, so no
        // later line is appended to a partial one.
        let mut slot = self.writer.lock().await;
        let mut writer = slot.take().ok_or(SendError::Closed)?;
        write_line(&mut writer, text).await?;
        *slot = Some(writer);
        Ok(())
    }

    async fn receive_loop(&self, inbound: Inbound) {
        let Some(mut reader) = self.reader.lock().await.take() else {
            warn!(name = %self.name, participant = %self.id, "receive loop already ran");
            return;
        };

        loop {
            let read = tokio::select! {
                () = self.lifecycle.closed() => break,
                read = inbound.within_idle(read_line(&mut reader)) => read,
            };

            match read {
                Some(Ok(Some(line))) => {
                    if inbound.offer(self, &line).await.is_break() {
                        break;
                    }
                }
                Some(Ok(None)) => {
                    debug!(name = %self.name, peer = %self.peer, "peer closed the connection");
                    break;
                }
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    warn!(name = %self.name, peer = %self.peer, "line over the size cap, disconnecting");
                    let reply = notice::message_too_long(inbound.limits().max_message_len);
                    if let Err(error) = self.send(&reply).await {
                        debug!(name = %self.name, ?error, "failed to explain disconnect");
                    }
                    break;
                }
                Some(Err(error)) => {
                    debug!(name = %self.name, peer = %self.peer, ?error, "read failed");
                    break;
                }
                None => {
                    info!(name = %self.name, peer = %self.peer, "idle timeout reached");
                    break;
                }
            }
        }
    }

    async fn terminate(&self) {
        if !self.lifecycle.begin_termination() {
            return;
        }

        // A send still holding the writer drops it with the participant.
        if let Ok(mut writer) = self.writer.try_lock() {
            if let Some(mut writer) = writer.take() {
                if let Err(error) = writer.shutdown().await {
                    debug!(name = %self.name, ?error, "failed to shut down writer");
                }
            }
        }
        if let Ok(mut reader) = self.reader.try_lock() {
            *reader = None;
        }
    }
}

/// Accepts connections forever. A failed accept is logged and never ends the loop.
pub async fn accept_loop(listener: TcpListener, hub: HubHandle, limits: Limits) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => spawn_join(stream, peer, hub.clone(), limits.clone()),
            Err(err) => {
                warn!(error = ?err, "failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

fn spawn_join(stream: TcpStream, peer: SocketAddr, hub: HubHandle, limits: Limits) {
    tokio::spawn(async move {
        if let Err(err) = join(stream, peer, &hub, &limits).await {
            warn!(peer = %peer, error = ?err, "connection closed before joining");
        }
    });
}

/// Reads the name line, validates it and hands the connection to the hub.
async fn join(stream: TcpStream, peer: SocketAddr, hub: &HubHandle, limits: &Limits) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = line_reader(reader, limits.max_name_len);

    let requested = match limits.within_idle(read_line(&mut reader)).await {
        Some(Err(LinesCodecError::MaxLineLengthExceeded)) => Err(NameError::TooLong {
            max: limits.max_name_len,
        }),
        Some(line) => match line.context("failed to read name")? {
            Some(requested) => validate_name(&requested, limits),
            None => anyhow::bail!("connection closed before choosing a name"),
        },
        None => anyhow::bail!("timed out waiting for a name"),
    };

    let name = match requested {
        Ok(name) => name,
        Err(error) => {
            write_line(&mut writer, &notice::name_rejected(&error)).await?;
            writer.shutdown().await?;
            return Err(error).context("name rejected");
        }
    };
    relimit(&mut reader, limits.max_message_len);

    info!(%peer, %name, "tcp client connected");
    let participant = TcpParticipant::new(name, peer, reader, writer);
    hub.arrive(Arc::new(participant))
        .context("hub stopped before the participant could join")?;
    Ok(())
}
