#![allow(dead_code)]

use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result, anyhow};
use chat_hub::{
    config::{HubConfig, ServerConfig},
    notice,
    server::Server,
    transport::line::{LineReader, line_reader, read_line, write_line},
};
use tokio::{
    io::AsyncWriteExt,
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};

pub const READ_TIMEOUT: Duration = Duration::from_secs(3);
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// Longest line a test client accepts, in characters.
const MAX_LINE: usize = 64 * 1024;

pub struct TestServer {
    pub tcp: SocketAddr,
    pub web: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl TestServer {
    pub async fn start(hub: HubConfig) -> Result<Self> {
        let server = Server::bind(ServerConfig {
            tcp_listen: "127.0.0.1:0".parse()?,
            web_listen: "127.0.0.1:0".parse()?,
            hub,
        })
        .await?;
        let tcp = server.tcp_addr()?;
        let web = server.web_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async move {
            let _ = shutdown_rx.await;
        }));

        Ok(Self {
            tcp,
            web,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        timeout(READ_TIMEOUT, &mut self.task)
            .await
            .context("server did not stop")??
    }
}

/// A raw line-oriented TCP chat client.
pub struct LineClient {
    reader: LineReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl LineClient {
    async fn open(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: line_reader(reader, MAX_LINE),
            writer,
        })
    }

    /// Connects and sends `name` as the first line.
    pub async fn connect(addr: SocketAddr, name: &str) -> Result<Self> {
        let mut client = Self::open(addr).await?;
        client.send(name).await?;
        Ok(client)
    }

    /// Connects and sends `bytes` as they are in place of a name line.
    pub async fn connect_raw(addr: SocketAddr, bytes: &[u8]) -> Result<Self> {
        let mut client = Self::open(addr).await?;
        client.send_raw(bytes).await?;
        Ok(client)
    }

    /// Connects, then consumes the help banner and the client's own join notice.
    pub async fn join(addr: SocketAddr, name: &str) -> Result<Self> {
        let mut client = Self::connect(addr, name).await?;
        client.expect_help().await?;
        client.expect(&notice::joined(name)).await?;
        Ok(client)
    }

    pub async fn send(&mut self, text: &str) -> Result<()> {
        write_line(&mut self.writer, text).await?;
        Ok(())
    }

    /// Writes `bytes` as they are, without a line terminator.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<String> {
        timeout(READ_TIMEOUT, read_line(&mut self.reader))
            .await
            .map_err(|_| anyhow!("timed out waiting for a line"))??
            .context("connection closed")
    }

    pub async fn expect(&mut self, expected: &str) -> Result<()> {
        let line = self.recv().await?;
        if line != expected {
            return Err(anyhow!("expected '{expected}', got '{line}'"));
        }
        Ok(())
    }

    pub async fn expect_help(&mut self) -> Result<()> {
        for line in notice::HELP.lines() {
            self.expect(line).await?;
        }
        Ok(())
    }

    /// Succeeds if nothing arrives for a short while.
    pub async fn expect_silence(&mut self) -> Result<()> {
        match timeout(QUIET_PERIOD, read_line(&mut self.reader)).await {
            Err(_) => Ok(()),
            Ok(line) => Err(anyhow!("expected silence, got {line:?}")),
        }
    }

    /// Succeeds once the server closes the connection.
    pub async fn expect_closed(&mut self) -> Result<()> {
        match timeout(READ_TIMEOUT, read_line(&mut self.reader)).await {
            Ok(Ok(None)) | Ok(Err(_)) => Ok(()),
            Ok(Ok(Some(line))) => Err(anyhow!("expected close, got '{line}'")),
            Err(_) => Err(anyhow!("timed out waiting for close")),
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
