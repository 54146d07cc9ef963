//! Terminal client for the TCP transport.
//!
//! Chat lines are printed as received. Hub notices lose their `(chatbot): `
//! tag and are shown as `*** ...`, the same marker the client uses for its own
//! status lines.

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncWriteExt, Stdin},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    select,
};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{info, warn};

use crate::{
    cli::ClientArgs,
    notice,
    transport::line::{LineReader, line_reader, read_line, write_line},
};

const QUIT_COMMAND: &str = "/quit";

/// Longest line accepted from the server, in characters.
const MAX_SERVER_LINE: usize = 64 * 1024;

/// What the loop should do after handling one input.
enum Step {
    Continue,
    Leave,
}

struct Session {
    server: LineReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    keyboard: LineReader<Stdin>,
}

pub async fn run(args: ClientArgs) -> Result<()> {
    let stream = TcpStream::connect(args.server)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;
    info!("connected to {}", args.server);

    let (reader, mut writer) = stream.into_split();
    write_line(&mut writer, &args.name)
        .await
        .context("failed to send name")?;

    let mut session = Session {
        server: line_reader(reader, MAX_SERVER_LINE),
        writer,
        keyboard: FramedRead::new(tokio::io::stdin(), LinesCodec::new()),
    };
    let outcome = session.chat().await;
    session.hang_up().await;
    outcome
}

impl Session {
    async fn chat(&mut self) -> Result<()> {
        loop {
            let step = select! {
                line = read_line(&mut self.server) => on_server_line(line).await?,
                line = read_line(&mut self.keyboard) => on_typed_line(&mut self.writer, line).await?,
                ctrl_c = tokio::signal::ctrl_c() => {
                    if let Err(error) = ctrl_c {
                        warn!(?error, "ctrl-c handler failed");
                    }
                    Step::Leave
                }
            };
            if let Step::Leave = step {
                return Ok(());
            }
        }
    }

    async fn hang_up(&mut self) {
        if let Err(error) = self.writer.shutdown().await {
            warn!(?error, "failed to shutdown client writer cleanly");
        }
    }
}

async fn on_server_line(line: Result<Option<String>, LinesCodecError>) -> Result<Step> {
    match line.context("failed to read from server")? {
        Some(line) => {
            print(&render(&line)).await?;
            Ok(Step::Continue)
        }
        None => {
            print("*** server closed the connection").await?;
            Ok(Step::Leave)
        }
    }
}

async fn on_typed_line(
    writer: &mut OwnedWriteHalf,
    line: Result<Option<String>, LinesCodecError>,
) -> Result<Step> {
    let Some(line) = line.context("failed to read from stdin")? else {
        return Ok(Step::Leave);
    };

    let text = line.trim_end();
    if text.is_empty() {
        return Ok(Step::Continue);
    }
    if text.eq_ignore_ascii_case(QUIT_COMMAND) {
        print("*** leaving chat").await?;
        return Ok(Step::Leave);
    }

    write_line(writer, text).await.context("failed to send message")?;
    Ok(Step::Continue)
}

/// Terminal form of one server line.
fn render(line: &str) -> String {
    match line.strip_prefix(notice::PREFIX) {
        Some(body) => format!("*** {body}"),
        None => line.to_string(),
    }
}

async fn print(line: &str) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
