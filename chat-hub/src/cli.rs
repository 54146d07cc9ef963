use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{DEFAULT_MAX_MESSAGE_LEN, DEFAULT_MAX_NAME_LEN};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the chat hub, accepting TCP and WebSocket clients.
    Serve(ServeArgs),
    /// Connect to a hub over TCP and chat from the terminal.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Socket address for the line-oriented TCP transport. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub listen: SocketAddr,

    /// Socket address serving the landing page and the `/ws` WebSocket endpoint.
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub web_listen: SocketAddr,

    /// Maximum number of participants registered at once. Unlimited when omitted.
    #[arg(long)]
    pub max_participants: Option<usize>,

    /// Disconnect participants silent for this many seconds. 0 or omitted disables it.
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,

    /// Longest chat message accepted, in characters.
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_LEN)]
    pub max_message_len: usize,

    /// Longest display name accepted, in characters.
    #[arg(long, default_value_t = DEFAULT_MAX_NAME_LEN)]
    pub max_name_len: usize,

    /// Milliseconds a single delivery may take during broadcast before it counts as failed.
    #[arg(long, default_value_t = 5000)]
    pub send_timeout_ms: u64,

    /// What happens to a connection whose name is taken over by a newer one.
    #[arg(long, value_enum, default_value_t = CollisionArg::Replace)]
    pub on_name_collision: CollisionArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionArg {
    /// Newcomer takes the name; the old connection stays open until it leaves.
    Replace,
    /// Newcomer takes the name and the old connection is closed immediately.
    Evict,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Display name used when joining the chat.
    #[arg(long)]
    pub name: String,

    /// TCP address of the hub to connect to.
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub server: SocketAddr,
}
