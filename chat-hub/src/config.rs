//! Runtime configuration shared by the hub and the transport adapters.

use std::{future::Future, net::SocketAddr, time::Duration};

use crate::{
    cli::{CollisionArg, ServeArgs},
    registry::NameCollisionPolicy,
};

pub const DEFAULT_MAX_NAME_LEN: usize = 40;
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 512;
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Guard checks applied at the transport boundary before anything reaches the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Longest accepted display name, in characters.
    pub max_name_len: usize,
    /// Longest accepted chat message, in characters.
    pub max_message_len: usize,
    /// Silence after which a participant is treated as departed. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Limits {
    /// Awaits `read`, giving up with `None` once the idle timeout elapses.
    pub async fn within_idle<F>(&self, read: F) -> Option<F::Output>
    where
        F: Future,
    {
        match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, read).await.ok(),
            None => Some(read.await),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_len: DEFAULT_MAX_NAME_LEN,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            idle_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Upper bound on registered participants. `None` admits everyone.
    pub max_participants: Option<usize>,
    /// Bound on a single `send` during broadcast; a slower send counts as failed.
    pub send_timeout: Duration,
    pub collision_policy: NameCollisionPolicy,
    pub limits: Limits,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_participants: None,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            collision_policy: NameCollisionPolicy::default(),
            limits: Limits::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the line-oriented TCP transport.
    pub tcp_listen: SocketAddr,
    /// Address serving the landing page and the `/ws` endpoint.
    pub web_listen: SocketAddr,
    pub hub: HubConfig,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        let collision_policy = match args.on_name_collision {
            CollisionArg::Replace => NameCollisionPolicy::Replace,
            CollisionArg::Evict => NameCollisionPolicy::Evict,
        };

        Self {
            tcp_listen: args.listen,
            web_listen: args.web_listen,
            hub: HubConfig {
                max_participants: args.max_participants,
                send_timeout: Duration::from_millis(args.send_timeout_ms),
                collision_policy,
                limits: Limits {
                    max_name_len: args.max_name_len,
                    max_message_len: args.max_message_len,
                    // Zero means "no timeout" so scripts can pass the flag unconditionally.
                    idle_timeout: args
                        .idle_timeout_secs
                        .filter(|secs| *secs > 0)
                        .map(Duration::from_secs),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    fn serve_config(args: &[&str]) -> ServerConfig {
        let cli = Cli::try_parse_from(args).expect("arguments should parse");
        match cli.command {
            Command::Serve(args) => ServerConfig::from(args),
            other => panic!("expected serve command, got {other:?}"),
        }
    }

    #[test]
    fn defaults_match_documented_limits() {
        let config = serve_config(&["chat_hub", "serve"]);
        assert_eq!(config.tcp_listen.port(), 5000);
        assert_eq!(config.web_listen.port(), 8000);
        assert_eq!(config.hub, HubConfig::default());
    }

    #[test]
    fn flags_flow_into_hub_config() {
        let config = serve_config(&[
            "chat_hub",
            "serve",
            "--max-participants",
            "3",
            "--idle-timeout-secs",
            "30",
            "--max-message-len",
            "10",
            "--send-timeout-ms",
            "250",
            "--on-name-collision",
            "evict",
        ]);

        assert_eq!(config.hub.max_participants, Some(3));
        assert_eq!(config.hub.send_timeout, Duration::from_millis(250));
        assert_eq!(config.hub.collision_policy, NameCollisionPolicy::Evict);
        assert_eq!(config.hub.limits.max_message_len, 10);
        assert_eq!(
            config.hub.limits.idle_timeout,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn zero_idle_timeout_disables_it() {
        let config = serve_config(&["chat_hub", "serve", "--idle-timeout-secs", "0"]);
        assert_eq!(config.hub.limits.idle_timeout, None);
    }
}
