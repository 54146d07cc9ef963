use std::{future::Future, io, net::SocketAddr};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::warn;

use crate::{
    config::ServerConfig,
    hub::Hub,
    transport::{tcp, web},
};

/// Both transports bound and ready, plus the hub they feed.
pub struct Server {
    tcp: TcpListener,
    web: TcpListener,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let tcp = TcpListener::bind(config.tcp_listen)
            .await
            .with_context(|| format!("failed to bind tcp transport on {}", config.tcp_listen))?;
        let web = TcpListener::bind(config.web_listen)
            .await
            .with_context(|| format!("failed to bind web transport on {}", config.web_listen))?;

        Ok(Self { tcp, web, config })
    }

    pub fn tcp_addr(&self) -> io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    pub fn web_addr(&self) -> io::Result<SocketAddr> {
        self.web.local_addr()
    }

    /// Runs the hub and both transports until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            tcp: tcp_listener,
            web: web_listener,
            config,
        } = self;
        let limits = config.hub.limits.clone();
        let (hub, handle) = Hub::new(config.hub);

        let tcp_task = tokio::spawn(tcp::accept_loop(tcp_listener, handle.clone(), limits.clone()));

        let app = web::router(handle, limits);
        let web_task = tokio::spawn(async move {
            let service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(err) = axum::serve(web_listener, service).await {
                warn!(error = ?err, "web transport stopped");
            }
        });

        hub.run_until(shutdown).await;

        tcp_task.abort();
        web_task.abort();
        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}
