use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use chat_hub::{
    cli::{Cli, Command},
    client,
    config::ServerConfig,
    server::Server,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let server = Server::bind(ServerConfig::from(args)).await?;
            info!("chat hub listening on {}", server.tcp_addr()?);
            info!("web transport listening on {}", server.web_addr()?);
            if let Err(err) = server.run_until_ctrl_c().await {
                warn!("chat hub exited with error: {err:?}");
                return Err(err);
            }
        }
        Command::Client(args) => client::run(args).await?,
    }

    Ok(())
}
